//! Ties [`crate::compression::unit`] and the codecs in
//! [`crate::compression`] into the `Decoder` used by
//! [`crate::stream::StreamDescriptor`] for compressed attributes.
//!
//! Per spec.md §9 ("Cyclic references"), this replaces the C source's
//! callback-plus-`intptr_t` indirection between the compressed-block
//! descriptor and the stream's data handle with a plain borrow: the
//! decoder owns its unit list and borrows the block-I/O adapter.

use std::rc::Rc;

use crate::attribute::AttributeBody;
use crate::attribute_chain::AttributeChain;
use crate::block_io::BlockSource;
use crate::cache::{StreamCache, StreamId};
use crate::cluster_block::read_cached;
use crate::compression::{build_units, lznt1, CompressionUnit, UnitKind, UnitSegment};
use crate::error::{Bounds, MalformedOnDisk, Result};

/// Decodes a compressed (LZNT1) non-resident attribute, one
/// compression unit at a time.
pub struct Decoder<'a, B: BlockSource> {
    source: &'a B,
    cluster_size: u32,
    cu_size_in_clusters: u64,
    data_size: u64,
    stream_id: StreamId,
    units: Vec<CompressionUnit>,
}

impl<'a, B: BlockSource> Decoder<'a, B> {
    /// Builds the compression-unit descriptor list for `chain`.
    /// `chain.compression_unit_log2()` must be non-zero (the
    /// attribute parser already rejects the compressed flag with a
    /// zero unit size, per §4.B).
    pub fn new(chain: &AttributeChain, source: &'a B, cluster_size: u32, stream_id: StreamId) -> Self {
        let cu_size_in_clusters = 1u64 << chain.compression_unit_log2();

        let mut runs = Vec::new();
        for fragment in &chain.fragments {
            if let AttributeBody::NonResident { runs: fragment_runs, .. } = &fragment.body {
                runs.extend(fragment_runs.iter().copied());
            }
        }

        let units = build_units(&runs, cu_size_in_clusters);

        Self {
            source,
            cluster_size,
            cu_size_in_clusters,
            data_size: chain.data_size(),
            stream_id,
            units,
        }
    }

    fn cu_size_bytes(&self) -> u64 {
        self.cu_size_in_clusters * self.cluster_size as u64
    }

    /// Reads `buf.len()` logical bytes (or fewer at EOF) starting at
    /// `logical_offset`, decoding whichever compression units the
    /// range touches.
    pub fn read(
        &self,
        logical_offset: u64,
        buf: &mut [u8],
        mut cache: Option<&mut StreamCache>,
    ) -> Result<usize> {
        if logical_offset >= self.data_size || buf.is_empty() {
            return Ok(0);
        }

        let cu_size = self.cu_size_bytes();
        let available = self.data_size - logical_offset;
        let want = (buf.len() as u64).min(available) as usize;
        let mut filled = 0usize;

        while filled < want {
            let offset = logical_offset + filled as u64;
            let unit_index = offset / cu_size;
            let intra = (offset % cu_size) as usize;

            let unit = self
                .units
                .get(unit_index as usize)
                .ok_or(Bounds::OutOfRange {
                    offset,
                    length: self.data_size,
                })?;

            let unit_bytes = self.materialize_unit(unit, unit_index, cache.as_deref_mut())?;
            if intra >= unit_bytes.len() {
                break;
            }
            let take = (want - filled).min(unit_bytes.len() - intra);
            buf[filled..filled + take].copy_from_slice(&unit_bytes[intra..intra + take]);
            filled += take;
        }

        Ok(filled)
    }

    fn materialize_unit(
        &self,
        unit: &CompressionUnit,
        unit_index: u64,
        mut cache: Option<&mut StreamCache>,
    ) -> Result<Rc<[u8]>> {
        if let Some(cached) = cache
            .as_deref_mut()
            .and_then(|c| c.get_compression_unit(self.stream_id, unit_index))
        {
            return Ok(cached);
        }

        let is_last_unit = unit_index as usize + 1 == self.units.len();
        let cu_size = self.cu_size_bytes() as usize;

        let data: Rc<[u8]> = match unit.kind {
            UnitKind::Sparse => Rc::from(vec![0u8; cu_size].into_boxed_slice()),
            UnitKind::Raw => {
                let physical = self.gather_physical_bytes(unit)?;
                Rc::from(physical.into_boxed_slice())
            }
            UnitKind::Compressed => {
                let physical = self.gather_physical_bytes(unit)?;
                let decoded = lznt1::decompress_unit(&physical)?;

                if decoded.len() > cu_size {
                    return Err(MalformedOnDisk::DecompressorOverrun { length: decoded.len() }.into());
                }
                if decoded.len() < cu_size && !is_last_unit {
                    return Err(MalformedOnDisk::ShortUnit {
                        produced: decoded.len(),
                        expected: cu_size,
                    }
                    .into());
                }
                Rc::from(decoded.into_boxed_slice())
            }
        };

        if let Some(c) = cache {
            c.insert_compression_unit(self.stream_id, unit_index, data.clone());
        }
        Ok(data)
    }

    /// Concatenates a unit's non-sparse (physical) segments. For a
    /// `Raw` unit this already is the logical content; for a
    /// `Compressed` unit it is the LZNT1 byte stream to decode.
    fn gather_physical_bytes(&self, unit: &CompressionUnit) -> Result<Vec<u8>> {
        let mut physical = Vec::new();
        for segment in &unit.segments {
            if let UnitSegment::Raw {
                lcn,
                length_in_clusters,
            } = segment
            {
                let len = (*length_in_clusters * self.cluster_size as u64) as usize;
                let mut buf = vec![0u8; len];
                let abs = lcn.0 * self.cluster_size as u64;
                read_cached(self.source, None, abs, self.cluster_size, &mut buf)?;
                physical.extend_from_slice(&buf);
            }
        }
        Ok(physical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::{AttributeDataFlags, AttributeRecord};
    use crate::types::Lcn;

    fn lznt1_raw_chunk(data: &[u8]) -> Vec<u8> {
        let header = ((data.len() - 1) as u16) & 0x0FFF;
        let mut out = header.to_le_bytes().to_vec();
        out.extend_from_slice(data);
        out
    }

    #[test]
    fn reads_a_compressed_unit_through_the_decoder() {
        // One compression unit spanning 2 clusters: a single raw
        // (uncompressed) LZNT1 chunk of 16 bytes in the first
        // cluster, plus a sparse second cluster that pads the run out
        // to the compression unit's size (this mix is what makes the
        // unit classify as compressed rather than raw).
        let payload: Vec<u8> = (0u8..16).collect();
        let chunk = lznt1_raw_chunk(&payload);
        let mut image = chunk.clone();
        image.resize(4096, 0);

        let chain = AttributeChain {
            type_code: 0x80,
            name: None,
            fragments: vec![AttributeRecord {
                type_code: 0x80,
                data_flags: AttributeDataFlags::COMPRESSED,
                name: None,
                identifier: 0,
                body: AttributeBody::NonResident {
                    first_vcn: 0,
                    last_vcn: 1,
                    allocated_size: 4096,
                    data_size: 16,
                    valid_data_size: 16,
                    compression_unit_log2: 1,
                    runs: vec![
                        crate::data_run::DataRun {
                            length_in_clusters: 1,
                            starting_lcn: Some(Lcn(0)),
                        },
                        crate::data_run::DataRun {
                            length_in_clusters: 1,
                            starting_lcn: None,
                        },
                    ],
                },
            }],
        };

        let source: &[u8] = &image;
        let decoder = Decoder::new(&chain, &source, 4096, 7);

        let mut buf = [0u8; 16];
        let n = decoder.read(0, &mut buf, None).unwrap();
        assert_eq!(n, 16);
        assert_eq!(buf.to_vec(), payload);
    }
}
