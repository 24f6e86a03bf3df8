//! §4.F: cluster block stream.
//!
//! The uniform seekable view of an *uncompressed* attribute, built once
//! from a resolved [`AttributeChain`] and then read/seeked any number
//! of times without touching the chain again.

use crate::attribute::AttributeBody;
use crate::attribute_chain::AttributeChain;
use crate::block_io::BlockSource;
use crate::cache::StreamCache;
use crate::cluster_block::read_cached;
use crate::error::{Bounds, Result};
use crate::types::Lcn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SegmentSource {
    Raw { lcn: Lcn },
    Sparse,
    Resident,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    file_offset: u64,
    length: u64,
    source: SegmentSource,
}

/// One extent as surfaced to callers of [`ClusterBlockStream::extents`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Extent {
    pub file_offset: u64,
    pub length: u64,
    pub sparse: bool,
}

/// Seekable view of one attribute's logical byte range. Not `Clone`
/// (§9 "Cyclic references" / open question): a second view is built
/// fresh from the same [`AttributeChain`].
pub struct ClusterBlockStream<'a, B: BlockSource> {
    source: &'a B,
    cluster_size: u32,
    data_size: u64,
    resident_data: Option<Vec<u8>>,
    segments: Vec<Segment>,
    position: u64,
}

impl<'a, B: BlockSource> ClusterBlockStream<'a, B> {
    /// Builds the segment list (the `ExtentIndex`) from a chain, per
    /// spec.md §4.F's four construction steps.
    pub fn new(chain: &AttributeChain, source: &'a B, cluster_size: u32) -> Self {
        let data_size = chain.data_size();

        if chain.is_resident() {
            let resident = match &chain.fragments[0].body {
                AttributeBody::Resident { data } => data.clone(),
                AttributeBody::NonResident { .. } => unreachable!("is_resident() guarantees Resident body"),
            };
            return Self {
                source,
                cluster_size,
                data_size,
                resident_data: Some(resident),
                segments: vec![Segment {
                    file_offset: 0,
                    length: data_size,
                    source: SegmentSource::Resident,
                }],
                position: 0,
            };
        }

        let mut segments = Vec::new();
        let mut file_offset = 0u64;
        for fragment in &chain.fragments {
            if let AttributeBody::NonResident { runs, .. } = &fragment.body {
                for run in runs {
                    let length = run.length_in_clusters * cluster_size as u64;
                    let source = match run.starting_lcn {
                        Some(lcn) => SegmentSource::Raw { lcn },
                        None => SegmentSource::Sparse,
                    };
                    segments.push(Segment {
                        file_offset,
                        length,
                        source,
                    });
                    file_offset += length;
                }
            }
        }

        let valid_data_size = chain.valid_data_size();
        if valid_data_size < data_size {
            segments.retain(|s| s.file_offset < valid_data_size);
            if let Some(last) = segments.last_mut() {
                if last.file_offset + last.length > valid_data_size {
                    last.length = valid_data_size - last.file_offset;
                }
            }
            segments.push(Segment {
                file_offset: valid_data_size,
                length: data_size - valid_data_size,
                source: SegmentSource::Sparse,
            });
        }

        Self {
            source,
            cluster_size,
            data_size,
            resident_data: None,
            segments,
            position: 0,
        }
    }

    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    pub fn position(&self) -> u64 {
        self.position
    }

    /// Moves the cursor; performs no I/O. `offset == data_size` is the
    /// valid "at EOF" position; anything past it is `Bounds::OutOfRange`.
    pub fn seek(&mut self, offset: u64) -> Result<()> {
        if offset > self.data_size {
            return Err(Bounds::OutOfRange {
                offset,
                length: self.data_size,
            }
            .into());
        }
        self.position = offset;
        Ok(())
    }

    /// Fills `buf` starting at the current position, advancing it by
    /// the number of bytes actually filled (0 at EOF, per spec.md §5
    /// "reading past the end of a stream is EOF, not an error").
    pub fn read(&mut self, buf: &mut [u8], mut cache: Option<&mut StreamCache>) -> Result<usize> {
        if self.position >= self.data_size || buf.is_empty() {
            return Ok(0);
        }

        let available = self.data_size - self.position;
        let want = (buf.len() as u64).min(available) as usize;
        let mut filled = 0usize;

        while filled < want {
            let offset = self.position + filled as u64;
            match self.locate(offset) {
                Some((seg, intra)) => {
                    let seg_remaining = seg.length - intra;
                    let take = ((want - filled) as u64).min(seg_remaining) as usize;

                    match seg.source {
                        SegmentSource::Sparse => {
                            buf[filled..filled + take].fill(0);
                        }
                        SegmentSource::Resident => {
                            let data = self
                                .resident_data
                                .as_ref()
                                .expect("Resident segment always pairs with resident_data");
                            let start = intra as usize;
                            buf[filled..filled + take].copy_from_slice(&data[start..start + take]);
                        }
                        SegmentSource::Raw { lcn } => {
                            let abs = lcn.0 * self.cluster_size as u64 + intra;
                            read_cached(
                                self.source,
                                cache.as_deref_mut(),
                                abs,
                                self.cluster_size,
                                &mut buf[filled..filled + take],
                            )?;
                        }
                    }
                    filled += take;
                }
                None => {
                    // A gap between segments (allocation-unit rounding
                    // slack): treat as implicit sparse, per the
                    // "projection onto [0, data_size) is exactly
                    // data_size bytes" coverage invariant.
                    let next_start = self
                        .segments
                        .iter()
                        .map(|s| s.file_offset)
                        .find(|&fo| fo > offset)
                        .unwrap_or(self.data_size);
                    let take = ((want - filled) as u64).min(next_start - offset) as usize;
                    buf[filled..filled + take].fill(0);
                    filled += take;
                }
            }
        }

        self.position += filled as u64;
        Ok(filled)
    }

    /// Lazily yields one [`Extent`] per segment, clipped to
    /// `[0, data_size)`.
    pub fn extents(&self) -> impl Iterator<Item = Extent> + '_ {
        self.segments.iter().filter_map(move |s| {
            if s.file_offset >= self.data_size {
                return None;
            }
            let end = (s.file_offset + s.length).min(self.data_size);
            if end <= s.file_offset {
                return None;
            }
            Some(Extent {
                file_offset: s.file_offset,
                length: end - s.file_offset,
                sparse: matches!(s.source, SegmentSource::Sparse),
            })
        })
    }

    fn locate(&self, offset: u64) -> Option<(&Segment, u64)> {
        let idx = self.segments.partition_point(|s| s.file_offset <= offset);
        if idx == 0 {
            return None;
        }
        let seg = &self.segments[idx - 1];
        if offset < seg.file_offset + seg.length {
            Some((seg, offset - seg.file_offset))
        } else {
            None
        }
    }
}
