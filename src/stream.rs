//! §3.1 `StreamDescriptor`: the public facade over one resolved
//! attribute's byte stream, choosing the uncompressed
//! ([`crate::cluster_stream`]) or compressed ([`crate::decoder`])
//! path.
//!
//! Not `Clone` (§9 open question: the C source's
//! `cluster_block_stream_data_handle_clone` is an incomplete
//! `TODO`-marked stub; this crate builds a fresh stream from the
//! owning [`AttributeChain`] instead of cloning one).

use crate::attribute_chain::AttributeChain;
use crate::block_io::BlockSource;
use crate::cache::{StreamCache, StreamId};
use crate::cluster_stream::{ClusterBlockStream, Extent};
use crate::decoder::Decoder;
use crate::error::{Bounds, Result};

enum Body<'a, B: BlockSource> {
    Uncompressed(ClusterBlockStream<'a, B>),
    Compressed {
        decoder: Decoder<'a, B>,
        position: u64,
        data_size: u64,
    },
}

/// A ready-to-read view of one attribute's logical byte content.
pub struct StreamDescriptor<'a, B: BlockSource> {
    body: Body<'a, B>,
}

impl<'a, B: BlockSource> StreamDescriptor<'a, B> {
    /// Builds a stream for `chain`, picking the compressed path when
    /// any fragment carries the NTFS compression flag.
    pub fn new(chain: &AttributeChain, source: &'a B, cluster_size: u32, stream_id: StreamId) -> Self {
        let is_compressed = chain
            .fragments
            .first()
            .map(|f| f.data_flags.contains(crate::attribute::AttributeDataFlags::COMPRESSED))
            .unwrap_or(false);

        let body = if is_compressed {
            Body::Compressed {
                decoder: Decoder::new(chain, source, cluster_size, stream_id),
                position: 0,
                data_size: chain.data_size(),
            }
        } else {
            Body::Uncompressed(ClusterBlockStream::new(chain, source, cluster_size))
        };

        Self { body }
    }

    pub fn data_size(&self) -> u64 {
        match &self.body {
            Body::Uncompressed(stream) => stream.data_size(),
            Body::Compressed { data_size, .. } => *data_size,
        }
    }

    pub fn seek(&mut self, offset: u64) -> Result<()> {
        match &mut self.body {
            Body::Uncompressed(stream) => stream.seek(offset),
            Body::Compressed { position, data_size, .. } => {
                if offset > *data_size {
                    return Err(Bounds::OutOfRange {
                        offset,
                        length: *data_size,
                    }
                    .into());
                }
                *position = offset;
                Ok(())
            }
        }
    }

    pub fn read(&mut self, buf: &mut [u8], cache: Option<&mut StreamCache>) -> Result<usize> {
        match &mut self.body {
            Body::Uncompressed(stream) => stream.read(buf, cache),
            Body::Compressed { decoder, position, .. } => {
                let n = decoder.read(*position, buf, cache)?;
                *position += n as u64;
                Ok(n)
            }
        }
    }

    /// Lazy extent iterator; only meaningful for the uncompressed
    /// path (a compressed stream's extents are its compression
    /// units, not exposed here — see [`crate::compression::unit`]).
    pub fn extents(&self) -> Option<impl Iterator<Item = Extent> + '_> {
        match &self.body {
            Body::Uncompressed(stream) => Some(stream.extents()),
            Body::Compressed { .. } => None,
        }
    }
}
