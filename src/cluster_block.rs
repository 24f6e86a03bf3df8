//! §4.E: cluster block.
//!
//! Wraps a single cluster-sized read. Establishes the cache key for
//! the raw cluster cache (§4.J): `(volume_byte_offset, cluster_size)`.

use std::rc::Rc;

use crate::block_io::BlockSource;
use crate::cache::StreamCache;
use crate::error::Result;

/// Fixed-size buffer of `cluster_size` bytes, plus the absolute byte
/// offset it was read from. Immutable after read.
#[derive(Debug, Clone)]
pub struct ClusterBlock {
    pub offset: u64,
    pub data: Vec<u8>,
}

impl ClusterBlock {
    /// Reads one cluster-sized block at `offset` from `source`.
    pub fn read<B: BlockSource>(source: &B, offset: u64, cluster_size: u32) -> Result<Self> {
        let mut data = vec![0u8; cluster_size as usize];
        source.read_at(offset, &mut data)?;
        Ok(Self { offset, data })
    }
}

/// Reads `buf.len()` bytes starting at `absolute_offset`, going
/// through the raw cluster cache one `cluster_size`-aligned block at
/// a time when a cache is supplied, so that a cache hit returns bytes
/// bitwise identical to a cache miss (§8.1 "Read idempotence").
pub fn read_cached<B: BlockSource>(
    source: &B,
    mut cache: Option<&mut StreamCache>,
    absolute_offset: u64,
    cluster_size: u32,
    buf: &mut [u8],
) -> Result<()> {
    let cluster_size = cluster_size as u64;
    let mut remaining = buf;
    let mut offset = absolute_offset;

    while !remaining.is_empty() {
        let cluster_start = (offset / cluster_size) * cluster_size;
        let intra_cluster_offset = (offset - cluster_start) as usize;
        let take = remaining
            .len()
            .min(cluster_size as usize - intra_cluster_offset);

        let cluster_data: Rc<[u8]> = match cache.as_deref_mut().and_then(|c| c.get_cluster(cluster_start)) {
            Some(data) => data,
            None => {
                let block = ClusterBlock::read(source, cluster_start, cluster_size as u32)?;
                let data: Rc<[u8]> = Rc::from(block.data.into_boxed_slice());
                if let Some(c) = cache.as_deref_mut() {
                    c.insert_cluster(cluster_start, data.clone());
                }
                data
            }
        };

        let (head, tail) = remaining.split_at_mut(take);
        head.copy_from_slice(&cluster_data[intra_cluster_offset..intra_cluster_offset + take]);

        offset += take as u64;
        remaining = tail;
    }

    Ok(())
}
