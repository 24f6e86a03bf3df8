//! §4.J: stream cache.
//!
//! A two-tier bounded LRU: raw cluster blocks, keyed by absolute
//! volume byte offset, and decompressed compression units, keyed by
//! `(stream_id, unit_index)`. Write-through for reads only; both
//! tiers are optional in the sense that a miss always falls through
//! to a fresh read/decode (see [`StreamCache::get_cluster`] callers
//! in `cluster_stream.rs` / `decoder.rs`).
//!
//! Not `Sync`. Per spec.md §5, a caller sharing one cache across
//! threads wraps it in its own lock; this crate does not provide one.

use std::num::NonZeroUsize;
use std::rc::Rc;

use lru::LruCache;

use crate::config::Config;

/// A unique identifier for one stream's decompressed-unit cache
/// entries, chosen by the caller constructing a [`crate::stream::StreamDescriptor`]
/// (typically derived from the owning attribute's MFT record number
/// and attribute identifier).
pub type StreamId = u64;

pub struct StreamCache {
    raw_clusters: LruCache<u64, Rc<[u8]>>,
    compression_units: LruCache<(StreamId, u64), Rc<[u8]>>,
}

fn capacity(n: usize) -> NonZeroUsize {
    NonZeroUsize::new(n).unwrap_or(NonZeroUsize::new(1).expect("1 is nonzero"))
}

impl StreamCache {
    pub fn new(config: &Config) -> Self {
        Self {
            raw_clusters: LruCache::new(capacity(config.raw_cluster_cache_capacity)),
            compression_units: LruCache::new(capacity(config.compression_unit_cache_capacity)),
        }
    }

    pub fn get_cluster(&mut self, volume_byte_offset: u64) -> Option<Rc<[u8]>> {
        self.raw_clusters.get(&volume_byte_offset).cloned()
    }

    pub fn insert_cluster(&mut self, volume_byte_offset: u64, data: Rc<[u8]>) {
        self.raw_clusters.put(volume_byte_offset, data);
    }

    pub fn get_compression_unit(&mut self, stream_id: StreamId, unit_index: u64) -> Option<Rc<[u8]>> {
        self.compression_units.get(&(stream_id, unit_index)).cloned()
    }

    pub fn insert_compression_unit(&mut self, stream_id: StreamId, unit_index: u64, data: Rc<[u8]>) {
        self.compression_units.put((stream_id, unit_index), data);
    }
}

impl Default for StreamCache {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}
