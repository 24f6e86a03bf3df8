//! Tunables left open by the spec as "suggested bounds".

/// Configuration for the stream cache (§4.J). All fields have the
/// spec's suggested defaults; nothing else in this crate is
/// configurable (there is no on-disk config file).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Number of `cluster_size` buckets in the raw cluster cache.
    pub raw_cluster_cache_capacity: usize,
    /// Number of `cu_size` buckets in the decompressed compression-unit cache.
    pub compression_unit_cache_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            raw_cluster_cache_capacity: 1024,
            compression_unit_cache_capacity: 64,
        }
    }
}
