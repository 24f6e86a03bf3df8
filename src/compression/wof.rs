//! §4.I: WOF (Windows Overlay Filter) chunk-offset table.
//!
//! Per-file compression stores the uncompressed logical size in a
//! reparse point and the compressed stream as the default `$DATA`.
//! The first part of `$DATA` is a table of chunk end-offsets.

use crate::error::{MalformedOnDisk, Result};

/// WOF method byte, as carried in the reparse point (§4.H table).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WofMethod {
    LzxpressHuffman4K,
    Lzx32K,
    LzxpressHuffman8K,
    LzxpressHuffman16K,
    Unregistered(u8),
}

impl WofMethod {
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::LzxpressHuffman4K,
            1 => Self::Lzx32K,
            2 => Self::LzxpressHuffman8K,
            3 => Self::LzxpressHuffman16K,
            other => Self::Unregistered(other),
        }
    }

    pub fn compression_unit_size(self) -> Option<u64> {
        match self {
            Self::LzxpressHuffman4K => Some(4 * 1024),
            Self::Lzx32K => Some(32 * 1024),
            Self::LzxpressHuffman8K => Some(8 * 1024),
            Self::LzxpressHuffman16K => Some(16 * 1024),
            Self::Unregistered(_) => None,
        }
    }
}

/// Random-access view over a WOF chunk-offset table.
#[derive(Debug, Clone)]
pub struct ChunkOffsetTable {
    /// `table[i]` is the end offset of chunk `i`, relative to the end
    /// of the offsets table; `table.len() == chunk_count`.
    offsets: Vec<u64>,
    /// Byte length of the offsets table itself, i.e. the base every
    /// entry in `offsets` is relative to.
    table_byte_len: u64,
    compressed_size: u64,
}

/// `N = ceil(logical_size / cu_size) - 1` (§4.I step 1): the number of
/// offset-table entries for a stream of `logical_size` uncompressed
/// bytes grouped into `cu_size`-byte compression units.
pub fn entry_count_for_logical_size(logical_size: u64, cu_size: u64) -> usize {
    logical_size.div_ceil(cu_size).saturating_sub(1) as usize
}

impl ChunkOffsetTable {
    /// Parses an offset table of `entry_count` entries out of the
    /// head of `$DATA`. `compressed_size` is the full `$DATA`
    /// attribute size, used both to pick the entry width (4 vs. 8
    /// bytes) and as the upper bound every entry must respect.
    pub fn parse(data: &[u8], entry_count: usize, compressed_size: u64) -> Result<Self> {
        let entry_size: usize = if compressed_size <= u32::MAX as u64 { 4 } else { 8 };

        let table_bytes = entry_count * entry_size;
        if data.len() < table_bytes {
            return Err(MalformedOnDisk::TruncatedRecord {
                length: table_bytes,
                record_size: data.len(),
            }
            .into());
        }

        let mut offsets = Vec::with_capacity(entry_count + 1);
        let mut previous = 0u64;
        for i in 0..entry_count {
            let start = i * entry_size;
            let value = if entry_size == 4 {
                u32::from_le_bytes(data[start..start + 4].try_into().unwrap()) as u64
            } else {
                u64::from_le_bytes(data[start..start + 8].try_into().unwrap())
            };
            if value < previous || value >= compressed_size {
                return Err(MalformedOnDisk::NonMonotonicChunkTable {
                    index: i,
                    value,
                    compressed_size,
                }
                .into());
            }
            offsets.push(value);
            previous = value;
        }
        let table_byte_len = table_bytes as u64;

        Ok(Self {
            offsets,
            table_byte_len,
            compressed_size,
        })
    }

    /// `N` stored offsets describe `N + 1` logical chunks: the last
    /// chunk's end is the virtual entry bounded by `compressed_size`,
    /// not a stored offset.
    pub fn chunk_count(&self) -> usize {
        self.offsets.len() + 1
    }

    /// The `[start, end)` absolute byte range of chunk `i` within
    /// `$DATA` (i.e. already shifted past the offsets table).
    pub fn chunk_byte_range(&self, index: usize) -> Option<(u64, u64)> {
        if index >= self.chunk_count() {
            return None;
        }
        let end = if index == self.offsets.len() {
            self.compressed_size
        } else {
            self.table_byte_len + self.offsets[index]
        };
        let start = if index == 0 {
            self.table_byte_len
        } else {
            self.table_byte_len + self.offsets[index - 1]
        };
        Some((start, end))
    }

    pub fn table_byte_len(&self) -> u64 {
        self.table_byte_len
    }

    pub fn compressed_size(&self) -> u64 {
        self.compressed_size
    }
}
