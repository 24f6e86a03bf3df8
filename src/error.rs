//! Error taxonomy for the stream resolution and decoding pipeline.
//!
//! Every fallible operation in this crate returns [`Error`]. Errors are
//! surfaced verbatim to the caller; nothing here logs or silently
//! recovers, except reading past the end of a stream, which is EOF
//! (`Ok(0)`), not an error.

use thiserror::Error as ThisError;

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error kind, grouping the taxonomy described in the spec.
#[derive(Debug, ThisError)]
pub enum Error {
    #[error(transparent)]
    MalformedOnDisk(#[from] MalformedOnDisk),

    #[error(transparent)]
    Unsupported(#[from] Unsupported),

    #[error("I/O error: {0}")]
    Io(#[from] crate::block_io::IoError),

    #[error(transparent)]
    Bounds(#[from] Bounds),
}

/// Sub-kinds of "the image violates an on-disk invariant".
#[derive(Debug, ThisError)]
pub enum MalformedOnDisk {
    #[error("attribute record length {length} exceeds enclosing MFT record of {record_size} bytes")]
    TruncatedRecord { length: usize, record_size: usize },

    #[error("offset/length {offset}+{length} escapes the enclosing record of {record_size} bytes")]
    InvalidBounds {
        offset: usize,
        length: usize,
        record_size: usize,
    },

    #[error("data run header/operand at byte {position} runs past the end of the mapping-pairs block")]
    TruncatedRun { position: usize },

    #[error("computed LCN {lcn} is out of range for a volume of {volume_cluster_count} clusters")]
    LcnOutOfRange { lcn: i128, volume_cluster_count: u64 },

    #[error("attribute fragment first_vcn {first_vcn} does not follow the previous fragment's last_vcn {previous_last_vcn}")]
    VcnGap {
        first_vcn: u64,
        previous_last_vcn: u64,
    },

    #[error("attribute fragment compression unit size ({found}) differs from the chain's established size ({expected})")]
    InconsistentCompression { expected: u64, found: u64 },

    #[error("back-reference offset {offset} exceeds current output position {position}")]
    BadBackReference { offset: usize, position: usize },

    #[error("compression unit produced {produced} bytes, expected {expected}")]
    ShortUnit { produced: usize, expected: usize },

    #[error("decompressed chunk length {length} exceeds the 4 KiB chunk limit")]
    DecompressorOverrun { length: usize },

    #[error("WOF chunk-offset table entry {index} ({value}) is not monotonic or exceeds the compressed stream size {compressed_size}")]
    NonMonotonicChunkTable {
        index: usize,
        value: u64,
        compressed_size: u64,
    },
}

/// The image is well-formed but uses a feature this crate does not decode.
#[derive(Debug, ThisError)]
pub enum Unsupported {
    #[error("attribute carries the compressed flag with compression_unit_log2 == 0")]
    UnsupportedCompressionFlag,

    #[error("no decoder registered for WOF compression method {method}")]
    UnregisteredWofMethod { method: u8 },

    #[error("attribute is encrypted; decryption is out of scope")]
    Encrypted,
}

/// Client asked for bytes past EOF or out of a logical range.
#[derive(Debug, ThisError)]
pub enum Bounds {
    #[error("seek/read offset {offset} exceeds stream length {length}")]
    OutOfRange { offset: u64, length: u64 },
}

/// `type_code == 0xFFFFFFFF`: not an error, a parsing sentinel.
///
/// Kept as a distinct type (rather than folded into [`Error`]) because,
/// per the attribute-record parser's contract, it does not produce a
/// record and callers branch on it explicitly rather than treating it
/// as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndOfList;
