//! §4.H: trait contract for the Windows compression methods this
//! crate does not implement in-tree (LZXPRESS-Huffman, LZX).
//!
//! LZNT1 (§4.H) is implemented directly in [`super::lznt1`]; these
//! methods are left pluggable, the same posture as `BlockSource` and
//! `MftRecordSource` — a caller who needs WOF methods 0-3 supplies a
//! decoder, this crate does not vendor one.

/// One registered external decompression method, keyed by the WOF
/// method byte (§4.I).
pub trait ExternalDecoder {
    /// Decompresses exactly one compression unit's worth of input
    /// into `dst`, returning the number of bytes written.
    fn decompress(&self, src: &[u8], dst: &mut [u8]) -> Result<usize, ExternalDecoderError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExternalDecoderError;

impl std::fmt::Display for ExternalDecoderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "external decompressor failed")
    }
}

impl std::error::Error for ExternalDecoderError {}
