//! §4.G-§4.I: the compression-unit engine.
//!
//! [`unit`] groups an attribute's cluster runs into compression
//! units; [`lznt1`] decodes the NTFS-native codec in-tree; [`wof`]
//! parses the chunk-offset table used by per-file WOF/System
//! Compression; [`external`] is the pluggable contract for the
//! Windows methods this crate does not vendor (LZXPRESS-Huffman, LZX).

pub mod external;
pub mod lznt1;
pub mod unit;
pub mod wof;

pub use unit::{build_units, CompressionUnit, UnitKind, UnitSegment};
