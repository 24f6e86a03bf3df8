//! Read-only resolution and decoding of NTFS attribute streams:
//! parsing MFT attribute records, decoding data runs, stitching
//! attribute fragments that spilled into an `$ATTRIBUTE_LIST` back
//! together, presenting the result as a seekable byte stream, and
//! decoding LZNT1/WOF-compressed content on top of that stream.
//!
//! This crate does not know how to find an MFT record, walk a
//! directory, or open a volume — it consumes a [`block_io::BlockSource`]
//! and (for chained attributes) a [`mft_record::MftRecordSource`]
//! supplied by the caller. See `src/main.rs` for a minimal,
//! memory-mapped implementation of both.

pub mod attribute;
pub mod attribute_chain;
pub mod attribute_list;
pub mod attribute_value;
pub mod bitmap;
pub mod block_io;
pub mod cache;
pub mod cluster_block;
pub mod cluster_stream;
pub mod compression;
pub mod config;
pub mod data_run;
pub mod decoder;
pub mod error;
pub mod mft_record;
mod raw_read;
pub mod stream;
pub mod types;

pub use error::{Error, Result};
