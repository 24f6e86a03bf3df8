//! §4.H: LZNT1 codec, one compression unit at a time.
//!
//! A unit is a series of chunks, each at most 4 KiB decompressed.
//! Adaptive split/mask/threshold state resets at the start of every
//! chunk (it is scoped to the chunk, not the unit).

use crate::error::{MalformedOnDisk, Result};

const CHUNK_HEADER_SIZE_MASK: u16 = 0x0FFF;
const CHUNK_HEADER_COMPRESSED_FLAG: u16 = 0x8000;
const TAG_GROUP_SIZE: usize = 8;
const INITIAL_SPLIT: usize = 12;
const INITIAL_THRESHOLD: usize = 16;
const CHUNK_DECOMPRESSED_LIMIT: usize = 4096;

/// Decompresses one compression unit's worth of chunks, stopping at a
/// zero chunk header (sentinel "rest of unit is zero") or at `input`
/// exhaustion. Returns the decompressed bytes, which may be shorter
/// than the unit's nominal size when the sentinel fires early.
pub fn decompress_unit(input: &[u8]) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(input.len() * 2);
    let mut pos = 0usize;

    while pos < input.len() {
        if pos + 2 > input.len() {
            return Err(MalformedOnDisk::TruncatedRun { position: pos }.into());
        }
        let header = u16::from_le_bytes([input[pos], input[pos + 1]]);
        pos += 2;

        if header == 0 {
            break;
        }

        let chunk_length = ((header & CHUNK_HEADER_SIZE_MASK) + 1) as usize;
        let is_compressed = header & CHUNK_HEADER_COMPRESSED_FLAG != 0;

        if pos + chunk_length > input.len() {
            return Err(MalformedOnDisk::TruncatedRun { position: pos }.into());
        }
        let chunk = &input[pos..pos + chunk_length];
        pos += chunk_length;

        if is_compressed {
            decompress_chunk(chunk, &mut output)?;
        } else {
            if chunk.len() > CHUNK_DECOMPRESSED_LIMIT {
                return Err(MalformedOnDisk::DecompressorOverrun { length: chunk.len() }.into());
            }
            output.extend_from_slice(chunk);
        }
    }

    Ok(output)
}

fn decompress_chunk(input: &[u8], output: &mut Vec<u8>) -> Result<()> {
    let chunk_start = output.len();
    let mut pos = 0usize;

    let mut split = INITIAL_SPLIT;
    let mut mask = (1usize << split) - 1;
    let mut threshold = INITIAL_THRESHOLD;

    while pos < input.len() {
        let tag_byte = input[pos];
        pos += 1;

        for bit in 0..TAG_GROUP_SIZE {
            if pos >= input.len() {
                break;
            }

            if tag_byte & (1 << bit) != 0 {
                if pos + 2 > input.len() {
                    return Err(MalformedOnDisk::TruncatedRun { position: pos }.into());
                }
                let token = u16::from_le_bytes([input[pos], input[pos + 1]]) as usize;
                pos += 2;

                let length = (token & mask) + 3;
                let offset = (token >> split) + 1;

                if offset > output.len() {
                    return Err(MalformedOnDisk::BadBackReference {
                        offset,
                        position: output.len(),
                    }
                    .into());
                }
                let src_start = output.len() - offset;
                for k in 0..length {
                    let byte = output[src_start + k];
                    output.push(byte);
                }
            } else {
                output.push(input[pos]);
                pos += 1;
            }

            let produced = output.len() - chunk_start;
            if produced > CHUNK_DECOMPRESSED_LIMIT {
                return Err(MalformedOnDisk::DecompressorOverrun { length: produced }.into());
            }
            while produced > threshold {
                if split > 0 {
                    split -= 1;
                    mask = (1usize << split) - 1;
                }
                threshold <<= 1;
            }
        }
    }

    Ok(())
}
