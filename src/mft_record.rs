//! MFT record framing: the `FILE` magic, multi-sector fixup, and
//! attribute iteration within one record. Also the `MftRecordSource`
//! external-collaborator trait the attribute chain builder (§4.D)
//! uses to load fragments' host records, plus one concrete,
//! fixup-aware implementation over a [`BlockSource`].

use crate::attribute::{parse_attribute_record, AttributeRecord};
use crate::block_io::{BlockSource, IoError};
use crate::error::{MalformedOnDisk, Result};
use crate::types::FileReference;

const MFT_RECORD_MAGIC: &[u8; 4] = b"FILE";
const SECTOR_SIZE: usize = 512;

/// Loads raw MFT record bytes by [`FileReference`]. An external
/// collaborator of the attribute chain builder (§4.D): the core
/// consumes this trait, it does not implement directory/volume
/// lookup of MFT records itself.
pub trait MftRecordSource {
    /// Fills `into` (which must be exactly `record_size()` bytes) with
    /// the raw, fixed-up bytes of the MFT record identified by
    /// `reference`.
    fn read_record(&self, reference: FileReference, into: &mut [u8]) -> std::result::Result<(), IoError>;

    /// The fixed MFT record size for this volume, in bytes.
    fn record_size(&self) -> u32;
}

/// Reads an MFT record directly out of a [`BlockSource`] at a known
/// per-volume geometry (`mft_offset + record_number * record_size`),
/// applying the fixup-sequence correction every NTFS record carries.
///
/// This is the one concrete, ready-to-use `MftRecordSource`: every
/// production NTFS reader performs the same fixup transformation, so
/// it is provided here rather than left for every caller to
/// reimplement. It is not a directory or volume-lifecycle facade.
pub struct MemoryMftRecordSource<'a, B: BlockSource> {
    source: &'a B,
    mft_offset: u64,
    record_size: u32,
}

impl<'a, B: BlockSource> MemoryMftRecordSource<'a, B> {
    pub fn new(source: &'a B, mft_offset: u64, record_size: u32) -> Self {
        Self {
            source,
            mft_offset,
            record_size,
        }
    }
}

impl<'a, B: BlockSource> MftRecordSource for MemoryMftRecordSource<'a, B> {
    fn read_record(&self, reference: FileReference, into: &mut [u8]) -> std::result::Result<(), IoError> {
        let offset = self.mft_offset + reference.record_number * self.record_size as u64;
        self.source.read_at(offset, into)?;
        apply_fixup(into).map_err(IoError::new)
    }

    fn record_size(&self) -> u32 {
        self.record_size
    }
}

/// Applies the NTFS fixup-sequence correction in place: the last two
/// bytes of every 512-byte sector are replaced with the sector's
/// original content, which was saved in the fixup array at the
/// record's `$FIXUP` offset; the sentinel bytes written in their
/// place on disk are verified against the fixup sequence number.
///
/// Grounded on `libfsntfs_mft_metadata_file.c`'s record fixup pass.
pub fn apply_fixup(record: &mut [u8]) -> std::result::Result<(), std::io::Error> {
    if record.len() < 8 || &record[0..4] != MFT_RECORD_MAGIC {
        return Err(std::io::Error::other("not an MFT record"));
    }

    let fixup_offset = u16::from_le_bytes([record[4], record[5]]) as usize;
    let fixup_count = u16::from_le_bytes([record[6], record[7]]) as usize;

    if fixup_count == 0 {
        return Ok(());
    }

    let sequence_number_end = fixup_offset + 2;
    if sequence_number_end > record.len() {
        return Err(std::io::Error::other("fixup array escapes record"));
    }
    let sequence_number = [record[fixup_offset], record[fixup_offset + 1]];

    for sector_index in 0..fixup_count.saturating_sub(1) {
        let entry_offset = fixup_offset + 2 + sector_index * 2;
        if entry_offset + 2 > record.len() {
            return Err(std::io::Error::other("fixup entry escapes record"));
        }
        let saved_bytes = [record[entry_offset], record[entry_offset + 1]];

        let sector_tail = sector_index * SECTOR_SIZE + (SECTOR_SIZE - 2);
        if sector_tail + 2 > record.len() {
            break;
        }
        if record[sector_tail] != sequence_number[0] || record[sector_tail + 1] != sequence_number[1] {
            return Err(std::io::Error::other(
                "fixup sequence number mismatch, record is corrupt",
            ));
        }
        record[sector_tail] = saved_bytes[0];
        record[sector_tail + 1] = saved_bytes[1];
    }

    Ok(())
}

/// Header fields of an MFT record relevant to the core and its
/// demonstration consumer.
#[derive(Debug, Clone, Copy)]
pub struct MftRecordHeader {
    pub sequence_number: u16,
    pub hardlink_count: u16,
    pub first_attribute_offset: u16,
    pub is_in_use: bool,
    pub is_directory: bool,
    pub record_number: u32,
}

/// Parses the fixed MFT record header (post-fixup).
pub fn parse_record_header(record: &[u8]) -> Result<MftRecordHeader> {
    if record.len() < 48 || &record[0..4] != MFT_RECORD_MAGIC {
        return Err(MalformedOnDisk::InvalidBounds {
            offset: 0,
            length: 48,
            record_size: record.len(),
        }
        .into());
    }
    let sequence_number = u16::from_le_bytes(record[16..18].try_into().unwrap());
    let hardlink_count = u16::from_le_bytes(record[18..20].try_into().unwrap());
    let first_attribute_offset = u16::from_le_bytes(record[20..22].try_into().unwrap());
    let flags = u16::from_le_bytes(record[22..24].try_into().unwrap());
    let record_number = u32::from_le_bytes(record[44..48].try_into().unwrap());

    Ok(MftRecordHeader {
        sequence_number,
        hardlink_count,
        first_attribute_offset,
        is_in_use: flags & 0x01 != 0,
        is_directory: flags & 0x02 != 0,
        record_number,
    })
}

/// Iterates every attribute in one MFT record, starting at
/// `first_attribute_offset`, stopping at the end-of-list sentinel.
pub fn iter_attributes(
    record: &[u8],
    first_attribute_offset: usize,
    cluster_size: u32,
    volume_cluster_count: u64,
) -> impl Iterator<Item = Result<AttributeRecord>> + '_ {
    let mut offset = first_attribute_offset;
    let mut done = false;

    std::iter::from_fn(move || {
        if done {
            return None;
        }
        match parse_attribute_record(record, offset, cluster_size, volume_cluster_count) {
            Ok(Some((attribute, consumed))) => {
                offset += consumed;
                Some(Ok(attribute))
            }
            Ok(None) => {
                done = true;
                None
            }
            Err(error) => {
                done = true;
                Some(Err(error))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_record_with_single_sector() -> Vec<u8> {
        let mut record = vec![0u8; SECTOR_SIZE];
        record[0..4].copy_from_slice(MFT_RECORD_MAGIC);
        record[4..6].copy_from_slice(&48u16.to_le_bytes()); // fixup offset
        record[6..8].copy_from_slice(&2u16.to_le_bytes()); // fixup count (1 sequence + 1 sector)
        record[48..50].copy_from_slice(&0xABCDu16.to_le_bytes());
        // Sentinel written at the sector's last 2 bytes, as on disk.
        record[SECTOR_SIZE - 2] = 0xAB;
        record[SECTOR_SIZE - 1] = 0xCD;
        record
    }

    #[test]
    fn fixup_restores_sector_tail() {
        let mut record = make_record_with_single_sector();
        // Original sector-tail bytes saved in the fixup array.
        record[50] = 0x11;
        record[51] = 0x22;
        apply_fixup(&mut record).unwrap();
        assert_eq!(&record[SECTOR_SIZE - 2..], &[0x11, 0x22]);
    }

    #[test]
    fn fixup_rejects_mismatched_sequence_number() {
        let mut record = make_record_with_single_sector();
        record[SECTOR_SIZE - 2] = 0x00; // corrupt sentinel
        let result = apply_fixup(&mut record);
        assert!(result.is_err());
    }
}
