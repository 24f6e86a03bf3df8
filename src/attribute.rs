//! §4.B: MFT attribute record parser.

use bitflags::bitflags;

use crate::data_run::{decode_data_runs, DataRun};
use crate::error::{Error, MalformedOnDisk, Result, Unsupported};
use crate::types::decode_utf16_name;

/// §6.1 NTFS attribute type codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    StandardInformation,
    AttributeList,
    FileName,
    ObjectId,
    SecurityDescriptor,
    VolumeName,
    VolumeInformation,
    Data,
    IndexRoot,
    IndexAllocation,
    Bitmap,
    ReparsePoint,
    EaInformation,
    Ea,
    Other(u32),
}

impl AttributeType {
    pub fn from_code(code: u32) -> Self {
        match code {
            0x10 => Self::StandardInformation,
            0x20 => Self::AttributeList,
            0x30 => Self::FileName,
            0x40 => Self::ObjectId,
            0x50 => Self::SecurityDescriptor,
            0x60 => Self::VolumeName,
            0x70 => Self::VolumeInformation,
            0x80 => Self::Data,
            0x90 => Self::IndexRoot,
            0xA0 => Self::IndexAllocation,
            0xB0 => Self::Bitmap,
            0xC0 => Self::ReparsePoint,
            0xD0 => Self::EaInformation,
            0xE0 => Self::Ea,
            other => Self::Other(other),
        }
    }

    pub fn code(self) -> u32 {
        match self {
            Self::StandardInformation => 0x10,
            Self::AttributeList => 0x20,
            Self::FileName => 0x30,
            Self::ObjectId => 0x40,
            Self::SecurityDescriptor => 0x50,
            Self::VolumeName => 0x60,
            Self::VolumeInformation => 0x70,
            Self::Data => 0x80,
            Self::IndexRoot => 0x90,
            Self::IndexAllocation => 0xA0,
            Self::Bitmap => 0xB0,
            Self::ReparsePoint => 0xC0,
            Self::EaInformation => 0xD0,
            Self::Ea => 0xE0,
            Self::Other(code) => code,
        }
    }
}

pub const END_OF_LIST_TYPE_CODE: u32 = 0xFFFF_FFFF;

bitflags! {
    /// Bits of the on-disk `data_flags` field (§3.1).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct AttributeDataFlags: u16 {
        const COMPRESSED = 0x0001;
        const ENCRYPTED  = 0x4000;
        const SPARSE     = 0x8000;
    }
}

/// The resident or non-resident body of an [`AttributeRecord`].
#[derive(Debug, Clone)]
pub enum AttributeBody {
    Resident { data: Vec<u8> },
    NonResident {
        first_vcn: u64,
        last_vcn: u64,
        allocated_size: u64,
        data_size: u64,
        valid_data_size: u64,
        compression_unit_log2: u8,
        runs: Vec<DataRun>,
    },
}

/// One parsed `$ATTRIBUTE` header (§3.1).
#[derive(Debug, Clone)]
pub struct AttributeRecord {
    pub type_code: u32,
    pub data_flags: AttributeDataFlags,
    pub name: Option<String>,
    pub identifier: u16,
    pub body: AttributeBody,
}

impl AttributeRecord {
    pub fn attribute_type(&self) -> AttributeType {
        AttributeType::from_code(self.type_code)
    }

    pub fn is_resident(&self) -> bool {
        matches!(self.body, AttributeBody::Resident { .. })
    }

    /// The attribute's logical size: resident data length, or
    /// non-resident `data_size`.
    pub fn data_size(&self) -> u64 {
        match &self.body {
            AttributeBody::Resident { data } => data.len() as u64,
            AttributeBody::NonResident { data_size, .. } => *data_size,
        }
    }
}

/// Parses one attribute starting at `offset` within `record`.
///
/// Returns the parsed record and the number of bytes consumed,
/// `Ok(None)` at the end-of-list sentinel, or an error for a
/// malformed attribute.
pub fn parse_attribute_record(
    record: &[u8],
    offset: usize,
    cluster_size: u32,
    volume_cluster_count: u64,
) -> Result<Option<(AttributeRecord, usize)>> {
    if offset + 16 > record.len() {
        return Err(MalformedOnDisk::InvalidBounds {
            offset,
            length: 16,
            record_size: record.len(),
        }
        .into());
    }

    let type_code = u32::from_le_bytes(record[offset..offset + 4].try_into().unwrap());
    if type_code == END_OF_LIST_TYPE_CODE {
        return Ok(None);
    }

    let record_length = u32::from_le_bytes(record[offset + 4..offset + 8].try_into().unwrap()) as usize;
    if record_length == 0 || offset + record_length > record.len() {
        return Err(MalformedOnDisk::TruncatedRecord {
            length: record_length,
            record_size: record.len(),
        }
        .into());
    }

    let non_resident_flag = record[offset + 8];
    let name_length = record[offset + 9] as usize;
    let name_offset = u16::from_le_bytes(record[offset + 10..offset + 12].try_into().unwrap()) as usize;
    let data_flags_raw = u16::from_le_bytes(record[offset + 12..offset + 14].try_into().unwrap());
    let identifier = u16::from_le_bytes(record[offset + 14..offset + 16].try_into().unwrap());
    let data_flags = AttributeDataFlags::from_bits_truncate(data_flags_raw);

    let attr = &record[offset..offset + record_length];

    let name = if name_length > 0 {
        let name_start = name_offset;
        let name_end = name_start + name_length * 2;
        if name_end > attr.len() {
            return Err(MalformedOnDisk::InvalidBounds {
                offset: offset + name_start,
                length: name_length * 2,
                record_size: record.len(),
            }
            .into());
        }
        Some(decode_utf16_name(&attr[name_start..name_end]))
    } else {
        None
    };

    let body = if non_resident_flag == 0 {
        parse_resident_body(attr, offset, record.len())?
    } else {
        parse_non_resident_body(attr, offset, record.len(), cluster_size, volume_cluster_count)?
    };

    if data_flags.contains(AttributeDataFlags::COMPRESSED) {
        let compression_unit_log2 = match &body {
            AttributeBody::NonResident {
                compression_unit_log2,
                ..
            } => *compression_unit_log2,
            AttributeBody::Resident { .. } => 0,
        };
        if compression_unit_log2 == 0 {
            return Err(Error::from(Unsupported::UnsupportedCompressionFlag));
        }
    }

    Ok(Some((
        AttributeRecord {
            type_code,
            data_flags,
            name,
            identifier,
            body,
        },
        record_length,
    )))
}

fn parse_resident_body(attr: &[u8], offset: usize, record_size: usize) -> Result<AttributeBody> {
    if attr.len() < 24 {
        return Err(MalformedOnDisk::InvalidBounds {
            offset,
            length: 24,
            record_size,
        }
        .into());
    }
    let data_size = u32::from_le_bytes(attr[16..20].try_into().unwrap()) as usize;
    let data_offset = u16::from_le_bytes(attr[20..22].try_into().unwrap()) as usize;

    if data_offset + data_size > attr.len() {
        return Err(MalformedOnDisk::InvalidBounds {
            offset: offset + data_offset,
            length: data_size,
            record_size,
        }
        .into());
    }

    Ok(AttributeBody::Resident {
        data: attr[data_offset..data_offset + data_size].to_vec(),
    })
}

fn parse_non_resident_body(
    attr: &[u8],
    offset: usize,
    record_size: usize,
    cluster_size: u32,
    volume_cluster_count: u64,
) -> Result<AttributeBody> {
    if attr.len() < 64 {
        return Err(MalformedOnDisk::InvalidBounds {
            offset,
            length: 64,
            record_size,
        }
        .into());
    }

    let first_vcn = u64::from_le_bytes(attr[16..24].try_into().unwrap());
    let last_vcn = u64::from_le_bytes(attr[24..32].try_into().unwrap());
    let mapping_pairs_offset = u16::from_le_bytes(attr[32..34].try_into().unwrap()) as usize;
    let compression_unit_log2 = attr[34];
    let allocated_size = u64::from_le_bytes(attr[40..48].try_into().unwrap());
    let data_size = u64::from_le_bytes(attr[48..56].try_into().unwrap());
    let valid_data_size = u64::from_le_bytes(attr[56..64].try_into().unwrap());

    if mapping_pairs_offset > attr.len() {
        return Err(MalformedOnDisk::InvalidBounds {
            offset: offset + mapping_pairs_offset,
            length: 0,
            record_size,
        }
        .into());
    }

    let mapping_pairs = &attr[mapping_pairs_offset..];
    let runs = decode_data_runs(mapping_pairs, 0, volume_cluster_count)?;

    if runs.is_empty() && data_size > 0 {
        return Err(MalformedOnDisk::VcnGap {
            first_vcn: 0,
            previous_last_vcn: 0,
        }
        .into());
    }

    let _ = cluster_size; // VCN<->byte conversion happens in the cluster stream layer.

    Ok(AttributeBody::NonResident {
        first_vcn,
        last_vcn,
        allocated_size,
        data_size,
        valid_data_size,
        compression_unit_log2: compression_unit_log2 as u8,
        runs,
    })
}
