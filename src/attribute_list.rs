//! `$ATTRIBUTE_LIST` entry parsing, used by the attribute chain
//! builder (§4.D) to discover which MFT records host the fragments of
//! an attribute that spilled out of its base record.

use crate::error::{MalformedOnDisk, Result};
use crate::types::{decode_utf16_name, FileReference};

/// One entry of a (possibly multi-record) `$ATTRIBUTE_LIST`.
#[derive(Debug, Clone)]
pub struct AttributeListEntry {
    pub type_code: u32,
    pub name: Option<String>,
    pub first_vcn: u64,
    pub base_record: FileReference,
    pub attribute_id: u16,
}

/// Parses every entry out of one `$ATTRIBUTE_LIST` attribute's
/// (already-resolved, contiguous) content buffer.
pub fn parse_attribute_list(content: &[u8]) -> Result<Vec<AttributeListEntry>> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while offset + 8 <= content.len() {
        let type_code = u32::from_le_bytes(content[offset..offset + 4].try_into().unwrap());
        let entry_length = u16::from_le_bytes(content[offset + 4..offset + 6].try_into().unwrap()) as usize;
        if entry_length == 0 {
            break;
        }
        if offset + entry_length > content.len() {
            return Err(MalformedOnDisk::TruncatedRecord {
                length: entry_length,
                record_size: content.len(),
            }
            .into());
        }

        let name_length = content[offset + 6] as usize;
        let name_offset = content[offset + 7] as usize;
        let first_vcn = u64::from_le_bytes(content[offset + 8..offset + 16].try_into().unwrap());
        let base_reference = u64::from_le_bytes(content[offset + 16..offset + 24].try_into().unwrap());
        let attribute_id = u16::from_le_bytes(content[offset + 24..offset + 26].try_into().unwrap());

        let name = if name_length > 0 {
            let start = offset + name_offset;
            let end = start + name_length * 2;
            if end > content.len() {
                return Err(MalformedOnDisk::InvalidBounds {
                    offset: start,
                    length: name_length * 2,
                    record_size: content.len(),
                }
                .into());
            }
            Some(decode_utf16_name(&content[start..end]))
        } else {
            None
        };

        entries.push(AttributeListEntry {
            type_code,
            name,
            first_vcn,
            base_record: FileReference::from_raw(base_reference),
            attribute_id,
        });

        offset += entry_length;
    }

    Ok(entries)
}
