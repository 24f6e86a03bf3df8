//! Small newtypes shared across the pipeline.

use std::fmt;

/// Virtual Cluster Number: a logical cluster index within one file's
/// data, starting at 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vcn(pub u64);

/// Logical Cluster Number: a physical cluster index within the volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Lcn(pub u64);

impl fmt::Display for Vcn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for Lcn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An NTFS file reference: a 48-bit MFT record number plus a 16-bit
/// sequence number, packed into the 64-bit on-disk representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FileReference {
    pub record_number: u64,
    pub sequence_number: u16,
}

impl FileReference {
    pub fn from_raw(raw: u64) -> Self {
        Self {
            record_number: raw & 0x0000_FFFF_FFFF_FFFF,
            sequence_number: ((raw >> 48) & 0xFFFF) as u16,
        }
    }

    pub fn to_raw(self) -> u64 {
        (self.record_number & 0x0000_FFFF_FFFF_FFFF) | ((self.sequence_number as u64) << 48)
    }
}

/// A 16-byte GUID, stored in its on-disk mixed-endian layout and
/// rendered in the canonical hyphenated form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Guid(pub [u8; 16]);

impl Guid {
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        let array: [u8; 16] = bytes.get(0..16)?.try_into().ok()?;
        Some(Self(array))
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.0;
        write!(
            f,
            "{:02x}{:02x}{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}-{:02x}{:02x}{:02x}{:02x}{:02x}{:02x}",
            b[3], b[2], b[1], b[0],
            b[5], b[4],
            b[7], b[6],
            b[8], b[9],
            b[10], b[11], b[12], b[13], b[14], b[15]
        )
    }
}

/// Decodes a little-endian UTF-16 byte slice (as stored in NTFS names)
/// into a `String`, lossily replacing unpaired surrogates.
pub fn decode_utf16_name(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_reference_round_trips() {
        let reference = FileReference {
            record_number: 42,
            sequence_number: 7,
        };
        assert_eq!(FileReference::from_raw(reference.to_raw()), reference);
    }

    #[test]
    fn guid_formats_canonically() {
        let bytes: [u8; 16] = [
            0x03, 0x02, 0x01, 0x00, 0x05, 0x04, 0x07, 0x06, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d,
            0x0e, 0x0f,
        ];
        let guid = Guid(bytes);
        assert_eq!(
            guid.to_string(),
            "00010203-0405-0607-0809-0a0b0c0d0e0f"
        );
    }

    #[test]
    fn decode_utf16_name_round_trips_ascii() {
        let name = "Hello";
        let utf16: Vec<u8> = name
            .encode_utf16()
            .flat_map(|u| u.to_le_bytes())
            .collect();
        assert_eq!(decode_utf16_name(&utf16), name);
    }
}
