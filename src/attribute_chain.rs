//! §4.D: attribute chaining.
//!
//! Stitches together attribute fragments that belong logically to one
//! stream but physically reside in multiple MFT entries referenced by
//! an `$ATTRIBUTE_LIST`.

use crate::attribute::{AttributeBody, AttributeRecord};
use crate::attribute_list::parse_attribute_list;
use crate::block_io::BlockSource;
use crate::error::{MalformedOnDisk, Result};
use crate::mft_record::{iter_attributes, parse_record_header, MftRecordSource};
use crate::raw_read::read_runs_to_vec;
use crate::types::FileReference;

/// A non-empty, VCN-contiguous ordered list of fragments sharing one
/// `(type_code, name)` (§3.1).
#[derive(Debug, Clone)]
pub struct AttributeChain {
    pub type_code: u32,
    pub name: Option<String>,
    pub fragments: Vec<AttributeRecord>,
}

impl AttributeChain {
    /// Logical size of the chained attribute: resident data length,
    /// or the non-resident `data_size` carried by every fragment.
    pub fn data_size(&self) -> u64 {
        self.fragments[0].data_size()
    }

    pub fn valid_data_size(&self) -> u64 {
        match &self.fragments[0].body {
            AttributeBody::NonResident { valid_data_size, .. } => *valid_data_size,
            AttributeBody::Resident { data } => data.len() as u64,
        }
    }

    pub fn is_resident(&self) -> bool {
        self.fragments.len() == 1 && self.fragments[0].is_resident()
    }

    pub fn compression_unit_log2(&self) -> u8 {
        match &self.fragments[0].body {
            AttributeBody::NonResident {
                compression_unit_log2,
                ..
            } => *compression_unit_log2,
            AttributeBody::Resident { .. } => 0,
        }
    }
}

/// Resolves the chain for `(type_code, name)` starting from
/// `base_record`, following `$ATTRIBUTE_LIST` fragments across MFT
/// records as needed. Returns `Ok(None)` if no attribute of that
/// `(type_code, name)` exists on this file.
pub fn resolve_attribute_chain<S, B>(
    base_record: &[u8],
    base_reference: FileReference,
    type_code: u32,
    name: Option<&str>,
    mft_source: &S,
    block_source: &B,
    cluster_size: u32,
    volume_cluster_count: u64,
) -> Result<Option<AttributeChain>>
where
    S: MftRecordSource,
    B: BlockSource,
{
    let header = parse_record_header(base_record)?;

    let mut direct_matches = Vec::new();
    let mut attribute_list_attr: Option<AttributeRecord> = None;

    for attribute in iter_attributes(
        base_record,
        header.first_attribute_offset as usize,
        cluster_size,
        volume_cluster_count,
    ) {
        let attribute = attribute?;
        if attribute.type_code == 0x20 {
            attribute_list_attr = Some(attribute);
            continue;
        }
        if attribute.type_code == type_code && attribute.name.as_deref() == name {
            direct_matches.push(attribute);
        }
    }

    let fragments = if let Some(list_attr) = attribute_list_attr {
        let list_content = attribute_content(&list_attr, block_source, cluster_size)?;
        let entries = parse_attribute_list(&list_content)?;

        let mut matching: Vec<_> = entries
            .into_iter()
            .filter(|e| e.type_code == type_code && e.name.as_deref() == name)
            .collect();
        matching.sort_by_key(|e| e.first_vcn);

        if matching.is_empty() {
            return Ok(None);
        }

        let record_size = mft_source.record_size() as usize;
        let mut record_buf = vec![0u8; record_size];
        let mut fragments = Vec::with_capacity(matching.len());

        for entry in &matching {
            let record_bytes: &[u8] = if entry.base_record == base_reference {
                base_record
            } else {
                mft_source
                    .read_record(entry.base_record, &mut record_buf)
                    .map_err(crate::error::Error::Io)?;
                &record_buf
            };

            let host_header = parse_record_header(record_bytes)?;
            let mut found = None;
            for attribute in iter_attributes(
                record_bytes,
                host_header.first_attribute_offset as usize,
                cluster_size,
                volume_cluster_count,
            ) {
                let attribute = attribute?;
                if attribute.identifier == entry.attribute_id {
                    found = Some(attribute);
                    break;
                }
            }

            let attribute = found.ok_or(MalformedOnDisk::VcnGap {
                first_vcn: entry.first_vcn,
                previous_last_vcn: 0,
            })?;
            fragments.push(attribute);
        }
        fragments
    } else {
        if direct_matches.is_empty() {
            return Ok(None);
        }
        direct_matches
    };

    validate_chain(&fragments)?;

    Ok(Some(AttributeChain {
        type_code,
        name: name.map(str::to_owned),
        fragments,
    }))
}

fn attribute_content<B: BlockSource>(
    attribute: &AttributeRecord,
    block_source: &B,
    cluster_size: u32,
) -> Result<Vec<u8>> {
    match &attribute.body {
        AttributeBody::Resident { data } => Ok(data.clone()),
        AttributeBody::NonResident { runs, data_size, .. } => {
            read_runs_to_vec(block_source, runs, *data_size, cluster_size)
        }
    }
}

fn validate_chain(fragments: &[AttributeRecord]) -> Result<()> {
    if fragments.len() <= 1 {
        return Ok(());
    }

    let mut expected_next_vcn = 0u64;
    let mut reference_unit_log2: Option<u8> = None;

    for fragment in fragments {
        match &fragment.body {
            AttributeBody::NonResident {
                first_vcn,
                last_vcn,
                compression_unit_log2,
                ..
            } => {
                if *first_vcn != expected_next_vcn {
                    return Err(MalformedOnDisk::VcnGap {
                        first_vcn: *first_vcn,
                        previous_last_vcn: expected_next_vcn.saturating_sub(1),
                    }
                    .into());
                }
                expected_next_vcn = last_vcn + 1;

                match reference_unit_log2 {
                    None => reference_unit_log2 = Some(*compression_unit_log2),
                    Some(expected) if expected != *compression_unit_log2 => {
                        return Err(MalformedOnDisk::InconsistentCompression {
                            expected: expected as u64,
                            found: *compression_unit_log2 as u64,
                        }
                        .into());
                    }
                    _ => {}
                }
            }
            AttributeBody::Resident { .. } => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attribute::AttributeDataFlags;
    use crate::block_io::IoError;
    use crate::data_run::DataRun;
    use crate::types::Lcn;

    struct NoOpSource;
    impl MftRecordSource for NoOpSource {
        fn read_record(&self, _reference: FileReference, _into: &mut [u8]) -> std::result::Result<(), IoError> {
            Err(IoError::new(std::io::Error::other("no records available")))
        }
        fn record_size(&self) -> u32 {
            1024
        }
    }

    fn non_resident_fragment(first_vcn: u64, last_vcn: u64, compression_unit_log2: u8) -> AttributeRecord {
        AttributeRecord {
            type_code: 0x80,
            data_flags: AttributeDataFlags::empty(),
            name: None,
            identifier: 0,
            body: AttributeBody::NonResident {
                first_vcn,
                last_vcn,
                allocated_size: 0,
                data_size: 0,
                valid_data_size: 0,
                compression_unit_log2,
                runs: vec![DataRun {
                    length_in_clusters: last_vcn - first_vcn + 1,
                    starting_lcn: Some(Lcn(0)),
                }],
            },
        }
    }

    #[test]
    fn validate_chain_accepts_contiguous_fragments() {
        let fragments = vec![
            non_resident_fragment(0, 2, 0),
            non_resident_fragment(3, 7, 0),
        ];
        assert!(validate_chain(&fragments).is_ok());
    }

    #[test]
    fn validate_chain_rejects_gap() {
        // spec.md §8.4: a contrived child with first_vcn=4 must VcnGap.
        let fragments = vec![
            non_resident_fragment(0, 2, 0),
            non_resident_fragment(4, 7, 0),
        ];
        let result = validate_chain(&fragments);
        assert!(matches!(
            result,
            Err(crate::error::Error::MalformedOnDisk(MalformedOnDisk::VcnGap { .. }))
        ));
    }

    #[test]
    fn validate_chain_rejects_inconsistent_compression() {
        let fragments = vec![
            non_resident_fragment(0, 2, 4),
            non_resident_fragment(3, 7, 6),
        ];
        let result = validate_chain(&fragments);
        assert!(matches!(
            result,
            Err(crate::error::Error::MalformedOnDisk(
                MalformedOnDisk::InconsistentCompression { .. }
            ))
        ));
    }

    #[test]
    fn no_op_source_reports_an_io_error() {
        let source = NoOpSource;
        let mut buf = [0u8; 16];
        assert!(source
            .read_record(FileReference::from_raw(0), &mut buf)
            .is_err());
    }
}
