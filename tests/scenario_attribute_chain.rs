//! spec.md §8.4: `$DATA` fragmented across an `$ATTRIBUTE_LIST`.

use std::collections::HashMap;

use fsntfs_stream::attribute_chain::resolve_attribute_chain;
use fsntfs_stream::block_io::IoError;
use fsntfs_stream::mft_record::{parse_record_header, MftRecordSource};
use fsntfs_stream::stream::StreamDescriptor;
use fsntfs_stream::types::FileReference;

const RECORD_SIZE: usize = 512;
const CLUSTER_SIZE: u32 = 4096;
const VOLUME_CLUSTER_COUNT: u64 = 1024;

fn build_attribute_list_entry(type_code: u32, first_vcn: u64, base_record: FileReference, attribute_id: u16) -> Vec<u8> {
    let mut entry = vec![0u8; 26];
    entry[0..4].copy_from_slice(&type_code.to_le_bytes());
    entry[4..6].copy_from_slice(&26u16.to_le_bytes());
    entry[7] = 26;
    entry[8..16].copy_from_slice(&first_vcn.to_le_bytes());
    entry[16..24].copy_from_slice(&base_record.to_raw().to_le_bytes());
    entry[24..26].copy_from_slice(&attribute_id.to_le_bytes());
    entry
}

fn build_resident_attribute(type_code: u32, identifier: u16, payload: &[u8]) -> Vec<u8> {
    let header_len = 24usize;
    let record_length = header_len + payload.len();
    let mut out = vec![0u8; record_length];
    out[0..4].copy_from_slice(&type_code.to_le_bytes());
    out[4..8].copy_from_slice(&(record_length as u32).to_le_bytes());
    out[14..16].copy_from_slice(&identifier.to_le_bytes());
    out[16..20].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    out[20..22].copy_from_slice(&(header_len as u16).to_le_bytes());
    out[header_len..].copy_from_slice(payload);
    out
}

fn build_non_resident_data_fragment(
    mapping_pairs: &[u8],
    first_vcn: u64,
    last_vcn: u64,
    data_size: u64,
    identifier: u16,
) -> Vec<u8> {
    let header_len = 64usize;
    let record_length = header_len + mapping_pairs.len();
    let mut out = vec![0u8; record_length];
    out[0..4].copy_from_slice(&0x80u32.to_le_bytes());
    out[4..8].copy_from_slice(&(record_length as u32).to_le_bytes());
    out[8] = 1; // non_resident
    out[14..16].copy_from_slice(&identifier.to_le_bytes());
    out[16..24].copy_from_slice(&first_vcn.to_le_bytes());
    out[24..32].copy_from_slice(&last_vcn.to_le_bytes());
    out[32..34].copy_from_slice(&(header_len as u16).to_le_bytes());
    out[40..48].copy_from_slice(&data_size.to_le_bytes());
    out[48..56].copy_from_slice(&data_size.to_le_bytes());
    out[56..64].copy_from_slice(&data_size.to_le_bytes());
    out[header_len..].copy_from_slice(mapping_pairs);
    out
}

fn build_mft_record(attributes: &[u8], record_number: u32, sequence_number: u16) -> Vec<u8> {
    let first_attribute_offset = 56u16;
    let mut record = vec![0u8; RECORD_SIZE];
    record[0..4].copy_from_slice(b"FILE");
    record[16..18].copy_from_slice(&sequence_number.to_le_bytes());
    record[18..20].copy_from_slice(&1u16.to_le_bytes());
    record[20..22].copy_from_slice(&first_attribute_offset.to_le_bytes());
    record[22..24].copy_from_slice(&0x0001u16.to_le_bytes());
    record[44..48].copy_from_slice(&record_number.to_le_bytes());

    let attr_start = first_attribute_offset as usize;
    record[attr_start..attr_start + attributes.len()].copy_from_slice(attributes);
    let end_marker = attr_start + attributes.len();
    record[end_marker..end_marker + 4].copy_from_slice(&0xFFFF_FFFFu32.to_le_bytes());
    record
}

struct MapRecordSource {
    records: HashMap<u64, Vec<u8>>,
}

impl MftRecordSource for MapRecordSource {
    fn read_record(&self, reference: FileReference, into: &mut [u8]) -> Result<(), IoError> {
        let record = self
            .records
            .get(&reference.record_number)
            .ok_or_else(|| IoError::new(std::io::Error::other("no such MFT record")))?;
        into[..record.len()].copy_from_slice(record);
        Ok(())
    }

    fn record_size(&self) -> u32 {
        RECORD_SIZE as u32
    }
}

#[test]
fn fragments_spanning_attribute_list_resolve_into_one_contiguous_chain() {
    let base_reference = FileReference {
        record_number: 5,
        sequence_number: 1,
    };
    let child_reference = FileReference {
        record_number: 6,
        sequence_number: 1,
    };
    let data_size = 8 * CLUSTER_SIZE as u64;

    // Fragment 0: VCN 0..2, 3 clusters at LCN 10, lives in the base record.
    let fragment0 = build_non_resident_data_fragment(&[0x11, 0x03, 0x0A], 0, 2, data_size, 0);
    // Fragment 1: VCN 3..7, 5 clusters at LCN 20, lives in the child record.
    let fragment1 = build_non_resident_data_fragment(&[0x11, 0x05, 0x14], 3, 7, data_size, 3);

    let mut list_content = build_attribute_list_entry(0x80, 0, base_reference, 0);
    list_content.extend(build_attribute_list_entry(0x80, 3, child_reference, 3));
    let attribute_list = build_resident_attribute(0x20, 99, &list_content);

    let mut base_attributes = attribute_list;
    base_attributes.extend(fragment0);
    let base_record = build_mft_record(&base_attributes, 5, 1);

    let child_record = build_mft_record(&fragment1, 6, 1);

    let mft_source = MapRecordSource {
        records: HashMap::from([(6u64, child_record)]),
    };

    let header = parse_record_header(&base_record).unwrap();
    assert!(header.is_in_use);

    let volume_cluster_count = VOLUME_CLUSTER_COUNT;
    let mut image = vec![0xEEu8; volume_cluster_count as usize * CLUSTER_SIZE as usize];
    image[10 * CLUSTER_SIZE as usize] = 0xAA;
    image[20 * CLUSTER_SIZE as usize] = 0xBB;
    let block_source: &[u8] = &image;

    let chain = resolve_attribute_chain(
        &base_record,
        base_reference,
        0x80,
        None,
        &mft_source,
        &block_source,
        CLUSTER_SIZE,
        volume_cluster_count,
    )
    .unwrap()
    .expect("a fragmented $DATA attribute is present");

    assert_eq!(chain.fragments.len(), 2);
    assert_eq!(chain.data_size(), data_size);

    let mut stream = StreamDescriptor::new(&chain, &block_source, CLUSTER_SIZE, 5);
    let extents: Vec<_> = stream.extents().unwrap().collect();
    assert_eq!(extents.len(), 2);
    assert_eq!((extents[0].file_offset, extents[0].length), (0, 3 * CLUSTER_SIZE as u64));
    assert_eq!(
        (extents[1].file_offset, extents[1].length),
        (3 * CLUSTER_SIZE as u64, 5 * CLUSTER_SIZE as u64)
    );

    let mut first_byte = [0u8; 1];
    stream.read(&mut first_byte, None).unwrap();
    assert_eq!(first_byte[0], 0xAA);

    stream.seek(3 * CLUSTER_SIZE as u64).unwrap();
    let mut second_fragment_byte = [0u8; 1];
    stream.read(&mut second_fragment_byte, None).unwrap();
    assert_eq!(second_fragment_byte[0], 0xBB);
}

#[test]
fn a_vcn_gap_between_fragments_is_rejected() {
    let base_reference = FileReference {
        record_number: 7,
        sequence_number: 1,
    };
    let data_size = 8 * CLUSTER_SIZE as u64;

    // VCN 0..2 then VCN 4..7: a gap at VCN 3.
    let fragment0 = build_non_resident_data_fragment(&[0x11, 0x03, 0x0A], 0, 2, data_size, 0);
    let fragment1 = build_non_resident_data_fragment(&[0x11, 0x04, 0x14], 4, 7, data_size, 1);

    let mut attributes = fragment0;
    attributes.extend(fragment1);
    let base_record = build_mft_record(&attributes, 7, 1);

    let mft_source = MapRecordSource {
        records: HashMap::new(),
    };
    let image = vec![0u8; VOLUME_CLUSTER_COUNT as usize * CLUSTER_SIZE as usize];
    let block_source: &[u8] = &image;

    let result = resolve_attribute_chain(
        &base_record,
        base_reference,
        0x80,
        None,
        &mft_source,
        &block_source,
        CLUSTER_SIZE,
        VOLUME_CLUSTER_COUNT,
    );

    assert!(result.is_err());
}
