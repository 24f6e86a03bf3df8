//! spec.md §8.2: small resident `$DATA`.

use fsntfs_stream::attribute_chain::resolve_attribute_chain;
use fsntfs_stream::mft_record::parse_record_header;
use fsntfs_stream::stream::StreamDescriptor;
use fsntfs_stream::types::FileReference;

fn build_resident_data_attribute(payload: &[u8]) -> Vec<u8> {
    let header_len = 24usize;
    let record_length = header_len + payload.len();
    let mut out = vec![0u8; record_length];
    out[0..4].copy_from_slice(&0x80u32.to_le_bytes());
    out[4..8].copy_from_slice(&(record_length as u32).to_le_bytes());
    out[16..20].copy_from_slice(&(payload.len() as u32).to_le_bytes());
    out[20..22].copy_from_slice(&(header_len as u16).to_le_bytes());
    out[header_len..].copy_from_slice(payload);
    out
}

fn build_mft_record(attributes: &[u8], record_number: u32) -> Vec<u8> {
    let first_attribute_offset = 56u16;
    let total_len = first_attribute_offset as usize + attributes.len() + 4;
    let mut record = vec![0u8; total_len.max(48)];
    record[0..4].copy_from_slice(b"FILE");
    record[16..18].copy_from_slice(&1u16.to_le_bytes());
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

struct NoRecordSource;
impl fsntfs_stream::mft_record::MftRecordSource for NoRecordSource {
    fn read_record(
        &self,
        _reference: FileReference,
        _into: &mut [u8],
    ) -> Result<(), fsntfs_stream::block_io::IoError> {
        Err(fsntfs_stream::block_io::IoError::new(std::io::Error::other(
            "no $ATTRIBUTE_LIST in this scenario",
        )))
    }
    fn record_size(&self) -> u32 {
        1024
    }
}

#[test]
fn resident_data_stream_matches_scenario() {
    let attribute = build_resident_data_attribute(b"Hello");
    let record = build_mft_record(&attribute, 5);

    let header = parse_record_header(&record).unwrap();
    assert!(header.is_in_use);

    let reference = FileReference {
        record_number: 5,
        sequence_number: header.sequence_number,
    };

    let mft_source = NoRecordSource;
    let block_source: &[u8] = &[];

    let chain = resolve_attribute_chain(
        &record,
        reference,
        0x80,
        None,
        &mft_source,
        &block_source,
        4096,
        0,
    )
    .unwrap()
    .expect("a $DATA attribute is present");

    let mut stream = StreamDescriptor::new(&chain, &block_source, 4096, 5);
    assert_eq!(stream.data_size(), 5);

    let mut buf = [0xAAu8; 8];
    let n = stream.read(&mut buf, None).unwrap();
    assert_eq!(n, 5);
    assert_eq!(&buf[0..5], b"Hello");
    assert_eq!(&buf[5..8], [0xAA, 0xAA, 0xAA]);

    let extents: Vec<_> = stream.extents().unwrap().collect();
    assert_eq!(extents.len(), 1);
    assert_eq!(extents[0].file_offset, 0);
    assert_eq!(extents[0].length, 5);
    assert!(!extents[0].sparse);
}
