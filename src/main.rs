//! Minimal NTFS `$DATA`-stream dumper: scans the MFT of a raw disk
//! image and emits one NDJSON line per in-use file record, resolving
//! its default `$DATA` stream through `fsntfs_stream`.
//!
//! This binary is an external consumer of the library: it supplies
//! its own memory-mapped `BlockSource` (the mmap itself, via the
//! library's `impl BlockSource for &[u8]`) and `MftRecordSource`, and
//! drives the public API. It does not reimplement attribute parsing.

use anyhow::{Context, Result};
use clap::Parser;
use log::{debug, info, warn};
use memmap2::Mmap;
use serde::Serialize;
use std::{
    fs::File,
    io::{BufWriter, Write},
};

use fsntfs_stream::attribute_chain::resolve_attribute_chain;
use fsntfs_stream::attribute_value::parse_file_name;
use fsntfs_stream::cache::StreamCache;
use fsntfs_stream::mft_record::{iter_attributes, parse_record_header, MemoryMftRecordSource, MftRecordSource};
use fsntfs_stream::stream::StreamDescriptor;
use fsntfs_stream::types::FileReference;

#[derive(Parser, Debug)]
#[command(author, version, about = "NTFS $DATA stream dumper")]
struct Cli {
    /// Input disk image (raw)
    #[arg(short, long)]
    input: String,

    /// Output NDJSON file
    #[arg(short, long)]
    output: String,
}

/// The handful of NTFS boot-sector fields needed to locate and walk
/// the MFT; everything else about volume lifecycle is out of scope.
struct Volume {
    cluster_size: u32,
    record_size: u32,
    mft_offset: u64,
    volume_cluster_count: u64,
}

fn parse_boot_sector(image: &[u8]) -> Result<Volume> {
    if image.len() < 0x48 {
        anyhow::bail!("image too small to contain an NTFS boot sector");
    }
    let bytes_per_sector = u16::from_le_bytes(image[0x0B..0x0D].try_into()?) as u64;
    let sectors_per_cluster = image[0x0D] as u64;
    let total_sectors = u64::from_le_bytes(image[0x28..0x30].try_into()?);
    let mft_cluster_number = u64::from_le_bytes(image[0x30..0x38].try_into()?);
    let record_size_raw = image[0x40] as i8;

    let cluster_size = (bytes_per_sector * sectors_per_cluster) as u32;
    let record_size = if record_size_raw > 0 {
        record_size_raw as u32 * cluster_size
    } else {
        1u32 << (-record_size_raw as u32)
    };

    Ok(Volume {
        cluster_size,
        record_size,
        mft_offset: mft_cluster_number * cluster_size as u64,
        volume_cluster_count: total_sectors / sectors_per_cluster.max(1),
    })
}

#[derive(Serialize)]
struct FileEntry {
    record_number: u64,
    sequence_number: u16,
    is_directory: bool,
    file_name: Option<String>,
    data_size: u64,
    mft_offset: u64,
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    let input_file = File::open(&cli.input)?;
    debug!("Opened input file: {}", &cli.input);
    // Advisory lock - prevents writes by cooperating processes.
    // Reduces a risk from unsafe mmap (e.g., if file is shortened or deleted during operation).
    input_file.lock_shared()?;
    debug!("Locked input file: {}", &cli.input);

    let disk_image_buffer_mmap = unsafe { Mmap::map(&input_file)? };
    disk_image_buffer_mmap.advise(memmap2::Advice::Sequential)?;

    let image: &[u8] = &disk_image_buffer_mmap;
    let volume = parse_boot_sector(image).context("parsing NTFS boot sector")?;
    debug!(
        "Volume geometry: cluster_size={} record_size={} mft_offset={}",
        volume.cluster_size, volume.record_size, volume.mft_offset
    );

    let block_source = &image;
    let mft_source = MemoryMftRecordSource::new(block_source, volume.mft_offset, volume.record_size);
    let mut cache = StreamCache::default();

    let output_file = File::create(&cli.output)?;
    let mut output_file_writer = BufWriter::new(output_file);

    let mut record_buf = vec![0u8; volume.record_size as usize];
    let mut record_number = 0u64;
    let mut file_count: u64 = 0;

    info!("Starting to process NTFS image's file entries.");

    loop {
        let record_offset = volume.mft_offset + record_number * volume.record_size as u64;
        if record_offset + volume.record_size as u64 > image.len() as u64 {
            break;
        }

        let reference = FileReference {
            record_number,
            sequence_number: 0,
        };
        if mft_source.read_record(reference, &mut record_buf).is_err() {
            record_number += 1;
            continue;
        }

        let header = match parse_record_header(&record_buf) {
            Ok(header) => header,
            Err(_) => {
                record_number += 1;
                continue;
            }
        };

        if !header.is_in_use {
            record_number += 1;
            continue;
        }

        let reference = FileReference {
            record_number,
            sequence_number: header.sequence_number,
        };

        let file_name = iter_attributes(
            &record_buf,
            header.first_attribute_offset as usize,
            volume.cluster_size,
            volume.volume_cluster_count,
        )
        .find_map(|attribute| {
            let attribute = attribute.ok()?;
            if attribute.type_code != 0x30 {
                return None;
            }
            match &attribute.body {
                fsntfs_stream::attribute::AttributeBody::Resident { data } => parse_file_name(data).ok().map(|f| f.name),
                _ => None,
            }
        });

        let data_size = match resolve_attribute_chain(
            &record_buf,
            reference,
            0x80,
            None,
            &mft_source,
            block_source,
            volume.cluster_size,
            volume.volume_cluster_count,
        ) {
            Ok(Some(chain)) => {
                let mut stream = StreamDescriptor::new(&chain, block_source, volume.cluster_size, record_number);
                let size = stream.data_size();
                let mut probe = vec![0u8; size.min(4096) as usize];
                if let Err(error) = stream.read(&mut probe, Some(&mut cache)) {
                    warn!("record {record_number}: failed to read $DATA: {error}");
                }
                size
            }
            Ok(None) => 0,
            Err(error) => {
                warn!("record {record_number}: failed to resolve $DATA: {error}");
                0
            }
        };

        let entry = FileEntry {
            record_number,
            sequence_number: header.sequence_number,
            is_directory: header.is_directory,
            file_name,
            data_size,
            mft_offset: record_offset,
        };

        let json = serde_json::to_string(&entry)?;
        writeln!(output_file_writer, "{json}")?;
        file_count += 1;

        if file_count % 1000 == 0 {
            info!(
                "Processed {} file entries. Last file position: {} = {:.3} GiB",
                file_count,
                record_offset,
                (record_offset as f64 / (1024.0 * 1024.0 * 1024.0))
            );
        }

        record_number += 1;
    }

    info!("Processed a total of {} file entries.", file_count);

    Ok(())
}
