//! Minimal raw, uncompressed cluster-run reader shared by the
//! attribute chain builder (to pull in non-resident `$ATTRIBUTE_LIST`
//! content, which is never compressed) and the cluster block stream's
//! raw-segment path (§4.F).

use crate::block_io::BlockSource;
use crate::data_run::DataRun;
use crate::error::Result;

/// Reads the full logical content described by `runs` (each
/// `cluster_size` clusters long, per spec.md §6.3), zero-filling
/// sparse runs, and truncating to `logical_size` bytes.
pub fn read_runs_to_vec<B: BlockSource>(
    source: &B,
    runs: &[DataRun],
    logical_size: u64,
    cluster_size: u32,
) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(logical_size as usize);

    for run in runs {
        let run_len = run.length_in_clusters * cluster_size as u64;
        match run.starting_lcn {
            None => {
                out.resize(out.len() + run_len as usize, 0);
            }
            Some(lcn) => {
                let mut buf = vec![0u8; run_len as usize];
                source.read_at(lcn.0 * cluster_size as u64, &mut buf)?;
                out.extend_from_slice(&buf);
            }
        }
        if out.len() as u64 >= logical_size {
            break;
        }
    }

    out.truncate(logical_size as usize);
    // If runs undershoot the logical size (shouldn't happen for a
    // well-formed attribute, but be defensive), pad with zeros.
    if (out.len() as u64) < logical_size {
        out.resize(logical_size as usize, 0);
    }
    Ok(out)
}
