//! §4.G: compression-unit descriptor builder.
//!
//! Groups an attribute's data runs into `cu_size`-aligned compression
//! units and classifies each as raw, sparse, or compressed, per
//! spec.md §4.G's walking algorithm.

use crate::data_run::DataRun;
use crate::types::Lcn;

/// One physical slice within a compression unit: either a run of
/// physical clusters, or a sparse gap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitSegment {
    Raw { lcn: Lcn, length_in_clusters: u64 },
    Sparse { length_in_clusters: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    Raw,
    Sparse,
    Compressed,
}

/// One compression unit: its logical offset, classification, and the
/// physical segments that make it up (in cluster units).
#[derive(Debug, Clone)]
pub struct CompressionUnit {
    pub logical_offset: u64,
    pub kind: UnitKind,
    pub segments: Vec<UnitSegment>,
}

/// Walks `runs` (already decoded, in run order) and groups them into
/// `cu_size_in_clusters`-cluster compression units.
pub fn build_units(runs: &[DataRun], cu_size_in_clusters: u64) -> Vec<CompressionUnit> {
    let mut units = Vec::new();
    let mut current_segments: Vec<UnitSegment> = Vec::new();
    let mut remaining_in_unit = cu_size_in_clusters;
    let mut unit_index = 0u64;

    for run in runs {
        let mut run_remaining = run.length_in_clusters;
        while run_remaining > 0 {
            let take = run_remaining.min(remaining_in_unit);
            match run.starting_lcn {
                Some(Lcn(lcn)) => {
                    // The physical starting cluster of this slice accounts
                    // for how much of the run was already consumed by
                    // earlier units.
                    let consumed = run.length_in_clusters - run_remaining;
                    current_segments.push(UnitSegment::Raw {
                        lcn: Lcn(lcn + consumed),
                        length_in_clusters: take,
                    });
                }
                None => current_segments.push(UnitSegment::Sparse {
                    length_in_clusters: take,
                }),
            }

            run_remaining -= take;
            remaining_in_unit -= take;

            if remaining_in_unit == 0 {
                units.push(finish_unit(unit_index, cu_size_in_clusters, std::mem::take(&mut current_segments)));
                unit_index += 1;
                remaining_in_unit = cu_size_in_clusters;
            }
        }
    }

    if remaining_in_unit < cu_size_in_clusters && !current_segments.is_empty() {
        units.push(finish_unit(unit_index, cu_size_in_clusters, current_segments));
    }

    units
}

fn finish_unit(index: u64, cu_size_in_clusters: u64, segments: Vec<UnitSegment>) -> CompressionUnit {
    let has_sparse = segments.iter().any(|s| matches!(s, UnitSegment::Sparse { .. }));
    let has_raw = segments.iter().any(|s| matches!(s, UnitSegment::Raw { .. }));
    let kind = match (has_sparse, has_raw) {
        (true, true) => UnitKind::Compressed,
        (true, false) => UnitKind::Sparse,
        _ => UnitKind::Raw,
    };
    CompressionUnit {
        logical_offset: index * cu_size_in_clusters,
        kind,
        segments,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_raw_run_is_uncompressed() {
        let runs = vec![DataRun {
            length_in_clusters: 16,
            starting_lcn: Some(Lcn(100)),
        }];
        let units = build_units(&runs, 16);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].kind, UnitKind::Raw);
    }

    #[test]
    fn mixed_raw_and_sparse_is_compressed() {
        let runs = vec![
            DataRun {
                length_in_clusters: 4,
                starting_lcn: Some(Lcn(100)),
            },
            DataRun {
                length_in_clusters: 12,
                starting_lcn: None,
            },
        ];
        let units = build_units(&runs, 16);
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].kind, UnitKind::Compressed);
    }

    #[test]
    fn all_sparse_unit_is_sparse() {
        let runs = vec![DataRun {
            length_in_clusters: 16,
            starting_lcn: None,
        }];
        let units = build_units(&runs, 16);
        assert_eq!(units[0].kind, UnitKind::Sparse);
    }

    #[test]
    fn trailing_partial_unit_is_finalized() {
        let runs = vec![DataRun {
            length_in_clusters: 20,
            starting_lcn: Some(Lcn(0)),
        }];
        let units = build_units(&runs, 16);
        assert_eq!(units.len(), 2);
        assert_eq!(units[1].logical_offset, 16);
    }
}
