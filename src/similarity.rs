//! Pluggable similarity providers (spec §9). The grouper's exact-digest
//! pass always runs first and is the default; a [`SimilarityProvider`] only
//! ever clusters whatever it leaves as singletons, and only when the
//! operator opts in via `--fuzzy`.

use crate::types::{DigestGroup, FileRecord};

/// Decides whether two records belong in the same fuzzy group. Exact digest
/// equality is already implemented unconditionally by
/// [`crate::grouper::group_records`]; this trait exists for the optional
/// second pass over its leftovers.
pub trait SimilarityProvider {
    fn is_match(&self, a: &FileRecord, b: &FileRecord) -> bool;
}

/// Digest equality, expressed as a provider for completeness. Not used in
/// the default pipeline (the grouper's own sort-and-bucket pass already
/// does this more efficiently); useful for tests exercising the trait in
/// isolation.
pub struct ExactMatch;

impl SimilarityProvider for ExactMatch {
    fn is_match(&self, a: &FileRecord, b: &FileRecord) -> bool {
        matches!((&a.digest, &b.digest), (Some(da), Some(db)) if da.key() == db.key())
    }
}

/// Groups records whose sizes are within `threshold_percent` of each other.
/// The `--fuzzy --threshold=P` provider: a coarse "probably related" signal
/// for files the exact pass didn't already catch, per spec's framing of
/// fuzzy matching as an opt-in, size-only heuristic.
pub struct SizeProximity {
    pub threshold_percent: f64,
}

impl SimilarityProvider for SizeProximity {
    fn is_match(&self, a: &FileRecord, b: &FileRecord) -> bool {
        if a.size == 0 || b.size == 0 {
            return a.size == b.size;
        }
        let (small, large) = if a.size <= b.size {
            (a.size, b.size)
        } else {
            (b.size, a.size)
        };
        let diff_pct = ((large - small) as f64 / large as f64) * 100.0;
        diff_pct <= threshold_clamped(self.threshold_percent)
    }
}

fn threshold_clamped(p: f64) -> f64 {
    p.clamp(0.0, 100.0)
}

/// Cluster `singletons` (records the exact-digest grouper left ungrouped)
/// by `provider`, discarding clusters of size 1. Pairwise against each
/// cluster's first member rather than all-pairs — fine for singleton
/// leftovers, which are expected to be a small slice of a run.
pub fn group_by_similarity(
    singletons: Vec<FileRecord>,
    provider: &dyn SimilarityProvider,
    next_id: &mut u32,
) -> Vec<DigestGroup> {
    let mut clusters: Vec<Vec<FileRecord>> = Vec::new();
    'records: for record in singletons {
        for cluster in &mut clusters {
            if provider.is_match(&cluster[0], &record) {
                cluster.push(record);
                continue 'records;
            }
        }
        clusters.push(vec![record]);
    }

    clusters
        .into_iter()
        .filter(|c| c.len() >= 2)
        .map(|records| {
            let group = DigestGroup {
                id: *next_id,
                records,
            };
            *next_id += 1;
            group
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{Algorithm, Digest};
    use std::path::PathBuf;

    fn record(path: &str, size: u64, digest_byte: Option<u8>) -> FileRecord {
        let mut r = FileRecord::new(PathBuf::from(path), size, 0, 0);
        if let Some(b) = digest_byte {
            r = r.with_digest(Digest::Strong {
                algorithm: Algorithm::Md5,
                bytes: vec![b],
            });
        }
        r
    }

    #[test]
    fn size_proximity_matches_within_threshold() {
        let provider = SizeProximity {
            threshold_percent: 10.0,
        };
        let a = record("/a", 1000, None);
        let b = record("/b", 1050, None);
        let c = record("/c", 2000, None);
        assert!(provider.is_match(&a, &b));
        assert!(!provider.is_match(&a, &c));
    }

    #[test]
    fn size_proximity_treats_zero_size_as_only_matching_zero_size() {
        let provider = SizeProximity {
            threshold_percent: 50.0,
        };
        let a = record("/a", 0, None);
        let b = record("/b", 0, None);
        let c = record("/c", 1, None);
        assert!(provider.is_match(&a, &b));
        assert!(!provider.is_match(&a, &c));
    }

    #[test]
    fn exact_match_requires_both_digests_present_and_equal() {
        let provider = ExactMatch;
        let a = record("/a", 10, Some(1));
        let b = record("/b", 10, Some(1));
        let c = record("/c", 10, Some(2));
        let d = record("/d", 10, None);
        assert!(provider.is_match(&a, &b));
        assert!(!provider.is_match(&a, &c));
        assert!(!provider.is_match(&a, &d));
    }

    #[test]
    fn clustering_discards_singleton_clusters_and_assigns_dense_ids() {
        let records = vec![
            record("/a", 1000, None),
            record("/b", 1010, None),
            record("/c", 5000, None),
            record("/d", 1020, None),
        ];
        let mut next_id = 7;
        let groups = group_by_similarity(
            records,
            &SizeProximity {
                threshold_percent: 5.0,
            },
            &mut next_id,
        );
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].id, 7);
        assert_eq!(groups[0].records.len(), 3);
        assert_eq!(next_id, 8);
    }
}
