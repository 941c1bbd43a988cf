//! The duplicate grouper (C4, spec §4.4): collects completed records,
//! sorts them by digest, and emits groups of cardinality ≥ 2.
//!
//! Single-threaded by design (spec §5's "the grouper is single-threaded and
//! consumes the complete set of records") but uses `rayon`'s parallel sort —
//! already a teacher dependency — rather than a hand-rolled grouping loop.
//! Spill-to-disk for very large trees is out of scope for the default path
//! (DESIGN.md Open Question decision); in-memory grouping is unconditional.

use rayon::slice::ParallelSliceMut;

use crate::digest::DigestTag;
use crate::types::{DigestGroup, FileRecord};

/// Anomaly counters the grouper reports back to the run controller (spec
/// §7's `group.collision` reason code).
#[derive(Default, Debug, Clone)]
pub struct GrouperStats {
    pub groups_found: usize,
    pub size_collisions: usize,
    /// Records left as singletons after the exact-digest pass — the input
    /// to an opt-in [`crate::similarity`] second pass.
    pub singletons: Vec<FileRecord>,
}

/// Group `records` by `(algorithm-tag, digest bytes, size)`, discard
/// singleton groups, and assign dense monotonic ids in order of first-seen
/// digest. Records sharing a digest but differing in size are split into
/// separate groups and counted as a collision (spec §4.4: "a size mismatch
/// inside a digest group signals a collision or caching error").
pub fn group_records(mut records: Vec<FileRecord>) -> (Vec<DigestGroup>, GrouperStats) {
    records.retain(|r| r.digest.is_some());
    records.par_sort_unstable_by(|a, b| sort_key(a).cmp(&sort_key(b)));

    let mut groups = Vec::new();
    let mut stats = GrouperStats::default();
    let mut next_id = 0u32;
    let mut i = 0;
    while i < records.len() {
        let mut j = i + 1;
        while j < records.len() && sort_key(&records[i]).0 == sort_key(&records[j]).0 {
            j += 1;
        }
        // [i, j) all share (tag, digest bytes); sub-split by size.
        let mut bucket = records[i..j].to_vec();
        bucket.sort_unstable_by_key(|r| r.size);
        let mut k = 0;
        let mut seen_size_buckets = 0;
        while k < bucket.len() {
            let mut m = k + 1;
            while m < bucket.len() && bucket[m].size == bucket[k].size {
                m += 1;
            }
            seen_size_buckets += 1;
            let mut members = bucket[k..m].to_vec();
            if members.len() >= 2 {
                groups.push(DigestGroup {
                    id: next_id,
                    records: members,
                });
                next_id += 1;
                stats.groups_found += 1;
            } else {
                stats.singletons.append(&mut members);
            }
            k = m;
        }
        if seen_size_buckets > 1 {
            stats.size_collisions += 1;
        }
        i = j;
    }
    (groups, stats)
}

/// Sort key: `(tag_ordinal, digest_bytes)`. Strong and fast digests never
/// compare equal because `DigestTag` is part of the key.
fn sort_key(record: &FileRecord) -> (DigestTag, Vec<u8>) {
    record
        .digest
        .as_ref()
        .map(|d| d.key())
        .unwrap_or((DigestTag::Md5, Vec::new()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::{Algorithm, Digest};
    use std::path::PathBuf;

    fn record(path: &str, size: u64, bytes: &[u8]) -> FileRecord {
        FileRecord::new(PathBuf::from(path), size, 0, 0).with_digest(Digest::Strong {
            algorithm: Algorithm::Md5,
            bytes: bytes.to_vec(),
        })
    }

    #[test]
    fn singleton_groups_are_discarded() {
        let records = vec![record("/a", 10, &[1, 2, 3])];
        let (groups, stats) = group_records(records);
        assert!(groups.is_empty());
        assert_eq!(stats.groups_found, 0);
    }

    #[test]
    fn matching_digest_and_size_forms_a_group() {
        let records = vec![
            record("/b", 10, &[9, 9]),
            record("/a", 10, &[9, 9]),
            record("/c", 10, &[1]),
        ];
        let (groups, _stats) = group_records(records);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].records.len(), 2);
    }

    #[test]
    fn same_digest_different_size_splits_and_counts_collision() {
        let records = vec![
            record("/a", 10, &[5, 5]),
            record("/b", 10, &[5, 5]),
            record("/c", 20, &[5, 5]),
            record("/d", 20, &[5, 5]),
        ];
        let (groups, stats) = group_records(records);
        assert_eq!(groups.len(), 2);
        assert_eq!(stats.size_collisions, 1);
        assert_eq!(stats.groups_found, 2);
    }

    #[test]
    fn group_ids_are_dense_and_monotonic() {
        let records = vec![
            record("/a", 10, &[1]),
            record("/b", 10, &[1]),
            record("/c", 20, &[2]),
            record("/d", 20, &[2]),
        ];
        let (groups, _) = group_records(records);
        let ids: Vec<u32> = groups.iter().map(|g| g.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }
}
