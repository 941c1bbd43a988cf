//! The keeper selector (C5, spec §4.5): a pure function, no I/O, that picks
//! exactly one survivor per group according to the configured strategy.
//!
//! `KeepStrategy` models the five rules as one configured strategy rather
//! than five independently-togglable flags (DESIGN.md Open Question
//! decision) — rules 2-4 are mutually exclusive alternatives an operator
//! picks between. Rule 1's own fallback (no match, or more than one) drops
//! straight to rule 5's lexicographic default, since rules 2-4 are not
//! simultaneously configured in this model.

use crate::types::{FileRecord, KeepStrategy};

/// Pick the survivor index within `records` for the given strategy. Ties in
/// rules 2-4 are broken by lexicographically smaller path (spec §4.5).
pub fn select_survivor(records: &[FileRecord], strategy: &KeepStrategy) -> usize {
    debug_assert!(!records.is_empty(), "keeper called on an empty group");
    match strategy {
        KeepStrategy::KeepPath(prefix) => keep_path_rule(records, prefix)
            .unwrap_or_else(|| lexicographically_smallest(records)),
        KeepStrategy::Newest => extreme_mtime(records, true),
        KeepStrategy::Oldest => extreme_mtime(records, false),
        KeepStrategy::Smart(table) => smart_select(records, table),
        KeepStrategy::Default => lexicographically_smallest(records),
    }
}

/// Rule 1: exactly one member's path starts with `prefix`. Returns `None`
/// (fall through) when zero or more than one match.
fn keep_path_rule(records: &[FileRecord], prefix: &std::path::Path) -> Option<usize> {
    let mut matches = records
        .iter()
        .enumerate()
        .filter(|(_, r)| r.path.starts_with(prefix));
    let first = matches.next()?;
    if matches.next().is_some() {
        None
    } else {
        Some(first.0)
    }
}

/// Rules 2/3: greatest (newest) or least (oldest) mtime, ties broken by
/// lexicographically smaller path.
fn extreme_mtime(records: &[FileRecord], newest: bool) -> usize {
    let mut best = 0usize;
    for i in 1..records.len() {
        let better = if newest {
            records[i].mtime_ns > records[best].mtime_ns
        } else {
            records[i].mtime_ns < records[best].mtime_ns
        };
        let tie = records[i].mtime_ns == records[best].mtime_ns
            && records[i].path < records[best].path;
        if better || tie {
            best = i;
        }
    }
    best
}

/// Rule 4: lowest location-priority score wins. The score for a member is
/// the priority value of the longest-matching prefix in `table`; members
/// matching no entry get the worst possible score.
fn smart_select(records: &[FileRecord], table: &[(std::path::PathBuf, u32)]) -> usize {
    let score = |path: &std::path::Path| -> u32 {
        table
            .iter()
            .filter(|(prefix, _)| path.starts_with(prefix))
            .max_by_key(|(prefix, _)| prefix.as_os_str().len())
            .map(|(_, priority)| *priority)
            .unwrap_or(u32::MAX)
    };
    let mut best = 0usize;
    let mut best_score = score(&records[0].path);
    for i in 1..records.len() {
        let s = score(&records[i].path);
        if s < best_score || (s == best_score && records[i].path < records[best].path) {
            best = i;
            best_score = s;
        }
    }
    best
}

/// Rule 5: lexicographically smallest path.
fn lexicographically_smallest(records: &[FileRecord]) -> usize {
    let mut best = 0usize;
    for i in 1..records.len() {
        if records[i].path < records[best].path {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn record(path: &str, mtime_ns: i64) -> FileRecord {
        FileRecord::new(PathBuf::from(path), 10, mtime_ns, 0)
    }

    #[test]
    fn keep_path_wins_on_exactly_one_match() {
        let records = vec![record("/data/a", 1), record("/keep/b", 2), record("/data/c", 3)];
        let idx = select_survivor(&records, &KeepStrategy::KeepPath(PathBuf::from("/keep")));
        assert_eq!(idx, 1);
    }

    #[test]
    fn keep_path_falls_through_to_default_on_no_match() {
        let records = vec![record("/z/a", 1), record("/a/b", 2)];
        let idx = select_survivor(&records, &KeepStrategy::KeepPath(PathBuf::from("/nope")));
        assert_eq!(idx, 1); // "/a/b" < "/z/a"
    }

    #[test]
    fn keep_path_falls_through_to_default_on_multiple_matches() {
        let records = vec![record("/keep/z", 1), record("/keep/a", 2)];
        let idx = select_survivor(&records, &KeepStrategy::KeepPath(PathBuf::from("/keep")));
        assert_eq!(idx, 1); // "/keep/a" < "/keep/z"
    }

    #[test]
    fn newest_wins_ties_broken_by_path() {
        let records = vec![record("/b", 5), record("/a", 5), record("/c", 1)];
        let idx = select_survivor(&records, &KeepStrategy::Newest);
        assert_eq!(idx, 1); // tie at mtime 5, "/a" < "/b"
    }

    #[test]
    fn oldest_wins() {
        let records = vec![record("/b", 5), record("/a", 1)];
        let idx = select_survivor(&records, &KeepStrategy::Oldest);
        assert_eq!(idx, 1);
    }

    #[test]
    fn smart_select_prefers_longest_matching_prefix() {
        let records = vec![record("/data/archive/x", 1), record("/data/hot/y", 2)];
        let table = vec![
            (PathBuf::from("/data"), 5),
            (PathBuf::from("/data/hot"), 1),
        ];
        let idx = select_survivor(&records, &KeepStrategy::Smart(table));
        assert_eq!(idx, 1); // "/data/hot/y" matches the more specific, lower-score entry
    }

    #[test]
    fn default_rule_is_lexicographic() {
        let records = vec![record("/z", 1), record("/a", 1)];
        let idx = select_survivor(&records, &KeepStrategy::Default);
        assert_eq!(idx, 1);
    }
}
