//! The directory walker (C1): dual-mode traversal (serial `walkdir` /
//! parallel `jwalk`, chosen by drive type), pruning excluded subtrees
//! without descending into them (spec §4.1).
//!
//! Grounded on the teacher's `to_outcome_jwalk`/`to_outcome_walkdir`/
//! `run_walk_loop` trio; the include/exclude decision is generalized from a
//! flat glob list to the spec's canonicalize-then-prune algorithm.

use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};

use crate::pathutil::{is_os_hidden_file, matches_any};

use super::context::PipelineContext;

/// One result from a directory walk: either a path to consider or an error
/// with an optional path.
pub enum WalkOutcome {
    Ok(PathBuf),
    Err { msg: String, path: Option<PathBuf> },
}

pub fn to_outcome_jwalk(r: Result<jwalk::DirEntry<((), ())>, jwalk::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => WalkOutcome::Ok(entry.path()),
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

pub fn to_outcome_walkdir(r: Result<walkdir::DirEntry, walkdir::Error>) -> WalkOutcome {
    match r {
        Ok(entry) => WalkOutcome::Ok(entry.into_path()),
        Err(err) => WalkOutcome::Err {
            msg: format!("{}", err),
            path: err.path().map(PathBuf::from),
        },
    }
}

/// True when `path` is beneath (or equal to) one of the canonicalized
/// exclude paths. The caller canonicalizes `path` once before calling this,
/// per spec §4.1 ("defeats symlink-based evasion of exclusion rules").
fn is_excluded(path: &Path, exclude_paths: &[PathBuf]) -> bool {
    exclude_paths.iter().any(|ex| path.starts_with(ex))
}

fn walkdir_iter(ctx: &PipelineContext) -> Box<dyn Iterator<Item = WalkOutcome> + Send> {
    use walkdir::WalkDir;
    let mut wd = WalkDir::new(&ctx.root).follow_links(ctx.filters.follow_symlinks);
    if let Some(depth) = ctx.filters.max_depth {
        wd = wd.max_depth(depth);
    }
    let root = ctx.root.clone();
    let exclude_paths = ctx.filters.exclude_paths.clone();
    let include_hidden = ctx.filters.include_hidden;
    Box::new(
        wd.into_iter()
            .filter_entry(move |entry| {
                if entry.path() == root {
                    return true;
                }
                if entry.file_type().is_dir() {
                    if !include_hidden && is_os_hidden_file(entry.path()) {
                        return false;
                    }
                    let canonical = entry
                        .path()
                        .canonicalize()
                        .unwrap_or_else(|_| entry.path().to_path_buf());
                    return !is_excluded(&canonical, &exclude_paths);
                }
                true
            })
            .map(to_outcome_walkdir),
    )
}

fn jwalk_iter(ctx: &PipelineContext) -> Box<dyn Iterator<Item = WalkOutcome> + Send> {
    use jwalk::Parallelism;
    use std::time::Duration;

    let exclude_paths = ctx.filters.exclude_paths.clone();
    let include_hidden = ctx.filters.include_hidden;
    let max_depth = ctx.filters.max_depth;

    let mut wd = jwalk::WalkDir::new(&ctx.root)
        .follow_links(ctx.filters.follow_symlinks)
        .parallelism(Parallelism::RayonDefaultPool {
            busy_timeout: Duration::from_secs(60),
        })
        .process_read_dir(move |_depth, _path, _state, children| {
            children.retain(|entry_result| {
                let Ok(entry) = entry_result else { return true };
                if !entry.file_type.is_dir() {
                    return true;
                }
                if !include_hidden && is_os_hidden_file(&entry.path()) {
                    return false;
                }
                let canonical = entry
                    .path()
                    .canonicalize()
                    .unwrap_or_else(|_| entry.path());
                !is_excluded(&canonical, &exclude_paths)
            });
        });
    if let Some(depth) = max_depth {
        wd = wd.max_depth(depth);
    }
    Box::new(wd.into_iter().map(to_outcome_jwalk))
}

pub fn spawn_walk_thread(
    path_tx: Sender<PathBuf>,
    path_count_tx: Sender<usize>,
    ctx: PipelineContext,
    parallel_walk: bool,
) -> JoinHandle<usize> {
    thread::spawn(move || {
        let iter: Box<dyn Iterator<Item = WalkOutcome> + Send> = if parallel_walk {
            jwalk_iter(&ctx)
        } else {
            walkdir_iter(&ctx)
        };
        run_walk_loop(path_tx, path_count_tx, ctx, iter)
    })
}

/// Consume `iter`, filter hidden/excluded entries not already pruned by the
/// iterator's own hooks, apply the include-glob filter, and send surviving
/// file paths on `path_tx`. Directory entries themselves are never sent —
/// only regular files reach the metadata stage. Returns the count sent.
pub fn run_walk_loop<I>(
    path_tx: Sender<PathBuf>,
    path_count_tx: Sender<usize>,
    ctx: PipelineContext,
    iter: I,
) -> usize
where
    I: Iterator<Item = WalkOutcome>,
{
    let mut count = 0_usize;
    for outcome in iter {
        match outcome {
            WalkOutcome::Ok(path) => {
                if path == ctx.root {
                    continue;
                }
                if !path.is_file() {
                    continue;
                }
                if !ctx.filters.include_hidden && is_os_hidden_file(&path) {
                    continue;
                }
                if !ctx.filters.include_globs.is_empty()
                    && !matches_any(&ctx.filters.include_globs, &path)
                {
                    continue;
                }
                if path_tx.send(path).is_err() {
                    break;
                }
                count += 1;
            }
            WalkOutcome::Err { msg, path } => {
                log::warn!("permission denied or error accessing path: {}", msg);
                if let Some(p) = path {
                    ctx.skipped_paths.lock().unwrap().push(p);
                }
            }
        }
    }
    let _ = path_count_tx.send(count);
    drop(path_tx);
    count
}
