//! Pipeline context and tuning: shared data passed into the walk thread and
//! drive-derived settings (spec §4.1, §5).
//!
//! Generalizes the teacher's `PipelineContext`/`PipelineTuning`/
//! `PipelineChannels` from "one root, one exclude-glob list" to the full
//! walker filter set (include globs, size bounds, depth, hidden/symlink/
//! empty-file policy) while keeping the same channel-based thread handoff.

use crossbeam_channel::{Receiver, Sender, bounded};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::types::{FileRecord, RunConfig};

/// Channel capacity for the path and record channels. The teacher tunes this
/// by drive type and stored path count; a fixed generous bound is simpler
/// and, unlike the teacher's single-DB-file index, this pipeline has no
/// stored path count to tune from ahead of the first walk.
pub const PIPELINE_CHANNEL_CAP: usize = 65_536;

/// Drive-derived tuning: worker count, walk mode, network flag. Filled by
/// the engine from `disk_detect::determine_threads_for_drive`.
#[derive(Clone, Debug)]
pub struct PipelineTuning {
    pub num_threads: usize,
    pub parallel_walk: bool,
    pub is_network_drive: bool,
}

/// Walker filters resolved once from [`RunConfig`] before the scan starts
/// (spec §4.1 inputs).
#[derive(Clone, Debug)]
pub struct WalkFilters {
    pub exclude_paths: Vec<PathBuf>,
    pub include_globs: Vec<String>,
    pub min_size: u64,
    pub max_size: Option<u64>,
    pub max_depth: Option<usize>,
    pub include_hidden: bool,
    pub follow_symlinks: bool,
    pub include_empty_files: bool,
}

impl WalkFilters {
    pub fn from_config(cfg: &RunConfig) -> Self {
        WalkFilters {
            exclude_paths: cfg
                .exclude_globs
                .iter()
                .map(|p| {
                    let path = PathBuf::from(p);
                    path.canonicalize().unwrap_or(path)
                })
                .collect(),
            include_globs: cfg.include_globs.clone(),
            min_size: cfg.min_size,
            max_size: cfg.max_size,
            max_depth: cfg.max_depth,
            include_hidden: cfg.include_hidden,
            follow_symlinks: cfg.follow_symlinks,
            include_empty_files: cfg.include_empty_files,
        }
    }
}

/// Shared context for one root's walk + metadata pipeline.
pub struct PipelineContext {
    pub root: PathBuf,
    pub filters: WalkFilters,
    pub skipped_paths: Arc<Mutex<Vec<PathBuf>>>,
}

/// Handles returned by [`crate::pipeline::orchestrator::run_pipeline`].
pub struct PipelineHandles {
    pub record_rx: Receiver<FileRecord>,
    pub path_count_rx: Receiver<usize>,
    pub walk_handles: Vec<JoinHandle<usize>>,
    pub worker_handles: Vec<JoinHandle<()>>,
    pub is_network_drive: bool,
    pub skipped_paths: Arc<Mutex<Vec<PathBuf>>>,
}

/// Channels and per-root contexts for the pipeline.
pub struct PipelineChannels {
    pub path_tx: Sender<PathBuf>,
    pub path_rx: Receiver<PathBuf>,
    pub record_tx: Sender<FileRecord>,
    pub record_rx: Receiver<FileRecord>,
    pub path_count_tx: Sender<usize>,
    pub path_count_rx: Receiver<usize>,
    pub skipped_paths: Arc<Mutex<Vec<PathBuf>>>,
}

pub fn create_pipeline_channels() -> PipelineChannels {
    let (path_tx, path_rx) = bounded::<PathBuf>(PIPELINE_CHANNEL_CAP);
    let (record_tx, record_rx) = bounded::<FileRecord>(PIPELINE_CHANNEL_CAP);
    let (path_count_tx, path_count_rx) = bounded::<usize>(16);
    PipelineChannels {
        path_tx,
        path_rx,
        record_tx,
        record_rx,
        path_count_tx,
        path_count_rx,
        skipped_paths: Arc::new(Mutex::new(Vec::new())),
    }
}
