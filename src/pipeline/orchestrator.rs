//! Orchestrates the walker + metadata stages across one or more roots (spec
//! §4.1, §5). Grounded on the teacher's `run_pipeline`/
//! `setup_pipeline_root_and_tuning`, generalized from a single root to the
//! spec's "roots (one or more)" and rid of the DB-path-specific exclusion
//! that only made sense for the teacher's single index file.

use anyhow::Result;
use rusqlite::Connection;
use std::path::{Path, PathBuf};

use crate::disk_detect::determine_threads_for_drive;
use crate::types::RunConfig;
use crate::utils::config::WorkerThreadLimits;

use super::context::{
    PipelineContext, PipelineHandles, PipelineTuning, WalkFilters, create_pipeline_channels,
};
use super::metadata::spawn_metadata_workers;
use super::walk::spawn_walk_thread;

/// Canonicalize the configured roots, reject non-directories.
fn canonicalize_roots(roots: &[PathBuf]) -> Result<Vec<PathBuf>> {
    roots
        .iter()
        .map(|r| {
            let canonical = r
                .canonicalize()
                .map_err(|e| anyhow::anyhow!("canonicalize root {}: {}", r.display(), e))?;
            if !canonical.is_dir() {
                anyhow::bail!("root {} is not a directory", canonical.display());
            }
            Ok(canonical)
        })
        .collect()
}

/// Drive-aware tuning for the first root (mixed-drive trees use the first
/// root's tuning for the whole run, matching the teacher's one-tuning-per-run
/// design).
fn tuning_for_roots(
    roots: &[PathBuf],
    conn: &Connection,
    override_threads: Option<usize>,
) -> PipelineTuning {
    let primary = roots.first().map(Path::new).unwrap_or(Path::new("."));
    let available = WorkerThreadLimits::current().all_threads;
    let (num_threads, drive_type, parallel_walk) =
        determine_threads_for_drive(primary, conn, available, override_threads);
    PipelineTuning {
        num_threads,
        parallel_walk,
        is_network_drive: drive_type.is_network(),
    }
}

/// Start the walk + metadata pipeline across every configured root. Returns
/// a receiver of [`crate::types::FileRecord`] skeletons (no digest yet) and
/// the join handles the caller must wait on.
pub fn run_pipeline(cfg: &RunConfig, conn: &Connection) -> Result<PipelineHandles> {
    let roots = canonicalize_roots(&cfg.roots)?;
    let tuning = tuning_for_roots(&roots, conn, cfg.num_threads);
    let filters = WalkFilters::from_config(cfg);

    let channels = create_pipeline_channels();
    let skipped_paths = channels.skipped_paths.clone();

    let mut walk_handles = Vec::with_capacity(roots.len());
    for root in &roots {
        let ctx = PipelineContext {
            root: root.clone(),
            filters: filters.clone(),
            skipped_paths: channels.skipped_paths.clone(),
        };
        walk_handles.push(spawn_walk_thread(
            channels.path_tx.clone(),
            channels.path_count_tx.clone(),
            ctx,
            tuning.parallel_walk,
        ));
    }
    drop(channels.path_tx);
    drop(channels.path_count_tx);

    let worker_handles = spawn_metadata_workers(
        channels.path_rx,
        &channels.record_tx,
        &filters,
        tuning.num_threads,
    );
    drop(channels.record_tx);

    Ok(PipelineHandles {
        record_rx: channels.record_rx,
        path_count_rx: channels.path_count_rx,
        walk_handles,
        worker_handles,
        is_network_drive: tuning.is_network_drive,
        skipped_paths,
    })
}

/// Join every walk thread and every metadata worker. Call after the record
/// channel has been fully drained.
pub fn shutdown_pipeline_handles(
    walk_handles: Vec<std::thread::JoinHandle<usize>>,
    worker_handles: Vec<std::thread::JoinHandle<()>>,
) -> Result<usize> {
    let mut total = 0usize;
    for h in walk_handles {
        total += h
            .join()
            .map_err(|_| anyhow::anyhow!("walk thread panicked"))?;
    }
    for h in worker_handles {
        let _ = h.join();
    }
    Ok(total)
}
