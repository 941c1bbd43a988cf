//! Pipeline components: context, walk loop, metadata extraction, error
//! handling, and the orchestrator tying them together (C1, spec §4.1).

pub mod context;
pub mod error_handler;
pub mod metadata;
pub mod orchestrator;
pub mod walk;

pub use context::{
    PipelineChannels, PipelineContext, PipelineHandles, PipelineTuning, WalkFilters,
    create_pipeline_channels,
};
pub use error_handler::check_for_initial_error_or_skipped_paths;
pub use metadata::spawn_metadata_workers;
pub use orchestrator::{run_pipeline, shutdown_pipeline_handles};
pub use walk::{
    WalkOutcome, run_walk_loop, spawn_walk_thread, to_outcome_jwalk, to_outcome_walkdir,
};
