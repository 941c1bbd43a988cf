//! Engine module: the run controller (C8) and progress reporting.

pub mod progress;
pub mod run;

pub use progress::*;
pub use run::{run as run_scan, setup_ctrlc_handler};
