pub mod config;
pub mod fd_limit;
pub mod logger;
pub mod tempfiles;

pub use fd_limit::{FDS_PER_WORKER, max_open_fds, max_workers_by_fd_limit};
pub use logger::setup_logging;
pub use tempfiles::{remove_stale_temp, rename_temp_to_final, temp_sibling, write_atomic};
