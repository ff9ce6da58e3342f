pub mod config;
pub mod fd_limit;
pub mod logger;
pub mod tempfiles;
pub(crate) mod trackcollate_toml;

pub use config::*;
pub use fd_limit::{FDS_PER_STORE, max_collect_workers, max_open_fds};
pub use logger::setup_logging;
pub use tempfiles::{remove_intermediate_stores, remove_store, temp_store_path};
