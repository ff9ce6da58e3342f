//! Engine module: CLI, progress display, store I/O, naming tools

pub mod arg_parser;
pub mod cli;
pub mod progress;
pub mod store;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::{Cli, FormatArg};
pub use cli::handle_run;
pub use tools::{chunk_path, glob_match, parse_track_name, run_prefix};
