//! Trackcollate: turn per-process particle track dumps into particle-indexed stores

pub mod collate;
pub mod decode;
pub mod engine;
pub mod error;
pub mod identity;
pub mod pipeline;
pub mod types;
pub mod utils;
pub mod verify;

/// Re-export types for API
pub use types::*;

pub use error::CollateError;
pub use pipeline::{collate_tracks_from_ascii, collate_tracks_from_binary};

use log::debug;
use std::path::Path;

/// Result alias used by public trackcollate API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Single entry point: collate every `format` track file in `source` into `dest`.
///
/// Runs decode → assign → collect → verify on a pool of `opts.num_workers` threads (or only
/// collect → verify with `opts.restart_collect`) and removes the intermediate stores once the
/// output has been verified. Domain failures are [`CollateError`]s inside the returned error.
pub fn collate_tracks(
    format: TrackFormat,
    source: &Path,
    dest: &Path,
    opts: &CollateOpts,
) -> Result<CollationReport> {
    let config_str = format!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_string().to_uppercase(),
        opts
    );
    debug!("{}", config_str);

    match format {
        TrackFormat::Ascii => collate_tracks_from_ascii(source, dest, opts),
        TrackFormat::Binary => collate_tracks_from_binary(source, dest, opts),
    }
}
