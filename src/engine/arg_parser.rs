use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::TrackFormat;

/// Which kind of track file to read from SOURCE.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    /// Pick by which kind of track file SOURCE holds.
    #[default]
    Auto,
    /// `*.track.dat` text dumps.
    Ascii,
    /// `*.track_mpiio_optimized` binary dumps.
    Binary,
}

impl FormatArg {
    /// The explicit format, or None for auto-detection.
    pub fn explicit(self) -> Option<TrackFormat> {
        match self {
            FormatArg::Auto => None,
            FormatArg::Ascii => Some(TrackFormat::Ascii),
            FormatArg::Binary => Some(TrackFormat::Binary),
        }
    }
}

/// Collate per-process particle track dumps into particle-indexed stores.
#[derive(Clone, Parser)]
#[command(name = "trackcollate")]
#[command(about = "Collate per-process particle track dumps into particle-indexed stores.")]
pub struct Cli {
    /// Directory holding the track files.
    #[arg(value_name = "SOURCE")]
    pub source: PathBuf,

    /// Directory for intermediate stores and output chunks. Created if missing.
    #[arg(value_name = "DEST")]
    pub dest: PathBuf,

    /// Input format.
    #[arg(long, value_enum, default_value_t = FormatArg::Auto)]
    pub format: FormatArg,

    /// Worker pool size. Default: all available threads.
    #[arg(long, short = 'j')]
    pub workers: Option<usize>,

    /// Binary only: skip decoding and collect from the intermediate stores of an earlier run.
    #[arg(long, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub restart_collect: Option<bool>,

    /// Approximate size of one ascii intermediate store in MB.
    #[arg(long, value_name = "MB", value_parser = clap::value_parser!(u64))]
    pub max_store_size: Option<u64>,

    /// Verbose output (debug logging and per-stage progress bars).
    #[arg(long, short = 'v', num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,
}
