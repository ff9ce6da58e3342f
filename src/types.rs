//! Public and internal types for the trackcollate API and pipeline.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use crate::utils::config::DEFAULT_MAX_STORE_SIZE_MB;

/// On-disk flavour of the per-process dumps.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TrackFormat {
    /// `<prefix>.<local_particle_id>.<block_id>.track.dat`, whitespace-delimited text.
    Ascii,
    /// `<prefix>.<block_id>.track_mpiio_optimized`, one text line then raw f64s.
    Binary,
}

impl TrackFormat {
    pub const ASCII_SUFFIX: &'static str = ".track.dat";
    pub const BINARY_SUFFIX: &'static str = ".track_mpiio_optimized";

    pub fn file_suffix(self) -> &'static str {
        match self {
            TrackFormat::Ascii => Self::ASCII_SUFFIX,
            TrackFormat::Binary => Self::BINARY_SUFFIX,
        }
    }

    /// Glob used to discover input files in the source directory.
    pub fn glob(self) -> String {
        format!("*{}", self.file_suffix())
    }

    pub fn name(self) -> &'static str {
        match self {
            TrackFormat::Ascii => "ascii",
            TrackFormat::Binary => "binary",
        }
    }
}

/// Decoded per-record columns, in file order, excluding the id columns and the derived ones.
///
/// Persisted as JSON in every store so the collect stage can check that all stores agree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnLayout {
    pub columns: Vec<String>,
    /// Binary dumps carry a species id per record; ascii dumps do not.
    pub has_species: bool,
}

impl ColumnLayout {
    /// Columns every store carries besides the decoded ones.
    pub const RESERVED: [&'static str; 5] =
        ["particle_id", "block_id", "species", "mu", "delta_mu_abs"];

    /// Validate names: `time` must exist, no reserved or duplicate names (SQLite is case-insensitive).
    pub fn new(columns: Vec<String>, has_species: bool) -> Result<Self, String> {
        let mut seen = std::collections::HashSet::new();
        for name in &columns {
            let lower = name.to_ascii_lowercase();
            if name.is_empty() {
                return Err("empty column name".to_string());
            }
            if Self::RESERVED.contains(&lower.as_str()) {
                return Err(format!("column name '{name}' is reserved"));
            }
            if !seen.insert(lower) {
                return Err(format!("duplicate column name '{name}'"));
            }
        }
        if !columns.iter().any(|c| c == "time") {
            return Err("no 'time' column".to_string());
        }
        Ok(Self {
            columns,
            has_species,
        })
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of `time`; present by construction.
    pub fn time_index(&self) -> usize {
        self.index_of("time").unwrap_or(0)
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }
}

/// One (particle, time) sample.
#[derive(Clone, Debug, PartialEq)]
pub struct TrackRow {
    /// Local id after decode, run-global id after identity assignment.
    pub particle_id: i64,
    pub block_id: i64,
    pub species: Option<i64>,
    /// Decoded values in [`ColumnLayout`] order.
    pub values: Vec<f64>,
    pub mu: f64,
    /// Only filled by the collect stage.
    pub delta_mu_abs: Option<f64>,
}

/// Decoded contents of one input file (or one group of files).
#[derive(Clone, Debug)]
pub struct TrackTable {
    pub layout: ColumnLayout,
    pub rows: Vec<TrackRow>,
}

/// Per-store result of the decode stage; reduced into the global extrema at the first barrier.
#[derive(Clone, Debug)]
pub struct DecodeSummary {
    pub store: PathBuf,
    pub layout: ColumnLayout,
    pub rows: usize,
    pub species_min: Option<i64>,
    pub species_max: Option<i64>,
    pub particle_id_max: Option<i64>,
}

/// Inclusive range of global particle ids materialized as one output chunk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Partition {
    pub lo: i64,
    pub hi: i64,
}

impl Partition {
    pub fn contains(&self, id: i64) -> bool {
        self.lo <= id && id <= self.hi
    }
}

#[derive(Clone, Debug)]
pub struct ChunkSummary {
    pub path: PathBuf,
    pub partition: Partition,
    pub rows: usize,
}

/// What a successful run produced.
#[derive(Clone, Debug, Default)]
pub struct CollationReport {
    pub chunks: Vec<ChunkSummary>,
    pub total_rows: usize,
    pub unique_ids: usize,
}

/// Options for [`collate_tracks`](crate::collate_tracks).
#[derive(Clone, Debug)]
pub struct CollateOpts {
    /// Worker pool size. When None, uses every rayon thread.
    pub num_workers: Option<usize>,
    /// Approximate upper bound on one ascii intermediate store, in MB.
    pub max_store_size_mb: u64,
    /// Binary only: skip decode + assign and collect from existing intermediate stores.
    pub restart_collect: bool,
    /// Show per-stage progress bars.
    pub verbose: bool,
    /// Set to true to stop handing out work (Ctrl+C in the CLI).
    pub cancel: Option<Arc<AtomicBool>>,
}

impl Default for CollateOpts {
    fn default() -> Self {
        Self {
            num_workers: None,
            max_store_size_mb: DEFAULT_MAX_STORE_SIZE_MB,
            restart_collect: false,
            verbose: false,
            cancel: None,
        }
    }
}
