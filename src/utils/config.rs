//! Application configuration constants.
//! Tuning and thresholds in one place.

use std::ops::RangeInclusive;
use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived names: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    pkg_name: &'static str,
    toml_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache names from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                pkg_name: pkg,
                toml_filename: format!(".{pkg}.toml"),
            }
        })
    }

    pub fn pkg_name(&self) -> &str {
        self.pkg_name
    }

    /// Per-directory settings file read by the CLI.
    pub fn toml_filename(&self) -> &str {
        &self.toml_filename
    }
}

/// Extension shared by intermediate stores and output chunks.
pub const STORE_EXTENSION: &str = "sqlite";

/// Suffix (before the extension) marking an intermediate store.
pub const TEMP_STORE_SUFFIX: &str = "_temp";

// ---- Worker threads ----

/// Worker pool limits.
/// Use [`WorkerThreadLimits::current()`] to fill `all_threads` from rayon; the rest are const.
#[derive(Clone, Copy, Debug)]
pub struct WorkerThreadLimits {
    /// Available threads (from rayon); set by [`WorkerThreadLimits::current()`].
    pub all_threads: usize,
    /// Never run a stage with fewer workers than this.
    pub floor: usize,
}

impl Default for WorkerThreadLimits {
    fn default() -> Self {
        Self {
            all_threads: 0, // use current() to set from rayon
            floor: Self::FLOOR_THREADS,
        }
    }
}

impl WorkerThreadLimits {
    pub const FLOOR_THREADS: usize = 1;

    /// Build limits with `all_threads` set from `rayon::current_num_threads()`.
    pub fn current() -> Self {
        Self {
            all_threads: rayon::current_num_threads(),
            ..Self::default()
        }
    }

    /// Requested worker count, or every available thread; never below the floor.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.all_threads).max(self.floor)
    }
}

// ---- Stores ----

/// Rows per insert transaction (balance transaction size vs round-trips).
pub const STORE_INSERT_BATCH_SIZE: usize = 10_000;

/// Default approximate size of one ascii intermediate store (MB).
pub const DEFAULT_MAX_STORE_SIZE_MB: u64 = 2000;

/// Text dumps shrink roughly this much once decoded to f64 columns.
pub const ASCII_TO_BINARY_RATIO: u64 = 3;

// ---- Binary layout sniffing ----

/// Constants of the upstream writer's id-field convention: integer-valued ids are written
/// as `id + INT_TO_FLOAT_OFFSET` so they can be told apart from physics floats.
pub struct LayoutSniffConsts;

impl LayoutSniffConsts {
    pub const INT_TO_FLOAT_OFFSET: f64 = 0.001;
    pub const ABS_ALLOWED_ERR: f64 = 5.0e-13;
    /// 1D/2D/3D without forcing (18..=20), then with forcing (21..=23).
    pub const VALID_WIDTHS: RangeInclusive<usize> = 18..=23;
}

// ---- Input reading ----

/// Binary dumps above this size are memory-mapped instead of read into a buffer (bytes). 100 MB.
pub const MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;
