//! Post-run verification: chunk count and row conservation.

use anyhow::Result;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::engine::store;
use crate::engine::tools::glob_match;
use crate::error::CollateError;
use crate::utils::config::STORE_EXTENSION;

/// Output chunks for `prefix` currently present in `dest`.
pub fn chunk_files_on_disk(dest: &Path, prefix: &str) -> Vec<PathBuf> {
    let pattern = format!("{prefix}_particles_*_*.{STORE_EXTENSION}");
    let mut found: Vec<PathBuf> = WalkDir::new(dest)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| glob_match(&pattern, &e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect();
    found.sort();
    found
}

/// Confirm that exactly `expected_chunks` chunk files exist (both the ones this run wrote and
/// the ones matching the naming pattern in `dest`) and that their rows sum to `expected_rows`.
pub fn verify_collation(
    chunk_paths: &[PathBuf],
    dest: &Path,
    prefix: &str,
    expected_chunks: usize,
    expected_rows: usize,
) -> Result<(), CollateError> {
    let existing = chunk_paths.iter().filter(|p| p.is_file()).count();
    if chunk_paths.len() != expected_chunks || existing != expected_chunks {
        return Err(CollateError::CollationIntegrity {
            what: "output chunk files",
            expected: expected_chunks,
            actual: existing,
        });
    }
    let on_disk = chunk_files_on_disk(dest, prefix).len();
    if on_disk != expected_chunks {
        return Err(CollateError::CollationIntegrity {
            what: "chunk files in the destination directory",
            expected: expected_chunks,
            actual: on_disk,
        });
    }

    let mut written = 0_usize;
    let mut readable = 0_usize;
    for path in chunk_paths {
        match store::open_store_read_only(path).and_then(|conn| store::row_count(&conn)) {
            Ok(rows) => {
                readable += 1;
                written += rows;
            }
            Err(e) => log::error!("{}: unreadable chunk: {e:#}", path.display()),
        }
    }
    if readable != expected_chunks {
        return Err(CollateError::CollationIntegrity {
            what: "readable output chunks",
            expected: expected_chunks,
            actual: readable,
        });
    }
    if written != expected_rows {
        return Err(CollateError::CollationIntegrity {
            what: "rows written",
            expected: expected_rows,
            actual: written,
        });
    }
    Ok(())
}
