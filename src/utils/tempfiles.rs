use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

use crate::utils::config::{STORE_EXTENSION, TEMP_STORE_SUFFIX};

/// Intermediate store path for `stem` inside `dest`: `<dest>/<stem>_temp.sqlite`.
pub fn temp_store_path(dest: &Path, stem: &str) -> PathBuf {
    dest.join(format!("{stem}{TEMP_STORE_SUFFIX}.{STORE_EXTENSION}"))
}

/// Remove SQLite WAL and SHM files left next to a store.
pub fn remove_wal_and_shm(store_path: &Path) {
    let file_name = store_path
        .file_name()
        .map(|n| n.to_string_lossy())
        .unwrap_or_default();
    let parent = store_path.parent().unwrap_or(Path::new("."));
    let _ = fs::remove_file(parent.join(format!("{file_name}-wal")));
    let _ = fs::remove_file(parent.join(format!("{file_name}-shm")));
}

/// Delete a store and its side files. Missing files are not an error.
pub fn remove_store(store_path: &Path) -> Result<()> {
    remove_wal_and_shm(store_path);
    match fs::remove_file(store_path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("remove store {}", store_path.display())),
    }
}

/// Delete every intermediate store once the run has been verified.
pub fn remove_intermediate_stores(paths: &[PathBuf]) -> Result<()> {
    for path in paths {
        remove_store(path)?;
    }
    Ok(())
}
