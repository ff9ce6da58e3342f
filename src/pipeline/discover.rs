//! Input discovery and decode-unit planning.

use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::TrackFormat;
use crate::engine::tools::{glob_match, parse_track_name};
use crate::error::CollateError;
use crate::identity::ascii_global_id;
use crate::utils::config::ASCII_TO_BINARY_RATIO;

/// Track files of `format` directly inside `source`, sorted by path.
pub fn discover_track_files(source: &Path, format: TrackFormat) -> Result<Vec<PathBuf>> {
    let pattern = format.glob();
    let mut files: Vec<PathBuf> = WalkDir::new(source)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| glob_match(&pattern, &e.file_name().to_string_lossy()))
        .map(|e| e.into_path())
        .collect();
    if files.is_empty() {
        return Err(CollateError::NoInputFiles {
            dir: source.to_path_buf(),
            pattern,
        }
        .into());
    }
    files.sort();
    Ok(files)
}

/// Pick the format by which kind of track file `source` holds. Both or neither is an error.
pub fn detect_format(source: &Path) -> Result<TrackFormat> {
    let has = |format: TrackFormat| {
        let pattern = format.glob();
        WalkDir::new(source)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|e| e.ok())
            .any(|e| e.file_type().is_file() && glob_match(&pattern, &e.file_name().to_string_lossy()))
    };
    match (has(TrackFormat::Ascii), has(TrackFormat::Binary)) {
        (true, false) => Ok(TrackFormat::Ascii),
        (false, true) => Ok(TrackFormat::Binary),
        (true, true) => anyhow::bail!(
            "{} holds both ascii and binary track files; pass --format",
            source.display()
        ),
        (false, false) => Err(CollateError::NoInputFiles {
            dir: source.to_path_buf(),
            pattern: format!(
                "{} or {}",
                TrackFormat::Ascii.glob(),
                TrackFormat::Binary.glob()
            ),
        }
        .into()),
    }
}

/// Split `items` into `n` consecutive runs; the first `len % n` runs get one extra item.
pub fn split_even<T: Clone>(items: &[T], n: usize) -> Vec<Vec<T>> {
    let n = n.max(1);
    let (base, extra) = (items.len() / n, items.len() % n);
    let mut out = Vec::with_capacity(n);
    let mut start = 0;
    for k in 0..n {
        let len = base + usize::from(k < extra);
        out.push(items[start..start + len].to_vec());
        start += len;
    }
    out
}

/// How many ascii groups to build for `file_count` files whose largest is `largest_bytes`.
pub fn ascii_group_count(
    file_count: usize,
    largest_bytes: u64,
    num_workers: usize,
    max_store_size_mb: u64,
) -> usize {
    if file_count == 0 {
        return 0;
    }
    let decoded_bytes = largest_bytes / ASCII_TO_BINARY_RATIO;
    let max_store_bytes = max_store_size_mb.saturating_mul(1024 * 1024);
    let per_group = match decoded_bytes {
        0 => file_count,
        b => usize::try_from(max_store_bytes / b)
            .unwrap_or(usize::MAX)
            .max(1),
    };
    let workers = num_workers.max(1);
    let groups = file_count.div_ceil(per_group);
    (groups.div_ceil(workers) * workers).min(file_count)
}

/// Sort ascii files by the global id their names encode, then split them into balanced groups.
pub fn plan_ascii_groups(
    files: &[PathBuf],
    num_workers: usize,
    max_store_size_mb: u64,
) -> Result<Vec<Vec<PathBuf>>> {
    let mut named = Vec::with_capacity(files.len());
    let mut largest = 0_u64;
    for path in files {
        let name = parse_track_name(path, TrackFormat::Ascii).ok_or_else(|| {
            CollateError::format(
                path,
                "file name is not <prefix>.<particle>.<block>.track.dat",
            )
        })?;
        let size = fs::metadata(path)
            .with_context(|| format!("stat {}", path.display()))?
            .len();
        largest = largest.max(size);
        named.push((name.particle_id.unwrap_or(0), name.block_id, path.clone()));
    }
    let particle_id_max = named.iter().map(|(p, _, _)| *p).max().unwrap_or(0);
    named.sort_by_key(|(p, b, _)| ascii_global_id(*p, *b, particle_id_max).unwrap_or(i64::MAX));
    let sorted: Vec<PathBuf> = named.into_iter().map(|(_, _, path)| path).collect();

    let n = ascii_group_count(sorted.len(), largest, num_workers, max_store_size_mb);
    debug!(
        "Grouping {} ascii files into {n} stores (largest file {largest} bytes)",
        sorted.len()
    );
    Ok(split_even(&sorted, n))
}
