//! Path, naming, and filter utilities

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::utils::config::STORE_EXTENSION;
use crate::{Partition, TrackFormat};

/// Identity encoded in an input file name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrackName {
    pub prefix: String,
    /// Only text dumps carry a particle id in the name.
    pub particle_id: Option<i64>,
    pub block_id: i64,
}

/// Parse `<prefix>.<particle>.<block>.track.dat` or `<prefix>.<block>.track_mpiio_optimized`.
pub fn parse_track_name(path: &Path, format: TrackFormat) -> Option<TrackName> {
    let name = path.file_name()?.to_str()?;
    let base = name.strip_suffix(format.file_suffix())?;
    match format {
        TrackFormat::Ascii => {
            let mut parts = base.rsplitn(3, '.');
            let block_id = parts.next()?.parse().ok()?;
            let particle_id = parts.next()?.parse().ok()?;
            let prefix = parts.next()?.to_string();
            Some(TrackName {
                prefix,
                particle_id: Some(particle_id),
                block_id,
            })
        }
        TrackFormat::Binary => {
            let mut parts = base.rsplitn(2, '.');
            let block_id = parts.next()?.parse().ok()?;
            let prefix = parts.next()?.to_string();
            Some(TrackName {
                prefix,
                particle_id: None,
                block_id,
            })
        }
    }
}

/// Run prefix of an input file: everything before the first '.'.
pub fn run_prefix(path: &Path) -> String {
    path.file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.split('.').next())
        .unwrap_or("tracks")
        .to_string()
}

/// Stem for a binary file's intermediate store: the name without suffix, dots to underscores.
pub fn binary_store_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let base = name
        .strip_suffix(TrackFormat::BINARY_SUFFIX)
        .unwrap_or(&name);
    base.replace('.', "_")
}

/// Output chunk path: `<dest>/<prefix>_particles_<lo>_<hi>.sqlite`.
pub fn chunk_path(dest: &Path, prefix: &str, partition: Partition) -> PathBuf {
    dest.join(format!(
        "{prefix}_particles_{}_{}.{STORE_EXTENSION}",
        partition.lo, partition.hi
    ))
}

/// Glob matching `*` and `?` against the whole text.
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().collect();
    let t: Vec<char> = text.chars().collect();
    let (mut pi, mut ti) = (0, 0);
    // Last '*' seen and the text position it is currently absorbing up to.
    let mut star: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '?' || p[pi] == t[ti]) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '*' {
            star = Some((pi, ti));
            pi += 1;
        } else if let Some((sp, st)) = star {
            pi = sp + 1;
            ti = st + 1;
            star = Some((sp, st + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|&c| c == '*')
}

/// Canonicalize `path` and require it to be a directory.
pub fn check_dir_and_canonicalize(path: &Path, what: &str) -> Result<PathBuf> {
    let canonical = path
        .canonicalize()
        .with_context(|| format!("canonicalize {what} {}", path.display()))?;
    if !canonical.is_dir() {
        anyhow::bail!("{what} {} is not a directory", canonical.display());
    }
    Ok(canonical)
}
