//! Text `.track.dat` decoding.
//!
//! Line 1: `# Pegasus++ track data for particle with ... id=<N> ... block=<M>`.
//! Line 2: `#` followed by one `<label>=<column>` token per column.
//! Body: whitespace-delimited numeric rows.

use anyhow::{Context, Result};
use log::debug;
use std::path::Path;

use super::moment::{MomentColumns, fill_magnetic_moment};
use super::restart::{apply_mask, count_restarts, restart_mask};
use crate::error::CollateError;
use crate::{ColumnLayout, TrackRow, TrackTable};

/// Fixed leading tokens of the first header line.
pub const HEADER_PREFIX: [&str; 7] = ["#", "Pegasus++", "track", "data", "for", "particle", "with"];

/// Identity and columns parsed from the two header lines.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AsciiHeader {
    pub particle_id: i64,
    pub block_id: i64,
    pub columns: Vec<String>,
}

fn tagged_value(tokens: &[&str], tag: &str) -> Option<i64> {
    tokens
        .iter()
        .rev()
        .find_map(|t| t.strip_prefix(tag))
        .and_then(|v| v.parse().ok())
}

/// Parse both header lines.
pub fn parse_header(path: &Path, line1: &str, line2: &str) -> Result<AsciiHeader, CollateError> {
    let tokens: Vec<&str> = line1.split_whitespace().collect();
    if tokens.len() < HEADER_PREFIX.len() || tokens[..HEADER_PREFIX.len()] != HEADER_PREFIX {
        return Err(CollateError::format(
            path,
            format!("header does not start with '{}'", HEADER_PREFIX.join(" ")),
        ));
    }
    let rest = &tokens[HEADER_PREFIX.len()..];
    let particle_id = tagged_value(rest, "id=")
        .ok_or_else(|| CollateError::format(path, "header has no 'id=<N>' token"))?;
    let block_id = tagged_value(rest, "block=")
        .ok_or_else(|| CollateError::format(path, "header has no 'block=<M>' token"))?;

    let mut names = line2.split_whitespace();
    if names.next() != Some("#") {
        return Err(CollateError::format(
            path,
            "second header line does not start with '#'",
        ));
    }
    let columns: Vec<String> = names
        .map(|t| t.rsplit('=').next().unwrap_or(t).to_string())
        .collect();
    if columns.is_empty() {
        return Err(CollateError::format(path, "no column names in header"));
    }
    Ok(AsciiHeader {
        particle_id,
        block_id,
        columns,
    })
}

/// Parse body lines into value rows, each exactly `width` wide. Blank lines are skipped.
fn parse_body<'a>(
    path: &Path,
    lines: impl Iterator<Item = (usize, &'a str)>,
    width: usize,
) -> Result<Vec<Vec<f64>>, CollateError> {
    let mut rows = Vec::new();
    for (line_no, line) in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let values = line
            .split_whitespace()
            .map(str::parse::<f64>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| CollateError::format(path, format!("line {}: {e}", line_no + 1)))?;
        if values.len() != width {
            return Err(CollateError::format(
                path,
                format!(
                    "line {}: expected {} values, found {}",
                    line_no + 1,
                    width,
                    values.len()
                ),
            ));
        }
        rows.push(values);
    }
    Ok(rows)
}

/// Decode one text dump: parse, drop restart segments, compute `mu`.
/// Rows carry the file-local particle id; the global id is assigned later.
pub fn read_ascii_track(path: &Path) -> Result<(AsciiHeader, TrackTable)> {
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut lines = text.lines().enumerate();
    let line1 = lines.next().map(|(_, l)| l).unwrap_or_default();
    let line2 = lines.next().map(|(_, l)| l).unwrap_or_default();
    let header = parse_header(path, line1, line2)?;

    let layout = ColumnLayout::new(header.columns.clone(), false)
        .map_err(|reason| CollateError::format(path, reason))?;
    let moment_cols = MomentColumns::locate(&layout).ok_or_else(|| {
        CollateError::format(path, "missing velocity, field, or bulk-flow columns")
    })?;

    let values = parse_body(path, lines, layout.width())?;
    let time_idx = layout.time_index();
    let times: Vec<f64> = values.iter().map(|v| v[time_idx]).collect();
    let restarts = count_restarts(&times);
    let values = if restarts > 0 {
        let mask = restart_mask(&times);
        let kept = apply_mask(values, &mask);
        debug!(
            "{}: {} restart(s), dropped {} stale rows",
            path.display(),
            restarts,
            times.len() - kept.len()
        );
        kept
    } else {
        values
    };

    let mut rows: Vec<TrackRow> = values
        .into_iter()
        .map(|values| TrackRow {
            particle_id: header.particle_id,
            block_id: header.block_id,
            species: None,
            values,
            mu: f64::NAN,
            delta_mu_abs: None,
        })
        .collect();
    fill_magnetic_moment(&mut rows, moment_cols);

    Ok((header, TrackTable { layout, rows }))
}
