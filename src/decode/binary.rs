//! Binary `.track_mpiio_optimized` decoding.
//!
//! One ASCII line (simulation time), then a flat run of 8-byte floats with no row markers.
//! The row width depends on dimensionality and on whether forcing terms were written, so it
//! is sniffed from the id fields, which the writer stores as `id + 0.001`.

use anyhow::{Context, Result};
use log::debug;
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::moment::{MomentColumns, fill_magnetic_moment};
use crate::error::CollateError;
use crate::utils::config::{LayoutSniffConsts, MMAP_THRESHOLD};
use crate::{ColumnLayout, TrackRow, TrackTable};

/// Every column a 3D run with forcing writes, in record order.
pub const FULL_SCHEMA: [&str; 23] = [
    "particle_id",
    "block_id",
    "species",
    "time",
    "x1",
    "x2",
    "x3",
    "v1",
    "v2",
    "v3",
    "B1",
    "B2",
    "B3",
    "E1",
    "E2",
    "E3",
    "U1",
    "U2",
    "U3",
    "dens",
    "forcing1",
    "forcing2",
    "forcing3",
];

/// Leading id fields of each record: particle id, block id, species.
pub const ID_FIELDS: usize = 3;

/// Column names for a sniffed width, ids included. None outside 18..=23.
pub fn binary_column_names(width: usize) -> Option<Vec<&'static str>> {
    // (missing position axes, forcing present)
    let (dropped_axes, forcing) = match width {
        18 => (2, false),
        19 => (1, false),
        20 => (0, false),
        21 => (2, true),
        22 => (1, true),
        23 => (0, true),
        _ => return None,
    };
    let dropped: &[&str] = match dropped_axes {
        2 => &["x2", "x3"],
        1 => &["x3"],
        _ => &[],
    };
    Some(
        FULL_SCHEMA
            .iter()
            .copied()
            .filter(|c| !dropped.contains(c))
            .filter(|c| forcing || !c.starts_with("forcing"))
            .collect(),
    )
}

/// True if `v` looks like an integer id written with the offset convention.
pub fn has_id_offset(v: f64) -> bool {
    ((v - v.floor()) - LayoutSniffConsts::INT_TO_FLOAT_OFFSET).abs()
        < LayoutSniffConsts::ABS_ALLOWED_ERR
}

/// Sniff the row width: the first candidate `w` whose `data[w]` and `data[w + 1]` (the particle
/// and block id of the second record) both carry the id offset. A payload holding exactly one
/// record is accepted when its own first two fields carry it.
pub fn infer_row_width(data: &[f64]) -> Option<usize> {
    LayoutSniffConsts::VALID_WIDTHS.clone().find(|&w| {
        if data.len() > w + 1 {
            has_id_offset(data[w]) && has_id_offset(data[w + 1])
        } else {
            data.len() == w && has_id_offset(data[0]) && has_id_offset(data[1])
        }
    })
}

/// Reinterpret bytes as f64s, native order or byte-swapped.
fn decode_f64s(bytes: &[u8], swap: bool) -> Vec<f64> {
    bytes
        .chunks_exact(8)
        .map(|c| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(c);
            if swap {
                raw.reverse();
            }
            f64::from_ne_bytes(raw)
        })
        .collect()
}

/// Run `f` over the whole file: memory-mapped above [`MMAP_THRESHOLD`], buffered below.
fn with_file_bytes<R>(path: &Path, f: impl FnOnce(&[u8]) -> Result<R>) -> Result<R> {
    let mut file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let size = file.metadata()?.len();
    if size > MMAP_THRESHOLD {
        let mmap = unsafe { Mmap::map(&file)? };
        f(&mmap)
    } else {
        let mut buf = Vec::with_capacity(size as usize);
        file.read_to_end(&mut buf)
            .with_context(|| format!("read {}", path.display()))?;
        f(&buf)
    }
}

/// Split off the header line; returns (header, payload).
fn split_header<'a>(path: &Path, bytes: &'a [u8]) -> Result<(&'a [u8], &'a [u8]), CollateError> {
    let newline = bytes
        .iter()
        .position(|&b| b == b'\n')
        .ok_or_else(|| CollateError::format(path, "no header line"))?;
    Ok((&bytes[..newline], &bytes[newline + 1..]))
}

/// Turn a flat value run into rows of `width`.
fn rows_from_values(data: &[f64], width: usize) -> Vec<TrackRow> {
    data.chunks_exact(width)
        .map(|rec| TrackRow {
            particle_id: rec[0].floor() as i64,
            block_id: rec[1].floor() as i64,
            species: Some(rec[2].floor() as i64),
            values: rec[ID_FIELDS..].to_vec(),
            mu: f64::NAN,
            delta_mu_abs: None,
        })
        .collect()
}

/// Decode one binary dump and compute `mu`. Rows carry the file-local particle id.
pub fn read_binary_track(path: &Path) -> Result<TrackTable> {
    with_file_bytes(path, |bytes| {
        let (header, payload) = split_header(path, bytes)?;
        debug!(
            "{}: simulation time {}",
            path.display(),
            String::from_utf8_lossy(header).trim()
        );
        if payload.len() % 8 != 0 {
            return Err(CollateError::inconsistent(
                path.display().to_string(),
                format!("payload of {} bytes is not a whole number of f64s", payload.len()),
            )
            .into());
        }

        let mut data = decode_f64s(payload, false);
        let mut width = infer_row_width(&data);
        if width.is_none() {
            let swapped = decode_f64s(payload, true);
            if let Some(w) = infer_row_width(&swapped) {
                debug!("{}: payload is byte-swapped", path.display());
                data = swapped;
                width = Some(w);
            }
        }
        let width = width.ok_or_else(|| CollateError::LayoutInference {
            path: path.to_path_buf(),
            values: data.len(),
        })?;
        if data.len() % width != 0 {
            return Err(CollateError::inconsistent(
                path.display().to_string(),
                format!("{} values is not a multiple of the row width {width}", data.len()),
            )
            .into());
        }

        let names = binary_column_names(width).ok_or(CollateError::LayoutInference {
            path: path.to_path_buf(),
            values: data.len(),
        })?;
        let columns = names[ID_FIELDS..].iter().map(|c| c.to_string()).collect();
        let layout = ColumnLayout::new(columns, true)
            .map_err(|reason| CollateError::format(path, reason))?;
        let moment_cols = MomentColumns::locate(&layout)
            .ok_or_else(|| CollateError::format(path, "binary layout lacks v, B, or U"))?;

        let mut rows = rows_from_values(&data, width);
        fill_magnetic_moment(&mut rows, moment_cols);
        debug!("{}: width {}, {} rows", path.display(), width, rows.len());
        Ok(TrackTable { layout, rows })
    })
}
