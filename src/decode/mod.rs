//! Record decoding: each decode unit turns one binary dump, or one group of text dumps, into
//! one intermediate store and reports the extrema the identity stage needs.

pub mod ascii;
pub mod binary;
pub mod moment;
pub mod restart;

pub use ascii::{AsciiHeader, HEADER_PREFIX, parse_header, read_ascii_track};
pub use binary::{binary_column_names, has_id_offset, infer_row_width, read_binary_track};
pub use moment::{MomentColumns, fill_magnetic_moment, magnetic_moment};
pub use restart::{apply_mask, count_restarts, restart_mask};

use anyhow::Result;
use log::{debug, warn};
use std::path::{Path, PathBuf};

use crate::engine::store;
use crate::engine::tools::parse_track_name;
use crate::error::CollateError;
use crate::{DecodeSummary, TrackFormat, TrackRow};

/// Running extrema over decoded rows.
#[derive(Default)]
struct Extent {
    species_min: Option<i64>,
    species_max: Option<i64>,
    particle_id_max: Option<i64>,
}

impl Extent {
    fn observe(&mut self, rows: &[TrackRow]) {
        for row in rows {
            if let Some(s) = row.species {
                self.species_min = Some(self.species_min.map_or(s, |m| m.min(s)));
                self.species_max = Some(self.species_max.map_or(s, |m| m.max(s)));
            }
            self.particle_id_max = Some(
                self.particle_id_max
                    .map_or(row.particle_id, |m| m.max(row.particle_id)),
            );
        }
    }
}

/// Decode a group of text dumps into one store. All files in a group must share a layout.
pub fn decode_ascii_group(files: &[PathBuf], store_path: &Path) -> Result<DecodeSummary> {
    let mut conn = None;
    let mut layout = None;
    let mut extent = Extent::default();
    let mut rows = 0_usize;

    for path in files {
        debug!("Decoding {}", path.display());
        let (header, table) = read_ascii_track(path)?;
        if let Some(name) = parse_track_name(path, TrackFormat::Ascii)
            && (name.particle_id != Some(header.particle_id) || name.block_id != header.block_id)
        {
            warn!(
                "{}: header ids (id={} block={}) differ from the file name; using the header",
                path.display(),
                header.particle_id,
                header.block_id
            );
        }
        if layout.is_none() {
            conn = Some(store::create_store(store_path, &table.layout)?);
            layout = Some(table.layout.clone());
        } else if layout.as_ref() != Some(&table.layout) {
            return Err(CollateError::inconsistent(
                path.display().to_string(),
                format!(
                    "columns {:?} differ from the rest of the group",
                    table.layout.columns
                ),
            )
            .into());
        }
        if let Some(c) = conn.as_mut() {
            rows += store::write_rows(c, &table.layout, &table.rows)?;
        }
        extent.observe(&table.rows);
    }

    let (Some(conn), Some(layout)) = (conn, layout) else {
        anyhow::bail!("empty decode group for {}", store_path.display());
    };
    store::finish_store(conn)?;
    Ok(DecodeSummary {
        store: store_path.to_path_buf(),
        layout,
        rows,
        species_min: extent.species_min,
        species_max: extent.species_max,
        particle_id_max: extent.particle_id_max,
    })
}

/// Decode one binary dump into one store.
pub fn decode_binary_file(path: &Path, store_path: &Path) -> Result<DecodeSummary> {
    debug!("Starting with file {}", path.display());
    let table = read_binary_track(path)?;
    let mut conn = store::create_store(store_path, &table.layout)?;
    let rows = store::write_rows(&mut conn, &table.layout, &table.rows)?;
    store::finish_store(conn)?;

    let mut extent = Extent::default();
    extent.observe(&table.rows);
    debug!("Finished with file {}", path.display());
    Ok(DecodeSummary {
        store: store_path.to_path_buf(),
        layout: table.layout,
        rows,
        species_min: extent.species_min,
        species_max: extent.species_max,
        particle_id_max: extent.particle_id_max,
    })
}
