//! Run-global particle identity.
//!
//! The two formats use separate formulas; neither is assumed to agree with the other:
//! - ascii: `local + block * (max_local + 1)`
//! - binary: `(species - species_min) + local * n_species + block * n_species * (max_local + 1)`
//!
//! Both are injective over their input box and independent of file discovery order, because
//! the extrema are reduced over the whole run before any store is rewritten.

use anyhow::Result;
use log::debug;
use std::path::{Path, PathBuf};

use crate::collate::{common_layout, sort_by_particle_time};
use crate::engine::store;
use crate::error::CollateError;
use crate::{DecodeSummary, TrackFormat};

/// Ascii global id; None on overflow.
pub fn ascii_global_id(local: i64, block: i64, particle_id_max: i64) -> Option<i64> {
    let n_particles = particle_id_max.checked_add(1)?;
    block.checked_mul(n_particles)?.checked_add(local)
}

/// Binary global id; None on overflow.
pub fn binary_global_id(
    species: i64,
    local: i64,
    block: i64,
    species_min: i64,
    species_max: i64,
    particle_id_max: i64,
) -> Option<i64> {
    let n_species = species_max.checked_sub(species_min)?.checked_add(1)?;
    let n_particles = particle_id_max.checked_add(1)?;
    let species_part = species.checked_sub(species_min)?;
    let local_part = local.checked_mul(n_species)?;
    let block_part = block.checked_mul(n_species)?.checked_mul(n_particles)?;
    species_part.checked_add(local_part)?.checked_add(block_part)
}

/// Global extrema reduced at the first barrier, one variant per format.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IdentityScheme {
    Ascii {
        particle_id_max: i64,
    },
    Binary {
        species_min: i64,
        species_max: i64,
        particle_id_max: i64,
    },
}

impl IdentityScheme {
    /// Reduce every decode summary into the run-wide extrema. Stores must agree on layout.
    pub fn from_summaries(
        format: TrackFormat,
        summaries: &[DecodeSummary],
    ) -> Result<Self, CollateError> {
        let layout = common_layout(summaries.iter().map(|s| (s.store.as_path(), &s.layout)))?;
        if let Some(layout) = &layout
            && layout.has_species != (format == TrackFormat::Binary)
        {
            return Err(CollateError::inconsistent(
                "decode results",
                format!("{} stores with species = {}", format.name(), layout.has_species),
            ));
        }

        let particle_id_max = summaries
            .iter()
            .filter_map(|s| s.particle_id_max)
            .max()
            .unwrap_or(0);
        Ok(match format {
            TrackFormat::Ascii => IdentityScheme::Ascii { particle_id_max },
            TrackFormat::Binary => {
                let species_min = summaries.iter().filter_map(|s| s.species_min).min();
                let species_max = summaries.iter().filter_map(|s| s.species_max).max();
                IdentityScheme::Binary {
                    species_min: species_min.unwrap_or(0),
                    species_max: species_max.unwrap_or(0),
                    particle_id_max,
                }
            }
        })
    }

    /// Global id for one row; None on overflow or a binary row without species.
    pub fn global_id(&self, local: i64, block: i64, species: Option<i64>) -> Option<i64> {
        match *self {
            IdentityScheme::Ascii { particle_id_max } => {
                ascii_global_id(local, block, particle_id_max)
            }
            IdentityScheme::Binary {
                species_min,
                species_max,
                particle_id_max,
            } => binary_global_id(
                species?,
                local,
                block,
                species_min,
                species_max,
                particle_id_max,
            ),
        }
    }
}

/// Result of rewriting one store.
#[derive(Clone, Debug)]
pub struct AssignSummary {
    pub store: PathBuf,
    pub rows: usize,
    /// Sorted, distinct.
    pub unique_ids: Vec<i64>,
}

/// Rewrite a store's particle ids to global ids and sort it by (particle_id, time).
/// Single use per run: the local ids are gone afterwards.
pub fn assign_global_ids(store_path: &Path, scheme: &IdentityScheme) -> Result<AssignSummary> {
    debug!("Starting {}", store_path.display());
    let mut conn = store::open_store(store_path)?;
    let layout = store::load_layout(&conn)?;
    let mut rows = store::read_rows(&conn, &layout)?;

    for row in rows.iter_mut() {
        row.particle_id = scheme
            .global_id(row.particle_id, row.block_id, row.species)
            .ok_or_else(|| {
                CollateError::inconsistent(
                    store_path.display().to_string(),
                    format!(
                        "cannot derive a global id for particle {} block {} species {:?}",
                        row.particle_id, row.block_id, row.species
                    ),
                )
            })?;
    }
    sort_by_particle_time(&mut rows, layout.time_index());

    store::replace_rows(&mut conn, &layout, &rows)?;
    store::index_particle_ids(&conn)?;
    store::finish_store(conn)?;

    let mut unique_ids: Vec<i64> = rows.iter().map(|r| r.particle_id).collect();
    unique_ids.dedup();
    debug!("finished with {}", store_path.display());
    Ok(AssignSummary {
        store: store_path.to_path_buf(),
        rows: rows.len(),
        unique_ids,
    })
}
