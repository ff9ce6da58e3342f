//! Range-partitioned collation: split the global id space into contiguous ranges, gather each
//! range's rows from every intermediate store, sort by (particle, time), and compute Δ|μ|.

use anyhow::Result;
use log::debug;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::engine::store;
use crate::error::CollateError;
use crate::{ChunkSummary, ColumnLayout, Partition, TrackRow};

/// The layout every store shares, or None when there are no stores.
pub fn common_layout<'a>(
    layouts: impl IntoIterator<Item = (&'a Path, &'a ColumnLayout)>,
) -> Result<Option<ColumnLayout>, CollateError> {
    let mut first: Option<(&Path, &ColumnLayout)> = None;
    for (path, layout) in layouts {
        let Some((first_path, first_layout)) = first else {
            first = Some((path, layout));
            continue;
        };
        if first_layout != layout {
            return Err(CollateError::inconsistent(
                path.display().to_string(),
                format!(
                    "columns {:?} (species: {}) differ from {:?} (species: {}) in {}",
                    layout.columns,
                    layout.has_species,
                    first_layout.columns,
                    first_layout.has_species,
                    first_path.display()
                ),
            ));
        }
    }
    Ok(first.map(|(_, l)| l.clone()))
}

/// Stable sort by (particle_id, time).
pub fn sort_by_particle_time(rows: &mut [TrackRow], time_idx: usize) {
    rows.par_sort_by(|a, b| {
        a.particle_id
            .cmp(&b.particle_id)
            .then(a.values[time_idx].total_cmp(&b.values[time_idx]))
    });
}

/// Δ|μ| against the previous row of the same particle; None at each particle's first row.
/// Rows must already be sorted by (particle_id, time).
pub fn fill_delta_mu(rows: &mut [TrackRow]) {
    let mut prev: Option<(i64, f64)> = None;
    for row in rows.iter_mut() {
        row.delta_mu_abs = match prev {
            Some((id, mu)) if id == row.particle_id => Some((row.mu - mu).abs()),
            _ => None,
        };
        prev = Some((row.particle_id, row.mu));
    }
}

/// Merge per-store sorted id lists into one sorted, distinct list.
pub fn merge_unique_ids(sets: impl IntoIterator<Item = Vec<i64>>) -> Vec<i64> {
    let mut all: Vec<i64> = sets.into_iter().flatten().collect();
    all.par_sort_unstable();
    all.dedup();
    all
}

/// Split `[0, max_id]` into at most `n` contiguous ranges, each claiming ceil(len / n) of the
/// sorted distinct ids. The first range starts at 0, each later one right after its
/// predecessor, and the last ends at the largest id, so ranges never gap or overlap.
pub fn plan_partitions(unique_ids: &[i64], n: usize) -> Vec<Partition> {
    if unique_ids.is_empty() {
        return Vec::new();
    }
    let step = unique_ids.len().div_ceil(n.max(1));
    let mut next_lo = 0_i64.min(unique_ids[0]);
    unique_ids
        .chunks(step)
        .map(|chunk| {
            let partition = Partition {
                lo: next_lo,
                hi: chunk[chunk.len() - 1],
            };
            next_lo = partition.hi.saturating_add(1);
            partition
        })
        .collect()
}

/// Gather one partition from every store and write it as one output chunk.
pub fn collect_partition(
    stores: &[PathBuf],
    layout: &ColumnLayout,
    partition: Partition,
    out_path: &Path,
) -> Result<ChunkSummary> {
    debug!(
        "Starting with particle range {}-{}",
        partition.lo, partition.hi
    );
    let mut rows = Vec::new();
    for store_path in stores {
        let conn = store::open_store_read_only(store_path)?;
        rows.extend(store::read_rows_in(&conn, layout, partition)?);
    }
    sort_by_particle_time(&mut rows, layout.time_index());
    fill_delta_mu(&mut rows);

    let mut conn = store::create_store(out_path, layout)?;
    let written = store::write_rows(&mut conn, layout, &rows)?;
    store::index_particle_ids(&conn)?;
    store::finish_store(conn)?;
    debug!(
        "Finished with particle range {}-{}",
        partition.lo, partition.hi
    );
    Ok(ChunkSummary {
        path: out_path.to_path_buf(),
        partition,
        rows: written,
    })
}
