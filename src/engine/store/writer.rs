//! Batched writes into track stores.

use anyhow::{Context, Result};
use rusqlite::Connection;
use rusqlite::types::Value;

use crate::utils::config::STORE_INSERT_BATCH_SIZE;
use crate::{ColumnLayout, TrackRow};

use super::insert_sql;

/// Bind values for one row, in storage order.
fn row_params(row: &TrackRow, has_species: bool, out: &mut Vec<Value>) {
    out.clear();
    out.push(Value::Integer(row.particle_id));
    out.push(Value::Integer(row.block_id));
    if has_species {
        out.push(row.species.map_or(Value::Null, Value::Integer));
    }
    out.extend(row.values.iter().map(|v| Value::Real(*v)));
    out.push(Value::Real(row.mu));
    out.push(row.delta_mu_abs.map_or(Value::Null, Value::Real));
}

fn insert_batch(
    tx: &rusqlite::Transaction<'_>,
    sql: &str,
    layout: &ColumnLayout,
    rows: &[TrackRow],
) -> Result<()> {
    let width = layout.width();
    let mut stmt = tx.prepare_cached(sql).context("prepare insert")?;
    let mut params = Vec::with_capacity(width + 5);
    for row in rows {
        if row.values.len() != width {
            anyhow::bail!(
                "row has {} values but the store layout has {} columns",
                row.values.len(),
                width
            );
        }
        row_params(row, layout.has_species, &mut params);
        stmt.execute(rusqlite::params_from_iter(params.iter()))
            .context("insert row")?;
    }
    Ok(())
}

/// Append rows in transactions of [`STORE_INSERT_BATCH_SIZE`]. Returns rows written.
pub fn write_rows(conn: &mut Connection, layout: &ColumnLayout, rows: &[TrackRow]) -> Result<usize> {
    let sql = insert_sql(layout);
    let mut written = 0_usize;
    for chunk in rows.chunks(STORE_INSERT_BATCH_SIZE) {
        let tx = conn.transaction().context("begin transaction")?;
        insert_batch(&tx, &sql, layout, chunk)?;
        tx.commit().context("commit transaction")?;
        written += chunk.len();
    }
    Ok(written)
}

/// Replace the whole table in one transaction (identity rewrite).
pub fn replace_rows(conn: &mut Connection, layout: &ColumnLayout, rows: &[TrackRow]) -> Result<()> {
    let sql = insert_sql(layout);
    let tx = conn.transaction().context("begin transaction")?;
    tx.execute("DELETE FROM tracks", [])
        .context("clear tracks")?;
    for chunk in rows.chunks(STORE_INSERT_BATCH_SIZE) {
        insert_batch(&tx, &sql, layout, chunk)?;
    }
    tx.commit().context("commit rewrite")?;
    Ok(())
}

/// Index the id column so partition range scans do not read the whole table.
pub fn index_particle_ids(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE INDEX IF NOT EXISTS idx_tracks_particle ON tracks(particle_id);")
        .context("index particle ids")
}

/// Checkpoint and leave WAL mode so the store is one self-contained file that read-only
/// connections can share.
pub fn finish_store(conn: Connection) -> Result<()> {
    conn.query_row("PRAGMA wal_checkpoint(TRUNCATE)", [], |_| Ok(()))
        .context("WAL checkpoint")?;
    conn.query_row("PRAGMA journal_mode = DELETE", [], |_| Ok(()))
        .context("leave WAL")?;
    conn.close()
        .map_err(|(_, e)| e)
        .context("close store")?;
    Ok(())
}
