//! Create, open, and read track stores.

use anyhow::{Context, Result};
use rusqlite::{Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;

use crate::utils::remove_store;
use crate::{ColumnLayout, Partition, TrackRow};

use super::{LAYOUT_KEY, META_SCHEMA, WAL_PRAGMAS, select_sql, tracks_schema};

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

/// Enable WAL on an open connection (idempotent).
fn apply_wal(conn: &Connection) -> Result<()> {
    conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))
        .context("enable WAL")?;
    conn.execute_batch(WAL_PRAGMAS).context("set WAL pragmas")?;
    Ok(())
}

/// Create a fresh store at `path` for `layout`, replacing any previous file.
pub fn create_store(path: &Path, layout: &ColumnLayout) -> Result<Connection> {
    remove_store(path)?;
    let conn = Connection::open(path)
        .with_context(|| format!("create store {}", path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_wal(&conn)?;
    conn.execute_batch(META_SCHEMA).context("create meta schema")?;
    conn.execute_batch(&tracks_schema(layout))
        .context("create tracks schema")?;
    let json = serde_json::to_string(layout).context("serialize layout")?;
    conn.execute(
        "INSERT OR REPLACE INTO store_meta (key, data) VALUES (?1, ?2)",
        (LAYOUT_KEY, json.as_str()),
    )
    .context("write layout")?;
    Ok(conn)
}

/// Open an existing store for rewriting. Fails if the file does not exist.
pub fn open_store(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("open store {}", path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    apply_wal(&conn)?;
    Ok(conn)
}

/// Open a finished store for reading; many readers may share one file.
pub fn open_store_read_only(path: &Path) -> Result<Connection> {
    let conn = Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .with_context(|| format!("open store {} read-only", path.display()))?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

/// Column layout recorded when the store was created.
pub fn load_layout(conn: &Connection) -> Result<ColumnLayout> {
    let json: Option<String> = conn
        .query_row(
            "SELECT data FROM store_meta WHERE key = ?1",
            [LAYOUT_KEY],
            |row| row.get(0),
        )
        .optional()
        .context("read layout")?;
    let json = json.context("store has no layout metadata")?;
    serde_json::from_str(&json).context("parse layout")
}

pub fn row_count(conn: &Connection) -> Result<usize> {
    let n: i64 = conn
        .query_row("SELECT COUNT(*) FROM tracks", [], |row| row.get(0))
        .context("count rows")?;
    Ok(n.max(0) as usize)
}

/// Sorted distinct particle ids.
pub fn unique_particle_ids(conn: &Connection) -> Result<Vec<i64>> {
    let mut stmt = conn
        .prepare("SELECT DISTINCT particle_id FROM tracks ORDER BY particle_id")
        .context("prepare distinct ids")?;
    let ids = stmt
        .query_map([], |row| row.get::<_, i64>(0))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("read distinct ids")?;
    Ok(ids)
}

/// SQLite stores NaN as NULL; read it back as NaN.
fn row_to_track(row: &Row<'_>, layout: &ColumnLayout) -> rusqlite::Result<TrackRow> {
    let (species, first) = if layout.has_species {
        (row.get(2)?, 3)
    } else {
        (None, 2)
    };
    let width = layout.width();
    let mut values = Vec::with_capacity(width);
    for i in 0..width {
        values.push(row.get::<_, Option<f64>>(first + i)?.unwrap_or(f64::NAN));
    }
    Ok(TrackRow {
        particle_id: row.get(0)?,
        block_id: row.get(1)?,
        species,
        values,
        mu: row.get::<_, Option<f64>>(first + width)?.unwrap_or(f64::NAN),
        delta_mu_abs: row.get(first + width + 1)?,
    })
}

/// Every row in insertion order.
pub fn read_rows(conn: &Connection, layout: &ColumnLayout) -> Result<Vec<TrackRow>> {
    let sql = format!("{} ORDER BY rowid", select_sql(layout));
    let mut stmt = conn.prepare(&sql).context("prepare read rows")?;
    let rows = stmt
        .query_map([], |row| row_to_track(row, layout))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("read rows")?;
    Ok(rows)
}

/// Rows whose particle id falls inside `partition` (inclusive bounds).
pub fn read_rows_in(
    conn: &Connection,
    layout: &ColumnLayout,
    partition: Partition,
) -> Result<Vec<TrackRow>> {
    let sql = format!(
        "{} WHERE particle_id BETWEEN ?1 AND ?2 ORDER BY rowid",
        select_sql(layout)
    );
    let mut stmt = conn.prepare(&sql).context("prepare range scan")?;
    let rows = stmt
        .query_map((partition.lo, partition.hi), |row| row_to_track(row, layout))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .context("range scan")?;
    Ok(rows)
}
