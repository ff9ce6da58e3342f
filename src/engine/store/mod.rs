//! Track stores: one SQLite file per intermediate store or output chunk.
//!
//! Table `tracks` holds `particle_id, block_id, [species,] <layout columns>, mu, delta_mu_abs`
//! (`species` only when the layout carries it);
//! table `store_meta` holds the [`ColumnLayout`](crate::ColumnLayout) as JSON.

mod connection;
mod writer;

pub use connection::{
    create_store, load_layout, open_store, open_store_read_only, read_rows, read_rows_in,
    row_count, unique_particle_ids,
};
pub use writer::{finish_store, index_particle_ids, replace_rows, write_rows};

use crate::ColumnLayout;

/// WAL tuning pragmas (synchronous, autocheckpoint, size limit). Use after PRAGMA journal_mode = WAL.
pub(crate) const WAL_PRAGMAS: &str = r#"
        PRAGMA synchronous = NORMAL;
        PRAGMA wal_autocheckpoint = 10000;
        PRAGMA journal_size_limit = 67108864;
        "#;

/// Key/JSON table, one row per metadata blob.
pub(crate) const META_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS store_meta (
    key TEXT PRIMARY KEY,
    data TEXT NOT NULL
);
"#;

pub(crate) const LAYOUT_KEY: &str = "layout";

/// Double-quote an identifier for SQLite.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Column list in storage order.
fn column_list(layout: &ColumnLayout) -> Vec<String> {
    let mut cols = vec![quote_ident("particle_id"), quote_ident("block_id")];
    if layout.has_species {
        cols.push(quote_ident("species"));
    }
    cols.extend(layout.columns.iter().map(|c| quote_ident(c)));
    cols.push(quote_ident("mu"));
    cols.push(quote_ident("delta_mu_abs"));
    cols
}

pub(crate) fn tracks_schema(layout: &ColumnLayout) -> String {
    let value_cols: Vec<String> = layout
        .columns
        .iter()
        .map(|c| format!("    {} REAL", quote_ident(c)))
        .collect();
    let species_col = if layout.has_species {
        "    species INTEGER,\n"
    } else {
        ""
    };
    format!(
        "CREATE TABLE IF NOT EXISTS tracks (\n    particle_id INTEGER NOT NULL,\n    block_id INTEGER NOT NULL,\n{species_col}{},\n    mu REAL,\n    delta_mu_abs REAL\n);",
        value_cols.join(",\n")
    )
}

pub(crate) fn insert_sql(layout: &ColumnLayout) -> String {
    let cols = column_list(layout);
    let placeholders: Vec<String> = (1..=cols.len()).map(|i| format!("?{i}")).collect();
    format!(
        "INSERT INTO tracks ({}) VALUES ({})",
        cols.join(", "),
        placeholders.join(", ")
    )
}

pub(crate) fn select_sql(layout: &ColumnLayout) -> String {
    format!("SELECT {} FROM tracks", column_list(layout).join(", "))
}
