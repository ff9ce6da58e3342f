#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use trackcollate::{ColumnLayout, TrackRow};

pub const ASCII_COLUMNS: [&str; 11] = [
    "time", "x1", "v1", "v2", "v3", "B1", "B2", "B3", "U1", "U2", "U3",
];

/// mu for the fixture rows: v = (1 + t, 2, 0), U = 0, B = (0, 0, 2).
pub fn fixture_mu(time: f64) -> f64 {
    0.5 * ((1.0 + time).powi(2) + 4.0) / 2.0
}

pub fn ascii_track_text(local: i64, block: i64, times: &[f64]) -> String {
    let mut text = format!(
        "# Pegasus++ track data for particle with id={local} block={block}\n#"
    );
    for (i, name) in ASCII_COLUMNS.iter().enumerate() {
        text.push_str(&format!(" [{}]={name}", i + 1));
    }
    text.push('\n');
    for t in times {
        text.push_str(&format!(
            "{t:.6e} 5.0e-01 {:.6e} 2.0 0.0 0.0 0.0 2.0 0.0 0.0 0.0\n",
            1.0 + t
        ));
    }
    text
}

pub fn write_ascii_track(dir: &Path, prefix: &str, local: i64, block: i64, times: &[f64]) -> PathBuf {
    let path = dir.join(format!("{prefix}.{local}.{block}.track.dat"));
    fs::write(&path, ascii_track_text(local, block, times)).unwrap();
    path
}

/// One 3D record without forcing (width 20), ids written as `id + 0.001`.
pub fn binary_record(local: i64, block: i64, species: i64, time: f64) -> Vec<f64> {
    let id = |v: i64| v as f64 + 0.001;
    vec![
        id(local),
        id(block),
        id(species),
        time,
        0.25,
        0.25,
        0.25,
        1.0 + time,
        2.0,
        0.0,
        0.0,
        0.0,
        2.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        0.0,
        1.0,
    ]
}

pub fn binary_bytes(records: &[Vec<f64>], swap: bool) -> Vec<u8> {
    let mut bytes = b"12.5\n".to_vec();
    for v in records.iter().flatten() {
        let mut raw = v.to_ne_bytes();
        if swap {
            raw.reverse();
        }
        bytes.extend_from_slice(&raw);
    }
    bytes
}

pub fn write_binary_track(dir: &Path, prefix: &str, block: i64, records: &[Vec<f64>]) -> PathBuf {
    let path = dir.join(format!("{prefix}.{block}.track_mpiio_optimized"));
    fs::write(&path, binary_bytes(records, false)).unwrap();
    path
}

pub fn small_layout(has_species: bool) -> ColumnLayout {
    ColumnLayout::new(vec!["time".to_string(), "x1".to_string()], has_species).unwrap()
}

pub fn row(particle_id: i64, time: f64, mu: f64) -> TrackRow {
    TrackRow {
        particle_id,
        block_id: 0,
        species: None,
        values: vec![time, 0.5],
        mu,
        delta_mu_abs: None,
    }
}

pub fn write_store(path: &Path, layout: &ColumnLayout, rows: &[TrackRow]) {
    let mut conn = trackcollate::engine::store::create_store(path, layout).unwrap();
    trackcollate::engine::store::write_rows(&mut conn, layout, rows).unwrap();
    trackcollate::engine::store::finish_store(conn).unwrap();
}

pub fn read_store(path: &Path) -> (ColumnLayout, Vec<TrackRow>) {
    let conn = trackcollate::engine::store::open_store_read_only(path).unwrap();
    let layout = trackcollate::engine::store::load_layout(&conn).unwrap();
    let rows = trackcollate::engine::store::read_rows(&conn, &layout).unwrap();
    (layout, rows)
}
