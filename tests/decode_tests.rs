mod common;

use common::*;
use std::fs;
use trackcollate::CollateError;
use trackcollate::decode::{
    apply_mask, binary_column_names, count_restarts, decode_ascii_group, infer_row_width,
    magnetic_moment, parse_header, read_ascii_track, read_binary_track, restart_mask,
};

fn kept_times(times: &[f64]) -> Vec<f64> {
    apply_mask(times.to_vec(), &restart_mask(times))
}

fn assert_strictly_increasing(times: &[f64]) {
    assert!(times.windows(2).all(|w| w[0] < w[1]), "{times:?}");
}

// --- layout inference ---

#[test]
fn test_infer_row_width_every_valid_width() {
    for width in 18..=23 {
        let mut data = vec![0.5; width * 3];
        for rec in 0..3 {
            data[rec * width] = rec as f64 + 0.001;
            data[rec * width + 1] = 4.001;
        }
        assert_eq!(infer_row_width(&data), Some(width), "width {width}");
    }
}

#[test]
fn test_infer_row_width_rejects_plain_floats() {
    let data: Vec<f64> = (0..60).map(|i| i as f64 * 0.37).collect();
    assert_eq!(infer_row_width(&data), None);
}

#[test]
fn test_infer_row_width_single_record() {
    let record = binary_record(3, 1, 0, 0.0);
    assert_eq!(infer_row_width(&record), Some(20));
}

#[test]
fn test_binary_column_names_drop_axes_and_forcing() {
    let one_d = binary_column_names(18).unwrap();
    assert!(!one_d.contains(&"x2") && !one_d.contains(&"x3"));
    assert!(!one_d.iter().any(|c| c.starts_with("forcing")));
    let full = binary_column_names(23).unwrap();
    assert_eq!(full.len(), 23);
    assert_eq!(full.last(), Some(&"forcing3"));
    assert_eq!(binary_column_names(22).unwrap().len(), 22);
    assert!(binary_column_names(17).is_none());
}

// --- binary decoding ---

#[test]
fn test_read_binary_track_decodes_ids_and_mu() {
    let dir = tempfile::tempdir().unwrap();
    let records = vec![
        binary_record(0, 2, 1, 0.0),
        binary_record(5, 2, 3, 1.0),
        binary_record(0, 2, 1, 2.0),
    ];
    let path = write_binary_track(dir.path(), "run", 2, &records);

    let table = read_binary_track(&path).unwrap();
    assert_eq!(table.layout.width(), 17);
    assert!(table.layout.has_species);
    assert_eq!(table.layout.columns[0], "time");
    assert_eq!(table.rows.len(), 3);
    assert_eq!(table.rows[1].particle_id, 5);
    assert_eq!(table.rows[1].block_id, 2);
    assert_eq!(table.rows[1].species, Some(3));
    assert!((table.rows[2].mu - fixture_mu(2.0)).abs() < 1e-12);
    assert!(table.rows.iter().all(|r| r.delta_mu_abs.is_none()));
}

#[test]
fn test_read_binary_track_byte_swapped() {
    let dir = tempfile::tempdir().unwrap();
    let records = vec![binary_record(1, 0, 0, 0.0), binary_record(2, 0, 0, 1.0)];
    let path = dir.path().join("run.0.track_mpiio_optimized");
    fs::write(&path, binary_bytes(&records, true)).unwrap();

    let table = read_binary_track(&path).unwrap();
    assert_eq!(table.rows.len(), 2);
    assert_eq!(table.rows[1].particle_id, 2);
    assert_eq!(table.rows[1].values[0], 1.0);
}

#[test]
fn test_read_binary_track_partial_f64_is_inconsistent() {
    let dir = tempfile::tempdir().unwrap();
    let mut bytes = binary_bytes(&[binary_record(1, 0, 0, 0.0)], false);
    bytes.extend_from_slice(&[0, 1, 2]);
    let path = dir.path().join("run.0.track_mpiio_optimized");
    fs::write(&path, bytes).unwrap();

    let err = read_binary_track(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CollateError>(),
        Some(CollateError::InconsistentLayout { .. })
    ));
}

#[test]
fn test_read_binary_track_trailing_values_are_inconsistent() {
    let dir = tempfile::tempdir().unwrap();
    let mut records = vec![binary_record(1, 0, 0, 0.0), binary_record(2, 0, 0, 1.0)];
    records.push(vec![0.5; 5]);
    let path = write_binary_track(dir.path(), "run", 0, &records);

    let err = read_binary_track(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CollateError>(),
        Some(CollateError::InconsistentLayout { .. })
    ));
}

#[test]
fn test_read_binary_track_without_id_convention_fails() {
    let dir = tempfile::tempdir().unwrap();
    let records = vec![vec![0.5; 40]];
    let path = write_binary_track(dir.path(), "run", 0, &records);

    let err = read_binary_track(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CollateError>(),
        Some(CollateError::LayoutInference { values: 40, .. })
    ));
}

// --- restart filter ---

#[test]
fn test_restart_mask_drops_repeated_sample() {
    let times = [0.0, 1.0, 2.0, 3.0, 4.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    let mask = restart_mask(&times);
    assert_eq!(mask.iter().filter(|k| !**k).count(), 1);
    assert!(!mask[4]);
    assert_eq!(count_restarts(&times), 1);
}

#[test]
fn test_restart_mask_keeps_post_restart_continuation() {
    let times = [0.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 4.0];
    let mask = restart_mask(&times);
    assert_eq!(kept_times(&times), vec![0.0, 1.0, 2.0, 3.0, 4.0]);
    // The stale tail (indices 1..=3) goes, the rewritten samples stay.
    assert_eq!(mask, vec![true, false, false, false, true, true, true, true]);
}

#[test]
fn test_restart_mask_overlapping_restarts_resolve_independently() {
    // Second restart (time 2 at index 8) reaches back past rows the first one kept.
    let times = [0.0, 1.0, 2.0, 3.0, 1.0, 2.0, 3.0, 4.0, 2.0, 3.0, 5.0];
    assert_eq!(kept_times(&times), vec![0.0, 2.0, 3.0, 5.0]);
    assert_eq!(count_restarts(&times), 2);
}

#[test]
fn test_restart_mask_without_exact_match_uses_first_later_time() {
    let times = [0.0, 1.0, 2.0, 3.0, 1.5, 2.5, 3.5];
    assert_eq!(kept_times(&times), vec![0.0, 1.0, 1.5, 2.5, 3.5]);
}

#[test]
fn test_restart_mask_nested_restarts_strictly_increasing() {
    let times = [0.0, 1.0, 2.0, 3.0, 2.0, 3.0, 1.0, 2.0, 2.5];
    let kept = kept_times(&times);
    assert_strictly_increasing(&kept);
    assert_eq!(kept, vec![0.0, 1.0, 2.0, 2.5]);
    assert_eq!(count_restarts(&times), 2);
}

#[test]
fn test_restart_mask_monotonic_keeps_all() {
    let times = [0.0, 0.5, 1.0];
    assert!(restart_mask(&times).iter().all(|k| *k));
    assert_eq!(count_restarts(&times), 0);
    assert!(restart_mask(&[]).is_empty());
}

// --- ascii decoding ---

#[test]
fn test_parse_header_reads_tagged_ids() {
    let path = std::path::Path::new("run.3.1.track.dat");
    let header = parse_header(
        path,
        "# Pegasus++ track data for particle with id=3 block=1",
        "# [1]=time [2]=v1",
    )
    .unwrap();
    assert_eq!(header.particle_id, 3);
    assert_eq!(header.block_id, 1);
    assert_eq!(header.columns, vec!["time", "v1"]);
}

#[test]
fn test_parse_header_rejects_foreign_prefix() {
    let path = std::path::Path::new("run.3.1.track.dat");
    let err = parse_header(path, "# some other tool output id=3 block=1", "# [1]=time").unwrap_err();
    assert!(matches!(err, CollateError::Format { .. }));
}

#[test]
fn test_read_ascii_track_filters_restarts_and_computes_mu() {
    let dir = tempfile::tempdir().unwrap();
    let times = [0.0, 1.0, 2.0, 3.0, 4.0, 4.0, 5.0, 6.0, 7.0, 8.0];
    let path = write_ascii_track(dir.path(), "run", 7, 2, &times);

    let (header, table) = read_ascii_track(&path).unwrap();
    assert_eq!((header.particle_id, header.block_id), (7, 2));
    assert_eq!(table.rows.len(), 9);
    assert!(!table.layout.has_species);
    let time_idx = table.layout.time_index();
    let kept: Vec<f64> = table.rows.iter().map(|r| r.values[time_idx]).collect();
    assert_strictly_increasing(&kept);
    for r in &table.rows {
        assert_eq!(r.particle_id, 7);
        assert_eq!(r.species, None);
        assert!((r.mu - fixture_mu(r.values[time_idx])).abs() < 1e-9);
    }
}

#[test]
fn test_read_ascii_track_short_row_is_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut text = ascii_track_text(0, 0, &[0.0]);
    text.push_str("1.0 2.0\n");
    let path = dir.path().join("run.0.0.track.dat");
    fs::write(&path, text).unwrap();

    let err = read_ascii_track(&path).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<CollateError>(),
        Some(CollateError::Format { .. })
    ));
}

#[test]
fn test_decode_ascii_group_reports_extent() {
    let dir = tempfile::tempdir().unwrap();
    let files = vec![
        write_ascii_track(dir.path(), "run", 0, 0, &[0.0, 1.0]),
        write_ascii_track(dir.path(), "run", 4, 1, &[0.0, 1.0, 2.0]),
    ];
    let store = dir.path().join("run_group_0_temp.sqlite");

    let summary = decode_ascii_group(&files, &store).unwrap();
    assert_eq!(summary.rows, 5);
    assert_eq!(summary.particle_id_max, Some(4));
    assert_eq!(summary.species_min, None);
    let (_, rows) = read_store(&store);
    assert_eq!(rows.len(), 5);
}

// --- magnetic moment ---

#[test]
fn test_magnetic_moment_perpendicular_and_parallel() {
    assert_eq!(magnetic_moment([1.0, 2.0, 0.0], [0.0; 3], [0.0, 0.0, 2.0]), 1.25);
    // v' = (1, 2, 0), |B| = 2, v_para = 1
    assert_eq!(magnetic_moment([2.0, 2.0, 1.0], [1.0, 0.0, 1.0], [2.0, 0.0, 0.0]), 1.0);
    assert!(magnetic_moment([1.0, 0.0, 0.0], [0.0; 3], [0.0; 3]).is_nan());
}
