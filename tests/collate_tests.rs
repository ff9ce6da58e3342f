mod common;

use common::*;
use std::path::{Path, PathBuf};
use trackcollate::collate::{
    collect_partition, common_layout, fill_delta_mu, merge_unique_ids, plan_partitions,
    sort_by_particle_time,
};
use trackcollate::engine::tools::{
    TrackName, binary_store_stem, chunk_path, glob_match, parse_track_name, run_prefix,
};
use trackcollate::pipeline::{ascii_group_count, split_even};
use trackcollate::{CollateError, ColumnLayout, Partition, TrackFormat};

// --- partition planning ---

fn assert_covers_id_space(parts: &[Partition], max_id: i64) {
    for id in 0..=max_id {
        assert_eq!(
            parts.iter().filter(|p| p.contains(id)).count(),
            1,
            "id {id} in {parts:?}"
        );
    }
    assert_eq!(parts.first().map(|p| p.lo), Some(0));
    assert_eq!(parts.last().map(|p| p.hi), Some(max_id));
    assert!(parts.windows(2).all(|w| w[0].hi + 1 == w[1].lo));
}

#[test]
fn test_plan_partitions_cover_id_space() {
    let ids: Vec<i64> = vec![0, 2, 3, 5, 8, 9, 10, 11, 15, 20];
    let parts = plan_partitions(&ids, 3);
    assert_eq!(
        parts,
        vec![
            Partition { lo: 0, hi: 5 },
            Partition { lo: 6, hi: 11 },
            Partition { lo: 12, hi: 20 },
        ]
    );
    assert_covers_id_space(&parts, 20);
}

#[test]
fn test_plan_partitions_sparse_ids_leave_no_gaps() {
    let parts = plan_partitions(&[3, 5, 10], 2);
    assert_eq!(
        parts,
        vec![Partition { lo: 0, hi: 5 }, Partition { lo: 6, hi: 10 }]
    );
    assert_covers_id_space(&parts, 10);
}

#[test]
fn test_plan_partitions_fewer_ids_than_workers() {
    let parts = plan_partitions(&[4, 9], 4);
    assert_eq!(parts.len(), 2);
    assert_covers_id_space(&parts, 9);
    assert!(plan_partitions(&[], 4).is_empty());
    assert_eq!(plan_partitions(&[1, 2, 3], 1), vec![Partition { lo: 0, hi: 3 }]);
}

#[test]
fn test_merge_unique_ids_sorted_distinct() {
    let merged = merge_unique_ids(vec![vec![1, 4, 9], vec![0, 4, 7], vec![]]);
    assert_eq!(merged, vec![0, 1, 4, 7, 9]);
}

// --- ordering and delta mu ---

#[test]
fn test_sort_and_delta_mu_reset_per_particle() {
    let mut rows = vec![
        row(2, 1.0, 5.0),
        row(1, 1.0, 3.0),
        row(2, 0.0, 4.0),
        row(1, 0.0, 1.0),
        row(1, 2.0, 2.0),
    ];
    sort_by_particle_time(&mut rows, 0);
    fill_delta_mu(&mut rows);

    let keys: Vec<(i64, f64)> = rows.iter().map(|r| (r.particle_id, r.values[0])).collect();
    assert_eq!(keys, vec![(1, 0.0), (1, 1.0), (1, 2.0), (2, 0.0), (2, 1.0)]);
    let deltas: Vec<Option<f64>> = rows.iter().map(|r| r.delta_mu_abs).collect();
    assert_eq!(deltas, vec![None, Some(2.0), Some(1.0), None, Some(1.0)]);
}

#[test]
fn test_common_layout_rejects_mismatch() {
    let a = small_layout(false);
    let b = ColumnLayout::new(vec!["time".to_string(), "v1".to_string()], false).unwrap();
    let pa = PathBuf::from("a.sqlite");
    let pb = PathBuf::from("b.sqlite");
    let err = common_layout([(pa.as_path(), &a), (pb.as_path(), &b)]).unwrap_err();
    assert!(matches!(err, CollateError::InconsistentLayout { .. }));

    assert_eq!(common_layout([(pa.as_path(), &a), (pb.as_path(), &a)]).unwrap(), Some(a));
    assert_eq!(common_layout(std::iter::empty::<(&Path, &ColumnLayout)>()).unwrap(), None);
}

// --- collect ---

#[test]
fn test_collect_partition_merges_stores() {
    let dir = tempfile::tempdir().unwrap();
    let layout = small_layout(false);
    let s0 = dir.path().join("s0_temp.sqlite");
    let s1 = dir.path().join("s1_temp.sqlite");
    write_store(&s0, &layout, &[row(1, 0.0, 1.0), row(1, 1.0, 4.0), row(5, 0.0, 9.0)]);
    write_store(&s1, &layout, &[row(1, 2.0, 2.0), row(2, 0.0, 7.0), row(3, 0.0, 8.0)]);

    let partition = Partition { lo: 1, hi: 2 };
    let out = chunk_path(dir.path(), "run", partition);
    let chunk = collect_partition(&[s0, s1], &layout, partition, &out).unwrap();
    assert_eq!(chunk.rows, 4);
    assert_eq!(out.file_name().unwrap(), "run_particles_1_2.sqlite");

    let (stored_layout, rows) = read_store(&out);
    assert_eq!(stored_layout, layout);
    let keys: Vec<(i64, f64, Option<f64>)> = rows
        .iter()
        .map(|r| (r.particle_id, r.values[0], r.delta_mu_abs))
        .collect();
    assert_eq!(
        keys,
        vec![
            (1, 0.0, None),
            (1, 1.0, Some(3.0)),
            (1, 2.0, Some(2.0)),
            (2, 0.0, None),
        ]
    );
}

// --- naming and grouping ---

#[test]
fn test_parse_track_name_both_formats() {
    assert_eq!(
        parse_track_name(Path::new("/d/run.12.3.track.dat"), TrackFormat::Ascii),
        Some(TrackName {
            prefix: "run".to_string(),
            particle_id: Some(12),
            block_id: 3
        })
    );
    assert_eq!(
        parse_track_name(Path::new("run.7.track_mpiio_optimized"), TrackFormat::Binary),
        Some(TrackName {
            prefix: "run".to_string(),
            particle_id: None,
            block_id: 7
        })
    );
    assert_eq!(parse_track_name(Path::new("run.x.track.dat"), TrackFormat::Ascii), None);
    assert_eq!(run_prefix(Path::new("/d/run.7.track_mpiio_optimized")), "run");
    assert_eq!(binary_store_stem(Path::new("run.7.track_mpiio_optimized")), "run_7");
}

#[test]
fn test_glob_match() {
    assert!(glob_match("*.track.dat", "run.0.1.track.dat"));
    assert!(!glob_match("*.track.dat", "run.0.1.track.dat.bak"));
    assert!(glob_match("run_particles_*_*.sqlite", "run_particles_0_41.sqlite"));
    assert!(!glob_match("run_particles_*_*.sqlite", "run_group_0_temp.sqlite"));
    assert!(glob_match("a?c", "abc"));
}

#[test]
fn test_split_even_front_loads_remainder() {
    let groups = split_even(&[1, 2, 3, 4, 5, 6, 7], 3);
    assert_eq!(groups, vec![vec![1, 2, 3], vec![4, 5], vec![6, 7]]);
    assert_eq!(split_even(&[1, 2], 2), vec![vec![1], vec![2]]);
}

#[test]
fn test_ascii_group_count() {
    // Small files: one group, rounded up to the worker count.
    assert_eq!(ascii_group_count(10, 3_000, 4, 2000), 4);
    // Capped at the file count.
    assert_eq!(ascii_group_count(3, 3_000, 8, 2000), 3);
    // 3 MB files decode to ~1 MB, so 2 per 2 MB store: 5 groups, rounded to 6.
    assert_eq!(ascii_group_count(10, 3 * 1024 * 1024, 2, 2), 6);
    assert_eq!(ascii_group_count(0, 0, 2, 2000), 0);
}
