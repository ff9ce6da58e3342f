use anyhow::{Context, Result};
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::context::{CollectInput, DecodeUnit, StageContext};
use super::discover::{discover_track_files, plan_ascii_groups};
use super::pool::run_stage;
use crate::collate::{collect_partition, common_layout, merge_unique_ids, plan_partitions};
use crate::decode::{decode_ascii_group, decode_binary_file};
use crate::engine::store;
use crate::engine::tools::{binary_store_stem, chunk_path, check_dir_and_canonicalize, run_prefix};
use crate::error::CollateError;
use crate::identity::{IdentityScheme, assign_global_ids};
use crate::utils::fd_limit::max_collect_workers;
use crate::utils::tempfiles::{remove_intermediate_stores, remove_store, temp_store_path};
use crate::verify::{chunk_files_on_disk, verify_collation};
use crate::{CollateOpts, CollationReport, TrackFormat};

/// Collate every `*.track.dat` file in `source` into particle-indexed chunks in `dest`.
pub fn collate_tracks_from_ascii(
    source: &Path,
    dest: &Path,
    opts: &CollateOpts,
) -> Result<CollationReport> {
    run_collation(TrackFormat::Ascii, source, dest, opts)
}

/// Collate every `*.track_mpiio_optimized` file in `source` into particle-indexed chunks in `dest`.
pub fn collate_tracks_from_binary(
    source: &Path,
    dest: &Path,
    opts: &CollateOpts,
) -> Result<CollationReport> {
    run_collation(TrackFormat::Binary, source, dest, opts)
}

fn elapsed(start: Instant) -> String {
    format!("{:.2}s", start.elapsed().as_secs_f64())
}

/// Decode units for the run: one per binary file, one per ascii group.
fn plan_decode_units(
    format: TrackFormat,
    files: &[PathBuf],
    dest: &Path,
    prefix: &str,
    ctx: &StageContext,
    opts: &CollateOpts,
) -> Result<Vec<DecodeUnit>> {
    Ok(match format {
        TrackFormat::Binary => files
            .iter()
            .map(|f| DecodeUnit {
                files: vec![f.clone()],
                store: temp_store_path(dest, &binary_store_stem(f)),
            })
            .collect(),
        TrackFormat::Ascii => plan_ascii_groups(files, ctx.num_workers, opts.max_store_size_mb)?
            .into_iter()
            .enumerate()
            .map(|(k, group)| DecodeUnit {
                files: group,
                store: temp_store_path(dest, &format!("{prefix}_group_{k}")),
            })
            .collect(),
    })
}

fn run_collation(
    format: TrackFormat,
    source: &Path,
    dest: &Path,
    opts: &CollateOpts,
) -> Result<CollationReport> {
    let run_start = Instant::now();
    let source = check_dir_and_canonicalize(source, "source directory")?;
    fs::create_dir_all(dest).with_context(|| format!("create {}", dest.display()))?;
    let dest = check_dir_and_canonicalize(dest, "destination directory")?;
    let ctx = StageContext::from_opts(opts);

    let files = discover_track_files(&source, format)?;
    let prefix = run_prefix(&files[0]);
    info!(
        "Found {} {} track files with prefix '{prefix}' ({} workers)",
        files.len(),
        format.name(),
        ctx.num_workers
    );

    let units = plan_decode_units(format, &files, &dest, &prefix, &ctx, opts)?;
    let stores: Vec<PathBuf> = units.iter().map(|u| u.store.clone()).collect();

    let stale = chunk_files_on_disk(&dest, &prefix);
    let input = if opts.restart_collect {
        if format == TrackFormat::Ascii {
            anyhow::bail!("--restart-collect is only supported for binary track files");
        }
        // Chunks from the interrupted attempt are rebuilt below.
        for chunk in &stale {
            remove_store(chunk)?;
        }
        scan_existing_stores(&ctx, &stores)?
    } else {
        if !stale.is_empty() {
            anyhow::bail!(
                "{} already holds {} output chunks for '{prefix}'; use an empty destination",
                dest.display(),
                stale.len()
            );
        }
        decode_and_assign(&ctx, format, units)?
    };

    let report = collect_and_verify(&ctx, &stores, &dest, &prefix, input)?;
    remove_intermediate_stores(&stores)?;
    info!(
        "Collation complete: {} chunks, {} rows, {} particles. Elapsed time: {}",
        report.chunks.len(),
        report.total_rows,
        report.unique_ids,
        elapsed(run_start)
    );
    Ok(report)
}

/// Decode every unit, reduce the identity extrema, then rewrite every store with global ids.
fn decode_and_assign(
    ctx: &StageContext,
    format: TrackFormat,
    units: Vec<DecodeUnit>,
) -> Result<CollectInput> {
    let start = Instant::now();
    let summaries = run_stage(ctx, "decode", units, ctx.num_workers, |unit| match format {
        TrackFormat::Ascii => decode_ascii_group(&unit.files, &unit.store),
        TrackFormat::Binary => decode_binary_file(&unit.files[0], &unit.store),
    })?;
    info!("Initial conversion complete. Elapsed time: {}", elapsed(start));

    let scheme = IdentityScheme::from_summaries(format, &summaries)?;
    let layout = common_layout(summaries.iter().map(|s| (s.store.as_path(), &s.layout)))?
        .ok_or_else(|| anyhow::anyhow!("decode produced no stores"))?;
    let expected_rows: usize = summaries.iter().map(|s| s.rows).sum();
    info!("Determined global id extrema: {scheme:?} ({expected_rows} rows)");

    let start = Instant::now();
    let stores: Vec<PathBuf> = summaries.into_iter().map(|s| s.store).collect();
    let assigned = run_stage(ctx, "assign", stores, ctx.num_workers, |path| {
        assign_global_ids(path, &scheme)
    })?;
    let assigned_rows: usize = assigned.iter().map(|a| a.rows).sum();
    if assigned_rows != expected_rows {
        return Err(CollateError::CollationIntegrity {
            what: "rows after identity assignment",
            expected: expected_rows,
            actual: assigned_rows,
        }
        .into());
    }
    let unique_ids = merge_unique_ids(assigned.into_iter().map(|a| a.unique_ids));
    info!(
        "Global ids assigned to {} particles. Elapsed time: {}",
        unique_ids.len(),
        elapsed(start)
    );
    Ok(CollectInput {
        expected_rows,
        unique_ids,
        layout,
    })
}

/// Per-store facts recovered when decode and assign already ran in an earlier attempt.
struct StoreScan {
    store: PathBuf,
    layout: crate::ColumnLayout,
    rows: usize,
    unique_ids: Vec<i64>,
}

fn scan_existing_stores(ctx: &StageContext, stores: &[PathBuf]) -> Result<CollectInput> {
    if let Some(missing) = stores.iter().find(|p| !p.is_file()) {
        return Err(CollateError::inconsistent(
            "restart-collect",
            format!("intermediate store {} is missing", missing.display()),
        )
        .into());
    }
    let start = Instant::now();
    let scans = run_stage(ctx, "scan", stores.to_vec(), ctx.num_workers, |path| {
        let conn = store::open_store_read_only(path)?;
        Ok(StoreScan {
            store: path.clone(),
            layout: store::load_layout(&conn)?,
            rows: store::row_count(&conn)?,
            unique_ids: store::unique_particle_ids(&conn)?,
        })
    })?;
    let layout = common_layout(scans.iter().map(|s| (s.store.as_path(), &s.layout)))?
        .ok_or_else(|| anyhow::anyhow!("no intermediate stores to collect from"))?;
    let expected_rows = scans.iter().map(|s| s.rows).sum();
    let unique_ids = merge_unique_ids(scans.into_iter().map(|s| s.unique_ids));
    info!(
        "Recovered {expected_rows} rows and {} particles from existing stores. Elapsed time: {}",
        unique_ids.len(),
        elapsed(start)
    );
    Ok(CollectInput {
        expected_rows,
        unique_ids,
        layout,
    })
}

fn collect_and_verify(
    ctx: &StageContext,
    stores: &[PathBuf],
    dest: &Path,
    prefix: &str,
    input: CollectInput,
) -> Result<CollationReport> {
    let partitions = plan_partitions(&input.unique_ids, stores.len());
    info!("Planned {} particle id ranges", partitions.len());

    let workers = match max_collect_workers(stores.len()) {
        Some(cap) if cap < ctx.num_workers => {
            debug!("Capping collect workers at {cap} (file descriptor limit)");
            cap
        }
        _ => ctx.num_workers,
    };
    let start = Instant::now();
    let layout = &input.layout;
    let chunks = run_stage(ctx, "collect", partitions.clone(), workers, |partition| {
        collect_partition(stores, layout, *partition, &chunk_path(dest, prefix, *partition))
    })?;
    info!("Collection complete. Elapsed time: {}", elapsed(start));

    let chunk_paths: Vec<PathBuf> = chunks.iter().map(|c| c.path.clone()).collect();
    verify_collation(
        &chunk_paths,
        dest,
        prefix,
        partitions.len(),
        input.expected_rows,
    )?;
    info!("Number of output files and rows verified");

    Ok(CollationReport {
        chunks,
        total_rows: input.expected_rows,
        unique_ids: input.unique_ids.len(),
    })
}
