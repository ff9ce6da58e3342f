//! CLI command handler: settings file, flags, Ctrl+C, then one collation run.

use anyhow::{Context, Result};
use log::{debug, info};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::engine::arg_parser::Cli;
use crate::pipeline::detect_format;
use crate::utils::setup_logging;
use crate::utils::trackcollate_toml::{apply_file_to_opts, load_trackcollate_toml};
use crate::{CollateOpts, collate_tracks};

/// Settings file from SOURCE first, then CLI flags on top.
fn setup_opts(cli: &Cli) -> CollateOpts {
    let mut opts = CollateOpts::default();
    if let Some(file) = load_trackcollate_toml(&cli.source) {
        apply_file_to_opts(&file, &mut opts);
    }
    if cli.workers.is_some() {
        opts.num_workers = cli.workers;
    }
    if let Some(mb) = cli.max_store_size {
        opts.max_store_size_mb = mb;
    }
    if let Some(v) = cli.restart_collect {
        opts.restart_collect = v;
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    opts
}

pub fn handle_run(cli: &Cli) -> Result<()> {
    let mut opts = setup_opts(cli);
    setup_logging(opts.verbose);

    let cancel = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&cancel);
    ctrlc::set_handler(move || {
        log::warn!("Interrupted; finishing running units and stopping.");
        flag.store(true, Ordering::Relaxed);
    })
    .context("install Ctrl+C handler")?;
    opts.cancel = Some(cancel);

    let format = match cli.format.explicit() {
        Some(format) => format,
        None => {
            let detected = detect_format(&cli.source)?;
            debug!("Detected {} track files", detected.name());
            detected
        }
    };

    let report = collate_tracks(format, &cli.source, &cli.dest, &opts)?;
    for chunk in &report.chunks {
        debug!(
            "{}: particles {}-{}, {} rows",
            chunk.path.display(),
            chunk.partition.lo,
            chunk.partition.hi,
            chunk.rows
        );
    }
    info!(
        "Wrote {} chunks to {} ({} rows, {} particles)",
        report.chunks.len(),
        cli.dest.display(),
        report.total_rows,
        report.unique_ids
    );
    Ok(())
}
