//! Trackcollate CLI: collate track dumps in SOURCE into particle-indexed chunks in DEST.

use anyhow::Result;
use clap::Parser;
use std::time::Instant;
use trackcollate::engine::arg_parser::Cli;
use trackcollate::engine::handle_run;

fn main() -> Result<()> {
    let start_time = Instant::now();
    let cli = Cli::parse();
    handle_run(&cli)?;
    log::debug!("Total time: {:?}", start_time.elapsed());
    Ok(())
}
