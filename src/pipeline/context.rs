//! Stage context: worker count, progress display, and the cancel flag shared by every stage.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::CollateOpts;
use crate::utils::config::WorkerThreadLimits;

/// Shared by every stage of one run.
#[derive(Clone, Debug)]
pub struct StageContext {
    pub num_workers: usize,
    pub verbose: bool,
    pub cancel: Arc<AtomicBool>,
}

impl StageContext {
    pub fn from_opts(opts: &CollateOpts) -> Self {
        Self {
            num_workers: WorkerThreadLimits::current().resolve(opts.num_workers),
            verbose: opts.verbose,
            cancel: opts
                .cancel
                .clone()
                .unwrap_or_else(|| Arc::new(AtomicBool::new(false))),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }
}

/// One decode task: the files feeding one intermediate store.
#[derive(Clone, Debug)]
pub struct DecodeUnit {
    pub files: Vec<PathBuf>,
    pub store: PathBuf,
}

/// What the stages before collect hand over: expected row total, sorted distinct global ids,
/// and the column layout every store shares.
pub struct CollectInput {
    pub expected_rows: usize,
    pub unique_ids: Vec<i64>,
    pub layout: crate::ColumnLayout,
}
