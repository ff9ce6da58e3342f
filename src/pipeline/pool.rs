//! Fixed-size worker pool with a barrier at the end of every stage.
//!
//! Units go out over a bounded channel to `num_workers` OS threads; each worker runs one unit
//! to completion before taking the next. Results come back tagged with their unit index and
//! the stage only returns once every worker has exited. After the first failure (or a cancel)
//! workers stop taking new units; units already running are allowed to finish.

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender, bounded};
use kdam::Animation;
use log::debug;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use super::context::StageContext;
use crate::engine::progress::{ProgressBarConfig, create_progress_bar, update_progress_bar};
use crate::error::CollateError;

type Tagged<R> = (usize, Result<R>);

fn worker_loop<T, R, F>(
    unit_rx: Receiver<(usize, T)>,
    result_tx: Sender<Tagged<R>>,
    work: &F,
    abort: &AtomicBool,
    cancel: &AtomicBool,
) where
    F: Fn(&T) -> Result<R>,
{
    while let Ok((idx, unit)) = unit_rx.recv() {
        if abort.load(Ordering::Relaxed) || cancel.load(Ordering::Relaxed) {
            break;
        }
        let result = work(&unit);
        if result.is_err() {
            abort.store(true, Ordering::Relaxed);
        }
        if result_tx.send((idx, result)).is_err() {
            break;
        }
    }
}

/// Run `work` over every unit on at most `num_workers` threads. Returns results in unit order,
/// or the first error reported.
pub fn run_stage<T, R, F>(
    ctx: &StageContext,
    stage: &'static str,
    units: Vec<T>,
    num_workers: usize,
    work: F,
) -> Result<Vec<R>>
where
    T: Send,
    R: Send,
    F: Fn(&T) -> Result<R> + Sync,
{
    let total = units.len();
    if total == 0 {
        return Ok(Vec::new());
    }
    let workers = num_workers.clamp(1, total);
    debug!("{stage}: {total} units on {workers} workers");

    let (unit_tx, unit_rx) = bounded::<(usize, T)>(total);
    for tagged in units.into_iter().enumerate() {
        unit_tx
            .send(tagged)
            .map_err(|_| anyhow!("{stage}: work queue closed early"))?;
    }
    drop(unit_tx);

    let (result_tx, result_rx) = bounded::<Tagged<R>>(total);
    let abort = AtomicBool::new(false);
    let bar = ctx
        .verbose
        .then(|| create_progress_bar(ProgressBarConfig::new(total, stage, Animation::Classic)));
    let mut slots: Vec<Option<R>> = (0..total).map(|_| None).collect();
    let mut first_error: Option<anyhow::Error> = None;

    thread::scope(|s| -> Result<()> {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let unit_rx = unit_rx.clone();
                let result_tx = result_tx.clone();
                let (work, abort, cancel) = (&work, &abort, ctx.cancel.as_ref());
                s.spawn(move || worker_loop(unit_rx, result_tx, work, abort, cancel))
            })
            .collect();
        // Dropping the last sender closes the channel once every worker has exited.
        drop(result_tx);

        while let Ok((idx, result)) = result_rx.recv() {
            match result {
                Ok(value) => slots[idx] = Some(value),
                Err(e) => {
                    if first_error.is_none() {
                        log::error!("{stage} failed: {e:#}");
                        first_error = Some(e);
                    }
                }
            }
            if let Some(bar) = &bar {
                update_progress_bar(bar, 1);
            }
        }
        for h in handles {
            h.join()
                .map_err(|_| anyhow!("{stage} worker thread panicked"))?;
        }
        Ok(())
    })?;

    if let Some(e) = first_error {
        return Err(e);
    }
    if ctx.is_cancelled() && slots.iter().any(Option::is_none) {
        return Err(CollateError::Cancelled { stage }.into());
    }
    slots
        .into_iter()
        .map(|slot| slot.ok_or_else(|| anyhow!("{stage}: a unit produced no result")))
        .collect()
}
