//! Duplicate-segment filter for text dumps.
//!
//! A restart is any index `i` with `time[i] <= time[i-1]`. The run resumed from the earliest
//! row whose time reaches `time[i]`, so every row from there up to `i` (exclusive) is stale.
//! Each restart is resolved against the full time column on its own; the per-restart masks
//! are combined into one.

/// Keep-mask over `times`.
pub fn restart_mask(times: &[f64]) -> Vec<bool> {
    let mut mask = vec![true; times.len()];
    // Running max is monotonic, so the earliest row reaching `t` is a binary search away.
    let mut running_max = Vec::with_capacity(times.len());
    let mut max = f64::NEG_INFINITY;
    for &t in times {
        max = max.max(t);
        running_max.push(max);
    }
    for i in 1..times.len() {
        let t = times[i];
        if t <= times[i - 1] {
            let start = running_max[..i].partition_point(|&m| m < t);
            mask[start..i].fill(false);
        }
    }
    mask
}

/// Number of restarts (non-monotonic steps) in `times`.
pub fn count_restarts(times: &[f64]) -> usize {
    times.windows(2).filter(|w| w[1] <= w[0]).count()
}

/// Drop the rows `mask` rejects, preserving order.
pub fn apply_mask<T>(items: Vec<T>, mask: &[bool]) -> Vec<T> {
    items
        .into_iter()
        .zip(mask.iter())
        .filter_map(|(item, &keep)| keep.then_some(item))
        .collect()
}
