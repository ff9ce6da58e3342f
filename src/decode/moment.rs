//! Magnetic moment: `mu = 0.5 * (|v'|^2 - v_para^2) / |B|` with `v' = v - U`, `v_para = v'.B / |B|`.

use rayon::prelude::*;

use crate::{ColumnLayout, TrackRow};

/// Positions of the velocity, field, and bulk-flow components in a layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MomentColumns {
    pub v: [usize; 3],
    pub b: [usize; 3],
    pub u: [usize; 3],
}

impl MomentColumns {
    /// None if any of `v1..v3`, `B1..B3`, `U1..U3` is missing.
    pub fn locate(layout: &ColumnLayout) -> Option<Self> {
        let find = |prefix: &str| -> Option<[usize; 3]> {
            Some([
                layout.index_of(&format!("{prefix}1"))?,
                layout.index_of(&format!("{prefix}2"))?,
                layout.index_of(&format!("{prefix}3"))?,
            ])
        };
        Some(Self {
            v: find("v")?,
            b: find("B")?,
            u: find("U")?,
        })
    }

    fn pick(values: &[f64], idx: [usize; 3]) -> [f64; 3] {
        [values[idx[0]], values[idx[1]], values[idx[2]]]
    }
}

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

/// Pure per-record reduction. A zero field gives NaN, as the division would.
pub fn magnetic_moment(v: [f64; 3], u: [f64; 3], b: [f64; 3]) -> f64 {
    let w = [v[0] - u[0], v[1] - u[1], v[2] - u[2]];
    let b_mag = dot(b, b).sqrt();
    let v_para = dot(w, b) / b_mag;
    0.5 * (dot(w, w) - v_para * v_para) / b_mag
}

/// Compute `mu` for every row in place.
pub fn fill_magnetic_moment(rows: &mut [TrackRow], cols: MomentColumns) {
    rows.par_iter_mut().for_each(|row| {
        let v = MomentColumns::pick(&row.values, cols.v);
        let b = MomentColumns::pick(&row.values, cols.b);
        let u = MomentColumns::pick(&row.values, cols.u);
        row.mu = magnetic_moment(v, u, b);
    });
}
