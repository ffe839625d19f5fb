//! Escape-iteration kernel.
//!
//! Each row of the grid maps linearly onto the complex plane, centred on the
//! grid's midpoint and scaled by the zoom factor. A pixel's value is the number
//! of `z ← z² + c` iterations before `|z|²` reaches 4, capped at the task's
//! iteration limit.

use serde::{Deserialize, Serialize};

use crate::job::{RowResult, Task};

/// Real part of the default Julia constant.
pub const DEFAULT_C_REAL: f64 = -0.7;

/// Imaginary part of the default Julia constant.
pub const DEFAULT_C_IMAG: f64 = 0.27015;

/// Default zoom factor.
pub const DEFAULT_ZOOM: f64 = 1.0;

const ESCAPE_RADIUS_SQ: f64 = 4.0;

/// Fixed parameters of the fractal shared by every task of a job.
///
/// Both the coordinator and every worker must use the same values, otherwise
/// rows computed remotely will not line up with rows computed locally.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FractalParams {
    /// Real part of the constant `c`.
    pub c_real: f64,
    /// Imaginary part of the constant `c`.
    pub c_imag: f64,
    /// Zoom factor; larger values show a smaller region of the plane.
    pub zoom: f64,
}

impl Default for FractalParams {
    fn default() -> Self {
        Self {
            c_real: DEFAULT_C_REAL,
            c_imag: DEFAULT_C_IMAG,
            zoom: DEFAULT_ZOOM,
        }
    }
}

impl FractalParams {
    pub fn new(c_real: f64, c_imag: f64, zoom: f64) -> Self {
        Self {
            c_real,
            c_imag,
            zoom,
        }
    }
}

/// Compute the iteration counts for one row.
///
/// The returned values are ordered by column and there is exactly one per
/// column of the task. Pure and deterministic, so it may run concurrently for
/// different tasks without coordination.
pub fn compute_row(task: &Task, params: &FractalParams) -> RowResult {
    let columns = i64::from(task.columns);
    let rows = i64::from(task.rows);

    // Integer halves keep the centring identical on every platform.
    let half_columns = columns / 2;
    let half_rows = rows / 2;

    let im_start = (i64::from(task.id) - half_rows) as f64 / (0.5 * params.zoom * rows as f64);
    let re_scale = 0.5 * params.zoom * columns as f64;

    let values = (0..columns)
        .map(|column| {
            let re_start = 1.5 * (column - half_columns) as f64 / re_scale;
            escape_count(re_start, im_start, task.max_iterations, params)
        })
        .collect();

    RowResult {
        task_id: task.id,
        values,
    }
}

fn escape_count(mut re: f64, mut im: f64, max_iterations: u32, params: &FractalParams) -> u32 {
    let mut count = 0;
    while count < max_iterations && re * re + im * im < ESCAPE_RADIUS_SQ {
        count += 1;
        let next_re = re * re - im * im + params.c_real;
        im = 2.0 * re * im + params.c_imag;
        re = next_re;
    }
    count
}
