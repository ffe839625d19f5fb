//! Task, result and job-shape types.

use serde::{Deserialize, Serialize};

/// Default number of grid rows (one task per row).
pub const DEFAULT_ROWS: u32 = 720;

/// Default number of grid columns.
pub const DEFAULT_COLUMNS: u32 = 1280;

/// Default iteration cap per pixel.
pub const DEFAULT_MAX_ITERATIONS: u32 = 300;

/// One row's worth of work.
///
/// `id` is the row index and is unique within a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Task {
    /// Row index in `[0, rows)`.
    pub id: u32,
    /// Iteration cap for every pixel in the row.
    pub max_iterations: u32,
    /// Total number of rows in the job.
    pub rows: u32,
    /// Number of columns in the row.
    pub columns: u32,
}

/// Iteration counts computed for one task, ordered by column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowResult {
    /// Id of the task that produced this row.
    pub task_id: u32,
    /// One value per column.
    pub values: Vec<u32>,
}

/// Shape of a job: grid size and iteration cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct JobSpec {
    pub rows: u32,
    pub columns: u32,
    pub max_iterations: u32,
}

impl Default for JobSpec {
    fn default() -> Self {
        Self {
            rows: DEFAULT_ROWS,
            columns: DEFAULT_COLUMNS,
            max_iterations: DEFAULT_MAX_ITERATIONS,
        }
    }
}

impl JobSpec {
    pub fn new(rows: u32, columns: u32, max_iterations: u32) -> Self {
        Self {
            rows,
            columns,
            max_iterations,
        }
    }

    /// The task for a single row.
    pub fn task(&self, id: u32) -> Task {
        Task {
            id,
            max_iterations: self.max_iterations,
            rows: self.rows,
            columns: self.columns,
        }
    }

    /// All tasks of the job in row order.
    pub fn tasks(&self) -> impl Iterator<Item = Task> + '_ {
        (0..self.rows).map(move |id| self.task(id))
    }
}
