//! Thread-safe sink for finished rows.

use parking_lot::Mutex;

use super::error::AggregateError;
use super::grid::Grid;
use super::types::{JobSpec, RowResult, Task};

/// Records finished rows into the job's grid and counts completions.
///
/// Copying a row and bumping the counter happen under one lock, so the
/// orchestrator's final count can never observe a half-recorded row.
#[derive(Debug)]
pub struct ResultAggregator {
    state: Mutex<AggregateState>,
}

#[derive(Debug)]
struct AggregateState {
    grid: Grid,
    recorded: Vec<bool>,
    completed: usize,
}

impl ResultAggregator {
    pub fn new(rows: usize, columns: usize) -> Self {
        Self {
            state: Mutex::new(AggregateState {
                grid: Grid::new(rows, columns),
                recorded: vec![false; rows],
                completed: 0,
            }),
        }
    }

    pub fn for_job(spec: &JobSpec) -> Self {
        Self::new(spec.rows as usize, spec.columns as usize)
    }

    /// Copy `result` into the row of `task` and count it as completed.
    ///
    /// A row is accepted once; a second attempt for the same row, a row
    /// outside the grid or a result of the wrong width is rejected and leaves
    /// the grid and the counter untouched.
    pub fn record(&self, task: &Task, result: RowResult) -> Result<(), AggregateError> {
        if result.task_id != task.id {
            return Err(AggregateError::TaskMismatch {
                task: task.id,
                result: result.task_id,
            });
        }

        let mut state = self.state.lock();
        let row = task.id as usize;
        let rows = state.grid.rows();
        let columns = state.grid.columns();

        if row >= rows {
            return Err(AggregateError::RowOutOfRange { row: task.id, rows });
        }
        if result.values.len() != columns {
            return Err(AggregateError::WidthMismatch {
                row: task.id,
                expected: columns,
                actual: result.values.len(),
            });
        }
        if state.recorded[row] {
            return Err(AggregateError::AlreadyRecorded(task.id));
        }

        state.grid.row_mut(row).copy_from_slice(&result.values);
        state.recorded[row] = true;
        state.completed += 1;
        Ok(())
    }

    /// Number of rows recorded so far.
    pub fn completed(&self) -> usize {
        self.state.lock().completed
    }

    /// Number of rows the grid holds.
    pub fn expected(&self) -> usize {
        self.state.lock().grid.rows()
    }

    /// Whether the given row has been recorded.
    pub fn is_recorded(&self, row: u32) -> bool {
        self.state
            .lock()
            .recorded
            .get(row as usize)
            .copied()
            .unwrap_or(false)
    }

    /// A copy of the grid as it stands.
    pub fn snapshot(&self) -> Grid {
        self.state.lock().grid.clone()
    }

    pub fn into_grid(self) -> Grid {
        self.state.into_inner().grid
    }
}
