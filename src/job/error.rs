//! Job-level error types.

use thiserror::Error;

/// Result type for job operations.
pub type JobResult<T> = Result<T, JobError>;

/// Errors raised when recording a finished row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// The task's row lies outside the grid.
    #[error("row {row} is outside a grid of {rows} rows")]
    RowOutOfRange { row: u32, rows: usize },

    /// The result belongs to a different task.
    #[error("result for task {result} recorded against task {task}")]
    TaskMismatch { task: u32, result: u32 },

    /// The result does not have one value per grid column.
    #[error("row {row} has {actual} values, grid has {expected} columns")]
    WidthMismatch {
        row: u32,
        expected: usize,
        actual: usize,
    },

    /// The row was already recorded.
    #[error("row {0} was already recorded")]
    AlreadyRecorded(u32),
}

/// Errors that fail a whole job.
#[derive(Error, Debug)]
pub enum JobError {
    /// Not every row was completed once all sessions ended.
    #[error("{completed} tasks finished while there are {expected} tasks")]
    Incomplete { completed: usize, expected: usize },

    /// Recording a locally computed row failed.
    #[error("local execution failed: {0}")]
    Local(#[from] AggregateError),
}

impl JobError {
    /// Check if this error is the final completion-count mismatch.
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Self::Incomplete { .. })
    }
}
