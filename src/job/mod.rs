//! Job model and execution.
//!
//! A job is a grid of `rows × columns` iteration counts, split into one
//! [`Task`] per row. Tasks wait in a shared [`TaskQueue`]; finished rows land
//! in a [`ResultAggregator`]. The [`JobOrchestrator`] wires the two to either
//! the [`LocalExecutor`] or a set of remote worker sessions.

mod aggregator;
mod error;
mod grid;
mod local;
mod orchestrator;
mod queue;
mod types;

pub use aggregator::ResultAggregator;
pub use error::{AggregateError, JobError, JobResult};
pub use grid::Grid;
pub use local::LocalExecutor;
pub use orchestrator::{JobOrchestrator, JobOutcome};
pub use queue::TaskQueue;
pub use types::{
    JobSpec, RowResult, Task, DEFAULT_COLUMNS, DEFAULT_MAX_ITERATIONS, DEFAULT_ROWS,
};
