//! Single-machine fallback when no workers are configured.

use tracing::debug;

use super::aggregator::ResultAggregator;
use super::error::AggregateError;
use super::queue::TaskQueue;
use crate::kernel::{compute_row, FractalParams};

/// Drains the task queue on the calling thread.
#[derive(Debug)]
pub struct LocalExecutor<'a> {
    queue: &'a TaskQueue,
    aggregator: &'a ResultAggregator,
    params: FractalParams,
}

impl<'a> LocalExecutor<'a> {
    pub fn new(queue: &'a TaskQueue, aggregator: &'a ResultAggregator, params: FractalParams) -> Self {
        Self {
            queue,
            aggregator,
            params,
        }
    }

    /// Compute and record tasks until the queue is empty.
    ///
    /// Returns the number of rows completed by this call.
    pub fn run(&self) -> Result<usize, AggregateError> {
        let mut completed = 0;
        while let Some(task) = self.queue.dequeue() {
            let result = compute_row(&task, &self.params);
            self.aggregator.record(&task, result)?;
            completed += 1;
        }
        debug!(completed, "local executor drained the queue");
        Ok(completed)
    }
}
