//! Runs a whole job: local fallback or one session per worker.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{error, info};

use super::aggregator::ResultAggregator;
use super::error::{JobError, JobResult};
use super::grid::Grid;
use super::local::LocalExecutor;
use super::queue::TaskQueue;
use super::types::JobSpec;
use crate::config::WorkerAddress;
use crate::kernel::FractalParams;
use crate::worker::{SessionReport, WorkerSession};

/// A finished, fully populated job.
#[derive(Debug)]
pub struct JobOutcome {
    pub grid: Grid,
    /// One report per configured worker; empty when run locally.
    pub sessions: Vec<SessionReport>,
    pub elapsed: Duration,
}

/// Builds the task set, dispatches it and checks that every row came back.
///
/// # Example
///
/// ```ignore
/// use juliafarm::{JobOrchestrator, JobSpec, FractalParams, WorkerAddress};
///
/// let outcome = JobOrchestrator::new(JobSpec::default(), FractalParams::default())
///     .with_workers(vec![WorkerAddress::parse("node-a:9001", 9001)?])
///     .run()
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct JobOrchestrator {
    spec: JobSpec,
    params: FractalParams,
    workers: Vec<WorkerAddress>,
    read_timeout: Option<Duration>,
}

impl JobOrchestrator {
    pub fn new(spec: JobSpec, params: FractalParams) -> Self {
        Self {
            spec,
            params,
            workers: Vec::new(),
            read_timeout: None,
        }
    }

    /// Workers to distribute over. With none, the job runs locally.
    pub fn with_workers(mut self, workers: Vec<WorkerAddress>) -> Self {
        self.workers = workers;
        self
    }

    /// Per-result read timeout applied to every session.
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    pub fn spec(&self) -> &JobSpec {
        &self.spec
    }

    pub fn workers(&self) -> &[WorkerAddress] {
        &self.workers
    }

    /// Run the job to completion.
    ///
    /// # Errors
    ///
    /// Returns [`JobError::Incomplete`] if, once every session has ended,
    /// fewer rows were recorded than the grid holds. No partial grid is
    /// returned in that case.
    pub async fn run(&self) -> JobResult<JobOutcome> {
        let started = Instant::now();
        info!(
            rows = self.spec.rows,
            columns = self.spec.columns,
            max_iterations = self.spec.max_iterations,
            workers = self.workers.len(),
            "starting job"
        );

        let queue = Arc::new(TaskQueue::for_job(&self.spec));
        let aggregator = Arc::new(ResultAggregator::for_job(&self.spec));

        let sessions = if self.workers.is_empty() {
            info!("no workers configured, running on this computer only");
            LocalExecutor::new(&queue, &aggregator, self.params).run()?;
            Vec::new()
        } else {
            self.run_sessions(&queue, &aggregator).await
        };

        let completed = aggregator.completed();
        let expected = self.spec.rows as usize;
        if completed != expected {
            error!(completed, expected, "job incomplete");
            return Err(JobError::Incomplete {
                completed,
                expected,
            });
        }

        let elapsed = started.elapsed();
        info!(seconds = elapsed.as_secs_f64(), "job finished");

        let grid = match Arc::try_unwrap(aggregator) {
            Ok(aggregator) => aggregator.into_grid(),
            Err(shared) => shared.snapshot(),
        };
        Ok(JobOutcome {
            grid,
            sessions,
            elapsed,
        })
    }

    async fn run_sessions(
        &self,
        queue: &Arc<TaskQueue>,
        aggregator: &Arc<ResultAggregator>,
    ) -> Vec<SessionReport> {
        let handles: Vec<_> = self
            .workers
            .iter()
            .enumerate()
            .map(|(index, address)| {
                let session = WorkerSession::new(
                    index + 1,
                    address.clone(),
                    Arc::clone(queue),
                    Arc::clone(aggregator),
                )
                .with_read_timeout(self.read_timeout);
                tokio::spawn(session.run())
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .filter_map(|(index, joined)| match joined {
                Ok(report) => Some(report),
                Err(join_error) => {
                    error!(worker = index + 1, error = %join_error, "session task aborted");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::compute_row;

    #[tokio::test]
    async fn test_local_run_fills_every_row() {
        let spec = JobSpec::new(2, 2, 50);
        let outcome = JobOrchestrator::new(spec, FractalParams::default())
            .run()
            .await
            .unwrap();

        assert!(outcome.sessions.is_empty());
        assert_eq!(outcome.grid.rows(), 2);
        for task in spec.tasks() {
            assert_eq!(
                outcome.grid.row(task.id as usize),
                &compute_row(&task, &FractalParams::default()).values[..]
            );
        }
    }

    #[tokio::test]
    async fn test_all_workers_unreachable_is_incomplete() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let spec = JobSpec::new(3, 2, 10);
        let err = JobOrchestrator::new(spec, FractalParams::default())
            .with_workers(vec![WorkerAddress::new("127.0.0.1", port)])
            .run()
            .await
            .unwrap_err();

        assert!(err.is_incomplete());
        assert!(matches!(
            err,
            JobError::Incomplete {
                completed: 0,
                expected: 3
            }
        ));
    }
}
