//! Coordinator-side session driving one remote worker.
//!
//! A session keeps at most two tasks in flight: `current`, whose result is
//! being awaited, and `next`, which is sent as soon as `current`'s result has
//! been read so the worker always has something queued while the coordinator
//! records the finished row.

use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, warn};

use super::error::{SessionError, SessionResult};
use super::protocol::{self, Message};
use crate::config::WorkerAddress;
use crate::job::{ResultAggregator, Task, TaskQueue};

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    PipelineRunning,
    Draining,
    Closed,
    Failed,
}

/// What a finished session did.
#[derive(Debug)]
pub struct SessionReport {
    /// 1-based worker number, in configuration order.
    pub worker: usize,
    /// Address the session talked to.
    pub address: String,
    /// Rows this session recorded.
    pub completed: usize,
    /// Terminal state, `Closed` or `Failed`.
    pub state: SessionState,
    /// Why the session failed, if it did.
    pub error: Option<SessionError>,
    /// Ids of in-flight tasks handed back to the queue on failure.
    pub requeued: Vec<u32>,
}

impl SessionReport {
    pub fn is_success(&self) -> bool {
        self.state == SessionState::Closed
    }
}

/// Tasks dequeued by a session but not yet recorded.
#[derive(Debug, Default)]
struct InFlight {
    current: Option<Task>,
    next: Option<Task>,
}

impl InFlight {
    /// Hand every in-flight task back to the queue.
    fn requeue(&mut self, queue: &TaskQueue) -> Vec<u32> {
        [self.current.take(), self.next.take()]
            .into_iter()
            .flatten()
            .map(|task| {
                queue.enqueue(task);
                task.id
            })
            .collect()
    }
}

/// One coordinator-to-worker connection.
pub struct WorkerSession {
    worker: usize,
    address: WorkerAddress,
    queue: Arc<TaskQueue>,
    aggregator: Arc<ResultAggregator>,
    read_timeout: Option<Duration>,
}

impl WorkerSession {
    pub fn new(
        worker: usize,
        address: WorkerAddress,
        queue: Arc<TaskQueue>,
        aggregator: Arc<ResultAggregator>,
    ) -> Self {
        Self {
            worker,
            address,
            queue,
            aggregator,
            read_timeout: None,
        }
    }

    /// Bound the wait for each result line. `None` waits forever.
    pub fn with_read_timeout(mut self, read_timeout: Option<Duration>) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Connect to the worker and run the session to completion.
    ///
    /// Never returns an error: failures are logged and reported, and any
    /// in-flight tasks are back on the queue by the time this returns.
    pub async fn run(self) -> SessionReport {
        self.transition(SessionState::Connecting);

        let stream = match TcpStream::connect((self.address.host.as_str(), self.address.port)).await
        {
            Ok(stream) => stream,
            Err(source) => {
                let error = SessionError::Connect {
                    address: self.address.to_string(),
                    source,
                };
                warn!(worker = self.worker, error = %error, "worker unavailable");
                self.transition(SessionState::Failed);
                return self.report(0, SessionState::Failed, Some(error), Vec::new());
            }
        };

        info!(
            worker = self.worker,
            address = %self.address,
            "connection established"
        );
        self.run_on(stream).await
    }

    /// Run the pipelined protocol over an already-open stream.
    pub async fn run_on<S>(&self, stream: S) -> SessionReport
    where
        S: AsyncRead + AsyncWrite,
    {
        let (read_half, write_half) = tokio::io::split(stream);
        let mut reader = BufReader::new(read_half);
        let mut writer = BufWriter::new(write_half);
        let mut in_flight = InFlight::default();
        let mut completed = 0;

        let outcome = self
            .pipeline(&mut reader, &mut writer, &mut in_flight, &mut completed)
            .await;

        let report = match outcome {
            Ok(()) => {
                // The worker is told `close` already; a failed shutdown changes nothing.
                if let Err(error) = writer.shutdown().await {
                    debug!(worker = self.worker, error = %error, "shutdown after close failed");
                }
                self.transition(SessionState::Closed);
                self.report(completed, SessionState::Closed, None, Vec::new())
            }
            Err(error) => {
                let requeued = in_flight.requeue(&self.queue);
                warn!(
                    worker = self.worker,
                    error = %error,
                    requeued = ?requeued,
                    "session terminated because of an error"
                );
                self.transition(SessionState::Failed);
                self.report(completed, SessionState::Failed, Some(error), requeued)
            }
        };

        info!(
            worker = self.worker,
            completed = report.completed,
            "session ending"
        );
        report
    }

    async fn pipeline<R, W>(
        &self,
        reader: &mut R,
        writer: &mut W,
        in_flight: &mut InFlight,
        completed: &mut usize,
    ) -> SessionResult<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.transition(SessionState::PipelineRunning);

        in_flight.current = self.queue.dequeue();
        if let Some(task) = in_flight.current {
            send(writer, &Message::Task(task)).await?;
        }

        let mut line = String::new();
        while let Some(current) = in_flight.current {
            line.clear();
            self.read_line(reader, &mut line).await?;
            let result = protocol::decode_result_for(&line, &current)?;

            in_flight.next = self.queue.dequeue();
            if let Some(next) = in_flight.next {
                send(writer, &Message::Task(next)).await?;
            }

            // A row the aggregator refuses is never requeued: it was either
            // recorded already or does not belong to this job.
            in_flight.current = None;
            self.aggregator.record(&current, result)?;
            *completed += 1;

            in_flight.current = in_flight.next.take();
        }

        self.transition(SessionState::Draining);
        send(writer, &Message::Close).await
    }

    async fn read_line<R>(&self, reader: &mut R, line: &mut String) -> SessionResult<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let read = match self.read_timeout {
            Some(limit) => tokio::time::timeout(limit, protocol::read_line(reader, line))
                .await
                .map_err(|_| SessionError::Timeout(limit))?,
            None => protocol::read_line(reader, line).await,
        };

        match read.map_err(SessionError::ReadFailed)?? {
            0 => Err(SessionError::Disconnected),
            _ => Ok(()),
        }
    }

    fn transition(&self, state: SessionState) {
        debug!(worker = self.worker, state = ?state, "session state");
    }

    fn report(
        &self,
        completed: usize,
        state: SessionState,
        error: Option<SessionError>,
        requeued: Vec<u32>,
    ) -> SessionReport {
        SessionReport {
            worker: self.worker,
            address: self.address.to_string(),
            completed,
            state,
            error,
            requeued,
        }
    }
}

async fn send<W>(writer: &mut W, message: &Message) -> SessionResult<()>
where
    W: AsyncWrite + Unpin,
{
    writer
        .write_all(message.encode().as_bytes())
        .await
        .map_err(SessionError::WriteFailed)?;
    writer.flush().await.map_err(SessionError::WriteFailed)
}
