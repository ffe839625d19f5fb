//! Worker-side server: computes rows on behalf of a coordinator.
//!
//! Serves one coordinator connection at a time. Further connections wait in
//! the listen backlog until the current one ends.

use std::io;
use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::{TcpListener, ToSocketAddrs};
use tracing::{debug, info, warn};

use super::error::{ProtocolError, ServeError};
use super::protocol::{self, commands, Message, MAX_COLUMNS};
use crate::kernel::{compute_row, FractalParams};

/// Accepts coordinator connections and answers `task` requests.
pub struct WorkerServer {
    listener: TcpListener,
    params: FractalParams,
}

impl WorkerServer {
    /// Listen on all interfaces at `port`. Port `0` picks an ephemeral port.
    pub async fn bind(port: u16, params: FractalParams) -> io::Result<Self> {
        Self::bind_addr(("0.0.0.0", port), params).await
    }

    /// Listen on an explicit address.
    pub async fn bind_addr<A: ToSocketAddrs>(addr: A, params: FractalParams) -> io::Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self { listener, params })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accept and serve connections until accepting fails.
    ///
    /// A failing connection is logged and dropped; only an error from the
    /// listener itself ends the loop.
    pub async fn run(self) -> io::Result<()> {
        info!(address = %self.local_addr()?, "worker listening");

        loop {
            let (stream, peer) = self.listener.accept().await?;
            info!(peer = %peer, "accepted connection");

            match serve_connection(stream, self.params).await {
                Ok(tasks) => info!(peer = %peer, tasks, "received close command"),
                Err(error) => {
                    warn!(peer = %peer, error = %error, "connection closed with error")
                }
            }
        }
    }
}

/// Serve one coordinator connection until `close`.
///
/// Returns the number of tasks answered. The stream is dropped, and so
/// closed, whichever way this returns.
pub async fn serve_connection<S>(stream: S, params: FractalParams) -> Result<usize, ServeError>
where
    S: AsyncRead + AsyncWrite,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let mut reader = BufReader::new(read_half);
    let mut writer = BufWriter::new(write_half);
    let mut line = String::new();
    let mut answered = 0;

    loop {
        line.clear();
        let read = protocol::read_line(&mut reader, &mut line)
            .await
            .map_err(ServeError::ReadFailed)??;
        if read == 0 {
            return Err(ServeError::Disconnected);
        }

        let task = match Message::decode(&line)? {
            Message::Task(task) => task,
            Message::Close => {
                // Nothing to flush; every result was flushed when written.
                if let Err(error) = writer.shutdown().await {
                    debug!(error = %error, "shutdown after close failed");
                }
                return Ok(answered);
            }
            Message::Result(_) => {
                return Err(ProtocolError::UnexpectedMessage {
                    expected: commands::TASK,
                    actual: commands::RESULT,
                }
                .into())
            }
        };

        if task.columns > MAX_COLUMNS {
            return Err(ProtocolError::TooManyColumns {
                task: task.id,
                columns: task.columns,
                max: MAX_COLUMNS,
            }
            .into());
        }

        let result = tokio::task::spawn_blocking(move || compute_row(&task, &params)).await?;

        writer
            .write_all(Message::Result(result).encode().as_bytes())
            .await
            .map_err(ServeError::WriteFailed)?;
        writer.flush().await.map_err(ServeError::WriteFailed)?;
        answered += 1;
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;
    use crate::job::Task;

    async fn exchange(input: &str) -> (Result<usize, ServeError>, String) {
        let (mut coordinator, worker) = tokio::io::duplex(64 * 1024);
        coordinator.write_all(input.as_bytes()).await.unwrap();

        let outcome = serve_connection(worker, FractalParams::default()).await;

        let mut output = String::new();
        coordinator.read_to_string(&mut output).await.unwrap();
        (outcome, output)
    }

    #[tokio::test]
    async fn test_answers_tasks_until_close() {
        let (outcome, output) = exchange("task 0 50 2 3\ntask 1 50 2 3\nclose\n").await;

        assert_eq!(outcome.unwrap(), 2);
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(lines.len(), 2);

        let params = FractalParams::default();
        for (id, line) in lines.iter().enumerate() {
            let task = Task {
                id: id as u32,
                max_iterations: 50,
                rows: 2,
                columns: 3,
            };
            assert_eq!(
                Message::decode(line).unwrap(),
                Message::Result(compute_row(&task, &params))
            );
        }
    }

    #[tokio::test]
    async fn test_unknown_command_aborts_connection() {
        let (outcome, output) = exchange("task 0 10 1 2\nhello\ntask 0 10 1 2\n").await;

        assert!(matches!(outcome, Err(ServeError::Protocol(_))));
        assert_eq!(output.lines().count(), 1);
    }

    #[tokio::test]
    async fn test_result_from_coordinator_is_a_violation() {
        let (outcome, _) = exchange("result 0 1 5\n").await;
        assert!(matches!(outcome, Err(ServeError::Protocol(_))));
    }

    #[tokio::test]
    async fn test_end_of_stream_without_close() {
        let (coordinator, worker) = tokio::io::duplex(1024);
        drop(coordinator);
        let outcome = serve_connection(worker, FractalParams::default()).await;
        assert!(matches!(outcome, Err(ServeError::Disconnected)));
    }

    #[tokio::test]
    async fn test_oversized_task_is_refused_before_computing() {
        let (outcome, output) = exchange("task 0 1 1 4000000000\n").await;

        assert!(matches!(
            outcome,
            Err(ServeError::Protocol(ProtocolError::TooManyColumns {
                columns: 4_000_000_000,
                ..
            }))
        ));
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn test_unterminated_line_is_cut_off() {
        let (mut coordinator, worker) = tokio::io::duplex(4 << 20);
        let flood = vec![b'1'; protocol::MAX_LINE_BYTES as usize * 2];
        coordinator.write_all(&flood).await.unwrap();

        let outcome = serve_connection(worker, FractalParams::default()).await;
        assert!(matches!(
            outcome,
            Err(ServeError::Protocol(ProtocolError::LineTooLong { .. }))
        ));
    }

    #[tokio::test]
    async fn test_server_keeps_accepting_after_a_bad_connection() {
        use tokio::io::{AsyncBufReadExt, BufReader};
        use tokio::net::TcpStream;

        let server = WorkerServer::bind_addr("127.0.0.1:0", FractalParams::default())
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let handle = tokio::spawn(server.run());

        let mut bad = TcpStream::connect(addr).await.unwrap();
        bad.write_all(b"bogus\n").await.unwrap();
        drop(bad);

        let good = TcpStream::connect(addr).await.unwrap();
        let (read_half, mut write_half) = good.into_split();
        write_half.write_all(b"task 0 10 2 3\n").await.unwrap();

        let mut reader = BufReader::new(read_half);
        let mut line = String::new();
        reader.read_line(&mut line).await.unwrap();
        assert!(line.starts_with("result 0 3 "), "{line:?}");

        write_half.write_all(b"close\n").await.unwrap();
        line.clear();
        assert_eq!(reader.read_line(&mut line).await.unwrap(), 0);

        handle.abort();
    }
}
