//! Worker-specific error types.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::job::AggregateError;

/// Result type for decoding wire messages.
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Result type for coordinator-side session operations.
pub type SessionResult<T> = Result<T, SessionError>;

/// A line that does not match the `task` / `result` / `close` grammar, or a
/// result that does not belong to the task it answers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// The line held no tokens.
    #[error("empty line received")]
    EmptyLine,

    /// The leading token is not a known command.
    #[error("unknown command: {0:?}")]
    UnknownCommand(String),

    /// A required integer field is absent.
    #[error("missing {field} in {command} message")]
    MissingField {
        command: &'static str,
        field: &'static str,
    },

    /// A field is not a non-negative integer.
    #[error("invalid {field} in {command} message: {value:?}")]
    InvalidInteger {
        command: &'static str,
        field: &'static str,
        value: String,
    },

    /// Extra tokens follow a complete message.
    #[error("unexpected trailing data in {command} message: {extra:?}")]
    TrailingData { command: &'static str, extra: String },

    /// A result carries a different number of values than it declares.
    #[error("result declares {declared} values but carries {actual}")]
    ValueCountMismatch { declared: u32, actual: usize },

    /// A result answers a different task than the one awaited.
    #[error("wrong task id in result: expected {expected}, got {actual}")]
    TaskIdMismatch { expected: u32, actual: u32 },

    /// A result's declared count differs from the task's column count.
    #[error("wrong data count in result for task {task}: expected {expected}, got {actual}")]
    ColumnCountMismatch { task: u32, expected: u32, actual: u32 },

    /// A line ran past the read limit without a terminator.
    #[error("line exceeds {limit} bytes")]
    LineTooLong { limit: u64 },

    /// A task asks for a wider row than a worker computes.
    #[error("task {task} asks for {columns} columns, at most {max} allowed")]
    TooManyColumns { task: u32, columns: u32, max: u32 },

    /// A well-formed message arrived where another kind was required.
    #[error("expected {expected} message, got {actual}")]
    UnexpectedMessage {
        expected: &'static str,
        actual: &'static str,
    },
}

/// Errors that end a coordinator-side worker session.
#[derive(Error, Debug)]
pub enum SessionError {
    /// The worker could not be reached.
    #[error("could not open connection to {address}: {source}")]
    Connect {
        address: String,
        #[source]
        source: io::Error,
    },

    /// Failed to send a message to the worker.
    #[error("failed to write to worker: {0}")]
    WriteFailed(#[source] io::Error),

    /// Failed to read from the worker.
    #[error("failed to read from worker: {0}")]
    ReadFailed(#[source] io::Error),

    /// The worker closed the stream while a result was outstanding.
    #[error("connection closed unexpectedly")]
    Disconnected,

    /// No result arrived within the configured read timeout.
    #[error("no result from worker within {0:?}")]
    Timeout(Duration),

    /// The worker sent something that is not a valid answer.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The decoded row could not be recorded.
    #[error("could not record result: {0}")]
    Aggregate(#[from] AggregateError),
}

impl SessionError {
    /// Check if the session never got a connection.
    pub fn is_connect_failure(&self) -> bool {
        matches!(self, Self::Connect { .. })
    }

    /// Check if this is a byte-stream failure (disconnect, I/O error, timeout).
    pub fn is_stream_failure(&self) -> bool {
        matches!(
            self,
            Self::WriteFailed(_) | Self::ReadFailed(_) | Self::Disconnected | Self::Timeout(_)
        )
    }

    /// Check if the worker violated the wire protocol.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

/// Errors that abort one connection on the worker side.
#[derive(Error, Debug)]
pub enum ServeError {
    /// Failed to read from the coordinator.
    #[error("failed to read from coordinator: {0}")]
    ReadFailed(#[source] io::Error),

    /// Failed to write a result back.
    #[error("failed to write to coordinator: {0}")]
    WriteFailed(#[source] io::Error),

    /// The stream ended without a `close` message.
    #[error("connection closed unexpectedly")]
    Disconnected,

    /// The coordinator sent an invalid line.
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// The compute task panicked or was cancelled.
    #[error("compute task failed: {0}")]
    Compute(#[from] tokio::task::JoinError),
}
