//! Line-oriented wire protocol between coordinator and workers.
//!
//! Every message is one line of whitespace-separated ASCII tokens:
//!
//! ```text
//! task <id> <max_iterations> <rows> <columns>
//! result <id> <columns> <v0> <v1> ... <v{columns-1}>
//! close
//! ```
//!
//! Decoding works on a line that has already been read; it never touches the
//! stream itself. [`read_line`] is the one bounded way both sides read it.

use std::fmt;
use std::io;
use std::str::SplitWhitespace;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use super::error::{ProtocolError, ProtocolResult};
use crate::job::{RowResult, Task};

/// Widest row a worker agrees to compute.
pub const MAX_COLUMNS: u32 = 65_536;

/// Longest line either side reads. Fits a `result` line of [`MAX_COLUMNS`]
/// ten-digit values.
pub const MAX_LINE_BYTES: u64 = 1 << 20;

/// Command keywords.
pub mod commands {
    pub const TASK: &str = "task";
    pub const RESULT: &str = "result";
    pub const CLOSE: &str = "close";
}

/// A decoded wire message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Request to compute one row.
    Task(Task),
    /// Computed row.
    Result(RowResult),
    /// The sender will send nothing more.
    Close,
}

impl Message {
    /// The command keyword of this message.
    pub fn command(&self) -> &'static str {
        match self {
            Message::Task(_) => commands::TASK,
            Message::Result(_) => commands::RESULT,
            Message::Close => commands::CLOSE,
        }
    }

    /// Encode as a newline-terminated line.
    pub fn encode(&self) -> String {
        format!("{self}\n")
    }

    /// Decode one line (with or without its line terminator).
    pub fn decode(line: &str) -> ProtocolResult<Self> {
        let mut tokens = line.split_whitespace();
        let command = tokens.next().ok_or(ProtocolError::EmptyLine)?;

        match command {
            commands::TASK => {
                let mut fields = Fields::new(commands::TASK, tokens);
                let task = Task {
                    id: fields.next_u32("id")?,
                    max_iterations: fields.next_u32("max_iterations")?,
                    rows: fields.next_u32("rows")?,
                    columns: fields.next_u32("columns")?,
                };
                fields.finish()?;
                Ok(Message::Task(task))
            }
            commands::RESULT => {
                let mut fields = Fields::new(commands::RESULT, tokens);
                let task_id = fields.next_u32("id")?;
                let declared = fields.next_u32("columns")?;
                let values = fields.remaining_u32("value")?;
                if values.len() != declared as usize {
                    return Err(ProtocolError::ValueCountMismatch {
                        declared,
                        actual: values.len(),
                    });
                }
                Ok(Message::Result(RowResult { task_id, values }))
            }
            commands::CLOSE => {
                Fields::new(commands::CLOSE, tokens).finish()?;
                Ok(Message::Close)
            }
            other => Err(ProtocolError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Message::Task(task) => write!(
                f,
                "{} {} {} {} {}",
                commands::TASK,
                task.id,
                task.max_iterations,
                task.rows,
                task.columns
            ),
            Message::Result(result) => {
                write!(
                    f,
                    "{} {} {}",
                    commands::RESULT,
                    result.task_id,
                    result.values.len()
                )?;
                for value in &result.values {
                    write!(f, " {value}")?;
                }
                Ok(())
            }
            Message::Close => f.write_str(commands::CLOSE),
        }
    }
}

/// Decode a line that must be the result for `task`.
///
/// Fails unless the line is a well-formed `result` whose id equals the task id
/// and whose declared count equals the task's column count.
pub fn decode_result_for(line: &str, task: &Task) -> ProtocolResult<RowResult> {
    let result = match Message::decode(line)? {
        Message::Result(result) => result,
        other => {
            return Err(ProtocolError::UnexpectedMessage {
                expected: commands::RESULT,
                actual: other.command(),
            })
        }
    };

    if result.task_id != task.id {
        return Err(ProtocolError::TaskIdMismatch {
            expected: task.id,
            actual: result.task_id,
        });
    }
    // `decode` already tied the value count to the declared count.
    let declared = result.values.len() as u32;
    if declared != task.columns {
        return Err(ProtocolError::ColumnCountMismatch {
            task: task.id,
            expected: task.columns,
            actual: declared,
        });
    }
    Ok(result)
}

/// Read one line of at most [`MAX_LINE_BYTES`] into `line`.
///
/// Returns `Ok(Ok(0))` at end of stream and `Ok(Err(LineTooLong))` when the
/// limit is reached before a line terminator.
pub async fn read_line<R>(reader: &mut R, line: &mut String) -> io::Result<ProtocolResult<usize>>
where
    R: AsyncBufRead + Unpin,
{
    let read = (&mut *reader).take(MAX_LINE_BYTES).read_line(line).await?;
    if read as u64 >= MAX_LINE_BYTES && !line.ends_with('\n') {
        return Ok(Err(ProtocolError::LineTooLong {
            limit: MAX_LINE_BYTES,
        }));
    }
    Ok(Ok(read))
}

/// Cursor over the integer fields of one message.
struct Fields<'a> {
    command: &'static str,
    tokens: SplitWhitespace<'a>,
}

impl<'a> Fields<'a> {
    fn new(command: &'static str, tokens: SplitWhitespace<'a>) -> Self {
        Self { command, tokens }
    }

    fn next_u32(&mut self, field: &'static str) -> ProtocolResult<u32> {
        let token = self.tokens.next().ok_or(ProtocolError::MissingField {
            command: self.command,
            field,
        })?;
        self.parse(field, token)
    }

    fn remaining_u32(self, field: &'static str) -> ProtocolResult<Vec<u32>> {
        let command = self.command;
        self.tokens
            .map(|token| parse_u32(command, field, token))
            .collect()
    }

    fn parse(&self, field: &'static str, token: &str) -> ProtocolResult<u32> {
        parse_u32(self.command, field, token)
    }

    fn finish(mut self) -> ProtocolResult<()> {
        match self.tokens.next() {
            None => Ok(()),
            Some(first) => {
                let rest: Vec<&str> = std::iter::once(first).chain(self.tokens).collect();
                Err(ProtocolError::TrailingData {
                    command: self.command,
                    extra: rest.join(" "),
                })
            }
        }
    }
}

fn parse_u32(command: &'static str, field: &'static str, token: &str) -> ProtocolResult<u32> {
    token.parse().map_err(|_| ProtocolError::InvalidInteger {
        command,
        field,
        value: token.to_string(),
    })
}
