//! Coordinator/worker communication.
//!
//! The coordinator opens one TCP connection per configured worker and drives
//! it with a [`WorkerSession`]. Each remote machine runs a [`WorkerServer`]
//! that computes rows with the same kernel the local executor uses.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     Coordinator (Rust + Tokio)                  │
//! │  ┌───────────────────────────────────────────────────────────┐  │
//! │  │                WorkerSession (one per worker)              │  │
//! │  │  - Pulls tasks from the shared TaskQueue                   │  │
//! │  │  - Keeps up to two tasks in flight                         │  │
//! │  │  - Requeues in-flight tasks if the connection fails        │  │
//! │  └───────────────────────────────────────────────────────────┘  │
//! │                              │                                   │
//! │                 task / close │ result                            │
//! │                              ▼                                   │
//! └─────────────────────────────────────────────────────────────────┘
//!                                │
//!                                ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │              WorkerServer (one connection at a time)            │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

mod error;
pub mod protocol;
pub mod server;
pub mod session;

pub use error::{ProtocolError, ProtocolResult, ServeError, SessionError, SessionResult};
pub use protocol::Message;
pub use server::{serve_connection, WorkerServer};
pub use session::{SessionReport, SessionState, WorkerSession};
