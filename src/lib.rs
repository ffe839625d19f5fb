//! # Juliafarm
//!
//! Renders a Julia-set escape-iteration grid by splitting it into row tasks
//! and farming those tasks out to remote workers over TCP.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   JobOrchestrator                        │
//! │  builds one Task per row, checks the completion count    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [TaskQueue]
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │  WorkerSession (per TCP  │   │  LocalExecutor (no       │
//! │  worker, pipelined)      │   │  workers configured)     │
//! └──────────────────────────┘   └──────────────────────────┘
//!            │  task / result / close lines        │
//!            ▼                                     │
//! ┌──────────────────────────┐                     │
//! │  WorkerServer → kernel   │                     │
//! └──────────────────────────┘                     │
//!            │                                     │
//!            ▼ [ResultAggregator]                  ▼
//! ┌─────────────────────────────────────────────────────────┐
//! │                 Grid (rows × columns)                    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [render]
//!                     PNG image
//! ```

pub mod config;
pub mod job;
pub mod kernel;
pub mod render;
pub mod worker;

pub use config::{Settings, WorkerAddress, DEFAULT_PORT};
pub use job::{Grid, JobError, JobOrchestrator, JobOutcome, JobSpec, RowResult, Task};
pub use kernel::{compute_row, FractalParams};
