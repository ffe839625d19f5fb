//! Configuration module for Juliafarm.
//!
//! Handles the TOML settings file, environment variables, and worker
//! addresses.

mod address;
mod settings;

pub use address::{WorkerAddress, DEFAULT_PORT};
pub use settings::{expand_env_vars, parse_duration, NetworkSettings, Settings, SettingsError};
