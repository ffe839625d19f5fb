//! TOML-based configuration for Juliafarm.
//!
//! Supports a config file (juliafarm.toml) with environment variable
//! expansion in worker addresses.
//!
//! Example configuration:
//! ```toml
//! workers = ["node-a:9001", "node-b", "${EXTRA_WORKER}"]
//!
//! [job]
//! rows = 720
//! columns = 1280
//! max_iterations = 300
//!
//! [fractal]
//! c_real = -0.7
//! c_imag = 0.27015
//! zoom = 1.0
//!
//! [network]
//! port = 9001
//! read_timeout = "30s"
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::address::{WorkerAddress, DEFAULT_PORT};
use crate::job::JobSpec;
use crate::kernel::FractalParams;
use crate::worker::protocol::MAX_COLUMNS;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid duration format: {0}")]
    InvalidDuration(String),

    #[error("Invalid worker address: {0}")]
    InvalidAddress(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    /// Worker addresses (`host` or `host:port`). Empty means run locally.
    pub workers: Vec<String>,

    /// Grid size and iteration cap.
    pub job: JobSpec,

    /// Julia constant and zoom.
    pub fractal: FractalParams,

    /// Network configuration.
    pub network: NetworkSettings,
}

/// Network configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkSettings {
    /// Port workers listen on, and the fallback port for worker addresses.
    pub port: u16,

    /// How long a session waits for each result (e.g., "500ms", "30s", "5m").
    /// Unset means wait forever.
    pub read_timeout: Option<String>,
}

impl Default for NetworkSettings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            read_timeout: None,
        }
    }
}

impl NetworkSettings {
    /// The parsed read timeout, if one is configured.
    pub fn read_timeout(&self) -> Result<Option<Duration>, SettingsError> {
        self.read_timeout.as_deref().map(parse_duration).transpose()
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        let settings: Settings = toml::from_str(&content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `JULIAFARM_CONFIG`
    /// 2. `./juliafarm.toml`
    /// 3. `~/.config/juliafarm/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("JULIAFARM_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("juliafarm.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("juliafarm").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Load from an explicit file if given, otherwise from the default
    /// locations.
    pub fn load_from(path: Option<&Path>) -> Result<Self, SettingsError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::load(),
        }
    }

    /// Reject values no job can run with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        let job = &self.job;
        if job.rows == 0 || job.columns == 0 {
            return Err(SettingsError::InvalidConfig(format!(
                "grid must be at least 1x1, got {}x{}",
                job.rows, job.columns
            )));
        }
        if job.columns > MAX_COLUMNS {
            return Err(SettingsError::InvalidConfig(format!(
                "columns must be at most {MAX_COLUMNS}, got {}",
                job.columns
            )));
        }
        if job.max_iterations == 0 {
            return Err(SettingsError::InvalidConfig(
                "max_iterations must be positive".to_string(),
            ));
        }
        if !self.fractal.zoom.is_finite() || self.fractal.zoom <= 0.0 {
            return Err(SettingsError::InvalidConfig(format!(
                "zoom must be a positive number, got {}",
                self.fractal.zoom
            )));
        }
        if !self.fractal.c_real.is_finite() || !self.fractal.c_imag.is_finite() {
            return Err(SettingsError::InvalidConfig(
                "fractal constant must be finite".to_string(),
            ));
        }
        self.network.read_timeout()?;
        Ok(())
    }

    /// Parsed worker addresses, with environment variables expanded and the
    /// configured port as fallback.
    pub fn worker_addresses(&self) -> Result<Vec<WorkerAddress>, SettingsError> {
        self.workers
            .iter()
            .map(|raw| WorkerAddress::parse(&expand_env_vars(raw)?, self.network.port))
            .collect()
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.peek() == Some(&'{') {
            chars.next();
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(ch) = chars.next_if(|ch| ch.is_alphanumeric() || *ch == '_') {
                name.push(ch);
            }
            if name.is_empty() {
                // Just a lone $, keep it
                result.push('$');
                continue;
            }
            name
        };

        let value =
            env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name.clone()))?;
        result.push_str(&value);
    }

    Ok(result)
}

/// Parse a duration such as `"250ms"`, `"30s"`, `"5m"` or `"1h"`.
///
/// A bare number is taken as seconds.
pub fn parse_duration(s: &str) -> Result<Duration, SettingsError> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);

    let amount: u64 = digits
        .parse()
        .map_err(|_| SettingsError::InvalidDuration(s.to_string()))?;

    let invalid = || SettingsError::InvalidDuration(s.to_string());
    match unit.trim() {
        "ms" => Ok(Duration::from_millis(amount)),
        "" | "s" => Ok(Duration::from_secs(amount)),
        "m" => amount.checked_mul(60).map(Duration::from_secs).ok_or_else(invalid),
        "h" => amount.checked_mul(3600).map(Duration::from_secs).ok_or_else(invalid),
        _ => Err(invalid()),
    }
}
