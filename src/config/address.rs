//! Worker address parsing.
//!
//! Accepts `host`, `host:port`, `[v6-literal]` and `[v6-literal]:port`. A
//! missing or unusable port falls back to the default port.

use std::fmt;

use super::settings::SettingsError;

/// Port workers listen on unless told otherwise.
pub const DEFAULT_PORT: u16 = 9001;

/// Host and port of one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerAddress {
    pub host: String,
    pub port: u16,
}

impl WorkerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse an address, using `default_port` when none (or an invalid one)
    /// is given.
    pub fn parse(input: &str, default_port: u16) -> Result<Self, SettingsError> {
        let input = input.trim();

        let (host, port) = if let Some(rest) = input.strip_prefix('[') {
            let (host, tail) = rest.split_once(']').ok_or_else(|| {
                SettingsError::InvalidAddress(format!("unterminated '[' in {input:?}"))
            })?;
            (host, tail.strip_prefix(':'))
        } else {
            match input.split_once(':') {
                // More than one colon: a bare IPv6 literal without a port.
                Some((_, tail)) if tail.contains(':') => (input, None),
                Some((host, port)) => (host, Some(port)),
                None => (input, None),
            }
        };

        if host.is_empty() {
            return Err(SettingsError::InvalidAddress(format!(
                "missing host in {input:?}"
            )));
        }

        let port = port
            .and_then(|p| p.parse::<u16>().ok())
            .filter(|&p| p != 0)
            .unwrap_or(default_port);

        Ok(Self::new(host, port))
    }
}

impl fmt::Display for WorkerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}
