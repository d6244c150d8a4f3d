//! Transport configuration.
//!
//! Configuration is loaded in the following order (later overrides
//! earlier):
//! 1. Default values
//! 2. YAML config file (if specified via `FRAGNET_CONFIG`)
//! 3. Environment variables (`FRAGNET_MAX_DATAGRAM`,
//!    `FRAGNET_RETRY_DELAY_MS`, `FRAGNET_TRACE`)

use crate::retry::RetryPolicy;
use crate::trace::{NoopTrace, StderrTrace, TraceSink};
use fragnet_protocol::MAX_FRAGMENT_SIZE;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Largest datagram the receiver accepts; also the full buffer size
    /// for unshrunk receives.
    pub max_datagram: usize,
    /// Retry schedule for the receive loop.
    pub retry: RetryConfig,
    /// Emit per-packet trace blocks to stderr.
    pub trace: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_datagram: MAX_FRAGMENT_SIZE,
            retry: RetryConfig::default(),
            trace: false,
        }
    }
}

/// Retry schedule as configured; converted into a [`RetryPolicy`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// `None` retries until shutdown.
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: None,
            initial_delay_ms: 2000,
            max_delay_ms: 2000,
            multiplier: 1.0,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            initial_delay: Duration::from_millis(self.initial_delay_ms),
            max_delay: Duration::from_millis(self.max_delay_ms),
            multiplier: self.multiplier,
        }
    }
}

impl TransportConfig {
    /// Loads configuration from file, then applies environment variable
    /// overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = if let Ok(path) = std::env::var("FRAGNET_CONFIG") {
            Self::from_file(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: TransportConfig = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// The trace sink this configuration selects.
    pub fn trace_sink(&self) -> Arc<dyn TraceSink> {
        if self.trace {
            Arc::new(StderrTrace::new())
        } else {
            Arc::new(NoopTrace)
        }
    }

    /// The receive retry policy this configuration selects.
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.policy()
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var("FRAGNET_MAX_DATAGRAM") {
            if let Ok(n) = value.parse() {
                self.max_datagram = n;
            }
        }
        if let Ok(value) = std::env::var("FRAGNET_RETRY_DELAY_MS") {
            if let Ok(n) = value.parse::<u64>() {
                self.retry.initial_delay_ms = n;
                self.retry.max_delay_ms = self.retry.max_delay_ms.max(n);
            }
        }
        if let Ok(value) = std::env::var("FRAGNET_TRACE") {
            self.trace = value == "1" || value.eq_ignore_ascii_case("true");
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, #[source] std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, String),
}
