//! Server configuration.
//!
//! Every field has a default, so a partial JSON document (or none at all) is a
//! valid configuration:
//!
//! ```json
//! { "bind_address": "0.0.0.0:8080", "max_request_size": 1048576 }
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default upper bound on a buffered request (8 MiB).
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Default initial read buffer capacity per connection.
pub const DEFAULT_INITIAL_BUFFER_SIZE: usize = 4096;

/// Errors produced while loading or validating a [`ServerConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid config field '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Listener and connection settings for [`Server`](crate::server::Server).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Address to listen on, e.g. `127.0.0.1:8080`.
    pub bind_address: String,

    /// Largest request, head plus body, buffered before answering 413.
    pub max_request_size: usize,

    /// Initial capacity of each connection's read buffer.
    pub initial_buffer_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:8080".to_string(),
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            initial_buffer_size: DEFAULT_INITIAL_BUFFER_SIZE,
        }
    }
}

impl ServerConfig {
    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed JSON, [`ConfigError::Invalid`] if
    /// a value is out of range.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_json`](Self::from_json).
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    #[must_use]
    pub fn bind_address(mut self, addr: impl Into<String>) -> Self {
        self.bind_address = addr.into();
        self
    }

    #[must_use]
    pub fn max_request_size(mut self, bytes: usize) -> Self {
        self.max_request_size = bytes;
        self
    }

    #[must_use]
    pub fn initial_buffer_size(mut self, bytes: usize) -> Self {
        self.initial_buffer_size = bytes;
        self
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bind_address.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "bind_address",
                reason: "must not be empty".into(),
            });
        }
        if self.max_request_size == 0 {
            return Err(ConfigError::Invalid {
                field: "max_request_size",
                reason: "must be greater than zero".into(),
            });
        }
        if self.initial_buffer_size == 0 {
            return Err(ConfigError::Invalid {
                field: "initial_buffer_size",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}
