//! Shared configuration for the extension call dispatcher.
//!
//! [`Config`] is layered by `ortho_config`: compiled defaults, then an optional
//! TOML file (`--config-path`), then `EXTCALL_*` environment variables, then
//! command-line flags. The dispatcher core consumes the resolved values; it
//! never reads the environment itself.

mod defaults;
mod logging;
mod shutdown;

use ortho_config::OrthoConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use self::defaults::{
    DEFAULT_LOG_FILTER, DEFAULT_OUTPUT_CAPACITY, DEFAULT_TICKET_SEED, DEFAULT_WORKER_THREADS,
    MIN_OUTPUT_CAPACITY, default_log_filter, default_log_filter_string, default_log_format,
    default_shutdown_policy,
};
pub use self::logging::{LogFormat, LogFormatParseError};
pub use self::shutdown::ShutdownPolicy;

/// Resolved dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "EXTCALL")]
pub struct Config {
    /// Number of worker threads draining the asynchronous task queue.
    #[ortho_config(default = DEFAULT_WORKER_THREADS)]
    pub worker_threads: usize,
    /// Size of the host reply buffer, in bytes.
    #[ortho_config(default = DEFAULT_OUTPUT_CAPACITY)]
    pub output_capacity: usize,
    /// Value the ticket counter starts from.
    #[ortho_config(default = DEFAULT_TICKET_SEED)]
    pub ticket_seed: u64,
    /// Fate of queued tasks at shutdown.
    #[ortho_config(default = default_shutdown_policy())]
    pub shutdown_policy: ShutdownPolicy,
    /// Tracing filter expression.
    #[ortho_config(default = default_log_filter_string())]
    pub log_filter: String,
    /// Log output format.
    #[ortho_config(default = default_log_format())]
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            worker_threads: DEFAULT_WORKER_THREADS,
            output_capacity: DEFAULT_OUTPUT_CAPACITY,
            ticket_seed: DEFAULT_TICKET_SEED,
            shutdown_policy: default_shutdown_policy(),
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
        }
    }
}

impl Config {
    /// Number of worker threads in the pool.
    #[must_use]
    pub const fn worker_threads(&self) -> usize {
        self.worker_threads
    }

    /// Reply buffer capacity in bytes.
    #[must_use]
    pub const fn output_capacity(&self) -> usize {
        self.output_capacity
    }

    /// Seed for the ticket counter.
    #[must_use]
    pub const fn ticket_seed(&self) -> u64 {
        self.ticket_seed
    }

    /// Policy applied to queued tasks at shutdown.
    #[must_use]
    pub const fn shutdown_policy(&self) -> ShutdownPolicy {
        self.shutdown_policy
    }

    /// Tracing filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Log output format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Checks that the resolved values are usable by the dispatcher.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] describing the first out-of-range value.
    pub const fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::InvalidWorkerThreads {
                value: self.worker_threads,
            });
        }
        if self.output_capacity < MIN_OUTPUT_CAPACITY {
            return Err(ConfigError::InvalidOutputCapacity {
                value: self.output_capacity,
                minimum: MIN_OUTPUT_CAPACITY,
            });
        }
        if self.ticket_seed == u64::MAX {
            return Err(ConfigError::ReservedTicketSeed {
                value: self.ticket_seed,
            });
        }
        Ok(())
    }
}

/// Errors raised when a loaded configuration is out of range.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The pool needs at least one worker.
    #[error("worker_threads must be at least 1 (got {value})")]
    InvalidWorkerThreads {
        /// Configured value.
        value: usize,
    },
    /// The reply buffer is too small to carry tickets or error tags.
    #[error("output_capacity must be at least {minimum} bytes (got {value})")]
    InvalidOutputCapacity {
        /// Configured value.
        value: usize,
        /// Smallest accepted value.
        minimum: usize,
    },
    /// The seed leaves no room for a first ticket.
    #[error("ticket_seed {value} leaves no room for the first ticket")]
    ReservedTicketSeed {
        /// Configured value.
        value: u64,
    },
}
