//! The capability every protocol plugin implements.
//!
//! A protocol is a named unit of command-execution logic. The dispatcher only
//! ever sees it through [`Protocol`]: `init` runs once, before the registry
//! publishes the instance, and `execute` may then be called concurrently from
//! the host thread (sync calls) and from any worker thread (oneway and async
//! calls). Implementations guard their own mutable state.
//!
//! # Example
//!
//! ```
//! use extcall_dispatch::{Protocol, ProtocolContext, ProtocolFailure, Ticket};
//!
//! struct Upper;
//!
//! impl Protocol for Upper {
//!     fn execute(&self, input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
//!         Ok(input.to_uppercase())
//!     }
//! }
//!
//! let upper = Upper;
//! assert_eq!(upper.execute("abc", None).unwrap(), "ABC");
//! ```

use thiserror::Error;

use crate::ticket::Ticket;

/// Failure reported by a protocol from `init` or `execute`.
///
/// The message is surfaced verbatim to whoever triggered the call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct ProtocolFailure {
    message: String,
}

impl ProtocolFailure {
    /// Creates a failure with the given diagnostic text.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the diagnostic text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<String> for ProtocolFailure {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for ProtocolFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Registration-time context handed to [`Protocol::init`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolContext {
    name: String,
    database_id: Option<String>,
    output_capacity: usize,
}

impl ProtocolContext {
    /// Builds the context for a protocol registered under `name`.
    pub fn new(
        name: impl Into<String>,
        database_id: Option<String>,
        output_capacity: usize,
    ) -> Self {
        Self {
            name: name.into(),
            database_id,
            output_capacity,
        }
    }

    /// Name the protocol is being registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Identifier of the database connection the protocol should use, if any.
    ///
    /// Connection pools live outside the dispatcher; protocols resolve the
    /// identifier against whatever session pool they were built with.
    #[must_use]
    pub fn database_id(&self) -> Option<&str> {
        self.database_id.as_deref()
    }

    /// Host reply capacity in effect when the protocol was registered.
    #[must_use]
    pub const fn output_capacity(&self) -> usize {
        self.output_capacity
    }
}

/// Command-execution capability implemented by every protocol plugin.
pub trait Protocol: Send + Sync {
    /// Prepares the protocol from its configuration string.
    ///
    /// Called exactly once, before the instance becomes visible to dispatch.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolFailure`] whose text is reported to the caller that
    /// requested registration.
    fn init(&mut self, context: &ProtocolContext, config: &str) -> Result<(), ProtocolFailure> {
        let _ = (context, config);
        Ok(())
    }

    /// Executes one command.
    ///
    /// `ticket` is `Some` for async calls, so long-running protocols can tag
    /// their own diagnostics with it.
    ///
    /// # Errors
    ///
    /// Returns a [`ProtocolFailure`] when the input cannot be processed.
    fn execute(&self, input: &str, ticket: Option<Ticket>) -> Result<String, ProtocolFailure>;
}
