//! Domain errors raised by the dispatcher.
//!
//! Every variant carries structured context so callers can inspect the failure
//! programmatically. [`DispatchError::tag`] exposes the stable taxonomy name
//! that host replies carry, letting the host tell protocol failures apart from
//! infrastructure faults without parsing the message.

use thiserror::Error;

use crate::ticket::Ticket;

/// Errors arising from registration, dispatch, execution, or retrieval.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No protocol with the given name is registered.
    #[error("protocol '{name}' is not registered")]
    UnknownProtocol {
        /// Name that was looked up.
        name: String,
    },

    /// A protocol with the same name is already registered or initialising.
    #[error("protocol '{name}' is already registered")]
    AlreadyRegistered {
        /// Conflicting name.
        name: String,
    },

    /// The name is reserved for a built-in pseudo-protocol.
    #[error("protocol name '{name}' is reserved")]
    ReservedName {
        /// Rejected name.
        name: String,
    },

    /// The catalogue has no factory for the requested protocol kind.
    #[error("protocol kind '{kind}' is not available")]
    UnknownProtocolKind {
        /// Requested kind.
        kind: String,
    },

    /// The protocol's own initialisation rejected its configuration.
    #[error("protocol '{name}' failed to initialise: {message}")]
    InitFailed {
        /// Protocol name.
        name: String,
        /// Diagnostic text reported by the protocol, verbatim.
        message: String,
    },

    /// The protocol failed or panicked while executing a command.
    #[error("protocol '{name}' failed: {message}")]
    ProtocolExecution {
        /// Protocol name.
        name: String,
        /// Diagnostic text reported by the protocol.
        message: String,
    },

    /// The ticket was never issued or its result was already consumed.
    #[error("ticket {ticket} not found")]
    TicketNotFound {
        /// Ticket that was looked up.
        ticket: Ticket,
    },

    /// The ticket is live but its task has not produced a result yet.
    #[error("result for ticket {ticket} is still pending")]
    ResultStillPending {
        /// Ticket that was polled.
        ticket: Ticket,
    },

    /// A reply does not fit in the caller's buffer.
    #[error("result of {size} bytes exceeds reply capacity of {capacity} bytes; {hint}")]
    BufferTooSmall {
        /// Size of the payload that did not fit.
        size: usize,
        /// Capacity offered by the caller.
        capacity: usize,
        /// How the caller can retrieve the payload instead.
        hint: &'static str,
    },

    /// A protocol called back into the dispatcher while executing.
    #[error("reentrant dispatch from inside a protocol is not allowed")]
    Reentrancy,

    /// The worker pool no longer accepts tasks.
    #[error("worker pool is shutting down")]
    PoolShuttingDown,

    /// The command envelope could not be parsed.
    #[error("malformed command: {message}")]
    MalformedCommand {
        /// Description of the parse failure.
        message: String,
    },

    /// The mode is unknown or not accepted by the addressed target.
    #[error("mode '{mode}' is not supported by '{target}'")]
    UnsupportedMode {
        /// Addressed target.
        target: String,
        /// Requested mode.
        mode: String,
    },

    /// The system surface was locked against further changes.
    #[error("system commands are locked")]
    Locked,

    /// Internal failure (poisoned lock, thread spawn failure, double write).
    #[error("internal error: {message}")]
    Internal {
        /// Description of the failure.
        message: String,
    },
}

impl DispatchError {
    /// Returns the stable taxonomy tag carried by host replies.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::UnknownProtocol { .. } => "UnknownProtocol",
            Self::AlreadyRegistered { .. } => "AlreadyRegistered",
            Self::ReservedName { .. } => "ReservedName",
            Self::UnknownProtocolKind { .. } => "UnknownProtocolKind",
            Self::InitFailed { .. } => "InitFailed",
            Self::ProtocolExecution { .. } => "ProtocolExecutionError",
            Self::TicketNotFound { .. } => "TicketNotFound",
            Self::ResultStillPending { .. } => "ResultStillPending",
            Self::BufferTooSmall { .. } => "BufferTooSmall",
            Self::Reentrancy => "Reentrancy",
            Self::PoolShuttingDown => "PoolShuttingDown",
            Self::MalformedCommand { .. } => "MalformedCommand",
            Self::UnsupportedMode { .. } => "UnsupportedMode",
            Self::Locked => "Locked",
            Self::Internal { .. } => "Internal",
        }
    }

    /// Renders the error as a host reply: `ERROR:<tag>:<message>`.
    #[must_use]
    pub fn to_reply(&self) -> String {
        format!("ERROR:{}:{self}", self.tag())
    }

    /// Returns `true` when the caller's input caused the failure, as opposed
    /// to an infrastructure fault.
    #[must_use]
    pub const fn is_caller_fault(&self) -> bool {
        !matches!(self, Self::Internal { .. } | Self::PoolShuttingDown)
    }

    /// Creates an unknown protocol error.
    pub fn unknown_protocol(name: impl Into<String>) -> Self {
        Self::UnknownProtocol { name: name.into() }
    }

    /// Creates an already registered error.
    pub fn already_registered(name: impl Into<String>) -> Self {
        Self::AlreadyRegistered { name: name.into() }
    }

    /// Creates a reserved name error.
    pub fn reserved_name(name: impl Into<String>) -> Self {
        Self::ReservedName { name: name.into() }
    }

    /// Creates an unknown protocol kind error.
    pub fn unknown_protocol_kind(kind: impl Into<String>) -> Self {
        Self::UnknownProtocolKind { kind: kind.into() }
    }

    /// Creates an initialisation failure carrying the protocol's diagnostic.
    pub fn init_failed(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InitFailed {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a protocol execution error.
    pub fn protocol_execution(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ProtocolExecution {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a malformed command error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedCommand {
            message: message.into(),
        }
    }

    /// Creates an unsupported mode error.
    pub fn unsupported_mode(target: impl Into<String>, mode: impl Into<String>) -> Self {
        Self::UnsupportedMode {
            target: target.into(),
            mode: mode.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}
