//! Units of work handed to the worker pool.

use std::fmt;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::registry::ProtocolEntry;
use crate::ticket::Ticket;

/// An immutable command bound to the protocol that will execute it.
///
/// The protocol is resolved before the task is built, so a queued task can
/// never name a protocol that does not exist. A task without a ticket is
/// fire-and-forget: its result is logged and discarded.
pub struct Task {
    entry: Arc<ProtocolEntry>,
    input: String,
    ticket: Option<Ticket>,
}

impl Task {
    /// Binds `input` to a published protocol.
    pub fn new(entry: Arc<ProtocolEntry>, input: impl Into<String>, ticket: Option<Ticket>) -> Self {
        Self {
            entry,
            input: input.into(),
            ticket,
        }
    }

    /// Name of the protocol that will run the task.
    #[must_use]
    pub fn protocol_name(&self) -> &str {
        self.entry.name()
    }

    /// Command text passed to the protocol.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Ticket the result is stored under, if any.
    #[must_use]
    pub const fn ticket(&self) -> Option<Ticket> {
        self.ticket
    }

    pub(crate) fn run(&self) -> Result<String, DispatchError> {
        self.entry.run(&self.input, self.ticket)
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("protocol", &self.protocol_name())
            .field("input_bytes", &self.input.len())
            .field("ticket", &self.ticket)
            .finish()
    }
}
