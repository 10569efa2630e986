//! Asynchronous call dispatch behind a fixed-size reply buffer.
//!
//! A host that can only make blocking calls with a small reply buffer hands
//! every command to a [`Dispatcher`]. Each command names a protocol and a mode:
//!
//! - `sync` runs the protocol inline and replies with its result;
//! - `oneway` queues the command for a worker and replies `OK`;
//! - `async` queues the command and replies with a [`Ticket`] the host later
//!   redeems through the `result` pseudo-protocol, in one piece or in chunks.
//!
//! Protocols implement [`Protocol`] and are published through the
//! [`ProtocolRegistry`] only after their `init` succeeds. Results of async
//! calls live in the [`ResultStore`] until the host reads them. The
//! [`WorkerPool`] runs queued work on a fixed set of threads and catches
//! protocol panics at the task boundary.
//!
//! # Example
//!
//! ```
//! use extcall_dispatch::{
//!     Dispatcher, DispatcherSettings, Protocol, ProtocolCatalogue, ProtocolFailure, Ticket,
//! };
//!
//! struct Echo;
//! impl Protocol for Echo {
//!     fn execute(&self, input: &str, _: Option<Ticket>) -> Result<String, ProtocolFailure> {
//!         Ok(input.to_owned())
//!     }
//! }
//!
//! let catalogue = ProtocolCatalogue::new().with_kind("echo", || Box::new(Echo));
//! let dispatcher = Dispatcher::start(DispatcherSettings::default(), catalogue)
//!     .expect("dispatcher starts");
//! assert_eq!(dispatcher.call("system:sync:add_protocol:echo:echo", 64), "OK");
//! assert_eq!(dispatcher.call("echo:sync:hello", 64), "hello");
//! ```

mod dispatch;
mod error;
mod pool;
mod protocol;
mod reentrancy;
mod registry;
mod store;
mod ticket;

#[cfg(test)]
mod tests;

pub use self::dispatch::{
    Command, Dispatcher, DispatcherSettings, LAST_PREFIX, MORE_PREFIX, Mode, Reply, SystemCommand,
};
pub use self::error::DispatchError;
pub use self::pool::{ShutdownReport, Task, WorkerPool};
pub use self::protocol::{Protocol, ProtocolContext, ProtocolFailure};
pub use self::registry::{
    ProtocolCatalogue, ProtocolEntry, ProtocolRegistry, RESULT_PROTOCOL, SYSTEM_PROTOCOL,
};
pub use self::store::{Chunk, ResultStore};
pub use self::ticket::{FIRST_TICKET, NO_TICKET, SYNC_MARKER, Ticket, TicketParseError};
