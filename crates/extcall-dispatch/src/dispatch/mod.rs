//! Entry point for every host-issued command.
//!
//! A command is `<target>:<mode>:<payload>`. Targets name a registered
//! protocol or one of two pseudo-protocols:
//!
//! ```text
//! echo:sync:hello              -> hello
//! echo:oneway:ping             -> OK
//! slow:async:x                 -> 9817
//! result:sync:9817             -> done  (or ERROR:ResultStillPending:...)
//! result:sync:multipart:9817   -> MORE:<chunk> ... LAST:<chunk>
//! system:sync:protocols        -> echo,slow
//! ```
//!
//! Every reply fits the capacity the caller offers. Failures are rendered as
//! `ERROR:<tag>:<message>` so the host can tell protocol failures apart from
//! infrastructure faults.

mod command;
mod reply;
mod system;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use extcall_config::{Config, DEFAULT_TICKET_SEED, DEFAULT_WORKER_THREADS, ShutdownPolicy};
use tracing::{debug, info};

use self::reply::ACKNOWLEDGEMENT;
use crate::error::DispatchError;
use crate::pool::{ShutdownReport, Task, WorkerPool};
use crate::protocol::{Protocol, ProtocolContext};
use crate::reentrancy;
use crate::registry::{ProtocolCatalogue, ProtocolRegistry, RESULT_PROTOCOL, SYSTEM_PROTOCOL};
use crate::store::ResultStore;
use crate::ticket::Ticket;

pub use self::command::{Command, Mode};
pub use self::reply::{LAST_PREFIX, MORE_PREFIX, Reply};
pub use self::system::SystemCommand;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

const SYNC_HINT: &str = "use async";
const LARGER_BUFFER_HINT: &str = "offer a larger reply buffer";
const MULTIPART_KEYWORD: &str = "multipart:";
const MIN_MULTIPART_CAPACITY: usize = MORE_PREFIX.len() + 4;

/// Start-up parameters for a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherSettings {
    /// Number of worker threads.
    pub worker_threads: usize,
    /// Value the ticket counter starts from.
    pub ticket_seed: u64,
    /// Fate of queued tasks at shutdown.
    pub shutdown_policy: ShutdownPolicy,
}

impl Default for DispatcherSettings {
    fn default() -> Self {
        Self {
            worker_threads: DEFAULT_WORKER_THREADS,
            ticket_seed: DEFAULT_TICKET_SEED,
            shutdown_policy: ShutdownPolicy::default(),
        }
    }
}

impl From<&Config> for DispatcherSettings {
    fn from(config: &Config) -> Self {
        Self {
            worker_threads: config.worker_threads(),
            ticket_seed: config.ticket_seed(),
            shutdown_policy: config.shutdown_policy(),
        }
    }
}

/// Routes host commands to protocols, the worker pool and the result store.
///
/// The registry, the store and the pool each guard their own state; the
/// dispatcher itself only holds the `system` lock flag.
pub struct Dispatcher {
    registry: ProtocolRegistry,
    catalogue: ProtocolCatalogue,
    store: Arc<ResultStore>,
    pool: WorkerPool,
    locked: AtomicBool,
    shutdown_policy: ShutdownPolicy,
}

impl Dispatcher {
    /// Creates the store and starts the worker pool.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] when the pool cannot start.
    pub fn start(
        settings: DispatcherSettings,
        catalogue: ProtocolCatalogue,
    ) -> Result<Self, DispatchError> {
        let store = Arc::new(ResultStore::new(settings.ticket_seed));
        let pool = WorkerPool::start(settings.worker_threads, Arc::clone(&store))?;
        info!(
            target: DISPATCH_TARGET,
            workers = settings.worker_threads,
            kinds = ?catalogue.kinds(),
            "dispatcher started"
        );
        Ok(Self {
            registry: ProtocolRegistry::new(),
            catalogue,
            store,
            pool,
            locked: AtomicBool::new(false),
            shutdown_policy: settings.shutdown_policy,
        })
    }

    /// Registered protocols.
    #[must_use]
    pub const fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    /// Protocol kinds available to `add_protocol`.
    #[must_use]
    pub const fn catalogue(&self) -> &ProtocolCatalogue {
        &self.catalogue
    }

    /// Result records of asynchronous calls.
    #[must_use]
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Worker pool executing oneway and async calls.
    #[must_use]
    pub const fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Registers an already constructed protocol.
    ///
    /// # Errors
    ///
    /// Propagates [`ProtocolRegistry::register`] failures.
    pub fn register_protocol(
        &self,
        context: ProtocolContext,
        config: &str,
        protocol: Box<dyn Protocol>,
    ) -> Result<(), DispatchError> {
        self.registry.register(context, config, protocol)
    }

    /// Instantiates `kind` from the catalogue and registers it as `name`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Locked`] after [`Dispatcher::lock`],
    /// [`DispatchError::UnknownProtocolKind`] for kinds missing from the
    /// catalogue, and any registration failure.
    pub fn add_protocol(
        &self,
        kind: &str,
        name: &str,
        database_id: Option<&str>,
        init: &str,
        output_capacity: usize,
    ) -> Result<(), DispatchError> {
        if self.is_locked() {
            return Err(DispatchError::Locked);
        }
        let protocol = self.catalogue.create(kind)?;
        let context = ProtocolContext::new(name, database_id.map(str::to_owned), output_capacity);
        self.registry.register(context, init, protocol)
    }

    /// Locks the `system` surface against further `add_protocol` calls.
    pub fn lock(&self) {
        if !self.locked.swap(true, Ordering::SeqCst) {
            info!(target: DISPATCH_TARGET, "system commands locked");
        }
    }

    /// Returns `true` once [`Dispatcher::lock`] has been called.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }

    /// Handles one host command, returning text of at most `capacity` bytes.
    ///
    /// Never blocks past the duration of a `sync` protocol call.
    #[must_use]
    pub fn call(&self, command: &str, capacity: usize) -> String {
        self.dispatch(command, capacity).render(capacity)
    }

    /// Handles one host command, writing the reply into `output`.
    ///
    /// Returns the number of bytes written, never more than `output.len()`.
    pub fn call_into(&self, output: &mut [u8], command: &str) -> usize {
        let reply = self.call(command, output.len());
        let bytes = reply.as_bytes();
        let written = bytes.len().min(output.len());
        for (slot, byte) in output.iter_mut().zip(bytes) {
            *slot = *byte;
        }
        written
    }

    /// Handles one host command, returning the structured reply.
    ///
    /// Calls made from inside a protocol's `execute` are refused with
    /// [`DispatchError::Reentrancy`] before anything else happens.
    #[must_use]
    pub fn dispatch(&self, command: &str, capacity: usize) -> Reply {
        if reentrancy::is_active() {
            return Reply::Failure(DispatchError::Reentrancy);
        }
        Reply::from(self.route(command, capacity))
    }

    /// Stops the pool per the configured policy, then drops every result and
    /// protocol.
    ///
    /// Under [`ShutdownPolicy::Cancel`] the `PoolShuttingDown` records written
    /// for cancelled async calls are dropped with the rest, so cancellations
    /// surface only through the returned [`ShutdownReport`]. Shutting the
    /// pool down through [`Dispatcher::pool`] first keeps those records
    /// readable until this call.
    ///
    /// Repeated calls return the first report.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if a lock is poisoned.
    pub fn shutdown(&self) -> Result<ShutdownReport, DispatchError> {
        let report = self.pool.shutdown(self.shutdown_policy)?;
        let results = self.store.clear()?;
        let protocols = self.registry.clear()?;
        info!(
            target: DISPATCH_TARGET,
            completed = report.completed,
            cancelled = report.cancelled,
            results,
            protocols,
            "dispatcher stopped"
        );
        Ok(report)
    }

    fn route(&self, text: &str, capacity: usize) -> Result<Reply, DispatchError> {
        let command = Command::parse(text)?;
        debug!(
            target: DISPATCH_TARGET,
            protocol = command.target(),
            mode = command.mode().as_str(),
            "routing command"
        );
        let target = command.target();
        if target.eq_ignore_ascii_case(RESULT_PROTOCOL) {
            self.route_result(&command, capacity)
        } else if target.eq_ignore_ascii_case(SYSTEM_PROTOCOL) {
            self.route_system(&command, capacity)
        } else {
            self.route_protocol(&command, capacity)
        }
    }

    fn route_protocol(&self, command: &Command<'_>, capacity: usize) -> Result<Reply, DispatchError> {
        let entry = self.registry.lookup(command.target())?;
        match command.mode() {
            Mode::Sync => fit(entry.run(command.payload(), None)?, capacity, SYNC_HINT),
            Mode::Oneway => {
                require_room(ACKNOWLEDGEMENT.len(), capacity)?;
                self.pool.submit(Task::new(entry, command.payload(), None))?;
                Ok(Reply::Ok)
            }
            Mode::Async => {
                let ticket = self.store.allocate_ticket()?;
                if let Err(error) = require_room(ticket.to_string().len(), capacity) {
                    self.store.discard(ticket)?;
                    return Err(error);
                }
                if let Err(error) = self
                    .pool
                    .submit(Task::new(entry, command.payload(), Some(ticket)))
                {
                    self.store.discard(ticket)?;
                    return Err(error);
                }
                debug!(target: DISPATCH_TARGET, %ticket, "async task queued");
                Ok(Reply::Ticket(ticket))
            }
        }
    }

    fn route_result(&self, command: &Command<'_>, capacity: usize) -> Result<Reply, DispatchError> {
        require_sync(command)?;
        let payload = command.payload().trim();
        if let Some(ticket) = strip_prefix_ignore_case(payload, MULTIPART_KEYWORD) {
            require_room(MIN_MULTIPART_CAPACITY, capacity)?;
            let chunk = self
                .store
                .read_multipart(parse_ticket(ticket)?, capacity - MORE_PREFIX.len())?;
            let has_more = chunk.has_more();
            return Ok(Reply::Chunk {
                data: chunk.into_data(),
                has_more,
            });
        }
        let payload = self.store.read_single(parse_ticket(payload)?, capacity)?;
        Ok(Reply::Payload(payload))
    }

    fn route_system(&self, command: &Command<'_>, capacity: usize) -> Result<Reply, DispatchError> {
        require_sync(command)?;
        match SystemCommand::parse(command.payload())? {
            SystemCommand::Version => fit(
                env!("CARGO_PKG_VERSION").to_owned(),
                capacity,
                LARGER_BUFFER_HINT,
            ),
            SystemCommand::OutputSize => fit(capacity.to_string(), capacity, LARGER_BUFFER_HINT),
            SystemCommand::Protocols => fit(
                self.registry.names()?.join(","),
                capacity,
                LARGER_BUFFER_HINT,
            ),
            SystemCommand::AddProtocol {
                kind,
                name,
                database_id,
                init,
            } => {
                self.add_protocol(&kind, &name, database_id.as_deref(), &init, capacity)?;
                Ok(Reply::Ok)
            }
            SystemCommand::Lock => {
                self.lock();
                Ok(Reply::Ok)
            }
            SystemCommand::LockStatus => {
                let status = if self.is_locked() { "locked" } else { "unlocked" };
                fit(status.to_owned(), capacity, LARGER_BUFFER_HINT)
            }
        }
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("registry", &self.registry)
            .field("catalogue", &self.catalogue)
            .field("store", &self.store)
            .field("pool", &self.pool)
            .field("locked", &self.is_locked())
            .finish_non_exhaustive()
    }
}

fn require_sync(command: &Command<'_>) -> Result<(), DispatchError> {
    if command.mode() == Mode::Sync {
        Ok(())
    } else {
        Err(DispatchError::unsupported_mode(
            command.target(),
            command.mode().as_str(),
        ))
    }
}

/// Rejects replies that would not fit, so the caller never sees cut text.
fn fit(payload: String, capacity: usize, hint: &'static str) -> Result<Reply, DispatchError> {
    if payload.len() > capacity {
        return Err(DispatchError::BufferTooSmall {
            size: payload.len(),
            capacity,
            hint,
        });
    }
    Ok(Reply::Payload(payload))
}

fn require_room(size: usize, capacity: usize) -> Result<(), DispatchError> {
    if size > capacity {
        return Err(DispatchError::BufferTooSmall {
            size,
            capacity,
            hint: LARGER_BUFFER_HINT,
        });
    }
    Ok(())
}

fn parse_ticket(text: &str) -> Result<Ticket, DispatchError> {
    text.parse::<Ticket>()
        .map_err(|error| DispatchError::malformed(error.to_string()))
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| text.get(prefix.len()..))
        .flatten()
}
