//! Registry of initialised protocol instances keyed by name.
//!
//! Registration reserves the name, runs the protocol's `init` without holding
//! the map lock, then publishes the instance. Lookups take a shared read lock,
//! so they never block each other, and a name that is still initialising is
//! reported as unknown rather than handed out half-built. A second
//! registration racing on the same name sees the reservation and is rejected.

mod catalogue;

use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::{debug, info, warn};

use crate::error::DispatchError;
use crate::protocol::{Protocol, ProtocolContext};
use crate::reentrancy::ExecutionGuard;
use crate::ticket::Ticket;

pub use self::catalogue::ProtocolCatalogue;

/// Tracing target for registry operations.
pub(crate) const REGISTRY_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::registry");

/// Name of the pseudo-protocol used to retrieve async results.
pub const RESULT_PROTOCOL: &str = "result";

/// Name of the pseudo-protocol carrying administrative commands.
pub const SYSTEM_PROTOCOL: &str = "system";

const RESERVED_NAMES: &[&str] = &[RESULT_PROTOCOL, SYSTEM_PROTOCOL];

/// A published protocol: immutable once its `init` has succeeded.
pub struct ProtocolEntry {
    name: String,
    database_id: Option<String>,
    instance: Box<dyn Protocol>,
}

impl ProtocolEntry {
    /// Name the protocol was registered under.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Database identifier supplied at registration.
    #[must_use]
    pub fn database_id(&self) -> Option<&str> {
        self.database_id.as_deref()
    }

    /// Executes the protocol, converting failures and panics into
    /// [`DispatchError::ProtocolExecution`].
    ///
    /// The calling thread is marked as running protocol code for the duration,
    /// so any attempt to dispatch from inside `execute` fails fast.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ProtocolExecution`] when the protocol reports a
    /// failure or panics.
    pub fn run(&self, input: &str, ticket: Option<Ticket>) -> Result<String, DispatchError> {
        let _guard = ExecutionGuard::enter();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.instance.execute(input, ticket)
        }));
        match outcome {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(failure)) => Err(DispatchError::protocol_execution(
                &self.name,
                failure.message(),
            )),
            Err(panic) => Err(DispatchError::protocol_execution(
                &self.name,
                panic_message(panic.as_ref()),
            )),
        }
    }
}

impl fmt::Debug for ProtocolEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolEntry")
            .field("name", &self.name)
            .field("database_id", &self.database_id)
            .finish_non_exhaustive()
    }
}

enum Slot {
    Initialising,
    Ready(Arc<ProtocolEntry>),
}

/// Thread-safe registry of protocol instances.
///
/// # Example
///
/// ```
/// use extcall_dispatch::{Protocol, ProtocolContext, ProtocolFailure, ProtocolRegistry, Ticket};
///
/// struct Echo;
/// impl Protocol for Echo {
///     fn execute(&self, input: &str, _: Option<Ticket>) -> Result<String, ProtocolFailure> {
///         Ok(input.to_owned())
///     }
/// }
///
/// let registry = ProtocolRegistry::new();
/// let context = ProtocolContext::new("echo", None, 1024);
/// registry.register(context, "", Box::new(Echo)).expect("registration succeeds");
/// let entry = registry.lookup("echo").expect("lookup succeeds");
/// assert_eq!(entry.run("hi", None).expect("run"), "hi");
/// ```
#[derive(Default)]
pub struct ProtocolRegistry {
    slots: RwLock<HashMap<String, Slot>>,
}

impl ProtocolRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Initialises `protocol` with `config` and publishes it under the
    /// context's name.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ReservedName`] or
    /// [`DispatchError::MalformedCommand`] for unusable names,
    /// [`DispatchError::AlreadyRegistered`] when the name is taken (the
    /// existing registration is left intact), and
    /// [`DispatchError::InitFailed`] with the protocol's own diagnostic when
    /// `init` fails.
    pub fn register(
        &self,
        context: ProtocolContext,
        config: &str,
        mut protocol: Box<dyn Protocol>,
    ) -> Result<(), DispatchError> {
        let name = context.name().to_owned();
        validate_name(&name)?;
        self.reserve(&name)?;

        debug!(target: REGISTRY_TARGET, protocol = %name, "initialising protocol");
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| protocol.init(&context, config)));
        let failure = match outcome {
            Ok(Ok(())) => None,
            Ok(Err(failure)) => Some(failure.message().to_owned()),
            Err(panic) => Some(panic_message(panic.as_ref())),
        };

        let mut slots = self.write()?;
        if let Some(message) = failure {
            slots.remove(&name);
            warn!(
                target: REGISTRY_TARGET,
                protocol = %name,
                error = %message,
                "protocol initialisation failed"
            );
            return Err(DispatchError::init_failed(name, message));
        }

        let entry = ProtocolEntry {
            name: name.clone(),
            database_id: context.database_id().map(str::to_owned),
            instance: protocol,
        };
        slots.insert(name.clone(), Slot::Ready(Arc::new(entry)));
        info!(
            target: REGISTRY_TARGET,
            protocol = %name,
            database_id = context.database_id().unwrap_or(""),
            "protocol registered"
        );
        Ok(())
    }

    /// Looks up a published protocol by name.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownProtocol`] when no initialised protocol
    /// has that name.
    pub fn lookup(&self, name: &str) -> Result<Arc<ProtocolEntry>, DispatchError> {
        match self.read()?.get(name) {
            Some(Slot::Ready(entry)) => Ok(Arc::clone(entry)),
            Some(Slot::Initialising) | None => Err(DispatchError::unknown_protocol(name)),
        }
    }

    /// Returns the published protocol names in sorted order.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn names(&self) -> Result<Vec<String>, DispatchError> {
        let mut names: Vec<String> = self
            .read()?
            .iter()
            .filter(|(_, slot)| matches!(slot, Slot::Ready(_)))
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        Ok(names)
    }

    /// Returns the number of published protocols.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn len(&self) -> Result<usize, DispatchError> {
        Ok(self
            .read()?
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count())
    }

    /// Returns `true` when nothing is published.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn is_empty(&self) -> Result<bool, DispatchError> {
        self.len().map(|len| len == 0)
    }

    /// Removes every protocol, returning how many were published.
    ///
    /// Tasks already holding an entry keep it alive until they finish.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the registry lock is poisoned.
    pub fn clear(&self) -> Result<usize, DispatchError> {
        let mut slots = self.write()?;
        let published = slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count();
        slots.clear();
        Ok(published)
    }

    fn reserve(&self, name: &str) -> Result<(), DispatchError> {
        let mut slots = self.write()?;
        if slots.contains_key(name) {
            return Err(DispatchError::already_registered(name));
        }
        slots.insert(name.to_owned(), Slot::Initialising);
        Ok(())
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Slot>>, DispatchError> {
        self.slots
            .read()
            .map_err(|_| DispatchError::internal("protocol registry lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Slot>>, DispatchError> {
        self.slots
            .write()
            .map_err(|_| DispatchError::internal("protocol registry lock poisoned"))
    }
}

impl fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("names", &self.names().unwrap_or_default())
            .finish()
    }
}

fn validate_name(name: &str) -> Result<(), DispatchError> {
    if RESERVED_NAMES
        .iter()
        .any(|reserved| reserved.eq_ignore_ascii_case(name))
    {
        return Err(DispatchError::reserved_name(name));
    }
    if name.trim().is_empty() {
        return Err(DispatchError::malformed("protocol name is empty"));
    }
    if name.contains(':') || name.chars().any(char::is_whitespace) {
        return Err(DispatchError::malformed(format!(
            "protocol name '{name}' must not contain ':' or whitespace"
        )));
    }
    Ok(())
}

pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        format!("panicked: {message}")
    } else if let Some(message) = payload.downcast_ref::<String>() {
        format!("panicked: {message}")
    } else {
        "panicked".to_owned()
    }
}
