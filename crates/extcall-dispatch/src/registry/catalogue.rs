//! Factories for protocol kinds that can be registered at runtime.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::error::DispatchError;
use crate::protocol::Protocol;

type Factory = Arc<dyn Fn() -> Box<dyn Protocol> + Send + Sync>;

/// Maps a protocol kind to a factory producing fresh, uninitialised instances.
///
/// The host registers protocols by kind (`add_protocol:<kind>:<name>`); the
/// catalogue decides which kinds exist.
///
/// # Example
///
/// ```
/// use extcall_dispatch::{Protocol, ProtocolCatalogue, ProtocolFailure, Ticket};
///
/// struct Echo;
/// impl Protocol for Echo {
///     fn execute(&self, input: &str, _: Option<Ticket>) -> Result<String, ProtocolFailure> {
///         Ok(input.to_owned())
///     }
/// }
///
/// let catalogue = ProtocolCatalogue::new().with_kind("echo", || Box::new(Echo));
/// assert!(catalogue.create("echo").is_ok());
/// assert!(catalogue.create("sql").is_err());
/// ```
#[derive(Clone, Default)]
pub struct ProtocolCatalogue {
    factories: BTreeMap<String, Factory>,
}

impl ProtocolCatalogue {
    /// Creates an empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a kind, replacing any factory previously stored under it.
    pub fn add<F>(&mut self, kind: impl Into<String>, factory: F)
    where
        F: Fn() -> Box<dyn Protocol> + Send + Sync + 'static,
    {
        self.factories.insert(kind.into(), Arc::new(factory));
    }

    /// Builder form of [`ProtocolCatalogue::add`].
    #[must_use]
    pub fn with_kind<F>(mut self, kind: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Protocol> + Send + Sync + 'static,
    {
        self.add(kind, factory);
        self
    }

    /// Builds a fresh instance of `kind`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnknownProtocolKind`] when no factory exists.
    pub fn create(&self, kind: &str) -> Result<Box<dyn Protocol>, DispatchError> {
        self.factories
            .get(kind)
            .map(|factory| factory())
            .ok_or_else(|| DispatchError::unknown_protocol_kind(kind))
    }

    /// Returns the available kinds in sorted order.
    #[must_use]
    pub fn kinds(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }
}

impl fmt::Debug for ProtocolCatalogue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProtocolCatalogue")
            .field("kinds", &self.kinds())
            .finish()
    }
}
