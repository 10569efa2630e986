//! Built-in protocol kinds offered to the host.

use extcall_dispatch::{Protocol, ProtocolCatalogue, ProtocolContext, ProtocolFailure, Ticket};
use tracing::debug;

const PROTOCOL_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::protocols");

/// Catalogue kind of [`EchoProtocol`].
pub const ECHO_KIND: &str = "echo";

/// Returns its input, preceded by the prefix given at registration.
///
/// `system:sync:add_protocol:echo:shout::>> ` registers an instance that
/// answers `shout:sync:hi` with `>> hi`.
#[derive(Debug, Default, Clone)]
pub struct EchoProtocol {
    prefix: String,
}

impl Protocol for EchoProtocol {
    fn init(&mut self, context: &ProtocolContext, config: &str) -> Result<(), ProtocolFailure> {
        debug!(
            target: PROTOCOL_TARGET,
            name = context.name(),
            prefix = config,
            "echo protocol initialised"
        );
        config.clone_into(&mut self.prefix);
        Ok(())
    }

    fn execute(&self, input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
        Ok(format!("{}{input}", self.prefix))
    }
}

/// Adds the built-in kinds to `catalogue`, keeping caller-supplied factories
/// that share a kind name.
#[must_use]
pub fn with_builtin_kinds(mut catalogue: ProtocolCatalogue) -> ProtocolCatalogue {
    if !catalogue.kinds().contains(&ECHO_KIND) {
        catalogue.add(ECHO_KIND, || Box::new(EchoProtocol::default()));
    }
    catalogue
}
