//! Administrative commands addressed to the `system` pseudo-protocol.

use crate::error::DispatchError;

/// A parsed `system:sync:` command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SystemCommand {
    /// Report the crate version.
    Version,
    /// Echo the reply capacity the caller offered.
    OutputSize,
    /// List registered protocol names.
    Protocols,
    /// Instantiate a catalogue kind and register it under a name.
    AddProtocol {
        /// Catalogue kind to instantiate.
        kind: String,
        /// Name to register the instance under.
        name: String,
        /// Database identifier handed to `init`.
        database_id: Option<String>,
        /// Configuration string handed to `init`.
        init: String,
    },
    /// Refuse further `add_protocol` commands.
    Lock,
    /// Report whether the system surface is locked.
    LockStatus,
}

impl SystemCommand {
    /// Parses the payload of a `system` command.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedCommand`] for unknown commands or an
    /// `add_protocol` missing its kind or name.
    pub fn parse(payload: &str) -> Result<Self, DispatchError> {
        let (verb, arguments) = payload
            .split_once(':')
            .map_or((payload, None), |(verb, rest)| (verb, Some(rest)));
        match (verb.trim().to_ascii_lowercase().as_str(), arguments) {
            ("version", None) => Ok(Self::Version),
            ("output_size", None) => Ok(Self::OutputSize),
            ("protocols", None) => Ok(Self::Protocols),
            ("lock", None) => Ok(Self::Lock),
            ("lock_status", None) => Ok(Self::LockStatus),
            ("add_protocol", Some(arguments)) => parse_add_protocol(arguments),
            _ => Err(DispatchError::malformed(format!(
                "unknown system command '{payload}'"
            ))),
        }
    }
}

fn parse_add_protocol(arguments: &str) -> Result<SystemCommand, DispatchError> {
    let mut parts = arguments.splitn(4, ':');
    let kind = parts.next().map(str::trim).unwrap_or_default();
    let name = parts.next().map(str::trim).unwrap_or_default();
    if kind.is_empty() || name.is_empty() {
        return Err(DispatchError::malformed(
            "expected add_protocol:<kind>:<name>[:<database_id>[:<init>]]",
        ));
    }
    let database_id = parts
        .next()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_owned);
    let init = parts.next().unwrap_or_default().to_owned();
    Ok(SystemCommand::AddProtocol {
        kind: kind.to_owned(),
        name: name.to_owned(),
        database_id,
        init,
    })
}
