//! Parsing of the `<target>:<mode>:<payload>` command envelope.

use std::fmt;

use crate::error::DispatchError;

/// How the caller wants a command executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Execute inline on the calling thread and reply with the result.
    Sync,
    /// Queue for a worker and acknowledge immediately; the result is dropped.
    Oneway,
    /// Queue for a worker and reply with a ticket for later retrieval.
    Async,
}

impl Mode {
    /// Parses a mode string (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::UnsupportedMode`] naming `target` when the
    /// value is not a known mode.
    pub fn parse(target: &str, value: &str) -> Result<Self, DispatchError> {
        match value.to_ascii_lowercase().as_str() {
            "sync" => Ok(Self::Sync),
            "oneway" => Ok(Self::Oneway),
            "async" => Ok(Self::Async),
            _ => Err(DispatchError::unsupported_mode(target, value)),
        }
    }

    /// Returns the canonical string representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sync => "sync",
            Self::Oneway => "oneway",
            Self::Async => "async",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed command envelope borrowing from the host's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Command<'a> {
    target: &'a str,
    mode: Mode,
    payload: &'a str,
}

impl<'a> Command<'a> {
    /// Splits `text` into target, mode and payload.
    ///
    /// The payload is everything after the second `:` and may contain further
    /// separators. Surrounding whitespace is trimmed from the target and mode
    /// only.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::MalformedCommand`] when a separator is missing
    /// or the target is empty, and [`DispatchError::UnsupportedMode`] for an
    /// unknown mode.
    pub fn parse(text: &'a str) -> Result<Self, DispatchError> {
        let mut parts = text.splitn(3, ':');
        let (Some(target), Some(mode), Some(payload)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(DispatchError::malformed(
                "expected <protocol>:<mode>:<payload>",
            ));
        };
        let target = target.trim();
        if target.is_empty() {
            return Err(DispatchError::malformed("protocol name is empty"));
        }
        let mode = Mode::parse(target, mode.trim())?;
        Ok(Self {
            target,
            mode,
            payload,
        })
    }

    /// Protocol or pseudo-protocol the command addresses.
    #[must_use]
    pub const fn target(&self) -> &'a str {
        self.target
    }

    /// Requested execution mode.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        self.mode
    }

    /// Text handed to the protocol.
    #[must_use]
    pub const fn payload(&self) -> &'a str {
        self.payload
    }
}
