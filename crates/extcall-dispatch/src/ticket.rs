//! Tickets identifying asynchronous results.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

use thiserror::Error;

/// Sentinel meaning "no ticket"; never issued.
pub const NO_TICKET: u64 = 0;

/// Sentinel marking a synchronous call; never issued.
pub const SYNC_MARKER: u64 = 1;

/// Smallest value a ticket can take.
pub const FIRST_TICKET: u64 = 2;

/// Process-unique identifier of a pending or completed asynchronous result.
///
/// Values `0` and `1` are reserved sentinels and can never be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(u64);

impl Ticket {
    /// The first ticket after the sentinels.
    pub const FIRST: Self = Self(FIRST_TICKET);

    /// Wraps a raw value, rejecting the reserved sentinels.
    #[must_use]
    pub const fn new(value: u64) -> Option<Self> {
        if value < FIRST_TICKET {
            None
        } else {
            Some(Self(value))
        }
    }

    /// Returns the raw ticket value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Returns the ticket issued after this one, skipping the sentinels on
    /// wrap-around.
    #[must_use]
    pub const fn successor(self) -> Self {
        match self.0.checked_add(1) {
            Some(next) => Self(next),
            None => Self::FIRST,
        }
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Errors raised while parsing a ticket from host text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketParseError {
    /// The text is not an unsigned integer.
    #[error("'{input}' is not a ticket: {source}")]
    NotANumber {
        /// Rejected input.
        input: String,
        /// Underlying integer parse error.
        #[source]
        source: ParseIntError,
    },
    /// The value is one of the reserved sentinels.
    #[error("{value} is a reserved ticket value")]
    Reserved {
        /// Rejected value.
        value: u64,
    },
}

impl FromStr for Ticket {
    type Err = TicketParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let value = trimmed
            .parse::<u64>()
            .map_err(|source| TicketParseError::NotANumber {
                input: trimmed.to_owned(),
                source,
            })?;
        Self::new(value).ok_or(TicketParseError::Reserved { value })
    }
}
