//! Host-facing replies and their bounded text rendering.

use crate::error::DispatchError;
use crate::ticket::Ticket;

/// Prefix of a multipart chunk with more to follow.
pub const MORE_PREFIX: &str = "MORE:";

/// Prefix of the final multipart chunk.
pub const LAST_PREFIX: &str = "LAST:";

/// Reply text of [`Reply::Ok`].
pub(crate) const ACKNOWLEDGEMENT: &str = "OK";

/// Outcome of one host call, before it is squeezed into the reply buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// Result text of a synchronous command.
    Payload(String),
    /// Acknowledgement of a oneway command or a system change.
    Ok,
    /// Ticket issued for an asynchronous command.
    Ticket(Ticket),
    /// A multipart chunk; `has_more` selects the `MORE:`/`LAST:` prefix.
    Chunk {
        /// Chunk text.
        data: String,
        /// Whether further chunks remain.
        has_more: bool,
    },
    /// A failure rendered as `ERROR:<tag>:<message>`.
    Failure(DispatchError),
}

impl Reply {
    /// Renders the reply in at most `capacity` bytes.
    ///
    /// Text longer than `capacity` is cut on the last character boundary that
    /// fits.
    #[must_use]
    pub fn render(&self, capacity: usize) -> String {
        let text = match self {
            Self::Payload(payload) => payload.clone(),
            Self::Ok => ACKNOWLEDGEMENT.to_owned(),
            Self::Ticket(ticket) => ticket.to_string(),
            Self::Chunk { data, has_more } => {
                let prefix = if *has_more { MORE_PREFIX } else { LAST_PREFIX };
                format!("{prefix}{data}")
            }
            Self::Failure(error) => error.to_reply(),
        };
        truncate(text, capacity)
    }

    /// Returns `true` for failure replies.
    #[must_use]
    pub const fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }
}

impl From<Result<Reply, DispatchError>> for Reply {
    fn from(outcome: Result<Reply, DispatchError>) -> Self {
        outcome.unwrap_or_else(Self::Failure)
    }
}

fn truncate(mut text: String, capacity: usize) -> String {
    if text.len() <= capacity {
        return text;
    }
    let mut end = capacity;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    text.truncate(end);
    text
}
