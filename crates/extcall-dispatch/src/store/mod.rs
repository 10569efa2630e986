//! In-memory result records addressed by ticket.
//!
//! A ticket moves through `pending` (issued, no payload yet), `ready`
//! (payload written, possibly partially read) and finally out of the store
//! once its payload has been consumed. The ticket counter lives under the same
//! lock as the records, so allocation can skip every ticket that is still
//! live and no caller ever observes a half-written record.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use tracing::{debug, error, trace};

use crate::error::DispatchError;
use crate::ticket::Ticket;

/// Tracing target for result store operations.
pub(crate) const STORE_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::store");

const MULTIPART_HINT: &str = "retrieve it with result:sync:multipart:<ticket>";

enum Record {
    Pending,
    Ready { payload: String, offset: usize },
}

struct StoreState {
    last_issued: u64,
    records: HashMap<Ticket, Record>,
}

impl StoreState {
    fn next_free(&self) -> Ticket {
        let mut candidate = Ticket::new(self.last_issued).map_or(Ticket::FIRST, Ticket::successor);
        while self.records.contains_key(&candidate) {
            candidate = candidate.successor();
        }
        candidate
    }
}

/// One slice of a multipart read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    data: String,
    has_more: bool,
}

impl Chunk {
    /// Text carried by this chunk.
    #[must_use]
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Returns `true` while further chunks remain.
    #[must_use]
    pub const fn has_more(&self) -> bool {
        self.has_more
    }

    /// Consumes the chunk, returning its text.
    #[must_use]
    pub fn into_data(self) -> String {
        self.data
    }
}

/// Thread-safe map from ticket to result record.
pub struct ResultStore {
    state: Mutex<StoreState>,
}

impl ResultStore {
    /// Creates an empty store whose first ticket follows `seed`.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            state: Mutex::new(StoreState {
                last_issued: seed,
                records: HashMap::new(),
            }),
        }
    }

    /// Issues a fresh ticket and marks it pending.
    ///
    /// Never returns a sentinel value or a ticket that still has a pending or
    /// unread record.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the store lock is poisoned.
    pub fn allocate_ticket(&self) -> Result<Ticket, DispatchError> {
        let mut state = self.lock()?;
        let ticket = state.next_free();
        state.last_issued = ticket.get();
        state.records.insert(ticket, Record::Pending);
        trace!(target: STORE_TARGET, %ticket, "ticket allocated");
        Ok(ticket)
    }

    /// Writes the payload for a pending ticket.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the ticket already holds a
    /// result or was never issued; the existing record is left untouched.
    pub fn store(&self, ticket: Ticket, payload: String) -> Result<(), DispatchError> {
        let mut state = self.lock()?;
        match state.records.get_mut(&ticket) {
            Some(record @ Record::Pending) => {
                debug!(target: STORE_TARGET, %ticket, bytes = payload.len(), "result stored");
                *record = Record::Ready { payload, offset: 0 };
                Ok(())
            }
            Some(Record::Ready { .. }) => {
                error!(target: STORE_TARGET, %ticket, "result written twice");
                Err(DispatchError::internal(format!(
                    "ticket {ticket} already holds a result"
                )))
            }
            None => {
                error!(target: STORE_TARGET, %ticket, "result written for unknown ticket");
                Err(DispatchError::internal(format!(
                    "ticket {ticket} was never issued"
                )))
            }
        }
    }

    /// Returns and removes the unread payload if it fits in `capacity` bytes.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ResultStillPending`] before the result is
    /// written, [`DispatchError::TicketNotFound`] for unknown or consumed
    /// tickets, and [`DispatchError::BufferTooSmall`] when the remainder does
    /// not fit; in that case the record stays available for a multipart read.
    pub fn read_single(&self, ticket: Ticket, capacity: usize) -> Result<String, DispatchError> {
        let mut state = self.lock()?;
        let (payload, offset) = match state.records.get(&ticket) {
            None => return Err(DispatchError::TicketNotFound { ticket }),
            Some(Record::Pending) => return Err(DispatchError::ResultStillPending { ticket }),
            Some(Record::Ready { payload, offset }) => (payload, *offset),
        };
        let remaining = payload.len().saturating_sub(offset);
        if remaining > capacity {
            return Err(DispatchError::BufferTooSmall {
                size: remaining,
                capacity,
                hint: MULTIPART_HINT,
            });
        }
        let Some(Record::Ready { payload, offset }) = state.records.remove(&ticket) else {
            return Err(DispatchError::internal(format!(
                "record for ticket {ticket} changed under lock"
            )));
        };
        debug!(target: STORE_TARGET, %ticket, "result consumed");
        tail(&payload, offset).map(str::to_owned)
    }

    /// Returns the next chunk of at most `chunk_capacity` bytes.
    ///
    /// Chunks end on character boundaries. A chunk always makes progress, so
    /// a capacity smaller than the next character still yields that whole
    /// character. The record is removed with the final chunk.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::ResultStillPending`] before the result is
    /// written and [`DispatchError::TicketNotFound`] for unknown or consumed
    /// tickets.
    pub fn read_multipart(
        &self,
        ticket: Ticket,
        chunk_capacity: usize,
    ) -> Result<Chunk, DispatchError> {
        let mut state = self.lock()?;
        let Some(record) = state.records.get_mut(&ticket) else {
            return Err(DispatchError::TicketNotFound { ticket });
        };
        let Record::Ready { payload, offset } = record else {
            return Err(DispatchError::ResultStillPending { ticket });
        };

        let end = chunk_end(payload, *offset, chunk_capacity);
        let data = payload
            .get(*offset..end)
            .ok_or_else(|| DispatchError::internal("chunk does not fall on character boundaries"))?
            .to_owned();
        *offset = end;
        let has_more = end < payload.len();
        if !has_more {
            state.records.remove(&ticket);
            debug!(target: STORE_TARGET, %ticket, "multipart result consumed");
        }
        Ok(Chunk { data, has_more })
    }

    /// Releases a pending ticket whose task never ran.
    ///
    /// Returns `true` when a pending record was removed. Ready records are
    /// left alone.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the store lock is poisoned.
    pub fn discard(&self, ticket: Ticket) -> Result<bool, DispatchError> {
        let mut state = self.lock()?;
        if matches!(state.records.get(&ticket), Some(Record::Pending)) {
            state.records.remove(&ticket);
            trace!(target: STORE_TARGET, %ticket, "pending ticket discarded");
            return Ok(true);
        }
        Ok(false)
    }

    /// Drops every record, returning how many there were.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the store lock is poisoned.
    pub fn clear(&self) -> Result<usize, DispatchError> {
        let mut state = self.lock()?;
        let count = state.records.len();
        state.records.clear();
        Ok(count)
    }

    /// Number of tickets still waiting for their result.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the store lock is poisoned.
    pub fn pending(&self) -> Result<usize, DispatchError> {
        Ok(self
            .lock()?
            .records
            .values()
            .filter(|record| matches!(record, Record::Pending))
            .count())
    }

    /// Number of results written but not yet fully read.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Internal`] if the store lock is poisoned.
    pub fn ready(&self) -> Result<usize, DispatchError> {
        Ok(self
            .lock()?
            .records
            .values()
            .filter(|record| matches!(record, Record::Ready { .. }))
            .count())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, DispatchError> {
        self.state
            .lock()
            .map_err(|_| DispatchError::internal("result store lock poisoned"))
    }
}

impl std::fmt::Debug for ResultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResultStore")
            .field("pending", &self.pending().unwrap_or_default())
            .field("ready", &self.ready().unwrap_or_default())
            .finish()
    }
}

fn tail(payload: &str, offset: usize) -> Result<&str, DispatchError> {
    payload
        .get(offset..)
        .ok_or_else(|| DispatchError::internal("read offset is not on a character boundary"))
}

fn chunk_end(payload: &str, offset: usize, chunk_capacity: usize) -> usize {
    let limit = offset.saturating_add(chunk_capacity).min(payload.len());
    let mut end = limit;
    while end > offset && !payload.is_char_boundary(end) {
        end -= 1;
    }
    if end > offset || offset >= payload.len() {
        return end;
    }
    // The next character is wider than the capacity; emit it whole.
    let mut end = offset + 1;
    while end < payload.len() && !payload.is_char_boundary(end) {
        end += 1;
    }
    end
}
