//! Per-thread marker for code running inside a protocol's `execute`.
//!
//! The dispatcher refuses calls made while the marker is set, so a protocol
//! cannot re-enter dispatch and wait on itself.

use std::cell::Cell;

thread_local! {
    static IN_PROTOCOL: Cell<bool> = const { Cell::new(false) };
}

/// Sets the marker for the current thread until dropped.
///
/// Restores the previous value on drop, including during unwinding.
#[derive(Debug)]
pub(crate) struct ExecutionGuard {
    previous: bool,
}

impl ExecutionGuard {
    pub(crate) fn enter() -> Self {
        let previous = IN_PROTOCOL.with(|flag| flag.replace(true));
        Self { previous }
    }
}

impl Drop for ExecutionGuard {
    fn drop(&mut self) {
        let previous = self.previous;
        IN_PROTOCOL.with(|flag| flag.set(previous));
    }
}

/// Returns `true` while the current thread is executing protocol code.
pub(crate) fn is_active() -> bool {
    IN_PROTOCOL.with(Cell::get)
}
