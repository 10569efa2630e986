//! Blocking protocol used to hold worker threads in place.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use extcall_dispatch::{Protocol, ProtocolFailure, Ticket};

/// One-shot latch shared between a test and its protocols.
#[derive(Debug, Clone, Default)]
pub struct Gate {
    state: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub fn open(&self) {
        let (open, changed) = &*self.state;
        *open.lock().expect("gate mutex poisoned") = true;
        changed.notify_all();
    }

    pub fn wait(&self) {
        let (open, changed) = &*self.state;
        let guard = open.lock().expect("gate mutex poisoned");
        drop(
            changed
                .wait_while(guard, |open| !*open)
                .expect("gate mutex poisoned"),
        );
    }
}

/// Protocol whose calls block until its gate opens.
#[derive(Debug, Clone, Default)]
pub struct GatedProtocol {
    pub gate: Gate,
    pub started: Arc<AtomicUsize>,
}

impl Protocol for GatedProtocol {
    fn execute(&self, input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.gate.wait();
        Ok(input.to_owned())
    }
}

/// Polls `condition` until it holds or five seconds pass.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
