//! Crate-level test doubles and behaviour tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, OnceLock, Weak};
use std::thread;
use std::time::Duration;

use crate::dispatch::Dispatcher;
use crate::protocol::{Protocol, ProtocolContext, ProtocolFailure};
use crate::ticket::Ticket;


/// Returns its input unchanged.
pub(crate) struct EchoProtocol;

impl Protocol for EchoProtocol {
    fn execute(&self, input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
        Ok(input.to_owned())
    }
}

/// Prefixes every reply with the configuration string seen by `init`.
#[derive(Default)]
pub(crate) struct ConfiguredProtocol {
    prefix: String,
}

impl Protocol for ConfiguredProtocol {
    fn init(&mut self, _context: &ProtocolContext, config: &str) -> Result<(), ProtocolFailure> {
        self.prefix = config.to_owned();
        Ok(())
    }

    fn execute(&self, input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
        Ok(format!("{}{input}", self.prefix))
    }
}

/// Rejects its configuration during `init`.
pub(crate) struct FailingInitProtocol {
    pub(crate) message: &'static str,
}

impl Protocol for FailingInitProtocol {
    fn init(&mut self, _context: &ProtocolContext, _config: &str) -> Result<(), ProtocolFailure> {
        Err(ProtocolFailure::new(self.message))
    }

    fn execute(&self, _input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
        Err("never initialised".into())
    }
}

/// Signals `entered`, then blocks in `init` until `gate` opens.
pub(crate) struct SlowInitProtocol {
    pub(crate) entered: Gate,
    pub(crate) gate: Gate,
}

impl Protocol for SlowInitProtocol {
    fn init(&mut self, _context: &ProtocolContext, _config: &str) -> Result<(), ProtocolFailure> {
        self.entered.open();
        self.gate.wait();
        Ok(())
    }

    fn execute(&self, _input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
        Ok("ready".to_owned())
    }
}

/// Reports every input as a failure.
pub(crate) struct FailingProtocol;

impl Protocol for FailingProtocol {
    fn execute(&self, input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
        Err(ProtocolFailure::new(format!("cannot handle '{input}'")))
    }
}

/// Panics on every call.
pub(crate) struct PanickingProtocol;

impl Protocol for PanickingProtocol {
    fn execute(&self, _input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
        panic!("protocol exploded");
    }
}

/// Waits for its gate to open, then returns `"done"`.
pub(crate) struct GatedProtocol {
    pub(crate) gate: Gate,
    pub(crate) started: Arc<AtomicUsize>,
}

impl GatedProtocol {
    pub(crate) fn new(gate: Gate) -> Self {
        Self {
            gate,
            started: Arc::new(AtomicUsize::new(0)),
        }
    }
}

impl Protocol for GatedProtocol {
    fn execute(&self, _input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.gate.wait();
        Ok("done".to_owned())
    }
}

/// Records every input it executes, sleeping a little to shuffle completion
/// order across workers.
#[derive(Clone, Default)]
pub(crate) struct RecordingProtocol {
    pub(crate) seen: Arc<Mutex<Vec<String>>>,
}

impl RecordingProtocol {
    pub(crate) fn inputs(&self) -> Vec<String> {
        self.seen.lock().expect("recording mutex poisoned").clone()
    }
}

impl Protocol for RecordingProtocol {
    fn execute(&self, input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
        let jitter = input.bytes().map(u64::from).sum::<u64>() % 3;
        thread::sleep(Duration::from_millis(jitter));
        self.seen
            .lock()
            .expect("recording mutex poisoned")
            .push(input.to_owned());
        Ok(input.to_owned())
    }
}

/// Calls back into the dispatcher from inside `execute`.
pub(crate) struct ReentrantProtocol {
    pub(crate) dispatcher: Arc<OnceLock<Weak<Dispatcher>>>,
}

impl Protocol for ReentrantProtocol {
    fn execute(&self, input: &str, _ticket: Option<Ticket>) -> Result<String, ProtocolFailure> {
        let dispatcher = self
            .dispatcher
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| ProtocolFailure::new("dispatcher unavailable"))?;
        Ok(dispatcher.call(input, 256))
    }
}

/// One-shot latch shared between a test and a protocol double.
#[derive(Clone, Default)]
pub(crate) struct Gate {
    inner: Arc<(Mutex<bool>, Condvar)>,
}

impl Gate {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn open(&self) {
        let (lock, condvar) = &*self.inner;
        *lock.lock().expect("gate mutex poisoned") = true;
        condvar.notify_all();
    }

    pub(crate) fn wait(&self) {
        let (lock, condvar) = &*self.inner;
        let mut open = lock.lock().expect("gate mutex poisoned");
        while !*open {
            open = condvar.wait(open).expect("gate mutex poisoned");
        }
    }
}

/// Polls `condition` until it holds or two seconds pass.
pub(crate) fn wait_until(condition: impl Fn() -> bool) -> bool {
    let deadline = std::time::Instant::now() + Duration::from_secs(2);
    while std::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
