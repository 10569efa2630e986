//! Shutdown signal double triggered from the test thread.

use std::sync::mpsc::{self, Receiver, Sender};

use crate::process::{ShutdownError, ShutdownSignal};

/// Signal source that fires when its [`SignalTrigger`] is pulled.
#[derive(Debug)]
pub struct ManualShutdownSignal {
    fired: Receiver<()>,
}

/// Test-side handle of a [`ManualShutdownSignal`].
///
/// Dropping it without firing closes the listener.
#[derive(Debug, Clone)]
pub struct SignalTrigger {
    fire: Sender<()>,
}

impl ManualShutdownSignal {
    #[must_use]
    pub fn new() -> (Self, SignalTrigger) {
        let (fire, fired) = mpsc::channel();
        (Self { fired }, SignalTrigger { fire })
    }
}

impl SignalTrigger {
    pub fn fire(&self) {
        self.fire.send(()).expect("signal listener is waiting");
    }
}

impl ShutdownSignal for ManualShutdownSignal {
    fn wait(&mut self) -> Result<(), ShutdownError> {
        self.fired.recv().map_err(|_| ShutdownError::Closed)
    }
}
