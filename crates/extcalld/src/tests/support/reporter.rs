//! Health reporter double that records lifecycle events for assertions.

use std::sync::Mutex;

use extcall_config::Config;
use extcall_dispatch::ShutdownReport;

use crate::bootstrap::BootstrapError;
use crate::health::HealthReporter;

/// Lifecycle events observed during a scenario.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthEvent {
    BootstrapStarting,
    BootstrapSucceeded,
    BootstrapFailed(String),
    ProtocolRegistered { kind: String, name: String },
    ShutdownCompleted(ShutdownReport),
}

#[derive(Debug, Default)]
pub struct RecordingHealthReporter {
    events: Mutex<Vec<HealthEvent>>,
}

impl RecordingHealthReporter {
    #[must_use]
    pub fn events(&self) -> Vec<HealthEvent> {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .clone()
    }

    fn record(&self, event: HealthEvent) {
        self.events
            .lock()
            .expect("health reporter mutex poisoned")
            .push(event);
    }
}

impl HealthReporter for RecordingHealthReporter {
    fn bootstrap_starting(&self) {
        self.record(HealthEvent::BootstrapStarting);
    }

    fn bootstrap_succeeded(&self, _config: &Config) {
        self.record(HealthEvent::BootstrapSucceeded);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        self.record(HealthEvent::BootstrapFailed(error.to_string()));
    }

    fn protocol_registered(&self, kind: &str, name: &str) {
        self.record(HealthEvent::ProtocolRegistered {
            kind: kind.to_owned(),
            name: name.to_owned(),
        });
    }

    fn shutdown_completed(&self, report: &ShutdownReport) {
        self.record(HealthEvent::ShutdownCompleted(*report));
    }
}
