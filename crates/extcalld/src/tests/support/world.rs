//! Scenario world: runs the host on a background thread against scripted
//! input, a manual signal source and a captured output stream.

use std::cell::RefCell;
use std::io::BufReader;
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::thread::{self, JoinHandle};

use extcall_dispatch::{ProtocolCatalogue, ShutdownReport};
use serde_json::Value;

use crate::health::HealthReporter;
use crate::process::{LaunchError, LaunchPlan, run_with};

use super::config_loader::{ScenarioLoader, TestConfigLoader};
use super::gate::wait_until;
use super::input::{ScriptedInput, SharedOutput};
use super::reporter::RecordingHealthReporter;
use super::signal::{ManualShutdownSignal, SignalTrigger};

type Outcome = Result<ShutdownReport, LaunchError>;

/// Scenario world shared across BDD steps.
pub struct HostWorld {
    loader: ScenarioLoader,
    pub reporter: Arc<RecordingHealthReporter>,
    output: SharedOutput,
    feeder: Option<Sender<Vec<u8>>>,
    trigger: Option<SignalTrigger>,
    runner: Option<JoinHandle<Outcome>>,
    outcome: Option<Outcome>,
    sent: usize,
}

impl HostWorld {
    #[must_use]
    pub fn new() -> Self {
        Self {
            loader: ScenarioLoader::Healthy(TestConfigLoader::new()),
            reporter: Arc::new(RecordingHealthReporter::default()),
            output: SharedOutput::default(),
            feeder: None,
            trigger: None,
            runner: None,
            outcome: None,
            sent: 0,
        }
    }

    pub fn use_loader(&mut self, loader: ScenarioLoader) {
        self.loader = loader;
    }

    /// Launches the host on a background thread.
    pub fn start(&mut self) {
        let (input, feeder) = ScriptedInput::new();
        let (shutdown, trigger) = ManualShutdownSignal::new();
        let reporter: Arc<dyn HealthReporter> = self.reporter.clone();
        let plan = LaunchPlan {
            loader: self.loader.clone(),
            reporter,
            shutdown,
            catalogue: ProtocolCatalogue::new(),
        };
        let output = self.output.clone();
        self.runner = Some(thread::spawn(move || {
            run_with(plan, BufReader::new(input), output)
        }));
        self.feeder = Some(feeder);
        self.trigger = Some(trigger);
    }

    /// Sends one command line and waits for its reply.
    pub fn send(&mut self, command: &str) {
        let feeder = self.feeder.as_ref().expect("host started");
        feeder
            .send(format!("{command}\n").into_bytes())
            .expect("host input open");
        self.sent += 1;
        let expected = self.sent;
        let output = self.output.clone();
        assert!(
            wait_until(|| output.lines().len() >= expected),
            "no reply to {command}"
        );
    }

    /// Returns the `data` of the most recent reply line.
    #[must_use]
    pub fn last_reply(&self) -> String {
        let line = self.output.lines().pop().expect("a reply was written");
        let message: Value = serde_json::from_str(&line).expect("reply is JSON");
        assert_eq!(message["kind"], "reply", "unexpected line: {line}");
        message["data"].as_str().expect("reply data").to_owned()
    }

    /// Ends the input stream and waits for the host to stop.
    pub fn close_input(&mut self) {
        self.feeder = None;
        self.join();
    }

    /// Delivers a termination signal and waits for the host to stop.
    pub fn signal(&mut self) {
        self.trigger.as_ref().expect("host started").fire();
        self.join();
    }

    /// Waits for the host thread to return.
    pub fn join(&mut self) {
        if let Some(runner) = self.runner.take() {
            self.outcome = Some(runner.join().expect("host thread panicked"));
        }
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    #[must_use]
    pub fn output_lines(&self) -> Vec<String> {
        self.output.lines()
    }
}

impl Drop for HostWorld {
    fn drop(&mut self) {
        self.feeder = None;
        if let Some(runner) = self.runner.take() {
            drop(runner.join());
        }
    }
}

#[must_use]
pub fn world() -> RefCell<HostWorld> {
    RefCell::new(HostWorld::new())
}
