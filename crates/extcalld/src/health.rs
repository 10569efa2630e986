//! Lifecycle events surfaced to operators.

use std::sync::Arc;

use extcall_config::Config;
use extcall_dispatch::ShutdownReport;

use crate::bootstrap::BootstrapError;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer notified at each stage of the host lifecycle.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked once the dispatcher is running.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when any bootstrap stage fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked after a protocol instance is published.
    fn protocol_registered(&self, kind: &str, name: &str);

    /// Invoked after the worker pool has stopped.
    fn shutdown_completed(&self, report: &ShutdownReport);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn protocol_registered(&self, kind: &str, name: &str) {
        (**self).protocol_registered(kind, name);
    }

    fn shutdown_completed(&self, report: &ShutdownReport) {
        (**self).shutdown_completed(report);
    }
}

/// Reporter that records lifecycle events with `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting host bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            worker_threads = config.worker_threads(),
            output_capacity = config.output_capacity(),
            shutdown_policy = %config.shutdown_policy(),
            log_format = %config.log_format(),
            "host bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "host bootstrap failed"
        );
    }

    fn protocol_registered(&self, kind: &str, name: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "protocol_registered",
            kind,
            name,
            "protocol registered"
        );
    }

    fn shutdown_completed(&self, report: &ShutdownReport) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "shutdown_completed",
            completed = report.completed,
            cancelled = report.cancelled,
            "host shut down"
        );
    }
}
