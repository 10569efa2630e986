//! Host bootstrap orchestration.

use std::sync::Arc;

use extcall_config::{Config, ConfigError};
use extcall_dispatch::{
    DispatchError, Dispatcher, DispatcherSettings, ProtocolCatalogue, ShutdownReport,
};
use ortho_config::{OrthoConfig, OrthoError};
use thiserror::Error;

use crate::health::HealthReporter;
use crate::protocols::{ECHO_KIND, with_builtin_kinds};
use crate::telemetry::{self, TelemetryError, TelemetryHandle};

/// Source of the host configuration.
pub trait ConfigLoader: Send + Sync {
    /// Loads the host configuration.
    ///
    /// # Errors
    ///
    /// Returns the loader's error when no configuration can be assembled.
    fn load(&self) -> Result<Config, Arc<OrthoError>>;
}

/// Loader that delegates to [`Config::load`].
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemConfigLoader;

impl ConfigLoader for SystemConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Config::load()
    }
}

/// Errors surfaced during bootstrap.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// Configuration failed to load.
    #[error("failed to load configuration: {source}")]
    Configuration {
        /// Underlying loader error.
        #[source]
        source: Arc<OrthoError>,
    },
    /// A loaded value is out of range.
    #[error("invalid configuration: {source}")]
    Validation {
        /// Rejected value.
        #[source]
        source: ConfigError,
    },
    /// Telemetry initialisation failed.
    #[error("failed to initialise telemetry: {source}")]
    Telemetry {
        /// Underlying telemetry error.
        #[source]
        source: TelemetryError,
    },
    /// The dispatcher or its default protocol could not start.
    #[error("failed to start dispatcher: {source}")]
    Dispatcher {
        /// Underlying dispatch error.
        #[source]
        source: DispatchError,
    },
}

/// A bootstrapped host: configuration plus a running dispatcher.
pub struct Host {
    config: Config,
    dispatcher: Dispatcher,
    telemetry: TelemetryHandle,
    reporter: Arc<dyn HealthReporter>,
}

impl Host {
    /// Accessor for the resolved configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Accessor for the running dispatcher.
    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Accessor for the telemetry handle, primarily useful for testing.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryHandle {
        self.telemetry
    }

    /// Dispatches one command with the configured reply capacity.
    #[must_use]
    pub fn call(&self, command: &str) -> String {
        self.dispatcher.call(command, self.config.output_capacity())
    }

    /// Stops the dispatcher according to the configured shutdown policy.
    ///
    /// # Errors
    ///
    /// Propagates [`Dispatcher::shutdown`] failures.
    pub fn shutdown(&self) -> Result<ShutdownReport, DispatchError> {
        let report = self.dispatcher.shutdown()?;
        self.reporter.shutdown_completed(&report);
        Ok(report)
    }
}

impl std::fmt::Debug for Host {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Host")
            .field("config", &self.config)
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}

/// Bootstraps the host using the supplied collaborators.
///
/// The built-in kinds join `catalogue`, and an `echo` instance is registered
/// under its kind name so the host can exercise the pipeline immediately.
///
/// # Errors
///
/// Returns [`BootstrapError`] for the first failing stage. The reporter is
/// told about every failure before it is returned.
pub fn bootstrap_with(
    loader: &dyn ConfigLoader,
    reporter: Arc<dyn HealthReporter>,
    catalogue: ProtocolCatalogue,
) -> Result<Host, BootstrapError> {
    reporter.bootstrap_starting();

    let fail = |error: BootstrapError| {
        reporter.bootstrap_failed(&error);
        error
    };

    let config = loader
        .load()
        .map_err(|source| fail(BootstrapError::Configuration { source }))?;
    config
        .validate()
        .map_err(|source| fail(BootstrapError::Validation { source }))?;
    let telemetry = telemetry::initialise(&config)
        .map_err(|source| fail(BootstrapError::Telemetry { source }))?;

    let dispatcher = Dispatcher::start(
        DispatcherSettings::from(&config),
        with_builtin_kinds(catalogue),
    )
    .map_err(|source| fail(BootstrapError::Dispatcher { source }))?;
    dispatcher
        .add_protocol(ECHO_KIND, ECHO_KIND, None, "", config.output_capacity())
        .map_err(|source| fail(BootstrapError::Dispatcher { source }))?;
    reporter.protocol_registered(ECHO_KIND, ECHO_KIND);

    reporter.bootstrap_succeeded(&config);
    Ok(Host {
        config,
        dispatcher,
        telemetry,
        reporter,
    })
}
