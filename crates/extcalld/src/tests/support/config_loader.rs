//! Configuration loaders covering the success and failure paths.

use std::ffi::OsString;
use std::sync::Arc;

use extcall_config::{Config, ShutdownPolicy};
use ortho_config::{OrthoConfig, OrthoError};

use crate::bootstrap::ConfigLoader;

/// Loader returning a fixed, quiet configuration.
#[derive(Debug, Clone)]
pub struct TestConfigLoader {
    config: Config,
}

impl TestConfigLoader {
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: Config {
                worker_threads: 2,
                log_filter: "off".to_owned(),
                ..Config::default()
            },
        }
    }

    #[must_use]
    pub fn with_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.config.shutdown_policy = policy;
        self
    }

    #[must_use]
    pub fn with_output_capacity(mut self, capacity: usize) -> Self {
        self.config.output_capacity = capacity;
        self
    }

    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.config.worker_threads = workers;
        self
    }
}

impl ConfigLoader for TestConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(self.config.clone())
    }
}

/// Loader that fails by passing an unparsable CLI argument.
#[derive(Debug, Clone, Copy)]
pub struct FailingConfigLoader;

impl ConfigLoader for FailingConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        let args = vec![
            OsString::from("extcalld"),
            OsString::from("--worker-threads"),
            OsString::from("many"),
        ];
        Config::load_from_iter(args)
    }
}

/// Loader producing a configuration that fails validation.
#[derive(Debug, Clone, Copy)]
pub struct InvalidConfigLoader;

impl ConfigLoader for InvalidConfigLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        Ok(Config {
            worker_threads: 0,
            log_filter: "off".to_owned(),
            ..Config::default()
        })
    }
}

/// Any of the loaders above, chosen per scenario.
#[derive(Debug, Clone)]
pub enum ScenarioLoader {
    Healthy(TestConfigLoader),
    Failing,
    Invalid,
}

impl ConfigLoader for ScenarioLoader {
    fn load(&self) -> Result<Config, Arc<OrthoError>> {
        match self {
            Self::Healthy(loader) => loader.load(),
            Self::Failing => FailingConfigLoader.load(),
            Self::Invalid => InvalidConfigLoader.load(),
        }
    }
}
