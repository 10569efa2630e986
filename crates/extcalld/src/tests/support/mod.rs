//! Test doubles and the scenario world for the host harness suites.

mod config_loader;
mod gate;
mod input;
mod reporter;
mod signal;
mod world;

pub use config_loader::{
    FailingConfigLoader, InvalidConfigLoader, ScenarioLoader, TestConfigLoader,
};
pub use gate::{GatedProtocol, wait_until};
pub use reporter::{HealthEvent, RecordingHealthReporter};
pub use world::{HostWorld, world};
