//! Host harness for the `extcall` dispatcher.
//!
//! `extcalld` plays the part of a host that can only make blocking calls into
//! a fixed-size reply buffer. It reads one command per line from standard
//! input, hands each to an [`extcall_dispatch::Dispatcher`], and writes one
//! JSON line per reply to standard output:
//!
//! ```text
//! > echo:async:hello
//! < {"kind":"reply","data":"9817"}
//! > result:sync:9817
//! < {"kind":"reply","data":"hello"}
//! ```
//!
//! Bootstrap loads configuration through [`ConfigLoader`], validates it,
//! installs telemetry and starts the dispatcher with the built-in `echo`
//! kind. End of input or a termination signal stops the loop; the worker
//! pool is then shut down according to the configured policy and a final
//! `{"kind":"shutdown",...}` line reports its counters. Every lifecycle stage
//! is reported to a [`HealthReporter`].

mod bootstrap;
mod health;
mod host;
mod process;
mod protocols;
pub mod telemetry;

pub use bootstrap::{BootstrapError, ConfigLoader, Host, SystemConfigLoader, bootstrap_with};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use host::{
    HostError, HostEvent, HostMessage, ResponseWriter, StopReason, serve, spawn_input_reader,
};
pub use process::{
    LaunchError, LaunchPlan, ShutdownError, ShutdownSignal, SystemShutdownSignal, run, run_with,
};
pub use protocols::{ECHO_KIND, EchoProtocol, with_builtin_kinds};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
