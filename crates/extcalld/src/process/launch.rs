//! Launch sequencing and runtime orchestration.

use std::io::{BufRead, Write};
use std::process::ExitCode;
use std::sync::Arc;
use std::sync::mpsc::{self, Sender};
use std::thread;

use extcall_dispatch::{ProtocolCatalogue, ShutdownReport};
use tracing::{debug, info, warn};

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::host::{HostEvent, HostMessage, ResponseWriter, serve, spawn_input_reader};

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal};

/// Collaborators required to run the host.
pub struct LaunchPlan<L, S> {
    /// Configuration source.
    pub loader: L,
    /// Lifecycle observer.
    pub reporter: Arc<dyn HealthReporter>,
    /// Termination signal source.
    pub shutdown: S,
    /// Protocol kinds offered on top of the built-in ones.
    pub catalogue: ProtocolCatalogue,
}

/// Runs the host with the production collaborators and maps the outcome to a
/// process exit code.
///
/// Failures are written to `errors` as a single line.
pub fn run<R, W, E>(input: R, output: W, errors: &mut E) -> ExitCode
where
    R: BufRead + Send + 'static,
    W: Write,
    E: Write,
{
    let result = SystemShutdownSignal::install()
        .map_err(LaunchError::from)
        .and_then(|shutdown| {
            let plan = LaunchPlan {
                loader: SystemConfigLoader,
                reporter: Arc::new(StructuredHealthReporter::new()),
                shutdown,
                catalogue: ProtocolCatalogue::new(),
            };
            run_with(plan, input, output)
        });
    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(error) => {
            let _ = writeln!(errors, "extcalld: {error}");
            ExitCode::FAILURE
        }
    }
}

/// Bootstraps the host, answers commands from `input` on `output`, then shuts
/// the dispatcher down and reports its counters.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap fails, a helper thread cannot be
/// spawned, the host loop fails, or the dispatcher cannot be stopped. The
/// dispatcher is stopped even when the host loop fails.
pub fn run_with<L, S, R, W>(
    plan: LaunchPlan<L, S>,
    input: R,
    output: W,
) -> Result<ShutdownReport, LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal + 'static,
    R: BufRead + Send + 'static,
    W: Write,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        catalogue,
    } = plan;
    info!(target: PROCESS_TARGET, "starting host runtime");
    let host = bootstrap_with(&loader, reporter, catalogue)?;

    let (sender, events) = mpsc::channel();
    spawn_signal_listener(shutdown, sender.clone())?;
    spawn_input_reader(input, sender).map_err(|source| LaunchError::Spawn {
        role: "input",
        source,
    })?;

    let mut writer = ResponseWriter::new(output);
    let served = serve(&host, &events, &mut writer);
    let report = host
        .shutdown()
        .map_err(|source| LaunchError::Shutdown { source })?;
    let reason = served?;
    writer.write(&HostMessage::from(report))?;
    info!(
        target: PROCESS_TARGET,
        ?reason,
        completed = report.completed,
        cancelled = report.cancelled,
        "shutdown sequence completed"
    );
    Ok(report)
}

fn spawn_signal_listener<S>(mut shutdown: S, events: Sender<HostEvent>) -> Result<(), LaunchError>
where
    S: ShutdownSignal + 'static,
{
    thread::Builder::new()
        .name("extcalld-signals".to_owned())
        .spawn(move || match shutdown.wait() {
            Ok(()) => {
                if events.send(HostEvent::Signalled).is_err() {
                    debug!(target: PROCESS_TARGET, "host loop gone before signal");
                }
            }
            Err(error) => {
                warn!(target: PROCESS_TARGET, error = %error, "shutdown listener stopped");
            }
        })
        .map(drop)
        .map_err(|source| LaunchError::Spawn {
            role: "signal",
            source,
        })
}
