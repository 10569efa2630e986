//! Errors surfaced while launching or running the host.

use std::io;

use extcall_dispatch::DispatchError;
use thiserror::Error;

use crate::bootstrap::BootstrapError;
use crate::host::HostError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching or running the host.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Signal handlers could not be installed.
    #[error(transparent)]
    Signal(#[from] ShutdownError),
    /// A helper thread could not be spawned.
    #[error("failed to spawn {role} thread: {source}")]
    Spawn {
        /// Role of the thread that failed to start.
        role: &'static str,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// The host loop failed.
    #[error(transparent)]
    Host(#[from] HostError),
    /// Stopping the dispatcher failed.
    #[error("failed to shut down dispatcher: {source}")]
    Shutdown {
        /// Underlying dispatch error.
        #[source]
        source: DispatchError,
    },
}
