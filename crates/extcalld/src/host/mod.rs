//! Line-oriented host loop.
//!
//! Each input line is one command. Every command produces exactly one JSON
//! line on the output:
//!
//! ```text
//! > echo:sync:hello
//! < {"kind":"reply","data":"hello"}
//! ```
//!
//! When input ends or a termination signal arrives the loop stops and the
//! caller reports the pool's shutdown counters as a final `shutdown` line.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use extcall_dispatch::ShutdownReport;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::bootstrap::Host;

pub(crate) const HOST_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::host");

/// One line written to the host output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HostMessage {
    /// The rendered reply to one command.
    Reply {
        /// Reply text, bounded by the configured output capacity.
        data: String,
    },
    /// Final counters of the worker pool.
    Shutdown {
        /// Tasks that ran to completion.
        completed: u64,
        /// Queued tasks dropped at shutdown.
        cancelled: u64,
    },
}

impl From<ShutdownReport> for HostMessage {
    fn from(report: ShutdownReport) -> Self {
        Self::Shutdown {
            completed: report.completed,
            cancelled: report.cancelled,
        }
    }
}

/// Inputs to the host loop.
#[derive(Debug)]
pub enum HostEvent {
    /// A command line, without its terminator.
    Command(String),
    /// The input stream reached end of file.
    InputClosed,
    /// Reading the input stream failed.
    InputFailed(io::Error),
    /// A termination signal arrived.
    Signalled,
}

/// Why the host loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Input ended.
    InputClosed,
    /// A termination signal arrived.
    Signalled,
}

/// Errors raised by the host loop.
#[derive(Debug, Error)]
pub enum HostError {
    /// Reading commands failed.
    #[error("failed to read host input: {source}")]
    Input {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Writing a reply failed.
    #[error("failed to write host output: {source}")]
    Output {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
    /// Encoding a reply failed.
    #[error("failed to encode host message: {source}")]
    Encode {
        /// Underlying serialisation error.
        #[source]
        source: serde_json::Error,
    },
}

/// Writes [`HostMessage`] values as JSON lines.
#[derive(Debug)]
pub struct ResponseWriter<W> {
    writer: W,
}

impl<W: Write> ResponseWriter<W> {
    /// Wraps an output stream.
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    /// Writes one message followed by a newline and flushes.
    ///
    /// # Errors
    ///
    /// Returns [`HostError`] when encoding or writing fails.
    pub fn write(&mut self, message: &HostMessage) -> Result<(), HostError> {
        serde_json::to_writer(&mut self.writer, message)
            .map_err(|source| HostError::Encode { source })?;
        self.writer
            .write_all(b"\n")
            .and_then(|()| self.writer.flush())
            .map_err(|source| HostError::Output { source })
    }

    /// Returns the wrapped stream.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Reads `input` line by line on a dedicated thread, forwarding each line.
///
/// The thread ends after reporting end of file or a read failure, or once the
/// receiving side hangs up.
///
/// # Errors
///
/// Returns the spawn failure when the thread cannot be created.
pub fn spawn_input_reader<R>(input: R, events: Sender<HostEvent>) -> io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("extcalld-input".to_owned())
        .spawn(move || {
            for line in input.lines() {
                let event = match line {
                    Ok(line) => HostEvent::Command(line),
                    Err(error) => HostEvent::InputFailed(error),
                };
                let failed = matches!(event, HostEvent::InputFailed(_));
                if events.send(event).is_err() || failed {
                    return;
                }
            }
            if events.send(HostEvent::InputClosed).is_err() {
                debug!(target: HOST_TARGET, "host loop gone before end of input");
            }
        })
}

/// Answers commands until input ends or a signal arrives.
///
/// Blank lines are skipped. A disconnected event channel counts as end of
/// input.
///
/// # Errors
///
/// Returns [`HostError`] when input cannot be read or a reply cannot be
/// written.
pub fn serve<W: Write>(
    host: &Host,
    events: &Receiver<HostEvent>,
    writer: &mut ResponseWriter<W>,
) -> Result<StopReason, HostError> {
    let mut answered = 0_u64;
    let reason = loop {
        let Ok(event) = events.recv() else {
            break StopReason::InputClosed;
        };
        match event {
            HostEvent::Command(line) => {
                let command = line.trim_end_matches('\r');
                if command.trim().is_empty() {
                    continue;
                }
                let data = host.call(command);
                debug!(target: HOST_TARGET, command, reply = %data, "command answered");
                writer.write(&HostMessage::Reply { data })?;
                answered += 1;
            }
            HostEvent::InputClosed => break StopReason::InputClosed,
            HostEvent::Signalled => break StopReason::Signalled,
            HostEvent::InputFailed(source) => {
                warn!(target: HOST_TARGET, error = %source, "host input failed");
                return Err(HostError::Input { source });
            }
        }
    };
    info!(target: HOST_TARGET, ?reason, answered, "host loop stopped");
    Ok(reason)
}
