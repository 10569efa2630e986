//! In-memory stand-ins for the host's standard streams.

use std::io::{self, Read, Write};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

/// Input stream fed line by line from the test thread.
///
/// Reads block until a line is sent; dropping every feeder ends the stream.
#[derive(Debug)]
pub struct ScriptedInput {
    lines: Receiver<Vec<u8>>,
    pending: Vec<u8>,
}

impl ScriptedInput {
    #[must_use]
    pub fn new() -> (Self, Sender<Vec<u8>>) {
        let (feeder, lines) = mpsc::channel();
        (
            Self {
                lines,
                pending: Vec::new(),
            },
            feeder,
        )
    }
}

impl Read for ScriptedInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.pending.is_empty() {
            match self.lines.recv() {
                Ok(line) => self.pending = line,
                Err(_) => return Ok(0),
            }
        }
        let count = buf.len().min(self.pending.len());
        buf[..count].copy_from_slice(&self.pending[..count]);
        self.pending = self.pending.split_off(count);
        Ok(count)
    }
}

/// Output sink shared between the host and the test.
#[derive(Debug, Clone, Default)]
pub struct SharedOutput {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedOutput {
    /// Returns the output written so far, one entry per line.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        let bytes = self.bytes.lock().expect("output mutex poisoned");
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(str::to_owned)
            .collect()
    }
}

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes
            .lock()
            .expect("output mutex poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
