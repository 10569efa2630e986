//! Binary entry point for the host harness.
//!
//! Delegates to [`extcalld::run`] with the process's standard streams.

use std::io::{self, BufReader};
use std::process::ExitCode;

fn main() -> ExitCode {
    extcalld::run(
        BufReader::new(io::stdin()),
        io::stdout().lock(),
        &mut io::stderr().lock(),
    )
}
