//! Test suites for the host harness.

pub(crate) mod support;
