use crate::logging::LogFormat;
use crate::shutdown::ShutdownPolicy;

/// Default number of worker threads draining the task queue.
pub const DEFAULT_WORKER_THREADS: usize = 4;

/// Default reply buffer capacity, in bytes, offered by the host.
pub const DEFAULT_OUTPUT_CAPACITY: usize = 10_240;

/// Smallest reply buffer the dispatcher can work with.
///
/// Sixteen bytes leaves room for a ticket or a truncated error tag.
pub const MIN_OUTPUT_CAPACITY: usize = 16;

/// Default ticket seed; the first ticket issued is one above this value.
pub const DEFAULT_TICKET_SEED: u64 = 9816;

/// Default log filter expression used by the binaries.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the binaries.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the binaries.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}

/// Default behaviour for queued work when the dispatcher shuts down.
#[must_use]
pub const fn default_shutdown_policy() -> ShutdownPolicy {
    ShutdownPolicy::Drain
}
