//! Policy applied to queued work when the dispatcher stops.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// What happens to tasks that are still queued when shutdown begins.
///
/// Tasks already running always finish; the policy only decides the fate of
/// work that no worker has picked up yet.
#[derive(
    Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq, EnumString, Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum ShutdownPolicy {
    /// Run every queued task before the workers exit.
    #[default]
    Drain,
    /// Drop queued tasks, recording a cancellation for each ticket.
    Cancel,
}
