//! Observed container state

use serde::{Deserialize, Serialize};
use std::fmt;

/// Logical state of a bot's container.
///
/// A removed container is indistinguishable from one that was never
/// created, so there is no separate terminal state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerState {
    /// No container with this name exists
    #[default]
    Absent,
    /// Container exists but is stopped
    Created,
    /// Container is running
    Running,
}

impl ContainerState {
    /// Fold the two independent runtime queries into one state
    pub fn observe(exists: bool, running: bool) -> Self {
        match (exists, running) {
            (_, true) => ContainerState::Running,
            (true, false) => ContainerState::Created,
            (false, false) => ContainerState::Absent,
        }
    }

    pub fn exists(&self) -> bool {
        !matches!(self, ContainerState::Absent)
    }

    pub fn is_running(&self) -> bool {
        matches!(self, ContainerState::Running)
    }
}

impl fmt::Display for ContainerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerState::Absent => f.write_str("absent"),
            ContainerState::Created => f.write_str("stopped"),
            ContainerState::Running => f.write_str("running"),
        }
    }
}
