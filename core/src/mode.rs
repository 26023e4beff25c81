//! Operating mode: which controls a viewer session exposes.
//!
//! One engine serves all three front-ends; the mode only gates the
//! collaborator-facing features (recording selection, algorithm runs).
//! Timeline semantics are identical across modes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatingMode {
    /// Browse and replay finished recordings.
    ReplayOnly,
    /// Replay plus launching algorithm runs that produce new recordings.
    AlgorithmRunner,
    /// Follow a live simulation pushed as `init` + `state_update`.
    #[default]
    LiveFollow,
}

impl OperatingMode {
    /// Map the server's `client_type` answer. Anything unrecognized falls
    /// back to the live viewer, as does a failed lookup.
    pub fn from_client_type(client_type: Option<&str>) -> Self {
        match client_type {
            Some("algorithm") => Self::AlgorithmRunner,
            Some("replay")    => Self::ReplayOnly,
            _                 => Self::LiveFollow,
        }
    }

    pub fn can_select_recordings(self) -> bool {
        matches!(self, Self::ReplayOnly | Self::AlgorithmRunner)
    }

    pub fn can_run_algorithms(self) -> bool {
        self == Self::AlgorithmRunner
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::ReplayOnly      => "replay_only",
            Self::AlgorithmRunner => "algorithm_runner",
            Self::LiveFollow      => "live_follow",
        }
    }
}
