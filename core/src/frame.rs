//! Read-only frame view handed to the rendering layer.

use crate::{
    playback::PlaybackState,
    snapshot::{PassengerStatus, Snapshot},
    types::{FrameIndex, Tick},
};
use serde::Serialize;

/// Everything a renderer needs to draw the frame under the cursor.
#[derive(Debug, Clone, Serialize)]
pub struct FrameView<'a> {
    pub snapshot:   &'a Snapshot,
    pub index:      FrameIndex,
    pub len:        usize,
    pub tick:       Tick,
    pub state:      PlaybackState,
    pub speed:      f64,
    pub stats:      PassengerStats,
    /// Bumped on every render; a renderer redraws when it changes.
    pub generation: u64,
}

impl FrameView<'_> {
    /// Progress bar maximum (`len - 1`).
    pub fn progress_max(&self) -> FrameIndex {
        self.len.saturating_sub(1)
    }

    pub fn at_tail(&self) -> bool {
        self.index + 1 == self.len
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct PassengerStats {
    pub total:        usize,
    pub delivered:    usize,
    pub in_transit:   usize,
    pub waiting:      usize,
    pub average_wait: f64,
}

impl PassengerStats {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut stats = Self {
            total: snapshot.passengers.len(),
            average_wait: snapshot.metrics.average_wait_time.unwrap_or(0.0),
            ..Self::default()
        };
        for passenger in snapshot.passengers.values() {
            match passenger.status {
                PassengerStatus::Completed  => stats.delivered += 1,
                PassengerStatus::InElevator => stats.in_transit += 1,
                PassengerStatus::Waiting    => stats.waiting += 1,
                PassengerStatus::Unknown    => {}
            }
        }
        stats
    }
}
