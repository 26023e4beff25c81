//! Snapshot buffer: the ordered source of truth for "what happened when".
//!
//! RULES:
//!   - Indices are contiguous, 0..len-1.
//!   - Ticks never decrease as the index increases (gaps are allowed).
//!   - A stored snapshot is never mutated. Entries only leave the buffer
//!     through `reset` or ring eviction at the head.

use crate::{
    error::{ReplayError, ReplayResult},
    snapshot::Snapshot,
    types::{FrameIndex, Tick},
};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// How many snapshots the buffer keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capacity {
    /// Keep everything. Long live sessions grow without bound.
    #[default]
    Unbounded,
    /// Keep the most recent `capacity` snapshots.
    Ring(usize),
}

#[derive(Debug, Default)]
pub struct SnapshotBuffer {
    frames:   VecDeque<Snapshot>,
    capacity: Capacity,
}

impl SnapshotBuffer {
    pub fn new(capacity: Capacity) -> Self {
        Self {
            frames: VecDeque::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> Capacity {
        self.capacity
    }

    /// Replace the whole buffer. The sequence is validated first; on error
    /// the previous contents are kept.
    ///
    /// Returns how many leading snapshots were dropped to fit a ring capacity.
    pub fn reset(&mut self, snapshots: Vec<Snapshot>) -> ReplayResult<usize> {
        Self::validate(&snapshots)?;
        self.frames = snapshots.into();
        Ok(self.evict())
    }

    /// Check that a candidate sequence could replace the buffer.
    pub fn validate(snapshots: &[Snapshot]) -> ReplayResult<()> {
        match snapshots.windows(2).find(|w| w[1].tick < w[0].tick) {
            Some(pair) => Err(ReplayError::TickRegression {
                tail:   pair[0].tick,
                actual: pair[1].tick,
            }),
            None => Ok(()),
        }
    }

    /// Append one snapshot at the tail.
    ///
    /// Returns how many snapshots were evicted from the head.
    pub fn append(&mut self, snapshot: Snapshot) -> ReplayResult<usize> {
        if let Some(tail) = self.last_tick() {
            if snapshot.tick < tail {
                return Err(ReplayError::TickRegression {
                    tail,
                    actual: snapshot.tick,
                });
            }
        }
        self.frames.push_back(snapshot);
        Ok(self.evict())
    }

    pub fn at(&self, index: FrameIndex) -> ReplayResult<&Snapshot> {
        self.frames.get(index).ok_or(ReplayError::IndexOutOfRange {
            index,
            len: self.frames.len(),
        })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Index of the tail snapshot, if any.
    pub fn last_index(&self) -> Option<FrameIndex> {
        self.frames.len().checked_sub(1)
    }

    pub fn last_tick(&self) -> Option<Tick> {
        self.frames.back().map(|s| s.tick)
    }

    /// Clamp an index into `[0, len-1]`. `None` when the buffer is empty.
    pub fn clamp(&self, index: FrameIndex) -> Option<FrameIndex> {
        self.last_index().map(|last| index.min(last))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.frames.iter()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    fn evict(&mut self) -> usize {
        let Capacity::Ring(capacity) = self.capacity else {
            return 0;
        };
        let capacity = capacity.max(1);
        let excess = self.frames.len().saturating_sub(capacity);
        if excess > 0 {
            self.frames.drain(..excess);
            log::debug!("buffer: evicted {excess} snapshot(s), ring capacity {capacity}");
        }
        excess
    }
}
