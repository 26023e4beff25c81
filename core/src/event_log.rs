//! The user-facing event log and the reconciler that fills it.
//!
//! RULES:
//!   - The log is append-only. Entries are only ever removed all at once
//!     by `clear()` (playback reset or a new buffer).
//!   - A snapshot's events are reconciled at most once: only when its index
//!     is strictly greater than the last reconciled index.
//!   - Filtering is a pure visibility predicate over stored entries; it
//!     never drops or regenerates anything.

use crate::{
    event::Category,
    snapshot::Snapshot,
    types::{FrameIndex, Tick},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Descriptions kept in a collapsed summary line.
pub const SUMMARY_HEAD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "tick", rename_all = "snake_case")]
pub enum LogLabel {
    System,
    Error,
    Tick(Tick),
}

impl fmt::Display for LogLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::System     => f.write_str("系统"),
            Self::Error      => f.write_str("错误"),
            Self::Tick(tick) => write!(f, "Tick {tick}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    /// Position in the log, monotonically increasing across clears.
    pub seq:         u64,
    /// Entries written together share a batch: one per reconciled
    /// snapshot, one per system notice.
    pub batch:       u64,
    pub label:       LogLabel,
    pub description: String,
    pub category:    Category,
    pub logged_at:   DateTime<Utc>,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.label, self.description)
    }
}

/// Which categories the view shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventFilter {
    #[default]
    All,
    Only(Category),
}

impl std::str::FromStr for EventFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            Ok(Self::All)
        } else {
            s.parse::<Category>().map(Self::Only)
        }
    }
}

/// Display policy: is `entry` shown under `filter`?
pub fn visible(entry: &LogEntry, filter: EventFilter) -> bool {
    match filter {
        EventFilter::All      => true,
        EventFilter::Only(c)  => entry.category == c,
    }
}

#[derive(Debug, Default)]
pub struct EventLog {
    entries:    Vec<LogEntry>,
    next_seq:   u64,
    next_batch: u64,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Entries passing `filter`, oldest first.
    pub fn filtered(&self, filter: EventFilter) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter().filter(move |e| visible(e, filter))
    }

    /// What the log panel shows: newest first, at most `limit` visible entries.
    pub fn display(&self, filter: EventFilter, limit: usize) -> Vec<&LogEntry> {
        self.entries
            .iter()
            .rev()
            .filter(|e| visible(e, filter))
            .take(limit)
            .collect()
    }

    /// Write a one-line notice in its own batch.
    pub fn notice(&mut self, label: LogLabel, description: impl Into<String>) -> &LogEntry {
        let batch = self.open_batch();
        self.push(batch, label, description.into(), Category::System)
    }

    fn open_batch(&mut self) -> u64 {
        let batch = self.next_batch;
        self.next_batch += 1;
        batch
    }

    fn push(&mut self, batch: u64, label: LogLabel, description: String, category: Category) -> &LogEntry {
        let entry = LogEntry {
            seq: self.next_seq,
            batch,
            label,
            description,
            category,
            logged_at: Utc::now(),
        };
        self.next_seq += 1;
        log::debug!("event log: {entry}");
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }
}

/// Turns snapshot events into log entries, once per forward-visited index.
#[derive(Debug)]
pub struct EventLogReconciler {
    log:                EventLog,
    last_rendered:      Option<FrameIndex>,
    collapse_threshold: usize,
}

impl EventLogReconciler {
    pub fn new(collapse_threshold: usize) -> Self {
        Self {
            log: EventLog::new(),
            last_rendered: None,
            collapse_threshold,
        }
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut EventLog {
        &mut self.log
    }

    /// Highest index already committed to the log. `None` is below index 0.
    pub fn last_rendered(&self) -> Option<FrameIndex> {
        self.last_rendered
    }

    /// Would `index` be reconciled if visited now?
    pub fn is_pending(&self, index: FrameIndex) -> bool {
        self.last_rendered.map_or(true, |last| index > last)
    }

    /// Commit the events of `snapshot` (stored at `index`) to the log.
    /// A no-op for indices at or below the last reconciled one.
    ///
    /// Returns the number of entries written.
    pub fn reconcile(&mut self, index: FrameIndex, snapshot: &Snapshot) -> usize {
        if !self.is_pending(index) {
            return 0;
        }
        self.last_rendered = Some(index);

        let lines: Vec<(String, Category)> = snapshot
            .events
            .iter()
            .filter_map(|event| event.describe().map(|d| (d, event.category())))
            .collect();
        if lines.is_empty() {
            return 0;
        }

        let label = LogLabel::Tick(snapshot.tick);
        let batch = self.log.open_batch();
        if lines.len() > self.collapse_threshold {
            let head: Vec<&str> = lines
                .iter()
                .take(SUMMARY_HEAD)
                .map(|(d, _)| d.as_str())
                .collect();
            let summary = format!("{}个事件: {}...", lines.len(), head.join("; "));
            let category = shared_category(&lines);
            self.log.push(batch, label, summary, category);
            1
        } else {
            let written = lines.len();
            for (description, category) in lines {
                self.log.push(batch, label, description, category);
            }
            written
        }
    }

    /// Forget every reconciled index and empty the log.
    pub fn clear(&mut self) {
        self.log.clear();
        self.last_rendered = None;
    }

    /// The buffer dropped `evicted` snapshots from its head.
    pub fn shift(&mut self, evicted: usize) {
        if evicted == 0 {
            return;
        }
        self.last_rendered = self
            .last_rendered
            .and_then(|last| last.checked_sub(evicted));
    }
}

/// A collapsed line keeps its category only when every event agrees.
fn shared_category(lines: &[(String, Category)]) -> Category {
    let first = lines[0].1;
    if lines.iter().all(|(_, c)| *c == first) {
        first
    } else {
        Category::System
    }
}
