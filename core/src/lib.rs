//! Timeline synchronization engine for elevator simulation replays.
//!
//! Snapshots arrive in bulk (`history`) or one at a time (`state_update`);
//! the engine keeps them in a buffer, moves a playback cursor over them,
//! and turns each forward-visited snapshot's events into log entries once.

pub mod api;
pub mod buffer;
pub mod clock;
pub mod command;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod event_log;
pub mod frame;
pub mod ingest;
pub mod mode;
pub mod playback;
pub mod snapshot;
pub mod types;
