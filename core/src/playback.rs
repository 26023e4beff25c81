//! Playback state machine: owns play/pause/speed and the playback timer.
//!
//! The cursor itself lives in the engine because the ingest path moves it
//! too (live-follow); this type only knows whether time is flowing and how
//! fast.

use crate::clock::{TimerHandle, TimerScheduler};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_MIN_SPEED: f64 = 0.1;
pub const DEFAULT_MAX_SPEED: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackState {
    /// Initial state: cursor at 0, no timer.
    Stopped,
    /// No timer, cursor fixed.
    Paused,
    /// Timer active, cursor advancing.
    Playing,
}

impl PlaybackState {
    pub fn label(self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Paused  => "paused",
            Self::Playing => "playing",
        }
    }
}

#[derive(Debug)]
pub struct PlaybackController {
    state:     PlaybackState,
    speed:     f64,
    base_tick: Duration,
    min_speed: f64,
    max_speed: f64,
    timer:     Option<TimerHandle>,
}

impl PlaybackController {
    pub fn new(base_tick: Duration, speed: f64, min_speed: f64, max_speed: f64) -> Self {
        let min_speed = if min_speed.is_finite() && min_speed > 0.0 {
            min_speed
        } else {
            DEFAULT_MIN_SPEED
        };
        let max_speed = if max_speed.is_finite() && max_speed >= min_speed {
            max_speed
        } else {
            DEFAULT_MAX_SPEED.max(min_speed)
        };
        let mut controller = Self {
            state: PlaybackState::Stopped,
            speed: 1.0,
            base_tick,
            min_speed,
            max_speed,
            timer: None,
        };
        controller.speed = controller
            .sanitize_speed(speed)
            .unwrap_or_else(|| 1.0_f64.clamp(min_speed, max_speed));
        controller
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Derived tick interval: `base_tick / speed`.
    pub fn interval(&self) -> Duration {
        self.base_tick.div_f64(self.speed)
    }

    pub fn timer(&self) -> Option<TimerHandle> {
        self.timer
    }

    /// True when `handle` is the live playback timer. Anything else is a
    /// stale firing and must be dropped.
    pub fn owns(&self, handle: TimerHandle) -> bool {
        self.timer == Some(handle)
    }

    /// Enter `Playing` and start the timer. Returns false when already playing.
    pub fn start(&mut self, scheduler: &mut dyn TimerScheduler) -> bool {
        if self.is_playing() {
            return false;
        }
        self.cancel_timer(scheduler);
        self.timer = Some(scheduler.start_repeating(self.interval()));
        self.state = PlaybackState::Playing;
        log::debug!("playback: playing at {:.2}x ({:?}/tick)", self.speed, self.interval());
        true
    }

    /// `Playing` → `Paused`. A stopped or paused controller stays as it is.
    pub fn pause(&mut self, scheduler: &mut dyn TimerScheduler) {
        self.cancel_timer(scheduler);
        if self.is_playing() {
            self.state = PlaybackState::Paused;
            log::debug!("playback: paused");
        }
    }

    /// Back to the initial state.
    pub fn stop(&mut self, scheduler: &mut dyn TimerScheduler) {
        self.cancel_timer(scheduler);
        self.state = PlaybackState::Stopped;
    }

    /// Change the speed multiplier. While playing, the old timer is cancelled
    /// before the new one is started so exactly one timer stays live.
    ///
    /// Non-finite or non-positive input is ignored. Returns the speed in effect.
    pub fn set_speed(&mut self, speed: f64, scheduler: &mut dyn TimerScheduler) -> f64 {
        let Some(speed) = self.sanitize_speed(speed) else {
            log::warn!("playback: ignoring invalid speed {speed}");
            return self.speed;
        };
        self.speed = speed;
        if self.is_playing() {
            self.cancel_timer(scheduler);
            self.timer = Some(scheduler.start_repeating(self.interval()));
            log::debug!("playback: timer restarted at {:.2}x", self.speed);
        }
        self.speed
    }

    fn sanitize_speed(&self, speed: f64) -> Option<f64> {
        if !speed.is_finite() || speed <= 0.0 {
            return None;
        }
        Some(speed.clamp(self.min_speed, self.max_speed))
    }

    fn cancel_timer(&mut self, scheduler: &mut dyn TimerScheduler) {
        if let Some(handle) = self.timer.take() {
            scheduler.cancel(handle);
        }
    }
}
