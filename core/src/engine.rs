//! The replay engine: one explicit context object per viewer session.
//!
//! CALLBACK SOURCES (the only two ways in, never concurrent):
//!   1. Transport messages  → `handle_raw` / `handle_message` / `apply`
//!   2. Playback timer      → `on_timer`
//! User controls (`play`, `pause`, `seek`, ...) run on the same thread.
//!
//! RULES:
//!   - `cursor` is always within `[0, len-1]` when the buffer is non-empty,
//!     and 0 when it is empty.
//!   - Reconciliation only happens on forward visits: timer advancement,
//!     live-follow, loading a new buffer, and starting playback.
//!     Seeking never reconciles unless `emit_skipped_events` is set.
//!   - A rejected buffer replacement leaves the engine untouched. An
//!     accepted one cancels the timer before the buffer is swapped.
//!   - Playback pauses on the firing that lands on the tail; a live append
//!     after that is picked up by live-follow.

use crate::{
    api::{ListKind, RecordingList, RunAlgorithmRequest, RunAlgorithmResponse},
    buffer::SnapshotBuffer,
    clock::{TimerHandle, TimerScheduler, VirtualClock},
    command::OutboundCommand,
    config::ReplayConfig,
    error::{ReplayError, ReplayResult},
    event_log::{EventFilter, EventLog, EventLogReconciler, LogEntry, LogLabel},
    frame::{FrameView, PassengerStats},
    ingest::{InboundMessage, Ingest, RecordingMetadata, StreamIngestor, TransportEvent},
    mode::OperatingMode,
    playback::{PlaybackController, PlaybackState},
    snapshot::Snapshot,
    types::FrameIndex,
};
use std::time::Duration;

pub struct ReplayEngine<S: TimerScheduler> {
    config:             ReplayConfig,
    buffer:             SnapshotBuffer,
    cursor:             FrameIndex,
    playback:           PlaybackController,
    reconciler:         EventLogReconciler,
    scheduler:          S,
    filter:             EventFilter,
    metadata:           Option<RecordingMetadata>,
    selected_recording: Option<String>,
    render_generation:  u64,
    advancements:       u64,
}

impl<S: TimerScheduler> ReplayEngine<S> {
    pub fn new(config: ReplayConfig, scheduler: S) -> Self {
        let playback = PlaybackController::new(
            config.base_tick(),
            config.initial_speed,
            config.min_speed,
            config.max_speed,
        );
        log::info!(
            "engine: mode={} base_tick={}ms speed={:.2}x capacity={:?}",
            config.mode.label(),
            config.base_tick_ms,
            playback.speed(),
            config.capacity
        );
        Self {
            buffer: SnapshotBuffer::new(config.capacity),
            cursor: 0,
            playback,
            reconciler: EventLogReconciler::new(config.collapse_threshold),
            scheduler,
            filter: config.initial_filter,
            metadata: None,
            selected_recording: None,
            render_generation: 0,
            advancements: 0,
            config,
        }
    }

    // ── Read accessors ─────────────────────────────────────────

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    pub fn mode(&self) -> OperatingMode {
        self.config.mode
    }

    pub fn state(&self) -> PlaybackState {
        self.playback.state()
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn speed(&self) -> f64 {
        self.playback.speed()
    }

    pub fn interval(&self) -> Duration {
        self.playback.interval()
    }

    pub fn active_timer(&self) -> Option<TimerHandle> {
        self.playback.timer()
    }

    pub fn current_index(&self) -> FrameIndex {
        self.cursor
    }

    pub fn last_rendered_index(&self) -> Option<FrameIndex> {
        self.reconciler.last_rendered()
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn buffer(&self) -> &SnapshotBuffer {
        &self.buffer
    }

    pub fn current_snapshot(&self) -> Option<&Snapshot> {
        self.buffer.at(self.cursor).ok()
    }

    pub fn log(&self) -> &EventLog {
        self.reconciler.log()
    }

    pub fn filter(&self) -> EventFilter {
        self.filter
    }

    /// Change which categories the log panel shows. Stored entries are untouched.
    pub fn set_filter(&mut self, filter: EventFilter) {
        self.filter = filter;
    }

    /// The log panel: newest first, filtered, capped at `display_limit`.
    pub fn visible_log(&self) -> Vec<&LogEntry> {
        self.reconciler.log().display(self.filter, self.config.display_limit)
    }

    pub fn metadata(&self) -> Option<&RecordingMetadata> {
        self.metadata.as_ref()
    }

    pub fn selected_recording(&self) -> Option<&str> {
        self.selected_recording.as_deref()
    }

    pub fn render_generation(&self) -> u64 {
        self.render_generation
    }

    /// Cursor steps taken by the playback timer since construction.
    pub fn advancements(&self) -> u64 {
        self.advancements
    }

    pub fn scheduler(&self) -> &S {
        &self.scheduler
    }

    pub fn frame(&self) -> Option<FrameView<'_>> {
        let snapshot = self.buffer.at(self.cursor).ok()?;
        Some(FrameView {
            snapshot,
            index: self.cursor,
            len: self.buffer.len(),
            tick: snapshot.tick,
            state: self.playback.state(),
            speed: self.playback.speed(),
            stats: PassengerStats::from_snapshot(snapshot),
            generation: self.render_generation,
        })
    }

    // ── Playback controls ──────────────────────────────────────

    /// Start playback from the cursor. No-op when already playing or empty.
    pub fn play(&mut self) {
        if self.playback.is_playing() || self.buffer.is_empty() {
            return;
        }
        // Starting playback is a forward visit of the frame under the cursor.
        if self.reconcile_at(self.cursor) > 0 {
            self.render();
        }
        self.playback.start(&mut self.scheduler);
    }

    pub fn pause(&mut self) {
        self.playback.pause(&mut self.scheduler);
    }

    /// Back to the first frame with an empty log.
    pub fn reset(&mut self) {
        self.playback.pause(&mut self.scheduler);
        self.cursor = 0;
        self.reconciler.clear();
        if !self.buffer.is_empty() {
            self.render();
        }
    }

    /// Jump to `target`, clamped into the buffer. Pauses playback.
    pub fn seek(&mut self, target: i64) {
        let Some(last) = self.buffer.last_index() else {
            return;
        };
        self.playback.pause(&mut self.scheduler);
        let target = (target.max(0) as u64).min(last as u64) as FrameIndex;
        if self.config.emit_skipped_events {
            self.reconcile_through(target);
        }
        self.cursor = target;
        self.render();
    }

    /// Seek from an untrusted numeric input (a slider value). NaN lands on 0.
    pub fn seek_input(&mut self, raw: f64) {
        self.seek(raw as i64);
    }

    /// Change the playback speed multiplier. Returns the speed in effect.
    pub fn set_speed(&mut self, speed: f64) -> f64 {
        if self.buffer.is_empty() {
            return self.playback.speed();
        }
        self.playback.set_speed(speed, &mut self.scheduler)
    }

    /// Playback timer callback. Returns true when the cursor moved.
    pub fn on_timer(&mut self, handle: TimerHandle) -> bool {
        if !self.playback.owns(handle) {
            log::trace!("engine: dropping stale timer {}", handle.id());
            return false;
        }
        match self.buffer.last_index() {
            Some(last) if self.cursor < last => {
                self.visit_forward(self.cursor + 1);
                self.advancements += 1;
                if self.cursor == last {
                    log::debug!("engine: reached tail at index {last}");
                    self.playback.pause(&mut self.scheduler);
                }
                true
            }
            _ => {
                log::debug!("engine: end of buffer at index {}", self.cursor);
                self.playback.pause(&mut self.scheduler);
                false
            }
        }
    }

    /// Drop the buffer, as on disconnect or reload.
    pub fn discard(&mut self) {
        self.playback.stop(&mut self.scheduler);
        self.buffer.clear();
        self.cursor = 0;
        self.reconciler.clear();
        self.metadata = None;
        self.render();
    }

    // ── Stream ingestion ───────────────────────────────────────

    /// Feed one raw transport frame. Malformed and unknown frames are dropped.
    pub fn handle_raw(&mut self, raw: &str) {
        let ingest = StreamIngestor::ingest_raw(raw);
        self.apply(ingest);
    }

    pub fn handle_message(&mut self, message: InboundMessage) {
        self.apply(StreamIngestor::classify(message));
    }

    pub fn apply(&mut self, ingest: Ingest) {
        match ingest {
            Ingest::Init { elevators, floors } => {
                let zero = Snapshot::zero_state(elevators, floors);
                if self.replace_buffer(vec![zero]).is_ok() {
                    self.notice(format!("GUI初始化: {elevators}部电梯, {floors}层楼"));
                }
            }
            Ingest::History(frames) => {
                let count = frames.len();
                if self.replace_buffer(frames).is_ok() {
                    self.notice(format!("历史数据加载完成，共 {count} 帧"));
                }
            }
            Ingest::Append(snapshot) => self.append_live(snapshot),
            Ingest::Metadata(metadata) => {
                let name = metadata.name().map(str::to_owned);
                log::info!("engine: metadata for {name:?}");
                self.metadata = Some(metadata);
                if let Some(name) = name {
                    self.notice(format!("加载记录: {name}"));
                }
            }
            Ingest::ServerError(message) => {
                log::warn!("engine: server error: {message}");
                self.reconciler.log_mut().notice(LogLabel::Error, message);
            }
            Ingest::Ignore => {}
        }
    }

    pub fn on_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected => self.notice("WebSocket连接成功"),
            TransportEvent::Closed => {
                self.playback.pause(&mut self.scheduler);
                self.notice("WebSocket连接关闭");
            }
            TransportEvent::Failed(reason) => {
                log::error!("engine: {}", ReplayError::Transport { reason });
                self.notice("WebSocket连接错误");
            }
        }
    }

    // ── Collaborator hooks ─────────────────────────────────────

    pub fn ping(&self) -> OutboundCommand {
        OutboundCommand::Ping
    }

    /// Request a recording. Pauses playback so the old buffer stops
    /// advancing while the new one is in flight.
    pub fn load_recording(&mut self, filename: &str) -> Option<OutboundCommand> {
        if !self.config.mode.can_select_recordings() {
            log::warn!("engine: recording selection unavailable in {} mode", self.config.mode.label());
            return None;
        }
        if filename.is_empty() {
            return None;
        }
        self.playback.pause(&mut self.scheduler);
        self.selected_recording = Some(filename.to_string());
        Some(OutboundCommand::load(filename))
    }

    /// Take a fresh recording list. Keeps the current selection when it is
    /// still listed; otherwise optionally loads the newest recording.
    pub fn apply_recording_list(
        &mut self,
        list: &RecordingList,
        auto_load_latest: bool,
    ) -> Option<OutboundCommand> {
        if !list.success {
            self.apply_list_failure(ListKind::Recordings);
            return None;
        }
        if !self.config.mode.can_select_recordings() {
            return None;
        }
        let still_listed = self
            .selected_recording
            .as_deref()
            .is_some_and(|current| list.recordings.iter().any(|r| r.filename == current));
        if still_listed || !auto_load_latest {
            return None;
        }
        let newest = list.recordings.first()?.filename.clone();
        self.load_recording(&newest)
    }

    pub fn apply_list_failure(&mut self, kind: ListKind) {
        self.reconciler
            .log_mut()
            .notice(LogLabel::Error, kind.failure_notice());
    }

    /// Build a run request once both an algorithm and a traffic file are chosen.
    pub fn begin_algorithm_run(
        &mut self,
        algorithm: &str,
        traffic_file: &str,
    ) -> Option<RunAlgorithmRequest> {
        if !self.config.mode.can_run_algorithms() {
            log::warn!("engine: algorithm runs unavailable in {} mode", self.config.mode.label());
            return None;
        }
        if algorithm.is_empty() || traffic_file.is_empty() {
            return None;
        }
        self.notice(format!("开始运行: {algorithm} + {traffic_file}"));
        Some(RunAlgorithmRequest {
            algorithm:    algorithm.to_string(),
            traffic_file: traffic_file.to_string(),
        })
    }

    /// Record the outcome of a run. On success, yields the command that
    /// loads the new recording. A reported failure is logged and returned.
    pub fn apply_run_result(
        &mut self,
        response: &RunAlgorithmResponse,
    ) -> ReplayResult<Option<OutboundCommand>> {
        if !response.success {
            let reason = response
                .error
                .clone()
                .unwrap_or_else(|| "unknown error".to_string());
            self.reconciler
                .log_mut()
                .notice(LogLabel::Error, format!("运行失败: {reason}"));
            return Err(ReplayError::UpstreamFailure { reason });
        }
        let Some(recording) = response.recording.as_deref() else {
            return Ok(None);
        };
        self.notice(format!("运行成功: {recording}"));
        Ok(self.load_recording(recording))
    }

    /// The run request itself could not be completed.
    pub fn apply_run_error(&mut self, message: &str) {
        self.reconciler
            .log_mut()
            .notice(LogLabel::Error, format!("运行算法失败: {message}"));
    }

    // ── Internals ──────────────────────────────────────────────

    fn replace_buffer(&mut self, frames: Vec<Snapshot>) -> ReplayResult<()> {
        // A rejected sequence leaves playback, cursor and log as they were.
        if let Err(e) = SnapshotBuffer::validate(&frames) {
            log::warn!("engine: rejecting buffer replacement: {e}");
            return Err(e);
        }
        // Stop before swapping so no timer fires against the new buffer.
        self.playback.stop(&mut self.scheduler);
        self.buffer.reset(frames)?;
        log::info!("engine: buffer replaced, {} snapshot(s)", self.buffer.len());
        self.cursor = 0;
        self.reconciler.clear();
        if self.buffer.is_empty() {
            self.render();
        } else {
            self.visit_forward(0);
        }
        Ok(())
    }

    fn append_live(&mut self, snapshot: Snapshot) {
        let evicted = match self.buffer.append(snapshot) {
            Ok(evicted) => evicted,
            Err(e) => {
                log::warn!("engine: dropping state_update: {e}");
                return;
            }
        };
        if evicted > 0 {
            self.cursor = self.cursor.saturating_sub(evicted);
            self.reconciler.shift(evicted);
        }
        match self.buffer.last_index() {
            Some(last) if !self.playback.is_playing() => self.visit_forward(last),
            // Playing: the timer reaches the new tail on its own.
            _ => self.render(),
        }
    }

    /// Move the cursor forward to `target`, reconciling on the way.
    fn visit_forward(&mut self, target: FrameIndex) {
        if self.config.emit_skipped_events {
            self.reconcile_through(target);
        } else {
            self.reconcile_at(target);
        }
        self.cursor = target;
        self.render();
    }

    /// Reconcile every pending index up to and including `target`.
    fn reconcile_through(&mut self, target: FrameIndex) {
        let from = self.reconciler.last_rendered().map_or(0, |last| last + 1);
        for index in from..=target {
            self.reconcile_at(index);
        }
    }

    fn reconcile_at(&mut self, index: FrameIndex) -> usize {
        match self.buffer.at(index) {
            Ok(snapshot) => self.reconciler.reconcile(index, snapshot),
            Err(e) => {
                log::debug!("engine: nothing to reconcile: {e}");
                0
            }
        }
    }

    fn notice(&mut self, description: impl Into<String>) {
        self.reconciler.log_mut().notice(LogLabel::System, description);
    }

    fn render(&mut self) {
        self.render_generation += 1;
        log::trace!(
            "engine: render #{} at index {}/{}",
            self.render_generation,
            self.cursor,
            self.buffer.len()
        );
    }
}

impl ReplayEngine<VirtualClock> {
    /// An engine driven by a deterministic virtual clock.
    pub fn with_virtual_clock(config: ReplayConfig) -> Self {
        Self::new(config, VirtualClock::new())
    }

    /// Let `by` of virtual time pass, delivering every due timer firing in
    /// order. Returns how many times the cursor advanced.
    pub fn advance_time(&mut self, by: Duration) -> usize {
        let deadline = self.scheduler.now() + by;
        let mut advanced = 0;
        while let Some(handle) = self.scheduler.pop_due(deadline) {
            if self.on_timer(handle) {
                advanced += 1;
            }
        }
        self.scheduler.settle(deadline);
        advanced
    }

    /// Play until the end of the buffer is reached. Returns the advancements.
    pub fn run_to_end(&mut self) -> usize {
        self.play();
        let mut advanced = 0;
        while self.playback.is_playing() {
            advanced += self.advance_time(self.playback.interval());
        }
        advanced
    }
}
