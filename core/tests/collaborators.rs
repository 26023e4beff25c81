//! Mode gating and the REST / transport collaborator hooks.

use replay_core::{
    api::{ClientTypeResponse, ListKind, RecordingInfo, RecordingList, RunAlgorithmResponse},
    clock::VirtualClock,
    command::OutboundCommand,
    config::ReplayConfig,
    engine::ReplayEngine,
    error::ReplayError,
    event_log::LogLabel,
    ingest::{Ingest, TransportEvent},
    mode::OperatingMode,
    playback::PlaybackState,
    snapshot::Snapshot,
};
use serde_json::json;

fn build(mode: OperatingMode) -> ReplayEngine<VirtualClock> {
    ReplayEngine::with_virtual_clock(ReplayConfig::for_mode(mode))
}

fn quiet_frames(n: u64) -> Vec<Snapshot> {
    (0..n)
        .map(|t| {
            let mut s = Snapshot::zero_state(1, 3);
            s.tick = t;
            s
        })
        .collect()
}

fn recordings(names: &[&str]) -> RecordingList {
    RecordingList {
        success: true,
        recordings: names
            .iter()
            .map(|n| RecordingInfo {
                filename: n.to_string(),
                metadata: json!({ "total_ticks": 100 }),
            })
            .collect(),
        error: None,
    }
}

fn last_description(engine: &ReplayEngine<VirtualClock>) -> String {
    engine
        .log()
        .entries()
        .last()
        .map(|e| e.description.clone())
        .unwrap_or_default()
}

#[test]
fn client_type_selects_mode() {
    let parse = |body: &str| {
        let response: ClientTypeResponse = serde_json::from_str(body).unwrap();
        OperatingMode::from_client_type(response.client_type.as_deref())
    };
    assert_eq!(parse(r#"{"client_type":"algorithm"}"#), OperatingMode::AlgorithmRunner);
    assert_eq!(parse(r#"{"client_type":"replay"}"#), OperatingMode::ReplayOnly);
    assert_eq!(parse(r#"{"client_type":"gui"}"#), OperatingMode::LiveFollow);
    assert_eq!(parse("{}"), OperatingMode::LiveFollow);
}

#[test]
fn live_follow_mode_cannot_select_recordings_or_run() {
    let mut engine = build(OperatingMode::LiveFollow);
    assert!(engine.load_recording("a.json").is_none());
    assert!(engine.begin_algorithm_run("look", "peak.json").is_none());
    assert!(engine.selected_recording().is_none());
}

#[test]
fn replay_mode_loads_recordings_but_cannot_run() {
    let mut engine = build(OperatingMode::ReplayOnly);
    assert_eq!(engine.load_recording("a.json"), Some(OutboundCommand::load("a.json")));
    assert_eq!(engine.selected_recording(), Some("a.json"));
    assert!(engine.begin_algorithm_run("look", "peak.json").is_none());
    assert!(engine.load_recording("").is_none(), "an empty selection sends nothing");
}

#[test]
fn load_recording_pauses_the_current_playback() {
    let mut engine = build(OperatingMode::ReplayOnly);
    engine.apply(Ingest::History(quiet_frames(10)));
    engine.play();
    engine.advance_time(engine.interval() * 2);

    engine.load_recording("next.json");

    assert_eq!(engine.state(), PlaybackState::Paused);
    assert_eq!(engine.scheduler().active_timers(), 0);
    assert_eq!(engine.current_index(), 2, "the old buffer stays until history arrives");
}

#[test]
fn recording_list_keeps_a_still_listed_selection() {
    let mut engine = build(OperatingMode::ReplayOnly);
    engine.load_recording("b.json");

    let command = engine.apply_recording_list(&recordings(&["c.json", "b.json", "a.json"]), true);
    assert!(command.is_none());
    assert_eq!(engine.selected_recording(), Some("b.json"));
}

#[test]
fn recording_list_auto_loads_newest_when_asked() {
    let mut engine = build(OperatingMode::AlgorithmRunner);
    engine.load_recording("gone.json");

    assert!(engine.apply_recording_list(&recordings(&["c.json"]), false).is_none());

    let command = engine.apply_recording_list(&recordings(&["c.json", "a.json"]), true);
    assert_eq!(command, Some(OutboundCommand::load("c.json")));
    assert_eq!(engine.selected_recording(), Some("c.json"));

    assert!(engine.apply_recording_list(&recordings(&[]), true).is_none());
}

#[test]
fn failed_list_fetch_logs_an_error_notice() {
    let mut engine = build(OperatingMode::AlgorithmRunner);
    let failed = RecordingList { success: false, error: Some("disk".into()), ..RecordingList::default() };

    assert!(engine.apply_recording_list(&failed, true).is_none());
    assert_eq!(last_description(&engine), "加载记录列表失败");

    engine.apply_list_failure(ListKind::Algorithms);
    let last = engine.log().entries().last().expect("notice");
    assert_eq!(last.label, LogLabel::Error);
    assert_eq!(last.description, "加载算法列表失败");
}

#[test]
fn successful_run_loads_the_new_recording() {
    let mut engine = build(OperatingMode::AlgorithmRunner);
    let request = engine.begin_algorithm_run("look_v2", "peak.json").expect("request");
    assert_eq!(request.algorithm, "look_v2");
    assert_eq!(request.traffic_file, "peak.json");
    assert_eq!(last_description(&engine), "开始运行: look_v2 + peak.json");

    let response: RunAlgorithmResponse =
        serde_json::from_str(r#"{"success":true,"recording":"look_v2_peak_20250301.json"}"#).unwrap();
    let command = engine.apply_run_result(&response).expect("success");

    assert_eq!(command, Some(OutboundCommand::load("look_v2_peak_20250301.json")));
    assert_eq!(engine.selected_recording(), Some("look_v2_peak_20250301.json"));
    assert_eq!(last_description(&engine), "运行成功: look_v2_peak_20250301.json");
}

#[test]
fn failed_run_reports_upstream_failure() {
    let mut engine = build(OperatingMode::AlgorithmRunner);
    engine.apply(Ingest::History(quiet_frames(3)));
    let response = RunAlgorithmResponse {
        success: false,
        recording: None,
        error: Some("traffic file missing".into()),
    };

    let result = engine.apply_run_result(&response);

    assert!(matches!(result, Err(ReplayError::UpstreamFailure { ref reason }) if reason == "traffic file missing"));
    assert_eq!(engine.len(), 3, "a failed run leaves the buffer alone");
    let last = engine.log().entries().last().expect("notice");
    assert_eq!(last.label, LogLabel::Error);
    assert_eq!(last.description, "运行失败: traffic file missing");
}

#[test]
fn run_requires_both_selections() {
    let mut engine = build(OperatingMode::AlgorithmRunner);
    assert!(engine.begin_algorithm_run("", "peak.json").is_none());
    assert!(engine.begin_algorithm_run("look", "").is_none());
    assert!(engine.log().is_empty());

    engine.apply_run_error("connection refused");
    assert_eq!(last_description(&engine), "运行算法失败: connection refused");
}

#[test]
fn transport_close_pauses_but_keeps_the_buffer() {
    let mut engine = build(OperatingMode::LiveFollow);
    engine.on_transport(TransportEvent::Connected);
    assert_eq!(last_description(&engine), "WebSocket连接成功");

    engine.apply(Ingest::History(quiet_frames(6)));
    engine.play();
    engine.on_transport(TransportEvent::Closed);

    assert_eq!(engine.state(), PlaybackState::Paused);
    assert_eq!(engine.scheduler().active_timers(), 0);
    assert_eq!(engine.len(), 6);
    assert_eq!(last_description(&engine), "WebSocket连接关闭");

    engine.on_transport(TransportEvent::Failed("reset by peer".into()));
    assert_eq!(last_description(&engine), "WebSocket连接错误");
}

#[test]
fn ping_round_trip() {
    let mut engine = build(OperatingMode::LiveFollow);
    assert_eq!(engine.ping(), OutboundCommand::Ping);
    engine.handle_raw(r#"{"type":"pong"}"#);
    assert!(engine.log().is_empty());
}
