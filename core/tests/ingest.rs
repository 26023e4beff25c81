//! Wire decoding tests: raw transport frames through the ingestor and engine.

use replay_core::{
    clock::VirtualClock,
    config::ReplayConfig,
    engine::ReplayEngine,
    error::ReplayError,
    event::EventKind,
    event_log::LogLabel,
    ingest::{InboundMessage, Ingest, StreamIngestor},
    snapshot::{Direction, PassengerStatus},
};

/// One tick in the recorder's on-disk shape: queue lengths, string passenger keys.
const RECORDED_TICK: &str = r#"{
    "tick": 12,
    "timestamp": "2025-03-01T10:00:00",
    "elevators": [
        {"id": 0, "current_floor": 2, "current_floor_float": 2.5, "target_floor": 4,
         "direction": "up", "status": "moving", "passengers": [3, 5], "load": 2},
        {"id": 1, "current_floor": 0, "direction": "stopped", "passengers": []}
    ],
    "floors": [
        {"floor": 0, "up_waiting": 2, "down_waiting": 0},
        {"floor": 1, "up_waiting": 0, "down_waiting": 1}
    ],
    "passengers": {
        "3": {"status": "in_elevator", "destination": 4},
        "5": {"status": "in_elevator", "destination": 6},
        "8": {"status": "completed", "destination": 1, "arrive_tick": 11}
    },
    "events": [
        {"type": "passenger_board", "data": {"elevator": 0, "passenger": 5, "floor": 2}},
        {"type": "teleported", "data": {}}
    ],
    "metrics": {"completed_passengers": 1, "total_passengers": 3, "average_wait_time": 4.5}
}"#;

fn build() -> ReplayEngine<VirtualClock> {
    ReplayEngine::with_virtual_clock(ReplayConfig::default())
}

fn state_update(snapshot_json: &str) -> String {
    format!(r#"{{"type":"state_update","data":{snapshot_json}}}"#)
}

#[test]
fn recorder_snapshot_decodes_with_queue_counts() {
    let message = InboundMessage::decode(&state_update(RECORDED_TICK))
        .expect("valid frame")
        .expect("known type");
    let Ingest::Append(snapshot) = StreamIngestor::classify(message) else {
        panic!("state_update must become an append");
    };

    assert_eq!(snapshot.tick, 12);
    assert_eq!(snapshot.elevators[0].position(), 2.5);
    assert_eq!(snapshot.elevators[0].display_floor(), 2);
    assert_eq!(snapshot.elevators[0].direction, Direction::Up);
    assert_eq!(snapshot.elevators[1].direction, Direction::Stopped);
    assert_eq!(snapshot.floor(0).map(|f| f.up_count()), Some(2));
    assert_eq!(snapshot.floor(1).map(|f| f.down_count()), Some(1));
    assert_eq!(snapshot.passenger(8).map(|p| p.status), Some(PassengerStatus::Completed));
    assert_eq!(snapshot.events.len(), 2);
    assert_eq!(snapshot.events[1].kind, EventKind::Unknown);
}

#[test]
fn live_controller_queues_are_counted() {
    let raw = r#"{"type":"state_update","data":{"tick":1,
        "floors":[{"floor":3,"up_queue":[1,2,4],"down_queue":[7]}]}}"#;
    let Ingest::Append(snapshot) = StreamIngestor::ingest_raw(raw) else {
        panic!("expected append");
    };
    let floor = snapshot.floor(3).expect("floor 3");
    assert_eq!(floor.up_count(), 3);
    assert_eq!(floor.down_count(), 1);
}

#[test]
fn unknown_message_types_are_ignored_silently() {
    assert!(matches!(InboundMessage::decode(r#"{"type":"telemetry","data":1}"#), Ok(None)));
    assert_eq!(StreamIngestor::ingest_raw(r#"{"type":"telemetry"}"#), Ingest::Ignore);
}

#[test]
fn malformed_frames_are_reported_then_dropped() {
    let cases = [
        "not json at all",
        r#"{"data":{}}"#,
        r#"{"type":"history","data":"oops"}"#,
        r#"{"type":"state_update","data":{"elevators":[]}}"#,
    ];
    for raw in cases {
        let decoded = InboundMessage::decode(raw);
        assert!(
            matches!(decoded, Err(ReplayError::MalformedMessage { .. })),
            "expected malformed for {raw}: {decoded:?}"
        );
        assert_eq!(StreamIngestor::ingest_raw(raw), Ingest::Ignore);
    }
}

#[test]
fn malformed_frame_leaves_engine_untouched() {
    let mut engine = build();
    engine.handle_raw(r#"{"type":"init","data":{"elevators_count":2,"floors_count":5}}"#);
    let log_len = engine.log().len();
    let generation = engine.render_generation();

    engine.handle_raw(r#"{"type":"state_update","data":{"tick":"soon"}}"#);
    engine.handle_raw("{");

    assert_eq!(engine.len(), 1);
    assert_eq!(engine.log().len(), log_len);
    assert_eq!(engine.render_generation(), generation);
}

#[test]
fn init_accepts_flat_counts() {
    let nested = StreamIngestor::ingest_raw(
        r#"{"type":"init","data":{"elevators_count":4,"floors_count":12,"tick":0}}"#,
    );
    let flat = StreamIngestor::ingest_raw(r#"{"type":"init","elevators_count":4,"floors_count":12}"#);
    assert_eq!(nested, Ingest::Init { elevators: 4, floors: 12 });
    assert_eq!(flat, nested);
}

#[test]
fn state_update_without_data_is_ignored() {
    assert_eq!(StreamIngestor::ingest_raw(r#"{"type":"state_update"}"#), Ingest::Ignore);
    assert_eq!(StreamIngestor::ingest_raw(r#"{"type":"pong"}"#), Ingest::Ignore);
}

#[test]
fn recording_load_sequence_through_raw_frames() {
    let mut engine = build();
    engine.handle_raw(
        r#"{"type":"metadata","filename":"look_peak.json","data":{"algorithm":"look","total_ticks":3}}"#,
    );
    let history = format!(
        r#"{{"type":"history","data":[{{"tick":0}},{{"tick":1}},{RECORDED_TICK}]}}"#
    );
    engine.handle_raw(&history);

    let metadata = engine.metadata().expect("metadata stored");
    assert_eq!(metadata.filename.as_deref(), Some("look_peak.json"));
    assert_eq!(metadata.total_ticks(), Some(3));
    assert_eq!(metadata.algorithm(), Some("look"));
    assert_eq!(engine.len(), 3);
    assert_eq!(engine.current_index(), 0);

    engine.run_to_end();
    let ticks: Vec<String> = engine
        .log()
        .entries()
        .iter()
        .filter(|e| matches!(e.label, LogLabel::Tick(_)))
        .map(|e| e.to_string())
        .collect();
    assert_eq!(ticks, vec!["[Tick 12] 乘客P5登上电梯E0".to_string()]);

    let frame = engine.frame().expect("frame at tail");
    assert_eq!(frame.stats.total, 3);
    assert_eq!(frame.stats.in_transit, 2);
    assert_eq!(frame.stats.delivered, 1);
    assert_eq!(frame.stats.average_wait, 4.5);
    assert!(frame.at_tail());
    assert_eq!(frame.progress_max(), 2);
}

#[test]
fn server_error_is_logged_with_error_label() {
    let mut engine = build();
    engine.handle_raw(r#"{"type":"error","message":"recording not found"}"#);

    let last = engine.log().entries().last().expect("error entry");
    assert_eq!(last.label, LogLabel::Error);
    assert_eq!(last.to_string(), "[错误] recording not found");
    assert!(engine.is_empty());
}

#[test]
fn empty_history_leaves_an_empty_buffer() {
    let mut engine = build();
    engine.handle_raw(r#"{"type":"history","data":[{"tick":0},{"tick":1}]}"#);
    engine.handle_raw(r#"{"type":"history","data":[]}"#);

    assert!(engine.is_empty());
    assert_eq!(engine.current_index(), 0);
    assert!(engine.frame().is_none());
}

#[test]
fn metadata_notice_names_the_recording_or_is_skipped() {
    let mut engine = build();
    engine.handle_raw(r#"{"type":"metadata","data":{"filename":"bus_v1.json","total_ticks":40}}"#);
    let last = engine.log().entries().last().expect("metadata notice");
    assert_eq!(last.description, "加载记录: bus_v1.json", "falls back to the name inside data");

    let before = engine.log().len();
    engine.handle_raw(r#"{"type":"metadata","data":{"total_ticks":40}}"#);
    assert_eq!(engine.log().len(), before, "an unnamed recording gets no notice");
    assert_eq!(engine.metadata().and_then(|m| m.total_ticks()), Some(40));
    assert!(engine.metadata().and_then(|m| m.name()).is_none());
}
