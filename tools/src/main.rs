//! replay-runner: headless driver for the replay timeline engine.
//!
//! Usage:
//!   replay-runner --recording look_v2_peak.json --speed 2 --filter elevator
//!   simulator | replay-runner --stream --realtime

use anyhow::Result;
use chrono::Utc;
use replay_core::{
    clock::VirtualClock,
    config::ReplayConfig,
    engine::ReplayEngine,
    event_log::{visible, EventFilter},
    ingest::{InboundMessage, TransportEvent},
    snapshot::Snapshot,
    types::Tick,
};
use std::env;
use std::io::{self, BufRead, Write};

/// A recording as the recorder writes it to disk.
#[derive(serde::Deserialize)]
struct RecordingFile {
    #[serde(default)]
    metadata: serde_json::Value,
    history:  Vec<Snapshot>,
}

#[derive(serde::Serialize)]
struct RunSummary<'a> {
    mode:         &'a str,
    frames:       usize,
    cursor:       usize,
    final_tick:   Option<Tick>,
    state:        &'a str,
    speed:        f64,
    advancements: u64,
    log_entries:  usize,
    delivered:    usize,
    total:        usize,
    elapsed_ms:   i64,
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let stream = args.iter().any(|a| a == "--stream");
    let realtime = args.iter().any(|a| a == "--realtime");
    let json_summary = args.iter().any(|a| a == "--json");
    let recording = string_arg(&args, "--recording");

    let mut config = match string_arg(&args, "--config") {
        Some(path) => ReplayConfig::load(path)?,
        None => ReplayConfig::default(),
    };
    apply_overrides(&mut config, &args)?;

    let mut engine = ReplayEngine::with_virtual_clock(config);
    let started = Utc::now();

    match (recording, stream) {
        (Some(path), _) => {
            replay_recording(&mut engine, path, realtime)?;
            print_log(&engine);
        }
        (None, true) => run_stream(&mut engine, realtime)?,
        (None, false) => {
            anyhow::bail!("nothing to do: pass --recording <file> or --stream");
        }
    }

    let elapsed_ms = (Utc::now() - started).num_milliseconds();
    print_summary(&engine, elapsed_ms, json_summary)?;
    Ok(())
}

/// Command-line flags win over the config file, but only when given.
fn apply_overrides(config: &mut ReplayConfig, args: &[String]) -> Result<()> {
    if let Some(raw) = string_arg(args, "--speed") {
        config.initial_speed = raw
            .parse()
            .map_err(|e| anyhow::anyhow!("--speed: {e}"))?;
    }
    if let Some(raw) = string_arg(args, "--filter") {
        config.initial_filter = raw
            .parse::<EventFilter>()
            .map_err(|e| anyhow::anyhow!("--filter: {e}"))?;
    }
    if args.iter().any(|a| a == "--emit-skipped") {
        config.emit_skipped_events = true;
    }
    config.validate()
}

fn replay_recording(engine: &mut ReplayEngine<VirtualClock>, path: &str, realtime: bool) -> Result<()> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
    let recording: RecordingFile = serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
    log::info!("loaded {path}: {} snapshot(s)", recording.history.len());

    engine.handle_message(InboundMessage::Metadata {
        data:     recording.metadata,
        filename: Some(path.to_string()),
    });
    engine.handle_message(InboundMessage::History { data: recording.history });
    if engine.is_empty() {
        anyhow::bail!("{path} has no playable snapshots");
    }

    engine.play();
    drive(engine, realtime);
    Ok(())
}

/// Let the playback timer run until playback stops on its own.
fn drive(engine: &mut ReplayEngine<VirtualClock>, realtime: bool) {
    while engine.is_playing() {
        let interval = engine.interval();
        if realtime {
            std::thread::sleep(interval);
        }
        engine.advance_time(interval);
    }
}

/// Feed JSON-lines messages from stdin as a live transport would.
fn run_stream(engine: &mut ReplayEngine<VirtualClock>, realtime: bool) -> Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut handle = stdin.lock();
    let mut buffer = String::new();
    let mut printed: Option<u64> = None;

    engine.on_transport(TransportEvent::Connected);
    loop {
        buffer.clear();
        let bytes_read = match handle.read_line(&mut buffer) {
            Ok(n) => n,
            Err(e) => {
                engine.on_transport(TransportEvent::Failed(e.to_string()));
                break;
            }
        };
        if bytes_read == 0 {
            break; // EOF
        }
        let line = buffer.trim();
        if line.is_empty() {
            continue;
        }

        engine.handle_raw(line);
        if realtime {
            drive(engine, true);
        } else {
            engine.advance_time(engine.interval());
        }
        printed = print_new_entries(engine, printed, &mut stdout)?;
    }
    engine.on_transport(TransportEvent::Closed);
    print_new_entries(engine, printed, &mut stdout)?;
    Ok(())
}

/// Print entries written after sequence number `after`. Returns the newest printed.
fn print_new_entries(
    engine: &ReplayEngine<VirtualClock>,
    after: Option<u64>,
    out: &mut impl Write,
) -> Result<Option<u64>> {
    let mut newest = after;
    for entry in engine.log().entries() {
        if after.is_some_and(|seq| entry.seq <= seq) {
            continue;
        }
        newest = Some(entry.seq);
        if visible(entry, engine.filter()) {
            writeln!(out, "{} {entry}", entry.logged_at.format("%H:%M:%S"))?;
        }
    }
    out.flush()?;
    Ok(newest)
}

fn print_log(engine: &ReplayEngine<VirtualClock>) {
    println!("=== EVENT LOG (newest first) ===");
    let shown = engine.visible_log();
    if shown.is_empty() {
        println!("  (no entries)");
    }
    for entry in shown {
        println!("  {entry}");
    }
    println!();
}

fn print_summary(engine: &ReplayEngine<VirtualClock>, elapsed_ms: i64, as_json: bool) -> Result<()> {
    let stats = engine.frame().map(|f| f.stats).unwrap_or_default();
    let summary = RunSummary {
        mode:         engine.mode().label(),
        frames:       engine.len(),
        cursor:       engine.current_index(),
        final_tick:   engine.current_snapshot().map(|s| s.tick),
        state:        engine.state().label(),
        speed:        engine.speed(),
        advancements: engine.advancements(),
        log_entries:  engine.log().len(),
        delivered:    stats.delivered,
        total:        stats.total,
        elapsed_ms,
    };
    if as_json {
        println!("{}", serde_json::to_string(&summary)?);
        return Ok(());
    }

    println!("=== REPLAY SUMMARY ===");
    if let Some(metadata) = engine.metadata() {
        println!("  recording:    {}", metadata.filename.as_deref().unwrap_or("-"));
        println!("  algorithm:    {}", metadata.algorithm().unwrap_or("-"));
    }
    println!("  mode:         {}", summary.mode);
    println!("  frames:       {}", summary.frames);
    println!("  cursor:       {}", summary.cursor);
    match summary.final_tick {
        Some(tick) => println!("  final tick:   {tick}"),
        None => println!("  final tick:   -"),
    }
    println!("  state:        {}", summary.state);
    println!("  speed:        {:.2}x", summary.speed);
    println!("  advancements: {}", summary.advancements);
    println!("  log entries:  {}", summary.log_entries);
    println!("  delivered:    {}/{}", summary.delivered, summary.total);
    println!("  wall time:    {} ms", summary.elapsed_ms);
    Ok(())
}

fn string_arg<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}
