//! Stream ingestion: turns transport messages into buffer operations.
//!
//! Every inbound message carries a `type` discriminator. Known types map to
//! exactly one `Ingest` action; unknown types are dropped without error.
//! A known type with a broken payload is a malformed message: it is also
//! dropped, but the decoder reports why so the caller can log it.

use crate::{
    error::{ReplayError, ReplayResult},
    snapshot::Snapshot,
    types::Tick,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Message types this ingestor understands.
pub const KNOWN_TYPES: [&str; 6] = ["init", "metadata", "history", "state_update", "error", "pong"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    Init {
        data: InitData,
    },
    Metadata {
        #[serde(default)]
        data: Value,
        #[serde(default)]
        filename: Option<String>,
    },
    History {
        data: Vec<Snapshot>,
    },
    StateUpdate {
        #[serde(default)]
        data: Option<Snapshot>,
    },
    Error {
        #[serde(default)]
        message: String,
    },
    Pong,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InitData {
    pub elevators_count: usize,
    pub floors_count:    usize,
    #[serde(default)]
    pub tick:            Tick,
}

impl InboundMessage {
    /// Decode one raw transport frame.
    ///
    /// `Ok(None)` for well-formed JSON with an unrecognized `type`.
    pub fn decode(raw: &str) -> ReplayResult<Option<Self>> {
        let value: Value = serde_json::from_str(raw).map_err(|e| ReplayError::MalformedMessage {
            reason: format!("not JSON: {e}"),
        })?;
        Self::from_value(value)
    }

    pub fn from_value(mut value: Value) -> ReplayResult<Option<Self>> {
        let Some(kind) = value.get("type").and_then(Value::as_str).map(str::to_owned) else {
            return Err(ReplayError::MalformedMessage {
                reason: "missing 'type' field".into(),
            });
        };
        if !KNOWN_TYPES.contains(&kind.as_str()) {
            log::debug!("ingest: ignoring unrecognized message type '{kind}'");
            return Ok(None);
        }

        // `init` may carry its counts flat instead of under `data`.
        if kind == "init" && value.get("data").is_none() {
            if let Value::Object(map) = &mut value {
                let mut data = map.clone();
                data.remove("type");
                map.insert("data".into(), Value::Object(data));
            }
        }

        serde_json::from_value(value)
            .map(Some)
            .map_err(|e| ReplayError::MalformedMessage {
                reason: format!("bad '{kind}' payload: {e}"),
            })
    }
}

/// Descriptive information about the loaded recording. Side-channel only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub filename: Option<String>,
    pub data:     Value,
}

impl RecordingMetadata {
    /// The recording's name: the message's `filename`, else one inside `data`.
    pub fn name(&self) -> Option<&str> {
        self.filename
            .as_deref()
            .or_else(|| self.data.get("filename").and_then(Value::as_str))
            .filter(|name| !name.is_empty())
    }

    pub fn total_ticks(&self) -> Option<u64> {
        self.data.get("total_ticks").and_then(Value::as_u64)
    }

    pub fn algorithm(&self) -> Option<&str> {
        self.data.get("algorithm").and_then(Value::as_str)
    }
}

/// What a message does to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Ingest {
    /// Replace the buffer with a synthetic zero-tick state.
    Init { elevators: usize, floors: usize },
    /// Replace the buffer with a bulk history.
    History(Vec<Snapshot>),
    /// Append one live snapshot.
    Append(Snapshot),
    /// Store recording metadata.
    Metadata(RecordingMetadata),
    /// Show a server-reported error.
    ServerError(String),
    /// Nothing to do.
    Ignore,
}

pub struct StreamIngestor;

impl StreamIngestor {
    pub fn classify(message: InboundMessage) -> Ingest {
        match message {
            InboundMessage::Init { data } => Ingest::Init {
                elevators: data.elevators_count,
                floors:    data.floors_count,
            },
            InboundMessage::Metadata { data, filename } => {
                Ingest::Metadata(RecordingMetadata { filename, data })
            }
            InboundMessage::History { data } => Ingest::History(data),
            InboundMessage::StateUpdate { data: Some(snapshot) } => Ingest::Append(snapshot),
            InboundMessage::StateUpdate { data: None } => {
                log::debug!("ingest: state_update without data");
                Ingest::Ignore
            }
            InboundMessage::Error { message } => Ingest::ServerError(message),
            InboundMessage::Pong => Ingest::Ignore,
        }
    }

    /// Decode and classify a raw frame. Malformed frames become `Ignore`.
    pub fn ingest_raw(raw: &str) -> Ingest {
        match InboundMessage::decode(raw) {
            Ok(Some(message)) => Self::classify(message),
            Ok(None) => Ingest::Ignore,
            Err(e) => {
                log::debug!("ingest: dropping frame: {e}");
                Ingest::Ignore
            }
        }
    }
}

/// Connection lifecycle notifications from the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    Connected,
    Closed,
    Failed(String),
}
