use serde::{Deserialize, Serialize};

/// Commands the viewer sends back over the stream transport.
/// Variants mirror the server's command set. Never reorder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum OutboundCommand {
    /// Ask the server to send `metadata` + `history` for a recording.
    LoadRecording { filename: String },
    /// Heartbeat; answered with `pong`.
    Ping,
}

impl OutboundCommand {
    pub fn load(filename: impl Into<String>) -> Self {
        Self::LoadRecording { filename: filename.into() }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
