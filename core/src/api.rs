//! Response shapes of the viewer's REST collaborators.
//!
//! The engine never performs HTTP itself. The host fetches these, hands the
//! decoded bodies to the engine, and sends whatever command comes back.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// `GET /api/client_type`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientTypeResponse {
    #[serde(default)]
    pub client_type: Option<String>,
}

/// `GET /api/algorithms`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlgorithmList {
    pub success: bool,
    #[serde(default)]
    pub algorithms: Vec<AlgorithmInfo>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlgorithmInfo {
    pub filename:    String,
    pub name:        String,
    #[serde(default)]
    pub description: String,
}

impl AlgorithmInfo {
    pub fn option_label(&self) -> String {
        format!("{} - {}", self.name, self.description)
    }
}

/// `GET /api/traffic_files`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrafficFileList {
    pub success: bool,
    #[serde(default)]
    pub traffic_files: Vec<TrafficFileInfo>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrafficFileInfo {
    pub filename:   String,
    pub name:       String,
    #[serde(default)]
    pub passengers: Option<u64>,
    #[serde(default)]
    pub elevators:  Option<u64>,
    #[serde(default)]
    pub floors:     Option<u64>,
    #[serde(default)]
    pub duration:   Option<u64>,
}

impl TrafficFileInfo {
    /// Unreadable traffic files come back without counts and show the bare name.
    pub fn option_label(&self) -> String {
        match self.passengers {
            Some(p) if p > 0 => format!(
                "{} ({}人, {}梯, {}层)",
                self.name,
                p,
                self.elevators.unwrap_or(0),
                self.floors.unwrap_or(0)
            ),
            _ => self.name.clone(),
        }
    }
}

/// `GET /api/recordings`, newest first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordingList {
    pub success: bool,
    #[serde(default)]
    pub recordings: Vec<RecordingInfo>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingInfo {
    pub filename: String,
    #[serde(default)]
    pub metadata: Value,
}

impl RecordingInfo {
    pub fn total_ticks(&self) -> u64 {
        self.metadata
            .get("total_ticks")
            .and_then(Value::as_u64)
            .unwrap_or(0)
    }

    pub fn option_label(&self) -> String {
        format!("{} ({} ticks)", self.filename, self.total_ticks())
    }
}

/// `POST /api/run_algorithm` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunAlgorithmRequest {
    pub algorithm:    String,
    pub traffic_file: String,
}

/// `POST /api/run_algorithm` response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunAlgorithmResponse {
    pub success: bool,
    #[serde(default)]
    pub recording: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Which list a failed fetch was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Algorithms,
    TrafficFiles,
    Recordings,
}

impl ListKind {
    pub fn failure_notice(self) -> &'static str {
        match self {
            Self::Algorithms   => "加载算法列表失败",
            Self::TrafficFiles => "加载流量文件列表失败",
            Self::Recordings   => "加载记录列表失败",
        }
    }
}
