use thiserror::Error;

use crate::types::{FrameIndex, Tick};

#[derive(Error, Debug)]
pub enum ReplayError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Frame index {index} out of range (buffer length {len})")]
    IndexOutOfRange { index: FrameIndex, len: usize },

    #[error("Tick regression: tail is at tick {tail}, got {actual}")]
    TickRegression { tail: Tick, actual: Tick },

    #[error("Malformed message: {reason}")]
    MalformedMessage { reason: String },

    #[error("Transport error: {reason}")]
    Transport { reason: String },

    #[error("Upstream failure: {reason}")]
    UpstreamFailure { reason: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type ReplayResult<T> = Result<T, ReplayError>;
