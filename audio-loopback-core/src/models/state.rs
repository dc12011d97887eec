use std::fmt;

use serde::Serialize;

/// Streaming state machine.
///
/// State transitions:
/// ```text
/// idle ──start()──▶ recording ──stop() / device lost──▶ idle
/// ```
///
/// Ticks and buffer reclamation only do work while recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamingState {
    #[default]
    Idle,
    Recording,
}

impl StreamingState {
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    pub fn is_recording(&self) -> bool {
        matches!(self, Self::Recording)
    }
}

impl fmt::Display for StreamingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => f.write_str("idle"),
            Self::Recording => f.write_str("recording"),
        }
    }
}
