use thiserror::Error;

use super::audio_models::DeviceRole;

/// Errors reported by a device backend.
///
/// Returned from the [`AudioBackend`](crate::traits::backend::AudioBackend)
/// open calls and from per-tick device queries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DeviceError {
    #[error("{role} device '{name}' unavailable: {reason}")]
    Unavailable {
        role: DeviceRole,
        name: String,
        reason: String,
    },

    #[error("device disconnected: {0}")]
    Disconnected(String),

    #[error("backend error: {0}")]
    Backend(String),
}

impl DeviceError {
    pub fn unavailable(role: DeviceRole, name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            role,
            name: name.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the [`StreamingController`](crate::StreamingController).
///
/// Only [`LoopbackError::PlaybackUnavailable`] is fatal: without an output
/// context there is nothing to loop back to. Everything else leaves the
/// controller idle and ready for another attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoopbackError {
    #[error("cannot continue without a playback device: {0}")]
    PlaybackUnavailable(DeviceError),

    #[error("cannot open recording device: {0}")]
    CaptureUnavailable(DeviceError),

    #[error("device lost while recording: {0}")]
    DeviceLost(DeviceError),

    #[error("configuration failed: {0}")]
    ConfigurationFailed(String),
}

impl LoopbackError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::PlaybackUnavailable(_))
    }
}
