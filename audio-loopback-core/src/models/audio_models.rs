use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side of the loop a device sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    Capture,
    Playback,
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Capture => f.write_str("capture"),
            Self::Playback => f.write_str("playback"),
        }
    }
}

/// An audio device reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioDevice {
    pub name: String,
    pub role: DeviceRole,
    pub is_default: bool,
}

impl AudioDevice {
    pub fn capture(name: impl Into<String>, is_default: bool) -> Self {
        Self {
            name: name.into(),
            role: DeviceRole::Capture,
            is_default,
        }
    }
}

/// Opaque identifier of one device-side playback buffer.
///
/// Created by [`PlaybackDevice::create_buffer`](crate::traits::playback_device::PlaybackDevice::create_buffer)
/// and owned by the device while queued. Deliberately not `Clone`: a handle
/// lives in exactly one place at a time.
#[derive(Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(u32);

impl BufferHandle {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u32 {
        self.0
    }
}

/// Per-session counters for debugging a loopback session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDiagnostics {
    pub ticks: u64,
    pub empty_ticks: u64,
    pub samples_consumed: u64,
    pub buffers_submitted: u64,
    pub buffers_reclaimed: u64,
    pub pool_growths: u64,
}
