use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Largest staging array the sample pool will grow to (about 23 s at 44.1 kHz).
pub const DEFAULT_MAX_POOL_SAMPLES: usize = 1 << 20;

/// Hard ceiling for `max_pool_samples` and for the capture ring length
/// (about 25 minutes at 44.1 kHz).
pub const MAX_POOL_SAMPLES_LIMIT: usize = 1 << 26;

/// What the host should do after a fatal (playback) error has been reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FatalErrorAction {
    /// Report the error and keep running in the idle state.
    #[default]
    Report,
    /// Report the error, then terminate the process.
    Exit,
}

/// Configuration snapshot read by the controller at `start()`.
///
/// Field names follow the host's settings file (camelCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoopbackConfiguration {
    /// Name of the capture device to open.
    pub recording_device_name: String,

    /// Capture and playback sample rate in Hz (default: 44100).
    pub sampling_rate_hz: u32,

    /// Nominal buffer window in milliseconds (default: 100).
    pub buffer_duration_ms: f64,

    /// Playback amplitude multiplier, applied once at start (default: 1.0).
    pub playback_gain: f32,

    /// Upper bound for the staging array, in samples.
    pub max_pool_samples: usize,

    /// Host policy for fatal errors.
    pub fatal_error_action: FatalErrorAction,
}

impl LoopbackConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        if self.sampling_rate_hz == 0 {
            return Err("sampling rate must be positive".into());
        }
        if !self.buffer_duration_ms.is_finite() || self.buffer_duration_ms <= 0.0 {
            return Err(format!(
                "buffer duration must be positive: {}",
                self.buffer_duration_ms
            ));
        }
        if !self.playback_gain.is_finite() || self.playback_gain < 0.0 {
            return Err(format!("invalid playback gain: {}", self.playback_gain));
        }
        if self.max_pool_samples == 0 || self.max_pool_samples > MAX_POOL_SAMPLES_LIMIT {
            return Err(format!(
                "max pool size must be between 1 and {} samples: {}",
                MAX_POOL_SAMPLES_LIMIT, self.max_pool_samples
            ));
        }
        // Compared before the cast in buffer_length_samples(), which saturates.
        let buffer_len = self.buffer_duration_ms * f64::from(self.sampling_rate_hz) / 1000.0;
        if buffer_len.round() > MAX_POOL_SAMPLES_LIMIT as f64 {
            return Err(format!(
                "buffer of {} ms at {} Hz exceeds {} samples",
                self.buffer_duration_ms, self.sampling_rate_hz, MAX_POOL_SAMPLES_LIMIT
            ));
        }
        Ok(())
    }

    /// Internal capture ring length requested from the device, in samples.
    pub fn buffer_length_samples(&self) -> usize {
        (self.buffer_duration_ms * f64::from(self.sampling_rate_hz) / 1000.0).round() as usize
    }

    /// Tick period: half the nominal buffer window, so samples are drained
    /// before the device ring fills.
    pub fn tick_interval(&self) -> Duration {
        let millis = (self.buffer_duration_ms / 2.0).round() as u64;
        Duration::from_millis(millis.max(1))
    }
}

impl Default for LoopbackConfiguration {
    fn default() -> Self {
        Self {
            recording_device_name: String::new(),
            sampling_rate_hz: 44100,
            buffer_duration_ms: 100.0,
            playback_gain: 1.0,
            max_pool_samples: DEFAULT_MAX_POOL_SAMPLES,
            fatal_error_action: FatalErrorAction::Report,
        }
    }
}
