use crate::models::audio_models::AudioDevice;
use crate::models::error::DeviceError;
use crate::traits::capture_device::CaptureDevice;
use crate::traits::playback_device::PlaybackDevice;

/// Factory for the device contexts one recording session needs.
///
/// Implemented by:
/// - `CpalBackend` (audio-loopback-cpal)
/// - `MockBackend` (in-memory, for tests)
///
/// Each call opens a fresh context; the controller owns it until `stop()`.
pub trait AudioBackend {
    type Capture: CaptureDevice;
    type Playback: PlaybackDevice;

    /// Create the output context and its single playback source.
    fn open_playback(&mut self) -> Result<Self::Playback, DeviceError>;

    /// Open the named input as mono 16-bit at `sample_rate`, with an internal
    /// ring of `buffer_len_samples`.
    fn open_capture(
        &mut self,
        device_name: &str,
        sample_rate: u32,
        buffer_len_samples: usize,
    ) -> Result<Self::Capture, DeviceError>;

    /// Capture devices currently present.
    fn capture_devices(&self) -> Result<Vec<AudioDevice>, DeviceError>;
}
