//! Audio device enumeration via the cpal host.
//!
//! Lists input devices by name and resolves a configured capture
//! device name back to a `cpal::Device`.

use cpal::traits::{DeviceTrait, HostTrait};

use audio_loopback_core::models::audio_models::{AudioDevice, DeviceRole};
use audio_loopback_core::models::error::DeviceError;

/// Audio device enumerator over one cpal host.
pub struct DeviceEnumerator<'a> {
    host: &'a cpal::Host,
}

impl<'a> DeviceEnumerator<'a> {
    pub fn new(host: &'a cpal::Host) -> Self {
        Self { host }
    }

    /// List input devices. Devices whose name cannot be read are skipped.
    pub fn list_capture_devices(&self) -> Result<Vec<AudioDevice>, DeviceError> {
        let default_name = self.host.default_input_device().and_then(|d| d.name().ok());
        let devices = self
            .host
            .input_devices()
            .map_err(|e| DeviceError::Backend(format!("input device enumeration failed: {}", e)))?;
        Ok(Self::describe(devices, DeviceRole::Capture, default_name.as_deref()))
    }

    /// Find an input device by exact name.
    pub fn find_capture_device(&self, name: &str) -> Result<cpal::Device, DeviceError> {
        let devices = self
            .host
            .input_devices()
            .map_err(|e| DeviceError::unavailable(DeviceRole::Capture, name, e.to_string()))?;

        devices
            .into_iter()
            .find(|d| d.name().map(|n| n == name).unwrap_or(false))
            .ok_or_else(|| DeviceError::unavailable(DeviceRole::Capture, name, "no such input device"))
    }

    /// The host's default output device.
    pub fn default_playback_device(&self) -> Result<cpal::Device, DeviceError> {
        self.host
            .default_output_device()
            .ok_or_else(|| DeviceError::unavailable(DeviceRole::Playback, "default", "no output device"))
    }

    fn describe<I>(devices: I, role: DeviceRole, default_name: Option<&str>) -> Vec<AudioDevice>
    where
        I: Iterator<Item = cpal::Device>,
    {
        devices
            .filter_map(|d| d.name().ok())
            .map(|name| AudioDevice {
                is_default: default_name == Some(name.as_str()),
                name,
                role,
            })
            .collect()
    }
}
