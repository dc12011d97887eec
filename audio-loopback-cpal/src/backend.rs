use audio_loopback_core::models::audio_models::AudioDevice;
use audio_loopback_core::models::error::DeviceError;
use audio_loopback_core::traits::backend::AudioBackend;

use crate::capture::CpalCapture;
use crate::device_enumerator::DeviceEnumerator;
use crate::playback::CpalPlayback;

/// [`AudioBackend`] over the platform's default cpal host.
pub struct CpalBackend {
    host: cpal::Host,
}

impl CpalBackend {
    pub fn new() -> Self {
        let host = cpal::default_host();
        log::info!("using audio host {:?}", host.id());
        Self { host }
    }

    pub fn enumerator(&self) -> DeviceEnumerator<'_> {
        DeviceEnumerator::new(&self.host)
    }
}

impl Default for CpalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for CpalBackend {
    type Capture = CpalCapture;
    type Playback = CpalPlayback;

    fn open_playback(&mut self) -> Result<CpalPlayback, DeviceError> {
        let device = self.enumerator().default_playback_device()?;
        CpalPlayback::open(&device)
    }

    fn open_capture(
        &mut self,
        device_name: &str,
        sample_rate: u32,
        buffer_len_samples: usize,
    ) -> Result<CpalCapture, DeviceError> {
        let device = self.enumerator().find_capture_device(device_name)?;
        CpalCapture::open(&device, device_name, sample_rate, buffer_len_samples)
    }

    fn capture_devices(&self) -> Result<Vec<AudioDevice>, DeviceError> {
        self.enumerator().list_capture_devices()
    }
}
