//! cpal capture device.
//!
//! Opens an input stream on a named device, downmixes every callback to mono
//! 16-bit and stages it in a [`CaptureRing`] sized to the requested buffer
//! length. The controller drains the ring on each tick.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, SampleRate, StreamConfig};
use parking_lot::Mutex;

use audio_loopback_core::models::audio_models::DeviceRole;
use audio_loopback_core::models::error::DeviceError;
use audio_loopback_core::processing::ring_buffer::CaptureRing;
use audio_loopback_core::traits::capture_device::CaptureDevice;

use crate::pcm::{self, ToPcm16};

/// Input stream feeding a capture ring.
pub struct CpalCapture {
    stream: cpal::Stream,
    ring: Arc<Mutex<CaptureRing>>,
    fault: Arc<Mutex<Option<String>>>,
    device_name: String,
    sample_rate: u32,
}

impl CpalCapture {
    /// Build a paused input stream on `device` at `sample_rate`.
    ///
    /// Prefers a mono 16-bit configuration; falls back to f32 and/or more
    /// channels, which are converted in the callback.
    pub fn open(
        device: &cpal::Device,
        device_name: &str,
        sample_rate: u32,
        buffer_len_samples: usize,
    ) -> Result<Self, DeviceError> {
        let unavailable = |reason: String| DeviceError::unavailable(DeviceRole::Capture, device_name, reason);

        let range = device
            .supported_input_configs()
            .map_err(|e| unavailable(e.to_string()))?
            .filter(|r| r.min_sample_rate().0 <= sample_rate && sample_rate <= r.max_sample_rate().0)
            .filter(|r| matches!(r.sample_format(), SampleFormat::I16 | SampleFormat::F32))
            .min_by_key(|r| (r.channels(), r.sample_format() != SampleFormat::I16))
            .ok_or_else(|| unavailable(format!("no 16-bit or float input format at {} Hz", sample_rate)))?;

        let supported = range.with_sample_rate(SampleRate(sample_rate));
        let format = supported.sample_format();
        let config: StreamConfig = supported.config();
        let channels = usize::from(config.channels);

        let ring = Arc::new(Mutex::new(CaptureRing::new(buffer_len_samples)));
        let fault = Arc::new(Mutex::new(None));

        let stream = match format {
            SampleFormat::I16 => build_input::<i16>(device, &config, channels, &ring, &fault),
            _ => build_input::<f32>(device, &config, channels, &ring, &fault),
        }
        .map_err(|e| unavailable(e.to_string()))?;

        // Some hosts start streams as soon as they are built.
        if let Err(e) = stream.pause() {
            log::debug!("pausing new capture stream on '{}' failed: {}", device_name, e);
        }

        log::debug!(
            "capture '{}': {:?} x{} at {} Hz",
            device_name,
            format,
            channels,
            sample_rate
        );
        Ok(Self {
            stream,
            ring,
            fault,
            device_name: device_name.to_string(),
            sample_rate,
        })
    }

    fn check_fault(&self) -> Result<(), DeviceError> {
        match self.fault.lock().as_ref() {
            Some(reason) => Err(DeviceError::Disconnected(format!("{}: {}", self.device_name, reason))),
            None => Ok(()),
        }
    }
}

fn build_input<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    channels: usize,
    ring: &Arc<Mutex<CaptureRing>>,
    fault: &Arc<Mutex<Option<String>>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + ToPcm16,
{
    let ring = Arc::clone(ring);
    let fault = Arc::clone(fault);
    let mut mono = Vec::new();

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            pcm::downmix_to_mono(data, channels, &mut mono);
            let dropped = ring.lock().write(&mono);
            if dropped > 0 {
                log::trace!("capture ring overflow, dropped {} samples", dropped);
            }
        },
        move |err| {
            log::error!("capture stream error: {}", err);
            if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                *fault.lock() = Some(err.to_string());
            }
        },
        None,
    )
}

impl CaptureDevice for CpalCapture {
    fn start(&mut self) -> Result<(), DeviceError> {
        self.stream
            .play()
            .map_err(|e| DeviceError::Backend(format!("failed to start capture: {}", e)))
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.stream
            .pause()
            .map_err(|e| DeviceError::Backend(format!("failed to stop capture: {}", e)))
    }

    fn available_samples(&self) -> Result<usize, DeviceError> {
        self.check_fault()?;
        Ok(self.ring.lock().count())
    }

    fn read_samples(&mut self, dest: &mut [i16]) -> Result<usize, DeviceError> {
        self.check_fault()?;
        Ok(self.ring.lock().read_into(dest))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}
