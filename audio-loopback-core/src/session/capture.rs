use crate::models::error::DeviceError;
use crate::processing::sample_pool::SampleBufferPool;
use crate::traits::backend::AudioBackend;
use crate::traits::capture_device::CaptureDevice;

/// An opened capture device bound to one input, rate and ring length.
///
/// `close()` is idempotent; dropping the session closes it.
pub struct CaptureSession<C: CaptureDevice> {
    device: Option<C>,
    device_name: String,
    running: bool,
}

impl<C: CaptureDevice> CaptureSession<C> {
    /// Open `device_name` for mono 16-bit capture.
    ///
    /// Fails with [`DeviceError::Unavailable`] when the device is missing,
    /// busy, or cannot deliver the requested format.
    pub fn open<B>(
        backend: &mut B,
        device_name: &str,
        sample_rate: u32,
        buffer_len_samples: usize,
    ) -> Result<Self, DeviceError>
    where
        B: AudioBackend<Capture = C>,
    {
        let device = backend.open_capture(device_name, sample_rate, buffer_len_samples)?;
        log::info!(
            "opened capture device '{}' at {} Hz, ring {} samples",
            device_name,
            device.sample_rate(),
            buffer_len_samples
        );
        Ok(Self {
            device: Some(device),
            device_name: device_name.to_string(),
            running: false,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    /// Rate of the delivered samples, or 0 once closed.
    pub fn sample_rate(&self) -> u32 {
        self.device.as_ref().map(|d| d.sample_rate()).unwrap_or(0)
    }

    pub fn start(&mut self) -> Result<(), DeviceError> {
        let Some(device) = self.device.as_mut() else {
            return Err(DeviceError::Backend("capture session is closed".into()));
        };
        if !self.running {
            device.start()?;
            self.running = true;
        }
        Ok(())
    }

    pub fn stop(&mut self) -> Result<(), DeviceError> {
        if let (Some(device), true) = (self.device.as_mut(), self.running) {
            self.running = false;
            device.stop()?;
        }
        Ok(())
    }

    /// Samples ready to read right now. A closed session has none.
    pub fn available_samples(&self) -> Result<usize, DeviceError> {
        match &self.device {
            Some(device) => device.available_samples(),
            None => Ok(0),
        }
    }

    /// Drain up to `count` samples into the pool's staging array.
    ///
    /// The caller grows the pool first; reads are clamped to its capacity.
    /// Returns the number of samples written, which may be short.
    pub fn read_into(&mut self, pool: &mut SampleBufferPool, count: usize) -> Result<usize, DeviceError> {
        let Some(device) = self.device.as_mut() else {
            return Ok(0);
        };
        device.read_samples(pool.staging_mut(count))
    }

    pub fn close(&mut self) {
        if let Err(e) = self.stop() {
            log::warn!("failed to stop capture on '{}': {}", self.device_name, e);
        }
        if self.device.take().is_some() {
            log::info!("closed capture device '{}'", self.device_name);
        }
    }
}

impl<C: CaptureDevice> Drop for CaptureSession<C> {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockBackend;

    #[test]
    fn open_missing_device_is_unavailable() {
        let mut backend = MockBackend::with_capture_devices(&["Mic"]);

        let result = CaptureSession::open(&mut backend, "Nope", 44100, 4410);

        assert!(matches!(result, Err(DeviceError::Unavailable { .. })));
        assert!(!backend.capture_open());
    }

    #[test]
    fn reads_up_to_count_into_pool() {
        let mut backend = MockBackend::with_capture_devices(&["Mic"]);
        let mut session = CaptureSession::open(&mut backend, "Mic", 44100, 4410).unwrap();
        session.start().unwrap();
        backend.push_samples(&[1, 2, 3, 4, 5]);

        let mut pool = SampleBufferPool::new(1024);
        assert_eq!(session.available_samples().unwrap(), 5);
        assert_eq!(session.read_into(&mut pool, 3).unwrap(), 3);
        assert_eq!(pool.view(3), &[1, 2, 3]);

        // asking for more than is buffered returns what is there
        assert_eq!(session.read_into(&mut pool, 10).unwrap(), 2);
        assert_eq!(pool.view(2), &[4, 5]);
    }

    #[test]
    fn close_is_idempotent() {
        let mut backend = MockBackend::with_capture_devices(&["Mic"]);
        let mut session = CaptureSession::open(&mut backend, "Mic", 44100, 4410).unwrap();
        session.start().unwrap();

        session.close();
        session.close();

        assert!(!session.is_open());
        assert!(!backend.capture_open());
        assert_eq!(session.available_samples().unwrap(), 0);
        assert!(session.start().is_err());
    }

    #[test]
    fn drop_releases_device() {
        let mut backend = MockBackend::with_capture_devices(&["Mic"]);
        {
            let _session = CaptureSession::open(&mut backend, "Mic", 44100, 4410).unwrap();
            assert!(backend.capture_open());
        }
        assert!(!backend.capture_open());
    }
}
