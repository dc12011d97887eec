use crate::models::error::DeviceError;

/// Platform capture device opened for mono 16-bit PCM.
///
/// All calls are non-blocking polls. Closing happens on drop.
pub trait CaptureDevice {
    /// Begin filling the device's internal ring.
    fn start(&mut self) -> Result<(), DeviceError>;

    /// Pause capture. Samples already buffered stay readable.
    fn stop(&mut self) -> Result<(), DeviceError>;

    /// Samples buffered and ready to read. Zero is a normal answer.
    fn available_samples(&self) -> Result<usize, DeviceError>;

    /// Drain up to `dest.len()` samples into `dest`, returning how many were written.
    fn read_samples(&mut self, dest: &mut [i16]) -> Result<usize, DeviceError>;

    /// Rate the device actually delivers, in Hz.
    fn sample_rate(&self) -> u32;
}
