use crate::models::audio_models::BufferHandle;
use crate::models::error::DeviceError;

/// An output context holding exactly one playback source.
///
/// Shaped after a queued-buffer source: buffers are created from samples,
/// queued in order, marked processed once played, and must be unqueued
/// and deleted by the owner. When the queue runs dry the source stops
/// and has to be restarted with [`play`](Self::play).
pub trait PlaybackDevice {
    /// Output amplitude multiplier. Takes effect immediately.
    fn set_gain(&mut self, gain: f32);

    /// Copy `samples` into a new device buffer.
    fn create_buffer(&mut self, samples: &[i16], sample_rate: u32) -> Result<BufferHandle, DeviceError>;

    /// Append a buffer to the source queue. The device owns it until unqueued.
    fn queue_buffer(&mut self, handle: BufferHandle) -> Result<(), DeviceError>;

    /// Buffers currently in the source queue, played or not.
    fn buffers_queued(&self) -> usize;

    /// Queued buffers the source has finished playing.
    fn buffers_processed(&self) -> usize;

    /// Remove `count` buffers from the front of the queue and hand them back.
    fn unqueue_buffers(&mut self, count: usize) -> Result<Vec<BufferHandle>, DeviceError>;

    /// Release device memory for buffers that are no longer queued.
    fn delete_buffers(&mut self, handles: Vec<BufferHandle>);

    fn is_playing(&self) -> bool;

    fn play(&mut self) -> Result<(), DeviceError>;

    /// Halt the source. Every queued buffer counts as processed afterwards.
    fn stop(&mut self);

    /// Delete the source and release the context. Safe to call twice.
    fn close(&mut self);
}
