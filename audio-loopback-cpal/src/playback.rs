//! cpal playback source.
//!
//! The output stream runs for as long as the context is open and pulls from
//! a queue of submitted buffers. Buffers are marked processed once played but
//! stay queued until the owner unqueues them; when nothing unplayed remains
//! the source stops and outputs silence until `play()` is called again.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use parking_lot::Mutex;

use audio_loopback_core::models::audio_models::{BufferHandle, DeviceRole};
use audio_loopback_core::models::error::DeviceError;
use audio_loopback_core::traits::playback_device::PlaybackDevice;

use crate::pcm::{self, FromNormalized};

#[derive(Debug)]
struct StoredBuffer {
    samples: Vec<i16>,
    sample_rate: u32,
}

#[derive(Debug)]
struct QueueEntry {
    raw: u32,
    processed: bool,
}

/// Source state shared between the control thread and the output callback.
#[derive(Debug)]
pub(crate) struct SourceState {
    gain: f32,
    playing: bool,
    next_handle: u32,
    buffers: HashMap<u32, StoredBuffer>,
    queue: VecDeque<QueueEntry>,
    /// Read position inside the first unprocessed buffer, in source samples.
    cursor: f64,
}

impl SourceState {
    pub(crate) fn new() -> Self {
        Self {
            gain: 1.0,
            playing: false,
            next_handle: 1,
            buffers: HashMap::new(),
            queue: VecDeque::new(),
            cursor: 0.0,
        }
    }

    fn create_buffer(&mut self, samples: &[i16], sample_rate: u32) -> BufferHandle {
        let raw = self.next_handle;
        self.next_handle = self.next_handle.wrapping_add(1).max(1);
        self.buffers.insert(
            raw,
            StoredBuffer {
                samples: samples.to_vec(),
                sample_rate,
            },
        );
        BufferHandle::new(raw)
    }

    fn queue_buffer(&mut self, handle: BufferHandle) -> Result<(), DeviceError> {
        if !self.buffers.contains_key(&handle.raw()) {
            return Err(DeviceError::Backend(format!("unknown playback buffer {}", handle.raw())));
        }
        self.queue.push_back(QueueEntry {
            raw: handle.raw(),
            processed: false,
        });
        Ok(())
    }

    fn processed(&self) -> usize {
        self.queue.iter().take_while(|e| e.processed).count()
    }

    fn unqueue(&mut self, count: usize) -> Result<Vec<BufferHandle>, DeviceError> {
        let ready = self.processed();
        if count > ready {
            return Err(DeviceError::Backend(format!(
                "cannot unqueue {} buffers, {} processed",
                count, ready
            )));
        }
        Ok(self
            .queue
            .drain(..count)
            .map(|e| BufferHandle::new(e.raw))
            .collect())
    }

    fn delete(&mut self, handles: Vec<BufferHandle>) {
        for handle in handles {
            if self.queue.iter().any(|e| e.raw == handle.raw()) {
                log::warn!("refusing to delete queued playback buffer {}", handle.raw());
                continue;
            }
            self.buffers.remove(&handle.raw());
        }
    }

    fn halt(&mut self) {
        self.playing = false;
        self.cursor = 0.0;
        for entry in self.queue.iter_mut() {
            entry.processed = true;
        }
    }

    /// Produce the next mono output value at `output_rate`.
    ///
    /// Buffers recorded at a different rate are stepped through at
    /// `buffer_rate / output_rate` with linear interpolation.
    pub(crate) fn next_sample(&mut self, output_rate: u32) -> f32 {
        if !self.playing {
            return 0.0;
        }
        loop {
            let Some(entry) = self.queue.iter_mut().find(|e| !e.processed) else {
                self.playing = false;
                self.cursor = 0.0;
                return 0.0;
            };
            let Some(buffer) = self.buffers.get(&entry.raw) else {
                entry.processed = true;
                continue;
            };

            let index = self.cursor as usize;
            if index >= buffer.samples.len() {
                entry.processed = true;
                self.cursor -= buffer.samples.len() as f64;
                if self.cursor < 0.0 {
                    self.cursor = 0.0;
                }
                continue;
            }

            let fraction = (self.cursor - index as f64) as f32;
            let current = pcm::pcm16_to_f32(buffer.samples[index]);
            let next = buffer
                .samples
                .get(index + 1)
                .map(|&s| pcm::pcm16_to_f32(s))
                .unwrap_or(current);
            self.cursor += f64::from(buffer.sample_rate) / f64::from(output_rate.max(1));
            return (current + (next - current) * fraction) * self.gain;
        }
    }
}

/// Output context with one queued-buffer source.
pub struct CpalPlayback {
    stream: Option<cpal::Stream>,
    state: Arc<Mutex<SourceState>>,
    fault: Arc<Mutex<Option<String>>>,
}

impl CpalPlayback {
    /// Build and start an output stream on `device` in its default format.
    pub fn open(device: &cpal::Device) -> Result<Self, DeviceError> {
        let name = device.name().unwrap_or_else(|_| "default".to_string());
        let unavailable = |reason: String| DeviceError::unavailable(DeviceRole::Playback, name.as_str(), reason);

        let supported = device
            .default_output_config()
            .map_err(|e| unavailable(e.to_string()))?;
        let format = supported.sample_format();
        let config: StreamConfig = supported.config();

        let state = Arc::new(Mutex::new(SourceState::new()));
        let fault = Arc::new(Mutex::new(None));

        let stream = match format {
            SampleFormat::F32 => build_output::<f32>(device, &config, &state, &fault),
            SampleFormat::I16 => build_output::<i16>(device, &config, &state, &fault),
            SampleFormat::U16 => build_output::<u16>(device, &config, &state, &fault),
            other => return Err(unavailable(format!("unsupported output format {:?}", other))),
        }
        .map_err(|e| unavailable(e.to_string()))?;

        stream.play().map_err(|e| unavailable(e.to_string()))?;

        log::debug!(
            "playback '{}': {:?} x{} at {} Hz",
            name,
            format,
            config.channels,
            config.sample_rate.0
        );
        Ok(Self {
            stream: Some(stream),
            state,
            fault,
        })
    }

    fn check_fault(&self) -> Result<(), DeviceError> {
        if self.stream.is_none() {
            return Err(DeviceError::Backend("playback context is closed".into()));
        }
        match self.fault.lock().as_ref() {
            Some(reason) => Err(DeviceError::Disconnected(reason.clone())),
            None => Ok(()),
        }
    }
}

fn build_output<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    state: &Arc<Mutex<SourceState>>,
    fault: &Arc<Mutex<Option<String>>>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + FromNormalized,
{
    let state = Arc::clone(state);
    let fault = Arc::clone(fault);
    let channels = usize::from(config.channels);
    let output_rate = config.sample_rate.0;

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let mut source = state.lock();
            for frame in data.chunks_mut(channels) {
                let value = T::from_normalized(source.next_sample(output_rate));
                frame.fill(value);
            }
        },
        move |err| {
            log::error!("playback stream error: {}", err);
            if matches!(err, cpal::StreamError::DeviceNotAvailable) {
                *fault.lock() = Some(err.to_string());
            }
        },
        None,
    )
}

impl PlaybackDevice for CpalPlayback {
    fn set_gain(&mut self, gain: f32) {
        self.state.lock().gain = gain.max(0.0);
    }

    fn create_buffer(&mut self, samples: &[i16], sample_rate: u32) -> Result<BufferHandle, DeviceError> {
        self.check_fault()?;
        Ok(self.state.lock().create_buffer(samples, sample_rate))
    }

    fn queue_buffer(&mut self, handle: BufferHandle) -> Result<(), DeviceError> {
        self.check_fault()?;
        self.state.lock().queue_buffer(handle)
    }

    fn buffers_queued(&self) -> usize {
        self.state.lock().queue.len()
    }

    fn buffers_processed(&self) -> usize {
        self.state.lock().processed()
    }

    fn unqueue_buffers(&mut self, count: usize) -> Result<Vec<BufferHandle>, DeviceError> {
        self.state.lock().unqueue(count)
    }

    fn delete_buffers(&mut self, handles: Vec<BufferHandle>) {
        self.state.lock().delete(handles);
    }

    fn is_playing(&self) -> bool {
        self.state.lock().playing
    }

    fn play(&mut self) -> Result<(), DeviceError> {
        self.check_fault()?;
        self.state.lock().playing = true;
        Ok(())
    }

    fn stop(&mut self) {
        self.state.lock().halt();
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                log::debug!("pausing playback stream failed: {}", e);
            }
            drop(stream);
            let mut state = self.state.lock();
            state.halt();
            state.queue.clear();
            state.buffers.clear();
        }
    }
}

impl Drop for CpalPlayback {
    fn drop(&mut self) {
        self.close();
    }
}
