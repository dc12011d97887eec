//! In-memory devices for exercising the loopback pipeline without hardware.
//!
//! Every mock shares its state with the handle that created it, so a test can
//! keep the [`MockBackend`] (or scheduler, or observer) and inspect what the
//! controller did to the devices it was handed.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::models::audio_models::{AudioDevice, BufferHandle, DeviceRole};
use crate::models::error::{DeviceError, LoopbackError};
use crate::models::session_summary::SessionSummary;
use crate::models::state::StreamingState;
use crate::processing::ring_buffer::CaptureRing;
use crate::traits::backend::AudioBackend;
use crate::traits::capture_device::CaptureDevice;
use crate::traits::observer::StreamingObserver;
use crate::traits::playback_device::PlaybackDevice;
use crate::traits::scheduler::TickScheduler;

#[derive(Debug)]
struct QueuedBuffer {
    raw: u32,
    processed: bool,
}

#[derive(Debug)]
struct MockAudio {
    capture_devices: Vec<String>,
    playback_available: bool,

    capture_ring: Option<CaptureRing>,
    capture_running: bool,
    capture_fault: Option<DeviceError>,
    capture_start_fault: Option<DeviceError>,
    capture_opened_with: Option<(String, u32, usize)>,

    playback_open: bool,
    playback_opens: usize,
    playback_closes: usize,
    gain: f32,
    playing: bool,
    play_calls: usize,
    unqueue_calls: usize,
    next_handle: u32,
    buffers: HashMap<u32, Vec<i16>>,
    queue: VecDeque<QueuedBuffer>,
    submitted_lengths: Vec<usize>,
}

impl Default for MockAudio {
    fn default() -> Self {
        Self {
            capture_devices: vec!["Mock Microphone".to_string()],
            playback_available: true,
            capture_ring: None,
            capture_running: false,
            capture_fault: None,
            capture_start_fault: None,
            capture_opened_with: None,
            playback_open: false,
            playback_opens: 0,
            playback_closes: 0,
            gain: 1.0,
            playing: false,
            play_calls: 0,
            unqueue_calls: 0,
            next_handle: 1,
            buffers: HashMap::new(),
            queue: VecDeque::new(),
            submitted_lengths: Vec::new(),
        }
    }
}

/// Backend whose devices live in memory.
///
/// The default backend exposes one capture device, "Mock Microphone", and a
/// working playback context.
#[derive(Clone, Default)]
pub struct MockBackend {
    audio: Arc<Mutex<MockAudio>>,
}

impl MockBackend {
    pub fn with_capture_devices(names: &[&str]) -> Self {
        let backend = Self::default();
        backend.audio.lock().capture_devices = names.iter().map(|n| n.to_string()).collect();
        backend
    }

    pub fn set_playback_available(&self, available: bool) {
        self.audio.lock().playback_available = available;
    }

    /// Feed samples into the open capture device's ring.
    ///
    /// Ignored unless a capture device is open and started.
    pub fn push_samples(&self, samples: &[i16]) {
        let mut audio = self.audio.lock();
        if !audio.capture_running {
            return;
        }
        if let Some(ring) = audio.capture_ring.as_mut() {
            ring.write(samples);
        }
    }

    /// Make the next capture query fail as if the device was unplugged.
    pub fn disconnect_capture(&self) {
        self.audio.lock().capture_fault = Some(DeviceError::Disconnected("mock capture unplugged".into()));
    }

    /// Make the capture device open fine but refuse to start.
    pub fn fail_capture_start(&self) {
        self.audio.lock().capture_start_fault = Some(DeviceError::Backend("mock capture refused to start".into()));
    }

    /// Mark up to `count` unplayed buffers at the front of the queue as played.
    /// The source stops once nothing unplayed remains.
    pub fn complete_buffers(&self, count: usize) {
        let mut audio = self.audio.lock();
        for buffer in audio.queue.iter_mut().filter(|b| !b.processed).take(count) {
            buffer.processed = true;
        }
        if audio.queue.iter().all(|b| b.processed) {
            audio.playing = false;
        }
    }

    pub fn capture_open(&self) -> bool {
        self.audio.lock().capture_ring.is_some()
    }

    pub fn capture_running(&self) -> bool {
        self.audio.lock().capture_running
    }

    /// Device name, rate and ring length of the last capture open.
    pub fn capture_opened_with(&self) -> Option<(String, u32, usize)> {
        self.audio.lock().capture_opened_with.clone()
    }

    pub fn playback_open(&self) -> bool {
        self.audio.lock().playback_open
    }

    pub fn playback_opens(&self) -> usize {
        self.audio.lock().playback_opens
    }

    pub fn playback_closes(&self) -> usize {
        self.audio.lock().playback_closes
    }

    pub fn gain(&self) -> f32 {
        self.audio.lock().gain
    }

    pub fn is_playing(&self) -> bool {
        self.audio.lock().playing
    }

    pub fn play_calls(&self) -> usize {
        self.audio.lock().play_calls
    }

    pub fn unqueue_calls(&self) -> usize {
        self.audio.lock().unqueue_calls
    }

    pub fn queued(&self) -> usize {
        self.audio.lock().queue.len()
    }

    /// Buffers created and not yet deleted.
    pub fn live_buffers(&self) -> usize {
        self.audio.lock().buffers.len()
    }

    /// Sample count of every buffer created, in order.
    pub fn submitted_lengths(&self) -> Vec<usize> {
        self.audio.lock().submitted_lengths.clone()
    }
}

impl AudioBackend for MockBackend {
    type Capture = MockCapture;
    type Playback = MockPlayback;

    fn open_playback(&mut self) -> Result<MockPlayback, DeviceError> {
        let mut audio = self.audio.lock();
        if !audio.playback_available {
            return Err(DeviceError::unavailable(DeviceRole::Playback, "mock output", "no output device"));
        }
        if audio.playback_open {
            return Err(DeviceError::unavailable(DeviceRole::Playback, "mock output", "context already open"));
        }
        audio.playback_open = true;
        audio.playback_opens += 1;
        audio.playing = false;
        Ok(MockPlayback {
            audio: Arc::clone(&self.audio),
            closed: false,
        })
    }

    fn open_capture(
        &mut self,
        device_name: &str,
        sample_rate: u32,
        buffer_len_samples: usize,
    ) -> Result<MockCapture, DeviceError> {
        let mut audio = self.audio.lock();
        if !audio.capture_devices.iter().any(|n| n == device_name) {
            return Err(DeviceError::unavailable(DeviceRole::Capture, device_name, "no such device"));
        }
        if audio.capture_ring.is_some() {
            return Err(DeviceError::unavailable(DeviceRole::Capture, device_name, "device in use"));
        }
        audio.capture_ring = Some(CaptureRing::new(buffer_len_samples));
        audio.capture_fault = None;
        audio.capture_opened_with = Some((device_name.to_string(), sample_rate, buffer_len_samples));
        Ok(MockCapture {
            audio: Arc::clone(&self.audio),
            sample_rate,
        })
    }

    fn capture_devices(&self) -> Result<Vec<AudioDevice>, DeviceError> {
        let audio = self.audio.lock();
        Ok(audio
            .capture_devices
            .iter()
            .enumerate()
            .map(|(i, name)| AudioDevice::capture(name.clone(), i == 0))
            .collect())
    }
}

/// Capture device fed by [`MockBackend::push_samples`].
pub struct MockCapture {
    audio: Arc<Mutex<MockAudio>>,
    sample_rate: u32,
}

impl CaptureDevice for MockCapture {
    fn start(&mut self) -> Result<(), DeviceError> {
        let mut audio = self.audio.lock();
        if let Some(fault) = &audio.capture_start_fault {
            return Err(fault.clone());
        }
        audio.capture_running = true;
        Ok(())
    }

    fn stop(&mut self) -> Result<(), DeviceError> {
        self.audio.lock().capture_running = false;
        Ok(())
    }

    fn available_samples(&self) -> Result<usize, DeviceError> {
        let audio = self.audio.lock();
        if let Some(fault) = &audio.capture_fault {
            return Err(fault.clone());
        }
        Ok(audio.capture_ring.as_ref().map(CaptureRing::count).unwrap_or(0))
    }

    fn read_samples(&mut self, dest: &mut [i16]) -> Result<usize, DeviceError> {
        let mut audio = self.audio.lock();
        if let Some(fault) = &audio.capture_fault {
            return Err(fault.clone());
        }
        Ok(audio.capture_ring.as_mut().map(|r| r.read_into(dest)).unwrap_or(0))
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }
}

impl Drop for MockCapture {
    fn drop(&mut self) {
        let mut audio = self.audio.lock();
        audio.capture_ring = None;
        audio.capture_running = false;
    }
}

/// Playback source that only plays when told to via [`MockBackend::complete_buffers`].
pub struct MockPlayback {
    audio: Arc<Mutex<MockAudio>>,
    closed: bool,
}

impl PlaybackDevice for MockPlayback {
    fn set_gain(&mut self, gain: f32) {
        self.audio.lock().gain = gain;
    }

    fn create_buffer(&mut self, samples: &[i16], _sample_rate: u32) -> Result<BufferHandle, DeviceError> {
        let mut audio = self.audio.lock();
        let raw = audio.next_handle;
        audio.next_handle += 1;
        audio.buffers.insert(raw, samples.to_vec());
        audio.submitted_lengths.push(samples.len());
        Ok(BufferHandle::new(raw))
    }

    fn queue_buffer(&mut self, handle: BufferHandle) -> Result<(), DeviceError> {
        let mut audio = self.audio.lock();
        if !audio.buffers.contains_key(&handle.raw()) {
            return Err(DeviceError::Backend(format!("unknown buffer {}", handle.raw())));
        }
        audio.queue.push_back(QueuedBuffer {
            raw: handle.raw(),
            processed: false,
        });
        Ok(())
    }

    fn buffers_queued(&self) -> usize {
        self.audio.lock().queue.len()
    }

    fn buffers_processed(&self) -> usize {
        self.audio.lock().queue.iter().filter(|b| b.processed).count()
    }

    fn unqueue_buffers(&mut self, count: usize) -> Result<Vec<BufferHandle>, DeviceError> {
        let mut audio = self.audio.lock();
        audio.unqueue_calls += 1;
        let ready = audio.queue.iter().take_while(|b| b.processed).count();
        if count > ready {
            return Err(DeviceError::Backend(format!(
                "cannot unqueue {} buffers, only {} processed",
                count, ready
            )));
        }
        Ok(audio
            .queue
            .drain(..count)
            .map(|b| BufferHandle::new(b.raw))
            .collect())
    }

    fn delete_buffers(&mut self, handles: Vec<BufferHandle>) {
        let mut audio = self.audio.lock();
        for handle in handles {
            audio.buffers.remove(&handle.raw());
        }
    }

    fn is_playing(&self) -> bool {
        self.audio.lock().playing
    }

    fn play(&mut self) -> Result<(), DeviceError> {
        let mut audio = self.audio.lock();
        audio.playing = true;
        audio.play_calls += 1;
        Ok(())
    }

    fn stop(&mut self) {
        let mut audio = self.audio.lock();
        audio.playing = false;
        for buffer in audio.queue.iter_mut() {
            buffer.processed = true;
        }
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        let mut audio = self.audio.lock();
        audio.playback_open = false;
        audio.playback_closes += 1;
        audio.playing = false;
    }
}

impl Drop for MockPlayback {
    fn drop(&mut self) {
        self.close();
    }
}

#[derive(Debug, Default)]
struct SchedulerLog {
    interval: Option<Duration>,
    schedules: usize,
    cancels: usize,
}

/// Scheduler that records what it was asked to do. Ticks are driven by hand.
#[derive(Clone, Default)]
pub struct MockScheduler {
    log: Arc<Mutex<SchedulerLog>>,
}

impl MockScheduler {
    /// Interval of the currently armed tick, if any.
    pub fn interval(&self) -> Option<Duration> {
        self.log.lock().interval
    }

    pub fn schedules(&self) -> usize {
        self.log.lock().schedules
    }

    pub fn cancels(&self) -> usize {
        self.log.lock().cancels
    }
}

impl TickScheduler for MockScheduler {
    fn schedule(&mut self, interval: Duration) {
        let mut log = self.log.lock();
        log.interval = Some(interval);
        log.schedules += 1;
    }

    fn cancel(&mut self) {
        let mut log = self.log.lock();
        log.interval = None;
        log.cancels += 1;
    }
}

/// Observer notification, as captured by [`RecordingObserver`].
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    StateChanged(StreamingState),
    SamplesConsumed(usize),
    FatalError(LoopbackError),
    RecoverableError(LoopbackError),
    SessionFinished(SessionSummary),
}

/// Observer that keeps every notification in order.
#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ObserverEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<ObserverEvent> {
        self.events.lock().clone()
    }

    pub fn samples_consumed(&self) -> Vec<usize> {
        self.events
            .lock()
            .iter()
            .filter_map(|e| match e {
                ObserverEvent::SamplesConsumed(n) => Some(*n),
                _ => None,
            })
            .collect()
    }
}

impl StreamingObserver for RecordingObserver {
    fn on_state_changed(&self, state: StreamingState) {
        self.events.lock().push(ObserverEvent::StateChanged(state));
    }

    fn on_samples_consumed(&self, samples: usize) {
        self.events.lock().push(ObserverEvent::SamplesConsumed(samples));
    }

    fn on_fatal_error(&self, error: &LoopbackError) {
        self.events.lock().push(ObserverEvent::FatalError(error.clone()));
    }

    fn on_recoverable_error(&self, error: &LoopbackError) {
        self.events.lock().push(ObserverEvent::RecoverableError(error.clone()));
    }

    fn on_session_finished(&self, summary: &SessionSummary) {
        self.events.lock().push(ObserverEvent::SessionFinished(summary.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_ring_respects_buffer_length() {
        let mut backend = MockBackend::default();
        let mut capture = backend.open_capture("Mock Microphone", 8000, 4).unwrap();
        capture.start().unwrap();

        backend.push_samples(&[1, 2, 3, 4, 5, 6]);

        assert_eq!(capture.available_samples().unwrap(), 4);
    }

    #[test]
    fn second_capture_open_is_refused() {
        let mut backend = MockBackend::default();
        let _first = backend.open_capture("Mock Microphone", 8000, 16).unwrap();

        assert!(backend.open_capture("Mock Microphone", 8000, 16).is_err());
    }

    #[test]
    fn unqueue_refuses_unplayed_buffers() {
        let mut backend = MockBackend::default();
        let mut playback = backend.open_playback().unwrap();
        let handle = playback.create_buffer(&[1, 2], 8000).unwrap();
        playback.queue_buffer(handle).unwrap();

        assert!(playback.unqueue_buffers(1).is_err());

        playback.stop();
        assert_eq!(playback.unqueue_buffers(1).unwrap().len(), 1);
    }
}
