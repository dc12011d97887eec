use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::models::audio_models::{AudioDevice, SessionDiagnostics};
use crate::models::config::LoopbackConfiguration;
use crate::models::error::{DeviceError, LoopbackError};
use crate::models::session_summary::SessionSummary;
use crate::models::state::StreamingState;
use crate::processing::sample_pool::SampleBufferPool;
use crate::session::capture::CaptureSession;
use crate::session::voice::PlaybackVoice;
use crate::traits::backend::AudioBackend;
use crate::traits::observer::StreamingObserver;
use crate::traits::scheduler::TickScheduler;

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// The controller is idle; nothing was touched.
    NotRecording,
    /// Capture had nothing ready. Only reclamation ran.
    Empty { reclaimed: usize },
    /// `samples` were queued for playback as one buffer.
    Consumed { samples: usize, reclaimed: usize },
    /// A device failed mid-session and the controller returned to idle.
    DeviceLost,
}

/// Devices and buffers owned for the duration of one recording session.
struct ActiveSession<B: AudioBackend> {
    capture: CaptureSession<B::Capture>,
    voice: PlaybackVoice<B::Playback>,
    pool: SampleBufferPool,
    diagnostics: SessionDiagnostics,
    started_at: DateTime<Utc>,
    sample_rate: u32,
}

/// Drives the capture → playback loop.
///
/// ```text
/// [CaptureSession] ─available/read─▶ [SampleBufferPool] ─submit─▶ [PlaybackVoice]
///        ▲                                                             │
///        └──────────── on_tick() (every buffer_duration / 2) ◀── reclaim(0)
/// ```
///
/// Single-threaded: start, stop and ticks must come from one control thread.
/// Device contexts are created by `start()` and released by `stop()`; the
/// backend is injected so several controllers can coexist in tests.
pub struct StreamingController<B: AudioBackend, S: TickScheduler> {
    backend: B,
    scheduler: S,
    config: LoopbackConfiguration,
    observer: Option<Arc<dyn StreamingObserver>>,
    state: StreamingState,
    session: Option<ActiveSession<B>>,
}

impl<B: AudioBackend, S: TickScheduler> StreamingController<B, S> {
    pub fn new(backend: B, scheduler: S, config: LoopbackConfiguration) -> Self {
        Self {
            backend,
            scheduler,
            config,
            observer: None,
            state: StreamingState::Idle,
            session: None,
        }
    }

    pub fn set_observer(&mut self, observer: Arc<dyn StreamingObserver>) {
        self.observer = Some(observer);
    }

    pub fn state(&self) -> StreamingState {
        self.state
    }

    pub fn config(&self) -> &LoopbackConfiguration {
        &self.config
    }

    /// Counters of the running session, if any.
    pub fn diagnostics(&self) -> Option<SessionDiagnostics> {
        self.session.as_ref().map(|s| s.diagnostics.clone())
    }

    /// Playback buffers currently queued on the device.
    pub fn queued_buffers(&self) -> usize {
        self.session.as_ref().map(|s| s.voice.queued_buffers()).unwrap_or(0)
    }

    /// Current staging array size, if recording.
    pub fn pool_capacity(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.pool.capacity())
    }

    /// Capture devices with a usable name. The first entry is the default pick.
    pub fn available_capture_devices(&self) -> Result<Vec<AudioDevice>, DeviceError> {
        let devices = self.backend.capture_devices()?;
        Ok(devices.into_iter().filter(|d| !d.name.is_empty()).collect())
    }

    /// Replace the configuration snapshot. Only allowed while idle.
    pub fn configure(&mut self, config: LoopbackConfiguration) -> Result<(), LoopbackError> {
        if self.state.is_recording() {
            return Err(LoopbackError::ConfigurationFailed(
                "cannot reconfigure while recording".into(),
            ));
        }
        config.validate().map_err(LoopbackError::ConfigurationFailed)?;
        self.config = config;
        Ok(())
    }

    /// Open playback and capture, arm the tick, and enter `Recording`.
    ///
    /// A no-op while already recording. Playback failure is fatal and
    /// reported through `on_fatal_error`; capture failure releases playback
    /// and is reported through `on_recoverable_error`. Either way the
    /// controller stays idle.
    pub fn start(&mut self) -> Result<(), LoopbackError> {
        if self.state.is_recording() {
            log::debug!("start requested while recording, ignoring");
            return Ok(());
        }

        if let Err(reason) = self.config.validate() {
            let err = LoopbackError::ConfigurationFailed(reason);
            self.report_recoverable(&err);
            return Err(err);
        }

        let mut voice = match PlaybackVoice::open(&mut self.backend) {
            Ok(voice) => voice,
            Err(e) => {
                let err = LoopbackError::PlaybackUnavailable(e);
                log::error!("{}", err);
                if let Some(ref observer) = self.observer {
                    observer.on_fatal_error(&err);
                }
                return Err(err);
            }
        };
        voice.set_gain(self.config.playback_gain);

        let sample_rate = self.config.sampling_rate_hz;
        let buffer_len = self.config.buffer_length_samples();
        let device_name = self.config.recording_device_name.clone();

        let opened = CaptureSession::open(&mut self.backend, &device_name, sample_rate, buffer_len)
            .and_then(|mut capture| capture.start().map(|()| capture));
        let capture = match opened {
            Ok(capture) => capture,
            Err(e) => {
                voice.shutdown();
                let err = LoopbackError::CaptureUnavailable(e);
                self.report_recoverable(&err);
                return Err(err);
            }
        };

        let interval = self.config.tick_interval();
        self.session = Some(ActiveSession {
            sample_rate: capture.sample_rate(),
            capture,
            voice,
            pool: SampleBufferPool::new(self.config.max_pool_samples),
            diagnostics: SessionDiagnostics::default(),
            started_at: Utc::now(),
        });
        self.scheduler.schedule(interval);
        log::info!(
            "recording from '{}': {} samples per buffer, tick every {:?}",
            device_name,
            buffer_len,
            interval
        );
        self.set_state(StreamingState::Recording);
        Ok(())
    }

    /// Move whatever capture has ready into one playback buffer, then
    /// release buffers the device has finished with.
    pub fn on_tick(&mut self) -> TickOutcome {
        let Some(session) = self.session.as_mut() else {
            return TickOutcome::NotRecording;
        };

        match Self::pump(session) {
            Ok(outcome) => {
                if let (TickOutcome::Consumed { samples, .. }, Some(observer)) = (outcome, &self.observer) {
                    observer.on_samples_consumed(samples);
                }
                outcome
            }
            Err(e) => {
                self.abort(LoopbackError::DeviceLost(e));
                TickOutcome::DeviceLost
            }
        }
    }

    /// Cancel the tick, release every device resource, and return to `Idle`.
    ///
    /// A no-op while idle.
    pub fn stop(&mut self) -> Option<SessionSummary> {
        if self.state.is_idle() {
            return None;
        }
        self.scheduler.cancel();
        let summary = self.teardown();
        self.set_state(StreamingState::Idle);
        self.finish(summary)
    }

    /// Start when idle, stop when recording. Returns the resulting state.
    pub fn toggle(&mut self) -> Result<StreamingState, LoopbackError> {
        match self.state {
            StreamingState::Idle => self.start()?,
            StreamingState::Recording => {
                self.stop();
            }
        }
        Ok(self.state)
    }

    // --- Internal helpers ---

    fn pump(session: &mut ActiveSession<B>) -> Result<TickOutcome, DeviceError> {
        session.diagnostics.ticks += 1;

        let available = session.capture.available_samples()?;
        if available > session.pool.capacity() && session.pool.ensure_capacity(available) {
            session.diagnostics.pool_growths += 1;
        }

        let mut consumed = 0;
        if available > 0 {
            consumed = session.capture.read_into(&mut session.pool, available)?;
            if consumed > 0 {
                session.voice.submit(session.pool.view(consumed), session.sample_rate)?;
                session.diagnostics.buffers_submitted += 1;
                session.diagnostics.samples_consumed += consumed as u64;
            }
        }
        if consumed == 0 {
            session.diagnostics.empty_ticks += 1;
        }

        let reclaimed = session.voice.reclaim(0)?;
        session.diagnostics.buffers_reclaimed += reclaimed as u64;

        Ok(if consumed > 0 {
            TickOutcome::Consumed {
                samples: consumed,
                reclaimed,
            }
        } else {
            TickOutcome::Empty { reclaimed }
        })
    }

    /// Release devices in capture → playback order and summarise the session.
    fn teardown(&mut self) -> Option<SessionSummary> {
        let mut session = self.session.take()?;

        session.capture.close();
        let reclaimed = session.voice.shutdown();
        session.diagnostics.buffers_reclaimed += reclaimed as u64;

        Some(SessionSummary::new(
            session.started_at,
            session.capture.device_name(),
            session.sample_rate,
            session.diagnostics,
        ))
    }

    fn abort(&mut self, error: LoopbackError) {
        log::warn!("ending session: {}", error);
        self.scheduler.cancel();
        let summary = self.teardown();
        self.set_state(StreamingState::Idle);
        self.report_recoverable(&error);
        self.finish(summary);
    }

    fn finish(&self, summary: Option<SessionSummary>) -> Option<SessionSummary> {
        if let (Some(summary), Some(observer)) = (&summary, &self.observer) {
            observer.on_session_finished(summary);
        }
        summary
    }

    fn report_recoverable(&self, error: &LoopbackError) {
        log::warn!("{}", error);
        if let Some(ref observer) = self.observer {
            observer.on_recoverable_error(error);
        }
    }

    fn set_state(&mut self, new_state: StreamingState) {
        if self.state == new_state {
            return;
        }
        log::debug!("streaming state {} -> {}", self.state, new_state);
        self.state = new_state;
        if let Some(ref observer) = self.observer {
            observer.on_state_changed(new_state);
        }
    }
}

impl<B: AudioBackend, S: TickScheduler> Drop for StreamingController<B, S> {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockBackend, MockScheduler, ObserverEvent, RecordingObserver};

    type Controller = StreamingController<MockBackend, MockScheduler>;

    fn controller(backend: &MockBackend, scheduler: &MockScheduler) -> Controller {
        let config = LoopbackConfiguration {
            recording_device_name: "Mock Microphone".into(),
            ..Default::default()
        };
        StreamingController::new(backend.clone(), scheduler.clone(), config)
    }

    #[test]
    fn start_while_recording_is_noop() {
        let backend = MockBackend::default();
        let scheduler = MockScheduler::default();
        let mut ctl = controller(&backend, &scheduler);

        ctl.start().unwrap();
        ctl.start().unwrap();

        assert_eq!(backend.playback_opens(), 1);
        assert_eq!(scheduler.schedules(), 1);
        assert!(ctl.state().is_recording());
    }

    #[test]
    fn invalid_config_refuses_to_start() {
        let backend = MockBackend::default();
        let scheduler = MockScheduler::default();
        let mut ctl = StreamingController::new(
            backend.clone(),
            scheduler.clone(),
            LoopbackConfiguration {
                sampling_rate_hz: 0,
                ..Default::default()
            },
        );

        let err = ctl.start().unwrap_err();

        assert!(matches!(err, LoopbackError::ConfigurationFailed(_)));
        assert_eq!(backend.playback_opens(), 0);
        assert!(ctl.state().is_idle());
    }

    #[test]
    fn capture_start_failure_releases_both_devices() {
        let backend = MockBackend::default();
        backend.fail_capture_start();
        let scheduler = MockScheduler::default();
        let observer = RecordingObserver::new();
        let mut ctl = controller(&backend, &scheduler);
        ctl.set_observer(observer.clone());

        let err = ctl.start().unwrap_err();

        assert!(matches!(err, LoopbackError::CaptureUnavailable(DeviceError::Backend(_))));
        assert!(ctl.state().is_idle());
        assert!(!backend.capture_open());
        assert!(!backend.capture_running());
        assert_eq!(backend.playback_opens(), 1);
        assert_eq!(backend.playback_closes(), 1);
        assert!(!backend.playback_open());
        assert_eq!(scheduler.schedules(), 0);
        assert!(matches!(
            observer.events().as_slice(),
            [ObserverEvent::RecoverableError(LoopbackError::CaptureUnavailable(_))]
        ));
    }

    #[test]
    fn configure_rejected_while_recording() {
        let backend = MockBackend::default();
        let scheduler = MockScheduler::default();
        let mut ctl = controller(&backend, &scheduler);
        ctl.start().unwrap();

        let result = ctl.configure(LoopbackConfiguration::default());
        assert!(matches!(result, Err(LoopbackError::ConfigurationFailed(_))));

        ctl.stop();
        let config = LoopbackConfiguration {
            recording_device_name: "Other".into(),
            playback_gain: 0.5,
            ..Default::default()
        };
        ctl.configure(config).unwrap();
        assert_eq!(ctl.config().recording_device_name, "Other");
    }

    #[test]
    fn toggle_flips_between_states() {
        let backend = MockBackend::default();
        let scheduler = MockScheduler::default();
        let mut ctl = controller(&backend, &scheduler);

        assert_eq!(ctl.toggle().unwrap(), StreamingState::Recording);
        assert_eq!(ctl.toggle().unwrap(), StreamingState::Idle);
        assert!(!backend.capture_open());
        assert!(!backend.playback_open());
    }

    #[test]
    fn tick_while_idle_touches_nothing() {
        let backend = MockBackend::default();
        let scheduler = MockScheduler::default();
        let mut ctl = controller(&backend, &scheduler);

        assert_eq!(ctl.on_tick(), TickOutcome::NotRecording);
        assert_eq!(backend.unqueue_calls(), 0);
    }

    #[test]
    fn pool_grows_for_large_reads() {
        let backend = MockBackend::default();
        let scheduler = MockScheduler::default();
        let mut ctl = controller(&backend, &scheduler);
        ctl.start().unwrap();
        assert_eq!(ctl.pool_capacity(), Some(512));

        backend.push_samples(&vec![3; 3000]);
        ctl.on_tick();

        assert_eq!(ctl.pool_capacity(), Some(4096));
        assert_eq!(ctl.diagnostics().unwrap().pool_growths, 1);
        assert_eq!(backend.submitted_lengths(), vec![3000]);
    }

    #[test]
    fn pool_bound_leaves_remainder_for_next_tick() {
        let backend = MockBackend::default();
        let scheduler = MockScheduler::default();
        let mut ctl = controller(&backend, &scheduler);
        ctl.configure(LoopbackConfiguration {
            recording_device_name: "Mock Microphone".into(),
            max_pool_samples: 1000,
            ..Default::default()
        })
        .unwrap();
        ctl.start().unwrap();

        backend.push_samples(&vec![1; 2500]);
        ctl.on_tick();
        ctl.on_tick();
        ctl.on_tick();

        assert_eq!(backend.submitted_lengths(), vec![1000, 1000, 500]);
    }

    #[test]
    fn reclaims_processed_buffers_each_tick() {
        let backend = MockBackend::default();
        let scheduler = MockScheduler::default();
        let mut ctl = controller(&backend, &scheduler);
        ctl.start().unwrap();

        backend.push_samples(&[1; 100]);
        ctl.on_tick();
        backend.push_samples(&[1; 100]);
        ctl.on_tick();
        backend.complete_buffers(1);

        assert_eq!(ctl.on_tick(), TickOutcome::Empty { reclaimed: 1 });
        assert_eq!(ctl.queued_buffers(), 1);
        assert_eq!(backend.live_buffers(), 1);
    }

    #[test]
    fn capture_disconnect_ends_session() {
        let backend = MockBackend::default();
        let scheduler = MockScheduler::default();
        let observer = RecordingObserver::new();
        let mut ctl = controller(&backend, &scheduler);
        ctl.set_observer(observer.clone());
        ctl.start().unwrap();
        backend.push_samples(&[1; 50]);
        ctl.on_tick();

        backend.disconnect_capture();

        assert_eq!(ctl.on_tick(), TickOutcome::DeviceLost);
        assert!(ctl.state().is_idle());
        assert!(!backend.capture_open());
        assert!(!backend.playback_open());
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(scheduler.interval(), None);
        assert!(observer
            .events()
            .iter()
            .any(|e| matches!(e, ObserverEvent::RecoverableError(LoopbackError::DeviceLost(_)))));
    }

    #[test]
    fn dropping_controller_releases_devices() {
        let backend = MockBackend::default();
        let scheduler = MockScheduler::default();
        {
            let mut ctl = controller(&backend, &scheduler);
            ctl.start().unwrap();
            backend.push_samples(&[1; 10]);
            ctl.on_tick();
        }
        assert!(!backend.capture_open());
        assert!(!backend.playback_open());
        assert_eq!(backend.live_buffers(), 0);
        assert_eq!(scheduler.cancels(), 1);
    }

    #[test]
    fn lists_named_capture_devices() {
        let backend = MockBackend::with_capture_devices(&["", "Line In", "USB Mic"]);
        let ctl = controller(&backend, &MockScheduler::default());

        let names: Vec<String> = ctl
            .available_capture_devices()
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();

        assert_eq!(names, vec!["Line In", "USB Mic"]);
    }

    #[test]
    fn summary_carries_session_counters() {
        let backend = MockBackend::default();
        let scheduler = MockScheduler::default();
        let mut ctl = controller(&backend, &scheduler);
        ctl.start().unwrap();
        backend.push_samples(&[1; 700]);
        ctl.on_tick();
        ctl.on_tick();

        let summary = ctl.stop().unwrap();

        assert_eq!(summary.device_name, "Mock Microphone");
        assert_eq!(summary.sample_rate, 44100);
        assert_eq!(summary.diagnostics.ticks, 2);
        assert_eq!(summary.diagnostics.empty_ticks, 1);
        assert_eq!(summary.diagnostics.samples_consumed, 700);
        assert_eq!(summary.diagnostics.buffers_submitted, 1);
        assert_eq!(summary.diagnostics.buffers_reclaimed, 1);
    }
}
