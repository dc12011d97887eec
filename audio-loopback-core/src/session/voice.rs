use crate::models::error::DeviceError;
use crate::traits::backend::AudioBackend;
use crate::traits::playback_device::PlaybackDevice;

/// Single playback source fed with captured buffers.
///
/// Buffer handles live on the device while queued. `reclaim` moves the ones
/// the device has finished with out of the queue and deletes them, so each
/// handle is either queued or being released, never both.
pub struct PlaybackVoice<P: PlaybackDevice> {
    device: Option<P>,
}

impl<P: PlaybackDevice> PlaybackVoice<P> {
    /// Create the output context and its source.
    pub fn open<B>(backend: &mut B) -> Result<Self, DeviceError>
    where
        B: AudioBackend<Playback = P>,
    {
        let device = backend.open_playback()?;
        log::info!("opened playback context");
        Ok(Self { device: Some(device) })
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn set_gain(&mut self, gain: f32) {
        if let Some(device) = self.device.as_mut() {
            device.set_gain(gain);
        }
    }

    pub fn queued_buffers(&self) -> usize {
        self.device.as_ref().map(|d| d.buffers_queued()).unwrap_or(0)
    }

    pub fn is_playing(&self) -> bool {
        self.device.as_ref().map(|d| d.is_playing()).unwrap_or(false)
    }

    /// Queue `samples` as one new device buffer and make sure the source plays.
    ///
    /// Restarting here is what resumes audio after the queue ran dry on
    /// empty capture reads. Empty input queues nothing.
    pub fn submit(&mut self, samples: &[i16], sample_rate: u32) -> Result<(), DeviceError> {
        let Some(device) = self.device.as_mut() else {
            return Err(DeviceError::Backend("playback voice is shut down".into()));
        };
        if samples.is_empty() {
            return Ok(());
        }

        let handle = device.create_buffer(samples, sample_rate)?;
        device.queue_buffer(handle)?;

        if !device.is_playing() {
            log::debug!("playback source idle, restarting");
            device.play()?;
        }
        Ok(())
    }

    /// Release buffers the device has finished playing.
    ///
    /// With `max_count == 0` this reclaims whatever the device reports as
    /// processed, and does nothing when that is zero. A non-zero `max_count`
    /// unqueues exactly that many (bounded by the queue length), which is how
    /// shutdown drains everything.
    pub fn reclaim(&mut self, max_count: usize) -> Result<usize, DeviceError> {
        let Some(device) = self.device.as_mut() else {
            return Ok(0);
        };

        let count = if max_count == 0 {
            device.buffers_processed()
        } else {
            max_count
        }
        .min(device.buffers_queued());
        if count == 0 {
            return Ok(0);
        }

        let freed = device.unqueue_buffers(count)?;
        let released = freed.len();
        device.delete_buffers(freed);
        Ok(released)
    }

    /// Stop playback, release every queued buffer, delete the source and
    /// the context. Returns the number of buffers reclaimed.
    ///
    /// Safe to call more than once; later calls return 0.
    pub fn shutdown(&mut self) -> usize {
        let Some(device) = self.device.as_mut() else {
            return 0;
        };

        device.stop();
        let queued = device.buffers_queued();
        let reclaimed = match self.reclaim(queued) {
            Ok(n) => n,
            Err(e) => {
                log::warn!("failed to reclaim {} playback buffers: {}", queued, e);
                0
            }
        };
        if reclaimed != queued {
            log::warn!("reclaimed {} of {} queued playback buffers", reclaimed, queued);
        }

        if let Some(mut device) = self.device.take() {
            device.close();
        }
        log::info!("closed playback context ({} buffers released)", reclaimed);
        reclaimed
    }
}

impl<P: PlaybackDevice> Drop for PlaybackVoice<P> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::mock::MockBackend;

    fn open_voice(backend: &mut MockBackend) -> PlaybackVoice<crate::mock::MockPlayback> {
        PlaybackVoice::open(backend).unwrap()
    }

    #[test]
    fn submit_queues_and_starts_playback() {
        let mut backend = MockBackend::default();
        let mut voice = open_voice(&mut backend);

        assert!(!voice.is_playing());
        voice.submit(&[1, 2, 3], 44100).unwrap();

        assert_eq!(voice.queued_buffers(), 1);
        assert!(voice.is_playing());
        assert_eq!(backend.play_calls(), 1);
    }

    #[test]
    fn submit_while_playing_does_not_restart() {
        let mut backend = MockBackend::default();
        let mut voice = open_voice(&mut backend);

        voice.submit(&[1; 10], 44100).unwrap();
        voice.submit(&[2; 10], 44100).unwrap();

        assert!(voice.is_playing());
        assert_eq!(backend.play_calls(), 1);
    }

    #[test]
    fn playback_resumes_after_queue_runs_dry() {
        let mut backend = MockBackend::default();
        let mut voice = open_voice(&mut backend);

        voice.submit(&[1; 10], 44100).unwrap();
        backend.complete_buffers(1);
        assert!(!voice.is_playing());

        voice.submit(&[2; 10], 44100).unwrap();
        assert!(voice.is_playing());
        assert_eq!(backend.play_calls(), 2);
    }

    #[test]
    fn empty_submit_is_ignored() {
        let mut backend = MockBackend::default();
        let mut voice = open_voice(&mut backend);

        voice.submit(&[], 44100).unwrap();

        assert_eq!(voice.queued_buffers(), 0);
        assert_eq!(backend.live_buffers(), 0);
    }

    #[test]
    fn reclaim_ready_is_noop_when_nothing_processed() {
        let mut backend = MockBackend::default();
        let mut voice = open_voice(&mut backend);
        voice.submit(&[1; 10], 44100).unwrap();

        assert_eq!(voice.reclaim(0).unwrap(), 0);
        assert_eq!(voice.queued_buffers(), 1);
        assert_eq!(backend.unqueue_calls(), 0);
    }

    #[test]
    fn reclaim_ready_releases_processed_only() {
        let mut backend = MockBackend::default();
        let mut voice = open_voice(&mut backend);
        for _ in 0..3 {
            voice.submit(&[1; 10], 44100).unwrap();
        }
        backend.complete_buffers(2);

        assert_eq!(voice.reclaim(0).unwrap(), 2);
        assert_eq!(voice.queued_buffers(), 1);
        assert_eq!(backend.live_buffers(), 1);
    }

    #[test]
    fn shutdown_reclaims_exactly_what_is_queued() {
        for submits in [0usize, 1, 2, 7, 32] {
            let mut backend = MockBackend::default();
            let mut voice = open_voice(&mut backend);
            for i in 0..submits {
                voice.submit(&[i as i16; 16], 44100).unwrap();
            }
            backend.complete_buffers(submits / 3);
            voice.reclaim(0).unwrap();

            let queued_before = voice.queued_buffers();
            let reclaimed = voice.shutdown();

            assert_eq!(reclaimed, queued_before);
            assert_eq!(backend.live_buffers(), 0);
            assert!(!backend.playback_open());
        }
    }

    #[test]
    fn shutdown_twice_is_harmless() {
        let mut backend = MockBackend::default();
        let mut voice = open_voice(&mut backend);
        voice.submit(&[1; 4], 44100).unwrap();

        assert_eq!(voice.shutdown(), 1);
        assert_eq!(voice.shutdown(), 0);
        assert_eq!(backend.playback_closes(), 1);
        assert!(voice.submit(&[1; 4], 44100).is_err());
    }

    #[test]
    fn gain_is_forwarded_to_device() {
        let mut backend = MockBackend::default();
        let mut voice = open_voice(&mut backend);

        voice.set_gain(0.25);

        assert_relative_eq!(backend.gain(), 0.25);
    }

    #[test]
    fn open_fails_without_output() {
        let mut backend = MockBackend::default();
        backend.set_playback_available(false);

        assert!(PlaybackVoice::open(&mut backend).is_err());
    }
}
