use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use audio_loopback_core::{LoopbackError, SessionSummary, StreamingObserver, StreamingState, TickScheduler};

use crate::commands::Command;

/// Everything the control loop reacts to, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Tick,
    Command(Command),
    InputClosed,
}

/// Tick source backed by a timer thread.
///
/// Ticks are posted to the control loop's channel rather than run on the
/// timer thread, so they are serialized with start/stop. The timer waits on
/// a stop channel between ticks; dropping the sender ends it immediately.
pub struct TimerScheduler {
    events: Sender<AppEvent>,
    stop_timer: Option<Sender<()>>,
}

impl TimerScheduler {
    pub fn new(events: Sender<AppEvent>) -> Self {
        Self {
            events,
            stop_timer: None,
        }
    }
}

impl TickScheduler for TimerScheduler {
    fn schedule(&mut self, interval: Duration) {
        self.cancel();

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let events = self.events.clone();

        let spawned = thread::Builder::new()
            .name("loopback-tick".into())
            .spawn(move || loop {
                match stop_rx.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if events.send(AppEvent::Tick).is_err() {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            });

        match spawned {
            Ok(_) => self.stop_timer = Some(stop_tx),
            Err(e) => log::error!("failed to spawn tick thread: {}", e),
        }
    }

    /// Returns without waiting for the timer thread. A tick already in the
    /// channel is delivered and finds the controller idle.
    fn cancel(&mut self) {
        self.stop_timer = None;
    }
}

/// StreamingObserver that reports to the console and the log.
pub struct ConsoleObserver;

impl ConsoleObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self)
    }
}

impl StreamingObserver for ConsoleObserver {
    fn on_state_changed(&self, state: StreamingState) {
        let label = match state {
            StreamingState::Idle => "Start Recording",
            StreamingState::Recording => "Stop Recording",
        };
        println!("[{}] press enter to {}", state, label.to_lowercase());
    }

    fn on_samples_consumed(&self, samples: usize) {
        log::debug!("Samples consumed: {}", samples);
    }

    fn on_fatal_error(&self, error: &LoopbackError) {
        eprintln!("Fatal: {}", error);
    }

    fn on_recoverable_error(&self, error: &LoopbackError) {
        eprintln!("{}", error);
    }

    fn on_session_finished(&self, summary: &SessionSummary) {
        match serde_json::to_string_pretty(summary) {
            Ok(json) => println!("{}", json),
            Err(e) => log::warn!("failed to serialize session summary: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    fn assert_quiet(rx: &mpsc::Receiver<AppEvent>) {
        // let a tick that was already past its wait land, then expect silence
        thread::sleep(Duration::from_millis(20));
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(20));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn scheduler_posts_ticks_until_cancelled() {
        let (tx, rx) = mpsc::channel();
        let mut scheduler = TimerScheduler::new(tx);

        scheduler.schedule(Duration::from_millis(2));
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(first, AppEvent::Tick);

        scheduler.cancel();
        assert_quiet(&rx);
    }

    #[test]
    fn rescheduling_replaces_the_old_timer() {
        let (tx, rx) = mpsc::channel();
        let mut scheduler = TimerScheduler::new(tx);

        scheduler.schedule(Duration::from_millis(1));
        scheduler.schedule(Duration::from_millis(1));
        assert_eq!(rx.recv_timeout(Duration::from_secs(2)).unwrap(), AppEvent::Tick);

        scheduler.cancel();
        assert_quiet(&rx);
    }

    #[test]
    fn cancel_does_not_wait_for_the_timer() {
        let (tx, rx) = mpsc::channel();
        let mut scheduler = TimerScheduler::new(tx);
        scheduler.schedule(Duration::from_secs(30));

        let started = Instant::now();
        scheduler.cancel();

        assert!(started.elapsed() < Duration::from_secs(1));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }
}
