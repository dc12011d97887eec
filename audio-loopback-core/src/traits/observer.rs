use crate::models::error::LoopbackError;
use crate::models::session_summary::SessionSummary;
use crate::models::state::StreamingState;

/// Event sink for the host UI.
///
/// Called synchronously on the control thread that drives the controller.
pub trait StreamingObserver: Send + Sync {
    /// Called when the controller moves between idle and recording.
    fn on_state_changed(&self, state: StreamingState);

    /// Called after each tick that handed samples to playback.
    fn on_samples_consumed(&self, samples: usize);

    /// Playback could not be initialised. The host decides whether to exit.
    fn on_fatal_error(&self, error: &LoopbackError);

    /// Capture failed to open, or a device vanished mid-session.
    fn on_recoverable_error(&self, error: &LoopbackError);

    /// Called once per session, after all devices are released.
    fn on_session_finished(&self, summary: &SessionSummary);
}
