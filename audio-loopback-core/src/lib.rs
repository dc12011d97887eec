//! # audio-loopback-core
//!
//! Platform-agnostic core of a live audio loopback: capture samples from an
//! input device and play them straight back with minimal delay.
//!
//! Platform backends (cpal) implement the device traits and plug into the
//! generic `StreamingController`, which is driven by an external tick.
//!
//! ## Architecture
//!
//! ```text
//! audio-loopback-core (this crate)
//! ├── traits/       ← AudioBackend, CaptureDevice, PlaybackDevice, TickScheduler, StreamingObserver
//! ├── models/       ← LoopbackConfiguration, LoopbackError, StreamingState, SessionSummary, etc.
//! ├── processing/   ← SampleBufferPool, CaptureRing
//! ├── session/      ← CaptureSession, PlaybackVoice, StreamingController
//! └── mock          ← in-memory backend, scheduler and observer
//! ```

pub mod mock;
pub mod models;
pub mod processing;
pub mod session;
pub mod traits;

// Re-export key types at crate root for convenience.
pub use models::audio_models::{AudioDevice, BufferHandle, DeviceRole, SessionDiagnostics};
pub use models::config::{FatalErrorAction, LoopbackConfiguration};
pub use models::error::{DeviceError, LoopbackError};
pub use models::session_summary::SessionSummary;
pub use models::state::StreamingState;
pub use processing::ring_buffer::CaptureRing;
pub use processing::sample_pool::SampleBufferPool;
pub use session::capture::CaptureSession;
pub use session::controller::{StreamingController, TickOutcome};
pub use session::voice::PlaybackVoice;
pub use traits::backend::AudioBackend;
pub use traits::capture_device::CaptureDevice;
pub use traits::observer::StreamingObserver;
pub use traits::playback_device::PlaybackDevice;
pub use traits::scheduler::TickScheduler;
