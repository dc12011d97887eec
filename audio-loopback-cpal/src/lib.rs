//! # audio-loopback-cpal
//!
//! cpal backend for audio-loopback.
//!
//! Provides:
//! - `CpalBackend`: opens contexts on the default cpal host
//! - `CpalCapture`: input stream staged through a capture ring
//! - `CpalPlayback`: output stream draining a queue of submitted buffers
//! - `DeviceEnumerator`: input/output device listing by name
//!
//! ## Platform Requirements
//! - Linux: ALSA development headers (`libasound2-dev`)
//!
//! ## Usage
//! ```ignore
//! use audio_loopback_core::{LoopbackConfiguration, StreamingController};
//! use audio_loopback_cpal::CpalBackend;
//!
//! let backend = CpalBackend::new();
//! let mut controller = StreamingController::new(backend, scheduler, LoopbackConfiguration::default());
//! controller.start()?;
//! ```

pub mod backend;
pub mod capture;
pub mod device_enumerator;
mod pcm;
pub mod playback;

pub use backend::CpalBackend;
pub use capture::CpalCapture;
pub use device_enumerator::DeviceEnumerator;
pub use playback::CpalPlayback;
