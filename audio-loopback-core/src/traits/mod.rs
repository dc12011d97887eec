pub mod backend;
pub mod capture_device;
pub mod observer;
pub mod playback_device;
pub mod scheduler;
