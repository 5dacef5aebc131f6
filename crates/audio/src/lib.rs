//! `vox-audio` — audio device traits and the capture/playback session.
//!
//! Concrete hardware drivers live outside the core; anything implementing
//! [`AudioInput`] / [`AudioOutput`] plugs in. Audio is PCM16 LE mono at the
//! configured sample rate (24 kHz by default).

pub mod device;
pub mod memory;
pub mod session;
pub mod volume;

pub use device::{AudioInput, AudioOutput};
pub use memory::{MemoryInput, MemoryOutput};
pub use session::AudioSession;
pub use volume::apply_volume;
