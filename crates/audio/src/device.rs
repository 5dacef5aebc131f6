//! Device traits implemented by audio backends.

use async_trait::async_trait;
use futures_core::stream::BoxStream;

use vox_domain::error::Result;

/// A PCM16 capture device (microphone or equivalent).
#[async_trait]
pub trait AudioInput: Send + Sync {
    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    fn is_active(&self) -> bool;

    /// Lazy stream of captured chunks. The stream ends when the device is
    /// stopped. Chunk size is implementation-defined.
    fn stream_chunks(&self) -> BoxStream<'static, Vec<u8>>;
}

/// A PCM16 playback device (speaker or equivalent).
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn start(&self) -> Result<()>;

    async fn stop(&self) -> Result<()>;

    /// Queue a chunk for playback.
    async fn play_chunk(&self, chunk: Vec<u8>) -> Result<()>;

    /// Set the playback volume in `[0.0, 1.0]`. Values below 1.0 are applied
    /// by linear sample scaling.
    async fn set_volume(&self, volume: f32);

    /// Discard any queued but not-yet-played audio and return promptly.
    /// Frames already handed to the hardware may still finish.
    async fn clear_buffer(&self);

    fn is_playing(&self) -> bool;
}
