//! Facade pairing one input device with one output device.

use std::sync::Arc;

use futures_core::stream::BoxStream;

use vox_domain::error::Result;

use crate::device::{AudioInput, AudioOutput};

/// One capture device plus one playback device, started and stopped
/// together. Cheap to clone; watchdogs share a handle.
#[derive(Clone)]
pub struct AudioSession {
    input: Arc<dyn AudioInput>,
    output: Arc<dyn AudioOutput>,
}

impl AudioSession {
    pub fn new(input: Arc<dyn AudioInput>, output: Arc<dyn AudioOutput>) -> Self {
        Self { input, output }
    }

    pub async fn start(&self) -> Result<()> {
        self.input.start().await?;
        self.output.start().await?;
        Ok(())
    }

    pub async fn stop(&self) -> Result<()> {
        self.input.stop().await?;
        self.output.stop().await?;
        Ok(())
    }

    /// Stop only the capture side. The capture task calls this on every exit
    /// path so a cancelled loop never leaves the device running.
    pub async fn stop_input(&self) -> Result<()> {
        self.input.stop().await
    }

    pub fn stream_input_chunks(&self) -> BoxStream<'static, Vec<u8>> {
        self.input.stream_chunks()
    }

    pub async fn play_chunk(&self, chunk: Vec<u8>) -> Result<()> {
        self.output.play_chunk(chunk).await
    }

    pub async fn set_volume(&self, volume: f32) {
        let clamped = volume.clamp(0.0, 1.0);
        if clamped != volume {
            tracing::warn!(requested = volume, clamped, "volume out of range, clamping");
        }
        self.output.set_volume(clamped).await;
    }

    pub async fn clear_output_buffer(&self) {
        self.output.clear_buffer().await;
    }

    pub fn input_is_active(&self) -> bool {
        self.input.is_active()
    }

    pub fn is_playing(&self) -> bool {
        self.output.is_playing()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{MemoryInput, MemoryOutput};

    fn session() -> (AudioSession, Arc<MemoryInput>, Arc<MemoryOutput>) {
        let input = Arc::new(MemoryInput::new());
        let output = Arc::new(MemoryOutput::new());
        (
            AudioSession::new(input.clone(), output.clone()),
            input,
            output,
        )
    }

    #[tokio::test]
    async fn start_and_stop_drive_both_devices() {
        let (session, input, output) = session();
        session.start().await.unwrap();
        assert!(input.is_active());
        assert!(output.is_active());

        session.stop().await.unwrap();
        assert!(!input.is_active());
        assert!(!output.is_active());
    }

    #[tokio::test]
    async fn volume_is_clamped_before_reaching_the_device() {
        let (session, _input, output) = session();
        session.set_volume(1.8).await;
        assert_eq!(output.volume(), 1.0);
        session.set_volume(-0.3).await;
        assert_eq!(output.volume(), 0.0);
        session.set_volume(0.4).await;
        assert_eq!(output.volume(), 0.4);
    }

    #[tokio::test]
    async fn clear_discards_queued_audio() {
        let (session, _input, output) = session();
        session.start().await.unwrap();
        session.play_chunk(vec![1, 2, 3, 4]).await.unwrap();
        session.clear_output_buffer().await;
        assert_eq!(output.cleared_count(), 1);
    }
}
