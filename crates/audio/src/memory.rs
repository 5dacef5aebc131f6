//! In-memory devices for tests and headless embedding.
//!
//! [`MemoryInput`] is fed chunks through a channel; [`MemoryOutput`] records
//! what would have been played. Neither touches hardware.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures_core::stream::BoxStream;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use vox_domain::error::Result;

use crate::device::{AudioInput, AudioOutput};
use crate::volume::apply_volume;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MemoryInput
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Capture device backed by an unbounded channel. Tests push chunks with
/// [`MemoryInput::push_chunk`]; the capture stream yields them in order and
/// ends when the sender side is closed or the device is stopped.
pub struct MemoryInput {
    tx: mpsc::UnboundedSender<Vec<u8>>,
    rx: Mutex<Option<mpsc::UnboundedReceiver<Vec<u8>>>>,
    active: Arc<AtomicBool>,
}

impl MemoryInput {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            tx,
            rx: Mutex::new(Some(rx)),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Feed one captured chunk. Returns `false` once the stream is gone.
    pub fn push_chunk(&self, chunk: Vec<u8>) -> bool {
        self.tx.send(chunk).is_ok()
    }
}

impl Default for MemoryInput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioInput for MemoryInput {
    async fn start(&self) -> Result<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    fn stream_chunks(&self) -> BoxStream<'static, Vec<u8>> {
        let rx = self.rx.lock().take();
        let active = self.active.clone();
        match rx {
            Some(rx) => futures_util::stream::unfold(rx, move |mut rx| {
                let active = active.clone();
                async move {
                    if !active.load(Ordering::SeqCst) {
                        return None;
                    }
                    rx.recv().await.map(|chunk| (chunk, rx))
                }
            })
            .boxed(),
            // stream_chunks was already called once; a second stream is empty.
            None => futures_util::stream::empty().boxed(),
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// MemoryOutput
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Playback device that records played chunks (after volume scaling) instead
/// of making sound. `is_playing` can be forced by tests to exercise the
/// playback-completion and barge-in paths.
pub struct MemoryOutput {
    active: AtomicBool,
    playing: AtomicBool,
    volume: Mutex<f32>,
    played: Mutex<Vec<Vec<u8>>>,
    cleared: Mutex<u32>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            playing: AtomicBool::new(false),
            volume: Mutex::new(1.0),
            played: Mutex::new(Vec::new()),
            cleared: Mutex::new(0),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Chunks handed to `play_chunk`, post volume scaling.
    pub fn played_chunks(&self) -> Vec<Vec<u8>> {
        self.played.lock().clone()
    }

    pub fn cleared_count(&self) -> u32 {
        *self.cleared.lock()
    }

    pub fn volume(&self) -> f32 {
        *self.volume.lock()
    }

    /// Test hook: pretend the device is (or is no longer) making sound.
    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::SeqCst);
    }
}

impl Default for MemoryOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AudioOutput for MemoryOutput {
    async fn start(&self) -> Result<()> {
        self.active.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<()> {
        self.active.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn play_chunk(&self, chunk: Vec<u8>) -> Result<()> {
        let volume = *self.volume.lock();
        self.played.lock().push(apply_volume(&chunk, volume));
        Ok(())
    }

    async fn set_volume(&self, volume: f32) {
        *self.volume.lock() = volume.clamp(0.0, 1.0);
    }

    async fn clear_buffer(&self) {
        *self.cleared.lock() += 1;
        self.playing.store(false, Ordering::SeqCst);
    }

    fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::StreamExt;

    #[tokio::test]
    async fn input_stream_yields_pushed_chunks_in_order() {
        let input = MemoryInput::new();
        input.start().await.unwrap();
        input.push_chunk(vec![1]);
        input.push_chunk(vec![2]);

        let mut stream = input.stream_chunks();
        assert_eq!(stream.next().await, Some(vec![1]));
        assert_eq!(stream.next().await, Some(vec![2]));
    }

    #[tokio::test]
    async fn input_stream_ends_when_stopped() {
        let input = MemoryInput::new();
        input.start().await.unwrap();
        input.push_chunk(vec![1]);
        input.stop().await.unwrap();

        let mut stream = input.stream_chunks();
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn output_applies_volume_to_recorded_chunks() {
        let output = MemoryOutput::new();
        output.start().await.unwrap();
        output.set_volume(0.5).await;
        output
            .play_chunk(1000i16.to_le_bytes().to_vec())
            .await
            .unwrap();
        assert_eq!(output.played_chunks(), vec![500i16.to_le_bytes().to_vec()]);
    }

    #[tokio::test]
    async fn clear_buffer_stops_playing() {
        let output = MemoryOutput::new();
        output.set_playing(true);
        output.clear_buffer().await;
        assert!(!output.is_playing());
        assert_eq!(output.cleared_count(), 1);
    }
}
