//! Bridges the audio session and the bus: capture chunks out, audio deltas
//! in, plus the audible half of barge-in.

use std::sync::{Arc, Weak};
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use futures_util::StreamExt;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use vox_audio::AudioSession;
use vox_events::{AgentStarted, AgentStopped, AudioPlaybackCompleted, EventBus, VolumeUpdateRequested};
use vox_realtime::client_events::InputAudioBufferAppend;
use vox_realtime::server_events::{
    InputAudioBufferSpeechStarted, ResponseDone, ResponseOutputAudioDelta,
};

use super::subscribe_handler;

/// Cadence for polling the output device after a completed response.
const PLAYBACK_POLL_INTERVAL: Duration = Duration::from_millis(50);

pub struct AudioWatchdog {
    #[allow(dead_code)]
    inner: Arc<Inner>,
}

struct Inner {
    bus: Weak<EventBus>,
    session: AudioSession,
    capture: Mutex<Option<CaptureTask>>,
}

struct CaptureTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

impl AudioWatchdog {
    pub fn new(bus: &Arc<EventBus>, session: AudioSession) -> Self {
        let inner = Arc::new(Inner {
            bus: Arc::downgrade(bus),
            session,
            capture: Mutex::new(None),
        });

        subscribe_handler!(bus, inner, AgentStarted, on_agent_started);
        subscribe_handler!(bus, inner, AgentStopped, on_agent_stopped);
        subscribe_handler!(bus, inner, ResponseOutputAudioDelta, on_audio_delta);
        subscribe_handler!(bus, inner, InputAudioBufferSpeechStarted, on_user_started_speaking);
        subscribe_handler!(bus, inner, ResponseDone, on_response_done);
        subscribe_handler!(bus, inner, VolumeUpdateRequested, on_volume_update);

        Self { inner }
    }
}

impl Inner {
    async fn on_agent_started(&self, _event: AgentStarted) {
        if let Err(error) = self.session.start().await {
            tracing::error!(%error, "failed to start audio devices");
            return;
        }

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(capture_loop(
            self.session.clone(),
            self.bus.clone(),
            cancel.clone(),
        ));
        *self.capture.lock() = Some(CaptureTask { cancel, handle });

        tracing::info!("audio started");
    }

    async fn on_agent_stopped(&self, _event: AgentStopped) {
        let capture = self.capture.lock().take();
        if let Some(capture) = capture {
            capture.cancel.cancel();
            let _ = capture.handle.await;
        }

        if let Err(error) = self.session.stop().await {
            tracing::warn!(%error, "failed to stop audio devices");
        }
        tracing::info!("audio stopped");
    }

    async fn on_audio_delta(&self, event: ResponseOutputAudioDelta) {
        let chunk = match BASE64.decode(&event.delta) {
            Ok(chunk) => chunk,
            Err(error) => {
                tracing::debug!(%error, "dropping undecodable audio delta");
                return;
            }
        };
        if let Err(error) = self.session.play_chunk(chunk).await {
            tracing::warn!(%error, "failed to queue audio chunk");
        }
    }

    /// The audible half of barge-in: drop queued playback immediately. The
    /// protocol half (cancel/truncate) lives in the interruption watchdog.
    async fn on_user_started_speaking(&self, _event: InputAudioBufferSpeechStarted) {
        self.session.clear_output_buffer().await;
    }

    async fn on_response_done(&self, _event: ResponseDone) {
        let session = self.session.clone();
        let bus = self.bus.clone();
        tokio::spawn(async move {
            while session.is_playing() {
                tokio::time::sleep(PLAYBACK_POLL_INTERVAL).await;
            }
            if let Some(bus) = bus.upgrade() {
                bus.dispatch(AudioPlaybackCompleted).await;
            }
        });
    }

    async fn on_volume_update(&self, event: VolumeUpdateRequested) {
        self.session.set_volume(event.volume).await;
    }
}

/// Encode captured chunks and put them on the bus until cancelled or the
/// device stream ends. The input device is stopped on every exit path.
async fn capture_loop(session: AudioSession, bus: Weak<EventBus>, cancel: CancellationToken) {
    let mut chunks = session.stream_input_chunks();
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            chunk = chunks.next() => {
                let Some(chunk) = chunk else { break };
                let Some(bus) = bus.upgrade() else { break };
                let encoded = BASE64.encode(&chunk);
                bus.dispatch(InputAudioBufferAppend::from_audio(encoded)).await;
            }
        }
    }
    if let Err(error) = session.stop_input().await {
        tracing::warn!(%error, "failed to stop capture device");
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;
    use vox_audio::{AudioInput, AudioOutput, MemoryInput, MemoryOutput};
    use vox_domain::config::{AudioConfig, RealtimeModel, SessionConfig};
    use vox_domain::tool::ToolChoiceMode;

    fn session_config() -> SessionConfig {
        SessionConfig {
            model: RealtimeModel::GptRealtimeMini,
            instructions: String::new(),
            voice: Default::default(),
            audio: AudioConfig::default(),
            tool_choice: ToolChoiceMode::Auto,
            tools: vec![],
        }
    }

    fn delta(response_id: &str, item_id: &str, payload: &[u8]) -> ResponseOutputAudioDelta {
        ResponseOutputAudioDelta {
            response_id: response_id.into(),
            item_id: item_id.into(),
            output_index: Some(0),
            content_index: Some(0),
            delta: BASE64.encode(payload),
        }
    }

    #[tokio::test]
    async fn capture_chunks_become_append_events() {
        let bus = Arc::new(EventBus::new());
        let input = Arc::new(MemoryInput::new());
        let output = Arc::new(MemoryOutput::new());
        let _watchdog = AudioWatchdog::new(&bus, AudioSession::new(input.clone(), output));

        let waiter = {
            let bus = bus.clone();
            tokio::spawn(async move {
                bus.wait_for_event::<InputAudioBufferAppend>(Some(Duration::from_secs(1)))
                    .await
            })
        };
        tokio::task::yield_now().await;

        bus.dispatch(AgentStarted {
            session_config: session_config(),
        })
        .await;
        input.push_chunk(vec![0x01, 0x02]);

        let event = waiter.await.unwrap().unwrap();
        assert_eq!(event.audio, BASE64.encode([0x01, 0x02]));

        bus.dispatch(AgentStopped).await;
        assert!(!input.is_active());
    }

    #[tokio::test]
    async fn audio_deltas_are_decoded_and_played() {
        let bus = Arc::new(EventBus::new());
        let input = Arc::new(MemoryInput::new());
        let output = Arc::new(MemoryOutput::new());
        let _watchdog = AudioWatchdog::new(&bus, AudioSession::new(input, output.clone()));
        output.start().await.unwrap();

        bus.dispatch(delta("r1", "i1", &[0x10, 0x20])).await;
        assert_eq!(output.played_chunks(), vec![vec![0x10, 0x20]]);
    }

    #[tokio::test]
    async fn speech_started_clears_the_output_buffer() {
        let bus = Arc::new(EventBus::new());
        let input = Arc::new(MemoryInput::new());
        let output = Arc::new(MemoryOutput::new());
        let _watchdog = AudioWatchdog::new(&bus, AudioSession::new(input, output.clone()));

        bus.dispatch(InputAudioBufferSpeechStarted {
            audio_start_ms: 100,
            item_id: None,
        })
        .await;
        assert_eq!(output.cleared_count(), 1);
    }

    #[tokio::test]
    async fn playback_completion_is_announced_after_drain() {
        let bus = Arc::new(EventBus::new());
        let input = Arc::new(MemoryInput::new());
        let output = Arc::new(MemoryOutput::new());
        let _watchdog = AudioWatchdog::new(&bus, AudioSession::new(input, output.clone()));

        output.set_playing(true);
        let waiter = {
            let bus = bus.clone();
            tokio::spawn(async move {
                bus.wait_for_event::<AudioPlaybackCompleted>(Some(Duration::from_secs(2)))
                    .await
            })
        };
        tokio::task::yield_now().await;

        bus.dispatch(ResponseDone {
            response: vox_realtime::ResponseMeta::new("r1"),
        })
        .await;

        // Still draining; give the poller a couple of cycles, then finish.
        tokio::time::sleep(Duration::from_millis(120)).await;
        output.set_playing(false);

        waiter.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn volume_requests_reach_the_device() {
        let bus = Arc::new(EventBus::new());
        let input = Arc::new(MemoryInput::new());
        let output = Arc::new(MemoryOutput::new());
        let _watchdog = AudioWatchdog::new(&bus, AudioSession::new(input, output.clone()));

        bus.dispatch(VolumeUpdateRequested { volume: 0.25 }).await;
        assert_eq!(output.volume(), 0.25);
    }
}
