//! Barge-in handling: cancel the running response, clear the server's audio
//! buffer, and truncate the interrupted item at the audio offset actually
//! played.

use std::sync::{Arc, Weak};
use std::time::Instant;

use parking_lot::Mutex;

use vox_audio::AudioSession;
use vox_events::{AssistantInterrupted, EventBus};
use vox_realtime::client_events::{
    ClientEvent, ConversationItemTruncate, OutputAudioBufferClear, ResponseCancel,
};
use vox_realtime::server_events::{
    InputAudioBufferSpeechStarted, ResponseCreated, ResponseDone, ResponseOutputAudioDelta,
};
use vox_realtime::transport::RealtimeConnection;

use super::subscribe_handler;

/// What we know about the response currently being spoken.
#[derive(Default)]
struct ResponseContext {
    response_id: Option<String>,
    /// Learned from the first audio delta of the active response.
    item_id: Option<String>,
    started_at: Option<Instant>,
    assistant_speaking: bool,
}

pub struct InterruptionWatchdog {
    #[allow(dead_code)]
    inner: Arc<Inner>,
}

struct Inner {
    bus: Weak<EventBus>,
    transport: Arc<dyn RealtimeConnection>,
    session: AudioSession,
    state: Mutex<ResponseContext>,
}

impl InterruptionWatchdog {
    pub fn new(
        bus: &Arc<EventBus>,
        transport: Arc<dyn RealtimeConnection>,
        session: AudioSession,
    ) -> Self {
        let inner = Arc::new(Inner {
            bus: Arc::downgrade(bus),
            transport,
            session,
            state: Mutex::new(ResponseContext::default()),
        });

        subscribe_handler!(bus, inner, ResponseCreated, on_response_created);
        subscribe_handler!(bus, inner, ResponseOutputAudioDelta, on_audio_delta);
        subscribe_handler!(bus, inner, ResponseDone, on_response_done);
        subscribe_handler!(bus, inner, InputAudioBufferSpeechStarted, on_user_started_speaking);

        Self { inner }
    }
}

impl Inner {
    async fn send(&self, event: impl Into<ClientEvent>) {
        let event = event.into();
        let frame = event.name();
        if let Err(error) = self.transport.send(event).await {
            tracing::warn!(frame, %error, "failed to send frame");
        }
    }

    async fn on_response_created(&self, event: ResponseCreated) {
        let mut state = self.state.lock();
        *state = ResponseContext {
            response_id: Some(event.response.id.clone()),
            item_id: None,
            started_at: Some(Instant::now()),
            assistant_speaking: true,
        };
        tracing::debug!(response_id = %event.response.id, "response started");
    }

    /// A delta for a stale response must not re-establish `item_id` — the
    /// network may deliver it after a newer `response.created`.
    async fn on_audio_delta(&self, event: ResponseOutputAudioDelta) {
        let mut state = self.state.lock();
        if state.response_id.as_deref() != Some(event.response_id.as_str()) {
            return;
        }
        if state.item_id.is_none() {
            tracing::debug!(item_id = %event.item_id, "tracking item");
            state.item_id = Some(event.item_id);
        }
    }

    async fn on_response_done(&self, event: ResponseDone) {
        let mut state = self.state.lock();
        if state.response_id.as_deref() != Some(event.response.id.as_str()) {
            return;
        }
        tracing::debug!(response_id = %event.response.id, "response completed");
        *state = ResponseContext::default();
    }

    async fn on_user_started_speaking(&self, _event: InputAudioBufferSpeechStarted) {
        let context = {
            let mut state = self.state.lock();
            // Idle and silent: nothing to interrupt. Idle but still audibly
            // playing (late deltas drained into the device): clear and
            // truncate best-effort anyway.
            if !state.assistant_speaking && !self.session.is_playing() {
                return;
            }
            std::mem::take(&mut *state)
        };

        let played_ms = context
            .started_at
            .map(|started| started.elapsed().as_millis() as u64);

        tracing::info!("barge-in detected, cancelling response");
        self.send(ResponseCancel::default()).await;
        self.send(OutputAudioBufferClear::default()).await;

        match (&context.item_id, played_ms) {
            (Some(item_id), Some(elapsed)) => {
                tracing::debug!(%item_id, elapsed_ms = elapsed, "truncating item");
                self.send(ConversationItemTruncate::new(item_id.clone(), elapsed))
                    .await;
            }
            _ => {
                tracing::warn!(
                    item_id = ?context.item_id,
                    ?played_ms,
                    "cannot truncate, item or elapsed time unknown"
                );
            }
        }

        if let Some(bus) = self.bus.upgrade() {
            bus.dispatch(AssistantInterrupted {
                item_id: context.item_id,
                played_ms,
            })
            .await;
        }
    }
}
