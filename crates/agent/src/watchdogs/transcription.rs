//! Re-emits server transcription frames as internal transcript events.

use std::sync::{Arc, Weak};

use vox_events::{
    AssistantTranscriptChunk, AssistantTranscriptCompleted, EventBus, UserTranscriptChunk,
    UserTranscriptCompleted,
};
use vox_realtime::server_events::{
    InputAudioTranscriptionCompleted, InputAudioTranscriptionDelta,
    ResponseOutputAudioTranscriptDelta, ResponseOutputAudioTranscriptDone,
};

use super::subscribe_handler;

pub struct TranscriptionWatchdog {
    #[allow(dead_code)]
    inner: Arc<Inner>,
}

struct Inner {
    bus: Weak<EventBus>,
}

impl TranscriptionWatchdog {
    pub fn new(bus: &Arc<EventBus>) -> Self {
        let inner = Arc::new(Inner {
            bus: Arc::downgrade(bus),
        });

        subscribe_handler!(bus, inner, InputAudioTranscriptionDelta, on_user_delta);
        subscribe_handler!(bus, inner, InputAudioTranscriptionCompleted, on_user_completed);
        subscribe_handler!(bus, inner, ResponseOutputAudioTranscriptDelta, on_assistant_delta);
        subscribe_handler!(bus, inner, ResponseOutputAudioTranscriptDone, on_assistant_done);

        Self { inner }
    }
}

impl Inner {
    async fn on_user_delta(&self, event: InputAudioTranscriptionDelta) {
        if let Some(bus) = self.bus.upgrade() {
            bus.dispatch(UserTranscriptChunk {
                chunk: event.delta,
                item_id: event.item_id,
            })
            .await;
        }
    }

    async fn on_user_completed(&self, event: InputAudioTranscriptionCompleted) {
        tracing::info!(
            transcript = %event.transcript,
            item_id = %event.item_id,
            "user transcript completed"
        );
        if let Some(usage) = &event.usage {
            tracing::debug!(%usage, "transcription usage");
        }

        if let Some(bus) = self.bus.upgrade() {
            bus.dispatch(UserTranscriptCompleted {
                transcript: event.transcript,
                item_id: event.item_id,
            })
            .await;
        }
    }

    async fn on_assistant_delta(&self, event: ResponseOutputAudioTranscriptDelta) {
        if let Some(bus) = self.bus.upgrade() {
            bus.dispatch(AssistantTranscriptChunk {
                chunk: event.delta,
                item_id: event.item_id,
            })
            .await;
        }
    }

    async fn on_assistant_done(&self, event: ResponseOutputAudioTranscriptDone) {
        tracing::info!(
            transcript = %event.transcript,
            item_id = %event.item_id,
            "assistant transcript completed"
        );

        if let Some(bus) = self.bus.upgrade() {
            bus.dispatch(AssistantTranscriptCompleted {
                transcript: event.transcript,
                item_id: event.item_id,
                output_index: event.output_index,
                content_index: event.content_index,
            })
            .await;
        }
    }
}
