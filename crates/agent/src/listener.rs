//! Host-facing callbacks, registered as plain bus subscriptions.

use std::sync::Arc;

use vox_events::{
    AgentStarted, AgentStopped, AssistantInterrupted, AssistantTranscriptChunk,
    AssistantTranscriptCompleted, EventBus, UserInactivityTimeout, UserTranscriptChunk,
    UserTranscriptCompleted,
};
use vox_realtime::server_events::{ErrorDetail, ErrorEvent};

/// Receives transcript text as it arrives. All methods default to no-ops so
/// implementors pick what they care about.
pub trait TranscriptListener: Send + Sync + 'static {
    fn on_user_transcript_chunk(&self, _chunk: &str) {}

    fn on_user_transcript(&self, _transcript: &str, _item_id: &str) {}

    fn on_assistant_transcript_chunk(&self, _chunk: &str) {}

    fn on_assistant_transcript(&self, _transcript: &str, _item_id: &str) {}
}

/// Receives session lifecycle notifications.
pub trait AgentListener: Send + Sync + 'static {
    fn on_started(&self) {}

    fn on_stopped(&self) {}

    fn on_interrupted(&self, _item_id: Option<&str>, _played_ms: Option<u64>) {}

    fn on_inactivity_timeout(&self, _seconds: f32) {}

    fn on_server_error(&self, _error: &ErrorDetail) {}
}

pub(crate) fn register_transcript_listener(
    bus: &Arc<EventBus>,
    listener: Arc<dyn TranscriptListener>,
) {
    {
        let listener = listener.clone();
        bus.subscribe(move |event: UserTranscriptChunk| {
            let listener = listener.clone();
            async move { listener.on_user_transcript_chunk(&event.chunk) }
        });
    }
    {
        let listener = listener.clone();
        bus.subscribe(move |event: UserTranscriptCompleted| {
            let listener = listener.clone();
            async move { listener.on_user_transcript(&event.transcript, &event.item_id) }
        });
    }
    {
        let listener = listener.clone();
        bus.subscribe(move |event: AssistantTranscriptChunk| {
            let listener = listener.clone();
            async move { listener.on_assistant_transcript_chunk(&event.chunk) }
        });
    }
    bus.subscribe(move |event: AssistantTranscriptCompleted| {
        let listener = listener.clone();
        async move { listener.on_assistant_transcript(&event.transcript, &event.item_id) }
    });
}

pub(crate) fn register_agent_listener(bus: &Arc<EventBus>, listener: Arc<dyn AgentListener>) {
    {
        let listener = listener.clone();
        bus.subscribe(move |_: AgentStarted| {
            let listener = listener.clone();
            async move { listener.on_started() }
        });
    }
    {
        let listener = listener.clone();
        bus.subscribe(move |_: AgentStopped| {
            let listener = listener.clone();
            async move { listener.on_stopped() }
        });
    }
    {
        let listener = listener.clone();
        bus.subscribe(move |event: AssistantInterrupted| {
            let listener = listener.clone();
            async move { listener.on_interrupted(event.item_id.as_deref(), event.played_ms) }
        });
    }
    {
        let listener = listener.clone();
        bus.subscribe(move |event: UserInactivityTimeout| {
            let listener = listener.clone();
            async move { listener.on_inactivity_timeout(event.timeout_seconds) }
        });
    }
    bus.subscribe(move |event: ErrorEvent| {
        let listener = listener.clone();
        async move { listener.on_server_error(&event.error) }
    });
}
