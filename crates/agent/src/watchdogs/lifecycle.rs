//! Owns the transport lifecycle and the session configuration.
//!
//! Everything that turns an internal command into an outbound frame that is
//! not barge-in related lives here: session updates, capture forwarding,
//! truncation requests, and tool results.

use std::sync::Arc;

use parking_lot::Mutex;

use vox_domain::config::{clamp_speech_speed, SessionConfig};
use vox_events::{
    AgentStarted, AgentStopped, EventBus, MessageTruncationRequested, SpeechSpeedUpdateRequested,
    ToolCallResultReady,
};
use vox_realtime::client_events::{
    ClientEvent, ConversationItemCreate, ConversationItemTruncate, InputAudioBufferAppend,
    ResponseCreate, SessionUpdate,
};
use vox_realtime::transport::RealtimeConnection;

use super::subscribe_handler;

/// Spoken when a tool carries no `result_instruction` of its own.
pub const DEFAULT_RESULT_INSTRUCTION: &str =
    "The tool call has completed. Respond directly with the result.";

pub struct LifecycleWatchdog {
    #[allow(dead_code)]
    inner: Arc<Inner>,
}

struct Inner {
    transport: Arc<dyn RealtimeConnection>,
    session_config: Mutex<Option<SessionConfig>>,
}

impl LifecycleWatchdog {
    pub fn new(bus: &Arc<EventBus>, transport: Arc<dyn RealtimeConnection>) -> Self {
        let inner = Arc::new(Inner {
            transport,
            session_config: Mutex::new(None),
        });

        subscribe_handler!(bus, inner, AgentStarted, on_agent_started);
        subscribe_handler!(bus, inner, AgentStopped, on_agent_stopped);
        subscribe_handler!(bus, inner, InputAudioBufferAppend, on_input_audio_buffer_append);
        subscribe_handler!(bus, inner, SpeechSpeedUpdateRequested, on_speech_speed_update);
        subscribe_handler!(bus, inner, MessageTruncationRequested, on_truncation_requested);
        subscribe_handler!(bus, inner, ToolCallResultReady, on_tool_call_result);

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

    async fn on_agent_started(&self, event: AgentStarted) {
        tracing::info!("starting agent session");

        if !self.transport.is_connected() {
            if let Err(error) = self.transport.connect().await {
                tracing::error!(%error, "failed to open realtime connection");
                return;
            }
        }

        *self.session_config.lock() = Some(event.session_config.clone());
        self.send(SessionUpdate {
            session: event.session_config,
        })
        .await;
    }

    async fn on_agent_stopped(&self, _event: AgentStopped) {
        if !self.transport.is_connected() {
            return;
        }
        self.transport.close().await;
        tracing::info!("agent session stopped");
    }

    async fn on_input_audio_buffer_append(&self, event: InputAudioBufferAppend) {
        if !self.transport.is_connected() {
            tracing::warn!("cannot send audio, transport not connected");
            return;
        }
        self.send(event).await;
    }

    async fn on_speech_speed_update(&self, event: SpeechSpeedUpdateRequested) {
        let session = {
            let mut config = self.session_config.lock();
            let Some(config) = config.as_mut() else {
                tracing::warn!("cannot update speech speed, no active session");
                return;
            };
            let applied = clamp_speech_speed(event.speed);
            if applied != event.speed {
                tracing::debug!(requested = event.speed, applied, "speech speed adjusted");
            }
            config.audio.output.speed = applied;
            config.clone()
        };
        self.send(SessionUpdate { session }).await;
    }

    async fn on_truncation_requested(&self, event: MessageTruncationRequested) {
        self.send(ConversationItemTruncate::new(event.item_id, event.audio_end_ms))
            .await;
    }

    /// Tool output goes out as a `function_call_output` item; unless the
    /// tool suppressed it, a follow-up response is requested so the model
    /// speaks the result.
    async fn on_tool_call_result(&self, event: ToolCallResultReady) {
        self.send(ConversationItemCreate::function_call_output(
            event.call_id,
            event.output,
        ))
        .await;

        if event.suppress_response {
            tracing::debug!(tool = %event.tool_name, "response suppressed for tool result");
            return;
        }

        let instruction = event
            .response_instruction
            .unwrap_or_else(|| DEFAULT_RESULT_INSTRUCTION.into());
        self.send(ResponseCreate::from_instructions(instruction)).await;
    }
}
