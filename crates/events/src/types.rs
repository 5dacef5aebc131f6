//! Internal events: commands, lifecycle, and derived notifications.
//!
//! Wire-level frames live in `vox-realtime`; everything here stays inside
//! the process. Events are plain `Clone` structs — once dispatched they are
//! immutable.

use vox_domain::config::SessionConfig;
use vox_domain::conversation::ConversationTurn;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Commands
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Ask the agent shell to shut the session down.
#[derive(Debug, Clone)]
pub struct StopAgent;

/// Ask the lifecycle watchdog to truncate a conversation item on the server.
#[derive(Debug, Clone)]
pub struct MessageTruncationRequested {
    pub item_id: String,
    pub audio_end_ms: u64,
}

/// A tool finished; its output must reach the model.
#[derive(Debug, Clone)]
pub struct ToolCallResultReady {
    pub call_id: String,
    pub tool_name: String,
    pub output: String,
    pub response_instruction: Option<String>,
    /// When set, no follow-up `response.create` is sent for this result.
    pub suppress_response: bool,
}

/// Change the assistant's speaking speed mid-session.
#[derive(Debug, Clone, Copy)]
pub struct SpeechSpeedUpdateRequested {
    pub speed: f32,
}

/// Change the playback volume.
#[derive(Debug, Clone, Copy)]
pub struct VolumeUpdateRequested {
    pub volume: f32,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lifecycle
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// The agent is starting; carries the full session configuration.
#[derive(Debug, Clone)]
pub struct AgentStarted {
    pub session_config: SessionConfig,
}

/// The agent is shutting down. Idempotent for all consumers.
#[derive(Debug, Clone)]
pub struct AgentStopped;

/// Snapshot of the conversation history, published on shutdown so `stop()`
/// can collect it synchronously via `wait_for_event`.
#[derive(Debug, Clone)]
pub struct ConversationHistoryResponse {
    pub turns: Vec<ConversationTurn>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Derived
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone)]
pub struct UserTranscriptChunk {
    pub chunk: String,
    pub item_id: String,
}

#[derive(Debug, Clone)]
pub struct UserTranscriptCompleted {
    pub transcript: String,
    pub item_id: String,
}

#[derive(Debug, Clone)]
pub struct AssistantTranscriptChunk {
    pub chunk: String,
    pub item_id: String,
}

#[derive(Debug, Clone)]
pub struct AssistantTranscriptCompleted {
    pub transcript: String,
    pub item_id: String,
    pub output_index: Option<u32>,
    pub content_index: Option<u32>,
}

/// The user barged in while the assistant was speaking.
#[derive(Debug, Clone)]
pub struct AssistantInterrupted {
    pub item_id: Option<String>,
    pub played_ms: Option<u64>,
}

/// The output device drained after a completed response.
#[derive(Debug, Clone)]
pub struct AudioPlaybackCompleted;

/// Nobody said anything for the configured window.
#[derive(Debug, Clone, Copy)]
pub struct UserInactivityTimeout {
    pub timeout_seconds: f32,
}
