//! `vox-domain` — shared types for the VoxAgent workspace.
//!
//! This crate holds everything the other crates agree on: the workspace-wide
//! error type, the realtime session configuration, the LLM-facing tool
//! definition schema, and the conversation history types. It has no I/O and
//! no async code.

pub mod config;
pub mod conversation;
pub mod error;
pub mod tool;

// Re-exports for convenience.
pub use config::{
    clamp_speech_speed, AssistantVoice, AudioConfig, AudioFormat, AudioFormatConfig,
    AudioInputConfig, AudioOutputConfig, InputTranscription, NoiseReduction,
    NoiseReductionConfig, RealtimeModel, SessionConfig, TranscriptionModel, TurnDetection,
};
pub use conversation::{AgentHistory, ConversationTurn, TurnRole};
pub use error::{Error, Result};
pub use tool::{
    FunctionParameterProperty, FunctionParameters, FunctionTool, JsonType, ToolChoiceMode,
};
