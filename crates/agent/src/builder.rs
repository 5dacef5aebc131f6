//! Builder for [`Agent`].

use std::any::Any;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use vox_audio::{AudioInput, AudioOutput, AudioSession};
use vox_domain::config::{
    clamp_speech_speed, AssistantVoice, InputTranscription, NoiseReduction, RealtimeModel,
    TranscriptionModel, TurnDetection,
};
use vox_domain::error::{Error, Result};
use vox_events::EventBus;
use vox_mcp_client::McpServerStdio;
use vox_realtime::transport::{RealtimeConnection, RealtimeTransport};
use vox_tools::{Tool, ToolRegistry};

use crate::agent::{Agent, SessionParams};
use crate::listener::{AgentListener, TranscriptListener};
use crate::watchdogs::user_inactivity::DEFAULT_INACTIVITY_TIMEOUT;

/// Configures and assembles an [`Agent`].
///
/// Audio devices are required: the core ships no hardware drivers, so the
/// host decides what capture and playback look like.
pub struct AgentBuilder {
    instructions: String,
    model: RealtimeModel,
    voice: AssistantVoice,
    speech_speed: f32,
    transcription: Option<InputTranscription>,
    noise_reduction: Option<NoiseReduction>,
    turn_detection: TurnDetection,
    tools: Vec<Tool>,
    mcp_servers: Vec<Arc<McpServerStdio>>,
    audio_input: Option<Arc<dyn AudioInput>>,
    audio_output: Option<Arc<dyn AudioOutput>>,
    api_key: Option<String>,
    transcript_listener: Option<Arc<dyn TranscriptListener>>,
    agent_listener: Option<Arc<dyn AgentListener>>,
    tool_context: Option<Arc<dyn Any + Send + Sync>>,
    inactivity_timeout: Duration,
}

impl AgentBuilder {
    pub(crate) fn new() -> Self {
        Self {
            instructions: String::new(),
            model: RealtimeModel::default(),
            voice: AssistantVoice::default(),
            speech_speed: 1.0,
            transcription: None,
            noise_reduction: None,
            turn_detection: TurnDetection::default(),
            tools: Vec::new(),
            mcp_servers: Vec::new(),
            audio_input: None,
            audio_output: None,
            api_key: None,
            transcript_listener: None,
            agent_listener: None,
            tool_context: None,
            inactivity_timeout: DEFAULT_INACTIVITY_TIMEOUT,
        }
    }

    pub fn instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    pub fn model(mut self, model: RealtimeModel) -> Self {
        self.model = model;
        self
    }

    pub fn voice(mut self, voice: AssistantVoice) -> Self {
        self.voice = voice;
        self
    }

    /// Initial speaking speed; clamped to `[0.5, 1.5]` and rounded to one
    /// decimal before it ever reaches the wire.
    pub fn speech_speed(mut self, speed: f32) -> Self {
        self.speech_speed = clamp_speech_speed(speed);
        self
    }

    /// Enable input transcription with the given model.
    pub fn transcription_model(mut self, model: TranscriptionModel) -> Self {
        self.transcription = Some(InputTranscription::new(model));
        self
    }

    pub fn transcription(mut self, transcription: InputTranscription) -> Self {
        self.transcription = Some(transcription);
        self
    }

    pub fn noise_reduction(mut self, kind: NoiseReduction) -> Self {
        self.noise_reduction = Some(kind);
        self
    }

    pub fn turn_detection(mut self, turn_detection: TurnDetection) -> Self {
        self.turn_detection = turn_detection;
        self
    }

    pub fn tool(mut self, tool: Tool) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn tools(mut self, tools: impl IntoIterator<Item = Tool>) -> Self {
        self.tools.extend(tools);
        self
    }

    pub fn mcp_server(mut self, server: Arc<McpServerStdio>) -> Self {
        self.mcp_servers.push(server);
        self
    }

    pub fn audio_input(mut self, input: Arc<dyn AudioInput>) -> Self {
        self.audio_input = Some(input);
        self
    }

    pub fn audio_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.audio_output = Some(output);
        self
    }

    /// Bearer token for the realtime socket; defaults to `OPENAI_API_KEY`.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn transcript_listener(mut self, listener: Arc<dyn TranscriptListener>) -> Self {
        self.transcript_listener = Some(listener);
        self
    }

    pub fn agent_listener(mut self, listener: Arc<dyn AgentListener>) -> Self {
        self.agent_listener = Some(listener);
        self
    }

    /// Opaque value handed to every tool handler via its context.
    pub fn tool_context(mut self, context: Arc<dyn Any + Send + Sync>) -> Self {
        self.tool_context = Some(context);
        self
    }

    pub fn inactivity_timeout(mut self, timeout: Duration) -> Self {
        self.inactivity_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Agent> {
        let audio_input = self
            .audio_input
            .ok_or_else(|| Error::Config("an audio input device is required".into()))?;
        let audio_output = self
            .audio_output
            .ok_or_else(|| Error::Config("an audio output device is required".into()))?;

        let bus = Arc::new(EventBus::new());

        let mut registry = ToolRegistry::with_default_tools();
        for tool in self.tools {
            registry.register(tool)?;
        }

        let transport: Arc<dyn RealtimeConnection> = Arc::new(RealtimeTransport::new(
            self.model,
            bus.clone(),
            self.api_key,
        )?);

        Ok(Agent {
            bus,
            transport,
            audio: AudioSession::new(audio_input, audio_output),
            registry: Some(registry),
            mcp_servers: self.mcp_servers,
            params: SessionParams {
                instructions: self.instructions,
                model: self.model,
                voice: self.voice,
                speech_speed: self.speech_speed,
                transcription: self.transcription,
                noise_reduction: self.noise_reduction,
                turn_detection: self.turn_detection,
            },
            transcript_listener: self.transcript_listener,
            agent_listener: self.agent_listener,
            tool_context: self.tool_context,
            inactivity_timeout: self.inactivity_timeout,
            stop_notify: Arc::new(Notify::new()),
            running: AtomicBool::new(false),
        })
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
