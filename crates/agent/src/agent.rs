//! The agent shell: wires the watchdogs to the bus, opens the realtime
//! connection, and blocks until the session ends.

use std::any::Any;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::Notify;

use vox_audio::AudioSession;
use vox_domain::config::{
    AudioConfig, AudioFormatConfig, AudioInputConfig, AudioOutputConfig, AssistantVoice,
    InputTranscription, NoiseReduction, NoiseReductionConfig, RealtimeModel, SessionConfig,
    TurnDetection,
};
use vox_domain::conversation::AgentHistory;
use vox_domain::error::{Error, Result};
use vox_domain::tool::{FunctionTool, ToolChoiceMode};
use vox_events::{
    AgentStarted, AgentStopped, ConversationHistoryResponse, EventBus,
    SpeechSpeedUpdateRequested, StopAgent, VolumeUpdateRequested,
};
use vox_mcp_client::McpServerStdio;
use vox_realtime::transport::RealtimeConnection;
use vox_tools::{ToolContext, ToolRegistry};

use crate::builder::AgentBuilder;
use crate::listener::{
    register_agent_listener, register_transcript_listener, AgentListener, TranscriptListener,
};
use crate::watchdogs::{
    AudioWatchdog, ConversationHistoryWatchdog, ErrorWatchdog, InterruptionWatchdog,
    LifecycleWatchdog, ToolCallingWatchdog, TranscriptionWatchdog,
    UserInactivityTimeoutWatchdog,
};

/// How long `stop` waits for the history snapshot before giving up.
const HISTORY_COLLECTION_TIMEOUT: Duration = Duration::from_secs(5);

/// Session parameters captured by the builder.
pub(crate) struct SessionParams {
    pub instructions: String,
    pub model: RealtimeModel,
    pub voice: AssistantVoice,
    pub speech_speed: f32,
    pub transcription: Option<InputTranscription>,
    pub noise_reduction: Option<NoiseReduction>,
    pub turn_detection: TurnDetection,
}

/// A fully wired agent. `start()` runs the session and returns its history.
pub struct Agent {
    pub(crate) bus: Arc<EventBus>,
    pub(crate) transport: Arc<dyn RealtimeConnection>,
    pub(crate) audio: AudioSession,
    pub(crate) registry: Option<ToolRegistry>,
    pub(crate) mcp_servers: Vec<Arc<McpServerStdio>>,
    pub(crate) params: SessionParams,
    pub(crate) transcript_listener: Option<Arc<dyn TranscriptListener>>,
    pub(crate) agent_listener: Option<Arc<dyn AgentListener>>,
    pub(crate) tool_context: Option<Arc<dyn Any + Send + Sync>>,
    pub(crate) inactivity_timeout: Duration,
    pub(crate) stop_notify: Arc<Notify>,
    pub(crate) running: AtomicBool,
}

/// Every watchdog of one session, kept alive for its duration.
struct Watchdogs {
    _audio: AudioWatchdog,
    _lifecycle: LifecycleWatchdog,
    _interruption: InterruptionWatchdog,
    _tool_calling: ToolCallingWatchdog,
    _transcription: TranscriptionWatchdog,
    _conversation_history: ConversationHistoryWatchdog,
    _user_inactivity: UserInactivityTimeoutWatchdog,
    _error: ErrorWatchdog,
}

impl Agent {
    pub fn builder() -> AgentBuilder {
        AgentBuilder::new()
    }

    /// The bus, for hosts that want to observe or inject events directly.
    pub fn event_bus(&self) -> Arc<EventBus> {
        self.bus.clone()
    }

    /// A cheap handle for controlling the running agent from elsewhere.
    pub fn handle(&self) -> AgentHandle {
        AgentHandle {
            bus: Arc::downgrade(&self.bus),
        }
    }

    /// Run the session: connect, announce `AgentStarted`, then block until a
    /// stop is requested. Returns the conversation history.
    ///
    /// Only startup errors (MCP spawn, connection dial) are fatal; anything
    /// after the session is live is handled inside the watchdogs.
    pub async fn start(&mut self) -> Result<AgentHistory> {
        if self.running.swap(true, Ordering::SeqCst) {
            return Err(Error::Other("agent already started".into()));
        }
        tracing::info!("starting agent");

        let mut registry = self
            .registry
            .take()
            .ok_or_else(|| Error::Other("agent already consumed".into()))?;

        // MCP servers first so their tools make it into the session config.
        for server in &self.mcp_servers {
            server.connect().await?;
            let count = server.clone().register_tools(&mut registry).await?;
            tracing::info!(tools = count, "MCP server ready");
        }
        let registry = Arc::new(registry);

        let mut tool_context = ToolContext::new(&self.bus);
        if let Some(context) = &self.tool_context {
            tool_context = tool_context.with_context(context.clone());
        }

        let _watchdogs = self.build_watchdogs(registry.clone(), tool_context);

        if let Some(listener) = &self.transcript_listener {
            register_transcript_listener(&self.bus, listener.clone());
        }
        if let Some(listener) = &self.agent_listener {
            register_agent_listener(&self.bus, listener.clone());
        }

        // Wake the shell when anything dispatches the stop command.
        let notify = self.stop_notify.clone();
        self.bus.subscribe(move |_: StopAgent| {
            let notify = notify.clone();
            async move { notify.notify_one() }
        });

        // Dial before announcing the session so a bad endpoint or key fails
        // start() instead of vanishing into a handler.
        self.transport.connect().await?;

        let session_config = self.build_session_config(registry.definitions());
        self.bus.dispatch(AgentStarted { session_config }).await;
        tracing::info!("agent started");

        self.stop_notify.notified().await;
        self.shutdown().await
    }

    /// Request a stop from the owning task.
    pub async fn stop(&self) {
        self.bus.dispatch(StopAgent).await;
    }

    async fn shutdown(&self) -> Result<AgentHistory> {
        tracing::info!("stopping agent");

        // Register the history waiter before AgentStopped fans out — the
        // snapshot is published during that dispatch.
        let (history, _) = tokio::join!(
            self.bus
                .wait_for_event::<ConversationHistoryResponse>(Some(HISTORY_COLLECTION_TIMEOUT)),
            self.bus.dispatch(AgentStopped),
        );

        let turns = match history {
            Ok(response) => response.turns,
            Err(error) => {
                tracing::warn!(%error, "conversation history not collected");
                Vec::new()
            }
        };

        for server in &self.mcp_servers {
            server.cleanup().await;
        }
        self.transport.close().await;

        tracing::info!(turns = turns.len(), "agent stopped");
        Ok(AgentHistory { turns })
    }

    fn build_watchdogs(&self, registry: Arc<ToolRegistry>, tool_context: ToolContext) -> Watchdogs {
        Watchdogs {
            _audio: AudioWatchdog::new(&self.bus, self.audio.clone()),
            _lifecycle: LifecycleWatchdog::new(&self.bus, self.transport.clone()),
            _interruption: InterruptionWatchdog::new(
                &self.bus,
                self.transport.clone(),
                self.audio.clone(),
            ),
            _tool_calling: ToolCallingWatchdog::new(
                &self.bus,
                registry,
                self.transport.clone(),
                tool_context,
            ),
            _transcription: TranscriptionWatchdog::new(&self.bus),
            _conversation_history: ConversationHistoryWatchdog::new(&self.bus),
            _user_inactivity: UserInactivityTimeoutWatchdog::new(
                &self.bus,
                self.inactivity_timeout,
            ),
            _error: ErrorWatchdog::new(&self.bus),
        }
    }

    fn build_session_config(&self, tools: Vec<FunctionTool>) -> SessionConfig {
        SessionConfig {
            model: self.params.model,
            instructions: self.params.instructions.clone(),
            voice: self.params.voice,
            audio: AudioConfig {
                input: AudioInputConfig {
                    format: AudioFormatConfig::default(),
                    turn_detection: Some(self.params.turn_detection.clone()),
                    transcription: self.params.transcription.clone(),
                    noise_reduction: self
                        .params
                        .noise_reduction
                        .map(|kind| NoiseReductionConfig { kind }),
                },
                output: AudioOutputConfig {
                    format: AudioFormatConfig::default(),
                    speed: self.params.speech_speed,
                    voice: self.params.voice,
                },
            },
            tool_choice: ToolChoiceMode::Auto,
            tools,
        }
    }
}

/// Clonable control handle; holds only a weak bus reference so it can
/// outlive the agent safely.
#[derive(Clone)]
pub struct AgentHandle {
    bus: Weak<EventBus>,
}

impl AgentHandle {
    /// Ask the running agent to stop. No-op once the agent is gone.
    pub async fn stop(&self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.dispatch(StopAgent).await;
        }
    }

    /// Change the assistant's speaking speed (clamped to `[0.5, 1.5]`).
    pub async fn set_speech_speed(&self, speed: f32) {
        if let Some(bus) = self.bus.upgrade() {
            bus.dispatch(SpeechSpeedUpdateRequested { speed }).await;
        }
    }

    /// Change playback volume (clamped to `[0.0, 1.0]`).
    pub async fn set_volume(&self, volume: f32) {
        if let Some(bus) = self.bus.upgrade() {
            bus.dispatch(VolumeUpdateRequested { volume }).await;
        }
    }
}
