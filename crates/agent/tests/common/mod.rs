//! Shared test fixtures: a recording transport fake and a fully wired
//! watchdog harness driven by scripted event sequences.

// Each test binary uses its own slice of this module.
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Once};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use vox_agent::watchdogs::{
    AudioWatchdog, ConversationHistoryWatchdog, ErrorWatchdog, InterruptionWatchdog,
    LifecycleWatchdog, ToolCallingWatchdog, TranscriptionWatchdog,
    UserInactivityTimeoutWatchdog,
};
use vox_agent::{AudioSession, EventBus, MemoryInput, MemoryOutput, ToolContext, ToolRegistry};
use vox_domain::config::{AudioConfig, RealtimeModel, SessionConfig};
use vox_domain::tool::ToolChoiceMode;
use vox_realtime::transport::{RealtimeConnection, TransportError};
use vox_realtime::ClientEvent;

static TRACING: Once = Once::new();

/// Route watchdog logs through the test writer (`RUST_LOG` controls level).
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Transport fake that records every frame instead of talking to a server.
#[derive(Default)]
pub struct RecordingConnection {
    connected: AtomicBool,
    sent: Mutex<Vec<ClientEvent>>,
}

impl RecordingConnection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, in order.
    pub fn sent(&self) -> Vec<ClientEvent> {
        self.sent.lock().clone()
    }

    /// Wire names of everything sent so far, in order.
    pub fn frame_names(&self) -> Vec<&'static str> {
        self.sent.lock().iter().map(ClientEvent::name).collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.sent.lock().iter().filter(|e| e.name() == name).count()
    }
}

#[async_trait]
impl RealtimeConnection for RecordingConnection {
    async fn connect(&self) -> Result<(), TransportError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn send(&self, event: ClientEvent) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }
        self.sent.lock().push(event);
        Ok(())
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}

/// Every watchdog wired to one bus, with in-memory devices and a recording
/// transport — the whole core minus the real network and hardware.
pub struct Harness {
    pub bus: Arc<EventBus>,
    pub connection: Arc<RecordingConnection>,
    pub input: Arc<MemoryInput>,
    pub output: Arc<MemoryOutput>,
    #[allow(dead_code)]
    watchdogs: Vec<Box<dyn std::any::Any>>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_registry(ToolRegistry::with_default_tools(), Duration::from_secs(10))
    }

    #[allow(dead_code)]
    pub fn with_inactivity_timeout(timeout: Duration) -> Self {
        Self::with_registry(ToolRegistry::with_default_tools(), timeout)
    }

    pub fn with_registry(registry: ToolRegistry, inactivity_timeout: Duration) -> Self {
        init_tracing();
        let bus = Arc::new(EventBus::new());
        let connection = Arc::new(RecordingConnection::new());
        let input = Arc::new(MemoryInput::new());
        let output = Arc::new(MemoryOutput::new());
        let session = AudioSession::new(input.clone(), output.clone());
        let registry = Arc::new(registry);

        let transport: Arc<dyn RealtimeConnection> = connection.clone();
        let watchdogs: Vec<Box<dyn std::any::Any>> = vec![
            Box::new(AudioWatchdog::new(&bus, session.clone())),
            Box::new(LifecycleWatchdog::new(&bus, transport.clone())),
            Box::new(InterruptionWatchdog::new(
                &bus,
                transport.clone(),
                session.clone(),
            )),
            Box::new(ToolCallingWatchdog::new(
                &bus,
                registry,
                transport.clone(),
                ToolContext::new(&bus),
            )),
            Box::new(TranscriptionWatchdog::new(&bus)),
            Box::new(ConversationHistoryWatchdog::new(&bus)),
            Box::new(UserInactivityTimeoutWatchdog::new(&bus, inactivity_timeout)),
            Box::new(ErrorWatchdog::new(&bus)),
        ];

        Self {
            bus,
            connection,
            input,
            output,
            watchdogs,
        }
    }

    /// Dispatch `AgentStarted` with a minimal session config.
    pub async fn start_session(&self) {
        self.bus
            .dispatch(vox_events::AgentStarted {
                session_config: session_config(),
            })
            .await;
    }
}

pub fn session_config() -> SessionConfig {
    SessionConfig {
        model: RealtimeModel::GptRealtimeMini,
        instructions: "be helpful".into(),
        voice: Default::default(),
        audio: AudioConfig::default(),
        tool_choice: ToolChoiceMode::Auto,
        tools: vec![],
    }
}

/// Collects every dispatched `E` for later assertions.
pub struct Collector<E> {
    events: Arc<Mutex<Vec<E>>>,
}

impl<E: Clone + Send + Sync + 'static> Collector<E> {
    pub fn subscribe(bus: &Arc<EventBus>) -> Self {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        bus.subscribe(move |event: E| {
            let sink = sink.clone();
            async move {
                sink.lock().push(event);
            }
        });
        Self { events }
    }

    pub fn events(&self) -> Vec<E> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }
}
