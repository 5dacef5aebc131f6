//! Records completed turns and publishes the history on shutdown.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

use vox_domain::conversation::ConversationTurn;
use vox_events::{
    AgentStopped, AssistantTranscriptCompleted, ConversationHistoryResponse, EventBus,
    UserTranscriptCompleted,
};

use super::subscribe_handler;

pub struct ConversationHistoryWatchdog {
    inner: Arc<Inner>,
}

struct Inner {
    bus: Weak<EventBus>,
    history: Mutex<Vec<ConversationTurn>>,
}

impl ConversationHistoryWatchdog {
    pub fn new(bus: &Arc<EventBus>) -> Self {
        let inner = Arc::new(Inner {
            bus: Arc::downgrade(bus),
            history: Mutex::new(Vec::new()),
        });

        subscribe_handler!(bus, inner, UserTranscriptCompleted, on_user_transcript);
        subscribe_handler!(bus, inner, AssistantTranscriptCompleted, on_assistant_transcript);
        subscribe_handler!(bus, inner, AgentStopped, on_agent_stopped);

        Self { inner }
    }

    /// Snapshot of the turns recorded so far.
    pub fn history(&self) -> Vec<ConversationTurn> {
        self.inner.history.lock().clone()
    }
}

impl Inner {
    async fn on_user_transcript(&self, event: UserTranscriptCompleted) {
        self.history
            .lock()
            .push(ConversationTurn::user(event.transcript, event.item_id));
        tracing::debug!("added user turn to conversation history");
    }

    async fn on_assistant_transcript(&self, event: AssistantTranscriptCompleted) {
        self.history.lock().push(ConversationTurn::assistant(
            event.transcript,
            event.item_id,
            event.output_index,
            event.content_index,
        ));
        tracing::debug!("added assistant turn to conversation history");
    }

    async fn on_agent_stopped(&self, _event: AgentStopped) {
        let turns = self.history.lock().clone();
        tracing::info!(turns = turns.len(), "publishing conversation history");

        if let Some(bus) = self.bus.upgrade() {
            bus.dispatch(ConversationHistoryResponse { turns }).await;
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
