//! The watchdogs. Each one is constructed with the bus plus its
//! collaborators, registers its handlers, and from then on is driven purely
//! by events. Handler closures capture the watchdog's inner state; the
//! state holds only a weak handle back to the bus.

pub mod audio;
pub mod conversation_history;
pub mod error;
pub mod interruption;
pub mod lifecycle;
pub mod tool_calling;
pub mod transcription;
pub mod user_inactivity;

pub use audio::AudioWatchdog;
pub use conversation_history::ConversationHistoryWatchdog;
pub use error::ErrorWatchdog;
pub use interruption::InterruptionWatchdog;
pub use lifecycle::LifecycleWatchdog;
pub use tool_calling::ToolCallingWatchdog;
pub use transcription::TranscriptionWatchdog;
pub use user_inactivity::UserInactivityTimeoutWatchdog;

/// Wire one inner method as a bus handler.
macro_rules! subscribe_handler {
    ($bus:expr, $inner:expr, $event:ty, $method:ident) => {{
        let inner = $inner.clone();
        $bus.subscribe(move |event: $event| {
            let inner = inner.clone();
            async move { inner.$method(event).await }
        });
    }};
}

pub(crate) use subscribe_handler;
