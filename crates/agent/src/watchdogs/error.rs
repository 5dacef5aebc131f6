//! Logs server-reported errors with full detail. Non-fatal: the session
//! keeps running, and the open cancel-vs-truncate interplay means some
//! errors here are expected after a barge-in.

use std::sync::Arc;

use vox_events::EventBus;
use vox_realtime::server_events::ErrorEvent;

use super::subscribe_handler;

pub struct ErrorWatchdog {
    #[allow(dead_code)]
    inner: Arc<Inner>,
}

struct Inner;

impl ErrorWatchdog {
    pub fn new(bus: &Arc<EventBus>) -> Self {
        let inner = Arc::new(Inner);
        subscribe_handler!(bus, inner, ErrorEvent, on_error);
        Self { inner }
    }
}

impl Inner {
    async fn on_error(&self, event: ErrorEvent) {
        tracing::error!(
            error_type = %event.error.kind,
            message = %event.error.message,
            code = ?event.error.code,
            param = ?event.error.param,
            event_id = ?event.error.event_id,
            "server error"
        );
    }
}
