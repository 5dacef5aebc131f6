//! Call-time context injected into every tool handler.
//!
//! This is the Rust rendition of "special parameters": values the model
//! never supplies and the schema never mentions. Handlers that need neither
//! simply ignore the argument.

use std::any::Any;
use std::sync::{Arc, Weak};

use vox_events::EventBus;

#[derive(Clone, Default)]
pub struct ToolContext {
    /// Weak so tool handlers stored on the bus never keep it alive.
    event_bus: Weak<EventBus>,
    /// Opaque host-supplied value, shared by every tool of the session.
    context: Option<Arc<dyn Any + Send + Sync>>,
}

impl ToolContext {
    pub fn new(bus: &Arc<EventBus>) -> Self {
        Self {
            event_bus: Arc::downgrade(bus),
            context: None,
        }
    }

    pub fn with_context(mut self, context: Arc<dyn Any + Send + Sync>) -> Self {
        self.context = Some(context);
        self
    }

    /// The event bus, if the agent is still alive.
    pub fn bus(&self) -> Option<Arc<EventBus>> {
        self.event_bus.upgrade()
    }

    /// Downcast the host-supplied context value.
    pub fn typed_context<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.context.clone()?.downcast::<T>().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_context_downcasts() {
        let bus = Arc::new(EventBus::new());
        let ctx = ToolContext::new(&bus).with_context(Arc::new(42u32));
        assert_eq!(ctx.typed_context::<u32>().as_deref(), Some(&42));
        assert!(ctx.typed_context::<String>().is_none());
    }

    #[test]
    fn bus_handle_is_weak() {
        let bus = Arc::new(EventBus::new());
        let ctx = ToolContext::new(&bus);
        assert!(ctx.bus().is_some());
        drop(bus);
        assert!(ctx.bus().is_none());
    }
}
