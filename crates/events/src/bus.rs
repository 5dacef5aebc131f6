//! Typed publish/subscribe event bus.
//!
//! Handlers for one event type run concurrently within a `dispatch` call;
//! `dispatch` returns only after all of them have settled. A panicking
//! handler is caught and logged — it never takes the dispatcher down.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use parking_lot::{Mutex, RwLock};
use tokio::sync::oneshot;

/// Anything that can travel on the bus. Blanket-implemented; events are
/// plain `Clone` structs, immutable once dispatched.
pub trait Event: Any + Clone + Send + Sync + 'static {}

impl<T: Any + Clone + Send + Sync + 'static> Event for T {}

/// Handle returned by [`EventBus::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type BoxedHandler = Arc<dyn Fn(Arc<dyn Any + Send + Sync>) -> BoxFuture<'static, ()> + Send + Sync>;

struct HandlerEntry {
    id: SubscriptionId,
    handler: BoxedHandler,
}

/// Errors from [`EventBus::wait_for_event`].
#[derive(Debug, thiserror::Error)]
pub enum WaitForEventError {
    #[error("timed out after {0:?} waiting for event")]
    Timeout(Duration),

    #[error("event bus dropped the waiting subscription")]
    Closed,
}

/// In-process, single-loop event bus keyed by event type.
#[derive(Default)]
pub struct EventBus {
    handlers: RwLock<HashMap<TypeId, Vec<HandlerEntry>>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an async handler for every future dispatch of `E`.
    pub fn subscribe<E, F, Fut>(&self, handler: F) -> SubscriptionId
    where
        E: Event,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let boxed: BoxedHandler = Arc::new(move |any| {
            match any.downcast::<E>() {
                Ok(event) => handler((*event).clone()).boxed(),
                // Cannot happen: entries are keyed by TypeId.
                Err(_) => futures_util::future::ready(()).boxed(),
            }
        });

        self.handlers
            .write()
            .entry(TypeId::of::<E>())
            .or_default()
            .push(HandlerEntry { id, handler: boxed });

        tracing::debug!(event = short_type_name::<E>(), "subscribed");
        id
    }

    /// Remove a previously registered handler. Unknown ids are a no-op.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        let mut handlers = self.handlers.write();
        for entries in handlers.values_mut() {
            entries.retain(|entry| entry.id != id);
        }
    }

    /// Number of handlers currently registered for `E`.
    pub fn handler_count<E: Event>(&self) -> usize {
        self.handlers
            .read()
            .get(&TypeId::of::<E>())
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Dispatch an event to every handler registered for its type.
    ///
    /// Handlers run concurrently (unordered) and `dispatch` returns the
    /// event once all have settled. Successive dispatches from one task are
    /// therefore observed by each handler in dispatch order.
    pub async fn dispatch<E: Event>(&self, event: E) -> E {
        let event_name = short_type_name::<E>();
        let snapshot: Vec<BoxedHandler> = {
            let handlers = self.handlers.read();
            handlers
                .get(&TypeId::of::<E>())
                .map(|entries| entries.iter().map(|e| e.handler.clone()).collect())
                .unwrap_or_default()
        };

        if snapshot.is_empty() {
            tracing::warn!(event = event_name, "no handlers registered for event");
            return event;
        }

        tracing::debug!(event = event_name, handlers = snapshot.len(), "dispatching");

        let shared: Arc<dyn Any + Send + Sync> = Arc::new(event.clone());
        let invocations = snapshot.into_iter().map(|handler| {
            let shared = shared.clone();
            async move {
                if let Err(panic) = AssertUnwindSafe(handler(shared)).catch_unwind().await {
                    tracing::error!(
                        event = event_name,
                        panic = panic_message(&panic),
                        "event handler panicked"
                    );
                }
            }
        });
        join_all(invocations).await;

        event
    }

    /// Wait for the next dispatched `E`.
    pub async fn wait_for_event<E: Event>(
        &self,
        timeout: Option<Duration>,
    ) -> Result<E, WaitForEventError> {
        self.wait_for_event_matching(timeout, |_: &E| true).await
    }

    /// Wait for the next dispatched `E` accepted by `predicate`.
    ///
    /// The one-shot subscription is removed when this future completes or is
    /// dropped, so a cancelled caller never leaves a handler behind.
    pub async fn wait_for_event_matching<E, P>(
        &self,
        timeout: Option<Duration>,
        predicate: P,
    ) -> Result<E, WaitForEventError>
    where
        E: Event,
        P: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let (tx, rx) = oneshot::channel::<E>();
        let slot = Arc::new(Mutex::new(Some(tx)));

        let id = self.subscribe(move |event: E| {
            let slot = slot.clone();
            let matched = predicate(&event);
            async move {
                if matched {
                    if let Some(tx) = slot.lock().take() {
                        let _ = tx.send(event);
                    }
                }
            }
        });
        let _guard = Unsubscriber { bus: self, id };

        tracing::debug!(
            event = short_type_name::<E>(),
            timeout = ?timeout,
            "waiting for event"
        );

        match timeout {
            Some(deadline) => match tokio::time::timeout(deadline, rx).await {
                Ok(received) => received.map_err(|_| WaitForEventError::Closed),
                Err(_) => {
                    tracing::warn!(
                        event = short_type_name::<E>(),
                        timeout = ?deadline,
                        "timed out waiting for event"
                    );
                    Err(WaitForEventError::Timeout(deadline))
                }
            },
            None => rx.await.map_err(|_| WaitForEventError::Closed),
        }
    }
}

/// Removes the one-shot subscription regardless of how the wait ends.
struct Unsubscriber<'a> {
    bus: &'a EventBus,
    id: SubscriptionId,
}

impl Drop for Unsubscriber<'_> {
    fn drop(&mut self) {
        self.bus.unsubscribe(self.id);
    }
}

fn short_type_name<E>() -> &'static str {
    let full = std::any::type_name::<E>();
    full.rsplit("::").next().unwrap_or(full)
}

fn panic_message(panic: &Box<dyn Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".into()
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Ping(u32);

    #[derive(Debug, Clone)]
    struct Pong;

    #[tokio::test]
    async fn handlers_see_events_in_dispatch_order() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let sink = seen.clone();
        bus.subscribe(move |event: Ping| {
            let sink = sink.clone();
            async move {
                sink.lock().push(event.0);
            }
        });

        for i in 0..10 {
            bus.dispatch(Ping(i)).await;
        }
        assert_eq!(*seen.lock(), (0..10).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn dispatch_only_routes_matching_type() {
        let bus = EventBus::new();
        let pings = Arc::new(Mutex::new(0u32));

        let counter = pings.clone();
        bus.subscribe(move |_: Ping| {
            let counter = counter.clone();
            async move {
                *counter.lock() += 1;
            }
        });

        bus.dispatch(Ping(1)).await;
        bus.dispatch(Pong).await;
        assert_eq!(*pings.lock(), 1);
    }

    #[tokio::test]
    async fn all_handlers_run_for_one_event() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0u32));
        for _ in 0..3 {
            let count = count.clone();
            bus.subscribe(move |_: Ping| {
                let count = count.clone();
                async move {
                    *count.lock() += 1;
                }
            });
        }
        bus.dispatch(Ping(7)).await;
        assert_eq!(*count.lock(), 3);
    }

    #[tokio::test]
    async fn panicking_handler_does_not_poison_others() {
        let bus = EventBus::new();
        let survived = Arc::new(Mutex::new(false));

        bus.subscribe(move |_: Ping| async move {
            panic!("boom");
        });
        let flag = survived.clone();
        bus.subscribe(move |_: Ping| {
            let flag = flag.clone();
            async move {
                *flag.lock() = true;
            }
        });

        bus.dispatch(Ping(0)).await;
        assert!(*survived.lock());
    }

    #[tokio::test]
    async fn unsubscribe_stops_delivery() {
        let bus = EventBus::new();
        let count = Arc::new(Mutex::new(0u32));
        let counter = count.clone();
        let id = bus.subscribe(move |_: Ping| {
            let counter = counter.clone();
            async move {
                *counter.lock() += 1;
            }
        });

        bus.dispatch(Ping(0)).await;
        bus.unsubscribe(id);
        bus.dispatch(Ping(1)).await;
        assert_eq!(*count.lock(), 1);
    }

    #[tokio::test]
    async fn dispatch_returns_the_event() {
        let bus = EventBus::new();
        let returned = bus.dispatch(Ping(42)).await;
        assert_eq!(returned, Ping(42));
    }

    #[tokio::test]
    async fn wait_for_event_resolves_on_match() {
        let bus = Arc::new(EventBus::new());

        let waiter = {
            let bus = bus.clone();
            tokio::spawn(async move {
                bus.wait_for_event_matching(Some(Duration::from_secs(1)), |e: &Ping| e.0 == 2)
                    .await
            })
        };
        tokio::task::yield_now().await;

        bus.dispatch(Ping(1)).await;
        bus.dispatch(Ping(2)).await;

        let event = waiter.await.unwrap().unwrap();
        assert_eq!(event, Ping(2));
        // The one-shot handler is gone again.
        assert_eq!(bus.handler_count::<Ping>(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_event_times_out() {
        let bus = EventBus::new();
        let result = bus
            .wait_for_event::<Ping>(Some(Duration::from_millis(50)))
            .await;
        assert!(matches!(result, Err(WaitForEventError::Timeout(_))));
        assert_eq!(bus.handler_count::<Ping>(), 0);
    }

    #[tokio::test]
    async fn cancelled_wait_unsubscribes() {
        let bus = Arc::new(EventBus::new());
        let waiter = {
            let bus = bus.clone();
            tokio::spawn(async move { bus.wait_for_event::<Ping>(None).await })
        };
        tokio::task::yield_now().await;
        assert_eq!(bus.handler_count::<Ping>(), 1);

        waiter.abort();
        let _ = waiter.await;
        assert_eq!(bus.handler_count::<Ping>(), 0);
    }
}
