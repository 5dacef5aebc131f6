//! `vox-events` — the in-process typed event bus and the internal events of
//! the agent core.
//!
//! Routing is by type identity: a handler subscribed for `T` sees every
//! dispatched `T` and nothing else. There are no topic strings. Watchdogs
//! communicate exclusively through this bus; none of them calls another
//! directly.

pub mod bus;
pub mod types;

pub use bus::{Event, EventBus, SubscriptionId, WaitForEventError};
pub use types::*;
