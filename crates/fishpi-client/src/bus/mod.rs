//! Event bus exports.

pub mod event_bus;

pub use event_bus::{handler_fn, Event, EventBus, EventHandler, EventTag};
