//! In-process notifications.
//!
//! The engine publishes an event after each committed state change. Subscribers register async closures through
//! [`EventHooks`]; each event type gets its own bounded channel and handler task. Publishing never fails the
//! operation that triggered it.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
