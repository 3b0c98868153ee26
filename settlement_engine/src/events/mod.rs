//! In-process notifications of settlement changes.
//!
//! Register async callbacks on [`EventHooks`], build [`EventHandlers`] from them, and hand the resulting
//! [`EventProducers`] to the APIs. Every event is published after the transaction that caused it has committed.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler, HookFuture};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
