//! The coordinator role: the event-loop service, its pure protocol
//! state machine, and the embedding handle.

mod events;
mod protocol;
mod service;

pub use self::{
    events::{CoordinatorGone, EventSubscriber},
    protocol::ProtocolViolation,
    service::{CoordinatorError, CoordinatorHandle, CoordinatorService},
};
