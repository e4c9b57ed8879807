//! Shared vocabulary of the runlink coordination protocol.
//!
//! An experiment run is driven by one *coordinator* and any number of
//! *participants* (one per device). They exchange two kinds of
//! messages over two unidirectional channels:
//!
//! - [`Report`]s travel on the *fan-in* channel, from the participants
//!   to the coordinator (registration, local phase transitions, abort
//!   requests).
//! - [`Order`]s travel on the *fan-out* channel, broadcast from the
//!   coordinator to every participant (start/load/exit/abort/shutdown
//!   and the registration handshake).
//!
//! Both sides walk through the same set of [`Phase`]s. The coordinator
//! tracks its own *global* phase plus the last phase each device
//! reported; each participant tracks its *local* phase.
//!
//! The wire format is a line of space-separated ASCII tokens, the
//! first token naming the message kind. [`FromBytes`] and [`ToBytes`]
//! convert between messages and raw lines.
//!
//! [`Report`]: crate::message::Report
//! [`Order`]: crate::message::Order
//! [`FromBytes`]: crate::message::FromBytes
//! [`ToBytes`]: crate::message::ToBytes

pub mod common;
pub mod message;
mod phase;

pub use self::{
    common::{DeviceName, FAN_IN_PORT, FAN_OUT_PORT},
    phase::Phase,
};
