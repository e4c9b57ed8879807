//! The messages of the coordination protocol.
//!
//! # Reports (fan-in)
//!
//! A [`Report`] is what a participant pushes to the coordinator:
//! a registration request (`hello <name>`), a local phase transition
//! (`fin <name>`, `rdy <name>`), a global abort request (`abort`), or
//! the signal that the embedding controller is done with its own work
//! (`master_finished`).
//!
//! # Orders (fan-out)
//!
//! An [`Order`] is broadcast by the coordinator to every participant:
//! the re-registration invitation (`greet`), the registration echo
//! (`hello <name>`, acted on only by the named participant), the
//! section controls (`start`, `load <n>`, `exit`) and the two
//! teardown messages (`abort`, `shutdown`).
//!
//! Every message is a single line of space-separated ASCII tokens;
//! the first token names the kind, integers are decimal.

mod order;
mod report;
mod traits;

pub use self::{
    order::Order,
    report::Report,
    traits::{FromBytes, ToBytes},
};

/// An error that signals a failure when trying to parse a message.
pub type DecodeError = anyhow::Error;
