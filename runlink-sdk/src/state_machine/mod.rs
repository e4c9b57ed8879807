//! The state machine that drives a participant through a run.
//!
//! After the registration handshake ([`Registering`]) the machine
//! walks the device's local phases: manual → ready → running →
//! finished, then back to ready (section chain) or manual (end of
//! run). Every state multiplexes the broadcast orders from the
//! coordinator with the commands of the embedding controller, and the
//! running state additionally polls the device's `is_finished` hook.

mod io;
mod phase;
mod phases;
#[allow(clippy::module_inception)]
mod state_machine;

use self::{
    phase::{IntoPhase, PhaseState, SharedState, State, Step},
    phases::{Finished, Manual, Ready, Registering, Running, Shutdown},
};

pub(crate) use self::{
    io::{boxed_io, PhaseIo},
    state_machine::{StateMachine, TransitionOutcome},
};

use runlink_core::{message::Order, Phase};
use thiserror::Error;

use crate::client::LinkError;

/// A command enqueued for the participant's event loop.
///
/// Commands come from two places: the embedding controller (through
/// the [`ParticipantHandle`]) and inbound `abort`/`shutdown` orders,
/// which are queued as commands so that they take effect with command
/// precedence.
///
/// [`ParticipantHandle`]: crate::ParticipantHandle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Arm the device: manual → ready.
    ToBuffered,
    /// Flip the device to running without a coordinator `start`.
    /// Diagnostic bypass, not part of the normal flow.
    Start,
    /// Return to manual.
    Abort,
    /// Request a global abort: report `abort` upstream, then return to
    /// manual.
    RequestAbort,
    /// Report that the embedding controller's own work is done.
    MasterFinished,
    /// Leave the event loop.
    Shutdown,
}

/// Error that ends a participant's event loop.
#[derive(Debug, Error)]
pub enum ParticipantError {
    /// The connection to the coordinator failed.
    #[error("coordinator link failed: {0}")]
    Link(#[from] LinkError),
    /// An order arrived in a phase in which it is not legal.
    #[error("received `{order}` while in the {phase} phase")]
    UnexpectedOrder { order: Order, phase: Phase },
    /// The embedding controller armed the device outside the manual
    /// phase.
    #[error("`to_buffered` command received while in the {phase} phase")]
    BufferedOutsideManual { phase: Phase },
}

#[cfg(test)]
mod tests;
