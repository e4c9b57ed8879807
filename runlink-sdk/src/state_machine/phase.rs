use std::{collections::VecDeque, time::Duration};

use async_trait::async_trait;
use tokio::sync::mpsc;

use runlink_core::message::{Order, Report};

use crate::{
    settings::ParticipantSettings,
    state_machine::{
        Command,
        Finished,
        Manual,
        ParticipantError,
        PhaseIo,
        Ready,
        Running,
        Shutdown,
        TransitionOutcome,
    },
};

/// Data common to all machine states.
pub(crate) struct SharedState {
    pub settings: ParticipantSettings,
    /// Commands enqueued by the embedding controller.
    pub commands: mpsc::UnboundedReceiver<Command>,
    /// Commands queued locally, e.g. inbound `abort`/`shutdown`
    /// orders. Drained before the embedding channel.
    pub pending: VecDeque<Command>,
}

impl SharedState {
    pub fn new(settings: ParticipantSettings, commands: mpsc::UnboundedReceiver<Command>) -> Self {
        Self {
            settings,
            commands,
            pending: VecDeque::new(),
        }
    }
}

/// State of the state machine.
pub(crate) struct State<P> {
    /// Data specific to the current machine state.
    pub private: P,
    /// Data shared by all machine states.
    pub shared: Box<SharedState>,
}

impl<P> State<P> {
    pub fn new(shared: Box<SharedState>, private: P) -> Self {
        Self { private, shared }
    }
}

/// The state machine in a specific machine state.
pub(crate) struct PhaseState<P> {
    pub(in crate::state_machine) state: State<P>,
    /// Opaque handle for performing IO: talking to the coordinator,
    /// invoking the device hooks, publishing notifications.
    pub(in crate::state_machine) io: PhaseIo,
}

/// A trait that each `PhaseState<P>` implements. One call handles at
/// most one inbound order, then the queued commands, then the state's
/// automatic transition, and reports whether the machine moved to
/// another state.
#[async_trait]
pub(crate) trait Step {
    async fn step(mut self) -> Result<TransitionOutcome, ParticipantError>;
}

/// Trait for building a [`PhaseState<P>`] from a [`State<P>`].
///
/// Entering a machine state has a side effect (publishing the new
/// local phase through the IO object), so construction goes through
/// this trait instead of [`PhaseState::new`].
pub(crate) trait IntoPhase<P> {
    fn into_phase(self, io: PhaseIo) -> PhaseState<P>;
}

impl<P> PhaseState<P> {
    /// Build a new state. Use [`IntoPhase`] instead, which also
    /// publishes the phase change.
    pub(in crate::state_machine) fn new(state: State<P>, io: PhaseIo) -> Self {
        Self { state, io }
    }

    /// Pop the next queued command: locally queued orders first, then
    /// the embedding channel.
    pub(in crate::state_machine) fn next_command(&mut self) -> Option<Command> {
        if let Some(command) = self.state.shared.pending.pop_front() {
            return Some(command);
        }
        self.state.shared.commands.try_recv().ok()
    }

    /// Queue a command behind the ones already waiting.
    pub(in crate::state_machine) fn queue(&mut self, command: Command) {
        self.state.shared.pending.push_back(command);
    }

    pub(in crate::state_machine) async fn send_report(
        &mut self,
        report: Report,
    ) -> Result<(), ParticipantError> {
        Ok(self.io.send_report(report).await?)
    }

    /// Send the registration request for this device.
    pub(in crate::state_machine) async fn send_hello(&mut self) -> Result<(), ParticipantError> {
        let name = self.state.shared.settings.name.clone();
        self.send_report(Report::Hello { name }).await
    }

    pub(in crate::state_machine) async fn recv_order(
        &mut self,
        wait: Duration,
    ) -> Result<Option<Order>, ParticipantError> {
        Ok(self.io.poll_order(wait).await?)
    }

    pub(in crate::state_machine) fn into_manual(self) -> PhaseState<Manual> {
        State::new(self.state.shared, Manual).into_phase(self.io)
    }

    pub(in crate::state_machine) fn into_ready(self) -> PhaseState<Ready> {
        State::new(self.state.shared, Ready).into_phase(self.io)
    }

    pub(in crate::state_machine) fn into_running(self) -> PhaseState<Running> {
        State::new(self.state.shared, Running).into_phase(self.io)
    }

    pub(in crate::state_machine) fn into_finished(self) -> PhaseState<Finished> {
        State::new(self.state.shared, Finished).into_phase(self.io)
    }

    pub(in crate::state_machine) fn into_shutdown(self) -> PhaseState<Shutdown> {
        State::new(self.state.shared, Shutdown).into_phase(self.io)
    }
}
