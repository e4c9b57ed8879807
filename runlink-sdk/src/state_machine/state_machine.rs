use derive_more::From;

use tokio::sync::mpsc;

use crate::{
    settings::ParticipantSettings,
    state_machine::{
        Command,
        Finished,
        IntoPhase,
        Manual,
        ParticipantError,
        PhaseIo,
        PhaseState,
        Ready,
        Registering,
        Running,
        SharedState,
        Shutdown,
        State,
        Step,
    },
};

/// Outcome of a state machine transition attempt.
pub(crate) enum TransitionOutcome {
    /// Outcome when the state machine cannot make immediate progress.
    /// The state machine is returned unchanged.
    Pending(StateMachine),
    /// Outcome when a transition occurred and the state machine was
    /// updated.
    Complete(StateMachine),
}

impl std::fmt::Debug for TransitionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransitionOutcome::Pending(state) => f.debug_tuple("Pending").field(state).finish(),
            TransitionOutcome::Complete(state) => f.debug_tuple("Complete").field(state).finish(),
        }
    }
}

/// The participant state machine with all its states.
#[derive(From)]
pub(crate) enum StateMachine {
    /// Waiting for the coordinator to acknowledge the registration.
    Registering(PhaseState<Registering>),
    /// Idle; devices can be armed from here.
    Manual(PhaseState<Manual>),
    /// Armed, waiting for `start`.
    Ready(PhaseState<Ready>),
    /// Executing a section.
    Running(PhaseState<Running>),
    /// Section done, waiting for `load`, `exit` or `start`.
    Finished(PhaseState<Finished>),
    /// Terminal.
    Shutdown(PhaseState<Shutdown>),
}

impl std::fmt::Debug for StateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StateMachine::Registering(_) => "Registering",
            StateMachine::Manual(_) => "Manual",
            StateMachine::Ready(_) => "Ready",
            StateMachine::Running(_) => "Running",
            StateMachine::Finished(_) => "Finished",
            StateMachine::Shutdown(_) => "Shutdown",
        };
        f.debug_tuple(name).finish()
    }
}

impl StateMachine {
    /// Create a state machine at the beginning of the registration
    /// handshake.
    pub fn new(
        settings: ParticipantSettings,
        commands: mpsc::UnboundedReceiver<Command>,
        io: PhaseIo,
    ) -> Self {
        let shared = Box::new(SharedState::new(settings, commands));
        State::new(shared, Registering::new()).into_phase(io).into()
    }

    /// Try to make progress.
    pub async fn transition(self) -> Result<TransitionOutcome, ParticipantError> {
        match self {
            StateMachine::Registering(state) => state.step().await,
            StateMachine::Manual(state) => state.step().await,
            StateMachine::Ready(state) => state.step().await,
            StateMachine::Running(state) => state.step().await,
            StateMachine::Finished(state) => state.step().await,
            StateMachine::Shutdown(state) => Ok(TransitionOutcome::Pending(state.into())),
        }
    }

    /// Drive the machine until it shuts down or fails.
    pub async fn run(mut self) -> Result<(), ParticipantError> {
        loop {
            if let StateMachine::Shutdown(_) = self {
                return Ok(());
            }
            self = match self.transition().await? {
                TransitionOutcome::Pending(machine) | TransitionOutcome::Complete(machine) => machine,
            };
        }
    }
}
