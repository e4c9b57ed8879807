use crate::state_machine::{IntoPhase, PhaseIo, PhaseState, State};

/// Terminal state: the event loop returns and the sockets are closed
/// by dropping the IO object.
#[derive(Debug)]
pub(crate) struct Shutdown;

impl IntoPhase<Shutdown> for State<Shutdown> {
    fn into_phase(self, io: PhaseIo) -> PhaseState<Shutdown> {
        PhaseState::new(self, io)
    }
}
