use std::time::Duration;

use tokio::sync::mpsc;

use crate::{
    settings::ParticipantSettings,
    state_machine::{io::MockIO, Command, PhaseState, SharedState, State},
};

/// Settings with timeouts small enough for tests.
pub(crate) fn settings() -> ParticipantSettings {
    let mut settings = ParticipantSettings::new("d1".parse().unwrap(), "localhost");
    settings.registration_retry = Duration::from_millis(5);
    settings.manual_poll = Duration::from_millis(1);
    settings.experiment_poll = Duration::from_millis(1);
    settings
}

/// Build a machine state around a mocked IO boundary. The returned
/// sender plays the role of the embedding handle.
pub(crate) fn machine<P>(
    private: P,
    io: MockIO,
) -> (PhaseState<P>, mpsc::UnboundedSender<Command>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let shared = Box::new(SharedState::new(settings(), rx));
    let state = State::new(shared, private);
    (PhaseState::new(state, Box::new(io)), tx)
}
