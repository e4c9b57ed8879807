use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info};

use runlink_core::{message::Order, Phase};

use crate::state_machine::{
    Command,
    IntoPhase,
    ParticipantError,
    PhaseIo,
    PhaseState,
    State,
    Step,
    TransitionOutcome,
};

/// The registration handshake: `hello` is sent on the fan-in and the
/// coordinator's echo is awaited on the fan-out. Since a fan-out
/// subscriber misses everything broadcast before it attached, the
/// request is re-sent until the echo arrives.
#[derive(Debug)]
pub(crate) struct Registering {
    last_hello: Option<Instant>,
}

impl Registering {
    pub fn new() -> Self {
        Self { last_hello: None }
    }
}

#[async_trait]
impl Step for PhaseState<Registering> {
    async fn step(mut self) -> Result<TransitionOutcome, ParticipantError> {
        let retry = self.state.shared.settings.registration_retry;
        let due = self
            .state
            .private
            .last_hello
            .map_or(true, |at| at.elapsed() >= retry);
        if due {
            debug!("sending registration request");
            self.send_hello().await?;
            self.state.private.last_hello = Some(Instant::now());
        }

        if let Some(order) = self.recv_order(retry).await? {
            match order {
                Order::Hello { ref name } if *name == self.state.shared.settings.name => {
                    info!("registered with the coordinator");
                    self.io.notify_registered();
                    return Ok(TransitionOutcome::Complete(self.into_manual().into()));
                }
                Order::Greet => {
                    self.send_hello().await?;
                    self.state.private.last_hello = Some(Instant::now());
                }
                order => debug!("ignoring `{}` while registering", order),
            }
        }

        // Only `shutdown` acts before registration completes; every
        // other command waits in the queue for the main loop.
        while let Ok(command) = self.state.shared.commands.try_recv() {
            if command == Command::Shutdown {
                return Ok(TransitionOutcome::Complete(self.into_shutdown().into()));
            }
            self.state.shared.pending.push_back(command);
        }

        Ok(TransitionOutcome::Pending(self.into()))
    }
}

impl IntoPhase<Registering> for State<Registering> {
    fn into_phase(self, mut io: PhaseIo) -> PhaseState<Registering> {
        io.notify_phase(Phase::Manual);
        PhaseState::new(self, io)
    }
}
