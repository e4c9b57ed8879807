use async_trait::async_trait;
use tracing::debug;

use runlink_core::{message::Order, message::Report, Phase};

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

/// Idle between runs. The device can be re-discovered (`greet`) and
/// armed (`to_buffered`).
#[derive(Debug)]
pub(crate) struct Manual;

#[async_trait]
impl Step for PhaseState<Manual> {
    async fn step(mut self) -> Result<TransitionOutcome, ParticipantError> {
        let wait = self.state.shared.settings.manual_poll;
        if let Some(order) = self.recv_order(wait).await? {
            match order {
                // The coordinator restarted and is rediscovering
                // devices.
                Order::Greet => self.send_hello().await?,
                // Another device's registration echo.
                Order::Hello { .. } => (),
                // `exit` is legal while manual and changes nothing.
                Order::Exit => (),
                Order::Abort => self.queue(Command::Abort),
                Order::Shutdown => self.queue(Command::Shutdown),
                order => {
                    return Err(ParticipantError::UnexpectedOrder {
                        order,
                        phase: Phase::Manual,
                    })
                }
            }
        }

        while let Some(command) = self.next_command() {
            match command {
                Command::ToBuffered => {
                    return Ok(TransitionOutcome::Complete(self.into_ready().into()))
                }
                Command::Start => {
                    return Ok(TransitionOutcome::Complete(self.into_running().into()))
                }
                Command::Abort => debug!("already manual, ignoring abort"),
                Command::RequestAbort => self.send_report(Report::Abort).await?,
                Command::MasterFinished => self.send_report(Report::MasterFinished).await?,
                Command::Shutdown => {
                    return Ok(TransitionOutcome::Complete(self.into_shutdown().into()))
                }
            }
        }

        Ok(TransitionOutcome::Pending(self.into()))
    }
}

impl IntoPhase<Manual> for State<Manual> {
    fn into_phase(self, mut io: PhaseIo) -> PhaseState<Manual> {
        io.notify_phase(Phase::Manual);
        PhaseState::new(self, io)
    }
}
