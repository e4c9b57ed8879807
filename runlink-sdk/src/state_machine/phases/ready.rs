use async_trait::async_trait;
use tracing::info;

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

/// Armed and waiting for the coordinator's `start`.
#[derive(Debug)]
pub(crate) struct Ready;

#[async_trait]
impl Step for PhaseState<Ready> {
    async fn step(mut self) -> Result<TransitionOutcome, ParticipantError> {
        let wait = self.state.shared.settings.experiment_poll;
        if let Some(order) = self.recv_order(wait).await? {
            match order {
                Order::Start => {
                    info!("section started");
                    self.io.on_start();
                    return Ok(TransitionOutcome::Complete(self.into_running().into()));
                }
                Order::Hello { .. } => (),
                Order::Abort => self.queue(Command::Abort),
                Order::Shutdown => self.queue(Command::Shutdown),
                order => {
                    return Err(ParticipantError::UnexpectedOrder {
                        order,
                        phase: Phase::Ready,
                    })
                }
            }
        }

        while let Some(command) = self.next_command() {
            match command {
                Command::ToBuffered => {
                    return Err(ParticipantError::BufferedOutsideManual {
                        phase: Phase::Ready,
                    })
                }
                Command::Start => {
                    return Ok(TransitionOutcome::Complete(self.into_running().into()))
                }
                Command::Abort => return Ok(TransitionOutcome::Complete(self.into_manual().into())),
                Command::RequestAbort => {
                    self.send_report(Report::Abort).await?;
                    return Ok(TransitionOutcome::Complete(self.into_manual().into()));
                }
                Command::MasterFinished => self.send_report(Report::MasterFinished).await?,
                Command::Shutdown => {
                    return Ok(TransitionOutcome::Complete(self.into_shutdown().into()))
                }
            }
        }

        Ok(TransitionOutcome::Pending(self.into()))
    }
}

impl IntoPhase<Ready> for State<Ready> {
    fn into_phase(self, mut io: PhaseIo) -> PhaseState<Ready> {
        io.notify_phase(Phase::Ready);
        PhaseState::new(self, io)
    }
}
