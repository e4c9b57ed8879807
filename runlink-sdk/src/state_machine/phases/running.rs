use async_trait::async_trait;
use tracing::info;

use runlink_core::{
    message::{Order, Report},
    Phase,
};

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

/// A section is executing on the device. The `is_finished` hook is
/// polled once per iteration; when it reports completion the device
/// sends `fin` upstream.
#[derive(Debug)]
pub(crate) struct Running;

#[async_trait]
impl Step for PhaseState<Running> {
    async fn step(mut self) -> Result<TransitionOutcome, ParticipantError> {
        let wait = self.state.shared.settings.experiment_poll;
        if let Some(order) = self.recv_order(wait).await? {
            match order {
                Order::Hello { .. } => (),
                Order::Abort => self.queue(Command::Abort),
                Order::Shutdown => self.queue(Command::Shutdown),
                order => {
                    return Err(ParticipantError::UnexpectedOrder {
                        order,
                        phase: Phase::Running,
                    })
                }
            }
        }

        while let Some(command) = self.next_command() {
            match command {
                Command::ToBuffered => {
                    return Err(ParticipantError::BufferedOutsideManual {
                        phase: Phase::Running,
                    })
                }
                Command::Start => (),
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

        if self.io.is_finished() {
            info!("section finished");
            let name = self.state.shared.settings.name.clone();
            self.send_report(Report::Finished { name }).await?;
            return Ok(TransitionOutcome::Complete(self.into_finished().into()));
        }

        Ok(TransitionOutcome::Pending(self.into()))
    }
}

impl IntoPhase<Running> for State<Running> {
    fn into_phase(self, mut io: PhaseIo) -> PhaseState<Running> {
        io.notify_phase(Phase::Running);
        PhaseState::new(self, io)
    }
}
