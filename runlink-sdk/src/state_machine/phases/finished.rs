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

/// The current section is done; the coordinator decides whether the
/// run chains into another section (`load`) or ends (`exit`).
#[derive(Debug)]
pub(crate) struct Finished;

#[async_trait]
impl Step for PhaseState<Finished> {
    async fn step(mut self) -> Result<TransitionOutcome, ParticipantError> {
        let wait = self.state.shared.settings.experiment_poll;
        if let Some(order) = self.recv_order(wait).await? {
            match order {
                Order::Load { section } => {
                    info!("loading section {}", section);
                    self.io.on_load_section(section);
                    let name = self.state.shared.settings.name.clone();
                    self.send_report(Report::Ready { name }).await?;
                    return Ok(TransitionOutcome::Complete(self.into_ready().into()));
                }
                Order::Exit => {
                    info!("run complete");
                    return Ok(TransitionOutcome::Complete(self.into_manual().into()));
                }
                Order::Hello { .. } => (),
                Order::Abort => self.queue(Command::Abort),
                Order::Shutdown => self.queue(Command::Shutdown),
                order => {
                    return Err(ParticipantError::UnexpectedOrder {
                        order,
                        phase: Phase::Finished,
                    })
                }
            }
        }

        while let Some(command) = self.next_command() {
            match command {
                Command::ToBuffered => {
                    return Err(ParticipantError::BufferedOutsideManual {
                        phase: Phase::Finished,
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

impl IntoPhase<Finished> for State<Finished> {
    fn into_phase(self, mut io: PhaseIo) -> PhaseState<Finished> {
        io.notify_phase(Phase::Finished);
        PhaseState::new(self, io)
    }
}
