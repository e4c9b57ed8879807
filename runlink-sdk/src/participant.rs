//! The embedding wrapper around the participant state machine.

use thiserror::Error;
use tokio::sync::{mpsc, watch};
use tracing::warn;

use runlink_core::Phase;

use crate::{
    client::TcpLink,
    settings::ParticipantSettings,
    state_machine::{boxed_io, Command, ParticipantError, StateMachine},
    traits::DeviceHooks,
};

/// Error returned by the handle's waiters when the participant's event
/// loop has terminated.
#[derive(Debug, Error)]
#[error("the participant event loop terminated")]
pub struct ParticipantGone;

/// A device-side participant.
///
/// [`Participant::run`] connects to the coordinator, performs the
/// registration handshake and then reacts to broadcast orders until
/// it is shut down. All interaction with a running participant goes
/// through its [`ParticipantHandle`].
pub struct Participant<H> {
    settings: ParticipantSettings,
    hooks: H,
    commands: mpsc::UnboundedReceiver<Command>,
    notifier: Notifier,
}

/// A handle for interacting with a running [`Participant`]. All
/// command methods are non-blocking enqueues.
#[derive(Clone)]
pub struct ParticipantHandle {
    commands: mpsc::UnboundedSender<Command>,
    phase: watch::Receiver<Phase>,
    registered: watch::Receiver<bool>,
}

impl<H> Participant<H>
where
    H: DeviceHooks + Send + 'static,
{
    /// Create a participant and the handle to drive it.
    pub fn new(settings: ParticipantSettings, hooks: H) -> (Self, ParticipantHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (phase_tx, phase_rx) = watch::channel(Phase::Manual);
        let (registered_tx, registered_rx) = watch::channel(false);
        let handle = ParticipantHandle {
            commands: commands_tx,
            phase: phase_rx,
            registered: registered_rx,
        };
        let participant = Self {
            settings,
            hooks,
            commands: commands_rx,
            notifier: Notifier {
                phase: phase_tx,
                registered: registered_tx,
            },
        };
        (participant, handle)
    }

    /// Run the participant to completion: connect, register, then
    /// follow the coordinator's orders.
    pub async fn run(self) -> Result<(), ParticipantError> {
        let Self {
            settings,
            hooks,
            commands,
            notifier,
        } = self;
        let link = TcpLink::connect(&settings.fan_in, &settings.fan_out).await?;
        let io = boxed_io(link, hooks, notifier);
        StateMachine::new(settings, commands, io).run().await
    }
}

impl ParticipantHandle {
    /// Arm the device: manual → ready.
    pub fn send_buffered(&self) {
        self.enqueue(Command::ToBuffered)
    }

    /// Flip the device to running without a coordinator `start`.
    /// Diagnostic bypass; its interaction with section chaining is
    /// undefined.
    pub fn send_running(&self) {
        self.enqueue(Command::Start)
    }

    /// Request a global abort and return the device to manual.
    pub fn abort(&self) {
        self.enqueue(Command::RequestAbort)
    }

    /// Report that the embedding controller's own work is done. Arms
    /// the coordinator's finish timeout.
    pub fn send_master_finished(&self) {
        self.enqueue(Command::MasterFinished)
    }

    /// Tear the participant down.
    pub fn shutdown(&self) {
        self.enqueue(Command::Shutdown)
    }

    /// The last local phase published by the event loop.
    pub fn phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// Wait until the registration handshake has completed.
    pub async fn wait_until_registered(&mut self) -> Result<(), ParticipantGone> {
        loop {
            if *self.registered.borrow_and_update() {
                return Ok(());
            }
            self.registered
                .changed()
                .await
                .map_err(|_| ParticipantGone)?;
        }
    }

    /// Wait until the device reports the given local phase.
    pub async fn wait_for_phase(&mut self, phase: Phase) -> Result<(), ParticipantGone> {
        loop {
            if *self.phase.borrow_and_update() == phase {
                return Ok(());
            }
            self.phase.changed().await.map_err(|_| ParticipantGone)?;
        }
    }

    fn enqueue(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("participant event loop is gone, dropping command");
        }
    }
}

/// The event-loop side of the embedding notifications.
pub(crate) struct Notifier {
    phase: watch::Sender<Phase>,
    registered: watch::Sender<bool>,
}

impl Notifier {
    pub(crate) fn phase(&mut self, phase: Phase) {
        let _ = self.phase.send(phase);
    }

    pub(crate) fn registered(&mut self) {
        let _ = self.registered.send(true);
    }
}
