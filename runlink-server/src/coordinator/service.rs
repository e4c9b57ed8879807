use std::{collections::VecDeque, time::Duration};

use thiserror::Error;
use tokio::{sync::mpsc, time::sleep};
use tracing::{debug, info, warn};

use runlink_core::{message::Order, message::Report, Phase};

use crate::{
    coordinator::{
        events::{EventPublisher, EventSubscriber},
        protocol::{Event, Protocol},
        ProtocolViolation,
    },
    settings::RunSettings,
    traits::RunPlan,
    transport::{FanIn, FanOut, TransportError},
};

/// A command enqueued for the coordinator's event loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// Arm the roster: manual → buffered.
    ToBuffered,
    /// Start the run: buffered → running.
    Start,
    /// Abandon the run, back to manual.
    Abort,
    /// Broadcast `shutdown` and leave the event loop.
    Shutdown,
}

/// Error that ends the coordinator's event loop.
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("protocol violation: {0}")]
    Violation(#[from] ProtocolViolation),
    #[error("transport failure: {0}")]
    Transport(#[from] TransportError),
}

/// The coordinator's event-loop worker.
///
/// Owns the transport endpoints, the protocol state machine and the
/// [`RunPlan`]. Each loop iteration drains the fan-in, then the
/// command queue, then evaluates the automatic transitions; this
/// ordering lets a pending abort win over a transition that freshly
/// drained reports would trigger.
pub struct CoordinatorService {
    fan_in: FanIn,
    fan_out: FanOut,
    protocol: Protocol,
    plan: Box<dyn RunPlan>,
    /// Commands from the embedding handle.
    commands: mpsc::UnboundedReceiver<Command>,
    /// Commands queued by the loop itself (participant abort requests,
    /// finish timeouts). Drained before the embedding channel.
    pending: VecDeque<Command>,
    events: EventPublisher,
    settings: RunSettings,
}

/// A handle for interacting with a running [`CoordinatorService`].
/// All command methods are non-blocking enqueues.
#[derive(Clone)]
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
    events: EventSubscriber,
    discovery_window: Duration,
}

impl CoordinatorService {
    /// Create a service around already-bound transport endpoints.
    pub fn new(
        fan_in: FanIn,
        fan_out: FanOut,
        plan: Box<dyn RunPlan>,
        settings: RunSettings,
    ) -> (Self, CoordinatorHandle) {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events, subscriber) = EventPublisher::init();
        let handle = CoordinatorHandle {
            commands: commands_tx,
            events: subscriber,
            discovery_window: settings.discovery_window(),
        };
        let service = Self {
            protocol: Protocol::new(settings.finish_timeout()),
            fan_in,
            fan_out,
            plan,
            commands: commands_rx,
            pending: VecDeque::new(),
            events,
            settings,
        };
        (service, handle)
    }

    /// Run the event loop to completion.
    pub async fn run(mut self) -> Result<(), CoordinatorError> {
        // Fan-out subscribers only receive what is broadcast after
        // they attach; give early participants a moment to connect
        // before inviting registrations.
        sleep(self.settings.greet_delay()).await;
        info!("coordinator up, greeting participants");
        self.fan_out.broadcast(Order::Greet);

        loop {
            let wait = match self.protocol.phase() {
                Phase::Manual => self.settings.manual_poll(),
                _ => self.settings.experiment_poll(),
            };

            if let Some(report) = self.fan_in.poll(wait).await? {
                self.apply_report(report)?;
                while let Some(report) = self.fan_in.try_recv() {
                    self.apply_report(report)?;
                }
            }

            while let Some(command) = self.next_command() {
                debug!("handling command {:?}", command);
                match command {
                    Command::ToBuffered => self.protocol.to_buffered(),
                    Command::Start => self.protocol.start()?,
                    Command::Abort => self.protocol.abort(),
                    Command::Shutdown => {
                        info!("shutting down");
                        self.fan_out.broadcast(Order::Shutdown);
                        return Ok(());
                    }
                }
                self.dispatch_events();
            }

            self.protocol.evaluate();
            self.dispatch_events();
        }
    }

    fn next_command(&mut self) -> Option<Command> {
        if let Some(command) = self.pending.pop_front() {
            return Some(command);
        }
        self.commands.try_recv().ok()
    }

    fn apply_report(&mut self, report: Report) -> Result<(), CoordinatorError> {
        debug!("handling report `{}`", report);
        self.protocol.handle_report(report)?;
        self.dispatch_events();
        Ok(())
    }

    /// Execute the effects requested by the protocol.
    fn dispatch_events(&mut self) {
        while let Some(event) = self.protocol.next_event() {
            match event {
                Event::Broadcast(order) => self.fan_out.broadcast(order),
                Event::ComputeNextSection => {
                    let next = self.plan.next_section();
                    self.protocol.next_section_computed(next);
                }
                Event::TransitionTime(elapsed) => self.plan.transition_time(elapsed),
                Event::RunTime(elapsed) => self.plan.run_time(elapsed),
                Event::QueueAbort => self.pending.push_back(Command::Abort),
            }
        }
        self.events.publish_phase(self.protocol.phase());
        self.events.publish_devices(self.protocol.device_count());
    }
}

impl CoordinatorHandle {
    /// Arm the roster: manual → buffered.
    pub fn send_buffered(&self) {
        self.enqueue(Command::ToBuffered)
    }

    /// Start the run: buffered → running.
    pub fn send_start(&self) {
        self.enqueue(Command::Start)
    }

    /// Abandon the run and return everything to manual.
    pub fn abort(&self) {
        self.enqueue(Command::Abort)
    }

    /// Broadcast `shutdown` to all participants and stop the event
    /// loop.
    pub fn shutdown(&self) {
        self.enqueue(Command::Shutdown)
    }

    /// Subscribe to the coordinator's observable state.
    pub fn events(&self) -> EventSubscriber {
        self.events.clone()
    }

    /// Give participants started alongside the coordinator a window to
    /// connect and register before the run is armed.
    pub async fn discovery_window(&self) {
        sleep(self.discovery_window).await
    }

    fn enqueue(&self, command: Command) {
        if self.commands.send(command).is_err() {
            warn!("coordinator event loop is gone, dropping command");
        }
    }
}
