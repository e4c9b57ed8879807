//! Observable coordinator state, published over watch channels.

use thiserror::Error;
use tokio::sync::watch;

use runlink_core::Phase;

/// Error returned by the subscriber's waiters when the coordinator's
/// event loop has terminated.
#[derive(Debug, Error)]
#[error("the coordinator event loop terminated")]
pub struct CoordinatorGone;

/// The event-loop side: publishes the global phase and the roster
/// size whenever they change.
pub(crate) struct EventPublisher {
    phase: watch::Sender<Phase>,
    devices: watch::Sender<usize>,
    last_phase: Phase,
    last_devices: usize,
}

/// Read access to the coordinator's observable state.
#[derive(Debug, Clone)]
pub struct EventSubscriber {
    phase: watch::Receiver<Phase>,
    devices: watch::Receiver<usize>,
}

impl EventPublisher {
    /// Initialize a publisher/subscriber pair with the coordinator's
    /// initial state.
    pub fn init() -> (Self, EventSubscriber) {
        let (phase_tx, phase_rx) = watch::channel(Phase::Manual);
        let (devices_tx, devices_rx) = watch::channel(0);
        let publisher = Self {
            phase: phase_tx,
            devices: devices_tx,
            last_phase: Phase::Manual,
            last_devices: 0,
        };
        let subscriber = EventSubscriber {
            phase: phase_rx,
            devices: devices_rx,
        };
        (publisher, subscriber)
    }

    pub fn publish_phase(&mut self, phase: Phase) {
        if self.last_phase != phase {
            self.last_phase = phase;
            let _ = self.phase.send(phase);
        }
    }

    pub fn publish_devices(&mut self, count: usize) {
        if self.last_devices != count {
            self.last_devices = count;
            let _ = self.devices.send(count);
        }
    }
}

impl EventSubscriber {
    /// The coordinator's current global phase.
    pub fn global_phase(&self) -> Phase {
        *self.phase.borrow()
    }

    /// The number of registered devices.
    pub fn device_count(&self) -> usize {
        *self.devices.borrow()
    }

    /// Wait until the coordinator reaches the given global phase.
    pub async fn wait_for_phase(&mut self, phase: Phase) -> Result<(), CoordinatorGone> {
        loop {
            if *self.phase.borrow_and_update() == phase {
                return Ok(());
            }
            self.phase.changed().await.map_err(|_| CoordinatorGone)?;
        }
    }

    /// Wait until at least `count` devices are registered.
    pub async fn wait_for_devices(&mut self, count: usize) -> Result<(), CoordinatorGone> {
        loop {
            if *self.devices.borrow_and_update() >= count {
                return Ok(());
            }
            self.devices.changed().await.map_err(|_| CoordinatorGone)?;
        }
    }
}
