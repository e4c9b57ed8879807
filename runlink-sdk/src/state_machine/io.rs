use std::time::Duration;

use async_trait::async_trait;

use runlink_core::{
    message::{Order, Report},
    Phase,
};

use crate::{client::LinkError, client::TcpLink, participant::Notifier, traits::DeviceHooks};

/// A dynamically dispatched [`IO`] object.
pub(crate) type PhaseIo = Box<dyn IO>;

/// Return a dynamically dispatched [`IO`] object.
pub(crate) fn boxed_io<H>(link: TcpLink, hooks: H, notifier: Notifier) -> PhaseIo
where
    H: DeviceHooks + Send + 'static,
{
    Box::new(ParticipantIo {
        link,
        hooks,
        notifier,
    })
}

/// A trait that gathers everything the state machine needs from the
/// outside world: the socket link to the coordinator, the device
/// hooks, and the notifications for the embedding handle.
///
/// Having a single trait instead of three keeps the state machine free
/// of generic parameters and makes the whole boundary mockable in the
/// phase tests.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub(crate) trait IO: Send + 'static {
    /// Push one report onto the fan-in channel.
    async fn send_report(&mut self, report: Report) -> Result<(), LinkError>;

    /// Wait up to `wait` for the next broadcast order.
    async fn poll_order(&mut self, wait: Duration) -> Result<Option<Order>, LinkError>;

    /// Ask the device whether the current section is done.
    fn is_finished(&mut self) -> bool;
    /// Tell the device that a section started.
    fn on_start(&mut self);
    /// Tell the device to prepare the given section.
    fn on_load_section(&mut self, section: u32);

    /// Publish the local phase to the embedding handle.
    fn notify_phase(&mut self, phase: Phase);
    /// Publish that the registration handshake completed.
    fn notify_registered(&mut self);
}

struct ParticipantIo<H> {
    link: TcpLink,
    hooks: H,
    notifier: Notifier,
}

#[async_trait]
impl<H> IO for ParticipantIo<H>
where
    H: DeviceHooks + Send + 'static,
{
    async fn send_report(&mut self, report: Report) -> Result<(), LinkError> {
        self.link.send(&report).await
    }

    async fn poll_order(&mut self, wait: Duration) -> Result<Option<Order>, LinkError> {
        self.link.poll(wait).await
    }

    fn is_finished(&mut self) -> bool {
        self.hooks.is_finished()
    }

    fn on_start(&mut self) {
        self.hooks.on_start()
    }

    fn on_load_section(&mut self, section: u32) {
        self.hooks.on_load_section(section)
    }

    fn notify_phase(&mut self, phase: Phase) {
        self.notifier.phase(phase)
    }

    fn notify_registered(&mut self) {
        self.notifier.registered()
    }
}
