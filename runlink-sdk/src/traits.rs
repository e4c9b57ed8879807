/// A trait used by the participant's event loop to hand control to the
/// device at the relevant points of a run.
///
/// All methods run synchronously on the event-loop worker; a hook that
/// blocks stalls the participant.
pub trait DeviceHooks {
    /// Polled once per loop iteration while the device is running a
    /// section. Once this returns `true` the participant reports
    /// `fin` and waits for the next order.
    fn is_finished(&mut self) -> bool {
        true
    }

    /// Invoked when the coordinator starts or resumes a section.
    fn on_start(&mut self) {}

    /// Invoked when the coordinator announces the next section. The
    /// device is reported ready as soon as this returns.
    fn on_load_section(&mut self, _section: u32) {}
}

/// Hooks that do nothing: every section is finished as soon as it is
/// polled.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHooks;

impl DeviceHooks for NoHooks {}
