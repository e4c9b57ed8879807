use derive_more::Display;

/// A station in the lifecycle of an experiment run.
///
/// The coordinator's global phase only ever takes the values
/// [`Manual`], [`Buffered`], [`Running`] and [`Finished`]; a
/// participant's local phase takes [`Manual`], [`Ready`], [`Running`]
/// and [`Finished`]. The coordinator also keeps one `Phase` per
/// registered device, holding the last phase that device reported.
///
/// [`Manual`]: Phase::Manual
/// [`Buffered`]: Phase::Buffered
/// [`Running`]: Phase::Running
/// [`Finished`]: Phase::Finished
/// [`Ready`]: Phase::Ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum Phase {
    /// Idle. Devices may register, nothing is buffered.
    #[display(fmt = "manual")]
    Manual,
    /// The roster is armed and waiting for the run to start.
    #[display(fmt = "buffered")]
    Buffered,
    /// A section of the run is executing.
    #[display(fmt = "running")]
    Running,
    /// The current section is done.
    #[display(fmt = "finished")]
    Finished,
    /// The next section is loaded and can be started.
    #[display(fmt = "ready")]
    Ready,
}
