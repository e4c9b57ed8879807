use std::{
    collections::{HashMap, VecDeque},
    time::{Duration, Instant},
};

use thiserror::Error;
use tracing::{debug, info, warn};

use runlink_core::{
    message::{Order, Report},
    DeviceName,
    Phase,
};

/// A violation of the coordination protocol. Fatal for the
/// coordinator's event loop.
#[derive(Debug, Error)]
pub enum ProtocolViolation {
    #[error("device `{name}` tried to register while the run was {phase}")]
    RegistrationOutsideManual { name: DeviceName, phase: Phase },
    #[error("unexpected `{report}` report while {phase}")]
    UnexpectedReport { report: Report, phase: Phase },
    #[error("report from unregistered device `{name}`")]
    UnknownDevice { name: DeviceName },
    #[error("`start` command while {phase}, the roster must be buffered first")]
    StartOutsideBuffered { phase: Phase },
}

/// An effect requested by the state machine. The service executes the
/// effect; the state machine itself performs no IO.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Event {
    /// Broadcast the given order on the fan-out.
    Broadcast(Order),
    /// Ask the run plan for the next section and feed the answer back
    /// through [`Protocol::next_section_computed`].
    ComputeNextSection,
    /// Report how long the devices took to get ready for a section.
    /// `None` for the first section of a run.
    TransitionTime(Option<Duration>),
    /// Report the duration of a completed section.
    RunTime(Duration),
    /// Enqueue an `abort` command behind the pending commands.
    QueueAbort,
}

/// The coordinator state machine.
///
/// Owns the global phase and the roster, decides on phase transitions,
/// and emits [`Event`]s for everything that touches the outside world.
pub(crate) struct Protocol {
    /// The global phase. Never [`Phase::Ready`].
    phase: Phase,
    /// The last phase each registered device reported. The roster is
    /// frozen outside the manual phase.
    roster: HashMap<DeviceName, Phase>,
    /// When the embedding controller declared its own work done.
    master_finished_at: Option<Instant>,
    /// When the current section was started.
    section_started_at: Option<Instant>,
    /// When the pending section load was broadcast.
    load_started_at: Option<Instant>,
    finish_timeout: Duration,
    /// Events emitted by the state machine.
    events: VecDeque<Event>,
}

impl Protocol {
    pub fn new(finish_timeout: Duration) -> Self {
        Self {
            phase: Phase::Manual,
            roster: HashMap::new(),
            master_finished_at: None,
            section_started_at: None,
            load_started_at: None,
            finish_timeout,
            events: VecDeque::new(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn device_count(&self) -> usize {
        self.roster.len()
    }

    /// Retrieve the next pending event.
    pub fn next_event(&mut self) -> Option<Event> {
        self.events.pop_front()
    }

    fn emit(&mut self, event: Event) {
        self.events.push_back(event);
    }

    /// Handle one report from the fan-in.
    pub fn handle_report(&mut self, report: Report) -> Result<(), ProtocolViolation> {
        match report {
            Report::Hello { name } => self.register(name),
            Report::Finished { name } => self.device_finished(name),
            Report::Ready { name } => self.device_ready(name),
            Report::Abort => {
                info!("abort requested by a participant");
                self.emit(Event::QueueAbort);
                Ok(())
            }
            Report::MasterFinished => {
                debug!("master finished, arming the finish timeout");
                self.master_finished_at = Some(Instant::now());
                Ok(())
            }
        }
    }

    fn register(&mut self, name: DeviceName) -> Result<(), ProtocolViolation> {
        if self.phase != Phase::Manual {
            return Err(ProtocolViolation::RegistrationOutsideManual {
                name,
                phase: self.phase,
            });
        }
        info!("registering device `{}`", name);
        self.roster.insert(name.clone(), Phase::Manual);
        self.emit(Event::Broadcast(Order::Hello { name }));
        Ok(())
    }

    fn device_finished(&mut self, name: DeviceName) -> Result<(), ProtocolViolation> {
        match self.phase {
            Phase::Running => self.set_device_phase(name, Phase::Finished),
            // A stale `fin` means the device missed the end of an
            // earlier run and is stranded in running; `exit` brings it
            // back to manual.
            Phase::Manual => {
                warn!("stale `fin` from `{}`, broadcasting `exit`", name);
                self.emit(Event::Broadcast(Order::Exit));
                Ok(())
            }
            phase => Err(ProtocolViolation::UnexpectedReport {
                report: Report::Finished { name },
                phase,
            }),
        }
    }

    fn device_ready(&mut self, name: DeviceName) -> Result<(), ProtocolViolation> {
        if self.phase != Phase::Finished {
            return Err(ProtocolViolation::UnexpectedReport {
                report: Report::Ready { name },
                phase: self.phase,
            });
        }
        self.set_device_phase(name, Phase::Ready)
    }

    fn set_device_phase(&mut self, name: DeviceName, phase: Phase) -> Result<(), ProtocolViolation> {
        match self.roster.get_mut(&name) {
            Some(entry) => {
                debug!("device `{}` is {}", name, phase);
                *entry = phase;
                Ok(())
            }
            None => Err(ProtocolViolation::UnknownDevice { name }),
        }
    }

    /// Arm the roster: manual → buffered, every device counts as
    /// ready. Ignored outside the manual phase.
    pub fn to_buffered(&mut self) {
        if self.phase != Phase::Manual {
            warn!("ignoring `to_buffered` while {}", self.phase);
            return;
        }
        info!("arming the roster ({} devices)", self.roster.len());
        self.phase = Phase::Buffered;
        for entry in self.roster.values_mut() {
            *entry = Phase::Ready;
        }
    }

    /// Start the run: buffered → running.
    pub fn start(&mut self) -> Result<(), ProtocolViolation> {
        if self.phase != Phase::Buffered {
            return Err(ProtocolViolation::StartOutsideBuffered { phase: self.phase });
        }
        info!("starting the run");
        self.start_section(None);
        Ok(())
    }

    /// Abort the run from any phase: broadcast `abort`, back to
    /// manual.
    pub fn abort(&mut self) {
        info!("aborting the run");
        self.emit(Event::Broadcast(Order::Abort));
        self.phase = Phase::Manual;
        self.master_finished_at = None;
        self.section_started_at = None;
        self.load_started_at = None;
    }

    /// Feed back the run plan's answer to [`Event::ComputeNextSection`].
    pub fn next_section_computed(&mut self, next: Option<u32>) {
        match next {
            Some(section) => {
                info!("chaining into section {}", section);
                self.emit(Event::Broadcast(Order::Load { section }));
                self.load_started_at = Some(Instant::now());
                self.phase = Phase::Finished;
            }
            None => {
                info!("no next section, ending the run");
                self.emit(Event::Broadcast(Order::Exit));
                self.phase = Phase::Manual;
            }
        }
    }

    /// Evaluate the automatic transitions. Called once per loop
    /// iteration, after the reports and the commands were drained.
    pub fn evaluate(&mut self) {
        match self.phase {
            Phase::Running => {
                if self.all_devices(Phase::Finished) {
                    if let Some(started) = self.section_started_at.take() {
                        self.emit(Event::RunTime(started.elapsed()));
                    }
                    debug!("all devices finished, computing the next section");
                    self.emit(Event::ComputeNextSection);
                } else if let Some(at) = self.master_finished_at {
                    if at.elapsed() > self.finish_timeout {
                        warn!(
                            "devices failed to finish within {:?}, aborting",
                            self.finish_timeout
                        );
                        self.master_finished_at = None;
                        self.emit(Event::QueueAbort);
                    }
                }
            }
            Phase::Finished => {
                if self.all_devices(Phase::Ready) {
                    let elapsed = self.load_started_at.take().map(|at| at.elapsed());
                    debug!("all devices ready, resuming");
                    self.start_section(elapsed);
                }
            }
            _ => {}
        }
    }

    /// Begin a section: fire the transition timing, broadcast `start`
    /// and mark everything running.
    fn start_section(&mut self, transition_elapsed: Option<Duration>) {
        self.emit(Event::TransitionTime(transition_elapsed));
        self.emit(Event::Broadcast(Order::Start));
        for entry in self.roster.values_mut() {
            *entry = Phase::Running;
        }
        self.master_finished_at = None;
        self.section_started_at = Some(Instant::now());
        self.load_started_at = None;
        self.phase = Phase::Running;
    }

    /// Whether every registered device last reported the given phase.
    /// Vacuously true for an empty roster.
    fn all_devices(&self, phase: Phase) -> bool {
        self.roster.values().all(|&reported| reported == phase)
    }
}
