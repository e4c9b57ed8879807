//! Participant settings.

use std::time::Duration;

use runlink_core::{DeviceName, FAN_IN_PORT, FAN_OUT_PORT};

/// Settings of a device-side participant.
#[derive(Debug, Clone)]
pub struct ParticipantSettings {
    /// The name under which the device registers. Must be unique
    /// within the session.
    pub name: DeviceName,
    /// Address of the coordinator's fan-in endpoint (reports).
    pub fan_in: String,
    /// Address of the coordinator's fan-out endpoint (orders).
    pub fan_out: String,
    /// How long to wait for the coordinator's registration echo
    /// before re-sending `hello`.
    pub registration_retry: Duration,
    /// Bound of the inbound poll while in the manual phase. Short, so
    /// that handshakes stay snappy.
    pub manual_poll: Duration,
    /// Bound of the inbound poll during the experiment phases.
    /// Sections are long compared to message turnaround, so this is
    /// much larger than [`manual_poll`].
    ///
    /// [`manual_poll`]: ParticipantSettings::manual_poll
    pub experiment_poll: Duration,
}

impl ParticipantSettings {
    /// Settings for a coordinator reachable on `host` under the
    /// default ports.
    pub fn new(name: DeviceName, host: &str) -> Self {
        Self {
            name,
            fan_in: format!("{}:{}", host, FAN_IN_PORT),
            fan_out: format!("{}:{}", host, FAN_OUT_PORT),
            registration_retry: Duration::from_secs(2),
            manual_poll: Duration::from_millis(1),
            experiment_poll: Duration::from_secs(1),
        }
    }
}
