//! This crate provides building blocks for implementing the device
//! side of a runlink-coordinated experiment run.
//!
//! Every device of an experiment embeds one [`Participant`]. The
//! participant connects to the coordinator, registers under its device
//! name, and then reacts to the orders the coordinator broadcasts:
//! starting a section, loading the next section, exiting or aborting
//! the run. Device-specific behavior is plugged in through the
//! [`DeviceHooks`] trait:
//!
//! - `is_finished` is polled while a section is running and decides
//!   when the device reports `fin`,
//! - `on_start` runs when a section starts,
//! - `on_load_section` runs when the next section must be prepared.
//!
//! All hooks execute synchronously on the participant's event loop, so
//! they must not block for long.
//!
//! # Running a participant
//!
//! ```no_run
//! use runlink_sdk::{NoHooks, Participant, ParticipantSettings};
//!
//! #[tokio::main]
//! async fn main() {
//!     let settings =
//!         ParticipantSettings::new("shutter-3".parse().unwrap(), "localhost");
//!     let (participant, mut handle) = Participant::new(settings, NoHooks);
//!     let participant = tokio::spawn(participant.run());
//!
//!     // Wait for the registration handshake, then arm the device.
//!     handle.wait_until_registered().await.unwrap();
//!     handle.send_buffered();
//!
//!     // ... the coordinator drives the run from here on ...
//!
//!     handle.shutdown();
//!     participant.await.unwrap().unwrap();
//! }
//! ```

pub mod client;
mod participant;
pub mod settings;
mod state_machine;
mod traits;

pub use self::{
    participant::{Participant, ParticipantGone, ParticipantHandle},
    settings::ParticipantSettings,
    state_machine::ParticipantError,
    traits::{DeviceHooks, NoHooks},
};
