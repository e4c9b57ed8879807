//! `runlink_server` is the coordinator of a runlink-synchronized
//! experiment run.
//!
//! The coordinator owns the global phase of the run and a roster of
//! registered devices with the phase each of them last reported. While
//! idle (manual phase) it accepts registrations; once the embedding
//! controller arms (`send_buffered`) and starts (`send_start`) the
//! run, the coordinator broadcasts orders to all participants and only
//! advances the global phase when every device has reported the
//! corresponding local phase. Between sections it consults a
//! [`RunPlan`] to decide whether the run chains into another section
//! or ends.
//!
//! [`RunPlan`]: crate::traits::RunPlan

pub mod coordinator;
pub mod settings;
pub mod traits;
pub mod transport;
