//! Spawn a handful of dummy participants against a running
//! coordinator, register them and arm them.
//!
//! Start a coordinator first, then:
//!
//! ```text
//! RUST_LOG=info cargo run --example test-drive -- --devices 3
//! ```

use structopt::StructOpt;
use tracing::{error, info};
use tracing_subscriber::*;

use runlink_sdk::{DeviceHooks, Participant, ParticipantSettings};

#[derive(Debug, StructOpt)]
#[structopt(name = "test-drive")]
struct Opt {
    /// Host the coordinator runs on
    #[structopt(long, default_value = "localhost")]
    host: String,
    /// Number of participants to spawn
    #[structopt(short, long, default_value = "3")]
    devices: u32,
}

struct LoggingHooks;

impl DeviceHooks for LoggingHooks {
    fn on_start(&mut self) {
        info!("section started");
    }

    fn on_load_section(&mut self, section: u32) {
        info!("loading section {}", section);
    }
}

#[tokio::main]
async fn main() {
    let _fmt_subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_ansi(true)
        .init();

    let opt = Opt::from_args();

    for id in 0..opt.devices {
        spawn_participant(id, &opt.host);
    }

    tokio::signal::ctrl_c().await.unwrap();
}

fn spawn_participant(id: u32, host: &str) {
    let name = format!("dev-{}", id).parse().unwrap();
    let settings = ParticipantSettings::new(name, host);
    let (participant, mut handle) = Participant::new(settings, LoggingHooks);

    tokio::spawn(async move {
        if let Err(e) = participant.run().await {
            error!("participant dev-{} failed: {}", id, e);
        }
    });
    tokio::spawn(async move {
        if handle.wait_until_registered().await.is_ok() {
            info!("dev-{} registered, arming it", id);
            handle.send_buffered();
        }
    });
}
