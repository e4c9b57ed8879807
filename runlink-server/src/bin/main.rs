use std::{path::PathBuf, process};

use structopt::StructOpt;
use tokio::signal;
use tracing::{error, warn};
use tracing_subscriber::*;

use runlink_server::{
    coordinator::CoordinatorService,
    settings::Settings,
    traits::SingleShot,
    transport::{FanIn, FanOut},
};

#[derive(Debug, StructOpt)]
#[structopt(name = "coordinator")]
struct Opt {
    /// Path of the configuration file
    #[structopt(short, parse(from_os_str))]
    config_path: PathBuf,
}

#[tokio::main]
async fn main() {
    let opt = Opt::from_args();

    let settings = Settings::new(opt.config_path).unwrap_or_else(|err| {
        eprintln!("{}", err);
        process::exit(1);
    });
    let Settings { api, run, log } = settings;

    let _fmt_subscriber = FmtSubscriber::builder()
        .with_env_filter(log.filter)
        .with_ansi(true)
        .init();

    let fan_in = FanIn::bind(api.fan_in)
        .await
        .expect("failed to bind the fan-in endpoint");
    let fan_out = FanOut::bind(api.fan_out)
        .await
        .expect("failed to bind the fan-out endpoint");

    let (service, handle) = CoordinatorService::new(fan_in, fan_out, Box::new(SingleShot), run);
    let mut service = tokio::spawn(service.run());

    tokio::select! {
        result = &mut service => match result {
            Ok(Ok(())) => warn!("shutting down: coordinator terminated"),
            Ok(Err(e)) => error!("shutting down: {}", e),
            Err(e) => error!("shutting down: coordinator task failed: {}", e),
        },
        _ = signal::ctrl_c() => {
            handle.shutdown();
            let _ = service.await;
        }
    }
}
