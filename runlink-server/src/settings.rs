//! Loading and validation of settings.
//!
//! Values defined in the configuration file can be overridden by
//! environment variables with the `RUNLINK` prefix, e.g.
//! `RUNLINK_RUN__FINISH_TIMEOUT=5000`.

use std::{fmt, net::SocketAddr, path::Path, time::Duration};

use config::{Config, ConfigError, Environment, File};
use serde::{
    de::{self, Deserializer, Visitor},
    Deserialize,
};
use thiserror::Error;
use tracing_subscriber::filter::EnvFilter;
use validator::{Validate, ValidationErrors};

use runlink_core::{FAN_IN_PORT, FAN_OUT_PORT};

#[derive(Error, Debug)]
/// An error related to loading and validation of settings.
pub enum SettingsError {
    #[error("configuration loading failed: {0}")]
    Loading(#[from] ConfigError),
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationErrors),
}

#[derive(Debug, Validate, Deserialize)]
/// The combined settings.
///
/// Each section in the configuration file corresponds to the
/// identically named settings field.
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,
    #[validate]
    #[serde(default)]
    pub run: RunSettings,
    #[serde(default)]
    pub log: LoggingSettings,
}

impl Settings {
    /// Loads and validates the settings via a configuration file.
    ///
    /// # Errors
    /// Fails when the loading of the configuration file or its
    /// validation failed.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let settings: Settings = Self::load(path)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("runlink").separator("__"))
            .build()?
            .try_deserialize()
    }
}

/// The TCP endpoints of the coordinator.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiSettings {
    /// Bind address of the fan-in endpoint, on which participants push
    /// their reports.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [api]
    /// fan_in = "0.0.0.0:43227"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// RUNLINK_API__FAN_IN=0.0.0.0:43227
    /// ```
    #[serde(default = "default_fan_in")]
    pub fan_in: SocketAddr,

    /// Bind address of the fan-out endpoint, on which every connected
    /// participant receives every broadcast order.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [api]
    /// fan_out = "0.0.0.0:43228"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// RUNLINK_API__FAN_OUT=0.0.0.0:43228
    /// ```
    #[serde(default = "default_fan_out")]
    pub fan_out: SocketAddr,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            fan_in: default_fan_in(),
            fan_out: default_fan_out(),
        }
    }
}

fn default_fan_in() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], FAN_IN_PORT))
}

fn default_fan_out() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], FAN_OUT_PORT))
}

/// Timing of the coordinator's event loop. All values are in
/// milliseconds.
#[derive(Debug, Clone, Validate, Deserialize)]
pub struct RunSettings {
    /// Delay between binding the sockets and the initial `greet`
    /// broadcast. Fan-out subscribers miss everything broadcast before
    /// they attach, so the coordinator gives early participants a
    /// moment to connect.
    #[serde(default = "default_greet_delay")]
    pub greet_delay: u64,

    /// How long devices may take to reach their finished phase after
    /// `master_finished` was reported, before the run is aborted.
    #[validate(range(min = 1))]
    #[serde(default = "default_finish_timeout")]
    pub finish_timeout: u64,

    /// Bound of the inbound poll while the coordinator is in the
    /// manual phase. Short, so that registrations stay snappy.
    #[validate(range(min = 1))]
    #[serde(default = "default_manual_poll")]
    pub manual_poll: u64,

    /// Bound of the inbound poll during the experiment phases.
    /// Sections are long compared to message turnaround.
    #[validate(range(min = 1))]
    #[serde(default = "default_experiment_poll")]
    pub experiment_poll: u64,

    /// Window offered to the embedding controller for participants to
    /// connect and register after startup.
    #[serde(default = "default_discovery_window")]
    pub discovery_window: u64,
}

impl RunSettings {
    pub fn greet_delay(&self) -> Duration {
        Duration::from_millis(self.greet_delay)
    }

    pub fn finish_timeout(&self) -> Duration {
        Duration::from_millis(self.finish_timeout)
    }

    pub fn manual_poll(&self) -> Duration {
        Duration::from_millis(self.manual_poll)
    }

    pub fn experiment_poll(&self) -> Duration {
        Duration::from_millis(self.experiment_poll)
    }

    pub fn discovery_window(&self) -> Duration {
        Duration::from_millis(self.discovery_window)
    }
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            greet_delay: default_greet_delay(),
            finish_timeout: default_finish_timeout(),
            manual_poll: default_manual_poll(),
            experiment_poll: default_experiment_poll(),
            discovery_window: default_discovery_window(),
        }
    }
}

fn default_greet_delay() -> u64 {
    1_000
}

fn default_finish_timeout() -> u64 {
    2_000
}

fn default_manual_poll() -> u64 {
    1
}

fn default_experiment_poll() -> u64 {
    1_000
}

fn default_discovery_window() -> u64 {
    5_000
}

#[derive(Debug, Deserialize)]
/// Logging settings.
pub struct LoggingSettings {
    /// A comma-separated list of logging directives.
    ///
    /// # Examples
    ///
    /// **TOML**
    /// ```text
    /// [log]
    /// filter = "info"
    /// ```
    ///
    /// **Environment variable**
    /// ```text
    /// RUNLINK_LOG__FILTER=info
    /// ```
    #[serde(default = "default_filter", deserialize_with = "deserialize_env_filter")]
    pub filter: EnvFilter,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: default_filter(),
        }
    }
}

fn default_filter() -> EnvFilter {
    EnvFilter::new("info")
}

fn deserialize_env_filter<'de, D>(deserializer: D) -> Result<EnvFilter, D::Error>
where
    D: Deserializer<'de>,
{
    struct EnvFilterVisitor;

    impl<'de> Visitor<'de> for EnvFilterVisitor {
        type Value = EnvFilter;

        fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
            write!(formatter, "a valid tracing filter directive")
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: de::Error,
        {
            EnvFilter::try_new(value)
                .map_err(|_| de::Error::invalid_value(serde::de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_str(EnvFilterVisitor)
}
