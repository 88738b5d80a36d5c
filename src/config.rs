// config.rs

use crate::error::{Error, Result};
use log::{debug, info};
use serde::Deserialize;
use std::path::Path;

pub const PULSES_PER_QUARTER: u32 = 24;
pub const MIN_BPM: u32 = 20;
pub const MAX_BPM: u32 = 300;
pub const BPM_CHANGE_THRESHOLD: f64 = 1.0;
pub const SMOOTHING_WINDOW: usize = 5;
pub const MESSAGE_DELAY_MS: u64 = 20;
pub const MAX_TAPS: usize = 8;
pub const TAP_RESET_MS: f64 = 1500.0;

/// File looked up in the working directory when no `--config` is given
pub const DEFAULT_CONFIG_FILE: &str = "delaysyncrs.toml";
const ENV_PREFIX: &str = "DELAYSYNC";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TempoSettings {
    pub min_bpm: u32,
    pub max_bpm: u32,
    pub change_threshold: f64,
    pub smoothing_window: usize,
    pub pulses_per_quarter: u32,
}

impl Default for TempoSettings {
    fn default() -> Self {
        Self {
            min_bpm: MIN_BPM,
            max_bpm: MAX_BPM,
            change_threshold: BPM_CHANGE_THRESHOLD,
            smoothing_window: SMOOTHING_WINDOW,
            pulses_per_quarter: PULSES_PER_QUARTER,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SysexSettings {
    /// Pause between consecutive SysEx messages of one update
    pub message_delay_ms: u64,
}

impl Default for SysexSettings {
    fn default() -> Self {
        Self {
            message_delay_ms: MESSAGE_DELAY_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TapSettings {
    pub max_taps: usize,
    pub reset_after_ms: f64,
}

impl Default for TapSettings {
    fn default() -> Self {
        Self {
            max_taps: MAX_TAPS,
            reset_after_ms: TAP_RESET_MS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub tempo: TempoSettings,
    pub sysex: SysexSettings,
    pub tap: TapSettings,
}

impl Settings {
    /// Loads settings from defaults, an optional TOML file and `DELAYSYNC__*`
    /// environment variables, later layers overriding earlier ones.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();

        match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                builder = builder.add_source(config::File::from(path).required(true));
            }
            None => {
                debug!("Looking for optional {}", DEFAULT_CONFIG_FILE);
                builder = builder.add_source(
                    config::File::with_name(DEFAULT_CONFIG_FILE)
                        .format(config::FileFormat::Toml)
                        .required(false),
                );
            }
        }

        let settings: Settings = builder
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        debug!("Effective settings: {:?}", settings);
        Ok(settings)
    }

    pub fn validate(&self) -> Result<()> {
        let tempo = &self.tempo;
        if tempo.min_bpm >= tempo.max_bpm {
            return Err(invalid(format!(
                "tempo.min_bpm ({}) must be below tempo.max_bpm ({})",
                tempo.min_bpm, tempo.max_bpm
            )));
        }
        if tempo.smoothing_window == 0 {
            return Err(invalid("tempo.smoothing_window must be at least 1".into()));
        }
        if tempo.pulses_per_quarter == 0 {
            return Err(invalid("tempo.pulses_per_quarter must be at least 1".into()));
        }
        if !(tempo.change_threshold >= 0.0) {
            return Err(invalid("tempo.change_threshold must not be negative".into()));
        }
        if self.tap.max_taps < 2 {
            return Err(invalid("tap.max_taps must be at least 2".into()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> Error {
    Error::Config(config::ConfigError::Message(message))
}
