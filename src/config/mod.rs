//! Command-line parsing and validation helpers.

mod defaults;
mod validation;

use crate::analysis::{DetectorConfig, ScoringConfig};
use crate::arbiter::ArbiterConfig;
use crate::capture::CaptureConfig;
use crate::engine::EngineConfig;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use defaults::{
    DEFAULT_AMBIENT_PROBE_MS, DEFAULT_CHANNEL_CAPACITY, DEFAULT_FFT_SIZE, DEFAULT_MAX_DB,
    DEFAULT_MIN_DB, DEFAULT_OFFSET_THRESHOLD_FRAMES, DEFAULT_ONSET_CONFIDENCE,
    DEFAULT_ONSET_THRESHOLD_FRAMES, DEFAULT_PAUSE_DURATION_SECS, DEFAULT_RUN_MS,
    DEFAULT_SENSITIVITY, DEFAULT_SPECTRAL_SMOOTHING, DEFAULT_TICK_MS, MAX_AMBIENT_PROBE_MS,
    MAX_FFT_SIZE, MAX_PAUSE_DURATION_SECS, MAX_TICK_MS, MIN_AMBIENT_PROBE_MS, MIN_FFT_SIZE,
    MIN_TICK_MS,
};

/// CLI options for the siren monitor. Validated values feed straight into
/// the capture and detection configs.
#[derive(Debug, Parser, Clone)]
#[command(about = "SirenGuard playback-safety monitor", author, version)]
pub struct AppConfig {
    /// Preferred audio input device name
    #[arg(long)]
    pub input_device: Option<String>,

    /// Print detected audio input devices and exit
    #[arg(long = "list-input-devices", default_value_t = false)]
    pub list_input_devices: bool,

    /// Print the resolved monitor configuration as JSON and exit
    #[arg(long = "dump-config", default_value_t = false)]
    pub dump_config: bool,

    /// Run the detection engine over synthetic frames and exit
    #[arg(long = "simulate", default_value_t = false)]
    pub simulate: bool,

    /// Sample ambient noise, report peak confidence, then exit
    #[arg(long = "ambient-probe", default_value_t = false)]
    pub ambient_probe: bool,

    /// Ambient probe duration (milliseconds)
    #[arg(long = "ambient-probe-ms", default_value_t = DEFAULT_AMBIENT_PROBE_MS)]
    pub ambient_probe_ms: u64,

    /// Live monitoring duration (milliseconds)
    #[arg(long = "run-ms", default_value_t = DEFAULT_RUN_MS)]
    pub run_ms: u64,

    /// Detection sensitivity multiplier applied to each raw score
    #[arg(long, default_value_t = DEFAULT_SENSITIVITY)]
    pub sensitivity: f32,

    /// Consecutive confident frames required before an onset
    #[arg(long = "onset-frames", default_value_t = DEFAULT_ONSET_THRESHOLD_FRAMES)]
    pub onset_frames: u32,

    /// Consecutive quiet frames required before an offset
    #[arg(long = "offset-frames", default_value_t = DEFAULT_OFFSET_THRESHOLD_FRAMES)]
    pub offset_frames: u32,

    /// Smoothed confidence level counted as siren-present
    #[arg(long = "onset-confidence", default_value_t = DEFAULT_ONSET_CONFIDENCE)]
    pub onset_confidence: f32,

    /// Leave playback paused after the siren clears
    #[arg(long = "no-auto-resume", default_value_t = false)]
    pub no_auto_resume: bool,

    /// Delay between siren offset and playback resume (seconds)
    #[arg(long = "pause-duration-secs", default_value_t = DEFAULT_PAUSE_DURATION_SECS)]
    pub pause_duration_secs: u64,

    /// Analysis tick interval (milliseconds)
    #[arg(long = "tick-ms", default_value_t = DEFAULT_TICK_MS)]
    pub tick_ms: u64,

    /// FFT size in samples (power of two)
    #[arg(long = "fft-size", default_value_t = DEFAULT_FFT_SIZE)]
    pub fft_size: usize,

    /// Decibel level mapped to magnitude byte 0
    #[arg(long = "min-db", default_value_t = DEFAULT_MIN_DB, allow_hyphen_values = true)]
    pub min_db: f32,

    /// Decibel level mapped to magnitude byte 255
    #[arg(long = "max-db", default_value_t = DEFAULT_MAX_DB, allow_hyphen_values = true)]
    pub max_db: f32,

    /// Temporal smoothing factor for spectrum magnitudes
    #[arg(long = "spectral-smoothing", default_value_t = DEFAULT_SPECTRAL_SMOOTHING)]
    pub spectral_smoothing: f32,

    /// Window channel capacity between the capture callback and the analyser
    #[arg(long = "channel-capacity", default_value_t = DEFAULT_CHANNEL_CAPACITY)]
    pub channel_capacity: usize,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "SIRENGUARD_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "SIRENGUARD_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,
}

/// Resolved settings for one monitor session.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MonitorConfig {
    pub detector: DetectorConfig,
    pub scoring: ScoringConfig,
    pub arbiter: ArbiterConfig,
    pub capture: CaptureConfig,
}

impl MonitorConfig {
    /// The capture-independent slice of the config, for offline runs.
    pub fn engine(&self) -> EngineConfig {
        EngineConfig {
            detector: self.detector.clone(),
            scoring: self.scoring.clone(),
            arbiter: self.arbiter.clone(),
        }
    }

    pub fn tick(&self) -> Duration {
        self.capture.tick
    }
}
