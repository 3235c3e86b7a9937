use super::defaults::{
    MAX_AMBIENT_PROBE_MS, MAX_CHANNEL_CAPACITY, MAX_FFT_SIZE, MAX_PAUSE_DURATION_SECS,
    MAX_SENSITIVITY, MAX_SPECTRAL_SMOOTHING, MAX_THRESHOLD_FRAMES, MAX_TICK_MS,
    MIN_AMBIENT_PROBE_MS, MIN_CHANNEL_CAPACITY, MIN_FFT_SIZE, MIN_SENSITIVITY,
    MIN_THRESHOLD_FRAMES, MIN_TICK_MS,
};
use super::{AppConfig, MonitorConfig};
use crate::analysis::{DetectorConfig, ScoringConfig};
use crate::arbiter::ArbiterConfig;
use crate::capture::CaptureConfig;
use anyhow::{bail, Result};
use clap::Parser;
use std::time::Duration;

impl AppConfig {
    /// Parse CLI arguments and validate them right away.
    pub fn parse_args() -> Result<Self> {
        let mut config = Self::parse();
        config.validate()?;
        Ok(config)
    }

    /// Check CLI values before anything touches the audio stack.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_SENSITIVITY..=MAX_SENSITIVITY).contains(&self.sensitivity) {
            bail!(
                "--sensitivity must be between {MIN_SENSITIVITY} and {MAX_SENSITIVITY}, got {}",
                self.sensitivity
            );
        }
        if !(MIN_THRESHOLD_FRAMES..=MAX_THRESHOLD_FRAMES).contains(&self.onset_frames) {
            bail!(
                "--onset-frames must be between {MIN_THRESHOLD_FRAMES} and {MAX_THRESHOLD_FRAMES}, got {}",
                self.onset_frames
            );
        }
        if !(MIN_THRESHOLD_FRAMES..=MAX_THRESHOLD_FRAMES).contains(&self.offset_frames) {
            bail!(
                "--offset-frames must be between {MIN_THRESHOLD_FRAMES} and {MAX_THRESHOLD_FRAMES}, got {}",
                self.offset_frames
            );
        }
        if !(0.0..=1.0).contains(&self.onset_confidence) || self.onset_confidence == 0.0 {
            bail!(
                "--onset-confidence must be greater than 0.0 and at most 1.0, got {}",
                self.onset_confidence
            );
        }
        if self.pause_duration_secs == 0 || self.pause_duration_secs > MAX_PAUSE_DURATION_SECS {
            bail!(
                "--pause-duration-secs must be between 1 and {MAX_PAUSE_DURATION_SECS}, got {}",
                self.pause_duration_secs
            );
        }
        if !(MIN_TICK_MS..=MAX_TICK_MS).contains(&self.tick_ms) {
            bail!(
                "--tick-ms must be between {MIN_TICK_MS} and {MAX_TICK_MS}, got {}",
                self.tick_ms
            );
        }
        if !(MIN_FFT_SIZE..=MAX_FFT_SIZE).contains(&self.fft_size)
            || !self.fft_size.is_power_of_two()
        {
            bail!(
                "--fft-size must be a power of two between {MIN_FFT_SIZE} and {MAX_FFT_SIZE}, got {}",
                self.fft_size
            );
        }
        if self.min_db >= self.max_db {
            bail!(
                "--min-db ({}) must be below --max-db ({})",
                self.min_db,
                self.max_db
            );
        }
        if !(0.0..=MAX_SPECTRAL_SMOOTHING).contains(&self.spectral_smoothing) {
            bail!(
                "--spectral-smoothing must be between 0.0 and {MAX_SPECTRAL_SMOOTHING}, got {}",
                self.spectral_smoothing
            );
        }
        if !(MIN_CHANNEL_CAPACITY..=MAX_CHANNEL_CAPACITY).contains(&self.channel_capacity) {
            bail!(
                "--channel-capacity must be between {MIN_CHANNEL_CAPACITY} and {MAX_CHANNEL_CAPACITY}, got {}",
                self.channel_capacity
            );
        }
        if !(MIN_AMBIENT_PROBE_MS..=MAX_AMBIENT_PROBE_MS).contains(&self.ambient_probe_ms) {
            bail!(
                "--ambient-probe-ms must be between {MIN_AMBIENT_PROBE_MS} and {MAX_AMBIENT_PROBE_MS} ms, got {}",
                self.ambient_probe_ms
            );
        }
        if self.run_ms == 0 {
            bail!("--run-ms must be greater than 0");
        }

        Ok(())
    }

    /// Snapshot the current CLI-controlled settings for the monitor.
    pub fn monitor_config(&self) -> MonitorConfig {
        MonitorConfig {
            detector: DetectorConfig {
                sensitivity: self.sensitivity,
                onset_threshold_frames: self.onset_frames,
                offset_threshold_frames: self.offset_frames,
                onset_confidence: self.onset_confidence,
            },
            scoring: ScoringConfig::default(),
            arbiter: ArbiterConfig {
                auto_resume: !self.no_auto_resume,
                pause_duration: Duration::from_secs(self.pause_duration_secs),
            },
            capture: CaptureConfig {
                preferred_device: self.input_device.clone(),
                tick: Duration::from_millis(self.tick_ms),
                fft_size: self.fft_size,
                min_db: self.min_db,
                max_db: self.max_db,
                spectral_smoothing: self.spectral_smoothing,
                channel_capacity: self.channel_capacity,
            },
        }
    }
}
