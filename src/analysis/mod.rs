//! Frequency-frame scoring and detection pipeline.
//!
//! Turns magnitude frames from the capture session into a smoothed confidence
//! value and debounced detection transitions. Everything here is synchronous
//! and allocation-light; the monitor loop drives it one frame at a time.

mod bands;
mod hysteresis;
mod smoother;

pub use bands::{band_energy_score, default_siren_bands, BandDefinition, ScoringConfig};
pub use hysteresis::{DetectionState, DetectionTransition, HysteresisDetector};
pub use smoother::{ConfidenceSmoother, SMOOTHING_WINDOW};

use serde::{Deserialize, Serialize};

/// One frequency-domain magnitude snapshot from the analyser.
///
/// `bins` holds the full FFT magnitude spectrum on a 0-255 scale, so
/// `sample_rate / bins.len()` is the width of one bin in Hz.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencyFrame {
    pub bins: Vec<u8>,
    pub sample_rate: u32,
}

impl FrequencyFrame {
    pub fn new(bins: Vec<u8>, sample_rate: u32) -> Self {
        Self { bins, sample_rate }
    }

    /// Width of one FFT bin in Hz, or 0 for a malformed frame.
    pub fn bin_hz(&self) -> f32 {
        if self.bins.is_empty() || self.sample_rate == 0 {
            return 0.0;
        }
        self.sample_rate as f32 / self.bins.len() as f32
    }
}

/// Runtime-tunable detection thresholds.
///
/// May be swapped mid-session; a sensitivity change applies from the next
/// scored frame, never retroactively to samples already in the smoothing
/// window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorConfig {
    pub sensitivity: f32,
    pub onset_threshold_frames: u32,
    pub offset_threshold_frames: u32,
    pub onset_confidence: f32,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            sensitivity: 1.0,
            onset_threshold_frames: 5,
            offset_threshold_frames: 10,
            onset_confidence: 0.28,
        }
    }
}
