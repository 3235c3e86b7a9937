//! Windowed FFT magnitude analysis producing scorer-ready byte frames.
//!
//! This is the "analysis node" the capture session owns: Hann window,
//! forward FFT, exponential temporal smoothing of the linear magnitudes,
//! then a dB mapping onto the 0-255 scale the band scorer consumes.

use super::CaptureConfig;
use crate::analysis::FrequencyFrame;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::f32::consts::PI;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpectrumError {
    #[error("fft size must be a power of two of at least 32, got {0}")]
    InvalidFftSize(usize),
    #[error("db range is empty: min {min} must be below max {max}")]
    EmptyDbRange { min: f32, max: f32 },
}

pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    smoothed: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
}

impl SpectrumAnalyzer {
    pub fn new(cfg: &CaptureConfig) -> Result<Self, SpectrumError> {
        let fft_size = cfg.fft_size;
        if fft_size < 32 || !fft_size.is_power_of_two() {
            return Err(SpectrumError::InvalidFftSize(fft_size));
        }
        if cfg.min_db >= cfg.max_db {
            return Err(SpectrumError::EmptyDbRange {
                min: cfg.min_db,
                max: cfg.max_db,
            });
        }
        let fft = FftPlanner::new().plan_fft_forward(fft_size);
        let window = (0..fft_size)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f32 / (fft_size - 1) as f32).cos())
            .collect();
        Ok(Self {
            fft,
            fft_size,
            window,
            scratch: vec![Complex::default(); fft_size],
            smoothed: vec![0.0; fft_size / 2 + 1],
            smoothing: cfg.spectral_smoothing.clamp(0.0, 0.99),
            min_db: cfg.min_db,
            max_db: cfg.max_db,
        })
    }

    /// Analyze the most recent `fft_size` samples of a window; short windows
    /// are zero-padded. Returns a full-length frame so `sample_rate / len`
    /// stays the physical bin width; the upper half mirrors the lower.
    pub fn analyze(&mut self, samples: &[f32], sample_rate: u32) -> FrequencyFrame {
        let offset = samples.len().saturating_sub(self.fft_size);
        for (i, slot) in self.scratch.iter_mut().enumerate() {
            let sample = samples.get(offset + i).copied().unwrap_or(0.0);
            *slot = Complex::new(sample * self.window[i], 0.0);
        }
        self.fft.process(&mut self.scratch);

        let norm = 2.0 / self.fft_size as f32;
        let span = self.max_db - self.min_db;
        let mut bins = vec![0u8; self.fft_size];
        for (i, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.scratch[i].norm() * norm;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;
            let db = 20.0 * smoothed.max(1e-10).log10();
            let byte = (((db - self.min_db) / span).clamp(0.0, 1.0) * 255.0).round() as u8;
            bins[i] = byte;
            let mirror = self.fft_size - i;
            if i > 0 && mirror > i && mirror < self.fft_size {
                bins[mirror] = byte;
            }
        }
        FrequencyFrame::new(bins, sample_rate)
    }

    /// Clears the temporal smoothing history, used when a session restarts.
    pub fn reset(&mut self) {
        for value in &mut self.smoothed {
            *value = 0.0;
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }
}
