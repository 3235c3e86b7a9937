//! Per-band energy scoring for siren signatures.
//!
//! A siren concentrates energy around a fundamental near 600-1000 Hz with
//! weaker harmonics above it, and that energy sweeps rather than sitting
//! still. The scorer rewards both: weighted average magnitude per band plus a
//! bonus when the band's bins oscillate between loud peaks and quiet valleys.
//! This is a heuristic estimate, not a classifier; loud spectrally similar
//! noise can still score.

use super::FrequencyFrame;
use serde::{Deserialize, Serialize};

/// One frequency band of the siren profile. Configuration data; never
/// mutated at runtime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandDefinition {
    pub low_hz: f32,
    pub high_hz: f32,
    pub weight: f32,
}

/// Default profile: fundamental plus two harmonics with falling weights.
pub fn default_siren_bands() -> Vec<BandDefinition> {
    vec![
        BandDefinition {
            low_hz: 600.0,
            high_hz: 1000.0,
            weight: 1.0,
        },
        BandDefinition {
            low_hz: 1000.0,
            high_hz: 1500.0,
            weight: 0.8,
        },
        BandDefinition {
            low_hz: 1500.0,
            high_hz: 2500.0,
            weight: 0.5,
        },
    ]
}

/// Scoring parameters. The peak/valley floors and the bonus weight are
/// empirical values carried over as tunable defaults; no derivation exists
/// for them, so profiles adjust them instead of the code.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoringConfig {
    pub bands: Vec<BandDefinition>,
    pub peak_floor: u8,
    pub valley_floor: u8,
    pub min_swing: u8,
    pub oscillation_bonus: f32,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            bands: default_siren_bands(),
            peak_floor: 140,
            valley_floor: 60,
            min_swing: 70,
            oscillation_bonus: 0.15,
        }
    }
}

/// Score one magnitude frame against the configured bands.
///
/// Pure function of its inputs. A malformed frame (no bins, zero sample
/// rate) scores 0 rather than erroring; a single bad frame must never take
/// the pipeline down.
pub fn band_energy_score(frame: &FrequencyFrame, cfg: &ScoringConfig) -> f32 {
    let bin_hz = frame.bin_hz();
    if bin_hz <= 0.0 {
        return 0.0;
    }
    // Bands never reach into the mirrored upper half of the spectrum.
    let top_bin = (frame.bins.len() / 2).min(frame.bins.len() - 1);

    let mut score = 0.0f32;
    for band in &cfg.bands {
        let low = ((band.low_hz / bin_hz).floor() as usize).min(top_bin);
        let high = ((band.high_hz / bin_hz).ceil() as usize).min(top_bin);
        if low > high {
            continue;
        }
        let bins = &frame.bins[low..=high];
        let sum: u32 = bins.iter().map(|&b| u32::from(b)).sum();
        let average = sum as f32 / bins.len() as f32;
        score += (average / 255.0) * band.weight;
        score += oscillation_bonus(bins, cfg) * band.weight;
    }
    score
}

/// Single pass over a band's bins counting local maxima above the peak floor
/// and local minima below the valley floor. Flat loud noise has no valleys
/// and earns nothing here.
fn oscillation_bonus(bins: &[u8], cfg: &ScoringConfig) -> f32 {
    if bins.len() < 3 {
        return 0.0;
    }
    let mut peaks = 0u32;
    let mut valleys = 0u32;
    let mut max_peak = 0u8;
    let mut min_valley = u8::MAX;
    for i in 1..bins.len() - 1 {
        let (prev, cur, next) = (bins[i - 1], bins[i], bins[i + 1]);
        if cur >= prev && cur > next && cur > cfg.peak_floor {
            peaks += 1;
            max_peak = max_peak.max(cur);
        } else if cur <= prev && cur < next && cur < cfg.valley_floor {
            valleys += 1;
            min_valley = min_valley.min(cur);
        }
    }
    if peaks >= 2 && valleys >= 1 && max_peak.saturating_sub(min_valley) > cfg.min_swing {
        cfg.oscillation_bonus * peaks as f32
    } else {
        0.0
    }
}
