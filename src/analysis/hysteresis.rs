//! Debounced two-threshold state machine over smoothed confidence.
//!
//! Entry is fast (5 frames by default) so playback pauses early; exit is
//! slow (10 frames) so an intermittent signature, Doppler fade or a passing
//! truck does not flap the state. Above-frame progress decays one step per
//! sub-threshold frame instead of resetting, tolerating single-frame
//! dropouts.

use super::DetectorConfig;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DetectionState {
    Idle,
    Detected,
}

impl DetectionState {
    pub fn label(self) -> &'static str {
        match self {
            DetectionState::Idle => "idle",
            DetectionState::Detected => "detected",
        }
    }
}

/// Emitted by [`HysteresisDetector::on_confidence`] when the state flips.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DetectionTransition {
    Onset,
    Offset,
}

#[derive(Debug, Clone)]
pub struct HysteresisDetector {
    state: DetectionState,
    consecutive_above: u32,
    consecutive_below: u32,
}

impl HysteresisDetector {
    pub fn new() -> Self {
        Self {
            state: DetectionState::Idle,
            consecutive_above: 0,
            consecutive_below: 0,
        }
    }

    pub fn state(&self) -> DetectionState {
        self.state
    }

    /// Feed one smoothed confidence value; returns the transition if the
    /// debounce rule fires on this frame. State never flips from a single
    /// frame.
    pub fn on_confidence(
        &mut self,
        confidence: f32,
        cfg: &DetectorConfig,
    ) -> Option<DetectionTransition> {
        if confidence > cfg.onset_confidence {
            self.consecutive_above = self.consecutive_above.saturating_add(1);
            self.consecutive_below = 0;
            if self.state == DetectionState::Idle
                && self.consecutive_above >= cfg.onset_threshold_frames
            {
                self.state = DetectionState::Detected;
                return Some(DetectionTransition::Onset);
            }
        } else {
            self.consecutive_above = self.consecutive_above.saturating_sub(1);
            if self.state == DetectionState::Detected {
                self.consecutive_below = self.consecutive_below.saturating_add(1);
                if self.consecutive_below >= cfg.offset_threshold_frames {
                    self.state = DetectionState::Idle;
                    return Some(DetectionTransition::Offset);
                }
            }
        }
        None
    }

    /// Abrupt reset for session restarts. Forces Idle and zeroes both
    /// counters without reporting an offset.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for HysteresisDetector {
    fn default() -> Self {
        Self::new()
    }
}
