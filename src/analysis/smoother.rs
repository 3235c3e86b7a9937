use std::collections::VecDeque;

/// Ring buffer capacity for confidence smoothing.
pub const SMOOTHING_WINDOW: usize = 10;

/// Rolling average over the most recent confidence samples.
///
/// Sensitivity is applied before a sample enters the window, so a
/// sensitivity change ramps into the smoothed value over the next few
/// frames instead of jumping it instantly.
#[derive(Debug, Clone)]
pub struct ConfidenceSmoother {
    window: VecDeque<f32>,
}

impl ConfidenceSmoother {
    pub fn new() -> Self {
        Self {
            window: VecDeque::with_capacity(SMOOTHING_WINDOW),
        }
    }

    /// Append a scaled sample and return the mean of the buffer contents.
    pub fn push(&mut self, raw_score: f32, sensitivity: f32) -> f32 {
        self.window.push_back(raw_score * sensitivity);
        if self.window.len() > SMOOTHING_WINDOW {
            self.window.pop_front();
        }
        let sum: f32 = self.window.iter().sum();
        sum / self.window.len() as f32
    }

    pub fn reset(&mut self) {
        self.window.clear();
    }

    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

impl Default for ConfidenceSmoother {
    fn default() -> Self {
        Self::new()
    }
}
