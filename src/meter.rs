use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

/// Lock-free last-value gauge for the smoothed confidence.
///
/// The monitor worker stores every tick's value; a UI can poll it at its own
/// cadence without draining the event channel.
#[derive(Clone, Debug)]
pub struct ConfidenceMeter {
    value_bits: Arc<AtomicU32>,
}

impl ConfidenceMeter {
    pub fn new() -> Self {
        Self {
            value_bits: Arc::new(AtomicU32::new(0.0f32.to_bits())),
        }
    }

    pub fn set(&self, confidence: f32) {
        self.value_bits.store(confidence.to_bits(), Ordering::Relaxed);
    }

    pub fn confidence(&self) -> f32 {
        f32::from_bits(self.value_bits.load(Ordering::Relaxed))
    }
}

impl Default for ConfidenceMeter {
    fn default() -> Self {
        Self::new()
    }
}
