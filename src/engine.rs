//! The unified per-tick detection engine.
//!
//! One engine drives the whole pipeline run-to-completion per tick: score
//! the frame, smooth the confidence, feed the hysteresis state machine, let
//! the arbiter react, then check the resume deadline. Everything is
//! synchronous on the caller's thread, so no locks guard the ring buffer,
//! counters or snapshot.

use crate::analysis::{
    band_energy_score, ConfidenceSmoother, DetectionState, DetectionTransition, DetectorConfig,
    FrequencyFrame, HysteresisDetector, ScoringConfig,
};
use crate::arbiter::{ArbiterAction, ArbiterConfig, PlaybackArbiter};
use crate::playback::Playback;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    pub detector: DetectorConfig,
    pub scoring: ScoringConfig,
    pub arbiter: ArbiterConfig,
}

/// Everything one tick produced, for event fan-out and tests.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct TickOutput {
    pub raw_score: f32,
    pub confidence: f32,
    pub transition: Option<DetectionTransition>,
    pub action: Option<ArbiterAction>,
}

pub struct DetectionEngine {
    detector_cfg: DetectorConfig,
    scoring_cfg: ScoringConfig,
    smoother: ConfidenceSmoother,
    detector: HysteresisDetector,
    arbiter: PlaybackArbiter,
}

impl DetectionEngine {
    pub fn new(cfg: EngineConfig) -> Self {
        Self {
            detector_cfg: cfg.detector,
            scoring_cfg: cfg.scoring,
            smoother: ConfidenceSmoother::new(),
            detector: HysteresisDetector::new(),
            arbiter: PlaybackArbiter::new(cfg.arbiter),
        }
    }

    pub fn state(&self) -> DetectionState {
        self.detector.state()
    }

    /// Swap detector thresholds mid-session. Applies from the next scored
    /// frame; samples already in the smoothing window are untouched.
    pub fn configure_detector(&mut self, cfg: DetectorConfig) {
        debug!(
            sensitivity = cfg.sensitivity,
            onset_confidence = cfg.onset_confidence,
            "detector reconfigured"
        );
        self.detector_cfg = cfg;
    }

    pub fn configure_arbiter(&mut self, cfg: ArbiterConfig) {
        self.arbiter.configure(cfg);
    }

    /// Process one frame. Onset handling runs before the deadline check, so
    /// an onset arriving on the same tick as a due resume timer wins.
    pub fn tick(
        &mut self,
        frame: &FrequencyFrame,
        now: Instant,
        playback: &mut dyn Playback,
    ) -> TickOutput {
        let raw_score = band_energy_score(frame, &self.scoring_cfg);
        let confidence = self.smoother.push(raw_score, self.detector_cfg.sensitivity);
        let transition = self.detector.on_confidence(confidence, &self.detector_cfg);
        let action = match transition {
            Some(DetectionTransition::Onset) => self.arbiter.on_onset(playback),
            Some(DetectionTransition::Offset) => {
                self.arbiter.on_offset(now);
                None
            }
            None => None,
        };
        let action = action.or_else(|| self.arbiter.poll(now, playback));
        TickOutput {
            raw_score,
            confidence,
            transition,
            action,
        }
    }

    /// Tick with no frame available; only the resume deadline advances.
    pub fn idle_tick(&mut self, now: Instant, playback: &mut dyn Playback) -> Option<ArbiterAction> {
        self.arbiter.poll(now, playback)
    }

    /// Clean slate for a session restart; emits no transitions or commands.
    pub fn reset(&mut self) {
        self.smoother.reset();
        self.detector.reset();
        self.arbiter.reset();
    }
}

/// Counts accumulated over an offline run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineCounters {
    pub onsets: usize,
    pub offsets: usize,
    pub pauses: usize,
    pub resumes: usize,
}

#[derive(Debug)]
pub struct OfflineRun {
    pub outputs: Vec<TickOutput>,
    pub counters: EngineCounters,
    pub final_state: DetectionState,
}

/// Drive the engine over prepared frames with a synthetic clock, one tick
/// per frame, then keep polling for `settle` so a scheduled resume can
/// fire. Used by the simulate CLI path and the integration scenarios; no
/// microphone or wall-clock sleeping involved.
pub fn run_engine_offline(
    frames: &[FrequencyFrame],
    cfg: EngineConfig,
    playback: &mut dyn Playback,
    tick: Duration,
    settle: Duration,
) -> OfflineRun {
    let mut engine = DetectionEngine::new(cfg);
    let mut counters = EngineCounters::default();
    let mut outputs = Vec::with_capacity(frames.len());
    let start = Instant::now();
    let mut now = start;

    for frame in frames {
        now += tick;
        let out = engine.tick(frame, now, playback);
        tally(&mut counters, out.transition, out.action);
        outputs.push(out);
    }

    let settle_deadline = now + settle;
    while now < settle_deadline {
        now += tick;
        let action = engine.idle_tick(now, playback);
        tally(&mut counters, None, action);
    }

    OfflineRun {
        outputs,
        counters,
        final_state: engine.state(),
    }
}

fn tally(
    counters: &mut EngineCounters,
    transition: Option<DetectionTransition>,
    action: Option<ArbiterAction>,
) {
    match transition {
        Some(DetectionTransition::Onset) => counters.onsets += 1,
        Some(DetectionTransition::Offset) => counters.offsets += 1,
        None => {}
    }
    match action {
        Some(ArbiterAction::Paused) => counters.pauses += 1,
        Some(ArbiterAction::Resumed) => counters.resumes += 1,
        None => {}
    }
}
