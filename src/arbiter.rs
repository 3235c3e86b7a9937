//! Playback pause/resume arbitration around detector transitions.
//!
//! The arbiter owns the two pieces of state that outlive a single tick: the
//! playback snapshot captured at onset and the optional resume deadline.
//! Both have a strict lifecycle: the snapshot appears at the first onset and
//! clears when a resume settles or auto-resume is off; the deadline exists
//! only between an offset and either its expiry or the next onset.

use crate::playback::Playback;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArbiterConfig {
    pub auto_resume: bool,
    pub pause_duration: Duration,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            auto_resume: true,
            pause_duration: Duration::from_secs(5),
        }
    }
}

/// Whether playback was running when the siren first appeared. Captured
/// exactly once per detection cycle.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlaybackSnapshot {
    pub was_playing: bool,
}

/// Command the arbiter actually issued this tick.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ArbiterAction {
    Paused,
    Resumed,
}

pub struct PlaybackArbiter {
    cfg: ArbiterConfig,
    snapshot: Option<PlaybackSnapshot>,
    resume_deadline: Option<Instant>,
}

impl PlaybackArbiter {
    pub fn new(cfg: ArbiterConfig) -> Self {
        Self {
            cfg,
            snapshot: None,
            resume_deadline: None,
        }
    }

    pub fn configure(&mut self, cfg: ArbiterConfig) {
        self.cfg = cfg;
    }

    pub fn snapshot(&self) -> Option<PlaybackSnapshot> {
        self.snapshot
    }

    pub fn resume_pending(&self) -> bool {
        self.resume_deadline.is_some()
    }

    /// Handle an onset. A new onset always invalidates a pending resume
    /// before anything else; the original snapshot survives, because it
    /// still describes what the user was doing before the first siren.
    pub fn on_onset(&mut self, playback: &mut dyn Playback) -> Option<ArbiterAction> {
        if self.resume_deadline.take().is_some() {
            debug!("pending resume cancelled by new onset");
        }
        let snapshot = *self.snapshot.get_or_insert_with(|| PlaybackSnapshot {
            was_playing: playback.is_playing(),
        });
        if !snapshot.was_playing {
            return None;
        }
        if !playback.is_playing() {
            debug!(player = playback.name(), "redundant pause suppressed");
            return None;
        }
        playback.pause();
        Some(ArbiterAction::Paused)
    }

    /// Handle a settled offset. With auto-resume off the snapshot is dropped
    /// and nothing further happens; otherwise a resume deadline is scheduled
    /// `pause_duration` ahead for snapshots that were playing.
    pub fn on_offset(&mut self, now: Instant) {
        if !self.cfg.auto_resume {
            self.snapshot = None;
            return;
        }
        match self.snapshot {
            Some(PlaybackSnapshot { was_playing: true }) => {
                self.resume_deadline = Some(now + self.cfg.pause_duration);
                debug!(
                    delay_ms = self.cfg.pause_duration.as_millis() as u64,
                    "resume scheduled"
                );
            }
            _ => self.snapshot = None,
        }
    }

    /// Check the resume deadline. Must run after onset handling within a
    /// tick, so an onset landing on the same tick as the deadline cancels
    /// the timer before it can fire.
    pub fn poll(&mut self, now: Instant, playback: &mut dyn Playback) -> Option<ArbiterAction> {
        let deadline = self.resume_deadline?;
        if now < deadline {
            return None;
        }
        self.resume_deadline = None;
        self.snapshot = None;
        if playback.is_playing() {
            debug!(player = playback.name(), "redundant resume suppressed");
            return None;
        }
        playback.resume();
        Some(ArbiterAction::Resumed)
    }

    /// Session shutdown: drop the timer and snapshot without issuing any
    /// playback commands. What to do with a still-paused player is the
    /// caller's decision.
    pub fn reset(&mut self) {
        self.snapshot = None;
        self.resume_deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::SimulatedPlayback;

    fn arbiter_with(pause_secs: u64) -> PlaybackArbiter {
        PlaybackArbiter::new(ArbiterConfig {
            auto_resume: true,
            pause_duration: Duration::from_secs(pause_secs),
        })
    }

    #[test]
    fn onset_pauses_playing_playback_exactly_once() {
        let mut arbiter = arbiter_with(1);
        let mut playback = SimulatedPlayback::new(true);

        assert_eq!(
            arbiter.on_onset(&mut playback),
            Some(ArbiterAction::Paused)
        );
        assert_eq!(playback.pause_commands, 1);
        assert!(!playback.is_playing());

        // A second onset in the same cycle finds playback already paused.
        assert_eq!(arbiter.on_onset(&mut playback), None);
        assert_eq!(playback.pause_commands, 1);
    }

    #[test]
    fn onset_with_stopped_playback_issues_nothing() {
        let mut arbiter = arbiter_with(1);
        let mut playback = SimulatedPlayback::new(false);
        assert_eq!(arbiter.on_onset(&mut playback), None);
        assert_eq!(playback.pause_commands, 0);
        assert_eq!(
            arbiter.snapshot(),
            Some(PlaybackSnapshot { was_playing: false })
        );
    }

    #[test]
    fn resume_fires_after_pause_duration() {
        let mut arbiter = arbiter_with(1);
        let mut playback = SimulatedPlayback::new(true);
        let start = Instant::now();

        arbiter.on_onset(&mut playback);
        arbiter.on_offset(start);
        assert!(arbiter.resume_pending());

        assert_eq!(
            arbiter.poll(start + Duration::from_millis(900), &mut playback),
            None
        );
        assert_eq!(
            arbiter.poll(start + Duration::from_millis(1000), &mut playback),
            Some(ArbiterAction::Resumed)
        );
        assert!(playback.is_playing());
        assert_eq!(playback.resume_commands, 1);
        assert_eq!(arbiter.snapshot(), None);

        // Nothing left pending afterwards.
        assert_eq!(
            arbiter.poll(start + Duration::from_secs(5), &mut playback),
            None
        );
        assert_eq!(playback.resume_commands, 1);
    }

    #[test]
    fn new_onset_cancels_pending_resume() {
        let mut arbiter = arbiter_with(1);
        let mut playback = SimulatedPlayback::new(true);
        let start = Instant::now();

        arbiter.on_onset(&mut playback);
        arbiter.on_offset(start);

        // Second siren 400 ms later, before the 1 s resume fires.
        let second_onset = start + Duration::from_millis(400);
        assert_eq!(arbiter.on_onset(&mut playback), None);
        assert!(!arbiter.resume_pending());
        // The snapshot survives the cancelled cycle.
        assert_eq!(
            arbiter.snapshot(),
            Some(PlaybackSnapshot { was_playing: true })
        );

        // The original deadline comes and goes without a resume.
        assert_eq!(
            arbiter.poll(second_onset + Duration::from_secs(2), &mut playback),
            None
        );
        assert_eq!(playback.resume_commands, 0);
        assert_eq!(playback.pause_commands, 1);
    }

    #[test]
    fn onset_poll_ordering_beats_due_timer() {
        let mut arbiter = arbiter_with(1);
        let mut playback = SimulatedPlayback::new(true);
        let start = Instant::now();

        arbiter.on_onset(&mut playback);
        arbiter.on_offset(start);

        // Onset and deadline land on the same tick; onset runs first.
        let tick = start + Duration::from_secs(2);
        arbiter.on_onset(&mut playback);
        assert_eq!(arbiter.poll(tick, &mut playback), None);
        assert_eq!(playback.resume_commands, 0);
    }

    #[test]
    fn disabled_auto_resume_drops_snapshot_without_action() {
        let mut arbiter = PlaybackArbiter::new(ArbiterConfig {
            auto_resume: false,
            pause_duration: Duration::from_secs(1),
        });
        let mut playback = SimulatedPlayback::new(true);
        let start = Instant::now();

        arbiter.on_onset(&mut playback);
        arbiter.on_offset(start);
        assert!(!arbiter.resume_pending());
        assert_eq!(arbiter.snapshot(), None);
        assert_eq!(
            arbiter.poll(start + Duration::from_secs(10), &mut playback),
            None
        );
        assert_eq!(playback.resume_commands, 0);
    }

    #[test]
    fn offset_without_playing_snapshot_schedules_nothing() {
        let mut arbiter = arbiter_with(1);
        let mut playback = SimulatedPlayback::new(false);
        let start = Instant::now();

        arbiter.on_onset(&mut playback);
        arbiter.on_offset(start);
        assert!(!arbiter.resume_pending());
        assert_eq!(arbiter.snapshot(), None);
    }

    #[test]
    fn resume_suppressed_if_user_already_resumed() {
        let mut arbiter = arbiter_with(1);
        let mut playback = SimulatedPlayback::new(true);
        let start = Instant::now();

        arbiter.on_onset(&mut playback);
        arbiter.on_offset(start);
        // User hits play themselves during the pause window.
        playback.resume();
        assert_eq!(
            arbiter.poll(start + Duration::from_secs(2), &mut playback),
            None
        );
        assert_eq!(playback.resume_commands, 1);
        assert_eq!(arbiter.snapshot(), None);
    }

    #[test]
    fn reset_drops_state_without_commands() {
        let mut arbiter = arbiter_with(1);
        let mut playback = SimulatedPlayback::new(true);
        let start = Instant::now();

        arbiter.on_onset(&mut playback);
        arbiter.on_offset(start);
        arbiter.reset();
        assert!(!arbiter.resume_pending());
        assert_eq!(arbiter.snapshot(), None);
        assert_eq!(
            arbiter.poll(start + Duration::from_secs(5), &mut playback),
            None
        );
        assert_eq!(playback.resume_commands, 0);
    }
}
