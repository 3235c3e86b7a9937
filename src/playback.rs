//! Seam to the playback subsystem.
//!
//! The engine only ever reads the playing flag and issues explicit pause and
//! resume commands through this trait; everything about how sound actually
//! stops is the player's business.

use std::sync::{Arc, Mutex};
use tracing::debug;

pub trait Playback {
    fn is_playing(&self) -> bool;
    fn pause(&mut self);
    fn resume(&mut self);
    fn name(&self) -> &'static str {
        "playback"
    }
}

/// Adapter over a player that only exposes a single flip control.
///
/// Tracks the state the last command should have produced, so pause and
/// resume never double-toggle the underlying player into the wrong state.
pub struct TogglePlayback<C: FnMut()> {
    toggle: C,
    expected_playing: bool,
}

impl<C: FnMut()> TogglePlayback<C> {
    pub fn new(toggle: C, currently_playing: bool) -> Self {
        Self {
            toggle,
            expected_playing: currently_playing,
        }
    }
}

impl<C: FnMut()> Playback for TogglePlayback<C> {
    fn is_playing(&self) -> bool {
        self.expected_playing
    }

    fn pause(&mut self) {
        if !self.expected_playing {
            debug!("toggle pause skipped, already expected paused");
            return;
        }
        (self.toggle)();
        self.expected_playing = false;
    }

    fn resume(&mut self) {
        if self.expected_playing {
            debug!("toggle resume skipped, already expected playing");
            return;
        }
        (self.toggle)();
        self.expected_playing = true;
    }

    fn name(&self) -> &'static str {
        "toggle_playback"
    }
}

/// In-memory playback sink for the CLI simulate mode and tests. Tracks a
/// virtual playing flag and counts the commands it receives.
#[derive(Debug, Clone, Default)]
pub struct SimulatedPlayback {
    playing: bool,
    pub pause_commands: u32,
    pub resume_commands: u32,
}

impl SimulatedPlayback {
    pub fn new(playing: bool) -> Self {
        Self {
            playing,
            pause_commands: 0,
            resume_commands: 0,
        }
    }
}

impl Playback for SimulatedPlayback {
    fn is_playing(&self) -> bool {
        self.playing
    }

    fn pause(&mut self) {
        self.playing = false;
        self.pause_commands += 1;
    }

    fn resume(&mut self) {
        self.playing = true;
        self.resume_commands += 1;
    }

    fn name(&self) -> &'static str {
        "simulated_playback"
    }
}

/// Shares one playback sink between the monitor worker and the caller, so
/// the caller can inspect state after the worker has taken ownership.
#[derive(Clone)]
pub struct SharedPlayback<P: Playback> {
    inner: Arc<Mutex<P>>,
}

impl<P: Playback> SharedPlayback<P> {
    pub fn new(inner: P) -> Self {
        Self {
            inner: Arc::new(Mutex::new(inner)),
        }
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut P) -> R) -> R {
        let mut guard = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut guard)
    }
}

impl<P: Playback> Playback for SharedPlayback<P> {
    fn is_playing(&self) -> bool {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_playing()
    }

    fn pause(&mut self) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).pause();
    }

    fn resume(&mut self) {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .resume();
    }

    fn name(&self) -> &'static str {
        "shared_playback"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_playback_counts_commands() {
        let mut playback = SimulatedPlayback::new(true);
        playback.pause();
        playback.pause();
        playback.resume();
        assert!(playback.is_playing());
        assert_eq!(playback.pause_commands, 2);
        assert_eq!(playback.resume_commands, 1);
    }

    #[test]
    fn toggle_playback_never_double_toggles() {
        let mut flips = 0u32;
        {
            let mut playback = TogglePlayback::new(|| flips += 1, true);
            playback.pause();
            playback.pause();
            assert!(!playback.is_playing());
            playback.resume();
            playback.resume();
            assert!(playback.is_playing());
        }
        assert_eq!(flips, 2);
    }

    #[test]
    fn toggle_playback_tracks_initial_paused_state() {
        let mut flips = 0u32;
        {
            let mut playback = TogglePlayback::new(|| flips += 1, false);
            playback.pause();
            assert!(!playback.is_playing());
        }
        assert_eq!(flips, 0);
    }

    #[test]
    fn shared_playback_exposes_inner_state() {
        let shared = SharedPlayback::new(SimulatedPlayback::new(true));
        let mut handle = shared.clone();
        handle.pause();
        assert!(!shared.is_playing());
        assert_eq!(shared.with(|p| p.pause_commands), 1);
    }
}
