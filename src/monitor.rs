//! Threaded monitor shell around the detection engine.
//!
//! The worker thread owns the capture session and runs the tick loop;
//! callers talk to it through a command channel and receive events over a
//! bounded channel. Confidence updates are droppable under backpressure;
//! transitions and playback commands evict the oldest queued event instead
//! of being lost.

use crate::analysis::{DetectionState, DetectionTransition, DetectorConfig};
use crate::arbiter::ArbiterAction;
use crate::capture::{CaptureSession, FramePull};
use crate::config::MonitorConfig;
use crate::engine::DetectionEngine;
use crate::meter::ConfidenceMeter;
use crate::playback::Playback;
use anyhow::{anyhow, bail, Context, Result};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

pub const EVENT_CHANNEL_CAPACITY: usize = 64;
const COMMAND_CHANNEL_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    DetectionChanged(DetectionState),
    Confidence(f32),
    PlaybackPaused,
    PlaybackResumed,
    CaptureFailed(String),
}

impl MonitorEvent {
    /// Confidence updates are advisory and may be shed under backpressure;
    /// everything else must reach the consumer.
    fn droppable(&self) -> bool {
        matches!(self, MonitorEvent::Confidence(_))
    }
}

#[derive(Debug, Clone)]
enum MonitorCommand {
    Configure(DetectorConfig),
    Stop,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    Requested,
    StreamLost,
    CaptureFailed,
}

impl StopReason {
    pub fn label(&self) -> &'static str {
        match self {
            StopReason::Requested => "requested",
            StopReason::StreamLost => "stream_lost",
            StopReason::CaptureFailed => "capture_failed",
        }
    }
}

/// Session metrics returned by `stop()` and mirrored into the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorMetrics {
    pub ticks: u64,
    pub frames_scored: u64,
    pub frames_dropped: u64,
    pub events_dropped: u64,
    pub onsets: u64,
    pub offsets: u64,
    pub pauses_issued: u64,
    pub resumes_issued: u64,
    pub stop_reason: StopReason,
}

impl Default for MonitorMetrics {
    fn default() -> Self {
        Self {
            ticks: 0,
            frames_scored: 0,
            frames_dropped: 0,
            events_dropped: 0,
            onsets: 0,
            offsets: 0,
            pauses_issued: 0,
            resumes_issued: 0,
            stop_reason: StopReason::Requested,
        }
    }
}

/// Owns the worker thread and the only capture session.
///
/// `start()` on an already-running monitor fails, which is what prevents
/// two detectors from commanding pause/resume on the same playback state.
pub struct SirenMonitor {
    config: MonitorConfig,
    meter: ConfidenceMeter,
    stop_flag: Arc<AtomicBool>,
    commands: Option<Sender<MonitorCommand>>,
    handle: Option<thread::JoinHandle<MonitorMetrics>>,
}

impl SirenMonitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            config,
            meter: ConfidenceMeter::new(),
            stop_flag: Arc::new(AtomicBool::new(false)),
            commands: None,
            handle: None,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Gauge handle a UI can poll without draining events.
    pub fn meter(&self) -> ConfidenceMeter {
        self.meter.clone()
    }

    /// Spawn the worker and block until capture acquisition resolves, which
    /// may take a while if the OS prompts for microphone permission.
    pub fn start(&mut self, playback: Box<dyn Playback + Send>) -> Result<Receiver<MonitorEvent>> {
        if self.handle.is_some() {
            bail!("siren monitor already running");
        }
        let (event_tx, event_rx) = bounded(EVENT_CHANNEL_CAPACITY);
        let (command_tx, command_rx) = bounded(COMMAND_CHANNEL_CAPACITY);
        let (ready_tx, ready_rx) = bounded::<std::result::Result<(), String>>(1);
        self.stop_flag.store(false, Ordering::Relaxed);

        let worker = MonitorWorker {
            config: self.config.clone(),
            playback,
            stop_flag: self.stop_flag.clone(),
            meter: self.meter.clone(),
            commands: command_rx,
            events: event_tx,
            evictor: event_rx.clone(),
        };
        let handle = thread::spawn(move || worker.run(ready_tx));

        let acquired = ready_rx
            .recv()
            .context("monitor worker exited before reporting capture status")?;
        if let Err(detail) = acquired {
            let _ = handle.join();
            return Err(anyhow!(detail).context("failed to acquire capture session"));
        }

        self.commands = Some(command_tx);
        self.handle = Some(handle);
        Ok(event_rx)
    }

    /// Swap detector thresholds on the running session; takes effect from
    /// the next scored frame.
    pub fn configure(&self, cfg: DetectorConfig) -> Result<()> {
        let commands = self
            .commands
            .as_ref()
            .ok_or_else(|| anyhow!("siren monitor not running"))?;
        commands
            .send(MonitorCommand::Configure(cfg))
            .context("monitor command channel closed")
    }

    /// Stop the worker, release capture, and return the session metrics.
    /// Returns None when the monitor was not running.
    pub fn stop(&mut self) -> Option<MonitorMetrics> {
        let handle = self.handle.take()?;
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(commands) = self.commands.take() {
            let _ = commands.try_send(MonitorCommand::Stop);
        }
        match handle.join() {
            Ok(metrics) => {
                log_monitor_metrics(&metrics);
                Some(metrics)
            }
            Err(_) => {
                warn!("monitor worker panicked");
                None
            }
        }
    }
}

impl Drop for SirenMonitor {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

struct MonitorWorker {
    config: MonitorConfig,
    playback: Box<dyn Playback + Send>,
    stop_flag: Arc<AtomicBool>,
    meter: ConfidenceMeter,
    commands: Receiver<MonitorCommand>,
    events: Sender<MonitorEvent>,
    evictor: Receiver<MonitorEvent>,
}

impl MonitorWorker {
    fn run(mut self, ready_tx: Sender<std::result::Result<(), String>>) -> MonitorMetrics {
        let mut metrics = MonitorMetrics::default();
        let mut session = CaptureSession::new(self.config.capture.clone());
        if let Err(err) = session.acquire() {
            let _ = ready_tx.send(Err(err.to_string()));
            metrics.stop_reason = StopReason::CaptureFailed;
            return metrics;
        }
        let _ = ready_tx.send(Ok(()));

        let mut engine = DetectionEngine::new(self.config.engine());
        let wait = self.config.capture.tick;

        loop {
            if self.stop_flag.load(Ordering::Relaxed) {
                metrics.stop_reason = StopReason::Requested;
                break;
            }
            while let Ok(command) = self.commands.try_recv() {
                match command {
                    MonitorCommand::Configure(cfg) => engine.configure_detector(cfg),
                    MonitorCommand::Stop => self.stop_flag.store(true, Ordering::Relaxed),
                }
            }
            if self.stop_flag.load(Ordering::Relaxed) {
                metrics.stop_reason = StopReason::Requested;
                break;
            }

            match session.poll_frame(wait) {
                FramePull::Frame(frame) => {
                    let now = Instant::now();
                    let out = engine.tick(&frame, now, self.playback.as_mut());
                    metrics.ticks += 1;
                    metrics.frames_scored += 1;
                    self.meter.set(out.confidence);
                    self.push_event(MonitorEvent::Confidence(out.confidence), &mut metrics);
                    match out.transition {
                        Some(DetectionTransition::Onset) => {
                            metrics.onsets += 1;
                            info!(confidence = out.confidence, "siren detected");
                            self.push_event(
                                MonitorEvent::DetectionChanged(engine.state()),
                                &mut metrics,
                            );
                        }
                        Some(DetectionTransition::Offset) => {
                            metrics.offsets += 1;
                            info!(confidence = out.confidence, "siren gone");
                            self.push_event(
                                MonitorEvent::DetectionChanged(engine.state()),
                                &mut metrics,
                            );
                        }
                        None => {}
                    }
                    match out.action {
                        Some(ArbiterAction::Paused) => {
                            metrics.pauses_issued += 1;
                            self.push_event(MonitorEvent::PlaybackPaused, &mut metrics);
                        }
                        Some(ArbiterAction::Resumed) => {
                            metrics.resumes_issued += 1;
                            self.push_event(MonitorEvent::PlaybackResumed, &mut metrics);
                        }
                        None => {}
                    }
                }
                FramePull::Empty => {
                    metrics.ticks += 1;
                    if let Some(ArbiterAction::Resumed) =
                        engine.idle_tick(Instant::now(), self.playback.as_mut())
                    {
                        metrics.resumes_issued += 1;
                        self.push_event(MonitorEvent::PlaybackResumed, &mut metrics);
                    }
                }
                FramePull::Lost => {
                    warn!("capture stream disconnected");
                    self.push_event(
                        MonitorEvent::CaptureFailed("capture stream disconnected".to_string()),
                        &mut metrics,
                    );
                    metrics.stop_reason = StopReason::StreamLost;
                    break;
                }
            }
        }

        metrics.frames_dropped = session.frames_dropped() as u64;
        session.release();
        metrics
    }

    fn push_event(&self, event: MonitorEvent, metrics: &mut MonitorMetrics) {
        metrics.events_dropped +=
            push_with_eviction(&self.events, &self.evictor, event);
    }
}

/// Queue an event, shedding load when the consumer lags: a droppable event
/// is simply dropped, anything else evicts the oldest queued entry and goes
/// in behind it. Returns how many events were lost.
fn push_with_eviction(
    sender: &Sender<MonitorEvent>,
    evictor: &Receiver<MonitorEvent>,
    event: MonitorEvent,
) -> u64 {
    match sender.try_send(event) {
        Ok(()) => 0,
        Err(TrySendError::Full(event)) => {
            if event.droppable() {
                debug!("confidence event dropped under backpressure");
                return 1;
            }
            let _ = evictor.try_recv();
            match sender.try_send(event) {
                Ok(()) => 1,
                Err(_) => 2,
            }
        }
        Err(TrySendError::Disconnected(_)) => 0,
    }
}

/// Structured one-line metrics record for smoke tooling.
/// Format: `monitor_metrics|ticks=...|frames_scored=...|...|stop=...`
pub(crate) fn log_monitor_metrics(metrics: &MonitorMetrics) {
    info!(
        "monitor_metrics|ticks={}|frames_scored={}|frames_dropped={}|events_dropped={}|onsets={}|offsets={}|pauses={}|resumes={}|stop={}",
        metrics.ticks,
        metrics.frames_scored,
        metrics.frames_dropped,
        metrics.events_dropped,
        metrics.onsets,
        metrics.offsets,
        metrics.pauses_issued,
        metrics.resumes_issued,
        metrics.stop_reason.label()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::SimulatedPlayback;

    #[test]
    fn stop_reason_labels_are_stable() {
        assert_eq!(StopReason::Requested.label(), "requested");
        assert_eq!(StopReason::StreamLost.label(), "stream_lost");
        assert_eq!(StopReason::CaptureFailed.label(), "capture_failed");
    }

    #[test]
    fn confidence_events_are_droppable_transitions_are_not() {
        assert!(MonitorEvent::Confidence(0.5).droppable());
        assert!(!MonitorEvent::DetectionChanged(DetectionState::Detected).droppable());
        assert!(!MonitorEvent::PlaybackPaused.droppable());
        assert!(!MonitorEvent::CaptureFailed("x".into()).droppable());
    }

    #[test]
    fn eviction_sheds_confidence_but_keeps_transitions() {
        let (tx, rx) = bounded(2);
        assert_eq!(push_with_eviction(&tx, &rx, MonitorEvent::Confidence(0.1)), 0);
        assert_eq!(push_with_eviction(&tx, &rx, MonitorEvent::Confidence(0.2)), 0);

        // Channel full: another confidence update is simply dropped.
        assert_eq!(push_with_eviction(&tx, &rx, MonitorEvent::Confidence(0.3)), 1);

        // A transition evicts the oldest entry instead.
        assert_eq!(
            push_with_eviction(
                &tx,
                &rx,
                MonitorEvent::DetectionChanged(DetectionState::Detected)
            ),
            1
        );
        assert_eq!(rx.try_recv(), Ok(MonitorEvent::Confidence(0.2)));
        assert_eq!(
            rx.try_recv(),
            Ok(MonitorEvent::DetectionChanged(DetectionState::Detected))
        );
    }

    #[test]
    fn stop_without_start_returns_none() {
        let mut monitor = SirenMonitor::new(MonitorConfig::default());
        assert!(monitor.stop().is_none());
        assert!(!monitor.is_running());
    }

    #[test]
    fn configure_before_start_errors() {
        let monitor = SirenMonitor::new(MonitorConfig::default());
        assert!(monitor.configure(DetectorConfig::default()).is_err());
    }

    #[test]
    fn start_with_missing_device_fails_cleanly() {
        let mut config = MonitorConfig::default();
        config.capture.preferred_device = Some("sirenguard-test-nonexistent-device".to_string());
        let mut monitor = SirenMonitor::new(config);
        let err = monitor
            .start(Box::new(SimulatedPlayback::new(false)))
            .expect_err("missing device must fail start");
        assert!(
            format!("{err:#}").contains("capture"),
            "error should mention capture acquisition: {err:#}"
        );
        assert!(!monitor.is_running());
        // A failed start leaves the monitor usable for another attempt.
        assert!(monitor.stop().is_none());
    }

    #[test]
    fn monitor_metrics_default_to_requested_stop() {
        let metrics = MonitorMetrics::default();
        assert_eq!(metrics.stop_reason, StopReason::Requested);
        assert_eq!(metrics.ticks, 0);
    }
}
