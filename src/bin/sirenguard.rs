use anyhow::{Context, Result};
use crossbeam_channel::RecvTimeoutError;
use sirenguard::capture::CaptureSession;
use sirenguard::config::AppConfig;
use sirenguard::engine::run_engine_offline;
use sirenguard::monitor::{MonitorEvent, SirenMonitor};
use sirenguard::playback::{Playback, SharedPlayback, SimulatedPlayback};
use sirenguard::{telemetry, DetectionState, FrequencyFrame};
use std::time::{Duration, Instant};

fn main() -> Result<()> {
    let config = AppConfig::parse_args()?;
    telemetry::init_tracing(&config);

    if config.list_input_devices {
        return list_input_devices();
    }
    if config.dump_config {
        let monitor = config.monitor_config();
        println!(
            "{}",
            serde_json::to_string_pretty(&monitor).context("failed to serialize config")?
        );
        return Ok(());
    }
    if config.simulate {
        return run_simulation(&config);
    }
    if config.ambient_probe {
        return run_ambient_probe(&config);
    }
    run_live(&config)
}

fn list_input_devices() -> Result<()> {
    let devices = CaptureSession::list_devices().context("failed to enumerate input devices")?;
    if devices.is_empty() {
        println!("no audio input devices detected");
        return Ok(());
    }
    for name in devices {
        println!("{name}");
    }
    Ok(())
}

/// Drive the engine over a synthetic clip: quiet lead-in, a siren burst,
/// then enough quiet tail for the offset and resume to settle. No
/// microphone involved; useful for checking thresholds before a live run.
fn run_simulation(config: &AppConfig) -> Result<()> {
    const SAMPLE_RATE: u32 = 48_000;
    const LEAD_FRAMES: usize = 10;
    const SIREN_FRAMES: usize = 20;
    const TAIL_FRAMES: usize = 40;

    let monitor = config.monitor_config();
    let fft_size = monitor.capture.fft_size;

    let mut frames = vec![quiet_frame(fft_size, SAMPLE_RATE); LEAD_FRAMES];
    frames.extend(vec![siren_frame(fft_size, SAMPLE_RATE); SIREN_FRAMES]);
    frames.extend(vec![quiet_frame(fft_size, SAMPLE_RATE); TAIL_FRAMES]);

    let mut playback = SimulatedPlayback::new(true);
    let settle = monitor.arbiter.pause_duration + monitor.tick();
    let run = run_engine_offline(
        &frames,
        monitor.engine(),
        &mut playback,
        monitor.tick(),
        settle,
    );

    let peak_confidence = run
        .outputs
        .iter()
        .map(|out| out.confidence)
        .fold(0.0f32, f32::max);
    println!(
        "simulate_metrics|frames={}|onsets={}|offsets={}|pauses={}|resumes={}|peak_confidence={:.3}|final_state={}",
        frames.len(),
        run.counters.onsets,
        run.counters.offsets,
        run.counters.pauses,
        run.counters.resumes,
        peak_confidence,
        run.final_state.label()
    );
    Ok(())
}

/// Sample the room for a while and report the peak confidence the ambient
/// noise reaches, plus an onset level that sits comfortably above it.
fn run_ambient_probe(config: &AppConfig) -> Result<()> {
    let mut monitor = SirenMonitor::new(config.monitor_config());
    let events = monitor
        .start(Box::new(SimulatedPlayback::new(false)))
        .context("ambient probe failed to start")?;
    let meter = monitor.meter();

    let deadline = Instant::now() + Duration::from_millis(config.ambient_probe_ms);
    let mut peak = 0.0f32;
    while Instant::now() < deadline {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(MonitorEvent::Confidence(value)) => peak = peak.max(value),
            Ok(_) => {}
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    peak = peak.max(meter.confidence());
    monitor.stop();

    // Suggest a threshold 50% above ambient, floored at the default.
    let suggested = (peak * 1.5).max(config.onset_confidence).min(1.0);
    println!(
        "ambient_probe|duration_ms={}|peak_confidence={:.3}|suggested_onset_confidence={:.3}",
        config.ambient_probe_ms, peak, suggested
    );
    Ok(())
}

/// Live monitoring against a stand-in player for `--run-ms`, printing each
/// event as it lands and a metrics line at the end.
fn run_live(config: &AppConfig) -> Result<()> {
    let playback = SharedPlayback::new(SimulatedPlayback::new(true));
    let mut monitor = SirenMonitor::new(config.monitor_config());
    let events = monitor
        .start(Box::new(playback.clone()))
        .context("monitor failed to start")?;

    let deadline = Instant::now() + Duration::from_millis(config.run_ms);
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            break;
        }
        match events.recv_timeout(remaining) {
            Ok(MonitorEvent::DetectionChanged(DetectionState::Detected)) => {
                println!("siren detected");
            }
            Ok(MonitorEvent::DetectionChanged(DetectionState::Idle)) => {
                println!("siren cleared");
            }
            Ok(MonitorEvent::PlaybackPaused) => println!("playback paused"),
            Ok(MonitorEvent::PlaybackResumed) => println!("playback resumed"),
            Ok(MonitorEvent::CaptureFailed(detail)) => {
                println!("capture failed: {detail}");
                break;
            }
            Ok(MonitorEvent::Confidence(_)) => {}
            Err(RecvTimeoutError::Timeout) => break,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if let Some(metrics) = monitor.stop() {
        println!(
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
    let (paused, resumed) = playback.with(|p| (p.pause_commands, p.resume_commands));
    println!(
        "playback|playing={}|pauses={paused}|resumes={resumed}",
        playback.is_playing()
    );
    Ok(())
}

fn quiet_frame(fft_size: usize, sample_rate: u32) -> FrequencyFrame {
    FrequencyFrame::new(vec![0; fft_size], sample_rate)
}

/// Synthetic siren signature: loud oscillating bins across the 600-2500 Hz
/// profile, everything else quiet.
fn siren_frame(fft_size: usize, sample_rate: u32) -> FrequencyFrame {
    let mut bins = vec![0u8; fft_size];
    let bin_hz = sample_rate as f32 / fft_size as f32;
    let low = (600.0 / bin_hz).floor() as usize;
    let high = ((2500.0 / bin_hz).ceil() as usize).min(fft_size / 2);
    for i in low..=high {
        bins[i] = if i % 2 == 0 { 250 } else { 40 };
    }
    FrequencyFrame::new(bins, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_siren_frame_scores_above_default_threshold() {
        let frame = siren_frame(2048, 48_000);
        let score = sirenguard::analysis::band_energy_score(
            &frame,
            &sirenguard::analysis::ScoringConfig::default(),
        );
        assert!(score > 0.28, "synthetic siren must clear onset level, got {score}");
    }

    #[test]
    fn quiet_frame_scores_zero() {
        let frame = quiet_frame(2048, 48_000);
        let score = sirenguard::analysis::band_energy_score(
            &frame,
            &sirenguard::analysis::ScoringConfig::default(),
        );
        assert_eq!(score, 0.0);
    }
}
