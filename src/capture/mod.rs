//! Microphone capture session feeding the detection pipeline.
//!
//! Owns the live input resource end to end: device selection, the cpal
//! stream whose callback only copies samples onto a bounded channel, and the
//! FFT analysis node that turns each window into a scorer-ready frame. One
//! session exists per monitor; sessions are not clonable, which is what
//! keeps two detectors from fighting over the same playback state.

mod dispatch;
mod spectrum;

pub use spectrum::{SpectrumAnalyzer, SpectrumError};

use crate::analysis::FrequencyFrame;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleFormat, StreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError};
use dispatch::WindowDispatcher;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Capture-side tuning. `tick` is the sampling interval driving the whole
/// pipeline; one analysis window is produced per tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    pub preferred_device: Option<String>,
    pub tick: Duration,
    pub fft_size: usize,
    pub min_db: f32,
    pub max_db: f32,
    pub spectral_smoothing: f32,
    pub channel_capacity: usize,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            preferred_device: None,
            tick: Duration::from_millis(150),
            fft_size: 2048,
            min_db: -100.0,
            max_db: -30.0,
            spectral_smoothing: 0.8,
            channel_capacity: 8,
        }
    }
}

/// Capture acquisition failures. Both are user-visible and disable
/// detection; nothing downstream of acquisition surfaces errors.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),
    #[error("audio input device unavailable: {0}")]
    DeviceUnavailable(String),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unacquired,
    Acquiring,
    Active,
    Released,
}

impl SessionState {
    pub fn label(self) -> &'static str {
        match self {
            SessionState::Unacquired => "unacquired",
            SessionState::Acquiring => "acquiring",
            SessionState::Active => "active",
            SessionState::Released => "released",
        }
    }
}

/// Outcome of one tick-loop poll against the session.
pub enum FramePull {
    Frame(FrequencyFrame),
    /// No window arrived within the wait interval.
    Empty,
    /// The stream callback side is gone; the session cannot recover.
    Lost,
}

pub struct CaptureSession {
    cfg: CaptureConfig,
    state: SessionState,
    stream: Option<cpal::Stream>,
    windows: Option<Receiver<Vec<f32>>>,
    analyzer: Option<SpectrumAnalyzer>,
    dropped: Arc<AtomicUsize>,
    sample_rate: u32,
    device_name: String,
}

impl CaptureSession {
    pub fn new(cfg: CaptureConfig) -> Self {
        Self {
            cfg,
            state: SessionState::Unacquired,
            stream: None,
            windows: None,
            analyzer: None,
            dropped: Arc::new(AtomicUsize::new(0)),
            sample_rate: 0,
            device_name: String::new(),
        }
    }

    /// List input device names for the CLI selector.
    pub fn list_devices() -> Result<Vec<String>, CaptureError> {
        let host = cpal::default_host();
        let devices = host
            .input_devices()
            .map_err(|err| CaptureError::DeviceUnavailable(err.to_string()))?;
        let mut names = Vec::new();
        for device in devices {
            if let Ok(name) = device.name() {
                names.push(name);
            }
        }
        Ok(names)
    }

    /// Request the input resource and start the windowed frame loop.
    ///
    /// Legal after `release()`; a re-acquire starts from clean analysis
    /// state. May block while the OS prompts for microphone permission.
    pub fn acquire(&mut self) -> Result<(), CaptureError> {
        self.state = SessionState::Acquiring;
        match self.acquire_stream() {
            Ok(()) => {
                self.state = SessionState::Active;
                info!(device = %self.device_name, sample_rate = self.sample_rate, "capture session active");
                Ok(())
            }
            Err(err) => {
                self.teardown();
                self.state = SessionState::Unacquired;
                Err(err)
            }
        }
    }

    fn acquire_stream(&mut self) -> Result<(), CaptureError> {
        let host = cpal::default_host();
        let device = match &self.cfg.preferred_device {
            Some(name) => {
                let mut devices = host
                    .input_devices()
                    .map_err(|err| CaptureError::DeviceUnavailable(err.to_string()))?;
                devices
                    .find(|d| d.name().map(|n| n == *name).unwrap_or(false))
                    .ok_or_else(|| {
                        CaptureError::DeviceUnavailable(format!("input device '{name}' not found"))
                    })?
            }
            None => host.default_input_device().ok_or_else(|| {
                CaptureError::DeviceUnavailable("no default input device".to_string())
            })?,
        };
        self.device_name = device
            .name()
            .unwrap_or_else(|_| "unknown input device".to_string());

        let default_config = device
            .default_input_config()
            .map_err(|err| CaptureError::DeviceUnavailable(err.to_string()))?;
        let format = default_config.sample_format();
        let device_config: StreamConfig = default_config.into();
        let sample_rate = device_config.sample_rate.0;
        let channels = usize::from(device_config.channels.max(1));

        // One window per tick; never shorter than the FFT so the analyzer
        // always sees a full transform's worth of fresh samples.
        let tick_samples =
            ((u64::from(sample_rate) * self.cfg.tick.as_millis() as u64) / 1000).max(1) as usize;
        let window_samples = tick_samples.max(self.cfg.fft_size);
        debug!(
            format = ?format,
            sample_rate,
            channels,
            window_samples,
            "building capture stream"
        );

        let analyzer = SpectrumAnalyzer::new(&self.cfg)
            .map_err(|err| CaptureError::DeviceUnavailable(format!("analysis node: {err}")))?;

        let (sender, receiver) = bounded::<Vec<f32>>(self.cfg.channel_capacity.max(1));
        self.dropped.store(0, Ordering::Relaxed);
        let dispatcher = Arc::new(Mutex::new(WindowDispatcher::new(
            window_samples,
            sender,
            self.dropped.clone(),
        )));

        let err_fn = |err| debug!(error = %err, "audio stream error");
        let stream = match format {
            SampleFormat::F32 => {
                let dispatcher = dispatcher.clone();
                let dropped = self.dropped.clone();
                device.build_input_stream(
                    &device_config,
                    move |data: &[f32], _| {
                        if let Ok(mut pump) = dispatcher.try_lock() {
                            pump.push(data, channels, |sample| sample);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::I16 => {
                let dispatcher = dispatcher.clone();
                let dropped = self.dropped.clone();
                device.build_input_stream(
                    &device_config,
                    move |data: &[i16], _| {
                        if let Ok(mut pump) = dispatcher.try_lock() {
                            pump.push(data, channels, |sample| sample as f32 / 32_768.0);
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )
            }
            SampleFormat::U16 => {
                let dispatcher = dispatcher.clone();
                let dropped = self.dropped.clone();
                device.build_input_stream(
                    &device_config,
                    move |data: &[u16], _| {
                        if let Ok(mut pump) = dispatcher.try_lock() {
                            pump.push(data, channels, |sample| {
                                (sample as f32 - 32_768.0) / 32_768.0
                            });
                        } else {
                            dropped.fetch_add(1, Ordering::Relaxed);
                        }
                    },
                    err_fn,
                    None,
                )
            }
            other => {
                return Err(CaptureError::DeviceUnavailable(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        }
        .map_err(map_build_error)?;

        stream.play().map_err(|err| match err {
            cpal::PlayStreamError::DeviceNotAvailable => {
                CaptureError::DeviceUnavailable("device disappeared during start".to_string())
            }
            other => CaptureError::PermissionDenied(other.to_string()),
        })?;

        self.stream = Some(stream);
        self.windows = Some(receiver);
        self.analyzer = Some(analyzer);
        self.sample_rate = sample_rate;
        Ok(())
    }

    /// Wait up to `wait` for the next analysis window and score-ready frame.
    pub fn poll_frame(&mut self, wait: Duration) -> FramePull {
        let Some(windows) = self.windows.as_ref() else {
            return FramePull::Lost;
        };
        match windows.recv_timeout(wait) {
            Ok(window) => match self.analyzer.as_mut() {
                Some(analyzer) => FramePull::Frame(analyzer.analyze(&window, self.sample_rate)),
                None => FramePull::Lost,
            },
            Err(RecvTimeoutError::Timeout) => FramePull::Empty,
            Err(RecvTimeoutError::Disconnected) => FramePull::Lost,
        }
    }

    /// Stop the frame loop, release the input stream and drop the analysis
    /// node. The three steps run independently; a failure in one never skips
    /// the others. Idempotent: releasing a released session is a no-op.
    pub fn release(&mut self) {
        if self.state == SessionState::Released {
            return;
        }
        self.teardown();
        self.state = SessionState::Released;
        debug!(device = %self.device_name, "capture session released");
    }

    fn teardown(&mut self) {
        // Step 1: stop the periodic frame loop.
        self.windows = None;
        // Step 2: release the input stream.
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                debug!(error = %err, "failed to pause input stream");
            }
            drop(stream);
        }
        // Step 3: tear down the analysis node.
        self.analyzer = None;
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// Windows dropped by the callback because the tick loop fell behind.
    pub fn frames_dropped(&self) -> usize {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        self.release();
    }
}

fn map_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => {
            CaptureError::DeviceUnavailable("device disappeared during setup".to_string())
        }
        other => CaptureError::PermissionDenied(other.to_string()),
    }
}
