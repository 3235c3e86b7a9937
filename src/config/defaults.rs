//! Default values and tuning limits for CLI flags.

pub const DEFAULT_SENSITIVITY: f32 = 1.0;
pub const MIN_SENSITIVITY: f32 = 0.1;
pub const MAX_SENSITIVITY: f32 = 1.0;

pub const DEFAULT_ONSET_THRESHOLD_FRAMES: u32 = 5;
pub const DEFAULT_OFFSET_THRESHOLD_FRAMES: u32 = 10;
pub const MIN_THRESHOLD_FRAMES: u32 = 1;
pub const MAX_THRESHOLD_FRAMES: u32 = 100;

pub const DEFAULT_ONSET_CONFIDENCE: f32 = 0.28;

pub const DEFAULT_PAUSE_DURATION_SECS: u64 = 5;
pub const MAX_PAUSE_DURATION_SECS: u64 = 600;

pub const DEFAULT_TICK_MS: u64 = 150;
pub const MIN_TICK_MS: u64 = 50;
pub const MAX_TICK_MS: u64 = 1000;

pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const MIN_FFT_SIZE: usize = 256;
pub const MAX_FFT_SIZE: usize = 16384;

pub const DEFAULT_MIN_DB: f32 = -100.0;
pub const DEFAULT_MAX_DB: f32 = -30.0;

pub const DEFAULT_SPECTRAL_SMOOTHING: f32 = 0.8;
pub const MAX_SPECTRAL_SMOOTHING: f32 = 0.99;

pub const DEFAULT_CHANNEL_CAPACITY: usize = 8;
pub const MIN_CHANNEL_CAPACITY: usize = 1;
pub const MAX_CHANNEL_CAPACITY: usize = 1024;

pub const DEFAULT_AMBIENT_PROBE_MS: u64 = 3000;
pub const MIN_AMBIENT_PROBE_MS: u64 = 500;
pub const MAX_AMBIENT_PROBE_MS: u64 = 30_000;

pub const DEFAULT_RUN_MS: u64 = 10_000;
