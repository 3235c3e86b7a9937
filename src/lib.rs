pub mod analysis;
pub mod arbiter;
pub mod capture;
pub mod config;
pub mod engine;
pub mod meter;
pub mod monitor;
pub mod playback;
pub mod telemetry;

pub use analysis::{DetectionState, DetectionTransition, DetectorConfig, FrequencyFrame};
pub use arbiter::{ArbiterAction, ArbiterConfig, PlaybackArbiter};
pub use engine::{run_engine_offline, DetectionEngine, EngineConfig};
pub use monitor::{MonitorEvent, MonitorMetrics, SirenMonitor};
pub use playback::{Playback, SharedPlayback, SimulatedPlayback, TogglePlayback};
