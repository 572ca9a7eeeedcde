//! Core of pulse: a periodic clicker that can skip its click when a watched
//! screen region stops looking like a captured reference.

pub mod capture;
pub mod error;
pub mod interval;
pub mod logger;
pub mod platform;
pub mod scheduler;
pub mod similarity;
pub mod sleep;
pub mod status;
pub mod types;

pub use capture::{CaptureEvent, CaptureOutcome, CaptureSession, CaptureStep};
pub use error::ConfigError;
pub use scheduler::ActionScheduler;
pub use status::{ChannelReporter, RunStatus, StatusReporter};
pub use types::{CaptureResult, ClickKind, IntervalConfig, Point, Region, RunPlan, SafetyConfig};
