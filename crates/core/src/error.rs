use thiserror::Error;

use crate::types::Point;

/// Reasons `ActionScheduler::start` refuses a run plan. The scheduler stays idle.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("interval must be at least 1 second (got {0})")]
    IntervalTooShort(u64),

    #[error("max interval ({max}s) must be greater than min interval ({min}s)")]
    InvertedRandomBounds { min: u64, max: u64 },

    #[error("similarity threshold must be within 0..=100 (got {0})")]
    ThresholdOutOfRange(f64),

    #[error("safety check is enabled but no region has been captured")]
    MissingReference,

    #[error("{what} point {point} has a negative coordinate")]
    NegativePoint { what: &'static str, point: Point },

    #[error("{what} point {point} is outside the {width}x{height} display")]
    PointOutOfBounds {
        what: &'static str,
        point: Point,
        width: u32,
        height: u32,
    },
}
