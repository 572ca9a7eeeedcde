use rand::Rng;

use crate::error::ConfigError;
use crate::types::IntervalConfig;

/// Seconds to wait before the next action.
///
/// Randomized configs draw uniformly from `min..=max`. A randomized config whose
/// bounds are not strictly increasing falls back to `min_seconds`.
pub fn next_delay<R: Rng + ?Sized>(config: &IntervalConfig, rng: &mut R) -> u64 {
    if config.randomized && config.max_seconds > config.min_seconds {
        rng.gen_range(config.min_seconds..=config.max_seconds)
    } else {
        config.min_seconds
    }
}

/// Checks the bounds `start()` insists on.
pub fn validate(config: &IntervalConfig) -> Result<(), ConfigError> {
    if config.min_seconds < 1 {
        return Err(ConfigError::IntervalTooShort(config.min_seconds));
    }
    if config.randomized && config.max_seconds <= config.min_seconds {
        return Err(ConfigError::InvertedRandomBounds {
            min: config.min_seconds,
            max: config.max_seconds,
        });
    }
    Ok(())
}

/// `MM:SS`, minutes are not wrapped into hours.
pub fn format_countdown(seconds: u64) -> String {
    format!("{:02}:{:02}", seconds / 60, seconds % 60)
}
