//! Detector tunables that are time based rather than angle based.

use chrono::TimeDelta;
use serde::{Deserialize, Serialize};

/// Yoga-blocks pose hold requirement.
pub const DEFAULT_YOGA_HOLD_SECS: f64 = 5.0;

/// Longest a jump may stay airborne before it is discarded.
pub const DEFAULT_JUMP_AIR_TIMEOUT_SECS: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    pub yoga_hold_secs: f64,
    pub jump_air_timeout_secs: f64,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            yoga_hold_secs: DEFAULT_YOGA_HOLD_SECS,
            jump_air_timeout_secs: DEFAULT_JUMP_AIR_TIMEOUT_SECS,
        }
    }
}

impl DetectorConfig {
    pub fn yoga_hold(&self) -> TimeDelta {
        secs_to_delta(self.yoga_hold_secs)
    }

    pub fn jump_air_timeout(&self) -> TimeDelta {
        secs_to_delta(self.jump_air_timeout_secs)
    }

    /// True when every duration is positive and finite.
    pub fn is_valid(&self) -> bool {
        [self.yoga_hold_secs, self.jump_air_timeout_secs]
            .iter()
            .all(|v| v.is_finite() && *v > 0.0)
    }
}

fn secs_to_delta(secs: f64) -> TimeDelta {
    TimeDelta::milliseconds((secs * 1000.0).round() as i64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = DetectorConfig::default();
        assert_eq!(cfg.yoga_hold(), TimeDelta::seconds(5));
        assert_eq!(cfg.jump_air_timeout(), TimeDelta::seconds(1));
        assert!(cfg.is_valid());
    }

    #[test]
    fn test_invalid_durations() {
        let cfg = DetectorConfig {
            yoga_hold_secs: 0.0,
            ..DetectorConfig::default()
        };
        assert!(!cfg.is_valid());
    }
}
