use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Tunable constants of the rep tracker.
///
/// Velocities are in m/s, durations in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Below this magnitude a sample is not "moving".
    #[serde(default = "default_movement_threshold")]
    pub movement_threshold: f64,
    /// Below this magnitude a sample is "at rest" by magnitude alone.
    #[serde(default = "default_rest_threshold")]
    pub rest_threshold: f64,
    /// A phase must last this long before a direction reversal is honored.
    #[serde(default = "default_min_phase_ms")]
    pub min_phase_ms: u64,
    /// Continuous rest after which an active set is declared finished.
    #[serde(default = "default_set_timeout_ms")]
    pub set_timeout_ms: u64,
    /// Minimum gap between two counted reps.
    #[serde(default = "default_min_rep_interval_ms")]
    pub min_rep_interval_ms: u64,
    /// Number of raw samples in the stillness window.
    #[serde(default = "default_stationary_window")]
    pub stationary_window: usize,
    /// Window standard deviation below which the sensor is stationary.
    #[serde(default = "default_stationary_std_dev")]
    pub stationary_std_dev: f64,
}

fn default_movement_threshold() -> f64 {
    0.10
}
fn default_rest_threshold() -> f64 {
    0.05
}
fn default_min_phase_ms() -> u64 {
    150
}
fn default_set_timeout_ms() -> u64 {
    5_000
}
fn default_min_rep_interval_ms() -> u64 {
    500
}
fn default_stationary_window() -> usize {
    50
}
fn default_stationary_std_dev() -> f64 {
    0.02
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            movement_threshold: default_movement_threshold(),
            rest_threshold: default_rest_threshold(),
            min_phase_ms: default_min_phase_ms(),
            set_timeout_ms: default_set_timeout_ms(),
            min_rep_interval_ms: default_min_rep_interval_ms(),
            stationary_window: default_stationary_window(),
            stationary_std_dev: default_stationary_std_dev(),
        }
    }
}

impl TrackerConfig {
    /// Reject values that would make the state machine meaningless.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending `tracker.*` key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("tracker.movement_threshold", self.movement_threshold)?;
        positive("tracker.rest_threshold", self.rest_threshold)?;
        positive("tracker.stationary_std_dev", self.stationary_std_dev)?;
        if self.rest_threshold > self.movement_threshold {
            return Err(ConfigError::InvalidValue {
                key: "tracker.rest_threshold".into(),
                message: format!(
                    "must not exceed movement_threshold ({})",
                    self.movement_threshold
                ),
            });
        }
        if self.stationary_window < 2 {
            return Err(ConfigError::InvalidValue {
                key: "tracker.stationary_window".into(),
                message: "needs at least 2 samples to compute a spread".into(),
            });
        }
        Ok(())
    }
}

pub(crate) fn positive(key: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue {
            key: key.into(),
            message: format!("must be a positive number, got {value}"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(TrackerConfig::default().validate().is_ok());
    }

    #[test]
    fn rest_above_movement_is_rejected() {
        let cfg = TrackerConfig {
            rest_threshold: 0.2,
            ..TrackerConfig::default()
        };
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("tracker.rest_threshold"));
    }

    #[test]
    fn tiny_window_is_rejected() {
        let cfg = TrackerConfig {
            stationary_window: 1,
            ..TrackerConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let cfg: TrackerConfig = toml::from_str("min_phase_ms = 200").unwrap();
        assert_eq!(cfg.min_phase_ms, 200);
        assert_eq!(cfg.stationary_window, 50);
        assert_eq!(cfg.movement_threshold, 0.10);
    }
}
