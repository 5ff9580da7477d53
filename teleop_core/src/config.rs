//! Teleop tuning constants.
//!
//! The defaults are the values the controller ships with.  Tests and
//! embedders build variants with struct update syntax and check them with
//! [`TeleopConfig::validate`] before use.

use std::time::Duration;

use thiserror::Error;

use crate::motion::Posture;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

// ════════════════════════════════════════════════════════════════════════════
// TeleopConfig
// ════════════════════════════════════════════════════════════════════════════

#[derive(Clone, Debug, PartialEq)]
pub struct TeleopConfig {
    /// Linear speed per gear (m/s), strictly increasing.
    pub speed_levels:        Vec<f32>,
    pub default_speed_gear:  usize,
    /// Body height per gear (m), strictly increasing.
    pub height_levels:       Vec<f32>,
    pub default_height_gear: usize,
    /// Yaw rate contributed by a held turn key (rad/s).
    pub max_turn_rate:       f32,
    /// Minimum per-axis change before a new velocity is sent.
    pub command_epsilon:     f32,
    pub tick_period_ms:      u64,
    pub refresh_period_ms:   u64,
    /// Pause after entering the session before the first tick.
    pub settle_ms:           u64,
    pub default_posture:     Posture,
}

impl Default for TeleopConfig {
    fn default() -> Self {
        TeleopConfig {
            speed_levels:        vec![0.2, 0.5, 0.8, 1.2, 1.5, 2.0],
            default_speed_gear:  2,
            height_levels:       vec![0.15, 0.20, 0.25, 0.30, 0.35],
            default_height_gear: 2,
            max_turn_rate:       1.0,
            command_epsilon:     0.01,
            tick_period_ms:      50,
            refresh_period_ms:   200,
            settle_ms:           1000,
            default_posture:     Posture::default(),
        }
    }
}

impl TeleopConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_levels("speed_levels", &self.speed_levels)?;
        check_levels("height_levels", &self.height_levels)?;
        if self.default_speed_gear >= self.speed_levels.len() {
            return Err(ConfigError::Invalid(format!(
                "default_speed_gear {} out of range 0..{}",
                self.default_speed_gear, self.speed_levels.len()
            )));
        }
        if self.default_height_gear >= self.height_levels.len() {
            return Err(ConfigError::Invalid(format!(
                "default_height_gear {} out of range 0..{}",
                self.default_height_gear, self.height_levels.len()
            )));
        }
        if self.command_epsilon.is_nan() || self.command_epsilon < 0.0 {
            return Err(ConfigError::Invalid("command_epsilon must be >= 0".into()));
        }
        if !self.max_turn_rate.is_finite() {
            return Err(ConfigError::Invalid("max_turn_rate must be finite".into()));
        }
        if self.tick_period_ms == 0 || self.refresh_period_ms == 0 {
            return Err(ConfigError::Invalid("tick and refresh periods must be > 0".into()));
        }
        Ok(())
    }

    /// Speed magnitude for a gear, clamped to the last gear.
    pub fn speed_for(&self, gear: usize) -> f32 {
        level_at(&self.speed_levels, gear)
    }

    /// Body height for a gear, clamped to the last gear.
    pub fn height_for(&self, gear: usize) -> f32 {
        level_at(&self.height_levels, gear)
    }

    pub fn tick_period(&self) -> Duration { Duration::from_millis(self.tick_period_ms) }
    pub fn refresh_period(&self) -> Duration { Duration::from_millis(self.refresh_period_ms) }
    pub fn settle(&self) -> Duration { Duration::from_millis(self.settle_ms) }
}

fn level_at(levels: &[f32], gear: usize) -> f32 {
    match levels.len() {
        0 => 0.0,
        n => levels[gear.min(n - 1)],
    }
}

fn check_levels(name: &str, levels: &[f32]) -> Result<(), ConfigError> {
    if levels.is_empty() {
        return Err(ConfigError::Invalid(format!("{} must not be empty", name)));
    }
    if levels.iter().any(|v| !v.is_finite()) {
        return Err(ConfigError::Invalid(format!("{} must be finite", name)));
    }
    if levels.windows(2).any(|w| w[1] <= w[0]) {
        return Err(ConfigError::Invalid(format!("{} must be strictly increasing", name)));
    }
    Ok(())
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = TeleopConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.speed_for(2), 0.8);
        assert_eq!(cfg.height_for(2), 0.25);
        assert_eq!(cfg.tick_period(), Duration::from_millis(50));
        assert_eq!(cfg.refresh_period(), Duration::from_millis(200));
    }

    #[test]
    fn gear_lookup_clamps() {
        let cfg = TeleopConfig::default();
        assert_eq!(cfg.speed_for(99), 2.0);
        assert_eq!(cfg.height_for(99), 0.35);
    }

    fn with(f: impl FnOnce(&mut TeleopConfig)) -> TeleopConfig {
        let mut cfg = TeleopConfig::default();
        f(&mut cfg);
        cfg
    }

    #[test]
    fn rejects_empty_levels() {
        let err = with(|c| c.speed_levels.clear()).validate().unwrap_err();
        assert!(err.to_string().contains("speed_levels must not be empty"), "{}", err);
    }

    #[test]
    fn rejects_unsorted_levels() {
        let err = with(|c| c.height_levels = vec![0.3, 0.2]).validate().unwrap_err();
        assert!(err.to_string().contains("strictly increasing"), "{}", err);
    }

    #[test]
    fn rejects_default_gear_out_of_range() {
        let err = with(|c| {
            c.height_levels = vec![0.2, 0.3];
            c.default_height_gear = 2;
        })
        .validate()
        .unwrap_err();
        assert!(err.to_string().contains("default_height_gear"));
    }

    #[test]
    fn rejects_zero_tick_and_negative_epsilon() {
        assert!(with(|c| c.tick_period_ms = 0).validate().is_err());
        assert!(with(|c| c.refresh_period_ms = 0).validate().is_err());
        assert!(with(|c| c.command_epsilon = -0.1).validate().is_err());
        assert!(with(|c| c.command_epsilon = f32::NAN).validate().is_err());
        assert!(with(|c| c.command_epsilon = 0.0).validate().is_ok());
    }

    #[test]
    fn rejects_non_finite_values() {
        assert!(with(|c| c.max_turn_rate = f32::INFINITY).validate().is_err());
        assert!(with(|c| c.speed_levels[5] = f32::NAN).validate().is_err());
    }
}
