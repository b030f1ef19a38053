//! Run configuration and scenario loading
//!
//! A configuration is supplied once when a run starts and never changes
//! mid-sequence. Scenarios bundle it with the authored phases so a whole run
//! can be described in one JSON file.

use std::path::Path;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;
use crate::sim::phase::{Phase, validate_phases};

/// Sphere that sphere locomotion is constrained to
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SphereSurface {
    pub center: Vec3,
    pub radius: f32,
}

/// Sequencer and movement tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChoreoConfig {
    /// Phases per group (group anchor recorded every `group_size` phases)
    pub group_size: usize,
    /// Phase-level retries before the group fallback
    pub max_retries: u32,
    /// Linear movement speed (units/s), shared by all movers
    pub move_speed: f32,
    /// Distance at which a waypoint counts as reached
    pub reach_threshold: f32,
    /// Sphere surface, or None for planar movement
    pub sphere: Option<SphereSurface>,
    /// Fallback speed for fired events
    pub projectile_speed: f32,
    /// Delay after spawning ephemeral actors before they move
    pub spawn_settle_secs: f32,
    /// Delay between an unsupported zone entry and the failure
    pub fall_delay_secs: f32,
    /// Radius of waypoint support zones
    pub zone_radius: f32,
}

impl Default for ChoreoConfig {
    fn default() -> Self {
        Self {
            group_size: DEFAULT_GROUP_SIZE,
            max_retries: DEFAULT_MAX_RETRIES,
            move_speed: DEFAULT_MOVE_SPEED,
            reach_threshold: DEFAULT_REACH_THRESHOLD,
            sphere: None,
            projectile_speed: DEFAULT_PROJECTILE_SPEED,
            spawn_settle_secs: SPAWN_SETTLE_SECS,
            fall_delay_secs: FALL_DELAY_SECS,
            zone_radius: DEFAULT_ZONE_RADIUS,
        }
    }
}

impl ChoreoConfig {
    /// Planar defaults on a sphere of the given center and radius
    pub fn on_sphere(center: Vec3, radius: f32) -> Self {
        Self {
            sphere: Some(SphereSurface { center, radius }),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.group_size == 0 {
            return Err(ConfigError::InvalidGroupSize);
        }
        if self.max_retries == 0 {
            return Err(ConfigError::InvalidMaxRetries);
        }
        if !is_positive(self.move_speed) {
            return Err(ConfigError::NonPositiveSpeed(self.move_speed));
        }
        if !is_positive(self.reach_threshold) {
            return Err(ConfigError::NonPositiveReachThreshold(self.reach_threshold));
        }
        if !is_positive(self.projectile_speed) {
            return Err(ConfigError::NonPositiveProjectileSpeed(self.projectile_speed));
        }
        if !is_positive(self.zone_radius) {
            return Err(ConfigError::NonPositiveZoneRadius(self.zone_radius));
        }
        for (field, value) in [
            ("spawn_settle_secs", self.spawn_settle_secs),
            ("fall_delay_secs", self.fall_delay_secs),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ConfigError::NegativeDuration { field, value });
            }
        }
        if let Some(sphere) = self.sphere {
            if !is_positive(sphere.radius) {
                return Err(ConfigError::InvalidSphereRadius(sphere.radius));
            }
        }
        Ok(())
    }
}

/// Finite and strictly greater than zero (NaN fails)
fn is_positive(value: f32) -> bool {
    value.is_finite() && value > 0.0
}

/// A complete run description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub config: ChoreoConfig,
    pub phases: Vec<Phase>,
    /// Protagonist start position (None = no protagonist in this run)
    #[serde(default)]
    pub protagonist_start: Option<Vec3>,
    /// Default origin for fired events
    #[serde(default)]
    pub emitter_origin: Vec3,
}

impl Scenario {
    /// Parse and validate a scenario from JSON
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let scenario: Scenario = serde_json::from_str(json)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Read, parse and validate a scenario file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        let scenario = Self::from_json(&json)?;
        log::info!(
            "Loaded scenario {} ({} phases)",
            path.as_ref().display(),
            scenario.phases.len()
        );
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.config.validate()?;
        validate_phases(&self.phases)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = ChoreoConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.group_size, 5);
        assert_eq!(config.max_retries, 3);
        assert!(config.sphere.is_none());
    }

    #[test]
    fn test_invalid_values_rejected() {
        let config = ChoreoConfig {
            move_speed: 0.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NonPositiveSpeed(_))));

        let config = ChoreoConfig {
            group_size: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidGroupSize)));

        let config = ChoreoConfig::on_sphere(Vec3::ZERO, -1.0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidSphereRadius(_))
        ));
    }

    #[test]
    fn test_non_finite_and_negative_tuning_rejected() {
        let config = ChoreoConfig {
            projectile_speed: -5.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NonPositiveProjectileSpeed(_))
        ));

        let config = ChoreoConfig {
            zone_radius: -1.0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NonPositiveZoneRadius(_))));

        let config = ChoreoConfig {
            fall_delay_secs: f32::NAN,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeDuration { field: "fall_delay_secs", .. })
        ));

        let config = ChoreoConfig {
            spawn_settle_secs: -3.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::NegativeDuration { field: "spawn_settle_secs", .. })
        ));

        let config = ChoreoConfig {
            move_speed: f32::INFINITY,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::NonPositiveSpeed(_))));

        // Zero delays are allowed
        let config = ChoreoConfig {
            spawn_settle_secs: 0.0,
            fall_delay_secs: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_scenario_from_json() {
        let json = r#"{
            "config": { "move_speed": 4.0, "sphere": { "center": [0, 0, 0], "radius": 10 } },
            "protagonist_start": [10, 0, 0],
            "phases": [
                { "protagonist_waypoints": [ { "target": [0, 10, 0], "fires": true } ] },
                { "actors": [ {
                    "waypoints": [ { "target": [0, 0, 10] } ],
                    "trail": { "width": 0.1, "color": [1, 1, 1, 1] }
                } ] }
            ]
        }"#;
        let scenario = Scenario::from_json(json).unwrap();
        assert_eq!(scenario.phases.len(), 2);
        assert_eq!(scenario.config.move_speed, 4.0);
        // Unspecified fields fall back to defaults
        assert_eq!(scenario.config.group_size, DEFAULT_GROUP_SIZE);
        assert_eq!(scenario.phases[0].pause_duration, DEFAULT_PAUSE_SECS);
        assert!(scenario.phases[1].actors[0].trail.is_some());
        assert_eq!(scenario.protagonist_start, Some(Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn test_scenario_with_no_phases_is_config_error() {
        let err = Scenario::from_json(r#"{ "phases": [] }"#).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyPhases));
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = Scenario::from_json("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
