//! Configuration errors
//!
//! These are the only fatal conditions: they are reported once when a run is
//! configured or started. Everything that can go wrong during play is absorbed
//! by the sequencer and turned into a retry, a skip, or a cleanup.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("phase list is empty")]
    EmptyPhases,

    #[error("phase {phase}: actor {actor} has no waypoints")]
    ActorWithoutWaypoints { phase: usize, actor: usize },

    #[error("phase {phase}: waypoint {waypoint} has a negative lead time")]
    NegativeLeadTime { phase: usize, waypoint: usize },

    #[error("phase {phase}: pause duration is negative")]
    NegativePause { phase: usize },

    #[error("group size must be at least 1")]
    InvalidGroupSize,

    #[error("max retries must be at least 1")]
    InvalidMaxRetries,

    #[error("move speed must be positive, got {0}")]
    NonPositiveSpeed(f32),

    #[error("reach threshold must be positive, got {0}")]
    NonPositiveReachThreshold(f32),

    #[error("projectile speed must be positive, got {0}")]
    NonPositiveProjectileSpeed(f32),

    #[error("zone radius must be positive, got {0}")]
    NonPositiveZoneRadius(f32),

    #[error("{field} must be a finite, non-negative duration, got {value}")]
    NegativeDuration { field: &'static str, value: f32 },

    #[error("sphere radius must be positive, got {0}")]
    InvalidSphereRadius(f32),

    #[error("failed to read scenario: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse scenario: {0}")]
    Parse(#[from] serde_json::Error),
}
