//! Phase and waypoint data model
//!
//! Phases are authored up front and stay immutable for the duration of a run.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::consts::*;
use crate::error::ConfigError;

/// A movement target plus optional scripted fire
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    /// Target position (None = unassigned, skipped by movers)
    pub target: Option<Vec3>,
    /// Whether approaching this waypoint fires a scripted event
    #[serde(default)]
    pub fires: bool,
    /// Seconds before arrival at which the event fires
    #[serde(default = "default_lead_time")]
    pub lead_time: f32,
    /// Custom event origins (empty = emitter default origin)
    #[serde(default)]
    pub origins: Vec<Vec3>,
}

fn default_lead_time() -> f32 {
    DEFAULT_LEAD_TIME
}

impl Waypoint {
    pub fn at(target: Vec3) -> Self {
        Self {
            target: Some(target),
            fires: false,
            lead_time: DEFAULT_LEAD_TIME,
            origins: Vec::new(),
        }
    }

    /// Waypoint with no target assigned
    pub fn unassigned() -> Self {
        Self {
            target: None,
            fires: false,
            lead_time: DEFAULT_LEAD_TIME,
            origins: Vec::new(),
        }
    }

    /// Mark the waypoint as firing with the given lead time
    pub fn firing(mut self, lead_time: f32) -> Self {
        self.fires = true;
        self.lead_time = lead_time;
        self
    }

    pub fn with_origin(mut self, origin: Vec3) -> Self {
        self.origins.push(origin);
        self
    }
}

/// Trailing visual effect requested by a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailStyle {
    pub width: f32,
    /// RGBA, 0-1
    pub color: [f32; 4],
}

impl Default for TrailStyle {
    fn default() -> Self {
        Self {
            width: 0.2,
            color: [1.0, 0.84, 0.0, 0.7], // gold
        }
    }
}

/// Description of one ephemeral actor taking part in a phase
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActorDescriptor {
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub trail: Option<TrailStyle>,
}

/// Deterministic identity of an ephemeral actor: which phase and which descriptor slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorKey {
    pub phase: usize,
    pub slot: usize,
}

impl std::fmt::Display for ActorKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "actor {}.{}", self.phase, self.slot)
    }
}

/// One scripted unit of choreography
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phase {
    /// Protagonist path traversed before any other movement starts
    #[serde(default)]
    pub lead_waypoints: Vec<Waypoint>,
    /// Protagonist path traversed alongside the ephemeral actors
    #[serde(default)]
    pub protagonist_waypoints: Vec<Waypoint>,
    /// Ephemeral actors spawned for this phase
    #[serde(default)]
    pub actors: Vec<ActorDescriptor>,
    /// Pause after each reached waypoint (seconds)
    #[serde(default = "default_pause")]
    pub pause_duration: f32,
}

fn default_pause() -> f32 {
    DEFAULT_PAUSE_SECS
}

impl Default for Phase {
    fn default() -> Self {
        Self {
            lead_waypoints: Vec::new(),
            protagonist_waypoints: Vec::new(),
            actors: Vec::new(),
            pause_duration: DEFAULT_PAUSE_SECS,
        }
    }
}

impl Phase {
    /// All waypoints of the phase, in lead / protagonist / actor order
    pub fn all_waypoints(&self) -> impl Iterator<Item = &Waypoint> {
        self.lead_waypoints
            .iter()
            .chain(self.protagonist_waypoints.iter())
            .chain(self.actors.iter().flat_map(|a| a.waypoints.iter()))
    }

    /// Check authoring invariants for phase `index`
    pub fn validate(&self, index: usize) -> Result<(), ConfigError> {
        if self.pause_duration < 0.0 {
            return Err(ConfigError::NegativePause { phase: index });
        }
        for (slot, actor) in self.actors.iter().enumerate() {
            if actor.waypoints.is_empty() {
                return Err(ConfigError::ActorWithoutWaypoints {
                    phase: index,
                    actor: slot,
                });
            }
        }
        for (i, wp) in self.all_waypoints().enumerate() {
            if wp.lead_time < 0.0 {
                return Err(ConfigError::NegativeLeadTime {
                    phase: index,
                    waypoint: i,
                });
            }
        }
        Ok(())
    }
}

/// Validate a whole phase list
pub fn validate_phases(phases: &[Phase]) -> Result<(), ConfigError> {
    if phases.is_empty() {
        return Err(ConfigError::EmptyPhases);
    }
    for (i, phase) in phases.iter().enumerate() {
        phase.validate(i)?;
    }
    Ok(())
}
