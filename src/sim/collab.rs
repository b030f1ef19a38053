//! External collaborators
//!
//! The core never touches rendering, physics, audio or animation. It talks to
//! the host through these narrow traits, handed to the sequencer at
//! construction time.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::phase::ActorKey;

/// Identifies a fired event so the core can ask for its destruction later
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EventId(pub u64);

/// Who is moving: the protagonist or one ephemeral actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ActorId {
    Protagonist,
    Ephemeral(ActorKey),
}

impl std::fmt::Display for ActorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActorId::Protagonist => write!(f, "protagonist"),
            ActorId::Ephemeral(key) => write!(f, "{}", key),
        }
    }
}

/// A scripted projectile launch
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FireEvent {
    pub origin: Vec3,
    pub target: Vec3,
    pub speed: f32,
    pub destroy_on_impact: bool,
    pub visible: bool,
}

/// Launches scripted events (projectiles) in the host world
pub trait FireEmitter {
    /// Origin used when a waypoint has no custom origins
    fn default_origin(&self) -> Vec3;

    /// Launch one event; None if the host could not create it
    fn fire_event(&mut self, event: FireEvent) -> Option<EventId>;

    /// Remove a previously fired event (no-op if it is already gone)
    fn destroy_event(&mut self, id: EventId);
}

/// Answers whether a waypoint zone currently holds its required supports
pub trait SupportProbe {
    fn are_required_supports_present(&self, zone: ZoneId) -> bool;
}

/// Cosmetic signals (animation, camera, audio). Fire-and-forget.
pub trait PresentationSink {
    fn actor_started_moving(&mut self, _actor: ActorId) {}
    fn actor_stopped_moving(&mut self, _actor: ActorId) {}
    fn phase_completed(&mut self, _phase_index: usize) {}
    /// Protagonist is about to be rewound (fall/respawn cue)
    fn protagonist_failed(&mut self, _phase_index: usize) {}
}

/// Identity of a waypoint zone: phase, then position in the phase's waypoint order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ZoneId {
    pub phase: usize,
    pub waypoint: usize,
}
