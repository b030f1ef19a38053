//! Deterministic simulation module
//!
//! All choreography logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only
//! - Stable iteration order (by actor key)
//! - No rendering, physics or platform dependencies; the host is reached
//!   only through the traits in `collab`

pub mod checkpoint;
pub mod collab;
pub mod driver;
pub mod locomotion;
pub mod mover;
pub mod phase;
pub mod sequencer;
pub mod spawn;
pub mod zone;

pub use checkpoint::CheckpointTracker;
pub use collab::{ActorId, EventId, FireEmitter, FireEvent, PresentationSink, SupportProbe, ZoneId};
pub use driver::FixedStepDriver;
pub use locomotion::{Locomotion, Pose};
pub use mover::{ActorMover, FireStyle, MoverEvent, MoverSettings, Progress};
pub use phase::{ActorDescriptor, ActorKey, Phase, TrailStyle, Waypoint, validate_phases};
pub use sequencer::{PhaseSequencer, SequencerState};
pub use spawn::{ActorHandle, EphemeralActor, SpawnLifecycleManager, TrailState};
pub use zone::ZoneMonitor;
