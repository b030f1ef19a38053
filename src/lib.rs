//! Waypoint Choreo - scripted multi-actor choreography with checkpointed retries
//!
//! Core modules:
//! - `sim`: Deterministic simulation (phase sequencing, movement, spawning, checkpoints)
//! - `config`: Data-driven run configuration and scenario loading
//! - `session`: Pause/resume/scene-transition controller
//! - `report`: Run statistics
//! - `demo`: Seeded demo choreography

pub mod config;
pub mod demo;
pub mod error;
pub mod report;
pub mod session;
pub mod sim;

pub use config::{ChoreoConfig, Scenario, SphereSurface};
pub use error::ConfigError;
pub use report::RunReport;
pub use session::{Session, SessionController};

use glam::{Mat3, Quat, Vec3};

/// Engine configuration constants
pub mod consts {
    /// Fixed simulation timestep (one frame at 60 Hz)
    pub const SIM_DT: f32 = 1.0 / 60.0;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;
    /// Longest frame the driver will accept before clamping
    pub const MAX_FRAME_DT: f32 = 0.1;

    /// Phases per group (shared fallback anchor)
    pub const DEFAULT_GROUP_SIZE: usize = 5;
    /// Phase-level retries before falling back to the group anchor
    pub const DEFAULT_MAX_RETRIES: u32 = 3;

    /// Movement defaults (units per second, units)
    pub const DEFAULT_MOVE_SPEED: f32 = 5.0;
    pub const DEFAULT_REACH_THRESHOLD: f32 = 0.2;
    pub const DEFAULT_PAUSE_SECS: f32 = 0.5;
    pub const DEFAULT_LEAD_TIME: f32 = 0.5;

    /// Emitter default projectile speed
    pub const DEFAULT_PROJECTILE_SPEED: f32 = 15.0;

    /// Wait after spawning ephemeral actors before they start moving
    pub const SPAWN_SETTLE_SECS: f32 = 0.1;
    /// Delay between an unsupported zone entry and the failure it raises
    pub const FALL_DELAY_SECS: f32 = 1.0;
    /// Radius of a waypoint support zone
    pub const DEFAULT_ZONE_RADIUS: f32 = 1.0;

    /// Below this angle (radians) two surface directions are considered equal
    pub const ANGLE_EPSILON: f32 = 1.0e-5;
}

/// Orientation whose +Z axis looks along `forward` with +Y as close to `up` as possible.
///
/// Returns identity when `forward` is degenerate.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let forward = forward.normalize_or_zero();
    if forward == Vec3::ZERO {
        return Quat::IDENTITY;
    }
    let mut right = up.cross(forward);
    if right.length_squared() < 1.0e-8 {
        // up is parallel to forward, pick any perpendicular
        right = forward.any_orthonormal_vector().cross(forward);
    }
    let right = right.normalize();
    let up = forward.cross(right);
    Quat::from_mat3(&Mat3::from_cols(right, up, forward)).normalize()
}

/// A forward direction tangent to a sphere at the given surface normal.
///
/// Uses world up as reference, switching to world forward near the poles.
pub fn surface_tangent(normal: Vec3) -> Vec3 {
    let reference = if normal.dot(Vec3::Y).abs() > 0.99 {
        Vec3::Z
    } else {
        Vec3::Y
    };
    normal.cross(reference).normalize_or_zero()
}

/// Rotate unit vector `from` toward unit vector `to` by fraction `t` along the great circle
#[inline]
pub fn slerp_direction(from: Vec3, to: Vec3, t: f32) -> Vec3 {
    let arc = Quat::from_rotation_arc(from, to);
    (Quat::IDENTITY.slerp(arc, t) * from).normalize_or_zero()
}
