//! Locomotion strategies
//!
//! Two movement models share one interface:
//! - Planar: straight-line move-toward, facing the direction of travel
//! - Sphere: great-circle stepping on a sphere of fixed center and radius,
//!   facing tangent to the surface with the radial direction as up
//!
//! Orientation convention: +Z is forward, +Y is up.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::SphereSurface;
use crate::consts::ANGLE_EPSILON;
use crate::{look_rotation, slerp_direction, surface_tangent};

/// Position and orientation of an actor
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(Vec3::ZERO)
    }
}

/// Movement model used to advance an actor toward a target
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum Locomotion {
    #[default]
    Planar,
    Sphere(SphereSurface),
}

impl Locomotion {
    pub fn from_surface(sphere: Option<SphereSurface>) -> Self {
        match sphere {
            Some(s) => Locomotion::Sphere(s),
            None => Locomotion::Planar,
        }
    }

    /// Project a target onto the movement surface (identity for planar)
    pub fn snap_target(&self, target: Vec3) -> Vec3 {
        match self {
            Locomotion::Planar => target,
            Locomotion::Sphere(s) => s.project(target),
        }
    }

    /// Settle a pose exactly onto `target` at the end of an approach
    pub fn settle(&self, pose: &mut Pose, target: Vec3) {
        match self {
            Locomotion::Planar => pose.position = target,
            Locomotion::Sphere(s) => {
                pose.position = s.project(target);
                pose.rotation = s.surface_rotation(pose.position);
            }
        }
    }

    /// Advance `pose` toward `target` by at most `step` units of travel
    pub fn advance(&self, pose: &mut Pose, target: Vec3, step: f32) {
        let travel = (target - pose.position).normalize_or_zero();
        match self {
            Locomotion::Planar => {
                pose.position = move_towards(pose.position, target, step);
                if travel != Vec3::ZERO {
                    pose.rotation = look_rotation(travel, Vec3::Y);
                }
            }
            Locomotion::Sphere(s) => {
                pose.position = s.step_toward(pose.position, target, step);
                let radial = (pose.position - s.center).normalize_or_zero();
                // Travel direction projected onto the tangent plane
                let tangent = (travel - radial * travel.dot(radial)).normalize_or_zero();
                pose.rotation = if tangent != Vec3::ZERO {
                    look_rotation(tangent, radial)
                } else {
                    s.surface_rotation(pose.position)
                };
            }
        }
    }
}

impl SphereSurface {
    /// Closest point on the sphere surface
    pub fn project(&self, point: Vec3) -> Vec3 {
        let dir = (point - self.center).normalize_or_zero();
        let dir = if dir == Vec3::ZERO { Vec3::Y } else { dir };
        self.center + dir * self.radius
    }

    /// Orientation standing on the surface at `position`, facing a reference tangent
    pub fn surface_rotation(&self, position: Vec3) -> Quat {
        let normal = (position - self.center).normalize_or_zero();
        look_rotation(surface_tangent(normal), normal)
    }

    /// One great-circle step of `step` linear units from `current` toward `target`.
    ///
    /// The angular step is `step / radius`, clamped so it never overshoots.
    pub fn step_toward(&self, current: Vec3, target: Vec3, step: f32) -> Vec3 {
        let from = (current - self.center).normalize_or_zero();
        let to = (target - self.center).normalize_or_zero();
        if from == Vec3::ZERO || to == Vec3::ZERO {
            return self.project(target);
        }

        let angle = from.angle_between(to);
        if angle < ANGLE_EPSILON {
            return self.center + to * self.radius;
        }

        let t = (step / self.radius / angle).min(1.0);
        self.center + slerp_direction(from, to, t) * self.radius
    }
}

/// Straight-line move toward `target` by at most `max_step`
#[inline]
pub fn move_towards(current: Vec3, target: Vec3, max_step: f32) -> Vec3 {
    let delta = target - current;
    let dist = delta.length();
    if dist <= max_step || dist == 0.0 {
        target
    } else {
        current + delta / dist * max_step
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere() -> SphereSurface {
        SphereSurface {
            center: Vec3::ZERO,
            radius: 10.0,
        }
    }

    #[test]
    fn test_move_towards_does_not_overshoot() {
        let p = move_towards(Vec3::ZERO, Vec3::new(1.0, 0.0, 0.0), 5.0);
        assert_eq!(p, Vec3::new(1.0, 0.0, 0.0));

        let p = move_towards(Vec3::ZERO, Vec3::new(10.0, 0.0, 0.0), 2.5);
        assert!((p.x - 2.5).abs() < 1.0e-6);
    }

    #[test]
    fn test_planar_advance_faces_travel() {
        let mut pose = Pose::default();
        Locomotion::Planar.advance(&mut pose, Vec3::new(0.0, 0.0, -10.0), 1.0);
        assert!((pose.position.z + 1.0).abs() < 1.0e-6);
        let fwd = pose.rotation * Vec3::Z;
        assert!((fwd - Vec3::NEG_Z).length() < 1.0e-5);
    }

    #[test]
    fn test_sphere_step_stays_on_surface() {
        let s = sphere();
        let mut p = Vec3::new(10.0, 0.0, 0.0);
        for _ in 0..10 {
            p = s.step_toward(p, Vec3::new(0.0, 10.0, 0.0), 1.0);
            assert!(((p - s.center).length() - s.radius).abs() < 1.0e-4);
        }
    }

    #[test]
    fn test_sphere_step_is_clamped() {
        let s = sphere();
        let target = Vec3::new(0.0, 10.0, 0.0);
        // Huge step lands exactly on target, never past it
        let p = s.step_toward(Vec3::new(10.0, 0.0, 0.0), target, 1000.0);
        assert!((p - target).length() < 1.0e-4);
    }

    #[test]
    fn test_sphere_angular_step_matches_speed() {
        let s = sphere();
        let p = s.step_toward(Vec3::new(10.0, 0.0, 0.0), Vec3::new(0.0, 10.0, 0.0), 1.0);
        // 1 unit of arc on radius 10 = 0.1 rad
        let angle = Vec3::X.angle_between(p.normalize());
        assert!((angle - 0.1).abs() < 1.0e-4);
    }

    #[test]
    fn test_sphere_facing_is_tangent() {
        let loco = Locomotion::Sphere(sphere());
        let mut pose = Pose::at(Vec3::new(10.0, 0.0, 0.0));
        loco.advance(&mut pose, Vec3::new(0.0, 10.0, 0.0), 1.0);
        let radial = pose.position.normalize();
        let fwd = pose.rotation * Vec3::Z;
        let up = pose.rotation * Vec3::Y;
        assert!(fwd.dot(radial).abs() < 1.0e-3);
        assert!((up - radial).length() < 1.0e-3);
        // Facing roughly toward +Y (direction of travel)
        assert!(fwd.y > 0.9);
    }

    #[test]
    fn test_settle_on_sphere_projects() {
        let loco = Locomotion::Sphere(sphere());
        let mut pose = Pose::default();
        loco.settle(&mut pose, Vec3::new(0.0, 0.0, 3.0));
        assert!((pose.position - Vec3::new(0.0, 0.0, 10.0)).length() < 1.0e-5);
    }
}
