//! Waypoint support zones
//!
//! Every targeted waypoint of the running phase is a spherical zone. Standing
//! in a zone requires supports (placed by the player); the first time the
//! protagonist is found in a zone without them the zone latches and, after
//! the fall delay, reports a failure. Leaving the zone clears the latch.

use glam::Vec3;

use super::collab::{SupportProbe, ZoneId};
use super::locomotion::Locomotion;
use super::phase::Phase;

#[derive(Debug, Clone)]
struct Zone {
    id: ZoneId,
    center: Vec3,
    occupied: bool,
    latched: bool,
}

#[derive(Debug, Clone)]
pub struct ZoneMonitor {
    zones: Vec<Zone>,
    radius: f32,
    fall_delay: f32,
    /// Zone and seconds left before its pending failure fires
    pending: Option<(ZoneId, f32)>,
}

impl ZoneMonitor {
    pub fn new(radius: f32, fall_delay: f32) -> Self {
        Self {
            zones: Vec::new(),
            radius,
            fall_delay,
            pending: None,
        }
    }

    /// Replace the zone set with the waypoints of `phase`
    pub fn arm(&mut self, phase_index: usize, phase: &Phase, locomotion: &Locomotion) {
        self.zones = phase
            .all_waypoints()
            .enumerate()
            .filter_map(|(i, wp)| {
                wp.target.map(|t| Zone {
                    id: ZoneId {
                        phase: phase_index,
                        waypoint: i,
                    },
                    center: locomotion.snap_target(t),
                    occupied: false,
                    latched: false,
                })
            })
            .collect();
        self.pending = None;
    }

    pub fn clear(&mut self) {
        self.zones.clear();
        self.pending = None;
    }

    pub fn zone_count(&self) -> usize {
        self.zones.len()
    }

    /// True while a fall is counting down
    pub fn is_falling(&self) -> bool {
        self.pending.is_some()
    }

    /// Track the protagonist for one tick.
    ///
    /// Returns the zone whose fall delay elapsed, if any.
    pub fn update(
        &mut self,
        protagonist: Vec3,
        probe: &dyn SupportProbe,
        dt: f32,
    ) -> Option<ZoneId> {
        for zone in &mut self.zones {
            let inside = protagonist.distance(zone.center) <= self.radius;
            if inside != zone.occupied {
                zone.occupied = inside;
                zone.latched = false;
            }
            if !zone.occupied || zone.latched {
                continue;
            }
            if !probe.are_required_supports_present(zone.id) {
                zone.latched = true;
                log::info!(
                    "Protagonist in zone {}.{} without supports, falling",
                    zone.id.phase,
                    zone.id.waypoint
                );
                if self.pending.is_none() {
                    self.pending = Some((zone.id, self.fall_delay));
                }
            }
        }

        let (id, left) = self.pending?;
        let left = left - dt;
        if left <= 0.0 {
            self.pending = None;
            Some(id)
        } else {
            self.pending = Some((id, left));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::phase::Waypoint;
    use std::cell::Cell;

    struct Probe(Cell<bool>);

    impl SupportProbe for Probe {
        fn are_required_supports_present(&self, _zone: ZoneId) -> bool {
            self.0.get()
        }
    }

    fn phase() -> Phase {
        Phase {
            protagonist_waypoints: vec![
                Waypoint::at(Vec3::new(5.0, 0.0, 0.0)),
                Waypoint::unassigned(),
                Waypoint::at(Vec3::new(-5.0, 0.0, 0.0)),
            ],
            ..Default::default()
        }
    }

    #[test]
    fn test_arm_skips_unassigned_waypoints() {
        let mut zones = ZoneMonitor::new(1.0, 1.0);
        zones.arm(0, &phase(), &Locomotion::Planar);
        assert_eq!(zones.zone_count(), 2);
    }

    #[test]
    fn test_unsupported_zone_fails_after_delay() {
        let mut zones = ZoneMonitor::new(1.0, 0.5);
        zones.arm(2, &phase(), &Locomotion::Planar);
        let probe = Probe(Cell::new(false));

        let inside = Vec3::new(5.2, 0.0, 0.0);
        assert!(zones.update(inside, &probe, SIM_DT).is_none());
        assert!(zones.is_falling());
        let mut ticks = 1;
        let failed = loop {
            ticks += 1;
            if let Some(id) = zones.update(inside, &probe, SIM_DT) {
                break id;
            }
            assert!(ticks < 100);
        };
        assert_eq!(failed, ZoneId { phase: 2, waypoint: 0 });
        assert!((29..=31).contains(&ticks));
        assert!(!zones.is_falling());

        // Latched: staying inside does not fail again
        for _ in 0..100 {
            assert!(zones.update(inside, &probe, SIM_DT).is_none());
        }
    }

    #[test]
    fn test_supported_zone_never_fails() {
        let mut zones = ZoneMonitor::new(1.0, 0.0);
        zones.arm(0, &phase(), &Locomotion::Planar);
        let probe = Probe(Cell::new(true));
        for _ in 0..10 {
            assert!(zones.update(Vec3::new(5.0, 0.0, 0.0), &probe, SIM_DT).is_none());
        }
        // Supports removed while standing in the zone
        probe.0.set(false);
        assert!(zones.update(Vec3::new(5.0, 0.0, 0.0), &probe, SIM_DT).is_some());
    }

    #[test]
    fn test_reentry_clears_latch() {
        let mut zones = ZoneMonitor::new(1.0, 0.0);
        zones.arm(0, &phase(), &Locomotion::Planar);
        let probe = Probe(Cell::new(false));
        let inside = Vec3::new(5.0, 0.0, 0.0);
        assert!(zones.update(inside, &probe, SIM_DT).is_some());
        assert!(zones.update(inside, &probe, SIM_DT).is_none());
        assert!(zones.update(Vec3::ZERO, &probe, SIM_DT).is_none());
        assert!(zones.update(inside, &probe, SIM_DT).is_some());
    }
}
