//! Seeded demo choreography
//!
//! Produces a reproducible set of phases for the runner when no scenario file
//! is given. The same seed always yields the same phases.

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use crate::config::ChoreoConfig;
use crate::sim::phase::{ActorDescriptor, Phase, TrailStyle, Waypoint};

/// Planar demo points stay within this distance of the origin
const PLANAR_EXTENT: f32 = 8.0;
const MAX_ACTORS: usize = 3;
const MAX_ACTOR_WAYPOINTS: usize = 3;

pub fn generate_phases(seed: u64, count: usize, config: &ChoreoConfig) -> Vec<Phase> {
    let mut rng = Pcg32::seed_from_u64(seed);
    log::info!("Generating {} demo phases (seed {})", count, seed);

    (0..count)
        .map(|i| {
            // First phase of each group opens with a short lead walk
            let lead_waypoints = if i % config.group_size.max(1) == 0 {
                vec![Waypoint::at(random_point(&mut rng, config))]
            } else {
                Vec::new()
            };

            let protagonist_waypoints = vec![
                Waypoint::at(random_point(&mut rng, config)).firing(random_lead_time(&mut rng)),
            ];

            let actor_count = rng.random_range(0..=MAX_ACTORS);
            let actors = (0..actor_count)
                .map(|_| random_actor(&mut rng, config))
                .collect();

            Phase {
                lead_waypoints,
                protagonist_waypoints,
                actors,
                pause_duration: rng.random_range(0.1..0.6),
            }
        })
        .collect()
}

fn random_lead_time(rng: &mut Pcg32) -> f32 {
    rng.random_range(0.2..0.8)
}

fn random_actor(rng: &mut Pcg32, config: &ChoreoConfig) -> ActorDescriptor {
    let waypoint_count = rng.random_range(1..=MAX_ACTOR_WAYPOINTS);
    let waypoints = (0..waypoint_count)
        .map(|_| {
            let wp = Waypoint::at(random_point(rng, config));
            if rng.random_bool(0.5) {
                wp.firing(random_lead_time(rng))
            } else {
                wp
            }
        })
        .collect();
    let trail = rng.random_bool(0.5).then(|| TrailStyle {
        width: rng.random_range(0.05..0.2),
        color: [rng.random(), rng.random(), rng.random(), 1.0],
    });
    ActorDescriptor { waypoints, trail }
}

/// Random point on the configured surface
fn random_point(rng: &mut Pcg32, config: &ChoreoConfig) -> Vec3 {
    match config.sphere {
        Some(sphere) => {
            let dir = loop {
                let v = Vec3::new(
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                    rng.random_range(-1.0..1.0),
                );
                let len = v.length();
                if len > 0.1 && len <= 1.0 {
                    break v / len;
                }
            };
            sphere.center + dir * sphere.radius
        }
        None => Vec3::new(
            rng.random_range(-PLANAR_EXTENT..PLANAR_EXTENT),
            0.0,
            rng.random_range(-PLANAR_EXTENT..PLANAR_EXTENT),
        ),
    }
}
