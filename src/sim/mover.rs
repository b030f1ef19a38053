//! Waypoint traversal for a single actor
//!
//! An `ActorMover` is a cooperative task: the sequencer calls `step` once per
//! simulation tick with the actor's pose, and the mover suspends after every
//! movement increment and while pausing at a reached waypoint.

use glam::Vec3;

use super::collab::{ActorId, FireEvent};
use super::locomotion::{Locomotion, Pose};
use super::phase::Waypoint;

/// Result of one cooperative step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    InProgress,
    Done,
}

/// How events fired by a mover are flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireStyle {
    /// Lead path: visible, persists, default speed
    Lead,
    /// Ephemeral actors: visible, persists through impact, removed at phase end
    Ensemble,
    /// Protagonist: invisible, removed on impact, arrival-matched speed
    Protagonist,
}

impl FireStyle {
    /// Build the event for one origin of a volley.
    ///
    /// Arrival-matched styles pick the speed that lands the event on `target`
    /// together with the mover; with no time left the default speed is used.
    pub fn event(
        &self,
        origin: Vec3,
        target: Vec3,
        time_to_arrival: f32,
        default_speed: f32,
    ) -> FireEvent {
        let speed = match self {
            FireStyle::Lead => default_speed,
            FireStyle::Ensemble | FireStyle::Protagonist => {
                if time_to_arrival > 0.0 {
                    origin.distance(target) / time_to_arrival
                } else {
                    default_speed
                }
            }
        };
        FireEvent {
            origin,
            target,
            speed,
            destroy_on_impact: matches!(self, FireStyle::Protagonist),
            visible: !matches!(self, FireStyle::Protagonist),
        }
    }

    /// Whether events of this style are destroyed when the phase ends
    pub fn phase_scoped(&self) -> bool {
        matches!(self, FireStyle::Ensemble)
    }
}

/// A request to fire, resolved into events by the sequencer
#[derive(Debug, Clone, PartialEq)]
pub struct FireRequest {
    pub actor: ActorId,
    pub waypoint: usize,
    pub target: Vec3,
    /// Custom origins (empty = emitter default)
    pub origins: Vec<Vec3>,
    pub time_to_arrival: f32,
    pub style: FireStyle,
}

/// Side effects of a step, drained by the sequencer
#[derive(Debug, Clone, PartialEq)]
pub enum MoverEvent {
    Started(ActorId),
    Stopped(ActorId),
    Reached { actor: ActorId, waypoint: usize },
    Fire(FireRequest),
}

/// Shared movement tuning for a mover
#[derive(Debug, Clone, Copy)]
pub struct MoverSettings {
    pub speed: f32,
    pub reach_threshold: f32,
    pub pause_duration: f32,
    pub locomotion: Locomotion,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Stage {
    Approach { fired: bool },
    Pause { remaining: f32 },
    Done,
}

/// Moves one actor through an ordered waypoint list
#[derive(Debug, Clone)]
pub struct ActorMover {
    actor: ActorId,
    waypoints: Vec<Waypoint>,
    cursor: usize,
    stage: Stage,
    settings: MoverSettings,
    style: FireStyle,
    announced: bool,
}

impl ActorMover {
    pub fn new(
        actor: ActorId,
        waypoints: Vec<Waypoint>,
        settings: MoverSettings,
        style: FireStyle,
    ) -> Self {
        Self {
            actor,
            waypoints,
            cursor: 0,
            stage: Stage::Approach { fired: false },
            settings,
            style,
            announced: false,
        }
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }

    /// True between the first movement and completion
    pub fn is_moving(&self) -> bool {
        self.announced && !self.is_done()
    }

    /// Stop at the next suspension point, leaving the actor where it is
    pub fn cancel(&mut self) {
        self.stage = Stage::Done;
    }

    /// Advance by one tick
    pub fn step(&mut self, pose: &mut Pose, dt: f32, out: &mut Vec<MoverEvent>) -> Progress {
        loop {
            match self.stage {
                Stage::Done => return Progress::Done,
                Stage::Pause { remaining } => {
                    let left = remaining - dt;
                    if remaining > 0.0 && left > 0.0 {
                        self.stage = Stage::Pause { remaining: left };
                        return Progress::InProgress;
                    }
                    self.cursor += 1;
                    self.stage = Stage::Approach { fired: false };
                }
                Stage::Approach { fired } => {
                    let Some(wp) = self.waypoints.get(self.cursor) else {
                        self.finish(out);
                        return Progress::Done;
                    };
                    let Some(raw_target) = wp.target else {
                        log::debug!(
                            "{}: waypoint {} has no target, skipping",
                            self.actor,
                            self.cursor
                        );
                        self.cursor += 1;
                        continue;
                    };
                    let target = self.settings.locomotion.snap_target(raw_target);

                    if !self.announced {
                        self.announced = true;
                        out.push(MoverEvent::Started(self.actor));
                    }

                    if pose.position.distance(target) > self.settings.reach_threshold {
                        self.settings
                            .locomotion
                            .advance(pose, target, self.settings.speed * dt);
                        if wp.fires && !fired {
                            let remaining = pose.position.distance(target);
                            if remaining <= self.settings.speed * wp.lead_time {
                                out.push(self.fire_request(wp, target, remaining));
                                self.stage = Stage::Approach { fired: true };
                            }
                        }
                        return Progress::InProgress;
                    }

                    self.settings.locomotion.settle(pose, target);
                    if wp.fires && !fired {
                        // Lead distance never crossed while approaching
                        out.push(self.fire_request(wp, target, 0.0));
                    }
                    out.push(MoverEvent::Reached {
                        actor: self.actor,
                        waypoint: self.cursor,
                    });
                    self.stage = Stage::Pause {
                        remaining: self.settings.pause_duration,
                    };
                    return Progress::InProgress;
                }
            }
        }
    }

    fn fire_request(&self, wp: &Waypoint, target: Vec3, remaining: f32) -> MoverEvent {
        log::debug!(
            "{}: firing at waypoint {} ({:.2} from target)",
            self.actor,
            self.cursor,
            remaining
        );
        MoverEvent::Fire(FireRequest {
            actor: self.actor,
            waypoint: self.cursor,
            target,
            origins: wp.origins.clone(),
            time_to_arrival: remaining / self.settings.speed,
            style: self.style,
        })
    }

    fn finish(&mut self, out: &mut Vec<MoverEvent>) {
        if self.announced {
            out.push(MoverEvent::Stopped(self.actor));
        }
        self.stage = Stage::Done;
    }
}
