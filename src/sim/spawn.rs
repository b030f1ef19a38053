//! Ephemeral actor lifecycle
//!
//! Actors live in generational slots: a handle names a slot index plus the
//! generation it was issued for. Destroying an actor bumps the slot's
//! generation, so stale handles never alias a later actor.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::locomotion::{Locomotion, Pose};
use super::phase::{ActorDescriptor, ActorKey, TrailStyle};

/// Maximum number of trail points to store
pub const TRAIL_LENGTH: usize = 32;

/// Handle to a spawned ephemeral actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorHandle {
    index: u32,
    generation: u32,
}

/// Trailing visual effect attached to an actor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrailState {
    pub style: TrailStyle,
    pub emitting: bool,
    /// Recent positions while emitting (newest first)
    pub points: Vec<Vec3>,
}

impl TrailState {
    pub fn new(style: TrailStyle) -> Self {
        Self {
            style,
            emitting: false,
            points: Vec::with_capacity(TRAIL_LENGTH),
        }
    }

    /// Record a position if the trail is emitting
    pub fn record(&mut self, pos: Vec3) {
        if !self.emitting {
            return;
        }
        self.points.insert(0, pos);
        if self.points.len() > TRAIL_LENGTH {
            self.points.pop();
        }
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }
}

/// A transient, phase-scoped actor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemeralActor {
    pub key: ActorKey,
    pub pose: Pose,
    pub moving: bool,
    pub trail: Option<TrailState>,
}

#[derive(Debug, Clone, Default)]
struct Slot {
    generation: u32,
    actor: Option<EphemeralActor>,
}

/// Creates and tears down ephemeral actors with deterministic identity
#[derive(Debug, Clone, Default)]
pub struct SpawnLifecycleManager {
    slots: Vec<Slot>,
    /// Free slot indices, reused lowest-first
    free: Vec<u32>,
    /// Live actors of the current phase, by identity
    live: BTreeMap<ActorKey, ActorHandle>,
    locomotion: Locomotion,
}

impl SpawnLifecycleManager {
    pub fn new(locomotion: Locomotion) -> Self {
        Self {
            locomotion,
            ..Default::default()
        }
    }

    /// Spawn one actor per descriptor at `origin`.
    ///
    /// Keys are `(phase_index, descriptor slot)`, so re-spawning the same phase
    /// after a retry produces the same logical actors.
    pub fn spawn_for_phase(
        &mut self,
        phase_index: usize,
        descriptors: &[ActorDescriptor],
        origin: Vec3,
    ) -> BTreeMap<ActorKey, ActorHandle> {
        let position = self.locomotion.snap_target(origin);
        let mut spawned = BTreeMap::new();

        for (slot, descriptor) in descriptors.iter().enumerate() {
            let key = ActorKey {
                phase: phase_index,
                slot,
            };
            let mut pose = Pose::at(position);
            if let Locomotion::Sphere(s) = self.locomotion {
                pose.rotation = s.surface_rotation(position);
            }
            let actor = EphemeralActor {
                key,
                pose,
                moving: false,
                trail: descriptor.trail.map(TrailState::new),
            };
            let handle = self.insert(actor);
            log::debug!("Spawned {} at {:?}", key, position);
            self.live.insert(key, handle);
            spawned.insert(key, handle);
        }

        spawned
    }

    fn insert(&mut self, actor: EphemeralActor) -> ActorHandle {
        self.free.sort_unstable_by(|a, b| b.cmp(a));
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.actor = Some(actor);
            ActorHandle {
                index,
                generation: slot.generation,
            }
        } else {
            let index = self.slots.len() as u32;
            self.slots.push(Slot {
                generation: 0,
                actor: Some(actor),
            });
            ActorHandle {
                index,
                generation: 0,
            }
        }
    }

    /// Current live handle for an actor identity
    pub fn lookup(&self, key: ActorKey) -> Option<ActorHandle> {
        self.live.get(&key).copied().filter(|h| self.is_alive(*h))
    }

    pub fn is_alive(&self, handle: ActorHandle) -> bool {
        self.slot(handle).is_some()
    }

    fn slot(&self, handle: ActorHandle) -> Option<&EphemeralActor> {
        self.slots
            .get(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.actor.as_ref())
    }

    pub fn get(&self, handle: ActorHandle) -> Option<&EphemeralActor> {
        self.slot(handle)
    }

    pub fn get_mut(&mut self, handle: ActorHandle) -> Option<&mut EphemeralActor> {
        self.slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
            .and_then(|s| s.actor.as_mut())
    }

    pub fn pose_mut(&mut self, handle: ActorHandle) -> Option<&mut Pose> {
        self.get_mut(handle).map(|a| &mut a.pose)
    }

    /// Flag an actor as moving or idle, toggling its trail to match
    pub fn set_moving(&mut self, handle: ActorHandle, moving: bool) {
        if let Some(actor) = self.get_mut(handle) {
            actor.moving = moving;
            if let Some(trail) = actor.trail.as_mut() {
                if moving {
                    trail.clear();
                }
                trail.emitting = moving;
            }
        }
    }

    /// Record trail points for every emitting actor
    pub fn record_trails(&mut self) {
        for actor in self.slots.iter_mut().filter_map(|s| s.actor.as_mut()) {
            let pos = actor.pose.position;
            if let Some(trail) = actor.trail.as_mut() {
                trail.record(pos);
            }
        }
    }

    /// Destroy every live handle in `handles`; stale handles are skipped.
    ///
    /// Returns the number of actors destroyed.
    pub fn destroy_all(&mut self, handles: &[ActorHandle]) -> usize {
        let mut destroyed = 0;
        for &handle in handles {
            if self.release(handle) {
                destroyed += 1;
            }
        }
        self.live.retain(|_, h| handles.iter().all(|d| d != h));
        if destroyed > 0 {
            log::debug!("Destroyed {} ephemeral actors", destroyed);
        }
        destroyed
    }

    /// External destruction (e.g. another system removed the actor mid-phase)
    pub fn despawn(&mut self, handle: ActorHandle) -> bool {
        self.release(handle)
    }

    fn release(&mut self, handle: ActorHandle) -> bool {
        let Some(slot) = self
            .slots
            .get_mut(handle.index as usize)
            .filter(|s| s.generation == handle.generation)
        else {
            return false;
        };
        let Some(mut actor) = slot.actor.take() else {
            return false;
        };
        // Stop movement, then drop the trail, then the actor itself
        actor.moving = false;
        actor.trail = None;
        drop(actor);
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(handle.index);
        true
    }

    /// Drop tracking entries whose actors no longer exist.
    ///
    /// Returns how many stale entries were purged.
    pub fn purge_stale(&mut self) -> usize {
        let before = self.live.len();
        let slots = &self.slots;
        self.live.retain(|_, h| {
            slots
                .get(h.index as usize)
                .is_some_and(|s| s.generation == h.generation && s.actor.is_some())
        });
        let purged = before - self.live.len();
        if purged > 0 {
            log::debug!("Purged {} stale actor references", purged);
        }
        purged
    }

    /// Handles of the actors tracked for the current phase
    pub fn live_handles(&self) -> Vec<ActorHandle> {
        self.live.values().copied().collect()
    }

    /// Number of live actors
    pub fn live_count(&self) -> usize {
        self.slots.iter().filter(|s| s.actor.is_some()).count()
    }
}
