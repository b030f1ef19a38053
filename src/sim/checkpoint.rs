//! Rewind anchors and retry accounting

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Phase-start and group-start anchors plus the bounded retry counter.
///
/// The retry count stays in `[0, max_retries]`. It returns to zero when a group
/// boundary is recorded, or when a failure falls back to the group anchor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckpointTracker {
    phase_anchor: Vec3,
    group_anchor: Vec3,
    retries: u32,
    max_retries: u32,
}

impl CheckpointTracker {
    pub fn new(origin: Vec3, max_retries: u32) -> Self {
        Self {
            phase_anchor: origin,
            group_anchor: origin,
            retries: 0,
            max_retries,
        }
    }

    /// Overwrite the phase anchor (once per phase, before any movement)
    pub fn record_phase_start(&mut self, position: Vec3) {
        self.phase_anchor = position;
    }

    /// Overwrite the group anchor when `phase_index` opens a group.
    ///
    /// Returns true if the anchor was recorded.
    pub fn record_group_start_if_boundary(
        &mut self,
        phase_index: usize,
        position: Vec3,
        group_size: usize,
    ) -> bool {
        if group_size == 0 || phase_index % group_size != 0 {
            return false;
        }
        self.group_anchor = position;
        self.retries = 0;
        true
    }

    /// Account for one failure and pick the rewind anchor.
    ///
    /// Returns `(phase_anchor, false)` while retries remain, otherwise resets the
    /// count and returns `(group_anchor, true)`.
    pub fn register_failure(&mut self) -> (Vec3, bool) {
        if self.retries < self.max_retries {
            self.retries += 1;
            (self.phase_anchor, false)
        } else {
            self.retries = 0;
            (self.group_anchor, true)
        }
    }

    pub fn reset_retries(&mut self) {
        self.retries = 0;
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn phase_anchor(&self) -> Vec3 {
        self.phase_anchor
    }

    pub fn group_anchor(&self) -> Vec3 {
        self.group_anchor
    }
}
