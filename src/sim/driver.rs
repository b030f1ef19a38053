//! Fixed-timestep driver
//!
//! Converts variable frame times into whole `SIM_DT` ticks of the sequencer.
//! Frame time is clamped so a long stall cannot trigger a burst of catch-up
//! ticks, and at most `MAX_SUBSTEPS` ticks run per frame.

use crate::consts::{MAX_FRAME_DT, MAX_SUBSTEPS, SIM_DT};
use crate::session::SessionController;

use super::sequencer::PhaseSequencer;

pub struct FixedStepDriver<S: SessionController> {
    session: S,
    accumulator: f32,
    ticks: u64,
}

impl<S: SessionController> FixedStepDriver<S> {
    pub fn new(session: S) -> Self {
        Self {
            session,
            accumulator: 0.0,
            ticks: 0,
        }
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut S {
        &mut self.session
    }

    /// Total ticks run by this driver
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Run the ticks owed for one frame. Returns how many ran.
    pub fn advance(&mut self, sequencer: &mut PhaseSequencer, frame_dt: f32) -> u32 {
        if self.session.is_paused() {
            self.accumulator = 0.0;
            return 0;
        }

        let dt = frame_dt.clamp(0.0, MAX_FRAME_DT);
        self.accumulator += dt;

        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < MAX_SUBSTEPS {
            sequencer.tick(SIM_DT);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        self.ticks += substeps as u64;
        substeps
    }

    /// Host left the scene: drop pending time and reset the sequencer
    pub fn scene_transition(&mut self, sequencer: &mut PhaseSequencer) {
        self.session.on_scene_transition();
        self.accumulator = 0.0;
        sequencer.reset();
    }
}
