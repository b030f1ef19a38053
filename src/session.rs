//! Session control
//!
//! Pause state and scene lifecycle are owned by the host. The fixed-step
//! driver consults a `SessionController` every frame instead of reaching for
//! global state.

/// Host hooks for pausing and scene changes
pub trait SessionController {
    fn pause(&mut self);
    fn resume(&mut self);
    fn is_paused(&self) -> bool;

    /// Called when the host leaves the scene. Clears the pause.
    fn on_scene_transition(&mut self);
}

/// Default session: a pause flag plus a count of scene transitions
#[derive(Debug, Clone, Default)]
pub struct Session {
    paused: bool,
    transitions: u32,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn transitions(&self) -> u32 {
        self.transitions
    }
}

impl SessionController for Session {
    fn pause(&mut self) {
        if !self.paused {
            log::info!("Session paused");
        }
        self.paused = true;
    }

    fn resume(&mut self) {
        if self.paused {
            log::info!("Session resumed");
        }
        self.paused = false;
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn on_scene_transition(&mut self) {
        self.paused = false;
        self.transitions += 1;
        log::info!("Scene transition {}", self.transitions);
    }
}
