//! Run statistics
//!
//! Collected by the sequencer as phases start, fail and complete. Serialized
//! to JSON by the runner at the end of a run.

use serde::{Deserialize, Serialize};

/// Per-phase counters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseStats {
    /// Times the phase was entered (first run plus retries)
    pub attempts: u32,
    /// Failure signals received while the phase was running
    pub failures: u32,
    /// Events fired during the phase, all attempts
    pub fires: u32,
    pub completed: bool,
}

/// Summary of a whole run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    pub phases: Vec<PhaseStats>,
    /// Failures that fell back to a group anchor
    pub group_fallbacks: u32,
    /// Simulation ticks elapsed
    pub ticks: u64,
    pub finished: bool,
}

impl RunReport {
    pub fn new(phase_count: usize) -> Self {
        Self {
            phases: vec![PhaseStats::default(); phase_count],
            ..Default::default()
        }
    }

    fn stats(&mut self, phase: usize) -> Option<&mut PhaseStats> {
        self.phases.get_mut(phase)
    }

    pub fn phase_started(&mut self, phase: usize) {
        if let Some(s) = self.stats(phase) {
            s.attempts += 1;
        }
    }

    pub fn phase_completed(&mut self, phase: usize) {
        if let Some(s) = self.stats(phase) {
            s.completed = true;
        }
    }

    pub fn failure(&mut self, phase: usize, group_fallback: bool) {
        if let Some(s) = self.stats(phase) {
            s.failures += 1;
        }
        if group_fallback {
            self.group_fallbacks += 1;
        }
    }

    pub fn fired(&mut self, phase: usize) {
        if let Some(s) = self.stats(phase) {
            s.fires += 1;
        }
    }

    pub fn total_failures(&self) -> u32 {
        self.phases.iter().map(|p| p.failures).sum()
    }

    pub fn completed_count(&self) -> usize {
        self.phases.iter().filter(|p| p.completed).count()
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
