//! Waypoint Choreo runner
//!
//! Plays a scenario file (or a seeded demo) headless through the fixed-step
//! driver and prints the run report as JSON.
//!
//! Usage: `waypoint-choreo [scenario.json]`

use std::process::ExitCode;

use glam::Vec3;
use waypoint_choreo::consts::SIM_DT;
use waypoint_choreo::sim::{
    ActorId, EventId, FireEmitter, FireEvent, FixedStepDriver, PhaseSequencer, PresentationSink,
};
use waypoint_choreo::{ChoreoConfig, ConfigError, Scenario, Session};

/// Give up after this many simulated frames (10 minutes at 60 Hz)
const MAX_FRAMES: u32 = 36_000;
const DEMO_SEED: u64 = 0x5eed;
const DEMO_PHASES: usize = 10;

/// Emitter that only logs launches
struct LogEmitter {
    origin: Vec3,
    next_id: u64,
}

impl FireEmitter for LogEmitter {
    fn default_origin(&self) -> Vec3 {
        self.origin
    }

    fn fire_event(&mut self, event: FireEvent) -> Option<EventId> {
        self.next_id += 1;
        log::debug!(
            "fire #{}: {:?} -> {:?} at {:.2}",
            self.next_id,
            event.origin,
            event.target,
            event.speed
        );
        Some(EventId(self.next_id))
    }

    fn destroy_event(&mut self, id: EventId) {
        log::debug!("destroy #{}", id.0);
    }
}

struct LogPresenter;

impl PresentationSink for LogPresenter {
    fn actor_started_moving(&mut self, actor: ActorId) {
        log::debug!("{} started moving", actor);
    }

    fn actor_stopped_moving(&mut self, actor: ActorId) {
        log::debug!("{} stopped moving", actor);
    }

    fn phase_completed(&mut self, phase_index: usize) {
        log::info!("Phase {} done", phase_index + 1);
    }
}

fn load_scenario() -> Result<Scenario, ConfigError> {
    match std::env::args().nth(1) {
        Some(path) => Scenario::load(path),
        None => {
            let config = ChoreoConfig::default();
            let phases = waypoint_choreo::demo::generate_phases(DEMO_SEED, DEMO_PHASES, &config);
            Ok(Scenario {
                config,
                phases,
                protagonist_start: Some(Vec3::ZERO),
                emitter_origin: Vec3::new(0.0, 10.0, 0.0),
            })
        }
    }
}

fn run(scenario: Scenario) -> Result<PhaseSequencer, ConfigError> {
    let mut sequencer = PhaseSequencer::new(scenario.config)
        .with_emitter(Box::new(LogEmitter {
            origin: scenario.emitter_origin,
            next_id: 0,
        }))
        .with_presenter(Box::new(LogPresenter));
    if let Some(start) = scenario.protagonist_start {
        sequencer = sequencer.with_protagonist(start);
    }
    sequencer.start(scenario.phases)?;

    let mut driver = FixedStepDriver::new(Session::new());
    let mut frames = 0;
    while !sequencer.is_finished() && frames < MAX_FRAMES {
        driver.advance(&mut sequencer, SIM_DT);
        frames += 1;
    }
    if !sequencer.is_finished() {
        log::warn!("Stopped after {} frames without finishing", frames);
    }
    Ok(sequencer)
}

#[cfg(not(target_arch = "wasm32"))]
fn main() -> ExitCode {
    env_logger::init();
    log::info!("Waypoint Choreo starting...");

    let sequencer = match load_scenario().and_then(run) {
        Ok(sequencer) => sequencer,
        Err(e) => {
            log::error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match sequencer.report().to_json() {
        Ok(json) => {
            println!("{}", json);
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Failed to serialize report: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn main() {}
