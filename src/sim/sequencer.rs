//! Phase sequencing
//!
//! The sequencer walks the phase list in order. Each phase runs in three
//! stages:
//! 1. Settling: ephemeral actors are spawned at the protagonist and given a
//!    moment before they move
//! 2. Leading: the protagonist walks the phase's lead path, alone
//! 3. Ensemble: every ephemeral actor and the protagonist move at once; the
//!    phase completes when all of them are done
//!
//! A failure signal abandons the running phase and rewinds the protagonist to
//! the phase anchor, or to the group anchor once the retries are used up.

use std::collections::BTreeMap;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use super::checkpoint::CheckpointTracker;
use super::collab::{ActorId, EventId, FireEmitter, PresentationSink, SupportProbe};
use super::locomotion::{Locomotion, Pose};
use super::mover::{ActorMover, FireRequest, FireStyle, MoverEvent, MoverSettings, Progress};
use super::phase::{ActorKey, Phase, validate_phases};
use super::spawn::{ActorHandle, SpawnLifecycleManager};
use super::zone::ZoneMonitor;
use crate::config::ChoreoConfig;
use crate::error::ConfigError;
use crate::report::RunReport;

/// Sequencer lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequencerState {
    /// Not started, or reset
    Idle,
    /// Phase set up; spawning or walking the lead path
    RunningPhase,
    /// Concurrent movement tasks outstanding
    AwaitingActors,
    /// Tearing down a completed phase
    Advancing,
    /// Every phase completed
    Finished,
}

/// How a phase is entered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Entry {
    /// First run, or restart from a group anchor: records both anchors
    Fresh,
    /// Phase-level retry: the group anchor stays put
    Retry,
}

#[derive(Debug, Clone)]
enum Stage {
    Settling { remaining: f32 },
    Leading(ActorMover),
    Ensemble,
}

#[derive(Debug, Clone, Copy)]
enum Subject {
    Protagonist,
    Ephemeral(ActorHandle),
}

#[derive(Debug, Clone)]
struct MoveTask {
    subject: Subject,
    mover: ActorMover,
}

/// Missing-collaborator warnings already logged for the running phase
#[derive(Debug, Default, Clone, Copy)]
struct Warned {
    emitter: bool,
    protagonist: bool,
}

/// Drives the ordered traversal of phases to completion
pub struct PhaseSequencer {
    config: ChoreoConfig,
    locomotion: Locomotion,
    phases: Vec<Phase>,
    state: SequencerState,
    current: usize,
    stage: Option<Stage>,
    tasks: Vec<MoveTask>,
    actors: BTreeMap<ActorKey, ActorHandle>,
    protagonist: Option<Pose>,
    checkpoints: CheckpointTracker,
    spawner: SpawnLifecycleManager,
    zones: ZoneMonitor,
    emitter: Option<Box<dyn FireEmitter>>,
    presenter: Option<Box<dyn PresentationSink>>,
    probe: Option<Box<dyn SupportProbe>>,
    /// Events removed when the phase ends
    phase_events: Vec<EventId>,
    /// Events removed by a failure, a reset, or the end of their group
    run_events: Vec<EventId>,
    warned: Warned,
    report: RunReport,
    scratch: Vec<MoverEvent>,
}

impl PhaseSequencer {
    pub fn new(config: ChoreoConfig) -> Self {
        let locomotion = Locomotion::from_surface(config.sphere);
        Self {
            locomotion,
            phases: Vec::new(),
            state: SequencerState::Idle,
            current: 0,
            stage: None,
            tasks: Vec::new(),
            actors: BTreeMap::new(),
            protagonist: None,
            checkpoints: CheckpointTracker::new(Vec3::ZERO, config.max_retries),
            spawner: SpawnLifecycleManager::new(locomotion),
            zones: ZoneMonitor::new(config.zone_radius, config.fall_delay_secs),
            emitter: None,
            presenter: None,
            probe: None,
            phase_events: Vec::new(),
            run_events: Vec::new(),
            warned: Warned::default(),
            report: RunReport::default(),
            scratch: Vec::new(),
            config,
        }
    }

    pub fn with_protagonist(mut self, position: Vec3) -> Self {
        self.protagonist = Some(Pose::at(position));
        self
    }

    pub fn with_emitter(mut self, emitter: Box<dyn FireEmitter>) -> Self {
        self.emitter = Some(emitter);
        self
    }

    pub fn with_presenter(mut self, presenter: Box<dyn PresentationSink>) -> Self {
        self.presenter = Some(presenter);
        self
    }

    pub fn with_support_probe(mut self, probe: Box<dyn SupportProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Validate configuration and phases, then enter phase 0
    pub fn start(&mut self, phases: Vec<Phase>) -> Result<(), ConfigError> {
        self.config.validate()?;
        validate_phases(&phases)?;

        self.teardown();
        self.phases = phases;
        self.report = RunReport::new(self.phases.len());

        let origin = match self.protagonist.map(|p| p.position) {
            Some(position) => {
                self.snap_onto_surface(position);
                self.protagonist_position()
            }
            None => {
                log::warn!("No protagonist assigned, protagonist movement will be skipped");
                Vec3::ZERO
            }
        };
        self.checkpoints = CheckpointTracker::new(origin, self.config.max_retries);
        if self.probe.is_none() {
            log::warn!("No support probe assigned, waypoint zones are inert");
        }

        log::info!(
            "Starting sequence: {} phases, group size {}, {} retries",
            self.phases.len(),
            self.config.group_size,
            self.config.max_retries
        );
        self.run_phase(0);
        Ok(())
    }

    /// Set up phase `index` from scratch and begin running it
    pub fn run_phase(&mut self, index: usize) {
        self.enter_phase(index, Entry::Fresh);
    }

    /// Advance the running phase by one simulation tick
    pub fn tick(&mut self, dt: f32) {
        if !self.is_running() {
            return;
        }
        self.report.ticks += 1;

        // Cleanup pass for actors destroyed by other systems
        self.spawner.purge_stale();

        match self.stage.take() {
            Some(Stage::Settling { remaining }) => {
                let left = remaining - dt;
                if left > 0.0 {
                    self.stage = Some(Stage::Settling { remaining: left });
                } else {
                    self.begin_lead();
                }
            }
            Some(Stage::Leading(mut mover)) => {
                let progress = match self.protagonist.as_mut() {
                    Some(pose) => mover.step(pose, dt, &mut self.scratch),
                    None => Progress::Done,
                };
                self.dispatch_events();
                if progress == Progress::Done {
                    self.begin_ensemble();
                } else {
                    self.stage = Some(Stage::Leading(mover));
                }
            }
            Some(Stage::Ensemble) => {
                self.stage = Some(Stage::Ensemble);
                self.step_ensemble(dt);
                self.dispatch_events();
                if self.tasks.iter().all(|t| t.mover.is_done()) {
                    self.complete_phase();
                }
            }
            None => {}
        }

        self.spawner.record_trails();
        self.check_zones(dt);
    }

    fn step_ensemble(&mut self, dt: f32) {
        let Self {
            tasks,
            spawner,
            protagonist,
            presenter,
            scratch,
            ..
        } = self;

        for task in tasks.iter_mut().filter(|t| !t.mover.is_done()) {
            let pose = match task.subject {
                Subject::Protagonist => protagonist.as_mut(),
                Subject::Ephemeral(handle) => spawner.pose_mut(handle),
            };
            match pose {
                Some(pose) => {
                    task.mover.step(pose, dt, scratch);
                }
                None => {
                    log::warn!("{} vanished mid-phase, stopping its movement", task.mover.actor());
                    if task.mover.is_moving() {
                        notify_stopped(presenter, spawner, task);
                    }
                    task.mover.cancel();
                }
            }
        }
    }

    fn check_zones(&mut self, dt: f32) {
        if !self.is_running() {
            return;
        }
        let (Some(probe), Some(pose)) = (self.probe.as_deref(), self.protagonist.as_ref()) else {
            return;
        };
        if let Some(zone) = self.zones.update(pose.position, probe, dt) {
            log::info!("Zone {}.{} unsupported, failing phase", zone.phase, zone.waypoint);
            self.on_failure_signal();
        }
    }

    /// Protagonist failed the running phase: retry it, or fall back to the group start
    pub fn on_failure_signal(&mut self) {
        if !self.is_running() {
            log::debug!("Failure signal ignored in state {:?}", self.state);
            return;
        }
        let failed = self.current;
        if let Some(p) = self.presenter.as_mut() {
            p.protagonist_failed(failed);
        }

        self.teardown();

        let (anchor, group_reset) = self.checkpoints.register_failure();
        self.report.failure(failed, group_reset);
        self.rewind_protagonist(anchor);

        if group_reset {
            let group_start = failed - failed % self.config.group_size;
            log::info!(
                "Retry limit reached, restarting group at phase {} (failed phase {})",
                group_start + 1,
                failed + 1
            );
            self.enter_phase(group_start, Entry::Fresh);
        } else {
            log::info!(
                "Protagonist failed phase {}, respawn {}/{}",
                failed + 1,
                self.checkpoints.retries(),
                self.checkpoints.max_retries()
            );
            self.enter_phase(failed, Entry::Retry);
        }
    }

    /// Tear everything down and return to Idle
    pub fn reset(&mut self) {
        self.teardown();
        self.state = SequencerState::Idle;
        self.current = 0;
        log::info!("Sequencer reset");
    }

    /// Host notification that an ephemeral actor was destroyed outside the core
    pub fn actor_destroyed_externally(&mut self, key: ActorKey) -> bool {
        match self.actors.get(&key) {
            Some(&handle) => self.spawner.despawn(handle),
            None => false,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state == SequencerState::Finished && self.tasks.is_empty()
    }

    pub fn state(&self) -> SequencerState {
        self.state
    }

    pub fn current_phase_index(&self) -> usize {
        self.current
    }

    pub fn phase_count(&self) -> usize {
        self.phases.len()
    }

    pub fn retry_count(&self) -> u32 {
        self.checkpoints.retries()
    }

    pub fn checkpoints(&self) -> &CheckpointTracker {
        &self.checkpoints
    }

    pub fn protagonist(&self) -> Option<&Pose> {
        self.protagonist.as_ref()
    }

    pub fn spawner(&self) -> &SpawnLifecycleManager {
        &self.spawner
    }

    /// Handles of the running phase's ephemeral actors
    pub fn actor_handles(&self) -> &BTreeMap<ActorKey, ActorHandle> {
        &self.actors
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    pub fn config(&self) -> &ChoreoConfig {
        &self.config
    }

    fn is_running(&self) -> bool {
        matches!(
            self.state,
            SequencerState::RunningPhase | SequencerState::AwaitingActors
        )
    }

    fn protagonist_position(&self) -> Vec3 {
        self.protagonist.map(|p| p.position).unwrap_or(Vec3::ZERO)
    }

    fn enter_phase(&mut self, index: usize, entry: Entry) {
        self.stop_tasks();
        self.teardown_phase_scoped();
        self.warned = Warned::default();

        if index >= self.phases.len() {
            self.finish();
            return;
        }
        self.current = index;
        self.state = SequencerState::RunningPhase;

        let origin = match self.protagonist {
            Some(pose) => pose.position,
            None => self.checkpoints.phase_anchor(),
        };
        self.checkpoints.record_phase_start(origin);
        if entry == Entry::Fresh
            && self
                .checkpoints
                .record_group_start_if_boundary(index, origin, self.config.group_size)
        {
            log::info!("Starting group {} at {:?}", index / self.config.group_size + 1, origin);
        }
        log::info!("Starting phase {} at {:?}", index + 1, origin);
        self.report.phase_started(index);

        let phase = &self.phases[index];
        self.zones.arm(index, phase, &self.locomotion);
        self.actors = self.spawner.spawn_for_phase(index, &phase.actors, origin);

        if !self.actors.is_empty() && self.config.spawn_settle_secs > 0.0 {
            log::debug!("Spawned {} actors for phase {}", self.actors.len(), index + 1);
            self.stage = Some(Stage::Settling {
                remaining: self.config.spawn_settle_secs,
            });
        } else {
            self.begin_lead();
        }
    }

    fn settings(&self) -> MoverSettings {
        MoverSettings {
            speed: self.config.move_speed,
            reach_threshold: self.config.reach_threshold,
            pause_duration: self.phases[self.current].pause_duration,
            locomotion: self.locomotion,
        }
    }

    fn begin_lead(&mut self) {
        let lead = &self.phases[self.current].lead_waypoints;
        if lead.is_empty() {
            self.begin_ensemble();
            return;
        }
        if self.protagonist.is_none() {
            self.warn_missing_protagonist();
            self.begin_ensemble();
            return;
        }
        let mover = ActorMover::new(
            ActorId::Protagonist,
            lead.clone(),
            self.settings(),
            FireStyle::Lead,
        );
        self.stage = Some(Stage::Leading(mover));
    }

    fn begin_ensemble(&mut self) {
        let settings = self.settings();
        let phase = &self.phases[self.current];
        let mut tasks = Vec::with_capacity(self.actors.len() + 1);

        for (key, &handle) in &self.actors {
            let Some(descriptor) = phase.actors.get(key.slot) else {
                continue;
            };
            tasks.push(MoveTask {
                subject: Subject::Ephemeral(handle),
                mover: ActorMover::new(
                    ActorId::Ephemeral(*key),
                    descriptor.waypoints.clone(),
                    settings,
                    FireStyle::Ensemble,
                ),
            });
        }

        let protagonist_path = phase.protagonist_waypoints.clone();
        if !protagonist_path.is_empty() {
            if self.protagonist.is_some() {
                tasks.push(MoveTask {
                    subject: Subject::Protagonist,
                    mover: ActorMover::new(
                        ActorId::Protagonist,
                        protagonist_path,
                        settings,
                        FireStyle::Protagonist,
                    ),
                });
            } else {
                self.warn_missing_protagonist();
            }
        }

        self.tasks = tasks;
        self.stage = Some(Stage::Ensemble);
        self.state = SequencerState::AwaitingActors;
    }

    fn complete_phase(&mut self) {
        self.state = SequencerState::Advancing;
        let done = self.current;
        self.stop_tasks();
        self.teardown_phase_scoped();

        if let Some(p) = self.presenter.as_mut() {
            p.phase_completed(done);
        }
        self.report.phase_completed(done);
        log::info!("Phase {} completed", done + 1);

        self.current += 1;
        if self.current % self.config.group_size == 0 {
            self.checkpoints.reset_retries();
            self.destroy_run_events();
            log::info!("Group completed, respawn count reset");
        }
        self.enter_phase(self.current, Entry::Fresh);
    }

    fn finish(&mut self) {
        self.current = self.phases.len();
        self.state = SequencerState::Finished;
        self.report.finished = true;
        log::info!("All {} phases complete", self.phases.len());
    }

    /// Stop every task and destroy every actor and event the core owns
    fn teardown(&mut self) {
        self.stop_tasks();
        self.teardown_phase_scoped();
        self.destroy_run_events();
    }

    /// Events outlive their phase but never their group
    fn destroy_run_events(&mut self) {
        if let Some(emitter) = self.emitter.as_mut() {
            for id in self.run_events.drain(..) {
                emitter.destroy_event(id);
            }
        } else {
            self.run_events.clear();
        }
    }

    /// Cancel movement, announcing a stop for anything still moving
    fn stop_tasks(&mut self) {
        for task in self.tasks.iter_mut() {
            if task.mover.is_moving() {
                notify_stopped(&mut self.presenter, &mut self.spawner, task);
            }
            task.mover.cancel();
        }
        if let Some(Stage::Leading(mover)) = &self.stage {
            if mover.is_moving() {
                if let Some(p) = self.presenter.as_mut() {
                    p.actor_stopped_moving(ActorId::Protagonist);
                }
            }
        }
        self.tasks.clear();
        self.stage = None;
        self.zones.clear();
    }

    /// Destroy the phase's actors and its phase-scoped events
    fn teardown_phase_scoped(&mut self) {
        if let Some(emitter) = self.emitter.as_mut() {
            for id in self.phase_events.drain(..) {
                emitter.destroy_event(id);
            }
        } else {
            self.phase_events.clear();
        }
        let handles: Vec<ActorHandle> = self.actors.values().copied().collect();
        self.spawner.destroy_all(&handles);
        self.actors.clear();
    }

    fn rewind_protagonist(&mut self, anchor: Vec3) {
        if self.protagonist.is_none() {
            self.warn_missing_protagonist();
            return;
        }
        self.snap_onto_surface(anchor);
        log::info!("Protagonist rewound to {:?}", self.protagonist_position());
    }

    /// Place the protagonist at `position`, standing on the sphere if there is one
    fn snap_onto_surface(&mut self, position: Vec3) {
        let locomotion = self.locomotion;
        if let Some(pose) = self.protagonist.as_mut() {
            match locomotion {
                Locomotion::Planar => pose.position = position,
                Locomotion::Sphere(s) => {
                    pose.position = s.project(position);
                    pose.rotation = s.surface_rotation(pose.position);
                }
            }
        }
    }

    fn warn_missing_protagonist(&mut self) {
        if !self.warned.protagonist {
            self.warned.protagonist = true;
            log::warn!("Phase {}: no protagonist, skipping its movement", self.current + 1);
        }
    }

    fn dispatch_events(&mut self) {
        let mut events = std::mem::take(&mut self.scratch);
        for event in events.drain(..) {
            match event {
                MoverEvent::Started(actor) => {
                    self.set_actor_moving(actor, true);
                    if let Some(p) = self.presenter.as_mut() {
                        p.actor_started_moving(actor);
                    }
                }
                MoverEvent::Stopped(actor) => {
                    self.set_actor_moving(actor, false);
                    if let Some(p) = self.presenter.as_mut() {
                        p.actor_stopped_moving(actor);
                    }
                }
                MoverEvent::Reached { actor, waypoint } => {
                    log::debug!("{} reached waypoint {}", actor, waypoint);
                }
                MoverEvent::Fire(request) => self.fire(request),
            }
        }
        self.scratch = events;
    }

    fn set_actor_moving(&mut self, actor: ActorId, moving: bool) {
        if let ActorId::Ephemeral(key) = actor {
            if let Some(&handle) = self.actors.get(&key) {
                self.spawner.set_moving(handle, moving);
            }
        }
    }

    fn fire(&mut self, request: FireRequest) {
        let Some(emitter) = self.emitter.as_mut() else {
            if !self.warned.emitter {
                self.warned.emitter = true;
                log::warn!("Phase {}: no fire emitter assigned, skipping fire", self.current + 1);
            }
            return;
        };

        let origins = if request.origins.is_empty() {
            vec![emitter.default_origin()]
        } else {
            request.origins
        };
        for origin in origins {
            let event = request.style.event(
                origin,
                request.target,
                request.time_to_arrival,
                self.config.projectile_speed,
            );
            match emitter.fire_event(event) {
                Some(id) => {
                    if request.style.phase_scoped() {
                        self.phase_events.push(id);
                    } else {
                        self.run_events.push(id);
                    }
                    self.report.fired(self.current);
                    log::debug!("{} fired {:?} at speed {:.2}", request.actor, id, event.speed);
                }
                None => log::warn!("{}: emitter failed to launch event", request.actor),
            }
        }
    }
}

fn notify_stopped(
    presenter: &mut Option<Box<dyn PresentationSink>>,
    spawner: &mut SpawnLifecycleManager,
    task: &MoveTask,
) {
    if let Subject::Ephemeral(handle) = task.subject {
        spawner.set_moving(handle, false);
    }
    if let Some(p) = presenter.as_mut() {
        p.actor_stopped_moving(task.mover.actor());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::SIM_DT;
    use crate::sim::collab::FireEvent;
    use crate::sim::phase::{ActorDescriptor, Waypoint};
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        fired: Vec<FireEvent>,
        destroyed: Vec<EventId>,
        next: u64,
    }

    struct Emitter(Rc<RefCell<Log>>);

    #[derive(Default)]
    struct Moves {
        started: Vec<ActorId>,
        stopped: Vec<ActorId>,
    }

    struct MoveRecorder(Rc<RefCell<Moves>>);

    impl PresentationSink for MoveRecorder {
        fn actor_started_moving(&mut self, actor: ActorId) {
            self.0.borrow_mut().started.push(actor);
        }

        fn actor_stopped_moving(&mut self, actor: ActorId) {
            self.0.borrow_mut().stopped.push(actor);
        }
    }

    impl FireEmitter for Emitter {
        fn default_origin(&self) -> Vec3 {
            Vec3::new(0.0, 10.0, 0.0)
        }

        fn fire_event(&mut self, event: FireEvent) -> Option<EventId> {
            let mut log = self.0.borrow_mut();
            log.next += 1;
            log.fired.push(event);
            Some(EventId(log.next))
        }

        fn destroy_event(&mut self, id: EventId) {
            self.0.borrow_mut().destroyed.push(id);
        }
    }

    fn walk(x: f32) -> Phase {
        Phase {
            protagonist_waypoints: vec![Waypoint::at(Vec3::new(x, 0.0, 0.0))],
            pause_duration: 0.0,
            ..Default::default()
        }
    }

    fn run(seq: &mut PhaseSequencer, max_ticks: usize) -> usize {
        for i in 0..max_ticks {
            if seq.is_finished() {
                return i;
            }
            seq.tick(SIM_DT);
        }
        max_ticks
    }

    #[test]
    fn test_start_rejects_empty_phases() {
        let mut seq = PhaseSequencer::new(ChoreoConfig::default());
        assert!(matches!(seq.start(Vec::new()), Err(ConfigError::EmptyPhases)));
        assert_eq!(seq.state(), SequencerState::Idle);
    }

    #[test]
    fn test_runs_all_phases_in_order() {
        let mut seq = PhaseSequencer::new(ChoreoConfig::default()).with_protagonist(Vec3::ZERO);
        seq.start(vec![walk(2.0), walk(4.0), walk(6.0)]).unwrap();
        assert_eq!(seq.state(), SequencerState::AwaitingActors);

        let ticks = run(&mut seq, 2000);
        assert!(ticks < 2000);
        assert!(seq.is_finished());
        assert_eq!(seq.current_phase_index(), 3);
        assert_eq!(seq.report().completed_count(), 3);
        let pos = seq.protagonist().unwrap().position;
        assert!(pos.distance(Vec3::new(6.0, 0.0, 0.0)) <= 0.2 + 1e-4);
    }

    #[test]
    fn test_failure_ignored_when_idle_or_finished() {
        let mut seq = PhaseSequencer::new(ChoreoConfig::default()).with_protagonist(Vec3::ZERO);
        seq.on_failure_signal();
        assert_eq!(seq.retry_count(), 0);

        seq.start(vec![walk(1.0)]).unwrap();
        run(&mut seq, 1000);
        assert!(seq.is_finished());
        seq.on_failure_signal();
        assert!(seq.is_finished());
        assert_eq!(seq.report().total_failures(), 0);
    }

    #[test]
    fn test_failure_rewinds_to_phase_anchor() {
        let mut seq = PhaseSequencer::new(ChoreoConfig::default()).with_protagonist(Vec3::ZERO);
        seq.start(vec![walk(2.0), walk(8.0)]).unwrap();
        while seq.current_phase_index() == 0 {
            seq.tick(SIM_DT);
        }
        for _ in 0..20 {
            seq.tick(SIM_DT);
        }
        let anchor = seq.checkpoints().phase_anchor();
        assert!(seq.protagonist().unwrap().position.x > anchor.x);

        seq.on_failure_signal();
        assert_eq!(seq.current_phase_index(), 1);
        assert_eq!(seq.retry_count(), 1);
        assert_eq!(seq.protagonist().unwrap().position, anchor);
        assert_eq!(seq.report().phases[1].attempts, 2);
    }

    #[test]
    fn test_retry_limit_falls_back_to_group_start() {
        let config = ChoreoConfig {
            group_size: 2,
            max_retries: 1,
            ..Default::default()
        };
        let mut seq = PhaseSequencer::new(config).with_protagonist(Vec3::ZERO);
        seq.start(vec![walk(2.0), walk(4.0), walk(6.0)]).unwrap();
        while seq.current_phase_index() == 0 {
            seq.tick(SIM_DT);
        }

        seq.on_failure_signal();
        assert_eq!(seq.current_phase_index(), 1);
        assert_eq!(seq.retry_count(), 1);

        seq.on_failure_signal();
        assert_eq!(seq.current_phase_index(), 0);
        assert_eq!(seq.retry_count(), 0);
        assert_eq!(seq.protagonist().unwrap().position, Vec3::ZERO);
        assert_eq!(seq.report().group_fallbacks, 1);
    }

    #[test]
    fn test_lead_path_runs_before_ensemble() {
        let phase = Phase {
            lead_waypoints: vec![Waypoint::at(Vec3::new(0.0, 0.0, 3.0))],
            actors: vec![ActorDescriptor {
                waypoints: vec![Waypoint::at(Vec3::new(1.0, 0.0, 0.0))],
                trail: None,
            }],
            pause_duration: 0.0,
            ..Default::default()
        };
        let mut seq = PhaseSequencer::new(ChoreoConfig::default()).with_protagonist(Vec3::ZERO);
        seq.start(vec![phase]).unwrap();
        assert_eq!(seq.state(), SequencerState::RunningPhase);
        assert_eq!(seq.spawner().live_count(), 1);

        let mut saw_ensemble = false;
        for _ in 0..1000 {
            seq.tick(SIM_DT);
            if seq.state() == SequencerState::AwaitingActors {
                saw_ensemble = true;
                let pos = seq.protagonist().unwrap().position;
                assert!(pos.distance(Vec3::new(0.0, 0.0, 3.0)) <= 0.2 + 1e-4);
                break;
            }
        }
        assert!(saw_ensemble);
        run(&mut seq, 1000);
        assert!(seq.is_finished());
        assert_eq!(seq.spawner().live_count(), 0);
    }

    #[test]
    fn test_events_scoped_by_fire_style() {
        let log = Rc::new(RefCell::new(Log::default()));
        let phase = Phase {
            protagonist_waypoints: vec![Waypoint::at(Vec3::new(2.0, 0.0, 0.0)).firing(0.5)],
            actors: vec![ActorDescriptor {
                waypoints: vec![Waypoint::at(Vec3::new(-2.0, 0.0, 0.0)).firing(0.5)],
                trail: None,
            }],
            pause_duration: 0.0,
            ..Default::default()
        };
        let mut seq = PhaseSequencer::new(ChoreoConfig::default())
            .with_protagonist(Vec3::ZERO)
            .with_emitter(Box::new(Emitter(log.clone())));
        seq.start(vec![phase.clone(), phase]).unwrap();
        while seq.current_phase_index() == 0 {
            seq.tick(SIM_DT);
        }

        {
            let log = log.borrow();
            assert_eq!(log.fired.len(), 2);
            // Only the ensemble event is removed with the phase
            assert_eq!(log.destroyed.len(), 1);
            let protagonist = log.fired.iter().filter(|e| e.destroy_on_impact).count();
            assert_eq!(protagonist, 1);
        }

        seq.reset();
        assert_eq!(seq.state(), SequencerState::Idle);
        assert_eq!(log.borrow().destroyed.len(), 2);
    }

    #[test]
    fn test_run_events_released_when_group_completes() {
        let log = Rc::new(RefCell::new(Log::default()));
        let phase = Phase {
            lead_waypoints: vec![Waypoint::at(Vec3::new(0.0, 0.0, 2.0)).firing(0.5)],
            pause_duration: 0.0,
            ..Default::default()
        };
        let config = ChoreoConfig {
            group_size: 2,
            ..Default::default()
        };
        let mut seq = PhaseSequencer::new(config)
            .with_protagonist(Vec3::ZERO)
            .with_emitter(Box::new(Emitter(log.clone())));
        seq.start(vec![phase.clone(), phase.clone(), phase]).unwrap();

        while seq.current_phase_index() == 0 {
            seq.tick(SIM_DT);
        }
        // Mid-group: the lead event is still alive
        assert_eq!(log.borrow().fired.len(), 1);
        assert!(log.borrow().destroyed.is_empty());

        while seq.current_phase_index() == 1 {
            seq.tick(SIM_DT);
        }
        assert_eq!(log.borrow().destroyed, vec![EventId(1), EventId(2)]);
        assert!(seq.run_events.is_empty());
    }

    #[test]
    fn test_externally_destroyed_actor_does_not_stall_phase() {
        let moves = Rc::new(RefCell::new(Moves::default()));
        let phase = Phase {
            actors: vec![ActorDescriptor {
                waypoints: vec![Waypoint::at(Vec3::new(50.0, 0.0, 0.0))],
                trail: None,
            }],
            pause_duration: 0.0,
            ..Default::default()
        };
        let mut seq = PhaseSequencer::new(ChoreoConfig::default())
            .with_protagonist(Vec3::ZERO)
            .with_presenter(Box::new(MoveRecorder(moves.clone())));
        seq.start(vec![phase]).unwrap();
        for _ in 0..30 {
            seq.tick(SIM_DT);
        }
        let key = ActorKey { phase: 0, slot: 0 };
        assert_eq!(moves.borrow().started, vec![ActorId::Ephemeral(key)]);
        assert!(moves.borrow().stopped.is_empty());

        assert!(seq.actor_destroyed_externally(key));
        let ticks = run(&mut seq, 10);
        assert!(ticks < 10);
        assert!(seq.is_finished());
        assert_eq!(moves.borrow().stopped, vec![ActorId::Ephemeral(key)]);
    }
}
