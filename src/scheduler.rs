//! # Frame Scheduler
//!
//! Drives one simulation step per frame. The host calls [`FrameScheduler::tick`]
//! whenever it is about to draw; the scheduler reads the clock, advances the
//! simulation, publishes transforms, updates the camera controls and hands
//! the frame to a [`RedrawTarget`]. It never sleeps or spawns timers, so tests
//! can feed it any sequence of clock values.
//!
//! A [`CancellationToken`] stops the loop from anywhere, including another
//! thread.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::clock::Clock;
use crate::gfx::camera::{CameraControls, PerspectiveCamera};
use crate::gfx::scene::Scene;
use crate::simulation::{params::SimulationParams, traits::Simulation};

/// Receives each finished frame
pub trait RedrawTarget {
    fn request_redraw(&mut self, scene: &Scene, camera: &PerspectiveCamera);
}

/// Shared stop flag for the frame loop
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

/// What the host should do after a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Frame done; schedule the next one
    Continue,
    /// `start` has not been called yet; nothing was done
    NotStarted,
    /// The loop was cancelled; nothing was done
    Stopped,
}

/// Everything one tick touches, borrowed from the host for its duration
pub struct FrameContext<'a> {
    pub simulation: &'a mut dyn Simulation,
    pub params: &'a SimulationParams,
    pub scene: &'a mut Scene,
    pub camera: &'a mut PerspectiveCamera,
    pub controls: &'a mut dyn CameraControls,
    pub redraw: &'a mut dyn RedrawTarget,
}

pub struct FrameScheduler<C: Clock> {
    clock: C,
    state: SchedulerState,
    token: CancellationToken,
    tick_count: u64,
    last_elapsed: Option<f64>,
}

impl<C: Clock> FrameScheduler<C> {
    pub fn new(clock: C) -> Self {
        Self::with_token(clock, CancellationToken::new())
    }

    /// Creates a scheduler that stops when `token` is cancelled
    pub fn with_token(clock: C, token: CancellationToken) -> Self {
        Self {
            clock,
            state: SchedulerState::Idle,
            token,
            tick_count: 0,
            last_elapsed: None,
        }
    }

    /// Enters `Running`. Only the first call has an effect.
    pub fn start(&mut self) {
        if self.state == SchedulerState::Idle && !self.token.is_cancelled() {
            self.state = SchedulerState::Running;
            log::info!("Frame loop started");
        }
    }

    /// Runs one frame
    pub fn tick(&mut self, mut ctx: FrameContext<'_>) -> TickOutcome {
        if self.token.is_cancelled() {
            if self.state != SchedulerState::Stopped {
                self.state = SchedulerState::Stopped;
                log::info!("Frame loop stopped after {} ticks", self.tick_count);
            }
            return TickOutcome::Stopped;
        }

        if self.state != SchedulerState::Running {
            return TickOutcome::NotStarted;
        }

        let elapsed = self.clock.elapsed();
        ctx.simulation.update(elapsed, ctx.params);
        ctx.simulation.sync_to_scene(&mut *ctx.scene);
        ctx.controls.update(&mut *ctx.camera);
        ctx.redraw.request_redraw(&*ctx.scene, &*ctx.camera);

        self.tick_count += 1;
        self.last_elapsed = Some(elapsed);
        TickOutcome::Continue
    }

    pub fn state(&self) -> SchedulerState {
        if self.token.is_cancelled() {
            SchedulerState::Stopped
        } else {
            self.state
        }
    }

    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Clock value read by the most recent completed tick
    pub fn last_elapsed(&self) -> Option<f64> {
        self.last_elapsed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::gfx::scene::SceneBackend;
    use std::cell::RefCell;
    use std::rc::Rc;

    type CallLog = Rc<RefCell<Vec<String>>>;

    struct FakeSimulation {
        log: CallLog,
    }

    impl Simulation for FakeSimulation {
        fn update(&mut self, elapsed: f64, _params: &SimulationParams) {
            self.log.borrow_mut().push(format!("update {elapsed}"));
        }

        fn sync_to_scene(&self, _scene: &mut dyn SceneBackend) {
            self.log.borrow_mut().push("sync".into());
        }

        fn reset_positions(&mut self) {}

        fn name(&self) -> &str {
            "fake"
        }
    }

    struct FakeControls {
        log: CallLog,
    }

    impl CameraControls for FakeControls {
        fn update(&mut self, _camera: &mut PerspectiveCamera) -> bool {
            self.log.borrow_mut().push("controls".into());
            false
        }
    }

    struct FakeRedraw {
        log: CallLog,
    }

    impl RedrawTarget for FakeRedraw {
        fn request_redraw(&mut self, _scene: &Scene, _camera: &PerspectiveCamera) {
            self.log.borrow_mut().push("redraw".into());
        }
    }

    struct Harness {
        log: CallLog,
        simulation: FakeSimulation,
        params: SimulationParams,
        scene: Scene,
        camera: PerspectiveCamera,
        controls: FakeControls,
        redraw: FakeRedraw,
    }

    impl Harness {
        fn new() -> Self {
            let log: CallLog = Rc::default();
            Self {
                simulation: FakeSimulation { log: log.clone() },
                controls: FakeControls { log: log.clone() },
                redraw: FakeRedraw { log: log.clone() },
                log,
                params: SimulationParams::default(),
                scene: Scene::new(),
                camera: PerspectiveCamera::default(),
            }
        }

        fn ctx(&mut self) -> FrameContext<'_> {
            FrameContext {
                simulation: &mut self.simulation,
                params: &self.params,
                scene: &mut self.scene,
                camera: &mut self.camera,
                controls: &mut self.controls,
                redraw: &mut self.redraw,
            }
        }
    }

    #[test]
    fn test_tick_runs_steps_in_order() {
        let mut harness = Harness::new();
        let clock = ManualClock::new();
        clock.set(0.5);
        let mut scheduler = FrameScheduler::new(clock);
        scheduler.start();

        assert_eq!(scheduler.tick(harness.ctx()), TickOutcome::Continue);
        assert_eq!(
            *harness.log.borrow(),
            vec!["update 0.5", "sync", "controls", "redraw"]
        );
        assert_eq!(scheduler.tick_count(), 1);
        assert_eq!(scheduler.last_elapsed(), Some(0.5));
    }

    #[test]
    fn test_idle_scheduler_does_nothing() {
        let mut harness = Harness::new();
        let mut scheduler = FrameScheduler::new(ManualClock::new());

        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.tick(harness.ctx()), TickOutcome::NotStarted);
        assert!(harness.log.borrow().is_empty());
        assert_eq!(scheduler.last_elapsed(), None);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mut scheduler = FrameScheduler::new(ManualClock::new());
        scheduler.start();
        scheduler.start();
        assert_eq!(scheduler.state(), SchedulerState::Running);
    }

    #[test]
    fn test_cancellation_stops_loop() {
        let mut harness = Harness::new();
        let mut scheduler = FrameScheduler::new(ManualClock::new());
        let token = scheduler.token();
        scheduler.start();
        scheduler.tick(harness.ctx());

        token.cancel();
        harness.log.borrow_mut().clear();

        assert_eq!(scheduler.tick(harness.ctx()), TickOutcome::Stopped);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
        assert!(harness.log.borrow().is_empty());
        assert_eq!(scheduler.tick_count(), 1);

        // stopped is terminal
        scheduler.start();
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn test_token_cancelled_from_another_thread() {
        let token = CancellationToken::new();
        let remote = token.clone();
        std::thread::spawn(move || remote.cancel()).join().unwrap();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_ticks_follow_clock() {
        let mut harness = Harness::new();
        let mut scheduler = FrameScheduler::new(ManualClock::new());
        scheduler.start();

        for t in [0.1, 0.2, 0.2, 0.35] {
            scheduler.clock().set(t);
            scheduler.tick(harness.ctx());
        }

        assert_eq!(scheduler.tick_count(), 4);
        assert_eq!(scheduler.last_elapsed(), Some(0.35));
        let updates: Vec<_> = harness
            .log
            .borrow()
            .iter()
            .filter(|entry| entry.starts_with("update"))
            .cloned()
            .collect();
        assert_eq!(updates, vec!["update 0.1", "update 0.2", "update 0.2", "update 0.35"]);
    }
}
