//! Frame tick scheduler
//!
//! Drives the per-frame work of the gateway. Each tick:
//!
//! 1. computes the elapsed time since the previous tick (seconds)
//! 2. refreshes derived state: `app.performance.fps` and, when a
//!    [`PoseSource`] is installed, `user.position` / `user.rotation`
//! 3. drains the event bus queue
//! 4. invokes every registered tick callback with the elapsed time
//!
//! The scheduler is cooperative and single-threaded. [`TickScheduler::run`]
//! re-arms itself after every frame until [`TickScheduler::stop`] is called
//! or the frame budget is exhausted; a stopped scheduler never restarts on
//! its own.

use crate::config::SchedulerConfig;
use crate::events::EventBus;
use crate::guard::run_guarded;
use crate::store::StateStore;
use crate::value::StateValue;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::thread;
use std::time::{Duration, Instant};

/// A point or Euler rotation in scene space
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<Vec3> for StateValue {
    fn from(v: Vec3) -> Self {
        StateValue::from_pairs([("x", v.x), ("y", v.y), ("z", v.z)])
    }
}

/// Last-known camera pose
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CameraPose {
    pub position: Vec3,
    pub rotation: Vec3,
}

/// Supplies the camera pose read at the start of every tick
pub trait PoseSource {
    /// Current pose, or `None` if no camera is available yet
    fn pose(&self) -> Option<CameraPose>;
}

/// Handle to a registered tick callback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TickCallbackId(u64);

type TickCallback = Rc<dyn Fn(f64)>;

/// Frame loop that advances time, drains queued events and runs callbacks
pub struct TickScheduler {
    store: Rc<StateStore>,
    bus: Rc<EventBus>,
    callbacks: RefCell<Vec<(TickCallbackId, TickCallback)>>,
    next_callback_id: Cell<u64>,
    pose_source: RefCell<Option<Box<dyn PoseSource>>>,
    running: Cell<bool>,
    last_frame: Cell<Option<Instant>>,
    delta: Cell<f64>,
    elapsed: Cell<f64>,
    fps: Cell<f64>,
    frame_count: Cell<u64>,
    config: SchedulerConfig,
}

impl TickScheduler {
    pub fn new(store: Rc<StateStore>, bus: Rc<EventBus>, config: SchedulerConfig) -> Self {
        Self {
            store,
            bus,
            callbacks: RefCell::new(Vec::new()),
            next_callback_id: Cell::new(0),
            pose_source: RefCell::new(None),
            running: Cell::new(false),
            last_frame: Cell::new(None),
            delta: Cell::new(0.0),
            elapsed: Cell::new(0.0),
            fps: Cell::new(0.0),
            frame_count: Cell::new(0),
            config,
        }
    }

    /// Register a callback invoked every tick with the elapsed seconds
    pub fn add_tick_callback<F>(&self, callback: F) -> TickCallbackId
    where
        F: Fn(f64) + 'static,
    {
        let id = TickCallbackId(self.next_callback_id.get());
        self.next_callback_id.set(id.0 + 1);
        self.callbacks.borrow_mut().push((id, Rc::new(callback)));
        id
    }

    pub fn remove_tick_callback(&self, id: TickCallbackId) -> bool {
        let mut callbacks = self.callbacks.borrow_mut();
        let before = callbacks.len();
        callbacks.retain(|(cb_id, _)| *cb_id != id);
        callbacks.len() != before
    }

    pub fn has_tick_callback(&self, id: TickCallbackId) -> bool {
        self.callbacks.borrow().iter().any(|(cb_id, _)| *cb_id == id)
    }

    pub fn callback_count(&self) -> usize {
        self.callbacks.borrow().len()
    }

    /// Install the collaborator that reports the camera pose
    pub fn set_pose_source(&self, source: impl PoseSource + 'static) {
        *self.pose_source.borrow_mut() = Some(Box::new(source));
    }

    /// Begin ticking. The first tick after start reports a zero delta.
    pub fn start(&self) {
        if self.running.get() {
            return;
        }
        self.running.set(true);
        self.last_frame.set(None);
        tracing::info!("Tick scheduler started");
    }

    /// Stop ticking; subsequent ticks are no-ops until `start` is called
    pub fn stop(&self) {
        if self.running.replace(false) {
            tracing::info!("Tick scheduler stopped after {} frames", self.frame_count.get());
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    /// Tick using the current time
    pub fn tick(&self) -> bool {
        self.tick_at(Instant::now())
    }

    /// Run one frame as of `now`
    ///
    /// Returns `true` if the scheduler is still running afterwards (should
    /// be re-armed), `false` if it is stopped. Ticking a stopped scheduler
    /// does nothing.
    pub fn tick_at(&self, now: Instant) -> bool {
        if !self.running.get() {
            return false;
        }

        let delta = self
            .last_frame
            .get()
            .map(|last| now.saturating_duration_since(last).as_secs_f64())
            .unwrap_or(0.0);
        self.last_frame.set(Some(now));
        self.delta.set(delta);
        self.elapsed.set(self.elapsed.get() + delta);
        self.frame_count.set(self.frame_count.get() + 1);

        if delta > 0.0 {
            let fps = 1.0 / delta;
            self.fps.set(fps);
            self.write_derived("app.performance.fps", fps.round());
        }

        self.update_pose();
        self.bus.drain();

        let callbacks: Vec<(TickCallbackId, TickCallback)> = self
            .callbacks
            .borrow()
            .iter()
            .map(|(id, cb)| (*id, Rc::clone(cb)))
            .collect();
        for (id, callback) in callbacks {
            // Skip callbacks removed earlier in this frame
            if !self.has_tick_callback(id) {
                continue;
            }
            run_guarded("Tick callback", || callback(delta));
        }

        self.running.get()
    }

    /// Drive the loop at the configured target rate
    ///
    /// Starts the scheduler if needed and ticks until it is stopped or
    /// `max_frames` frames have run (unbounded when `None`). Sleeps for the
    /// remainder of each frame. Returns the number of frames ticked.
    pub fn run(&self, max_frames: Option<u64>) -> u64 {
        self.start();
        let fps = u64::from(self.config.target_fps.max(1));
        let frame_duration = Duration::from_micros(1_000_000 / fps);

        let mut frames = 0;
        while self.running.get() && max_frames.map_or(true, |max| frames < max) {
            let start = Instant::now();
            self.tick_at(start);
            frames += 1;

            let elapsed = start.elapsed();
            if elapsed < frame_duration {
                thread::sleep(frame_duration - elapsed);
            }
        }
        frames
    }

    /// Seconds between the two most recent ticks
    pub fn delta_time(&self) -> f64 {
        self.delta.get()
    }

    /// Total seconds accumulated across ticks
    pub fn elapsed(&self) -> f64 {
        self.elapsed.get()
    }

    /// Frames per second derived from the last non-zero delta
    pub fn fps(&self) -> f64 {
        self.fps.get()
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count.get()
    }

    fn update_pose(&self) {
        let pose = self.pose_source.borrow().as_ref().and_then(|s| s.pose());
        if let Some(pose) = pose {
            self.write_derived("user.position", pose.position);
            self.write_derived("user.rotation", pose.rotation);
        }
    }

    fn write_derived(&self, path: &str, value: impl Into<StateValue>) {
        if let Err(err) = self.store.set_derived(path, value) {
            tracing::warn!("Failed to update derived state '{}': {}", path, err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StoreConfig;
    use std::cell::RefCell;

    fn scheduler() -> (Rc<StateStore>, Rc<EventBus>, TickScheduler) {
        let store = Rc::new(StateStore::new(StoreConfig::default()));
        let bus = Rc::new(EventBus::new());
        let scheduler = TickScheduler::new(store.clone(), bus.clone(), SchedulerConfig::default());
        (store, bus, scheduler)
    }

    #[test]
    fn test_stopped_scheduler_does_nothing() {
        let (_store, bus, scheduler) = scheduler();
        bus.queue_event("e", None);
        assert!(!scheduler.tick());
        assert_eq!(bus.pending(), 1);
        assert_eq!(scheduler.frame_count(), 0);
    }

    #[test]
    fn test_first_tick_skips_fps() {
        let (store, _bus, scheduler) = scheduler();
        scheduler.start();
        assert!(scheduler.tick_at(Instant::now()));
        assert_eq!(scheduler.delta_time(), 0.0);
        assert_eq!(scheduler.fps(), 0.0);
        assert_eq!(store.get("app.performance.fps"), Some(0.into()));
    }

    #[test]
    fn test_fps_from_delta() {
        let (store, _bus, scheduler) = scheduler();
        let t0 = Instant::now();
        scheduler.start();
        scheduler.tick_at(t0);
        scheduler.tick_at(t0 + Duration::from_millis(20));

        assert!((scheduler.delta_time() - 0.02).abs() < 1e-9);
        assert!((scheduler.fps() - 50.0).abs() < 1e-6);
        assert_eq!(store.get("app.performance.fps"), Some(50.into()));
        // Derived writes do not pollute undo history
        assert_eq!(store.history_len(), 0);
    }

    #[test]
    fn test_tick_order_drain_before_callbacks() {
        let (_store, bus, scheduler) = scheduler();
        let order = Rc::new(RefCell::new(Vec::new()));

        let o = order.clone();
        bus.on("queued", move |_| o.borrow_mut().push("event"));
        let o = order.clone();
        scheduler.add_tick_callback(move |_| o.borrow_mut().push("callback"));

        bus.queue_event("queued", None);
        scheduler.start();
        scheduler.tick();
        assert_eq!(*order.borrow(), vec!["event", "callback"]);
    }

    #[test]
    fn test_callbacks_receive_delta() {
        let (_store, _bus, scheduler) = scheduler();
        let deltas = Rc::new(RefCell::new(Vec::new()));
        let d = deltas.clone();
        let id = scheduler.add_tick_callback(move |dt| d.borrow_mut().push(dt));

        let t0 = Instant::now();
        scheduler.start();
        scheduler.tick_at(t0);
        scheduler.tick_at(t0 + Duration::from_millis(500));
        assert_eq!(*deltas.borrow(), vec![0.0, 0.5]);

        assert!(scheduler.remove_tick_callback(id));
        scheduler.tick_at(t0 + Duration::from_millis(600));
        assert_eq!(deltas.borrow().len(), 2);
    }

    #[test]
    fn test_callback_removed_mid_frame_does_not_run() {
        let (_store, _bus, scheduler) = scheduler();
        let scheduler = Rc::new(scheduler);
        let weak = Rc::downgrade(&scheduler);
        let target: Rc<Cell<Option<TickCallbackId>>> = Rc::new(Cell::new(None));
        let fired = Rc::new(Cell::new(0));

        let t = target.clone();
        scheduler.add_tick_callback(move |_| {
            if let (Some(scheduler), Some(id)) = (weak.upgrade(), t.get()) {
                scheduler.remove_tick_callback(id);
            }
        });
        let f = fired.clone();
        target.set(Some(scheduler.add_tick_callback(move |_| f.set(f.get() + 1))));

        scheduler.start();
        scheduler.tick();
        assert_eq!(fired.get(), 0);
        assert_eq!(scheduler.callback_count(), 1);
    }

    #[test]
    fn test_pose_source_updates_user() {
        struct FixedPose;
        impl PoseSource for FixedPose {
            fn pose(&self) -> Option<CameraPose> {
                Some(CameraPose {
                    position: Vec3::new(1.0, 1.6, -3.0),
                    rotation: Vec3::new(0.0, 90.0, 0.0),
                })
            }
        }

        let (store, _bus, scheduler) = scheduler();
        scheduler.set_pose_source(FixedPose);
        scheduler.start();
        scheduler.tick();

        assert_eq!(store.get("user.position.y"), Some(1.6.into()));
        assert_eq!(store.get("user.rotation.y"), Some(90.0.into()));
    }

    #[test]
    fn test_callback_can_stop_run() {
        let (_store, _bus, scheduler) = scheduler();
        let scheduler = Rc::new(scheduler);
        let weak = Rc::downgrade(&scheduler);
        let seen = Rc::new(Cell::new(0));

        let s = seen.clone();
        scheduler.add_tick_callback(move |_| {
            s.set(s.get() + 1);
            if s.get() == 3 {
                if let Some(scheduler) = weak.upgrade() {
                    scheduler.stop();
                }
            }
        });

        let frames = scheduler.run(Some(100));
        assert_eq!(frames, 3);
        assert!(!scheduler.is_running());
        // No automatic restart
        assert!(!scheduler.tick());
        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn test_run_respects_frame_budget() {
        let config = SchedulerConfig { target_fps: 1000 };
        let store = Rc::new(StateStore::new(StoreConfig::default()));
        let scheduler = TickScheduler::new(store, Rc::new(EventBus::new()), config);
        assert_eq!(scheduler.run(Some(5)), 5);
        assert!(scheduler.is_running());
        assert_eq!(scheduler.frame_count(), 5);
    }
}
