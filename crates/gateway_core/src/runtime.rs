//! Gateway Runtime
//!
//! The runtime that wires the state store, event bus and tick scheduler
//! together. Instances are constructed explicitly and handed to whatever
//! needs them; nothing here is process-global.

use crate::config::{SchedulerConfig, StoreConfig};
use crate::events::{names, EventBus};
use crate::scheduler::TickScheduler;
use crate::store::{StateStore, StoreStats};
use crate::value::StateValue;
use std::rc::{Rc, Weak};

/// The gateway runtime - owns the state store, event bus and frame loop
pub struct GatewayRuntime {
    pub store: Rc<StateStore>,
    pub events: Rc<EventBus>,
    pub scheduler: TickScheduler,
}

impl GatewayRuntime {
    /// Create a runtime around an in-memory store
    pub fn new(store_config: StoreConfig, scheduler_config: SchedulerConfig) -> Self {
        Self::with_store(StateStore::new(store_config), scheduler_config)
    }

    /// Create a runtime around an existing (possibly persisted) store
    pub fn with_store(store: StateStore, scheduler_config: SchedulerConfig) -> Self {
        let store = Rc::new(store);
        let events = Rc::new(EventBus::new());
        let scheduler = TickScheduler::new(store.clone(), events.clone(), scheduler_config);

        let runtime = Self {
            store,
            events,
            scheduler,
        };
        runtime.wire_state_events();
        runtime.wire_vr_events();
        runtime
    }

    /// `state-changed {path, value}` writes `value` at `path`
    fn wire_state_events(&self) {
        let store = Rc::downgrade(&self.store);
        self.events.on(names::STATE_CHANGED, move |data| {
            let Some(store) = store.upgrade() else {
                return;
            };
            let Some(map) = data.and_then(StateValue::as_map) else {
                tracing::warn!("Ignoring '{}' without a payload", names::STATE_CHANGED);
                return;
            };
            let Some(path) = map.get("path").and_then(StateValue::as_str) else {
                tracing::warn!("Ignoring '{}' without a path", names::STATE_CHANGED);
                return;
            };
            let value = map.get("value").cloned().unwrap_or_default();
            if let Err(err) = store.set(path, value) {
                tracing::warn!("Failed to apply '{}': {}", names::STATE_CHANGED, err);
            }
        });
    }

    fn wire_vr_events(&self) {
        for (event, vr_mode) in [(names::ENTER_VR, true), (names::EXIT_VR, false)] {
            let store = Rc::downgrade(&self.store);
            let events = Rc::downgrade(&self.events);
            self.events
                .on(event, move |_| set_vr_mode(&store, &events, vr_mode));
        }
    }

    /// Tick the frame loop once (starting it if necessary)
    pub fn tick(&self) -> bool {
        self.scheduler.start();
        self.scheduler.tick()
    }

    /// Get statistics about the runtime
    pub fn stats(&self) -> RuntimeStats {
        RuntimeStats {
            store: self.store.stats(),
            queued_events: self.events.pending(),
            tick_callbacks: self.scheduler.callback_count(),
            frame_count: self.scheduler.frame_count(),
        }
    }
}

impl Default for GatewayRuntime {
    fn default() -> Self {
        Self::new(StoreConfig::default(), SchedulerConfig::default())
    }
}

fn set_vr_mode(store: &Weak<StateStore>, events: &Weak<EventBus>, vr_mode: bool) {
    let (Some(store), Some(events)) = (store.upgrade(), events.upgrade()) else {
        return;
    };

    let device = if vr_mode { "vr" } else { "desktop" };
    let result = store
        .update([
            ("user.vrMode", StateValue::from(vr_mode)),
            ("user.deviceType", device.into()),
        ]);
    if let Err(err) = result {
        tracing::warn!("Failed to record VR mode: {}", err);
        return;
    }

    let mode = if vr_mode { "enter" } else { "exit" };
    events.emit(
        names::VR_MODE_CHANGED,
        Some(StateValue::from_pairs([("mode", mode)])),
    );
}

/// Statistics about the runtime
#[derive(Debug, Clone)]
pub struct RuntimeStats {
    pub store: StoreStats,
    pub queued_events: usize,
    pub tick_callbacks: usize,
    pub frame_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn test_runtime_integration() {
        let runtime = GatewayRuntime::default();

        // Queued state events apply on the next tick, not before
        runtime.events.queue_event(
            names::STATE_CHANGED,
            Some(StateValue::from_pairs([
                ("path", StateValue::from("scene.currentLevel")),
                ("value", "observatory".into()),
            ])),
        );
        assert_eq!(runtime.store.get("scene.currentLevel"), Some(StateValue::Null));

        assert!(runtime.tick());
        assert_eq!(runtime.store.get("scene.currentLevel"), Some("observatory".into()));

        let stats = runtime.stats();
        assert_eq!(stats.queued_events, 0);
        assert_eq!(stats.frame_count, 1);
        assert_eq!(stats.store.history_len, 1);
    }

    #[test]
    fn test_enter_and_exit_vr() {
        let runtime = GatewayRuntime::default();
        let modes = Rc::new(RefCell::new(Vec::new()));
        let m = modes.clone();
        runtime.events.on(names::VR_MODE_CHANGED, move |data| {
            let mode = data
                .and_then(StateValue::as_map)
                .and_then(|m| m.get("mode"))
                .and_then(StateValue::as_str)
                .map(str::to_string);
            m.borrow_mut().extend(mode);
        });

        runtime.events.emit(names::ENTER_VR, None);
        assert_eq!(runtime.store.get("user.vrMode"), Some(true.into()));
        assert_eq!(runtime.store.get("user.deviceType"), Some("vr".into()));

        runtime.events.emit(names::EXIT_VR, None);
        assert_eq!(runtime.store.get("user.vrMode"), Some(false.into()));
        assert_eq!(runtime.store.get("user.deviceType"), Some("desktop".into()));

        assert_eq!(*modes.borrow(), vec!["enter", "exit"]);
    }

    #[test]
    fn test_malformed_state_event_is_ignored() {
        let runtime = GatewayRuntime::default();
        runtime.events.emit(names::STATE_CHANGED, None);
        runtime
            .events
            .emit(names::STATE_CHANGED, Some(StateValue::from_pairs([("value", 1)])));
        assert_eq!(runtime.store.history_len(), 0);
    }
}
