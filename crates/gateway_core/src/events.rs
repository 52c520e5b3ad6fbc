//! Named-event bus with a deferred queue
//!
//! Listeners are kept per event name in registration order. Registering the
//! same closure twice yields two listeners that both fire. [`EventBus::emit`]
//! invokes listeners synchronously; a panicking listener is logged and does
//! not prevent the remaining listeners from running.
//!
//! [`EventBus::queue_event`] defers an event to the next [`EventBus::drain`],
//! which the tick scheduler calls once per frame. A drain only processes the
//! events queued before it started, so a listener that queues an event during
//! a drain cannot spin the same frame forever.

use crate::guard::run_guarded;
use crate::value::StateValue;
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// Event names shared between the runtime, the voice commands and the scene
pub mod names {
    /// Immersive mode was entered
    pub const ENTER_VR: &str = "enter-vr";
    /// Immersive mode was exited
    pub const EXIT_VR: &str = "exit-vr";
    /// Emitted after `user.vrMode` changed, carries `{mode: "enter" | "exit"}`
    pub const VR_MODE_CHANGED: &str = "vr-mode-changed";
    /// Request to write state, carries `{path, value}`
    pub const STATE_CHANGED: &str = "state-changed";
    pub const DEVICE_CONNECTED: &str = "device-connected";
    pub const DEVICE_DISCONNECTED: &str = "device-disconnected";
    /// Return the camera to its starting pose
    pub const RESET_POSITION: &str = "reset-position";
    pub const SHOW_HELP: &str = "show-help";
    /// Stop listening for voice commands
    pub const VOICE_STOP: &str = "voice-stop";
    /// Navigate to a portal, carries the portal name
    pub const NAVIGATE_PORTAL: &str = "navigate-portal";
}

new_key_type! {
    /// Unique identifier for an event listener
    pub struct ListenerId;
}

type Listener = Rc<dyn Fn(Option<&StateValue>)>;

/// An event waiting in the queue
#[derive(Debug, Clone, PartialEq)]
pub struct QueuedEvent {
    pub name: String,
    pub data: Option<StateValue>,
}

/// Synchronous pub/sub keyed by event name
#[derive(Default)]
pub struct EventBus {
    listeners: RefCell<SlotMap<ListenerId, Listener>>,
    events: RefCell<FxHashMap<String, SmallVec<[ListenerId; 4]>>>,
    queue: RefCell<VecDeque<QueuedEvent>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener for `event`
    pub fn on<F>(&self, event: &str, listener: F) -> ListenerId
    where
        F: Fn(Option<&StateValue>) + 'static,
    {
        let id = self.listeners.borrow_mut().insert(Rc::new(listener));
        self.events
            .borrow_mut()
            .entry(event.to_string())
            .or_default()
            .push(id);
        id
    }

    /// Remove a listener previously added for `event`
    pub fn off(&self, event: &str, id: ListenerId) -> bool {
        let mut events = self.events.borrow_mut();
        let Some(ids) = events.get_mut(event) else {
            return false;
        };
        let Some(pos) = ids.iter().position(|l| *l == id) else {
            return false;
        };

        ids.remove(pos);
        if ids.is_empty() {
            events.remove(event);
        }
        self.listeners.borrow_mut().remove(id);
        true
    }

    /// Invoke every listener of `event` in registration order
    ///
    /// Returns the number of listeners that completed without panicking.
    pub fn emit(&self, event: &str, data: Option<StateValue>) -> usize {
        let targets: Vec<(ListenerId, Listener)> = {
            let events = self.events.borrow();
            let listeners = self.listeners.borrow();
            match events.get(event) {
                Some(ids) => ids
                    .iter()
                    .filter_map(|id| listeners.get(*id).map(|l| (*id, Rc::clone(l))))
                    .collect(),
                None => return 0,
            }
        };

        let mut completed = 0;
        for (id, listener) in targets {
            if !self.listeners.borrow().contains_key(id) {
                continue;
            }
            let label = format!("Event handler for '{}'", event);
            if run_guarded(&label, || listener(data.as_ref())) {
                completed += 1;
            }
        }
        completed
    }

    /// Defer `event` to the next drain
    pub fn queue_event(&self, event: &str, data: Option<StateValue>) {
        self.queue.borrow_mut().push_back(QueuedEvent {
            name: event.to_string(),
            data,
        });
    }

    /// Emit the events that were queued when the drain started, oldest first
    ///
    /// Events queued by listeners during the drain stay queued for the next
    /// drain. Returns the number of events emitted.
    pub fn drain(&self) -> usize {
        let count = self.queue.borrow().len();
        for _ in 0..count {
            let next = self.queue.borrow_mut().pop_front();
            let Some(event) = next else {
                break;
            };
            self.emit(&event.name, event.data);
        }
        count
    }

    /// Number of events waiting for the next drain
    pub fn pending(&self) -> usize {
        self.queue.borrow().len()
    }

    pub fn listener_count(&self, event: &str) -> usize {
        self.events.borrow().get(event).map_or(0, |ids| ids.len())
    }

    /// Event names that currently have listeners
    pub fn event_names(&self) -> Vec<String> {
        self.events.borrow().keys().cloned().collect()
    }

    /// Drop all listeners and queued events
    pub fn clear(&self) {
        self.events.borrow_mut().clear();
        self.listeners.borrow_mut().clear();
        self.queue.borrow_mut().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};

    #[test]
    fn test_emit_in_registration_order() {
        let bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));

        for n in 0..3 {
            let order = order.clone();
            bus.on("tick", move |_| order.borrow_mut().push(n));
        }

        assert_eq!(bus.emit("tick", None), 3);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn test_duplicate_listeners_fire_twice() {
        let bus = EventBus::new();
        let count = Rc::new(Cell::new(0));
        let listener = {
            let count = count.clone();
            move |_: Option<&StateValue>| count.set(count.get() + 1)
        };

        let first = bus.on("ping", listener.clone());
        bus.on("ping", listener);
        bus.emit("ping", None);
        assert_eq!(count.get(), 2);

        assert!(bus.off("ping", first));
        bus.emit("ping", None);
        assert_eq!(count.get(), 3);
        assert!(!bus.off("ping", first));
    }

    #[test]
    fn test_emit_passes_data() {
        let bus = EventBus::new();
        let seen = Rc::new(RefCell::new(None));
        let s = seen.clone();
        bus.on(names::NAVIGATE_PORTAL, move |data| {
            *s.borrow_mut() = data.cloned();
        });

        bus.emit(names::NAVIGATE_PORTAL, Some("education".into()));
        assert_eq!(*seen.borrow(), Some(StateValue::from("education")));
    }

    #[test]
    fn test_panicking_listener_is_isolated() {
        let bus = EventBus::new();
        let reached = Rc::new(Cell::new(false));

        bus.on("boom", |_| panic!("listener failed"));
        let r = reached.clone();
        bus.on("boom", move |_| r.set(true));

        assert_eq!(bus.emit("boom", None), 1);
        assert!(reached.get());
    }

    #[test]
    fn test_listener_removed_mid_emit_does_not_fire() {
        let bus = Rc::new(EventBus::new());
        let fired = Rc::new(Cell::new(false));

        let victim = Rc::new(Cell::new(None));
        let b = Rc::downgrade(&bus);
        let v = victim.clone();
        bus.on("e", move |_| {
            if let (Some(bus), Some(id)) = (b.upgrade(), v.get()) {
                bus.off("e", id);
            }
        });
        let f = fired.clone();
        victim.set(Some(bus.on("e", move |_| f.set(true))));

        bus.emit("e", None);
        assert!(!fired.get());
        assert_eq!(bus.listener_count("e"), 1);
    }

    #[test]
    fn test_queue_drains_fifo() {
        let bus = EventBus::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        for name in ["a", "b"] {
            let order = order.clone();
            bus.on(name, move |data| {
                order.borrow_mut().push(data.and_then(|d| d.as_f64()).unwrap_or(-1.0));
            });
        }

        bus.queue_event("a", Some(1.into()));
        bus.queue_event("b", Some(2.into()));
        bus.queue_event("a", Some(3.into()));
        assert!(order.borrow().is_empty());

        assert_eq!(bus.drain(), 3);
        assert_eq!(*order.borrow(), vec![1.0, 2.0, 3.0]);
        assert_eq!(bus.pending(), 0);
    }

    #[test]
    fn test_events_queued_during_drain_wait_for_next_drain() {
        let bus = Rc::new(EventBus::new());
        let count = Rc::new(Cell::new(0));

        let b = Rc::downgrade(&bus);
        let c = count.clone();
        bus.on("again", move |_| {
            c.set(c.get() + 1);
            if let Some(bus) = b.upgrade() {
                bus.queue_event("again", None);
            }
        });

        bus.queue_event("again", None);
        assert_eq!(bus.drain(), 1);
        assert_eq!(count.get(), 1);
        assert_eq!(bus.pending(), 1);

        assert_eq!(bus.drain(), 1);
        assert_eq!(count.get(), 2);
    }

    #[test]
    fn test_off_last_listener_removes_event() {
        let bus = EventBus::new();
        let id = bus.on("solo", |_| {});
        assert_eq!(bus.event_names(), vec!["solo".to_string()]);
        bus.off("solo", id);
        assert!(bus.event_names().is_empty());
    }
}
