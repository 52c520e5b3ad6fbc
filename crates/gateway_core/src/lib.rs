//! Gateway Core Runtime
//!
//! Reactive state and event notification for the VR gateway:
//!
//! - **State Store**: hierarchical state addressed by dotted paths, with
//!   topic subscriptions, bounded undo/redo and optional persistence
//! - **Event Bus**: named synchronous events plus a deferred per-frame queue
//! - **Tick Scheduler**: the frame loop that refreshes derived state, drains
//!   queued events and runs per-frame callbacks
//!
//! # Example
//!
//! ```rust
//! use gateway_core::{events::names, GatewayRuntime, StateValue};
//!
//! let runtime = GatewayRuntime::default();
//!
//! let _sub = runtime.store.subscribe("user.vrMode", |change| {
//!     println!("vrMode is now {:?}", change.value);
//! });
//!
//! runtime.events.emit(names::ENTER_VR, None);
//! assert_eq!(runtime.store.get("user.vrMode"), Some(StateValue::Bool(true)));
//! ```

pub mod config;
pub mod error;
pub mod events;
mod guard;
pub mod history;
pub mod persist;
pub mod runtime;
pub mod scheduler;
pub mod store;
pub mod value;

pub use config::{SchedulerConfig, StoreConfig, DEFAULT_STORAGE_KEY};
pub use error::{Result, StateError};
pub use events::{EventBus, ListenerId, QueuedEvent};
pub use history::{History, HistoryEntry};
pub use persist::{FileStorage, MemoryStorage, StateStorage};
pub use runtime::{GatewayRuntime, RuntimeStats};
pub use scheduler::{CameraPose, PoseSource, TickCallbackId, TickScheduler, Vec3};
pub use store::{
    StateChange, StateStore, StoreStats, SubscriptionHandle, SubscriptionId, BATCH_TOPIC,
    WILDCARD_TOPIC,
};
pub use value::{default_tree, StateMap, StatePath, StateValue};
