//! Gateway state store - hierarchical application state with notifications
//!
//! The store owns a single [`StateValue`] tree addressed by dotted paths,
//! a bounded undo/redo [`History`], and a set of topic subscriptions.
//!
//! Every successful [`StateStore::set`]:
//!
//! 1. creates missing intermediate maps and overwrites the leaf
//! 2. records `{path, old, new}` in history
//! 3. notifies subscribers of `path`, then wildcard (`"*"`) subscribers
//! 4. persists a snapshot of the configured branches, if storage is attached
//!
//! The store is single-threaded and re-entrant: all methods take `&self`, and
//! no internal borrow is held while callbacks run, so a subscriber may read
//! and write the store it is subscribed to.
//!
//! # Example
//!
//! ```rust
//! use gateway_core::store::StateStore;
//! use gateway_core::StoreConfig;
//!
//! let store = StateStore::new(StoreConfig::default());
//!
//! store.set("user.name", "Ava").unwrap();
//! assert_eq!(store.get("user.name"), Some("Ava".into()));
//!
//! store.set("user.name", "Bo").unwrap();
//! store.undo();
//! assert_eq!(store.get("user.name"), Some("Ava".into()));
//! ```

use crate::config::StoreConfig;
use crate::error::{Result, StateError};
use crate::guard::run_guarded;
use crate::history::{History, HistoryEntry};
use crate::persist::StateStorage;
use crate::value::{default_tree, StateMap, StatePath, StateValue};
use rustc_hash::FxHashMap;
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;
use std::cell::RefCell;
use std::rc::Rc;

/// Topic that receives every write
pub const WILDCARD_TOPIC: &str = "*";

/// Topic that receives the summary notification of [`StateStore::update`]
pub const BATCH_TOPIC: &str = "batch";

new_key_type! {
    /// Unique identifier for a store subscription
    pub struct SubscriptionId;
}

/// A change delivered to subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct StateChange {
    /// Path that was written (`"batch"` for batch summaries, `"*"` for reset)
    pub path: String,
    /// New value, `None` if the path was removed
    pub value: Option<StateValue>,
    /// Previous value, `None` if the path did not exist
    pub old_value: Option<StateValue>,
}

type StateCallback = Rc<dyn Fn(&StateChange)>;

/// Handle for unsubscribing from store updates
#[derive(Debug)]
pub struct SubscriptionHandle {
    topic: String,
    id: SubscriptionId,
}

impl SubscriptionHandle {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }
}

#[derive(Default)]
struct Subscribers {
    callbacks: SlotMap<SubscriptionId, StateCallback>,
    topics: FxHashMap<String, SmallVec<[SubscriptionId; 4]>>,
}

impl Subscribers {
    fn collect(&self, topic: &str, out: &mut Vec<(SubscriptionId, StateCallback)>) {
        if let Some(ids) = self.topics.get(topic) {
            for id in ids {
                if let Some(cb) = self.callbacks.get(*id) {
                    out.push((*id, Rc::clone(cb)));
                }
            }
        }
    }
}

/// Statistics about the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    pub history_len: usize,
    pub history_index: Option<usize>,
    pub topic_count: usize,
    pub subscription_count: usize,
}

/// Hierarchical application state with history, subscriptions and persistence
pub struct StateStore {
    tree: RefCell<StateValue>,
    history: RefCell<History>,
    subscribers: RefCell<Subscribers>,
    storage: Option<Box<dyn StateStorage>>,
    config: StoreConfig,
}

impl StateStore {
    /// Create a store with the default tree and no persistence
    pub fn new(config: StoreConfig) -> Self {
        Self {
            tree: RefCell::new(default_tree()),
            history: RefCell::new(History::new(config.max_history)),
            subscribers: RefCell::new(Subscribers::default()),
            storage: None,
            config,
        }
    }

    /// Create a store backed by durable storage
    ///
    /// A snapshot previously written under the configured storage key is
    /// merged into the default tree via [`update`](Self::update). Hydration
    /// is not undoable: history is cleared afterwards. A missing or
    /// unreadable snapshot is logged and ignored.
    pub fn with_storage(config: StoreConfig, storage: Box<dyn StateStorage>) -> Self {
        let mut store = Self::new(config);
        store.storage = Some(storage);
        store.load_persisted();
        store
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The whole state tree
    pub fn get_root(&self) -> StateValue {
        self.tree.borrow().clone()
    }

    /// Read the value at `path`
    ///
    /// Returns `None` when a segment is missing, an intermediate node is not
    /// a map, or the path is malformed. Never panics.
    pub fn get(&self, path: &str) -> Option<StateValue> {
        match StatePath::parse(path) {
            Ok(path) => self.tree.borrow().lookup(&path).cloned(),
            Err(err) => {
                tracing::debug!("StateStore::get: {}", err);
                None
            }
        }
    }

    /// Whether a value exists at `path`
    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Write `value` at `path`, returning the written value
    ///
    /// Values holding NaN or an infinity fail with
    /// [`StateError::InvalidValue`] and leave the tree untouched.
    pub fn set(&self, path: &str, value: impl Into<StateValue>) -> Result<StateValue> {
        let path = StatePath::parse(path)?;
        let value = value.into();
        check_finite(&path, &value)?;

        let old_value = self.write(&path, Some(value.clone()))?;
        self.history.borrow_mut().record(HistoryEntry::new(
            path.as_str(),
            old_value.clone(),
            Some(value.clone()),
        ));

        self.notify(
            path.as_str(),
            StateChange {
                path: path.as_str().to_string(),
                value: Some(value.clone()),
                old_value,
            },
        );
        self.persist();

        Ok(value)
    }

    /// Write derived, read-only state such as the last-known camera pose
    ///
    /// Subscribers are notified as for [`set`](Self::set), but the write is
    /// not recorded in history and does not trigger persistence. Used by the
    /// tick scheduler, which refreshes these values every frame.
    pub fn set_derived(&self, path: &str, value: impl Into<StateValue>) -> Result<()> {
        let path = StatePath::parse(path)?;
        let value = value.into();
        check_finite(&path, &value)?;

        let old_value = self.write(&path, Some(value.clone()))?;
        if old_value.as_ref() == Some(&value) {
            return Ok(());
        }
        self.notify(
            path.as_str(),
            StateChange {
                path: path.as_str().to_string(),
                value: Some(value),
                old_value,
            },
        );
        Ok(())
    }

    /// Apply several writes in iteration order, then send one batch summary
    ///
    /// Each write notifies its own subscribers as usual. Afterwards the
    /// `"batch"` topic and wildcard subscribers receive a single change whose
    /// `value` maps every path to its new value and whose `old_value` maps it
    /// to its previous value (`null` if absent). Stops at the first failing
    /// write; earlier writes stay applied and no summary is sent.
    pub fn update<K, V, I>(&self, updates: I) -> Result<()>
    where
        K: AsRef<str>,
        V: Into<StateValue>,
        I: IntoIterator<Item = (K, V)>,
    {
        let mut old_values = StateMap::new();
        let mut new_values = StateMap::new();

        for (path, value) in updates {
            let path = path.as_ref();
            let previous = self.get(path).unwrap_or_default();
            let written = self.set(path, value)?;
            old_values.insert(path.to_string(), previous);
            new_values.insert(path.to_string(), written);
        }

        self.notify(
            BATCH_TOPIC,
            StateChange {
                path: BATCH_TOPIC.to_string(),
                value: Some(StateValue::Map(new_values)),
                old_value: Some(StateValue::Map(old_values)),
            },
        );
        Ok(())
    }

    /// Subscribe to changes on `topic` (a state path, `"batch"` or `"*"`)
    ///
    /// Subscribing the same callback twice creates two independent
    /// subscriptions.
    pub fn subscribe<F>(&self, topic: &str, callback: F) -> SubscriptionHandle
    where
        F: Fn(&StateChange) + 'static,
    {
        let mut subscribers = self.subscribers.borrow_mut();
        let id = subscribers.callbacks.insert(Rc::new(callback));
        subscribers
            .topics
            .entry(topic.to_string())
            .or_default()
            .push(id);

        SubscriptionHandle {
            topic: topic.to_string(),
            id,
        }
    }

    /// Remove exactly the subscription behind `handle`
    ///
    /// The topic entry is dropped once its last subscription is removed.
    /// Returns `false` if the subscription was already gone.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let mut subscribers = self.subscribers.borrow_mut();
        if subscribers.callbacks.remove(handle.id).is_none() {
            return false;
        }

        if let Some(ids) = subscribers.topics.get_mut(&handle.topic) {
            ids.retain(|id| *id != handle.id);
            if ids.is_empty() {
                subscribers.topics.remove(&handle.topic);
            }
        }
        true
    }

    /// Number of topics with at least one subscription
    pub fn topic_count(&self) -> usize {
        self.subscribers.borrow().topics.len()
    }

    /// Revert the most recently applied history entry
    ///
    /// The revert is observable as a normal write (subscribers are notified
    /// and a snapshot is persisted) but it only moves the history cursor; it
    /// does not append a new entry.
    pub fn undo(&self) -> bool {
        let entry = self.history.borrow_mut().undo().cloned();
        match entry {
            Some(entry) => {
                if self.apply(&entry.path, entry.old_value, entry.new_value) {
                    true
                } else {
                    self.history.borrow_mut().redo();
                    false
                }
            }
            None => false,
        }
    }

    /// Re-apply the most recently undone history entry
    pub fn redo(&self) -> bool {
        let entry = self.history.borrow_mut().redo().cloned();
        match entry {
            Some(entry) => {
                if self.apply(&entry.path, entry.new_value, entry.old_value) {
                    true
                } else {
                    self.history.borrow_mut().undo();
                    false
                }
            }
            None => false,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.borrow().can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.borrow().can_redo()
    }

    /// Index of the most recently applied history entry
    pub fn history_index(&self) -> Option<usize> {
        self.history.borrow().index()
    }

    pub fn history_len(&self) -> usize {
        self.history.borrow().len()
    }

    /// A copy of the recorded history, oldest first
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.borrow().entries().cloned().collect()
    }

    /// Replace the tree with the default tree and clear history
    ///
    /// Sends one wildcard notification carrying the full new tree and no
    /// previous value.
    pub fn reset(&self) {
        let tree = default_tree();
        *self.tree.borrow_mut() = tree.clone();
        self.history.borrow_mut().clear();

        self.notify(
            WILDCARD_TOPIC,
            StateChange {
                path: WILDCARD_TOPIC.to_string(),
                value: Some(tree),
                old_value: None,
            },
        );
        tracing::info!("State reset to initial values");
    }

    /// Serialize the full tree as pretty-printed JSON
    pub fn export(&self) -> Result<String> {
        serde_json::to_string_pretty(&*self.tree.borrow())
            .map_err(|e| StateError::Serialization(e.to_string()))
    }

    /// Parse serialized state and apply it through [`update`](Self::update)
    /// over its top-level keys
    ///
    /// Malformed input, including a top-level key that is not a single valid
    /// path segment, fails with [`StateError::Deserialization`] and leaves the
    /// tree untouched.
    pub fn import(&self, serialized: &str) -> Result<()> {
        let entries = match parse_top_level(serialized) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::error!("Failed to import state: {}", err);
                return Err(err);
            }
        };

        self.update(entries)?;
        tracing::info!("State imported successfully");
        Ok(())
    }

    /// Remove the persisted snapshot, if storage is attached
    pub fn clear_persisted(&self) {
        if let Some(storage) = &self.storage {
            match storage.remove(&self.config.storage_key) {
                Ok(()) => tracing::info!("Persisted state cleared"),
                Err(err) => tracing::warn!("Failed to clear persisted state: {}", err),
            }
        }
    }

    /// Get statistics about the store
    pub fn stats(&self) -> StoreStats {
        let history = self.history.borrow();
        let subscribers = self.subscribers.borrow();
        StoreStats {
            history_len: history.len(),
            history_index: history.index(),
            topic_count: subscribers.topics.len(),
            subscription_count: subscribers.callbacks.len(),
        }
    }

    /// Write without recording history; used by undo/redo
    fn apply(
        &self,
        path: &str,
        value: Option<StateValue>,
        expected_old: Option<StateValue>,
    ) -> bool {
        let parsed = match StatePath::parse(path) {
            Ok(parsed) => parsed,
            Err(err) => {
                tracing::error!("History entry has invalid path: {}", err);
                return false;
            }
        };

        match self.write(&parsed, value.clone()) {
            Ok(old_value) => {
                if old_value != expected_old {
                    tracing::debug!("History apply on '{}' replaced an out-of-band value", path);
                }
                self.notify(
                    path,
                    StateChange {
                        path: path.to_string(),
                        value,
                        old_value,
                    },
                );
                self.persist();
                true
            }
            Err(err) => {
                tracing::error!("Failed to apply history entry: {}", err);
                false
            }
        }
    }

    /// Write (or remove, for `None`) the leaf at `path`, returning the old value
    fn write(&self, path: &StatePath, value: Option<StateValue>) -> Result<Option<StateValue>> {
        let mut tree = self.tree.borrow_mut();
        if !matches!(&*tree, StateValue::Map(_)) {
            *tree = StateValue::map();
        }

        let mut current = &mut *tree;
        for segment in path.parents() {
            let StateValue::Map(map) = current else {
                unreachable!("intermediate nodes are maps");
            };
            let node = map.entry(segment.clone()).or_insert_with(StateValue::map);
            if node.is_null() {
                *node = StateValue::map();
            }
            if !matches!(node, StateValue::Map(_)) {
                return Err(StateError::PathConflict {
                    path: path.as_str().to_string(),
                    segment: segment.clone(),
                });
            }
            current = node;
        }

        let StateValue::Map(map) = current else {
            unreachable!("intermediate nodes are maps");
        };
        Ok(match value {
            Some(value) => map.insert(path.leaf().to_string(), value),
            None => map.shift_remove(path.leaf()),
        })
    }

    /// Notify `topic` subscribers, then wildcard subscribers
    fn notify(&self, topic: &str, change: StateChange) {
        let mut targets = Vec::new();
        {
            let subscribers = self.subscribers.borrow();
            subscribers.collect(topic, &mut targets);
            if topic != WILDCARD_TOPIC {
                subscribers.collect(WILDCARD_TOPIC, &mut targets);
            }
        }

        for (id, callback) in targets {
            // Skip subscriptions removed by an earlier callback in this round
            if !self.subscribers.borrow().callbacks.contains_key(id) {
                continue;
            }
            run_guarded("State subscriber", || callback(&change));
        }
    }

    fn persist(&self) {
        let Some(storage) = &self.storage else {
            return;
        };

        let snapshot = {
            let tree = self.tree.borrow();
            let mut snapshot = StateMap::new();
            for branch in &self.config.persisted_branches {
                if let Some(value) = tree.as_map().and_then(|m| m.get(branch.as_str())) {
                    snapshot.insert(branch.clone(), value.clone());
                }
            }
            StateValue::Map(snapshot)
        };

        let result = serde_json::to_string(&snapshot)
            .map_err(|e| StateError::Serialization(e.to_string()))
            .and_then(|data| storage.save(&self.config.storage_key, &data));
        if let Err(err) = result {
            tracing::warn!("Failed to persist state: {}", err);
        }
    }

    fn load_persisted(&self) {
        let Some(storage) = &self.storage else {
            return;
        };

        let data = match storage.load(&self.config.storage_key) {
            Ok(Some(data)) => data,
            Ok(None) => return,
            Err(err) => {
                tracing::warn!("Failed to load persisted state: {}", err);
                return;
            }
        };

        match parse_top_level(&data).and_then(|entries| self.update(entries)) {
            Ok(()) => tracing::info!("Persisted state loaded"),
            Err(err) => tracing::warn!("Failed to load persisted state: {}", err),
        }
        self.history.borrow_mut().clear();
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(StoreConfig::default())
    }
}

fn check_finite(path: &StatePath, value: &StateValue) -> Result<()> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(StateError::InvalidValue {
            path: path.as_str().to_string(),
            reason: "numbers must be finite".to_string(),
        })
    }
}

fn parse_top_level(serialized: &str) -> Result<StateMap> {
    let value: StateValue = serde_json::from_str(serialized)
        .map_err(|e| StateError::Deserialization(e.to_string()))?;
    let map = match value {
        StateValue::Map(map) => map,
        _ => {
            return Err(StateError::Deserialization(
                "expected a mapping at the top level".to_string(),
            ))
        }
    };

    // Every key must be a single path segment so the writes cannot fail halfway
    for key in map.keys() {
        let path =
            StatePath::parse(key).map_err(|e| StateError::Deserialization(e.to_string()))?;
        if path.segments().len() != 1 {
            return Err(StateError::Deserialization(format!(
                "top-level key '{}' is not a single segment",
                key
            )));
        }
    }
    Ok(map)
}
