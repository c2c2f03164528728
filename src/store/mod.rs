//! State Store - core data engine
//!
//! The store owns the current state, the append-only change log and the
//! migration graph. Every mutation follows the same sequence:
//!
//! ```text
//! ┌──────────────┐    ┌──────────────┐    ┌──────────────────┐    ┌────────────┐
//! │ apply to     │───►│ append to    │───►│ notify listeners │───►│ save (if   │
//! │ in-mem state │    │ change log   │    │ + broadcast feed │    │ configured)│
//! └──────────────┘    └──────────────┘    └──────────────────┘    └────────────┘
//! ```
//!
//! `StateStore` has no internal locking: mutating methods take `&mut self`.
//! Share a store between threads or tasks through
//! [`SharedStateStore`](crate::service::SharedStateStore).

mod config;
mod graph;
mod history;
mod migrate;
mod mutation;

use std::collections::VecDeque;
use std::path::Path;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{debug, info, warn};

pub use config::{StateStoreConfig, DEFAULT_BROADCAST_CAPACITY, DEFAULT_VERSION};
pub use graph::{MigrationGraph, MigrationStep};
pub use mutation::merge_updates;

use crate::error::{ListenerError, StoreResult};
use crate::notify::{ChangeBroadcaster, ChangeMessage, ListenerId, ListenerRegistry};
use crate::persistence::{load_document, save_document, StateDocument};
use crate::types::{ChangeContext, HistoryFilter, State, StateChange, StateMigration, TransformFn};
use crate::utils::cleanup_temp_file;

/// Versioned in-memory state store
pub struct StateStore {
    pub(crate) config: StateStoreConfig,
    pub(crate) state: State,
    pub(crate) version: String,
    pub(crate) history: VecDeque<StateChange>,
    pub(crate) migrations: MigrationGraph,
    pub(crate) listeners: ListenerRegistry,
    pub(crate) broadcaster: ChangeBroadcaster,
}

impl StateStore {
    /// Create a store from an initial state and config
    ///
    /// When the config names a storage file that exists, its state and
    /// version replace the initial values. A file that cannot be read is
    /// logged and ignored.
    pub fn new(initial_state: State, config: StateStoreConfig) -> Self {
        let mut store = Self {
            state: initial_state,
            version: config.initial_version.clone(),
            history: VecDeque::new(),
            migrations: MigrationGraph::new(),
            listeners: ListenerRegistry::new(),
            broadcaster: ChangeBroadcaster::new(config.broadcast_capacity),
            config,
        };
        store.load();
        store
    }

    /// Empty store with the given config
    pub fn with_config(config: StateStoreConfig) -> Self {
        Self::new(State::new(), config)
    }

    /// Empty, in-memory store at the default version
    pub fn in_memory() -> Self {
        Self::with_config(StateStoreConfig::in_memory())
    }

    /// Store configured from `STATE_STORE_*` environment variables
    pub fn from_env() -> Self {
        Self::with_config(StateStoreConfig::from_env())
    }

    fn load(&mut self) {
        let Some(path) = self.config.storage_path.clone() else {
            return;
        };

        match cleanup_temp_file(&path) {
            Ok(true) => warn!(path = %path.display(), "removed leftover temp file"),
            Ok(false) => {}
            Err(e) => warn!(path = %path.display(), error = %e, "failed to remove temp file"),
        }

        match load_document(&path) {
            Ok(Some(document)) => {
                self.state = document.state;
                self.version = document.version;
                info!(
                    path = %path.display(),
                    version = %self.version,
                    keys = self.state.len(),
                    "loaded state store"
                );
            }
            Ok(None) => {
                debug!(path = %path.display(), "no stored state, starting fresh");
            }
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to load stored state, using initial state"
                );
            }
        }
    }

    /// Write the store to its configured file
    ///
    /// Failures are logged, not returned. Returns whether a document was
    /// written; always `false` for in-memory stores.
    pub fn save(&self) -> bool {
        let Some(path) = self.config.storage_path() else {
            return false;
        };

        let document = StateDocument::new(self.state.clone(), self.version.clone());
        match save_document(path, &document) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to save state store");
                false
            }
        }
    }

    /// Record a committed change: log, notify, broadcast, persist
    pub(crate) fn commit(&mut self, change: StateChange) -> StateChange {
        history::record(self, change.clone());
        self.listeners.notify(&change);
        self.broadcaster.broadcast(&change);
        if self.config.storage_path.is_some() {
            self.save();
        }
        change
    }

    pub fn config(&self) -> &StateStoreConfig {
        &self.config
    }

    /// Current schema version label
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn storage_path(&self) -> Option<&Path> {
        self.config.storage_path()
    }

    /// Copy of the whole state
    pub fn get_state(&self) -> State {
        self.state.clone()
    }

    /// Copy of `state[entity_id]`, or an empty object when absent
    pub fn get_entity_state(&self, entity_id: &str) -> Value {
        self.state
            .get(entity_id)
            .cloned()
            .unwrap_or_else(|| Value::Object(State::new()))
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.state.contains_key(key)
    }
}

// Mutation, migration, listener and history operations
impl StateStore {
    /// Merge `updates` into the state
    ///
    /// Where both the existing and new values are objects the new object is
    /// shallow-merged over the old one; any other value replaces the key.
    pub fn update_state(&mut self, updates: State, ctx: ChangeContext) -> StateChange {
        mutation::update_state(self, updates, ctx)
    }

    /// Remove top-level keys; absent keys are ignored
    pub fn delete_state<K: AsRef<str>>(&mut self, keys: &[K], ctx: ChangeContext) -> StateChange {
        mutation::delete_state(self, keys, ctx)
    }

    /// Replace the whole state (empty when `None`)
    pub fn reset_state(&mut self, new_state: Option<State>, ctx: ChangeContext) -> StateChange {
        mutation::reset_state(self, new_state, ctx)
    }

    /// Register a migration edge; `None` transform is identity
    ///
    /// Registering the same `(source, target)` pair again replaces its
    /// description and transform. Returns a copy of the edge.
    pub fn register_migration(
        &mut self,
        source_version: &str,
        target_version: &str,
        description: &str,
        transform: Option<Arc<TransformFn>>,
    ) -> StateMigration {
        self.migrations
            .register(source_version, target_version, description, transform)
            .clone()
    }

    /// Move the state to `target_version` along the shortest migration path
    pub fn migrate_state(
        &mut self,
        target_version: &str,
        ctx: ChangeContext,
    ) -> StoreResult<Vec<StateChange>> {
        migrate::migrate_state(self, target_version, ctx)
    }

    /// Path `migrate_state` would take from `from` to `to`
    pub fn find_migration_path(&self, from: &str, to: &str) -> Option<Vec<MigrationStep>> {
        self.migrations.find_path(from, to)
    }

    /// Copy of one registered edge, including its counters
    pub fn migration(&self, source_version: &str, target_version: &str) -> Option<StateMigration> {
        self.migrations.get(source_version, target_version).cloned()
    }

    /// Copies of all registered edges
    pub fn migrations(&self) -> Vec<StateMigration> {
        self.migrations.all().into_iter().cloned().collect()
    }

    /// Register a listener for `entity_type`, or for every change when `None`
    ///
    /// Listeners run synchronously inside the mutation. Behind a
    /// [`SharedStateStore`](crate::service::SharedStateStore) that means the
    /// store mutex is held: a listener must read `change.new_state` rather
    /// than call back into the shared handle, which would deadlock.
    pub fn add_listener<F>(&mut self, entity_type: Option<&str>, callback: F) -> ListenerId
    where
        F: Fn(&StateChange) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.listeners.add(entity_type, callback)
    }

    pub fn remove_listener(&mut self, id: ListenerId) -> bool {
        self.listeners.remove(id)
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Receive every committed change from now on
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeMessage> {
        self.broadcaster.subscribe()
    }

    /// Like `subscribe`, as a `Stream`
    pub fn subscribe_stream(&self) -> BroadcastStream<ChangeMessage> {
        self.broadcaster.stream()
    }

    /// Matching change records, newest first
    pub fn get_history(&self, filter: &HistoryFilter) -> Vec<StateChange> {
        history::get_history(self, filter)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Keep only the newest `keep` records; returns how many were dropped
    pub fn prune_history(&mut self, keep: usize) -> usize {
        history::prune(self, keep)
    }
}

impl Default for StateStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl std::fmt::Debug for StateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateStore")
            .field("version", &self.version)
            .field("keys", &self.state.len())
            .field("history", &self.history.len())
            .field("migrations", &self.migrations.len())
            .field("listeners", &self.listeners.len())
            .field("storage_path", &self.config.storage_path)
            .finish()
    }
}
