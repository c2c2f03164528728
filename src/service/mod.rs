//! Async facade over a shared store
//!
//! `SharedStateStore` is the handle workflow and orchestration services are
//! given. It wraps one `StateStore` behind a single mutex, so the whole
//! merge → log → notify → save sequence of a mutation is atomic with respect
//! to other callers. Mutations run on tokio's blocking pool because they may
//! write the store file.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::error;

use crate::error::StoreResult;
use crate::notify::ChangeMessage;
use crate::store::{StateStore, StateStoreConfig};
use crate::types::{ChangeContext, HistoryFilter, State, StateChange};

/// Cloneable, thread-safe handle to a `StateStore`
#[derive(Clone)]
pub struct SharedStateStore {
    inner: Arc<Mutex<StateStore>>,
}

impl SharedStateStore {
    pub fn new(store: StateStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
        }
    }

    pub fn with_config(config: StateStoreConfig) -> Self {
        Self::new(StateStore::with_config(config))
    }

    /// Lock the store for direct synchronous access
    ///
    /// Do not hold the guard across an `.await`. The mutex is not reentrant
    /// and stays held while listeners run, so listeners must not call back
    /// into this handle.
    pub fn lock(&self) -> MutexGuard<'_, StateStore> {
        self.inner.lock()
    }

    /// Run `f` against the store on the blocking pool
    async fn run_blocking<T, F>(&self, op: &'static str, f: F) -> Option<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut StateStore) -> T + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        let task = tokio::task::spawn_blocking(move || {
            let mut store = inner.lock();
            f(&mut *store)
        });
        match task.await {
            Ok(value) => Some(value),
            Err(e) => {
                error!(op = %op, error = %e, "state store task failed");
                None
            }
        }
    }

    /// Set `state[entity_id] = value` (merging objects); returns success
    pub async fn set_state(
        &self,
        entity_id: &str,
        value: Value,
        entity_type: Option<&str>,
        actor: Option<&str>,
    ) -> bool {
        let entity_id = entity_id.to_string();
        let mut ctx = ChangeContext::new().entity_id(entity_id.as_str());
        ctx.entity_type = entity_type.map(str::to_string);
        ctx.actor = actor.map(str::to_string);

        self.run_blocking("set_state", move |store| {
            let mut updates = State::new();
            updates.insert(entity_id, value);
            store.update_state(updates, ctx);
        })
        .await
        .is_some()
    }

    /// Remove `state[entity_id]`; returns success
    pub async fn delete_entity_state(&self, entity_id: &str, actor: Option<&str>) -> bool {
        let entity_id = entity_id.to_string();
        let mut ctx = ChangeContext::new().entity_id(entity_id.as_str());
        ctx.actor = actor.map(str::to_string);

        self.run_blocking("delete_entity_state", move |store| {
            store.delete_state(&[entity_id], ctx);
        })
        .await
        .is_some()
    }

    /// Entries whose key starts with `prefix` (all entries when `None`)
    ///
    /// Runs on the blocking pool, since a concurrent mutation may hold the
    /// lock while it writes the store file. Empty if the task fails.
    pub async fn list_states(&self, prefix: Option<&str>) -> State {
        let prefix = prefix.map(str::to_string);
        self.run_blocking("list_states", move |store| {
            store
                .state
                .iter()
                .filter(|(key, _)| prefix.as_deref().map_or(true, |p| key.starts_with(p)))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect::<State>()
        })
        .await
        .unwrap_or_default()
    }

    /// Copy of `state[entity_id]`, if present
    pub fn get_state(&self, entity_id: &str) -> Option<Value> {
        self.inner.lock().state.get(entity_id).cloned()
    }

    pub fn get_history(&self, filter: &HistoryFilter) -> Vec<StateChange> {
        self.inner.lock().get_history(filter)
    }

    pub fn version(&self) -> String {
        self.inner.lock().version().to_string()
    }

    /// Migrate on the blocking pool; errors are returned, not swallowed
    pub async fn migrate_state(
        &self,
        target_version: &str,
        ctx: ChangeContext,
    ) -> Option<StoreResult<Vec<StateChange>>> {
        let target_version = target_version.to_string();
        self.run_blocking("migrate_state", move |store| {
            store.migrate_state(&target_version, ctx)
        })
        .await
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeMessage> {
        self.inner.lock().subscribe()
    }
}

impl From<StateStore> for SharedStateStore {
    fn from(store: StateStore) -> Self {
        Self::new(store)
    }
}

impl std::fmt::Debug for SharedStateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.inner.try_lock() {
            Some(store) => f.debug_tuple("SharedStateStore").field(&*store).finish(),
            None => f.write_str("SharedStateStore(<locked>)"),
        }
    }
}
