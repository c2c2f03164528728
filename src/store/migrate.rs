//! Version migration for the state store
//!
//! `migrate_state` resolves the shortest path through the migration graph
//! and applies each edge in turn. There is no rollback: when an edge fails,
//! the edges before it stay applied and the store's version is left at the
//! last version reached. Callers should re-read `version()` after an error.

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::{StoreError, StoreResult};
use crate::types::{ChangeContext, ChangeKind, StateChange};

use super::StateStore;

pub fn migrate_state(
    store: &mut StateStore,
    target_version: &str,
    ctx: ChangeContext,
) -> StoreResult<Vec<StateChange>> {
    if store.version == target_version {
        return Ok(Vec::new());
    }

    let start_version = store.version.clone();
    let path = store
        .migrations
        .find_path(&start_version, target_version)
        .ok_or_else(|| StoreError::NoMigrationPath {
            from: start_version.clone(),
            to: target_version.to_string(),
        })?;

    debug!(
        from = %start_version,
        to = %target_version,
        steps = path.len(),
        "resolved migration path"
    );

    let mut changes = Vec::with_capacity(path.len());
    for (source, target) in path {
        let migration = store.migrations.get_mut(&source, &target).ok_or_else(|| {
            StoreError::NoMigrationPath {
                from: source.clone(),
                to: target.clone(),
            }
        })?;

        let previous = store.state.clone();
        let outcome = migration.apply(previous.clone());
        let migration_id = migration.id.clone();
        let description = migration.description.clone();

        let next = match outcome {
            Ok(next) => next,
            Err(cause) => {
                warn!(
                    migration_id = %migration_id,
                    from = %source,
                    to = %target,
                    reached = %store.version,
                    error = %cause,
                    "migration step failed"
                );
                return Err(StoreError::MigrationFailed {
                    from_version: source,
                    to_version: target,
                    migration_id,
                    cause,
                });
            }
        };

        store.state = next;
        store.version = target.clone();

        let mut edge_ctx = ctx.clone();
        edge_ctx.metadata.insert("source_version".to_string(), Value::from(source.as_str()));
        edge_ctx.metadata.insert("target_version".to_string(), Value::from(target.as_str()));
        edge_ctx.metadata.insert("migration_id".to_string(), Value::from(migration_id.as_str()));
        edge_ctx.metadata.insert("description".to_string(), Value::from(description));

        let change = StateChange::new(
            ChangeKind::Migrate,
            edge_ctx,
            previous,
            store.state.clone(),
            target.as_str(),
        );
        debug!(change_id = %change.id, from = %source, to = %target, "migration step applied");
        changes.push(store.commit(change));
    }

    info!(
        from = %start_version,
        to = %target_version,
        steps = changes.len(),
        "state migrated"
    );
    Ok(changes)
}
