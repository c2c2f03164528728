//! Mutation operations for the state store

use serde_json::Value;
use tracing::debug;

use crate::types::{ChangeContext, ChangeKind, State, StateChange};

use super::StateStore;

/// Merge `updates` into `state`
///
/// Objects on both sides are shallow-merged (keys missing from the update
/// survive); anything else replaces the existing value.
pub fn merge_updates(state: &mut State, updates: State) {
    for (key, value) in updates {
        match value {
            Value::Object(incoming) => match state.get_mut(&key) {
                Some(Value::Object(existing)) => existing.extend(incoming),
                _ => {
                    state.insert(key, Value::Object(incoming));
                }
            },
            other => {
                state.insert(key, other);
            }
        }
    }
}

pub fn update_state(store: &mut StateStore, updates: State, ctx: ChangeContext) -> StateChange {
    let previous = store.state.clone();
    merge_updates(&mut store.state, updates);

    let change = StateChange::new(
        ChangeKind::Update,
        ctx,
        previous,
        store.state.clone(),
        store.version.clone(),
    );
    debug!(
        change_id = %change.id,
        entity_type = %change.entity_type,
        changed = ?change.changed_keys(),
        "state updated"
    );
    store.commit(change)
}

pub fn delete_state<K: AsRef<str>>(
    store: &mut StateStore,
    keys: &[K],
    ctx: ChangeContext,
) -> StateChange {
    let previous = store.state.clone();
    let mut removed = 0;
    for key in keys {
        let key: &str = key.as_ref();
        if store.state.remove(key).is_some() {
            removed += 1;
        }
    }

    let change = StateChange::new(
        ChangeKind::Delete,
        ctx,
        previous,
        store.state.clone(),
        store.version.clone(),
    );
    debug!(change_id = %change.id, requested = keys.len(), removed, "state keys deleted");
    store.commit(change)
}

pub fn reset_state(
    store: &mut StateStore,
    new_state: Option<State>,
    ctx: ChangeContext,
) -> StateChange {
    let previous = std::mem::replace(&mut store.state, new_state.unwrap_or_default());

    let change = StateChange::new(
        ChangeKind::Create,
        ctx,
        previous,
        store.state.clone(),
        store.version.clone(),
    );
    debug!(change_id = %change.id, changed = ?change.changed_keys(), "state reset");
    store.commit(change)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(value: Value) -> State {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_merge_nested_objects() {
        let mut state = obj(json!({"cart": {"items": 1, "currency": "EUR"}}));
        merge_updates(&mut state, obj(json!({"cart": {"items": 2, "total": 9.99}})));

        assert_eq!(
            Value::Object(state),
            json!({"cart": {"items": 2, "currency": "EUR", "total": 9.99}})
        );
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut state = obj(json!({"run": {"meta": {"a": 1, "b": 2}}}));
        merge_updates(&mut state, obj(json!({"run": {"meta": {"c": 3}}})));

        assert_eq!(Value::Object(state), json!({"run": {"meta": {"c": 3}}}));
    }

    #[test]
    fn test_merge_replaces_non_objects() {
        let mut state = obj(json!({"a": {"x": 1}, "b": 5, "c": [1, 2]}));
        merge_updates(
            &mut state,
            obj(json!({"a": "flat", "b": {"now": "object"}, "c": [3]})),
        );

        assert_eq!(
            Value::Object(state),
            json!({"a": "flat", "b": {"now": "object"}, "c": [3]})
        );
    }

    #[test]
    fn test_update_records_whole_store_snapshots() {
        let mut store = StateStore::in_memory();
        store.update_state(obj(json!({"a": 1})), ChangeContext::new());

        let change = store.update_state(obj(json!({"b": 2})), ChangeContext::new());

        assert_eq!(change.kind, ChangeKind::Update);
        assert_eq!(Value::Object(change.previous_state), json!({"a": 1}));
        assert_eq!(Value::Object(change.new_state), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_snapshots_are_independent_of_live_state() {
        let mut store = StateStore::in_memory();
        let first = store.update_state(obj(json!({"job": {"step": 1}})), ChangeContext::new());
        store.update_state(obj(json!({"job": {"step": 2}})), ChangeContext::new());

        assert_eq!(first.new_state.get("job"), Some(&json!({"step": 1})));
        let logged = store.get_history(&Default::default());
        assert_eq!(logged[1].new_state.get("job"), Some(&json!({"step": 1})));
    }

    #[test]
    fn test_delete_missing_keys_is_noop() {
        let mut store = StateStore::in_memory();
        store.update_state(obj(json!({"a": 1, "b": 2})), ChangeContext::new());

        let change = store.delete_state(&["zzz"], ChangeContext::new());

        assert_eq!(change.kind, ChangeKind::Delete);
        assert_eq!(change.previous_state, change.new_state);
        assert_eq!(Value::Object(store.get_state()), json!({"a": 1, "b": 2}));
    }

    #[test]
    fn test_delete_keys() {
        let mut store = StateStore::in_memory();
        store.update_state(obj(json!({"a": 1, "b": 2, "c": 3})), ChangeContext::new());

        store.delete_state(&["a".to_string(), "c".to_string()], ChangeContext::new());

        assert_eq!(Value::Object(store.get_state()), json!({"b": 2}));
    }

    #[test]
    fn test_reset() {
        let mut store = StateStore::in_memory();
        store.update_state(obj(json!({"a": 1})), ChangeContext::new());

        let change = store.reset_state(Some(obj(json!({"fresh": true}))), ChangeContext::new());
        assert_eq!(change.kind, ChangeKind::Create);
        assert_eq!(Value::Object(change.previous_state), json!({"a": 1}));
        assert_eq!(Value::Object(store.get_state()), json!({"fresh": true}));

        store.reset_state(None, ChangeContext::new());
        assert!(store.get_state().is_empty());
    }
}
