//! Integration tests for the state store

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use proptest::prelude::*;
use serde_json::{json, Value};

use state_store::{
    state_from_value, ChangeContext, ChangeKind, HistoryFilter, State, StateChange, StateStore,
    StateStoreConfig,
};

fn obj(value: Value) -> State {
    state_from_value(value)
}

#[test]
fn test_cart_merge_scenario() {
    let mut store = StateStore::with_config(StateStoreConfig::default().version("1.0.0"));

    store.update_state(obj(json!({"cart": {"items": 1}})), ChangeContext::new());
    store.update_state(obj(json!({"cart": {"total": 9.99}})), ChangeContext::new());

    assert_eq!(
        store.get_entity_state("cart"),
        json!({"items": 1, "total": 9.99})
    );

    let history = store.get_history(&HistoryFilter::new());
    assert_eq!(history.len(), 2);
    assert_eq!(
        history[0].new_state.get("cart"),
        Some(&json!({"items": 1, "total": 9.99}))
    );
    assert_eq!(history[1].new_state.get("cart"), Some(&json!({"items": 1})));
}

#[test]
fn test_each_mutation_logs_one_change_with_observed_snapshots() {
    let mut store = StateStore::in_memory();

    let before = store.get_state();
    let change = store.update_state(obj(json!({"a": 1})), ChangeContext::new());
    assert_eq!(change.previous_state, before);
    assert_eq!(change.new_state, store.get_state());
    assert_eq!(store.history_len(), 1);

    let before = store.get_state();
    let change = store.delete_state(&["a"], ChangeContext::new());
    assert_eq!(change.previous_state, before);
    assert_eq!(change.new_state, store.get_state());
    assert_eq!(store.history_len(), 2);

    let before = store.get_state();
    let change = store.reset_state(Some(obj(json!({"b": 2}))), ChangeContext::new());
    assert_eq!(change.previous_state, before);
    assert_eq!(change.new_state, store.get_state());
    assert_eq!(store.history_len(), 3);
}

#[test]
fn test_delete_then_get_excludes_keys() {
    let mut store = StateStore::in_memory();
    store.update_state(obj(json!({"a": 1, "b": 2, "c": 3})), ChangeContext::new());

    store.delete_state(&["a", "b", "missing"], ChangeContext::new());

    let state = store.get_state();
    assert!(!state.contains_key("a"));
    assert!(!state.contains_key("b"));
    assert_eq!(state.get("c"), Some(&json!(3)));
}

#[test]
fn test_reset_without_argument_empties_state() {
    let mut store = StateStore::in_memory();
    store.update_state(obj(json!({"a": 1})), ChangeContext::new());

    let change = store.reset_state(None, ChangeContext::new());

    assert_eq!(change.kind, ChangeKind::Create);
    assert!(store.get_state().is_empty());
}

#[test]
fn test_typed_and_wildcard_listeners() {
    let mut store = StateStore::in_memory();
    let order_calls = Arc::new(Mutex::new(Vec::<StateChange>::new()));
    let wildcard_calls = Arc::new(AtomicUsize::new(0));

    let seen = Arc::clone(&order_calls);
    store.add_listener(Some("order"), move |change| {
        seen.lock().unwrap().push(change.clone());
        Ok(())
    });
    let counter = Arc::clone(&wildcard_calls);
    store.add_listener(None, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    store.update_state(
        obj(json!({"o-1": {"total": 5}})),
        ChangeContext::new().entity("o-1", "order"),
    );
    store.update_state(
        obj(json!({"c-1": {"items": 2}})),
        ChangeContext::new().entity("c-1", "cart"),
    );
    store.update_state(obj(json!({"flag": true})), ChangeContext::new());

    let order_calls = order_calls.lock().unwrap();
    assert_eq!(order_calls.len(), 1);
    assert_eq!(order_calls[0].entity_type, "order");
    assert_eq!(wildcard_calls.load(Ordering::SeqCst), 3);
}

#[test]
fn test_failing_listener_does_not_abort_mutation() {
    let mut store = StateStore::in_memory();
    let later = Arc::new(AtomicUsize::new(0));

    store.add_listener(None, |_| Err("listener unavailable".into()));
    store.add_listener(None, |_| panic!("listener bug"));
    let counter = Arc::clone(&later);
    store.add_listener(None, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    store.update_state(obj(json!({"a": 1})), ChangeContext::new());

    assert_eq!(store.get_entity_state("a"), json!(1));
    assert_eq!(store.history_len(), 1);
    assert_eq!(later.load(Ordering::SeqCst), 1);
}

#[test]
fn test_removed_listener_is_not_called() {
    let mut store = StateStore::in_memory();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let id = store.add_listener(None, move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    store.update_state(obj(json!({"a": 1})), ChangeContext::new());
    assert!(store.remove_listener(id));
    assert!(!store.remove_listener(id));
    store.update_state(obj(json!({"a": 2})), ChangeContext::new());

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(store.listener_count(), 0);
}

#[test]
fn test_history_retention() {
    let mut store = StateStore::with_config(StateStoreConfig::default().history_limit(2));

    for i in 0..3 {
        store.update_state(obj(json!({ "n": i })), ChangeContext::new());
    }

    let history = store.get_history(&HistoryFilter::new());
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].new_state.get("n"), Some(&json!(2)));
    assert_eq!(history[1].new_state.get("n"), Some(&json!(1)));
}

#[tokio::test]
async fn test_broadcast_feed_sequence() {
    let mut store = StateStore::in_memory();
    let mut rx = store.subscribe();

    store.update_state(obj(json!({"a": 1})), ChangeContext::new());
    store.delete_state(&["a"], ChangeContext::new());

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!(first.sequence_id, 0);
    assert_eq!(first.change.kind, ChangeKind::Update);
    assert_eq!(second.sequence_id, 1);
    assert_eq!(second.change.kind, ChangeKind::Delete);
}

fn leaf() -> impl Strategy<Value = Value> {
    prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[a-z]{0,6}".prop_map(Value::from),
    ]
}

fn update_value() -> impl Strategy<Value = Value> {
    prop_oneof![
        leaf(),
        prop::collection::btree_map("[a-c]", leaf(), 0..3)
            .prop_map(|m| Value::Object(m.into_iter().collect())),
    ]
}

fn updates() -> impl Strategy<Value = State> {
    prop::collection::btree_map("[a-d]", update_value(), 0..4)
        .prop_map(|m| m.into_iter().collect())
}

/// Reference replay of merge-on-update, written independently of the store
fn replay(batches: &[State]) -> State {
    let mut expected = State::new();
    for batch in batches {
        for (key, value) in batch {
            let merged = match (expected.get(key), value) {
                (Some(Value::Object(old)), Value::Object(new)) => {
                    let mut combined = old.clone();
                    for (k, v) in new {
                        combined.insert(k.clone(), v.clone());
                    }
                    Value::Object(combined)
                }
                _ => value.clone(),
            };
            expected.insert(key.clone(), merged);
        }
    }
    expected
}

proptest! {
    #[test]
    fn prop_update_replay_matches_merge(batches in prop::collection::vec(updates(), 0..8)) {
        let mut store = StateStore::in_memory();
        for batch in &batches {
            store.update_state(batch.clone(), ChangeContext::new());
        }

        prop_assert_eq!(store.get_state(), replay(&batches));
        prop_assert_eq!(store.history_len(), batches.len());
    }

    #[test]
    fn prop_delete_of_absent_keys_is_noop(batch in updates()) {
        let mut store = StateStore::in_memory();
        store.update_state(batch, ChangeContext::new());
        let before = store.get_state();

        store.delete_state(&["zz", "yy"], ChangeContext::new());

        prop_assert_eq!(store.get_state(), before);
    }
}
