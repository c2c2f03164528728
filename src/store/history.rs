//! Change-log queries and retention

use crate::types::{HistoryFilter, StateChange};

use super::StateStore;

/// Append a change, evicting the oldest records beyond the configured limit
pub(crate) fn record(store: &mut StateStore, change: StateChange) {
    store.history.push_back(change);
    if let Some(limit) = store.config.history_limit {
        while store.history.len() > limit {
            store.history.pop_front();
        }
    }
}

pub fn get_history(store: &StateStore, filter: &HistoryFilter) -> Vec<StateChange> {
    let matching = store
        .history
        .iter()
        .rev()
        .filter(|change| filter.matches(change));

    match filter.limit {
        Some(limit) => matching.take(limit).cloned().collect(),
        None => matching.cloned().collect(),
    }
}

pub fn prune(store: &mut StateStore, keep: usize) -> usize {
    let excess = store.history.len().saturating_sub(keep);
    store.history.drain(..excess);
    excess
}
