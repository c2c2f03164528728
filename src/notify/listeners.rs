//! Synchronous listener registry
//!
//! Listeners are keyed by entity type, or registered as wildcards that see
//! every change. Dispatch order for a change is fixed: typed listeners for the
//! change's entity type first, then wildcards, each group in registration
//! order.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use tracing::warn;

use crate::error::ListenerError;
use crate::types::StateChange;

/// Callback invoked with each change
pub type ListenerFn = dyn Fn(&StateChange) -> Result<(), ListenerError> + Send + Sync;

/// Handle returned by `add_listener`, used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

struct Registered {
    id: ListenerId,
    /// `None` for wildcard listeners
    entity_type: Option<String>,
    callback: Box<ListenerFn>,
}

/// Observer registry invoked after each mutation
#[derive(Default)]
pub struct ListenerRegistry {
    next_id: u64,
    listeners: Vec<Registered>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback for `entity_type`, or for every change when `None`
    pub fn add<F>(&mut self, entity_type: Option<&str>, callback: F) -> ListenerId
    where
        F: Fn(&StateChange) -> Result<(), ListenerError> + Send + Sync + 'static,
    {
        self.next_id += 1;
        let id = ListenerId(self.next_id);
        self.listeners.push(Registered {
            id,
            entity_type: entity_type.map(str::to_string),
            callback: Box::new(callback),
        });
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn remove(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| l.id != id);
        self.listeners.len() != before
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Invoke every matching listener for `change`
    ///
    /// A listener that returns an error or panics is logged and skipped.
    /// Returns the number of listeners that failed.
    pub fn notify(&self, change: &StateChange) -> usize {
        let typed = self.listeners.iter().filter(|l| {
            !change.entity_type.is_empty()
                && l.entity_type.as_deref() == Some(change.entity_type.as_str())
        });
        let wildcard = self.listeners.iter().filter(|l| l.entity_type.is_none());

        let mut failures = 0;
        for listener in typed.chain(wildcard) {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| (listener.callback)(change)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    failures += 1;
                    warn!(
                        listener = %listener.id,
                        change_id = %change.id,
                        error = %e,
                        "state listener failed"
                    );
                }
                Err(_) => {
                    failures += 1;
                    warn!(
                        listener = %listener.id,
                        change_id = %change.id,
                        "state listener panicked"
                    );
                }
            }
        }
        failures
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ChangeContext, ChangeKind, State};
    use std::sync::{Arc, Mutex};

    fn change_for(entity_type: &str) -> StateChange {
        let ctx = if entity_type.is_empty() {
            ChangeContext::new()
        } else {
            ChangeContext::new().entity_type(entity_type)
        };
        StateChange::new(ChangeKind::Update, ctx, State::new(), State::new(), "1.0.0")
    }

    fn recorder(
        log: &Arc<Mutex<Vec<String>>>,
        name: &str,
    ) -> impl Fn(&StateChange) -> Result<(), ListenerError> + Send + Sync + 'static {
        let log = Arc::clone(log);
        let name = name.to_string();
        move |_: &StateChange| {
            log.lock().unwrap().push(name.clone());
            Ok(())
        }
    }

    #[test]
    fn test_typed_before_wildcard() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();

        registry.add(None, recorder(&log, "wild-1"));
        registry.add(Some("order"), recorder(&log, "order-1"));
        registry.add(None, recorder(&log, "wild-2"));
        registry.add(Some("order"), recorder(&log, "order-2"));
        registry.add(Some("cart"), recorder(&log, "cart"));

        registry.notify(&change_for("order"));

        assert_eq!(
            *log.lock().unwrap(),
            vec!["order-1", "order-2", "wild-1", "wild-2"]
        );
    }

    #[test]
    fn test_empty_type_only_wildcards() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();

        registry.add(Some("order"), recorder(&log, "order"));
        registry.add(None, recorder(&log, "wild"));

        registry.notify(&change_for(""));

        assert_eq!(*log.lock().unwrap(), vec!["wild"]);
    }

    #[test]
    fn test_failures_do_not_stop_dispatch() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();

        registry.add(None, |_| Err("listener error".into()));
        registry.add(None, |_| panic!("listener panic"));
        registry.add(None, recorder(&log, "after"));

        let failures = registry.notify(&change_for("order"));

        assert_eq!(failures, 2);
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
    }

    #[test]
    fn test_remove() {
        let mut registry = ListenerRegistry::new();
        let id = registry.add(None, |_| Ok(()));

        assert_eq!(registry.len(), 1);
        assert!(registry.remove(id));
        assert!(!registry.remove(id));
        assert!(registry.is_empty());
    }
}
