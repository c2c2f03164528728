//! Migration edges for the version graph

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::State;
use crate::error::TransformError;

/// Transform applied by a migration edge
pub type TransformFn = dyn Fn(State) -> Result<State, TransformError> + Send + Sync;

/// Box a closure as a migration transform
pub fn transform_fn<F>(f: F) -> Arc<TransformFn>
where
    F: Fn(State) -> Result<State, TransformError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// A directed edge `source_version -> target_version` in the migration graph
///
/// Counters only ever grow, and `success_count + failure_count` never
/// exceeds `applied_count`.
#[derive(Clone, Serialize)]
pub struct StateMigration {
    pub id: String,
    pub source_version: String,
    pub target_version: String,
    pub description: String,
    #[serde(skip)]
    transform: Option<Arc<TransformFn>>,
    pub applied_count: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub last_applied: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
}

impl StateMigration {
    /// Create an edge; `None` transform means identity
    pub fn new(
        source_version: impl Into<String>,
        target_version: impl Into<String>,
        description: impl Into<String>,
        transform: Option<Arc<TransformFn>>,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source_version: source_version.into(),
            target_version: target_version.into(),
            description: description.into(),
            transform,
            applied_count: 0,
            success_count: 0,
            failure_count: 0,
            last_applied: None,
            last_success: None,
            last_failure: None,
        }
    }

    /// Whether a transform is registered (otherwise the edge is identity)
    pub fn has_transform(&self) -> bool {
        self.transform.is_some()
    }

    /// Replace the definition of this edge, keeping id and counters
    pub(crate) fn redefine(&mut self, description: String, transform: Option<Arc<TransformFn>>) {
        self.description = description;
        self.transform = transform;
    }

    /// Run the transform on `state` and update the counters
    pub fn apply(&mut self, state: State) -> Result<State, TransformError> {
        let now = Utc::now();
        self.applied_count += 1;
        self.last_applied = Some(now);

        let result = match &self.transform {
            Some(transform) => transform(state),
            None => Ok(state),
        };

        match &result {
            Ok(_) => {
                self.success_count += 1;
                self.last_success = Some(now);
            }
            Err(_) => {
                self.failure_count += 1;
                self.last_failure = Some(now);
            }
        }

        result
    }
}

impl fmt::Debug for StateMigration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateMigration")
            .field("id", &self.id)
            .field("source_version", &self.source_version)
            .field("target_version", &self.target_version)
            .field("description", &self.description)
            .field("has_transform", &self.has_transform())
            .field("applied_count", &self.applied_count)
            .field("success_count", &self.success_count)
            .field("failure_count", &self.failure_count)
            .finish()
    }
}
