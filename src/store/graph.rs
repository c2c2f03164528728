//! Migration graph and path resolution

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use crate::types::{StateMigration, TransformFn};

/// One hop of a resolved migration path: `(source_version, target_version)`
pub type MigrationStep = (String, String);

/// Registered migrations, keyed by source version
///
/// Edges leaving a version are kept in registration order, which is also the
/// order BFS explores them in.
#[derive(Debug, Default)]
pub struct MigrationGraph {
    edges: HashMap<String, Vec<StateMigration>>,
}

impl MigrationGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an edge, or redefine the existing `(source, target)` edge in place
    pub fn register(
        &mut self,
        source_version: &str,
        target_version: &str,
        description: &str,
        transform: Option<Arc<TransformFn>>,
    ) -> &StateMigration {
        let edges = self.edges.entry(source_version.to_string()).or_default();

        let index = match edges
            .iter()
            .position(|m| m.target_version == target_version)
        {
            Some(index) => {
                edges[index].redefine(description.to_string(), transform);
                index
            }
            None => {
                edges.push(StateMigration::new(
                    source_version,
                    target_version,
                    description,
                    transform,
                ));
                edges.len() - 1
            }
        };

        &edges[index]
    }

    pub fn get(&self, source_version: &str, target_version: &str) -> Option<&StateMigration> {
        self.edges
            .get(source_version)?
            .iter()
            .find(|m| m.target_version == target_version)
    }

    pub fn get_mut(
        &mut self,
        source_version: &str,
        target_version: &str,
    ) -> Option<&mut StateMigration> {
        self.edges
            .get_mut(source_version)?
            .iter_mut()
            .find(|m| m.target_version == target_version)
    }

    /// Edges leaving `source_version`, in registration order
    pub fn edges_from(&self, source_version: &str) -> &[StateMigration] {
        self.edges
            .get(source_version)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// All edges, sorted by source version then registration order
    pub fn all(&self) -> Vec<&StateMigration> {
        let mut sources: Vec<&String> = self.edges.keys().collect();
        sources.sort();
        sources
            .into_iter()
            .flat_map(|source| self.edges[source].iter())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.edges.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shortest path (fewest edges) from `from` to `to` by breadth-first search
    ///
    /// Ties go to the edge registered first. Returns an empty path when
    /// `from == to` and `None` when `to` is unreachable.
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<MigrationStep>> {
        if from == to {
            return Some(Vec::new());
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut parents: HashMap<&str, &str> = HashMap::new();
        let mut queue: VecDeque<&str> = VecDeque::new();

        visited.insert(from);
        queue.push_back(from);

        while let Some(current) = queue.pop_front() {
            for edge in self.edges_from(current) {
                let next = edge.target_version.as_str();
                if !visited.insert(next) {
                    continue;
                }
                parents.insert(next, current);

                if next == to {
                    return Some(Self::unwind(&parents, from, to));
                }
                queue.push_back(next);
            }
        }

        None
    }

    fn unwind(parents: &HashMap<&str, &str>, from: &str, to: &str) -> Vec<MigrationStep> {
        let mut steps = Vec::new();
        let mut node = to;
        while node != from {
            let Some(parent) = parents.get(node).copied() else {
                break;
            };
            steps.push((parent.to_string(), node.to_string()));
            node = parent;
        }
        steps.reverse();
        steps
    }
}
