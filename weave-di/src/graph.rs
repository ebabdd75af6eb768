//! Dependency graph recorded while services are resolved

use crate::ServiceKey;
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;

pub use cycle::Cycle;

pub mod cycle;

/// A "depends-on" edge: resolving `from` triggered a resolution of `to`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GraphEdge {
    /// Dependent service
    pub from: ServiceKey,
    /// Dependency
    pub to: ServiceKey,
}

impl GraphEdge {
    /// Creates a new edge
    #[inline]
    pub fn new(from: impl Into<ServiceKey>, to: impl Into<ServiceKey>) -> Self {
        Self { from: from.into(), to: to.into() }
    }
}

/// Node and edge counts of a [`DependencyGraph`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphStatistics {
    /// Number of distinct keys that appear in at least one edge
    pub node_count: usize,
    /// Number of distinct edges
    pub edge_count: usize,
}

#[derive(Debug, Default)]
struct GraphInner {
    edges: IndexSet<GraphEdge>,
    adjacency: IndexMap<ServiceKey, IndexSet<ServiceKey>>,
}

/// Thread-safe adjacency structure of "depends-on" edges.
///
/// Edges are additive and deduplicated, insertion order is preserved
/// so snapshots and cycle reports are deterministic.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    inner: RwLock<GraphInner>,
}

impl DependencyGraph {
    /// Creates an empty graph
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an edge, returns `false` if it was already present
    pub fn add_edge(&self, from: ServiceKey, to: ServiceKey) -> bool {
        let edge = GraphEdge { from, to };
        if self.inner.read().edges.contains(&edge) {
            return false;
        }

        let mut inner = self.inner.write();
        if !inner.edges.insert(edge.clone()) {
            return false;
        }
        inner.adjacency
            .entry(edge.from)
            .or_default()
            .insert(edge.to.clone());
        inner.adjacency
            .entry(edge.to)
            .or_default();
        true
    }

    /// Returns `true` if the edge `from -> to` is recorded
    #[inline]
    pub fn contains_edge(&self, from: &ServiceKey, to: &ServiceKey) -> bool {
        self.inner
            .read()
            .adjacency
            .get(from)
            .is_some_and(|deps| deps.contains(to))
    }

    /// Read-only snapshot of all edges in insertion order
    #[inline]
    pub fn edges(&self) -> Vec<GraphEdge> {
        self.inner.read().edges.iter().cloned().collect()
    }

    /// Direct dependencies of `key` in insertion order
    #[inline]
    pub fn dependencies_of(&self, key: &ServiceKey) -> Vec<ServiceKey> {
        self.inner
            .read()
            .adjacency
            .get(key)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Keys that directly depend on `key`
    pub fn dependents_of(&self, key: &ServiceKey) -> Vec<ServiceKey> {
        self.inner
            .read()
            .edges
            .iter()
            .filter(|edge| &edge.to == key)
            .map(|edge| edge.from.clone())
            .collect()
    }

    /// Runs a full depth-first search over the current edge set and returns every cycle found
    #[inline]
    pub fn detect_all_cycles(&self) -> Vec<Cycle> {
        cycle::detect_all(&self.inner.read().adjacency)
    }

    /// Returns node and edge counts
    #[inline]
    pub fn statistics(&self) -> GraphStatistics {
        let inner = self.inner.read();
        GraphStatistics {
            node_count: inner.adjacency.len(),
            edge_count: inner.edges.len(),
        }
    }

    /// Removes every edge
    #[inline]
    pub fn reset(&self) {
        let mut inner = self.inner.write();
        inner.edges.clear();
        inner.adjacency.clear();
    }
}
