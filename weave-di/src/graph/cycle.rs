//! Cycle representation and offline cycle detection

use crate::ServiceKey;
use indexmap::{IndexMap, IndexSet};
use std::fmt::{Display, Formatter};

/// A path of "depends-on" edges returning to its starting key.
///
/// The path always repeats the first key at the end, so `A -> B -> A`
/// is stored as `["A", "B", "A"]` and a self-loop as `["A", "A"]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    path: Vec<ServiceKey>,
    description: String,
}

impl Cycle {
    /// Creates a cycle from a closed path
    pub fn new(path: Vec<ServiceKey>) -> Self {
        let description = path
            .iter()
            .map(ServiceKey::as_str)
            .collect::<Vec<_>>()
            .join(" -> ");
        Self { path, description }
    }

    /// The closed path, the first key repeated at the end
    #[inline]
    pub fn path(&self) -> &[ServiceKey] {
        &self.path
    }

    /// Distinct keys of the cycle, without the closing repeat
    #[inline]
    pub fn nodes(&self) -> &[ServiceKey] {
        &self.path[..self.path.len().saturating_sub(1)]
    }

    /// Number of distinct keys taking part in the cycle, `1` for a self-loop
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes().len()
    }

    /// Returns `true` if the cycle has no keys
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }

    /// Returns `true` if this cycle goes through `key`
    #[inline]
    pub fn contains(&self, key: &ServiceKey) -> bool {
        self.path.contains(key)
    }

    /// Human-readable `A -> B -> A` form
    #[inline]
    pub fn description(&self) -> &str {
        &self.description
    }
}

impl Display for Cycle {
    #[inline]
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Color {
    InProgress,
    Done,
}

/// Finds every back-edge of `adjacency` with an iterative three-color DFS.
///
/// Roots and neighbors are visited in insertion order, so the result is deterministic
/// for a given graph. Each back-edge yields one cycle.
pub(super) fn detect_all(adjacency: &IndexMap<ServiceKey, IndexSet<ServiceKey>>) -> Vec<Cycle> {
    let mut colors: Vec<Option<Color>> = vec![None; adjacency.len()];
    let mut cycles = Vec::new();

    for root in 0..adjacency.len() {
        if colors[root].is_some() {
            continue;
        }

        // (node index, next neighbor position)
        let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
        colors[root] = Some(Color::InProgress);

        while let Some((node, cursor)) = stack.last_mut() {
            let node = *node;
            let neighbors = &adjacency[node];

            let Some(next) = neighbors.get_index(*cursor) else {
                colors[node] = Some(Color::Done);
                stack.pop();
                continue;
            };
            *cursor += 1;

            // every edge target is inserted as a node by `DependencyGraph::add_edge`
            let Some(next) = adjacency.get_index_of(next) else {
                continue;
            };

            match colors[next] {
                None => {
                    colors[next] = Some(Color::InProgress);
                    stack.push((next, 0));
                }
                Some(Color::InProgress) => {
                    // an in-progress node is always on the stack
                    if let Some(start) = stack.iter().position(|(idx, _)| *idx == next) {
                        cycles.push(back_edge_cycle(adjacency, &stack[start..], next));
                    }
                }
                Some(Color::Done) => {}
            }
        }
    }

    cycles
}

fn back_edge_cycle(
    adjacency: &IndexMap<ServiceKey, IndexSet<ServiceKey>>,
    frames: &[(usize, usize)],
    target: usize
) -> Cycle {
    let path = frames
        .iter()
        .map(|(idx, _)| *idx)
        .chain(std::iter::once(target))
        .filter_map(|idx| adjacency.get_index(idx).map(|(key, _)| key.clone()))
        .collect();
    Cycle::new(path)
}
