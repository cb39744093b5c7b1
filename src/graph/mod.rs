//! # Graph Services
//!
//! The three relation kinds of the name graph, each behind its own
//! service:
//!
//! | Service | Relation | Shape |
//! |---------|----------|-------|
//! | `VariantService` | variant | symmetric edge |
//! | `TranslationService` | translation | directed edge + target locale |
//! | `ClusterService` | membership | name ∈ cluster |
//!
//! Every service holds a shared handle to the store and runs each public
//! operation in its own transaction. The `find_*` operations are the
//! stored-facts source for decoration and degrade to manual hints when
//! the store cannot be read.

pub mod variant;
pub mod translation;
pub mod cluster;

use std::collections::VecDeque;

use hashbrown::HashSet;

use crate::model::NameId;

pub use variant::VariantService;
pub use translation::TranslationService;
pub use cluster::ClusterService;

// ============================================================================
// Connected-component traversal
// ============================================================================

/// Iterative breadth-first walk over a component of the name graph.
///
/// The walk does not know how to find neighbours; the caller feeds them
/// in after each step, which keeps the traversal independent of the store
/// and of edge direction:
///
/// ```text
/// let mut walk = ComponentWalk::new(start);
/// while let Some(id) = walk.next_unvisited() {
///     walk.extend(neighbours_of(id));
/// }
/// walk.into_ids()
/// ```
///
/// Each id is yielded exactly once, the start id first. Terminates on any
/// finite graph, cycles included.
#[derive(Debug)]
pub struct ComponentWalk {
    queue: VecDeque<NameId>,
    visited: HashSet<NameId>,
    order: Vec<NameId>,
}

impl ComponentWalk {
    pub fn new(start: NameId) -> Self {
        Self {
            queue: VecDeque::from([start]),
            visited: HashSet::new(),
            order: Vec::new(),
        }
    }

    /// Pop the next id that has not been expanded yet.
    pub fn next_unvisited(&mut self) -> Option<NameId> {
        while let Some(id) = self.queue.pop_front() {
            if self.visited.insert(id) {
                self.order.push(id);
                return Some(id);
            }
        }
        None
    }

    /// Queue the neighbours of the id last returned.
    pub fn extend(&mut self, neighbours: impl IntoIterator<Item = NameId>) {
        for id in neighbours {
            if !self.visited.contains(&id) {
                self.queue.push_back(id);
            }
        }
    }

    pub fn visited_count(&self) -> usize {
        self.order.len()
    }

    /// Ids in visiting order.
    pub fn into_ids(self) -> Vec<NameId> {
        self.order
    }
}
