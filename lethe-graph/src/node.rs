//! Runtime traversal nodes.

use lethe_schema::{CollectionAddress, FieldAddress, FieldPath};
use std::collections::{BTreeMap, BTreeSet};

/// Where a field's candidate values come from.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SeedOrigin {
    /// A seed identity supplied with the request, named by its key.
    Identity(String),
    /// Values read from a parent collection's field.
    Reference(FieldAddress),
}

/// Plan-time state of a traversal node.
///
/// `Pending → Ready → Visited`; a node never becomes `Visited` before
/// every dependency is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeState {
    Pending,
    Ready,
    Visited,
}

/// One collection as seen by a single traversal run: which of its fields
/// receive values, from where, and its position in the dependency
/// structure. Edges are stored as addresses, never as node pointers.
#[derive(Debug, Clone)]
pub struct TraversalNode {
    address: CollectionAddress,
    seeds: BTreeMap<FieldPath, BTreeSet<SeedOrigin>>,
    parents: BTreeSet<CollectionAddress>,
    children: BTreeSet<CollectionAddress>,
    after: BTreeSet<CollectionAddress>,
    state: NodeState,
}

impl TraversalNode {
    pub(crate) fn new(address: CollectionAddress, after: BTreeSet<CollectionAddress>) -> Self {
        Self {
            address,
            seeds: BTreeMap::new(),
            parents: BTreeSet::new(),
            children: BTreeSet::new(),
            after,
            state: NodeState::Pending,
        }
    }

    /// The collection this node wraps.
    #[must_use]
    pub fn address(&self) -> &CollectionAddress {
        &self.address
    }

    /// Fields receiving inbound values, with their merged origins.
    /// Duplicate origins collapse; ordering is by field path.
    #[must_use]
    pub fn seeds(&self) -> &BTreeMap<FieldPath, BTreeSet<SeedOrigin>> {
        &self.seeds
    }

    /// The field paths eligible to filter on: exactly the seeded ones.
    #[must_use]
    pub fn seeded_paths(&self) -> impl Iterator<Item = &FieldPath> {
        self.seeds.keys()
    }

    /// Collections whose results feed this node.
    #[must_use]
    pub fn parents(&self) -> &BTreeSet<CollectionAddress> {
        &self.parents
    }

    /// Collections fed by this node's results.
    #[must_use]
    pub fn children(&self) -> &BTreeSet<CollectionAddress> {
        &self.children
    }

    /// Explicit ordering constraints carried over from the graph.
    #[must_use]
    pub fn after(&self) -> &BTreeSet<CollectionAddress> {
        &self.after
    }

    /// Current plan-time state.
    #[must_use]
    pub fn state(&self) -> NodeState {
        self.state
    }

    /// Whether the node has been visited.
    #[must_use]
    pub fn is_visited(&self) -> bool {
        self.state == NodeState::Visited
    }

    pub(crate) fn add_seed(&mut self, path: FieldPath, origin: SeedOrigin) {
        if let SeedOrigin::Reference(address) = &origin {
            self.parents.insert(address.collection_address().clone());
        }
        self.seeds.entry(path).or_default().insert(origin);
    }

    pub(crate) fn add_child(&mut self, address: CollectionAddress) {
        self.children.insert(address);
    }

    pub(crate) fn has_seeds(&self) -> bool {
        !self.seeds.is_empty()
    }

    pub(crate) fn mark_ready(&mut self) {
        debug_assert_eq!(self.state, NodeState::Pending);
        self.state = NodeState::Ready;
    }

    pub(crate) fn mark_visited(&mut self) {
        debug_assert_eq!(self.state, NodeState::Ready);
        self.state = NodeState::Visited;
    }
}
