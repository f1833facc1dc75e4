//! Traversal planning: which collections run, in what order, fed by what.

use crate::graph::{DatasetGraph, Edge};
use crate::node::{NodeState, SeedOrigin, TraversalNode};
use lethe_schema::CollectionAddress;
use lethe_types::Identity;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use tracing::{debug, warn};

/// Result type alias for traversal planning.
pub type TraversalResult<T> = std::result::Result<T, TraversalError>;

/// Errors raised while planning a traversal.
#[derive(Debug, thiserror::Error)]
pub enum TraversalError {
    /// An *after* constraint can never be satisfied.
    #[error("ordering cycle among collections: {0}")]
    OrderingCycle(String),

    /// No identity-flagged field matches any supplied seed identity.
    #[error("no collection is reachable from identity keys [{0}]")]
    NoReachableCollections(String),
}

/// A completed traversal plan over one graph and one identity set.
///
/// Planning happens in two phases. First, a breadth-first walk from the
/// identity-seeded collections assigns every reachable field its inbound
/// value origins and orients undirected reference pairs (whichever side
/// the walk reaches first becomes the parent; the reverse edge is
/// consumed). Second, the planned parent structure is ordered
/// topologically: a collection is visited only once every planned parent
/// and every satisfiable *after* constraint is visited. Ties among
/// simultaneously-ready collections break by declaration order, so the
/// same inputs always yield the same plan.
#[derive(Debug)]
pub struct Traversal {
    nodes: HashMap<CollectionAddress, TraversalNode>,
    order: Vec<CollectionAddress>,
    unreachable: Vec<CollectionAddress>,
}

impl Traversal {
    /// Plans a traversal of `graph` from the given seed identities.
    pub fn new(graph: &DatasetGraph, identity: &Identity) -> TraversalResult<Self> {
        if graph.is_empty() {
            return Ok(Self {
                nodes: HashMap::new(),
                order: Vec::new(),
                unreachable: Vec::new(),
            });
        }

        let mut nodes: HashMap<CollectionAddress, TraversalNode> = graph
            .nodes()
            .map(|node| {
                (
                    node.address.clone(),
                    TraversalNode::new(node.address.clone(), node.after.clone()),
                )
            })
            .collect();

        // Seed identity-flagged fields whose key the request supplies.
        for (field_address, identity_key) in graph.identity_keys() {
            if identity.get(identity_key).is_none() {
                continue;
            }
            if let Some(node) = nodes.get_mut(field_address.collection_address()) {
                node.add_seed(
                    field_address.field_path.clone(),
                    SeedOrigin::Identity(identity_key.clone()),
                );
            }
        }

        propagate_seeds(graph, &mut nodes);

        let reachable: HashSet<CollectionAddress> = graph
            .order()
            .iter()
            .filter(|address| nodes[*address].has_seeds())
            .cloned()
            .collect();
        if reachable.is_empty() {
            let keys: Vec<&str> = identity.iter().map(|(k, _)| k.as_str()).collect();
            return Err(TraversalError::NoReachableCollections(keys.join(", ")));
        }

        if let Some(cycle) = find_after_cycle(graph, &reachable) {
            let named: Vec<String> = cycle.iter().map(ToString::to_string).collect();
            return Err(TraversalError::OrderingCycle(named.join(" -> ")));
        }

        let order = visit_in_order(graph, &mut nodes, &reachable)?;

        let unreachable: Vec<CollectionAddress> = graph
            .order()
            .iter()
            .filter(|address| !nodes[*address].is_visited())
            .cloned()
            .collect();
        for address in &unreachable {
            warn!(collection = %address, "collection unreachable from seed identities; skipped");
        }

        Ok(Self {
            nodes,
            order,
            unreachable,
        })
    }

    /// Visited addresses in execution order.
    #[must_use]
    pub fn order(&self) -> &[CollectionAddress] {
        &self.order
    }

    /// Looks up a traversal node.
    #[must_use]
    pub fn node(&self, address: &CollectionAddress) -> Option<&TraversalNode> {
        self.nodes.get(address)
    }

    /// Visited nodes in execution order.
    pub fn nodes_in_order(&self) -> impl Iterator<Item = &TraversalNode> {
        self.order.iter().map(|address| &self.nodes[address])
    }

    /// Collections never reached from the seed identities, in declaration
    /// order. These are skipped, not failed.
    #[must_use]
    pub fn unreachable(&self) -> &[CollectionAddress] {
        &self.unreachable
    }
}

/// Phase one: breadth-first delivery of values along edges, recording
/// per-field origins and parent/child links.
///
/// A node that has left the frontier never receives further origins;
/// undirected reference pairs are consumed in whichever direction fires
/// first, so the resulting parent relation is acyclic.
fn propagate_seeds(graph: &DatasetGraph, nodes: &mut HashMap<CollectionAddress, TraversalNode>) {
    let mut live: BTreeSet<Edge> = graph.edges().clone();
    let mut queue: VecDeque<CollectionAddress> = VecDeque::new();
    let mut enqueued: HashSet<CollectionAddress> = HashSet::new();
    let mut expanded: HashSet<CollectionAddress> = HashSet::new();

    for address in graph.order() {
        if nodes[address].has_seeds() {
            queue.push_back(address.clone());
            enqueued.insert(address.clone());
        }
    }

    while let Some(address) = queue.pop_front() {
        expanded.insert(address.clone());
        let outbound: Vec<Edge> = live
            .iter()
            .filter(|edge| edge.source.collection_address() == &address)
            .cloned()
            .collect();
        for edge in outbound {
            live.remove(&edge);
            live.remove(&Edge::new(edge.target.clone(), edge.source.clone()));

            let child_address = edge.target.collection_address().clone();
            if expanded.contains(&child_address) {
                continue;
            }
            if let Some(child) = nodes.get_mut(&child_address) {
                child.add_seed(
                    edge.target.field_path.clone(),
                    SeedOrigin::Reference(edge.source.clone()),
                );
            }
            if let Some(parent) = nodes.get_mut(&address) {
                parent.add_child(child_address.clone());
            }
            if enqueued.insert(child_address.clone()) {
                queue.push_back(child_address);
            }
        }
    }
}

/// Phase two: topological visitation over the planned parent structure.
fn visit_in_order(
    graph: &DatasetGraph,
    nodes: &mut HashMap<CollectionAddress, TraversalNode>,
    reachable: &HashSet<CollectionAddress>,
) -> TraversalResult<Vec<CollectionAddress>> {
    let mut order = Vec::new();
    loop {
        let next = graph.order().iter().find(|address| {
            let node = &nodes[*address];
            node.state() == NodeState::Pending
                && node.has_seeds()
                && parents_visited(node, nodes)
                && after_satisfied(node, nodes, reachable)
        });
        let Some(address) = next.cloned() else {
            break;
        };
        if let Some(node) = nodes.get_mut(&address) {
            node.mark_ready();
            node.mark_visited();
        }
        debug!(collection = %address, position = order.len(), "collection visited");
        order.push(address);
    }

    // Seeded but unvisited here means an *after* constraint is entangled
    // with the node's own data dependencies and can never be satisfied.
    let deadlocked: Vec<String> = graph
        .order()
        .iter()
        .filter(|address| {
            let node = &nodes[*address];
            !node.is_visited() && node.has_seeds()
        })
        .map(ToString::to_string)
        .collect();
    if deadlocked.is_empty() {
        Ok(order)
    } else {
        Err(TraversalError::OrderingCycle(deadlocked.join(", ")))
    }
}

fn parents_visited(
    node: &TraversalNode,
    nodes: &HashMap<CollectionAddress, TraversalNode>,
) -> bool {
    node.parents()
        .iter()
        .all(|parent| nodes.get(parent).is_some_and(TraversalNode::is_visited))
}

fn after_satisfied(
    node: &TraversalNode,
    nodes: &HashMap<CollectionAddress, TraversalNode>,
    reachable: &HashSet<CollectionAddress>,
) -> bool {
    node.after().iter().all(|dep| {
        // Constraints on collections that will never run cannot block.
        !reachable.contains(dep) || nodes.get(dep).is_some_and(TraversalNode::is_visited)
    })
}

/// Finds a cycle in the *after* constraints among reachable collections,
/// returning its path (first and last element equal) if one exists.
fn find_after_cycle(
    graph: &DatasetGraph,
    reachable: &HashSet<CollectionAddress>,
) -> Option<Vec<CollectionAddress>> {
    const WHITE: u8 = 0;
    const GRAY: u8 = 1;
    const BLACK: u8 = 2;

    let deps_of = |address: &CollectionAddress| -> Vec<CollectionAddress> {
        graph
            .node(address)
            .map(|node| {
                node.after
                    .iter()
                    .filter(|dep| reachable.contains(*dep))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    };

    let mut state: HashMap<CollectionAddress, u8> = HashMap::new();
    for start in graph.order() {
        if !reachable.contains(start) || state.get(start).copied().unwrap_or(WHITE) != WHITE {
            continue;
        }
        let mut stack: Vec<(CollectionAddress, std::vec::IntoIter<CollectionAddress>)> = Vec::new();
        state.insert(start.clone(), GRAY);
        stack.push((start.clone(), deps_of(start).into_iter()));

        while let Some((_, iter)) = stack.last_mut() {
            match iter.next() {
                Some(dep) => match state.get(&dep).copied().unwrap_or(WHITE) {
                    GRAY => {
                        let from = stack
                            .iter()
                            .position(|(address, _)| *address == dep)
                            .unwrap_or(0);
                        let mut cycle: Vec<CollectionAddress> = stack[from..]
                            .iter()
                            .map(|(address, _)| address.clone())
                            .collect();
                        cycle.push(dep);
                        return Some(cycle);
                    }
                    WHITE => {
                        state.insert(dep.clone(), GRAY);
                        let deps = deps_of(&dep).into_iter();
                        stack.push((dep, deps));
                    }
                    _ => {}
                },
                None => {
                    if let Some((address, _)) = stack.pop() {
                        state.insert(address, BLACK);
                    }
                }
            }
        }
    }
    None
}
