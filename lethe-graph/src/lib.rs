//! Dataset graph construction and traversal for Lethe.
//!
//! [`DatasetGraph::build`] assembles the collections of every loaded
//! dataset into one directed graph, resolving declared field references
//! into concrete edges and failing fast on anything unresolvable.
//! [`Traversal::new`] then computes, for a concrete set of seed
//! identities, which collections are reachable and in what order, and
//! records per collection which fields receive values from where.
//!
//! The traversal is a plan: it assumes every visited parent will produce
//! rows. At run time the engine walks the same structure with actual row
//! counts and skips nodes whose inputs never materialize.

mod graph;
mod node;
mod traversal;

pub use graph::{DatasetGraph, Edge, GraphError, GraphNode, GraphResult};
pub use node::{NodeState, SeedOrigin, TraversalNode};
pub use traversal::{Traversal, TraversalError, TraversalResult};
