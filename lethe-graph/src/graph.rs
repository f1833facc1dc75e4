//! The dataset graph: every collection across every loaded dataset, plus
//! the value-flow edges implied by field references.

use lethe_schema::{
    Collection, CollectionAddress, Dataset, EdgeDirection, FieldAddress, SchemaError,
};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;
use tracing::debug;

/// Result type alias for graph construction.
pub type GraphResult<T> = std::result::Result<T, GraphError>;

/// Errors raised while assembling the dataset graph.
///
/// Implemented by hand rather than via `derive(thiserror::Error)`
/// because the `source` fields below are edge endpoints, not error
/// causes, and the derive unconditionally treats a field named
/// `source` as the error's cause.
#[derive(Debug)]
pub enum GraphError {
    /// Malformed key or reference syntax in a dataset declaration.
    Validation(SchemaError),

    DuplicateDataset(String),

    DuplicateCollection(CollectionAddress),

    DuplicateField {
        collection: CollectionAddress,
        path: lethe_schema::FieldPath,
    },

    /// A reference points at a field that does not exist in any loaded
    /// dataset.
    UnresolvableReference {
        source: FieldAddress,
        target: FieldAddress,
    },

    /// A reference points back into its own collection.
    SelfReference {
        source: FieldAddress,
        target: FieldAddress,
    },
}

impl fmt::Display for GraphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(err) => fmt::Display::fmt(err, f),
            Self::DuplicateDataset(key) => write!(f, "duplicate dataset key {key:?}"),
            Self::DuplicateCollection(address) => write!(f, "duplicate collection {address}"),
            Self::DuplicateField { collection, path } => {
                write!(f, "duplicate field path {path} in collection {collection}")
            }
            Self::UnresolvableReference { source, target } => {
                write!(f, "unresolvable reference from {source} to {target}")
            }
            Self::SelfReference { source, target } => {
                write!(f, "self-referential edge from {source} to {target}")
            }
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => std::error::Error::source(err),
            _ => None,
        }
    }
}

impl From<SchemaError> for GraphError {
    fn from(err: SchemaError) -> Self {
        Self::Validation(err)
    }
}

/// A directed value-flow edge: rows read at `source`'s collection supply
/// candidate values for `target`'s field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Edge {
    pub source: FieldAddress,
    pub target: FieldAddress,
}

impl Edge {
    #[must_use]
    pub fn new(source: FieldAddress, target: FieldAddress) -> Self {
        Self { source, target }
    }
}

impl fmt::Display for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}

/// One collection as it sits in the graph.
#[derive(Debug, Clone)]
pub struct GraphNode {
    pub address: CollectionAddress,
    pub collection: Collection,
    /// Explicit ordering constraints: collection-level *after* entries
    /// plus the expansion of the owning dataset's *after* datasets.
    /// Entries naming collections that were never loaded stay here but
    /// never block traversal.
    pub after: BTreeSet<CollectionAddress>,
}

/// The immutable graph of all loaded collections.
#[derive(Debug)]
pub struct DatasetGraph {
    nodes: HashMap<CollectionAddress, GraphNode>,
    /// Addresses in declaration order: datasets as passed to `build`,
    /// collections as declared within each.
    order: Vec<CollectionAddress>,
    edges: BTreeSet<Edge>,
    /// Identity-flagged fields and the seed identity key each matches.
    identity_keys: BTreeMap<FieldAddress, String>,
}

impl DatasetGraph {
    /// Assembles the graph, consuming the datasets.
    ///
    /// Fails on duplicate dataset keys or collection names, duplicate
    /// field paths within a collection, malformed reference syntax, and
    /// references whose target field does not exist.
    pub fn build(datasets: Vec<Dataset>) -> GraphResult<Self> {
        let mut seen_keys = HashSet::new();
        for dataset in &datasets {
            if !seen_keys.insert(dataset.key.clone()) {
                return Err(GraphError::DuplicateDataset(dataset.key.clone()));
            }
        }

        let mut nodes: HashMap<CollectionAddress, GraphNode> = HashMap::new();
        let mut order = Vec::new();
        for dataset in &datasets {
            // Dataset-level ordering expands to every collection of each
            // named dataset.
            let dataset_after: BTreeSet<CollectionAddress> = dataset
                .after
                .iter()
                .flat_map(|key| {
                    datasets
                        .iter()
                        .filter(move |d| &d.key == key)
                        .flat_map(|d| {
                            d.collections
                                .iter()
                                .map(|c| CollectionAddress::new(d.key.clone(), c.name.clone()))
                        })
                })
                .collect();

            for collection in &dataset.collections {
                let address = CollectionAddress::new(dataset.key.clone(), collection.name.clone());
                if nodes.contains_key(&address) {
                    return Err(GraphError::DuplicateCollection(address));
                }

                let mut paths = HashSet::new();
                for (path, _) in collection.field_map() {
                    if !paths.insert(path.clone()) {
                        return Err(GraphError::DuplicateField {
                            collection: address.clone(),
                            path,
                        });
                    }
                }

                let mut after = collection.after.clone();
                after.extend(dataset_after.iter().cloned());
                order.push(address.clone());
                nodes.insert(
                    address.clone(),
                    GraphNode {
                        address,
                        collection: collection.clone(),
                        after,
                    },
                );
            }
        }

        let mut edges = BTreeSet::new();
        let mut identity_keys = BTreeMap::new();
        for address in &order {
            let node = &nodes[address];
            for (path, identity_key) in node.collection.identity_paths() {
                identity_keys.insert(address.field_address(path), identity_key.to_string());
            }
            for (path, reference) in node.collection.references() {
                let source = address.field_address(path);
                let target = reference.target_address()?;
                if target.collection_address() == address {
                    return Err(GraphError::SelfReference { source, target });
                }
                let resolvable = nodes
                    .get(target.collection_address())
                    .is_some_and(|n| n.collection.field(&target.field_path).is_some());
                if !resolvable {
                    return Err(GraphError::UnresolvableReference { source, target });
                }
                match reference.direction {
                    Some(EdgeDirection::From) => {
                        edges.insert(Edge::new(target, source));
                    }
                    Some(EdgeDirection::To) => {
                        edges.insert(Edge::new(source, target));
                    }
                    None => {
                        edges.insert(Edge::new(source.clone(), target.clone()));
                        edges.insert(Edge::new(target, source));
                    }
                }
            }
        }

        debug!(
            nodes = order.len(),
            edges = edges.len(),
            identities = identity_keys.len(),
            "dataset graph built"
        );
        Ok(Self {
            nodes,
            order,
            edges,
            identity_keys,
        })
    }

    /// Number of collections in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the graph holds no collections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Looks up a node by address.
    #[must_use]
    pub fn node(&self, address: &CollectionAddress) -> Option<&GraphNode> {
        self.nodes.get(address)
    }

    /// Nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &GraphNode> {
        self.order.iter().map(|address| &self.nodes[address])
    }

    /// Addresses in declaration order.
    #[must_use]
    pub fn order(&self) -> &[CollectionAddress] {
        &self.order
    }

    /// All value-flow edges.
    #[must_use]
    pub fn edges(&self) -> &BTreeSet<Edge> {
        &self.edges
    }

    /// Edges whose source field lives in `address`.
    pub fn edges_from(&self, address: &CollectionAddress) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(move |edge| edge.source.collection_address() == address)
    }

    /// Edges whose target field lives in `address`.
    pub fn edges_into(&self, address: &CollectionAddress) -> impl Iterator<Item = &Edge> {
        self.edges
            .iter()
            .filter(move |edge| edge.target.collection_address() == address)
    }

    /// Identity-flagged fields and the seed key each matches.
    #[must_use]
    pub fn identity_keys(&self) -> &BTreeMap<FieldAddress, String> {
        &self.identity_keys
    }
}
