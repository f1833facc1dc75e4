//! Property-based tests for traversal planning.
//!
//! These verify the guarantees the execution layer leans on:
//! - Planning is deterministic for identical inputs.
//! - Parents always appear before their children in the plan order.
//! - Every collection is either visited or reported unreachable.
//! - Reachable ordering constraints are honored.

use lethe_graph::{DatasetGraph, Traversal};
use lethe_schema::{Collection, CollectionAddress, Dataset, EdgeDirection, Field, FieldReference};
use lethe_types::Identity;
use proptest::prelude::*;

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

/// Generates a single-dataset schema of `n` collections where collection
/// zero carries the identity field and every reference or ordering
/// constraint points at an earlier-declared collection, so planning
/// always succeeds.
fn schema_strategy() -> impl Strategy<Value = Dataset> {
    (2usize..8)
        .prop_flat_map(|n| {
            let refs = prop::collection::vec(prop::option::of(0usize..n), n);
            let afters = prop::collection::vec(prop::option::of(0usize..n), n);
            (Just(n), refs, afters)
        })
        .prop_map(|(n, refs, afters)| {
            let collections = (0..n)
                .map(|i| {
                    let mut fields = vec![Field::scalar("id").with_primary_key()];
                    if i == 0 {
                        fields.push(Field::scalar("email").with_identity("email"));
                    }
                    if let Some(j) = refs[i] {
                        if j < i {
                            fields.push(Field::scalar("parent_id").with_reference(
                                FieldReference::new(
                                    "gen",
                                    format!("c{j}.id"),
                                    Some(EdgeDirection::From),
                                ),
                            ));
                        }
                    }
                    let mut collection = Collection::new(format!("c{i}"), fields);
                    if let Some(j) = afters[i] {
                        if j < i {
                            collection = collection
                                .with_after(CollectionAddress::new("gen", format!("c{j}")));
                        }
                    }
                    collection
                })
                .collect();
            Dataset::new("gen", collections)
        })
}

fn plan(dataset: Dataset) -> (DatasetGraph, Traversal) {
    let graph = DatasetGraph::build(vec![dataset]).unwrap();
    let identity = Identity::new().with_email("subject@example.com");
    let traversal = Traversal::new(&graph, &identity).unwrap();
    (graph, traversal)
}

// =============================================================================
// PLAN PROPERTIES
// =============================================================================

proptest! {
    /// The same schema and identity always produce the same plan.
    #[test]
    fn planning_is_deterministic(dataset in schema_strategy()) {
        let graph = DatasetGraph::build(vec![dataset]).unwrap();
        let identity = Identity::new().with_email("subject@example.com");
        let first = Traversal::new(&graph, &identity).unwrap();
        let second = Traversal::new(&graph, &identity).unwrap();
        prop_assert_eq!(first.order(), second.order());
        prop_assert_eq!(first.unreachable(), second.unreachable());
    }

    /// A collection never precedes any of its planned parents.
    #[test]
    fn parents_always_precede_their_children(dataset in schema_strategy()) {
        let (_, traversal) = plan(dataset);
        let order = traversal.order();
        for (i, address) in order.iter().enumerate() {
            let node = traversal.node(address).unwrap();
            for parent in node.parents() {
                let j = order.iter().position(|a| a == parent);
                prop_assert!(matches!(j, Some(j) if j < i));
            }
        }
    }

    /// Every collection is either in the plan or reported unreachable,
    /// and every planned collection had at least one seeded field.
    #[test]
    fn visited_and_skipped_partition_the_graph(dataset in schema_strategy()) {
        let (graph, traversal) = plan(dataset);
        prop_assert_eq!(
            traversal.order().len() + traversal.unreachable().len(),
            graph.len()
        );
        for address in traversal.order() {
            prop_assert!(!traversal.unreachable().contains(address));
            let node = traversal.node(address).unwrap();
            prop_assert!(node.seeds().values().all(|origins| !origins.is_empty()));
            prop_assert!(!node.seeds().is_empty());
        }
    }

    /// Ordering constraints on planned collections are honored.
    #[test]
    fn reachable_after_constraints_are_respected(dataset in schema_strategy()) {
        let (_, traversal) = plan(dataset);
        let order = traversal.order();
        for (i, address) in order.iter().enumerate() {
            let node = traversal.node(address).unwrap();
            for dep in node.after() {
                if let Some(j) = order.iter().position(|a| a == dep) {
                    prop_assert!(j < i);
                }
            }
        }
    }
}
