use lethe_graph::{DatasetGraph, Edge, GraphError};
use lethe_schema::{
    Collection, CollectionAddress, Dataset, EdgeDirection, Field, FieldAddress, FieldReference,
};
use pretty_assertions::assert_eq;

fn addr(dataset: &str, collection: &str) -> CollectionAddress {
    CollectionAddress::new(dataset, collection)
}

fn field(dataset: &str, collection: &str, path: &str) -> FieldAddress {
    FieldAddress::new(dataset, collection, path)
}

/// A small storefront schema: orders and payment cards both hang off the
/// customer's `id`.
fn storefront() -> Dataset {
    Dataset::new(
        "storefront",
        vec![
            Collection::new(
                "customer",
                vec![
                    Field::scalar("id").with_primary_key(),
                    Field::scalar("email").with_identity("email"),
                    Field::scalar("name"),
                ],
            ),
            Collection::new(
                "orders",
                vec![
                    Field::scalar("id").with_primary_key(),
                    Field::scalar("customer_id").with_reference(FieldReference::new(
                        "storefront",
                        "customer.id",
                        Some(EdgeDirection::From),
                    )),
                    Field::scalar("shipping_address_id"),
                ],
            ),
            Collection::new(
                "payment_card",
                vec![
                    Field::scalar("id").with_primary_key(),
                    Field::scalar("ccn"),
                    Field::scalar("customer_id").with_reference(FieldReference::new(
                        "storefront",
                        "customer.id",
                        Some(EdgeDirection::From),
                    )),
                ],
            ),
        ],
    )
}

// ── Construction ──────────────────────────────────────────────────

#[test]
fn collections_keep_declaration_order() {
    let graph = DatasetGraph::build(vec![storefront()]).unwrap();
    let order: Vec<String> = graph.order().iter().map(ToString::to_string).collect();
    assert_eq!(
        order,
        vec![
            "storefront:customer",
            "storefront:orders",
            "storefront:payment_card"
        ]
    );
    assert_eq!(graph.len(), 3);
}

#[test]
fn from_reference_makes_referenced_field_the_source() {
    let graph = DatasetGraph::build(vec![storefront()]).unwrap();
    assert!(graph.edges().contains(&Edge::new(
        field("storefront", "customer", "id"),
        field("storefront", "orders", "customer_id"),
    )));
    assert!(graph.edges().contains(&Edge::new(
        field("storefront", "customer", "id"),
        field("storefront", "payment_card", "customer_id"),
    )));
    assert_eq!(graph.edges().len(), 2);
    assert_eq!(graph.edges_from(&addr("storefront", "customer")).count(), 2);
    assert_eq!(graph.edges_into(&addr("storefront", "orders")).count(), 1);
}

#[test]
fn to_reference_makes_declaring_field_the_source() {
    let dataset = Dataset::new(
        "crm",
        vec![
            Collection::new(
                "contact",
                vec![
                    Field::scalar("id").with_primary_key(),
                    Field::scalar("email")
                        .with_identity("email")
                        .with_reference(FieldReference::new(
                            "crm",
                            "ticket.requester_email",
                            Some(EdgeDirection::To),
                        )),
                ],
            ),
            Collection::new(
                "ticket",
                vec![
                    Field::scalar("id").with_primary_key(),
                    Field::scalar("requester_email"),
                ],
            ),
        ],
    );
    let graph = DatasetGraph::build(vec![dataset]).unwrap();
    assert_eq!(graph.edges().len(), 1);
    assert!(graph.edges().contains(&Edge::new(
        field("crm", "contact", "email"),
        field("crm", "ticket", "requester_email"),
    )));
}

#[test]
fn undirected_reference_makes_edges_both_ways() {
    let dataset = Dataset::new(
        "crm",
        vec![
            Collection::new(
                "contact",
                vec![
                    Field::scalar("email")
                        .with_identity("email")
                        .with_reference(FieldReference::new("crm", "lead.email", None)),
                ],
            ),
            Collection::new("lead", vec![Field::scalar("email")]),
        ],
    );
    let graph = DatasetGraph::build(vec![dataset]).unwrap();
    assert_eq!(graph.edges().len(), 2);
    assert!(graph.edges().contains(&Edge::new(
        field("crm", "contact", "email"),
        field("crm", "lead", "email"),
    )));
    assert!(graph.edges().contains(&Edge::new(
        field("crm", "lead", "email"),
        field("crm", "contact", "email"),
    )));
}

#[test]
fn references_resolve_to_nested_field_paths() {
    let dataset = Dataset::new(
        "store",
        vec![
            Collection::new(
                "customer",
                vec![Field::scalar("email").with_identity("email")],
            ),
            Collection::new(
                "profile",
                vec![Field::object(
                    "contact",
                    vec![Field::scalar("email").with_reference(FieldReference::new(
                        "store",
                        "customer.email",
                        Some(EdgeDirection::From),
                    ))],
                )],
            ),
        ],
    );
    let graph = DatasetGraph::build(vec![dataset]).unwrap();
    assert!(graph.edges().contains(&Edge::new(
        field("store", "customer", "email"),
        field("store", "profile", "contact.email"),
    )));
}

#[test]
fn identity_fields_are_collected_with_their_keys() {
    let graph = DatasetGraph::build(vec![storefront()]).unwrap();
    let keys = graph.identity_keys();
    assert_eq!(keys.len(), 1);
    assert_eq!(
        keys.get(&field("storefront", "customer", "email")),
        Some(&"email".to_string())
    );
}

// ── Ordering constraints ──────────────────────────────────────────

#[test]
fn dataset_level_after_expands_to_every_collection() {
    let warehouse = Dataset::new(
        "warehouse",
        vec![Collection::new(
            "shipments",
            vec![
                Field::scalar("id").with_primary_key(),
                Field::scalar("email").with_identity("email"),
            ],
        )],
    )
    .with_after("storefront");
    let graph = DatasetGraph::build(vec![storefront(), warehouse]).unwrap();
    let node = graph.node(&addr("warehouse", "shipments")).unwrap();
    assert!(node.after.contains(&addr("storefront", "customer")));
    assert!(node.after.contains(&addr("storefront", "orders")));
    assert!(node.after.contains(&addr("storefront", "payment_card")));
}

#[test]
fn after_on_unknown_dataset_expands_to_nothing() {
    let warehouse = Dataset::new(
        "warehouse",
        vec![Collection::new(
            "shipments",
            vec![Field::scalar("email").with_identity("email")],
        )],
    )
    .with_after("retired_system");
    let graph = DatasetGraph::build(vec![warehouse]).unwrap();
    let node = graph.node(&addr("warehouse", "shipments")).unwrap();
    assert!(node.after.is_empty());
}

// ── Validation failures ───────────────────────────────────────────

#[test]
fn duplicate_dataset_keys_are_rejected() {
    let err = DatasetGraph::build(vec![storefront(), storefront()]).unwrap_err();
    assert!(matches!(err, GraphError::DuplicateDataset(key) if key == "storefront"));
}

#[test]
fn duplicate_collection_names_are_rejected() {
    let dataset = Dataset::new(
        "store",
        vec![
            Collection::new("customer", vec![Field::scalar("id")]),
            Collection::new("customer", vec![Field::scalar("email")]),
        ],
    );
    let err = DatasetGraph::build(vec![dataset]).unwrap_err();
    assert!(
        matches!(err, GraphError::DuplicateCollection(address) if address == addr("store", "customer"))
    );
}

#[test]
fn duplicate_field_paths_are_rejected() {
    let dataset = Dataset::new(
        "store",
        vec![Collection::new(
            "customer",
            vec![Field::scalar("email"), Field::scalar("email")],
        )],
    );
    let err = DatasetGraph::build(vec![dataset]).unwrap_err();
    assert!(matches!(err, GraphError::DuplicateField { .. }));
    assert_eq!(
        err.to_string(),
        "duplicate field path email in collection store:customer"
    );
}

#[test]
fn reference_to_missing_collection_is_rejected() {
    let dataset = Dataset::new(
        "store",
        vec![Collection::new(
            "orders",
            vec![Field::scalar("customer_id").with_reference(FieldReference::new(
                "store",
                "ghosts.id",
                Some(EdgeDirection::From),
            ))],
        )],
    );
    let err = DatasetGraph::build(vec![dataset]).unwrap_err();
    assert!(matches!(err, GraphError::UnresolvableReference { .. }));
}

#[test]
fn reference_to_missing_field_is_rejected() {
    let dataset = Dataset::new(
        "store",
        vec![
            Collection::new("customer", vec![Field::scalar("id")]),
            Collection::new(
                "orders",
                vec![Field::scalar("customer_id").with_reference(FieldReference::new(
                    "store",
                    "customer.uuid",
                    Some(EdgeDirection::From),
                ))],
            ),
        ],
    );
    let err = DatasetGraph::build(vec![dataset]).unwrap_err();
    match err {
        GraphError::UnresolvableReference { source, target } => {
            assert_eq!(source, field("store", "orders", "customer_id"));
            assert_eq!(target, field("store", "customer", "uuid"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn self_referential_field_is_rejected() {
    let dataset = Dataset::new(
        "store",
        vec![Collection::new(
            "customer",
            vec![Field::scalar("id").with_reference(FieldReference::new(
                "store",
                "customer.id",
                Some(EdgeDirection::From),
            ))],
        )],
    );
    let err = DatasetGraph::build(vec![dataset]).unwrap_err();
    assert!(matches!(err, GraphError::SelfReference { .. }));
}

#[test]
fn single_segment_reference_is_rejected() {
    let dataset = Dataset::new(
        "store",
        vec![Collection::new(
            "orders",
            vec![
                Field::scalar("customer_id")
                    .with_reference(FieldReference::new("store", "customer", None)),
            ],
        )],
    );
    let err = DatasetGraph::build(vec![dataset]).unwrap_err();
    assert!(matches!(err, GraphError::Validation(_)));
    assert_eq!(
        err.to_string(),
        "invalid field reference \"customer\": must be specified in the form 'collection.field'"
    );
}
