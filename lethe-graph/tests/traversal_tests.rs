use lethe_graph::{DatasetGraph, SeedOrigin, Traversal, TraversalError};
use lethe_schema::{
    Collection, CollectionAddress, Dataset, EdgeDirection, Field, FieldAddress, FieldPath,
    FieldReference,
};
use lethe_types::Identity;
use pretty_assertions::assert_eq;
use std::collections::BTreeSet;

fn addr(dataset: &str, collection: &str) -> CollectionAddress {
    CollectionAddress::new(dataset, collection)
}

fn field(dataset: &str, collection: &str, path: &str) -> FieldAddress {
    FieldAddress::new(dataset, collection, path)
}

fn build(datasets: Vec<Dataset>) -> DatasetGraph {
    DatasetGraph::build(datasets).unwrap()
}

fn email_identity() -> Identity {
    Identity::new().with_email("customer-1@example.com")
}

fn order_strings(traversal: &Traversal) -> Vec<String> {
    traversal.order().iter().map(ToString::to_string).collect()
}

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

// ── Visitation order ──────────────────────────────────────────────

#[test]
fn parents_run_first_and_siblings_keep_declaration_order() {
    let traversal = Traversal::new(&build(vec![storefront()]), &email_identity()).unwrap();
    assert_eq!(
        order_strings(&traversal),
        vec![
            "storefront:customer",
            "storefront:orders",
            "storefront:payment_card"
        ]
    );

    let customer = traversal.node(&addr("storefront", "customer")).unwrap();
    assert!(customer.parents().is_empty());
    assert_eq!(
        customer.children(),
        &BTreeSet::from([addr("storefront", "orders"), addr("storefront", "payment_card")])
    );
    assert_eq!(
        customer.seeds().get(&FieldPath::from("email")),
        Some(&BTreeSet::from([SeedOrigin::Identity("email".to_string())]))
    );

    let orders = traversal.node(&addr("storefront", "orders")).unwrap();
    assert_eq!(orders.parents(), &BTreeSet::from([addr("storefront", "customer")]));
    assert_eq!(
        orders.seeds().get(&FieldPath::from("customer_id")),
        Some(&BTreeSet::from([SeedOrigin::Reference(field(
            "storefront",
            "customer",
            "id"
        ))]))
    );
}

#[test]
fn children_in_other_datasets_run_after_their_parent() {
    let profiles = Dataset::new(
        "profiles",
        vec![Collection::new(
            "details",
            vec![
                Field::scalar("_id").with_primary_key(),
                Field::scalar("customer_id").with_reference(FieldReference::new(
                    "storefront",
                    "customer.id",
                    Some(EdgeDirection::From),
                )),
            ],
        )],
    );
    let traversal =
        Traversal::new(&build(vec![storefront(), profiles]), &email_identity()).unwrap();
    assert_eq!(
        order_strings(&traversal),
        vec![
            "storefront:customer",
            "storefront:orders",
            "storefront:payment_card",
            "profiles:details"
        ]
    );
    assert!(traversal.unreachable().is_empty());
}

#[test]
fn origins_from_multiple_parents_merge_on_one_field() {
    let storefront = Dataset::new(
        "storefront",
        vec![Collection::new(
            "customer",
            vec![
                Field::scalar("id").with_primary_key(),
                Field::scalar("email").with_identity("email"),
            ],
        )],
    );
    let support = Dataset::new(
        "support",
        vec![
            Collection::new(
                "agent",
                vec![
                    Field::scalar("id").with_primary_key(),
                    Field::scalar("email").with_identity("email"),
                ],
            ),
            Collection::new(
                "messages",
                vec![
                    Field::scalar("id").with_primary_key(),
                    Field::scalar("sender_id")
                        .with_reference(FieldReference::new(
                            "storefront",
                            "customer.id",
                            Some(EdgeDirection::From),
                        ))
                        .with_reference(FieldReference::new(
                            "support",
                            "agent.id",
                            Some(EdgeDirection::From),
                        )),
                ],
            ),
        ],
    );
    let traversal = Traversal::new(&build(vec![storefront, support]), &email_identity()).unwrap();
    assert_eq!(
        order_strings(&traversal),
        vec!["storefront:customer", "support:agent", "support:messages"]
    );

    let messages = traversal.node(&addr("support", "messages")).unwrap();
    assert_eq!(
        messages.parents(),
        &BTreeSet::from([addr("storefront", "customer"), addr("support", "agent")])
    );
    assert_eq!(
        messages.seeds().get(&FieldPath::from("sender_id")),
        Some(&BTreeSet::from([
            SeedOrigin::Reference(field("storefront", "customer", "id")),
            SeedOrigin::Reference(field("support", "agent", "id")),
        ]))
    );
}

#[test]
fn identity_and_reference_origins_accumulate_on_one_field() {
    let crm = Dataset::new(
        "crm",
        vec![
            Collection::new(
                "contact",
                vec![Field::scalar("email").with_identity("email")],
            ),
            Collection::new(
                "newsletter",
                vec![
                    Field::scalar("email")
                        .with_identity("email")
                        .with_reference(FieldReference::new(
                            "crm",
                            "contact.email",
                            Some(EdgeDirection::From),
                        )),
                ],
            ),
        ],
    );
    let traversal = Traversal::new(&build(vec![crm]), &email_identity()).unwrap();
    assert_eq!(order_strings(&traversal), vec!["crm:contact", "crm:newsletter"]);

    let newsletter = traversal.node(&addr("crm", "newsletter")).unwrap();
    assert_eq!(
        newsletter.seeds().get(&FieldPath::from("email")),
        Some(&BTreeSet::from([
            SeedOrigin::Identity("email".to_string()),
            SeedOrigin::Reference(field("crm", "contact", "email")),
        ]))
    );
}

#[test]
fn identity_collection_declared_first_does_not_wait_for_a_later_parent() {
    let dataset = Dataset::new(
        "m",
        vec![
            Collection::new(
                "beta",
                vec![
                    Field::scalar("email").with_identity("email"),
                    Field::scalar("link_id").with_reference(FieldReference::new(
                        "m",
                        "alpha.id",
                        Some(EdgeDirection::From),
                    )),
                ],
            ),
            Collection::new(
                "alpha",
                vec![
                    Field::scalar("id").with_primary_key(),
                    Field::scalar("email").with_identity("email"),
                ],
            ),
        ],
    );
    let traversal = Traversal::new(&build(vec![dataset]), &email_identity()).unwrap();
    assert_eq!(order_strings(&traversal), vec!["m:beta", "m:alpha"]);

    // beta ran on its identity seed alone; the alpha edge was never taken.
    let beta = traversal.node(&addr("m", "beta")).unwrap();
    assert!(beta.parents().is_empty());
    assert_eq!(beta.seeds().len(), 1);
    assert!(beta.seeds().get(&FieldPath::from("link_id")).is_none());
}

// ── Reachability ──────────────────────────────────────────────────

#[test]
fn empty_graph_plans_an_empty_traversal() {
    let traversal = Traversal::new(&build(vec![]), &email_identity()).unwrap();
    assert!(traversal.order().is_empty());
    assert!(traversal.unreachable().is_empty());
}

#[test]
fn unmatched_identity_keys_fail_with_no_reachable_collections() {
    let identity = Identity::new().with_phone_number("+15551234567");
    let err = Traversal::new(&build(vec![storefront()]), &identity).unwrap_err();
    assert!(matches!(err, TraversalError::NoReachableCollections(_)));
    assert_eq!(
        err.to_string(),
        "no collection is reachable from identity keys [phone_number]"
    );
}

#[test]
fn disconnected_collections_are_skipped_not_failed() {
    let metrics = Dataset::new(
        "metrics",
        vec![Collection::new(
            "telemetry",
            vec![Field::scalar("id").with_primary_key()],
        )],
    );
    let traversal =
        Traversal::new(&build(vec![storefront(), metrics]), &email_identity()).unwrap();
    assert_eq!(traversal.order().len(), 3);
    assert_eq!(traversal.unreachable(), &[addr("metrics", "telemetry")]);
    assert!(!traversal.node(&addr("metrics", "telemetry")).unwrap().is_visited());
}

// ── Ordering constraints ──────────────────────────────────────────

#[test]
fn after_constraints_defer_earlier_declared_collections() {
    let ops = Dataset::new(
        "ops",
        vec![
            Collection::new(
                "audit",
                vec![Field::scalar("email").with_identity("email")],
            )
            .with_after(addr("ops", "primary")),
            Collection::new(
                "primary",
                vec![Field::scalar("email").with_identity("email")],
            ),
        ],
    );
    let traversal = Traversal::new(&build(vec![ops]), &email_identity()).unwrap();
    assert_eq!(order_strings(&traversal), vec!["ops:primary", "ops:audit"]);
}

#[test]
fn after_constraints_on_unreachable_collections_are_waived() {
    let queue = Dataset::new(
        "queue",
        vec![
            Collection::new("telemetry", vec![Field::scalar("id")]),
            Collection::new(
                "jobs",
                vec![Field::scalar("email").with_identity("email")],
            )
            .with_after(addr("queue", "telemetry")),
        ],
    );
    let traversal = Traversal::new(&build(vec![queue]), &email_identity()).unwrap();
    assert_eq!(order_strings(&traversal), vec!["queue:jobs"]);
    assert_eq!(traversal.unreachable(), &[addr("queue", "telemetry")]);
}

#[test]
fn self_after_cycle_fails_with_named_path() {
    let queue = Dataset::new(
        "queue",
        vec![
            Collection::new(
                "jobs",
                vec![Field::scalar("email").with_identity("email")],
            )
            .with_after(addr("queue", "jobs")),
        ],
    );
    let err = Traversal::new(&build(vec![queue]), &email_identity()).unwrap_err();
    assert!(matches!(err, TraversalError::OrderingCycle(_)));
    assert_eq!(
        err.to_string(),
        "ordering cycle among collections: queue:jobs -> queue:jobs"
    );
}

#[test]
fn mutual_after_cycle_fails_with_named_path() {
    let dataset = Dataset::new(
        "x",
        vec![
            Collection::new("a", vec![Field::scalar("email").with_identity("email")])
                .with_after(addr("x", "b")),
            Collection::new("b", vec![Field::scalar("email").with_identity("email")])
                .with_after(addr("x", "a")),
        ],
    );
    let err = Traversal::new(&build(vec![dataset]), &email_identity()).unwrap_err();
    assert_eq!(
        err.to_string(),
        "ordering cycle among collections: x:a -> x:b -> x:a"
    );
}

#[test]
fn after_entangled_with_data_dependencies_fails_listing_blocked_collections() {
    let store = Dataset::new(
        "store",
        vec![
            Collection::new(
                "customer",
                vec![
                    Field::scalar("id").with_primary_key(),
                    Field::scalar("email").with_identity("email"),
                ],
            )
            .with_after(addr("store", "orders")),
            Collection::new(
                "orders",
                vec![Field::scalar("customer_id").with_reference(FieldReference::new(
                    "store",
                    "customer.id",
                    Some(EdgeDirection::From),
                ))],
            ),
        ],
    );
    let err = Traversal::new(&build(vec![store]), &email_identity()).unwrap_err();
    assert!(matches!(err, TraversalError::OrderingCycle(_)));
    assert_eq!(
        err.to_string(),
        "ordering cycle among collections: store:customer, store:orders"
    );
}
