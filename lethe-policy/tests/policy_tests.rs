use lethe_policy::{DataCategory, MaskingSpec, Policy, PolicyError, Rule};
use lethe_types::ActionType;
use pretty_assertions::assert_eq;
use serde_json::json;

fn cat(tag: &str) -> DataCategory {
    DataCategory::new(tag)
}

// ── Category matching ─────────────────────────────────────────────

#[test]
fn category_matches_itself_and_descendants() {
    let target = cat("user.provided.identifiable");
    assert!(target.matches(&cat("user.provided.identifiable")));
    assert!(target.matches(&cat("user.provided.identifiable.contact.email")));
    assert!(!target.matches(&cat("user.provided")));
    assert!(!target.matches(&cat("system.operations")));
}

#[test]
fn category_matching_is_segment_wise() {
    let target = cat("user.provided");
    assert!(!target.matches(&cat("user.provided_extra")));
    assert!(!target.matches(&cat("user.providedidentifiable.contact")));
    assert!(target.matches(&cat("user.provided.identifiable")));
}

#[test]
fn broader_categories_match_supersets() {
    let narrow = cat("user.provided.identifiable.contact");
    let broad = cat("user.provided");
    let tags = [
        cat("user.provided.identifiable.contact.email"),
        cat("user.provided.identifiable.dob"),
        cat("user.derived"),
    ];
    let narrow_hits: Vec<_> = tags.iter().filter(|t| narrow.matches(t)).collect();
    let broad_hits: Vec<_> = tags.iter().filter(|t| broad.matches(t)).collect();
    assert_eq!(narrow_hits.len(), 1);
    assert_eq!(broad_hits.len(), 2);
    assert!(narrow_hits.iter().all(|t| broad_hits.contains(t)));
}

#[test]
fn parent_walks_up_one_segment() {
    assert_eq!(cat("a.b.c").parent(), Some(cat("a.b")));
    assert_eq!(cat("a.b").parent(), Some(cat("a")));
    assert_eq!(cat("a").parent(), None);
}

// ── Rules ─────────────────────────────────────────────────────────

#[test]
fn rules_match_any_target_against_any_tag() {
    let rule = Rule::erasure("mask-contact", MaskingSpec::new("null_rewrite"))
        .with_target("user.provided.identifiable.contact")
        .with_target("user.derived.identifiable");
    assert!(rule.matches_tags(&[cat("user.provided.identifiable.contact.email")]));
    assert!(rule.matches_tags(&[
        cat("system.operations"),
        cat("user.derived.identifiable.device_id"),
    ]));
    assert!(!rule.matches_tags(&[cat("system.operations")]));
    assert!(!rule.matches_tags(&[]));
}

#[test]
fn rules_apply_only_to_their_action() {
    let access = Rule::access("download").with_target("user");
    let erasure =
        Rule::erasure("wipe", MaskingSpec::new("null_rewrite")).with_target("user");
    assert!(access.applies_to(ActionType::Access));
    assert!(!access.applies_to(ActionType::Erasure));
    assert!(erasure.applies_to(ActionType::Erasure));
}

#[test]
fn masking_spec_options_are_queryable() {
    let spec = MaskingSpec::new("string_rewrite").with_option("rewrite_value", json!("MASKED"));
    assert_eq!(spec.option("rewrite_value"), Some(&json!("MASKED")));
    assert_eq!(spec.option("length"), None);
}

// ── Policies ──────────────────────────────────────────────────────

#[test]
fn rules_for_preserves_declaration_order() {
    let policy = Policy::new("erase-user-data")
        .with_rule(
            Rule::erasure("broad", MaskingSpec::new("null_rewrite")).with_target("user"),
        )
        .with_rule(Rule::access("download").with_target("user"))
        .with_rule(
            Rule::erasure("contact", MaskingSpec::new("hash"))
                .with_target("user.provided.identifiable.contact"),
        );
    let erasure_keys: Vec<&str> = policy
        .rules_for(ActionType::Erasure)
        .map(|rule| rule.key.as_str())
        .collect();
    assert_eq!(erasure_keys, vec!["broad", "contact"]);

    let access_keys: Vec<&str> = policy
        .rules_for(ActionType::Access)
        .map(|rule| rule.key.as_str())
        .collect();
    assert_eq!(access_keys, vec!["download"]);
}

#[test]
fn validate_accepts_a_well_formed_policy() {
    let policy = Policy::new("p")
        .with_rule(Rule::access("a").with_target("user"))
        .with_rule(
            Rule::erasure("e", MaskingSpec::new("null_rewrite")).with_target("user"),
        );
    assert!(policy.validate().is_ok());
}

#[test]
fn validate_rejects_duplicate_rule_keys() {
    let policy = Policy::new("p")
        .with_rule(Rule::access("same").with_target("user"))
        .with_rule(Rule::access("same").with_target("system"));
    assert!(matches!(
        policy.validate().unwrap_err(),
        PolicyError::DuplicateRule(key) if key == "same"
    ));
}

#[test]
fn validate_rejects_rules_without_targets() {
    let policy = Policy::new("p").with_rule(Rule::access("untargeted"));
    assert!(matches!(
        policy.validate().unwrap_err(),
        PolicyError::EmptyTargets(key) if key == "untargeted"
    ));
}

#[test]
fn validate_rejects_erasure_rules_without_masking() {
    let mut rule = Rule::erasure("wipe", MaskingSpec::new("hash")).with_target("user");
    rule.masking_strategy = None;
    let policy = Policy::new("p").with_rule(rule);
    let err = policy.validate().unwrap_err();
    assert_eq!(err.to_string(), "erasure rule \"wipe\" has no masking strategy");
}

// ── Declarative form ──────────────────────────────────────────────

#[test]
fn policies_deserialize_from_declarative_json() {
    let policy: Policy = serde_json::from_value(json!({
        "key": "erase-user-data",
        "rules": [
            {
                "key": "mask-contact",
                "action_type": "erasure",
                "targets": [
                    {"data_category": "user.provided.identifiable.contact"}
                ],
                "masking_strategy": {
                    "strategy": "string_rewrite",
                    "configuration": {"rewrite_value": "MASKED"}
                }
            },
            {
                "key": "download",
                "action_type": "access",
                "targets": [{"data_category": "user"}]
            }
        ]
    }))
    .unwrap();

    assert_eq!(policy.rules.len(), 2);
    let masking = policy.rules[0].masking_strategy.as_ref().unwrap();
    assert_eq!(masking.strategy, "string_rewrite");
    assert_eq!(masking.option("rewrite_value"), Some(&json!("MASKED")));
    assert_eq!(policy.rules[1].action_type, ActionType::Access);
    assert!(policy.rules[1].masking_strategy.is_none());
    assert!(policy.validate().is_ok());
}
