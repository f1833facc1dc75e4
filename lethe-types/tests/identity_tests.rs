use lethe_types::Identity;
use serde_json::{Value, json};

#[test]
fn empty_identity_has_no_entries() {
    let identity = Identity::new();
    assert!(identity.is_empty());
    assert_eq!(identity.len(), 0);
    assert!(identity.get("email").is_none());
}

#[test]
fn with_email_sets_email_key() {
    let identity = Identity::new().with_email("customer-1@example.com");
    assert_eq!(
        identity.get("email"),
        Some(&Value::String("customer-1@example.com".into()))
    );
}

#[test]
fn with_phone_number_sets_phone_key() {
    let identity = Identity::new().with_phone_number("+15551234567");
    assert_eq!(
        identity.get("phone_number"),
        Some(&Value::String("+15551234567".into()))
    );
}

#[test]
fn with_value_accepts_arbitrary_keys() {
    let identity = Identity::new().with_value("loyalty_id", json!(42));
    assert_eq!(identity.get("loyalty_id"), Some(&json!(42)));
}

#[test]
fn later_writes_replace_earlier_ones() {
    let identity = Identity::new()
        .with_email("old@example.com")
        .with_email("new@example.com");
    assert_eq!(identity.len(), 1);
    assert_eq!(
        identity.get("email"),
        Some(&Value::String("new@example.com".into()))
    );
}

#[test]
fn iteration_is_key_ordered() {
    let identity = Identity::new()
        .with_phone_number("+15551234567")
        .with_email("a@example.com");
    let keys: Vec<&str> = identity.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, vec!["email", "phone_number"]);
}

#[test]
fn serializes_as_flat_map() {
    let identity = Identity::new().with_email("a@example.com");
    let json = serde_json::to_value(&identity).unwrap();
    assert_eq!(json, json!({"email": "a@example.com"}));
}

#[test]
fn deserializes_from_flat_map() {
    let identity: Identity =
        serde_json::from_value(json!({"email": "a@example.com", "phone_number": "1"})).unwrap();
    assert_eq!(identity.len(), 2);
    assert_eq!(
        identity.get("email"),
        Some(&Value::String("a@example.com".into()))
    );
}
