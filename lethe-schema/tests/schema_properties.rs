//! Property-based tests for the schema model.
//!
//! These verify the invariants the downstream planners lean on:
//! - Coercion is idempotent: a value that already passed coercion passes
//!   again unchanged.
//! - Field paths round-trip through their dotted string form.
//! - Address parsing accepts exactly the two-segment dotted form.

use lethe_schema::{CollectionAddress, DataType, FieldPath};
use proptest::prelude::*;
use serde_json::{Value, json};

// =============================================================================
// HELPER STRATEGIES
// =============================================================================

fn key_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{0,12}").unwrap()
}

fn segment_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(key_strategy(), 1..4)
}

fn scalar_value_strategy() -> impl Strategy<Value = Value> {
    prop_oneof![
        any::<i64>().prop_map(Value::from),
        any::<bool>().prop_map(Value::Bool),
        prop::string::string_regex("[ -~]{0,24}").unwrap().prop_map(Value::String),
    ]
}

fn data_type_strategy() -> impl Strategy<Value = DataType> {
    prop_oneof![
        Just(DataType::String),
        Just(DataType::Integer),
        Just(DataType::Float),
        Just(DataType::Boolean),
        Just(DataType::ObjectId),
    ]
}

// =============================================================================
// COERCION PROPERTIES
// =============================================================================

proptest! {
    /// Coercing an already-coerced value is a no-op.
    #[test]
    fn coercion_is_idempotent(
        data_type in data_type_strategy(),
        value in scalar_value_strategy(),
    ) {
        if let Some(coerced) = data_type.coerce(&value) {
            prop_assert_eq!(data_type.coerce(&coerced), Some(coerced));
        }
    }

    /// Coercion never produces null: uncoercible values drop instead.
    #[test]
    fn coercion_never_yields_null(
        data_type in data_type_strategy(),
        value in scalar_value_strategy(),
    ) {
        if let Some(coerced) = data_type.coerce(&value) {
            prop_assert!(!coerced.is_null());
        }
    }

    /// Integer coercion agrees with string-mediated coercion.
    #[test]
    fn integer_coercion_survives_stringification(n in any::<i64>()) {
        let direct = DataType::Integer.coerce(&json!(n));
        let via_string = DataType::Integer.coerce(&json!(n.to_string()));
        prop_assert_eq!(direct, via_string);
    }
}

// =============================================================================
// ADDRESS PROPERTIES
// =============================================================================

proptest! {
    /// Field paths round-trip through their dotted rendering.
    #[test]
    fn field_path_dotted_round_trip(segments in segment_strategy()) {
        let path = FieldPath::new(segments.clone());
        let rendered = path.to_string();
        prop_assert_eq!(FieldPath::from_dotted(&rendered), path);
        prop_assert_eq!(rendered.split('.').count(), segments.len());
    }

    /// Two well-formed keys always parse as a dotted collection reference.
    #[test]
    fn dotted_references_parse_for_valid_keys(
        dataset in key_strategy(),
        collection in key_strategy(),
    ) {
        let parsed = CollectionAddress::from_dotted(&format!("{dataset}.{collection}")).unwrap();
        prop_assert_eq!(parsed, CollectionAddress::new(dataset, collection));
    }

    /// The colon form round-trips through Display.
    #[test]
    fn colon_form_round_trips(
        dataset in key_strategy(),
        collection in key_strategy(),
    ) {
        let address = CollectionAddress::new(dataset, collection);
        let parsed = CollectionAddress::from_string(&address.to_string()).unwrap();
        prop_assert_eq!(parsed, address);
    }
}
