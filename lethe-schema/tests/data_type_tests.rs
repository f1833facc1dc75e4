use lethe_schema::DataType;
use serde_json::{Value, json};

// ── Parsing ───────────────────────────────────────────────────────

#[test]
fn parses_scalar_type_names() {
    assert_eq!(DataType::parse("string").unwrap(), (DataType::String, false));
    assert_eq!(DataType::parse("integer").unwrap(), (DataType::Integer, false));
    assert_eq!(DataType::parse("float").unwrap(), (DataType::Float, false));
    assert_eq!(DataType::parse("boolean").unwrap(), (DataType::Boolean, false));
    assert_eq!(DataType::parse("object_id").unwrap(), (DataType::ObjectId, false));
    assert_eq!(DataType::parse("object").unwrap(), (DataType::Object, false));
}

#[test]
fn parses_array_type_names() {
    assert_eq!(DataType::parse("string[]").unwrap(), (DataType::String, true));
    assert_eq!(DataType::parse("object[]").unwrap(), (DataType::Object, true));
}

#[test]
fn rejects_unknown_type_names() {
    assert!(DataType::parse("varchar").is_err());
    assert!(DataType::parse("string[][]").is_err());
}

#[test]
fn name_round_trips() {
    for name in ["string", "integer", "float", "boolean", "object_id", "object"] {
        let (data_type, _) = DataType::parse(name).unwrap();
        assert_eq!(data_type.name(), name);
    }
}

// ── Coercion ──────────────────────────────────────────────────────

#[test]
fn integer_accepts_numeric_strings() {
    assert_eq!(DataType::Integer.coerce(&json!("1")), Some(json!(1)));
    assert_eq!(DataType::Integer.coerce(&json!(" 2 ")), Some(json!(2)));
}

#[test]
fn integer_rejects_non_numeric_strings() {
    assert_eq!(DataType::Integer.coerce(&json!("A")), None);
    assert_eq!(DataType::Integer.coerce(&json!("1.5")), None);
}

#[test]
fn integer_passes_integers_through() {
    assert_eq!(DataType::Integer.coerce(&json!(7)), Some(json!(7)));
}

#[test]
fn string_stringifies_numbers_and_bools() {
    assert_eq!(DataType::String.coerce(&json!(1)), Some(json!("1")));
    assert_eq!(DataType::String.coerce(&json!(2.5)), Some(json!("2.5")));
    assert_eq!(DataType::String.coerce(&json!(true)), Some(json!("true")));
}

#[test]
fn string_rejects_containers() {
    assert_eq!(DataType::String.coerce(&json!({"a": 1})), None);
    assert_eq!(DataType::String.coerce(&json!([1])), None);
}

#[test]
fn boolean_accepts_pythonic_and_lowercase_words() {
    assert_eq!(DataType::Boolean.coerce(&json!("True")), Some(json!(true)));
    assert_eq!(DataType::Boolean.coerce(&json!("false")), Some(json!(false)));
    assert_eq!(DataType::Boolean.coerce(&json!(true)), Some(json!(true)));
}

#[test]
fn boolean_rejects_garbage() {
    assert_eq!(DataType::Boolean.coerce(&json!("yes")), None);
    assert_eq!(DataType::Boolean.coerce(&json!(1)), None);
}

#[test]
fn object_id_requires_24_hex_digits() {
    let valid = "61f2bc8d94caa3b1e0ca8dfa";
    assert_eq!(
        DataType::ObjectId.coerce(&json!(valid)),
        Some(json!(valid))
    );
    assert_eq!(DataType::ObjectId.coerce(&json!("not-an-object-id")), None);
    assert_eq!(DataType::ObjectId.coerce(&json!("61f2bc8d94caa3b1e0ca8df")), None);
}

#[test]
fn object_passes_maps_only() {
    assert_eq!(
        DataType::Object.coerce(&json!({"a": 1})),
        Some(json!({"a": 1}))
    );
    assert_eq!(DataType::Object.coerce(&json!("a")), None);
}

#[test]
fn null_never_coerces() {
    for data_type in [
        DataType::String,
        DataType::Integer,
        DataType::Float,
        DataType::Boolean,
        DataType::ObjectId,
        DataType::Object,
    ] {
        assert_eq!(data_type.coerce(&Value::Null), None);
    }
}
