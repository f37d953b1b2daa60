//! Shared coercion helpers used across built-in implementations.

use rust_decimal::Decimal;

use octofhir_fhirpath_core::FhirPathError;
use octofhir_fhirpath_model::{BoxedValue, Collection, FhirPathValue};

/// FHIRPath's singleton-to-boolean conversion (used by `where`'s predicate
/// result, `iif`'s condition, and logical operators): a one-item boolean
/// collection converts to that boolean; anything else is not a valid
/// boolean-evaluable result. Empty input collections are handled by the
/// caller before reaching here.
pub fn singleton_boolean(collection: &Collection) -> Result<bool, FhirPathError> {
    match collection.as_singleton() {
        Some(item) => item
            .value
            .as_bool()
            .ok_or_else(|| FhirPathError::invalid_operand_type("boolean predicate", "non-boolean", "Boolean")),
        None => Err(FhirPathError::singleton_required("boolean predicate")),
    }
}

pub fn singleton_string<'a>(collection: &'a Collection, op: &str) -> Result<&'a str, FhirPathError> {
    collection
        .as_singleton()
        .and_then(|item| item.value.as_str())
        .ok_or_else(|| FhirPathError::singleton_required(op))
}

pub fn singleton_integer(collection: &Collection, op: &str) -> Result<i64, FhirPathError> {
    collection
        .as_singleton()
        .and_then(|item| item.value.as_integer())
        .ok_or_else(|| FhirPathError::singleton_required(op))
}

pub fn singleton_decimal(collection: &Collection, op: &str) -> Result<Decimal, FhirPathError> {
    collection
        .as_singleton()
        .and_then(|item| item.value.as_decimal())
        .ok_or_else(|| FhirPathError::singleton_required(op))
}

pub fn boolean_collection(value: bool) -> Collection {
    Collection::singleton(BoxedValue::boolean(value))
}

pub fn integer_collection(value: i64) -> Collection {
    Collection::singleton(BoxedValue::integer(value))
}

pub fn decimal_collection(value: Decimal) -> Collection {
    Collection::singleton(BoxedValue::decimal(value))
}

pub fn string_collection(value: impl Into<std::sync::Arc<str>>) -> Collection {
    Collection::singleton(BoxedValue::string(value))
}

/// `=`/`!=` (spec.md §4.5 "string equality is codepoint-exact"): exact
/// string comparison, numeric cross-comparison between Integer/Decimal,
/// deep structural comparison of complex (`Object`) values preserving key
/// order significance is NOT required by the spec, so object keys compare
/// order-independently, but string leaves inside them compare exactly.
pub fn values_equal(a: &FhirPathValue, b: &FhirPathValue) -> bool {
    match (a, b) {
        (FhirPathValue::String(a), FhirPathValue::String(b)) => a.as_ref() == b.as_ref(),
        (FhirPathValue::Object(a), FhirPathValue::Object(b)) => json_deep_equal(a, b, false),
        (FhirPathValue::Integer(_) | FhirPathValue::Decimal(_), FhirPathValue::Integer(_) | FhirPathValue::Decimal(_)) => {
            a.as_decimal() == b.as_decimal()
        }
        _ => a == b,
    }
}

/// `~`/`!~` (spec.md §4.5, §9 open question, resolved in `DESIGN.md`):
/// structural equality that ignores object key order and collapses
/// whitespace runs in strings (at any nesting depth), but still treats
/// array/collection element order as significant — FHIRPath collections
/// are ordered.
pub fn values_equivalent(a: &FhirPathValue, b: &FhirPathValue) -> bool {
    match (a, b) {
        (FhirPathValue::String(a), FhirPathValue::String(b)) => {
            normalize_whitespace(a) == normalize_whitespace(b)
        }
        (FhirPathValue::Object(a), FhirPathValue::Object(b)) => json_deep_equal(a, b, true),
        (FhirPathValue::Integer(_) | FhirPathValue::Decimal(_), FhirPathValue::Integer(_) | FhirPathValue::Decimal(_)) => {
            a.as_decimal() == b.as_decimal()
        }
        _ => a == b,
    }
}

/// Recursive structural comparison over `serde_json::Value`, used for both
/// `=` (`collapse_whitespace = false`) and `~` (`collapse_whitespace =
/// true`) on complex values. Object keys never need to appear in the same
/// order; array order is always significant.
fn json_deep_equal(a: &serde_json::Value, b: &serde_json::Value, collapse_whitespace: bool) -> bool {
    use serde_json::Value;
    match (a, b) {
        (Value::Object(a), Value::Object(b)) => {
            a.len() == b.len()
                && a.iter().all(|(key, value)| {
                    b.get(key)
                        .map(|other| json_deep_equal(value, other, collapse_whitespace))
                        .unwrap_or(false)
                })
        }
        (Value::Array(a), Value::Array(b)) => {
            a.len() == b.len()
                && a.iter()
                    .zip(b.iter())
                    .all(|(x, y)| json_deep_equal(x, y, collapse_whitespace))
        }
        (Value::String(a), Value::String(b)) if collapse_whitespace => {
            normalize_whitespace(a) == normalize_whitespace(b)
        }
        _ => a == b,
    }
}

fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod equality_tests {
    use super::*;

    #[test]
    fn equal_is_codepoint_exact() {
        assert!(!values_equal(
            &FhirPathValue::string("a  b"),
            &FhirPathValue::string("a b")
        ));
    }

    #[test]
    fn equivalent_collapses_whitespace() {
        assert!(values_equivalent(
            &FhirPathValue::string("a  b"),
            &FhirPathValue::string("a b")
        ));
    }

    #[test]
    fn equivalent_objects_ignore_key_order() {
        let a = FhirPathValue::Object(serde_json::json!({"x": 1, "y": "a  b"}));
        let b = FhirPathValue::Object(serde_json::json!({"y": "a b", "x": 1}));
        assert!(values_equivalent(&a, &b));
        assert!(!values_equal(&a, &b));
    }
}
