//! Symbol and keyword binary operators (spec.md §4.1 catalogue, §4.4.1,
//! §4.5): arithmetic, comparison, equality, logical (three-valued), union,
//! and membership. Navigation (`.`), indexing (`a[i]`), and `is`/`as`
//! (which need the *unevaluated* right-hand type name, not a collection)
//! are handled directly by the interpreter — they never go through
//! `FhirPathOperator::evaluate` (spec.md §4.3 navigation/type-operator
//! contracts).

use octofhir_fhirpath_core::FhirPathError;
use octofhir_fhirpath_model::{BoxedValue, Collection, FhirPathValue, Quantity};
use rust_decimal::Decimal;

use crate::builtins::combining::union_collections;
use crate::builtins::support::{boolean_collection, values_equal, values_equivalent};
use crate::builtins::temporal_arith;
use crate::operation::FhirPathOperator;

fn empty_if_either_empty(left: &Collection, right: &Collection) -> Option<Collection> {
    if left.is_empty() || right.is_empty() {
        Some(Collection::empty())
    } else {
        None
    }
}

fn singletons<'a>(left: &'a Collection, right: &'a Collection, op: &str) -> Result<(&'a BoxedValue, &'a BoxedValue), FhirPathError> {
    match (left.as_singleton(), right.as_singleton()) {
        (Some(l), Some(r)) => Ok((l, r)),
        _ => Err(FhirPathError::singleton_required(op)),
    }
}

/// `Decimal` if either operand is `Decimal`, else `Integer` (spec.md
/// §4.4.1 arithmetic type rule).
enum NumericResult {
    Integer(i64),
    Decimal(Decimal),
}

fn numeric_op(
    left: &FhirPathValue,
    right: &FhirPathValue,
    int_op: impl Fn(i64, i64) -> Option<i64>,
    dec_op: impl Fn(Decimal, Decimal) -> Option<Decimal>,
) -> Option<NumericResult> {
    match (left, right) {
        (FhirPathValue::Integer(a), FhirPathValue::Integer(b)) => int_op(*a, *b).map(NumericResult::Integer),
        _ => {
            let (a, b) = (left.as_decimal()?, right.as_decimal()?);
            dec_op(a, b).map(NumericResult::Decimal)
        }
    }
}

fn numeric_collection(result: NumericResult) -> Collection {
    match result {
        NumericResult::Integer(i) => Collection::singleton(BoxedValue::integer(i)),
        NumericResult::Decimal(d) => Collection::singleton(BoxedValue::decimal(d)),
    }
}

macro_rules! arith_operator {
    ($struct_name:ident, $symbol:literal, $int_op:expr, $dec_op:expr) => {
        pub struct $struct_name;
        impl FhirPathOperator for $struct_name {
            fn symbol(&self) -> &'static str {
                $symbol
            }
            fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
                if let Some(empty) = empty_if_either_empty(left, right) {
                    return Ok(empty);
                }
                let (l, r) = singletons(left, right, $symbol)?;
                match (&l.value, &r.value) {
                    (FhirPathValue::Quantity(a), FhirPathValue::Quantity(b)) => {
                        arith_quantity($symbol, a, b)
                    }
                    (FhirPathValue::Date(d), FhirPathValue::Quantity(q)) => {
                        arith_date($symbol, d, q)
                    }
                    (FhirPathValue::DateTime(d), FhirPathValue::Quantity(q)) => {
                        arith_datetime($symbol, d, q)
                    }
                    (FhirPathValue::Time(t), FhirPathValue::Quantity(q)) => {
                        arith_time($symbol, t, q)
                    }
                    (a, b) => {
                        #[allow(clippy::redundant_closure_call)]
                        match numeric_op(a, b, $int_op, $dec_op) {
                            Some(result) => Ok(numeric_collection(result)),
                            None => arith_fallback($symbol, a, b),
                        }
                    }
                }
            }
        }
    };
}

fn arith_quantity(symbol: &str, a: &Quantity, b: &Quantity) -> Result<Collection, FhirPathError> {
    let result = match symbol {
        "+" => a.add(b).ok(),
        "-" => a.subtract(b).ok(),
        "*" => Some(a.multiply(b)),
        "/" => a.divide(b),
        _ => None,
    };
    match result {
        Some(q) => Ok(Collection::singleton(BoxedValue::new(FhirPathValue::Quantity(q)))),
        None => Ok(Collection::empty()),
    }
}

fn arith_date(symbol: &str, date: &octofhir_fhirpath_model::PrecisionDate, q: &Quantity) -> Result<Collection, FhirPathError> {
    let sign = match symbol {
        "+" => 1,
        "-" => -1,
        _ => return Ok(Collection::empty()),
    };
    match temporal_arith::add_to_date(date, q, sign) {
        Some(d) => Ok(Collection::singleton(BoxedValue::new(FhirPathValue::Date(d)))),
        None => Ok(Collection::empty()),
    }
}

fn arith_datetime(symbol: &str, dt: &octofhir_fhirpath_model::PrecisionDateTime, q: &Quantity) -> Result<Collection, FhirPathError> {
    let sign = match symbol {
        "+" => 1,
        "-" => -1,
        _ => return Ok(Collection::empty()),
    };
    match temporal_arith::add_to_datetime(dt, q, sign) {
        Some(d) => Ok(Collection::singleton(BoxedValue::new(FhirPathValue::DateTime(d)))),
        None => Ok(Collection::empty()),
    }
}

fn arith_time(symbol: &str, t: &octofhir_fhirpath_model::PrecisionTime, q: &Quantity) -> Result<Collection, FhirPathError> {
    let sign = match symbol {
        "+" => 1,
        "-" => -1,
        _ => return Ok(Collection::empty()),
    };
    match temporal_arith::add_to_time(t, q, sign) {
        Some(d) => Ok(Collection::singleton(BoxedValue::new(FhirPathValue::Time(d)))),
        None => Ok(Collection::empty()),
    }
}

/// `+` on `String × String` is concatenation (spec.md §4.4.1); everything
/// else with no numeric/temporal reading is a type error.
fn arith_fallback(symbol: &str, a: &FhirPathValue, b: &FhirPathValue) -> Result<Collection, FhirPathError> {
    match (symbol, a, b) {
        ("+", FhirPathValue::String(a), FhirPathValue::String(b)) => {
            Ok(Collection::singleton(BoxedValue::string(format!("{a}{b}"))))
        }
        _ => Err(FhirPathError::invalid_operand_type(
            symbol,
            a.type_name().as_str(),
            b.type_name().as_str(),
        )),
    }
}

arith_operator!(Add, "+", |a, b| a.checked_add(b), |a, b| Some(a + b));
arith_operator!(Sub, "-", |a, b| a.checked_sub(b), |a, b| Some(a - b));
arith_operator!(Mul, "*", |a, b| a.checked_mul(b), |a, b| Some(a * b));

/// `/` (spec.md §4.4.1 "result is Decimal if either is Decimal else
/// Integer"): evenly-divisible `Integer / Integer` stays Integer; anything
/// else (including a remainder) promotes to Decimal rather than erroring,
/// since true division of two integers is not itself an integer.
pub struct Div;
impl FhirPathOperator for Div {
    fn symbol(&self) -> &'static str {
        "/"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        if let Some(empty) = empty_if_either_empty(left, right) {
            return Ok(empty);
        }
        let (l, r) = singletons(left, right, "/")?;
        match (&l.value, &r.value) {
            (FhirPathValue::Quantity(a), FhirPathValue::Quantity(b)) => arith_quantity("/", a, b),
            (a, b) => {
                let (av, bv) = (
                    a.as_decimal().ok_or_else(|| FhirPathError::invalid_operand_type("/", a.type_name().as_str(), b.type_name().as_str()))?,
                    b.as_decimal().ok_or_else(|| FhirPathError::invalid_operand_type("/", a.type_name().as_str(), b.type_name().as_str()))?,
                );
                if bv.is_zero() {
                    return Ok(Collection::empty());
                }
                let quotient = av / bv;
                match (a, b) {
                    (FhirPathValue::Integer(_), FhirPathValue::Integer(_)) if (av % bv).is_zero() => {
                        Ok(Collection::singleton(BoxedValue::integer(quotient.try_into().unwrap_or(0))))
                    }
                    _ => Ok(Collection::singleton(BoxedValue::decimal(quotient))),
                }
            }
        }
    }
}

/// `div`/`mod` (spec.md §4.4.1): `Integer×Integer → Integer`, `Decimal`
/// operands allowed and also result in the same kind as `/` would, per
/// spec's "Decimal allowed → Decimal".
pub struct IntDiv;
impl FhirPathOperator for IntDiv {
    fn symbol(&self) -> &'static str {
        "div"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        if let Some(empty) = empty_if_either_empty(left, right) {
            return Ok(empty);
        }
        let (l, r) = singletons(left, right, "div")?;
        match (&l.value, &r.value) {
            (FhirPathValue::Integer(a), FhirPathValue::Integer(b)) => {
                if *b == 0 {
                    Ok(Collection::empty())
                } else {
                    Ok(Collection::singleton(BoxedValue::integer(a.div_euclid(*b))))
                }
            }
            (a, b) => {
                let (a, b) = (
                    a.as_decimal().ok_or_else(|| FhirPathError::invalid_operand_type("div", a.type_name().as_str(), b.type_name().as_str()))?,
                    b.as_decimal().ok_or_else(|| FhirPathError::invalid_operand_type("div", a.type_name().as_str(), b.type_name().as_str()))?,
                );
                if b.is_zero() {
                    return Ok(Collection::empty());
                }
                Ok(Collection::singleton(BoxedValue::integer((a / b).trunc().try_into().unwrap_or(0))))
            }
        }
    }
}

pub struct Mod;
impl FhirPathOperator for Mod {
    fn symbol(&self) -> &'static str {
        "mod"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        if let Some(empty) = empty_if_either_empty(left, right) {
            return Ok(empty);
        }
        let (l, r) = singletons(left, right, "mod")?;
        match (&l.value, &r.value) {
            (FhirPathValue::Integer(a), FhirPathValue::Integer(b)) => {
                if *b == 0 {
                    Ok(Collection::empty())
                } else {
                    Ok(Collection::singleton(BoxedValue::integer(a.rem_euclid(*b))))
                }
            }
            (a, b) => {
                let (a, b) = (
                    a.as_decimal().ok_or_else(|| FhirPathError::invalid_operand_type("mod", a.type_name().as_str(), b.type_name().as_str()))?,
                    b.as_decimal().ok_or_else(|| FhirPathError::invalid_operand_type("mod", a.type_name().as_str(), b.type_name().as_str()))?,
                );
                if b.is_zero() {
                    return Ok(Collection::empty());
                }
                Ok(Collection::singleton(BoxedValue::decimal(a % b)))
            }
        }
    }
}

/// `&` (spec.md §4.4.1 "string concatenation"). Unlike `+`, `&` treats an
/// empty operand as the empty string rather than propagating empty.
pub struct Concat;
impl FhirPathOperator for Concat {
    fn symbol(&self) -> &'static str {
        "&"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        let l = left.as_singleton().map(|v| v.value.to_display_string()).unwrap_or_default();
        let r = right.as_singleton().map(|v| v.value.to_display_string()).unwrap_or_default();
        Ok(Collection::singleton(BoxedValue::string(format!("{l}{r}"))))
    }
}

macro_rules! comparison_operator {
    ($struct_name:ident, $symbol:literal, $cmp:expr) => {
        pub struct $struct_name;
        impl FhirPathOperator for $struct_name {
            fn symbol(&self) -> &'static str {
                $symbol
            }
            fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
                if let Some(empty) = empty_if_either_empty(left, right) {
                    return Ok(empty);
                }
                let (l, r) = singletons(left, right, $symbol)?;
                let ordering = compare_values(&l.value, &r.value)
                    .ok_or_else(|| FhirPathError::invalid_operand_type($symbol, l.value.type_name().as_str(), r.value.type_name().as_str()))?;
                #[allow(clippy::redundant_closure_call)]
                Ok(boolean_collection(($cmp)(ordering)))
            }
        }
    };
}

fn compare_values(a: &FhirPathValue, b: &FhirPathValue) -> Option<std::cmp::Ordering> {
    match (a, b) {
        (FhirPathValue::Integer(a), FhirPathValue::Integer(b)) => Some(a.cmp(b)),
        (FhirPathValue::String(a), FhirPathValue::String(b)) => Some(a.cmp(b)),
        (FhirPathValue::Date(a), FhirPathValue::Date(b)) => Some(a.date.cmp(&b.date)),
        (FhirPathValue::Time(a), FhirPathValue::Time(b)) => Some(a.time.cmp(&b.time)),
        (FhirPathValue::DateTime(a), FhirPathValue::DateTime(b)) => Some(
            a.date
                .date
                .cmp(&b.date.date)
                .then_with(|| a.time.as_ref().map(|t| t.time).cmp(&b.time.as_ref().map(|t| t.time))),
        ),
        (FhirPathValue::Quantity(a), FhirPathValue::Quantity(b)) => a.compare(b),
        (FhirPathValue::Boolean(a), FhirPathValue::Boolean(b)) => Some(a.cmp(b)),
        _ => match (a.as_decimal(), b.as_decimal()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => None,
        },
    }
}

comparison_operator!(Lt, "<", |o: std::cmp::Ordering| o.is_lt());
comparison_operator!(Le, "<=", |o: std::cmp::Ordering| o.is_le());
comparison_operator!(Gt, ">", |o: std::cmp::Ordering| o.is_gt());
comparison_operator!(Ge, ">=", |o: std::cmp::Ordering| o.is_ge());

/// `=`/`!=` (spec.md §4.4.1 "defined for any pair"): deep structural
/// equality, not restricted to singletons — two collections of different
/// lengths are unequal; same length compares element-wise.
pub struct Eq;
impl FhirPathOperator for Eq {
    fn symbol(&self) -> &'static str {
        "="
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        if let Some(empty) = empty_if_either_empty(left, right) {
            return Ok(empty);
        }
        Ok(boolean_collection(collections_equal(left, right, values_equal)))
    }
}

pub struct Neq;
impl FhirPathOperator for Neq {
    fn symbol(&self) -> &'static str {
        "!="
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        if let Some(empty) = empty_if_either_empty(left, right) {
            return Ok(empty);
        }
        Ok(boolean_collection(!collections_equal(left, right, values_equal)))
    }
}

/// `~`/`!~` (spec.md §4.4.1 "structural equality ignoring whitespace and
/// key order"): unlike `=`/`!=`, never propagates empty — `{} ~ {}` is
/// `true`.
pub struct Equiv;
impl FhirPathOperator for Equiv {
    fn symbol(&self) -> &'static str {
        "~"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        Ok(boolean_collection(collections_equal(left, right, values_equivalent)))
    }
}

pub struct NotEquiv;
impl FhirPathOperator for NotEquiv {
    fn symbol(&self) -> &'static str {
        "!~"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        Ok(boolean_collection(!collections_equal(left, right, values_equivalent)))
    }
}

fn collections_equal(left: &Collection, right: &Collection, cmp: impl Fn(&FhirPathValue, &FhirPathValue) -> bool) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right.iter())
            .all(|(a, b)| cmp(&a.value, &b.value))
}

/// Three-valued-logic `and`/`or`/`xor`/`implies` (spec.md §4.5 "logical
/// operators follow FHIRPath three-valued logic").
fn as_opt_bool(collection: &Collection, op: &str) -> Result<Option<bool>, FhirPathError> {
    match collection.as_singleton() {
        Some(item) => item
            .value
            .as_bool()
            .map(Some)
            .ok_or_else(|| FhirPathError::invalid_operand_type(op, "non-boolean", "Boolean")),
        None if collection.is_empty() => Ok(None),
        None => Err(FhirPathError::singleton_required(op)),
    }
}

fn bool_collection_opt(value: Option<bool>) -> Collection {
    match value {
        Some(b) => boolean_collection(b),
        None => Collection::empty(),
    }
}

pub struct And;
impl FhirPathOperator for And {
    fn symbol(&self) -> &'static str {
        "and"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        let l = as_opt_bool(left, "and")?;
        let r = as_opt_bool(right, "and")?;
        let result = match (l, r) {
            (Some(false), _) | (_, Some(false)) => Some(false),
            (Some(true), Some(true)) => Some(true),
            _ => None,
        };
        Ok(bool_collection_opt(result))
    }
}

pub struct Or;
impl FhirPathOperator for Or {
    fn symbol(&self) -> &'static str {
        "or"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        let l = as_opt_bool(left, "or")?;
        let r = as_opt_bool(right, "or")?;
        let result = match (l, r) {
            (Some(true), _) | (_, Some(true)) => Some(true),
            (Some(false), Some(false)) => Some(false),
            _ => None,
        };
        Ok(bool_collection_opt(result))
    }
}

pub struct Xor;
impl FhirPathOperator for Xor {
    fn symbol(&self) -> &'static str {
        "xor"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        let l = as_opt_bool(left, "xor")?;
        let r = as_opt_bool(right, "xor")?;
        let result = match (l, r) {
            (Some(a), Some(b)) => Some(a != b),
            _ => None,
        };
        Ok(bool_collection_opt(result))
    }
}

pub struct Implies;
impl FhirPathOperator for Implies {
    fn symbol(&self) -> &'static str {
        "implies"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        let l = as_opt_bool(left, "implies")?;
        let r = as_opt_bool(right, "implies")?;
        let result = match (l, r) {
            (Some(false), _) => Some(true),
            (Some(true), r) => r,
            (None, Some(true)) => Some(true),
            (None, _) => None,
        };
        Ok(bool_collection_opt(result))
    }
}

/// `in` (spec.md §4.1): `item in collection`. `contains` is its mirror:
/// `collection contains item`.
pub struct In;
impl FhirPathOperator for In {
    fn symbol(&self) -> &'static str {
        "in"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        if left.is_empty() {
            return Ok(Collection::empty());
        }
        let item = left
            .as_singleton()
            .ok_or_else(|| FhirPathError::singleton_required("in"))?;
        Ok(boolean_collection(
            right.iter().any(|candidate| values_equal(&candidate.value, &item.value)),
        ))
    }
}

pub struct ContainsOp;
impl FhirPathOperator for ContainsOp {
    fn symbol(&self) -> &'static str {
        "contains"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        if right.is_empty() {
            return Ok(Collection::empty());
        }
        let item = right
            .as_singleton()
            .ok_or_else(|| FhirPathError::singleton_required("contains"))?;
        Ok(boolean_collection(
            left.iter().any(|candidate| values_equal(&candidate.value, &item.value)),
        ))
    }
}

/// `|` (spec.md §4.1, §4.4.1 "result type is the join of operand types"):
/// set union with insertion-order-preserving de-duplication (spec.md §5,
/// §8 "union commutativity (set semantics)").
pub struct UnionOp;
impl FhirPathOperator for UnionOp {
    fn symbol(&self) -> &'static str {
        "|"
    }
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError> {
        Ok(union_collections(left, right))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_model::BoxedValue;

    fn int(n: i64) -> Collection {
        Collection::singleton(BoxedValue::integer(n))
    }

    #[test]
    fn addition_promotes_to_decimal_when_either_operand_is() {
        let result = Add.evaluate(&int(2), &Collection::singleton(BoxedValue::decimal(Decimal::new(15, 1)))).unwrap();
        assert_eq!(
            result.as_singleton().unwrap().value.as_decimal(),
            Some(Decimal::new(35, 1))
        );
    }

    #[test]
    fn arithmetic_propagates_empty() {
        let result = Add.evaluate(&int(2), &Collection::empty()).unwrap();
        assert!(result.is_empty());
        let result = Add.evaluate(&Collection::empty(), &int(2)).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn three_valued_and_false_short_circuits_even_with_empty_other_operand() {
        let result = And
            .evaluate(&boolean_collection(false), &Collection::empty())
            .unwrap();
        assert_eq!(result.as_singleton().unwrap().value.as_bool(), Some(false));
    }

    #[test]
    fn three_valued_or_with_empty_and_false_is_empty() {
        let result = Or.evaluate(&Collection::empty(), &boolean_collection(false)).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn implies_false_antecedent_is_always_true() {
        let result = Implies.evaluate(&boolean_collection(false), &Collection::empty()).unwrap();
        assert_eq!(result.as_singleton().unwrap().value.as_bool(), Some(true));
    }

    #[test]
    fn equivalent_never_propagates_empty() {
        let result = Equiv.evaluate(&Collection::empty(), &Collection::empty()).unwrap();
        assert_eq!(result.as_singleton().unwrap().value.as_bool(), Some(true));
    }

    #[test]
    fn union_deduplicates_preserving_insertion_order() {
        let a = Collection::from_vec(vec![BoxedValue::integer(1), BoxedValue::integer(2)]);
        let b = Collection::from_vec(vec![BoxedValue::integer(2), BoxedValue::integer(3)]);
        let result = UnionOp.evaluate(&a, &b).unwrap();
        let values: Vec<i64> = result.iter().filter_map(|v| v.value.as_integer()).collect();
        assert_eq!(values, vec![1, 2, 3]);
    }
}
