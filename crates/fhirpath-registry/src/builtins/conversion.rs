//! Type/conversion functions (spec.md §4.1 catalogue): `toString`,
//! `toInteger`, `toDecimal`, `toBoolean`, `toQuantity`, and the
//! `convertsToX` family. `is`/`as`/`ofType` are handled by the interpreter
//! directly (spec.md §4.4.1: they consult `typeInfo`, not a registered
//! function), except `ofType` which lives in `filtering.rs` as a
//! collection-filtering operation.

use std::str::FromStr;

use octofhir_fhirpath_ast::NodeId;
use octofhir_fhirpath_core::FhirPathError;
use octofhir_fhirpath_model::{Collection, FhirPathValue, Quantity};
use rust_decimal::Decimal;

use crate::builtins::support::{boolean_collection, decimal_collection, integer_collection, string_collection};
use crate::operation::{check_arity, FhirPathOperation, LambdaEvaluator};

fn receiver_item(target: &Collection) -> Option<&FhirPathValue> {
    target.as_singleton().map(|item| &item.value)
}

pub struct ToStringFn;
impl FhirPathOperation for ToStringFn {
    fn name(&self) -> &'static str {
        "toString"
    }
    fn arg_count_range(&self) -> (usize, Option<usize>) {
        (0, Some(0))
    }
    fn evaluate(
        &self,
        target: &Collection,
        args: &[NodeId],
        _evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError> {
        check_arity(self.name(), args.len(), self.arg_count_range())?;
        match receiver_item(target) {
            Some(value) => Ok(string_collection(value.to_display_string())),
            None if target.is_empty() => Ok(Collection::empty()),
            None => Err(FhirPathError::singleton_required("toString")),
        }
    }
}

pub struct ToInteger;
impl FhirPathOperation for ToInteger {
    fn name(&self) -> &'static str {
        "toInteger"
    }
    fn arg_count_range(&self) -> (usize, Option<usize>) {
        (0, Some(0))
    }
    fn evaluate(
        &self,
        target: &Collection,
        args: &[NodeId],
        _evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError> {
        check_arity(self.name(), args.len(), self.arg_count_range())?;
        match receiver_item(target) {
            Some(FhirPathValue::Integer(i)) => Ok(integer_collection(*i)),
            Some(FhirPathValue::String(s)) => match s.parse::<i64>() {
                Ok(i) => Ok(integer_collection(i)),
                Err(_) => Ok(Collection::empty()),
            },
            Some(FhirPathValue::Boolean(b)) => Ok(integer_collection(if *b { 1 } else { 0 })),
            Some(_) => Ok(Collection::empty()),
            None if target.is_empty() => Ok(Collection::empty()),
            None => Err(FhirPathError::singleton_required("toInteger")),
        }
    }
}

pub struct ToDecimal;
impl FhirPathOperation for ToDecimal {
    fn name(&self) -> &'static str {
        "toDecimal"
    }
    fn arg_count_range(&self) -> (usize, Option<usize>) {
        (0, Some(0))
    }
    fn evaluate(
        &self,
        target: &Collection,
        args: &[NodeId],
        _evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError> {
        check_arity(self.name(), args.len(), self.arg_count_range())?;
        match receiver_item(target) {
            Some(FhirPathValue::Integer(i)) => Ok(decimal_collection(Decimal::from(*i))),
            Some(FhirPathValue::Decimal(d)) => Ok(decimal_collection(*d)),
            Some(FhirPathValue::String(s)) => match Decimal::from_str(s) {
                Ok(d) => Ok(decimal_collection(d)),
                Err(_) => Ok(Collection::empty()),
            },
            Some(FhirPathValue::Boolean(b)) => Ok(decimal_collection(if *b { Decimal::ONE } else { Decimal::ZERO })),
            Some(_) => Ok(Collection::empty()),
            None if target.is_empty() => Ok(Collection::empty()),
            None => Err(FhirPathError::singleton_required("toDecimal")),
        }
    }
}

pub struct ToBoolean;
impl FhirPathOperation for ToBoolean {
    fn name(&self) -> &'static str {
        "toBoolean"
    }
    fn arg_count_range(&self) -> (usize, Option<usize>) {
        (0, Some(0))
    }
    fn evaluate(
        &self,
        target: &Collection,
        args: &[NodeId],
        _evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError> {
        check_arity(self.name(), args.len(), self.arg_count_range())?;
        match receiver_item(target) {
            Some(FhirPathValue::Boolean(b)) => Ok(boolean_collection(*b)),
            Some(FhirPathValue::Integer(1)) => Ok(boolean_collection(true)),
            Some(FhirPathValue::Integer(0)) => Ok(boolean_collection(false)),
            Some(FhirPathValue::String(s)) => match s.to_ascii_lowercase().as_str() {
                "true" | "t" | "yes" | "y" | "1" | "1.0" => Ok(boolean_collection(true)),
                "false" | "f" | "no" | "n" | "0" | "0.0" => Ok(boolean_collection(false)),
                _ => Ok(Collection::empty()),
            },
            Some(_) => Ok(Collection::empty()),
            None if target.is_empty() => Ok(Collection::empty()),
            None => Err(FhirPathError::singleton_required("toBoolean")),
        }
    }
}

pub struct ToQuantity;
impl FhirPathOperation for ToQuantity {
    fn name(&self) -> &'static str {
        "toQuantity"
    }
    fn arg_count_range(&self) -> (usize, Option<usize>) {
        (0, Some(0))
    }
    fn evaluate(
        &self,
        target: &Collection,
        args: &[NodeId],
        _evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError> {
        check_arity(self.name(), args.len(), self.arg_count_range())?;
        match receiver_item(target) {
            Some(FhirPathValue::Quantity(q)) => {
                Ok(Collection::singleton(octofhir_fhirpath_model::BoxedValue::new(
                    FhirPathValue::Quantity(q.clone()),
                )))
            }
            Some(FhirPathValue::Integer(i)) => Ok(quantity_collection(Decimal::from(*i), None)),
            Some(FhirPathValue::Decimal(d)) => Ok(quantity_collection(*d, None)),
            Some(FhirPathValue::String(s)) => match parse_quantity_string(s) {
                Some((value, unit)) => Ok(quantity_collection(value, unit)),
                None => Ok(Collection::empty()),
            },
            Some(_) => Ok(Collection::empty()),
            None if target.is_empty() => Ok(Collection::empty()),
            None => Err(FhirPathError::singleton_required("toQuantity")),
        }
    }
}

fn quantity_collection(value: Decimal, unit: Option<String>) -> Collection {
    Collection::singleton(octofhir_fhirpath_model::BoxedValue::new(FhirPathValue::Quantity(
        Quantity::new(value, unit),
    )))
}

/// Parses `"<value> '<unit>'"` or a bare numeric string (spec.md §3.5).
fn parse_quantity_string(s: &str) -> Option<(Decimal, Option<String>)> {
    let s = s.trim();
    if let Ok(value) = Decimal::from_str(s) {
        return Some((value, None));
    }
    let (value_part, rest) = s.split_once(char::is_whitespace)?;
    let value = Decimal::from_str(value_part).ok()?;
    let unit = rest.trim().trim_matches('\'').to_string();
    Some((value, Some(unit)))
}

macro_rules! converts_to {
    ($struct_name:ident, $name:literal, $check:expr) => {
        pub struct $struct_name;
        impl FhirPathOperation for $struct_name {
            fn name(&self) -> &'static str {
                $name
            }
            fn arg_count_range(&self) -> (usize, Option<usize>) {
                (0, Some(0))
            }
            fn evaluate(
                &self,
                target: &Collection,
                args: &[NodeId],
                _evaluator: &mut dyn LambdaEvaluator,
            ) -> Result<Collection, FhirPathError> {
                check_arity($name, args.len(), (0, Some(0)))?;
                match receiver_item(target) {
                    Some(value) => {
                        #[allow(clippy::redundant_closure_call)]
                        Ok(boolean_collection(($check)(value)))
                    }
                    None if target.is_empty() => Ok(Collection::empty()),
                    None => Err(FhirPathError::singleton_required($name)),
                }
            }
        }
    };
}

converts_to!(ConvertsToInteger, "convertsToInteger", |v: &FhirPathValue| matches!(
    v,
    FhirPathValue::Integer(_)
) || matches!(v, FhirPathValue::String(s) if s.parse::<i64>().is_ok()));
converts_to!(ConvertsToDecimal, "convertsToDecimal", |v: &FhirPathValue| matches!(
    v,
    FhirPathValue::Integer(_) | FhirPathValue::Decimal(_)
) || matches!(v, FhirPathValue::String(s) if Decimal::from_str(s).is_ok()));
converts_to!(ConvertsToBoolean, "convertsToBoolean", |v: &FhirPathValue| matches!(
    v,
    FhirPathValue::Boolean(_)
));
converts_to!(ConvertsToString, "convertsToString", |_v: &FhirPathValue| true);
converts_to!(ConvertsToQuantity, "convertsToQuantity", |v: &FhirPathValue| matches!(
    v,
    FhirPathValue::Quantity(_) | FhirPathValue::Integer(_) | FhirPathValue::Decimal(_)
) || matches!(v, FhirPathValue::String(s) if parse_quantity_string(s).is_some()));

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_model::BoxedValue;

    struct NoLambda;
    impl LambdaEvaluator for NoLambda {
        fn evaluate(&mut self, _node: NodeId) -> Result<Collection, FhirPathError> {
            unreachable!()
        }
        fn evaluate_with_this(
            &mut self,
            _node: NodeId,
            _this: &Collection,
            _index: usize,
            _total: &Collection,
        ) -> Result<Collection, FhirPathError> {
            unreachable!()
        }
        fn evaluate_aggregate(
            &mut self,
            _node: NodeId,
            _this: &Collection,
            _index: usize,
            _receiver: &Collection,
            _total: &Collection,
        ) -> Result<Collection, FhirPathError> {
            unreachable!()
        }
    }

    #[test]
    fn to_integer_parses_numeric_strings() {
        let target = Collection::singleton(BoxedValue::string("42"));
        let result = ToInteger.evaluate(&target, &[], &mut NoLambda).unwrap();
        assert_eq!(result.as_singleton().unwrap().value.as_integer(), Some(42));
    }

    #[test]
    fn to_integer_on_non_numeric_string_is_empty() {
        let target = Collection::singleton(BoxedValue::string("not a number"));
        let result = ToInteger.evaluate(&target, &[], &mut NoLambda).unwrap();
        assert!(result.is_empty());
    }
}
