//! Math functions (spec.md §4.1 catalogue): `abs`, `ceiling`, `floor`,
//! `round`, `sqrt`, `truncate`, `ln`, `log`, `power`, `exp`. All require a
//! singleton numeric receiver and propagate empty (spec.md §4.4.1, §4.5).

use octofhir_fhirpath_ast::NodeId;
use octofhir_fhirpath_core::FhirPathError;
use octofhir_fhirpath_model::{Collection, FhirPathValue};
use rust_decimal::prelude::{ToPrimitive, Zero};
use rust_decimal::Decimal;

use crate::builtins::support::{decimal_collection, singleton_decimal};
use crate::operation::{check_arity, FhirPathOperation, LambdaEvaluator};

fn numeric_receiver(target: &Collection, op: &str) -> Result<Option<Decimal>, FhirPathError> {
    if target.is_empty() {
        return Ok(None);
    }
    singleton_decimal(target, op).map(Some)
}

fn receiver_is_integer(target: &Collection) -> bool {
    matches!(
        target.as_singleton().map(|item| &item.value),
        Some(FhirPathValue::Integer(_))
    )
}

macro_rules! unary_math {
    ($struct_name:ident, $name:literal, $body:expr) => {
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
                match numeric_receiver(target, $name)? {
                    Some(value) => {
                        #[allow(clippy::redundant_closure_call)]
                        ($body)(value)
                    }
                    None => Ok(Collection::empty()),
                }
            }
        }
    };
}

unary_math!(Abs, "abs", |v: Decimal| Ok(decimal_collection(v.abs())));
unary_math!(Ceiling, "ceiling", |v: Decimal| Ok(crate::builtins::support::integer_collection(
    v.ceil().to_i64().unwrap_or(0)
)));
unary_math!(Floor, "floor", |v: Decimal| Ok(crate::builtins::support::integer_collection(
    v.floor().to_i64().unwrap_or(0)
)));
unary_math!(Truncate, "truncate", |v: Decimal| Ok(
    crate::builtins::support::integer_collection(v.trunc().to_i64().unwrap_or(0))
));
unary_math!(Sqrt, "sqrt", |v: Decimal| {
    if v.is_sign_negative() {
        return Ok(Collection::empty());
    }
    let f = v.to_f64().unwrap_or(0.0).sqrt();
    Decimal::try_from(f)
        .map(decimal_collection)
        .or(Ok(Collection::empty()))
});
unary_math!(Ln, "ln", |v: Decimal| {
    if v <= Decimal::ZERO {
        return Ok(Collection::empty());
    }
    let f = v.to_f64().unwrap_or(0.0).ln();
    Decimal::try_from(f)
        .map(decimal_collection)
        .or(Ok(Collection::empty()))
});
unary_math!(Exp, "exp", |v: Decimal| {
    let f = v.to_f64().unwrap_or(0.0).exp();
    Decimal::try_from(f)
        .map(decimal_collection)
        .or(Ok(Collection::empty()))
});

pub struct Round;
impl FhirPathOperation for Round {
    fn name(&self) -> &'static str {
        "round"
    }
    fn arg_count_range(&self) -> (usize, Option<usize>) {
        (0, Some(1))
    }
    fn evaluate(
        &self,
        target: &Collection,
        args: &[NodeId],
        evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError> {
        check_arity(self.name(), args.len(), self.arg_count_range())?;
        let Some(value) = numeric_receiver(target, "round")? else {
            return Ok(Collection::empty());
        };
        let precision = match args.first() {
            Some(&node) => {
                crate::builtins::support::singleton_integer(&evaluator.evaluate(node)?, "round")?.max(0) as u32
            }
            None => 0,
        };
        Ok(decimal_collection(value.round_dp(precision)))
    }
}

pub struct Log;
impl FhirPathOperation for Log {
    fn name(&self) -> &'static str {
        "log"
    }
    fn arg_count_range(&self) -> (usize, Option<usize>) {
        (1, Some(1))
    }
    fn evaluate(
        &self,
        target: &Collection,
        args: &[NodeId],
        evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError> {
        check_arity(self.name(), args.len(), self.arg_count_range())?;
        let Some(value) = numeric_receiver(target, "log")? else {
            return Ok(Collection::empty());
        };
        let base = singleton_decimal(&evaluator.evaluate(args[0])?, "log")?;
        if value <= Decimal::zero() || base <= Decimal::zero() {
            return Ok(Collection::empty());
        }
        let f = value.to_f64().unwrap_or(0.0).log(base.to_f64().unwrap_or(1.0));
        Ok(Decimal::try_from(f).map(decimal_collection).unwrap_or_else(|_| Collection::empty()))
    }
}

pub struct Power;
impl FhirPathOperation for Power {
    fn name(&self) -> &'static str {
        "power"
    }
    fn arg_count_range(&self) -> (usize, Option<usize>) {
        (1, Some(1))
    }
    fn evaluate(
        &self,
        target: &Collection,
        args: &[NodeId],
        evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError> {
        check_arity(self.name(), args.len(), self.arg_count_range())?;
        let Some(value) = numeric_receiver(target, "power")? else {
            return Ok(Collection::empty());
        };
        let exponent = singleton_decimal(&evaluator.evaluate(args[0])?, "power")?;
        let base_is_integer = receiver_is_integer(target);
        let f = value.to_f64().unwrap_or(0.0).powf(exponent.to_f64().unwrap_or(0.0));
        if f.is_nan() {
            return Ok(Collection::empty());
        }
        match Decimal::try_from(f) {
            Ok(result) if base_is_integer && exponent.fract().is_zero() && exponent >= Decimal::zero() => Ok(
                crate::builtins::support::integer_collection(result.to_i64().unwrap_or(0)),
            ),
            Ok(result) => Ok(decimal_collection(result)),
            Err(_) => Ok(Collection::empty()),
        }
    }
}
