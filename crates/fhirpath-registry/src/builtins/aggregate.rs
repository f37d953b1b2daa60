//! Aggregate functions (spec.md §4.1 catalogue, §4.4.2, §4.5): `aggregate`,
//! `sum`, `sort`/`sortBy`. `count` lives in `existence.rs` (spec.md §4.1
//! lists it under both existence and aggregate — one implementation,
//! registered once).

use octofhir_fhirpath_ast::NodeId;
use octofhir_fhirpath_core::FhirPathError;
use octofhir_fhirpath_model::{BoxedValue, Collection, FhirPathValue};
use rust_decimal::Decimal;

use crate::builtins::support::{singleton_boolean, singleton_decimal};
use crate::operation::{check_arity, FhirPathOperation, LambdaEvaluator};

/// `aggregate(aggregator [, init])` (spec.md §4.4.2): threads `$total`
/// across elements, seeded from `init` when present or from the first
/// aggregator evaluation otherwise.
pub struct Aggregate;
impl FhirPathOperation for Aggregate {
    fn name(&self) -> &'static str {
        "aggregate"
    }
    fn arg_count_range(&self) -> (usize, Option<usize>) {
        (1, Some(2))
    }
    fn evaluate(
        &self,
        target: &Collection,
        args: &[NodeId],
        evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError> {
        check_arity(self.name(), args.len(), self.arg_count_range())?;
        let mut total = match args.get(1) {
            Some(&seed_node) => evaluator.evaluate(seed_node)?,
            None => Collection::empty(),
        };
        for (index, item) in target.iter().enumerate() {
            let this = Collection::singleton(item.clone());
            total = evaluator.evaluate_aggregate(args[0], &this, index, target, &total)?;
        }
        Ok(total)
    }
}

/// `sum()`: numeric sum, empty input yields empty (spec.md §4.5 empty
/// propagation convention for aggregate-style reductions).
pub struct Sum;
impl FhirPathOperation for Sum {
    fn name(&self) -> &'static str {
        "sum"
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
        if target.is_empty() {
            return Ok(Collection::empty());
        }
        let mut total = Decimal::ZERO;
        let mut any_decimal = false;
        for item in target.iter() {
            match &item.value {
                FhirPathValue::Integer(i) => total += Decimal::from(*i),
                FhirPathValue::Decimal(d) => {
                    total += d;
                    any_decimal = true;
                }
                other => {
                    return Err(FhirPathError::invalid_operand_type(
                        "sum",
                        other.type_name().as_str(),
                        "Integer|Decimal",
                    ))
                }
            }
        }
        Ok(Collection::singleton(if any_decimal {
            BoxedValue::decimal(total)
        } else {
            BoxedValue::integer(total.try_into().unwrap_or(0))
        }))
    }
}

/// `sort()`/`sort(criteria)` (spec.md §4.1 catalogue): stable sort, either
/// by natural order of a homogeneous numeric/string/date receiver, or by a
/// lambda comparison key evaluated per element (`sortBy`-style single
/// criterion; spec.md doesn't define multi-key sort, so only one criterion
/// expression is supported).
pub struct Sort;
impl FhirPathOperation for Sort {
    fn name(&self) -> &'static str {
        "sort"
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
        let mut keyed: Vec<(BoxedValue, Decimal)> = Vec::with_capacity(target.len());
        match args.first() {
            Some(&criterion) => {
                for (index, item) in target.iter().enumerate() {
                    let this = Collection::singleton(item.clone());
                    let key = evaluator.evaluate_with_this(criterion, &this, index, target)?;
                    let key = singleton_decimal(&key, "sort")?;
                    keyed.push((item.clone(), key));
                }
            }
            None => {
                for (index, item) in target.iter().enumerate() {
                    let key = item
                        .value
                        .as_decimal()
                        .ok_or_else(|| FhirPathError::invalid_operand_type("sort", "non-numeric", "Integer|Decimal"))?;
                    let _ = index;
                    keyed.push((item.clone(), key));
                }
            }
        }
        keyed.sort_by(|(_, a), (_, b)| a.cmp(b));
        Ok(Collection::from_vec(keyed.into_iter().map(|(v, _)| v).collect()))
    }
}

/// `iif(criterion, true-result [, otherwise-result])` (spec.md §4.1
/// catalogue, grouped here for lack of a better home): a lazily-evaluated
/// conditional evaluated once against the current context (not per
/// receiver element) — only the taken branch is ever evaluated.
pub struct Iif;
impl FhirPathOperation for Iif {
    fn name(&self) -> &'static str {
        "iif"
    }
    fn arg_count_range(&self) -> (usize, Option<usize>) {
        (2, Some(3))
    }
    fn evaluate(
        &self,
        _target: &Collection,
        args: &[NodeId],
        evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError> {
        check_arity(self.name(), args.len(), self.arg_count_range())?;
        let condition = evaluator.evaluate(args[0])?;
        if condition.is_empty() {
            return Ok(Collection::empty());
        }
        if singleton_boolean(&condition)? {
            evaluator.evaluate(args[1])
        } else if let Some(&otherwise) = args.get(2) {
            evaluator.evaluate(otherwise)
        } else {
            Ok(Collection::empty())
        }
    }
}
