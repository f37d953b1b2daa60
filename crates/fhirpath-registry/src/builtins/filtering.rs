//! Filtering/projection functions (spec.md §4.1 catalogue): `where`,
//! `select`, `repeat`, `ofType`. All take a lambda argument re-evaluated
//! once per input element (spec.md §9).

use octofhir_fhirpath_ast::NodeId;
use octofhir_fhirpath_core::FhirPathError;
use octofhir_fhirpath_model::Collection;

use crate::builtins::support::singleton_boolean;
use crate::operation::{check_arity, FhirPathOperation, LambdaEvaluator};

pub struct Where;
impl FhirPathOperation for Where {
    fn name(&self) -> &'static str {
        "where"
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
        let mut out = Vec::new();
        for (index, item) in target.iter().enumerate() {
            let this = Collection::singleton(item.clone());
            let predicate = evaluator.evaluate_with_this(args[0], &this, index, target)?;
            if singleton_boolean(&predicate)? {
                out.push(item.clone());
            }
        }
        Ok(Collection::from_vec(out))
    }
}

pub struct Select;
impl FhirPathOperation for Select {
    fn name(&self) -> &'static str {
        "select"
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
        let mut out = Vec::new();
        for (index, item) in target.iter().enumerate() {
            let this = Collection::singleton(item.clone());
            let projected = evaluator.evaluate_with_this(args[0], &this, index, target)?;
            out.extend(projected.into_vec());
        }
        Ok(Collection::from_vec(out))
    }
}

/// Repeatedly applies the projection until a fixed point (no new items),
/// accumulating every generation's output (spec.md §4.1: `repeat`).
pub struct Repeat;
impl FhirPathOperation for Repeat {
    fn name(&self) -> &'static str {
        "repeat"
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
        let mut accumulated = Vec::new();
        let mut frontier = target.clone();
        loop {
            let mut next = Vec::new();
            for (index, item) in frontier.iter().enumerate() {
                let this = Collection::singleton(item.clone());
                let projected = evaluator.evaluate_with_this(args[0], &this, index, &frontier)?;
                next.extend(projected.into_vec());
            }
            if next.is_empty() {
                break;
            }
            accumulated.extend(next.clone());
            frontier = Collection::from_vec(next);
        }
        Ok(Collection::from_vec(accumulated))
    }
}

/// `ofType(type)`: `args[0]` is an `Identifier`/type-specifier node; the
/// evaluator resolves it against each item's runtime/analyzed type rather
/// than re-evaluating it as an expression (spec.md §4.4.1).
pub struct OfType;
impl FhirPathOperation for OfType {
    fn name(&self) -> &'static str {
        "ofType"
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
        // The type-specifier argument evaluates (in the evaluator's own
        // dispatch for `Identifier` nodes used as a type name) to a single
        // string item naming the target type; the interpreter's `Identifier`
        // handling special-cases this call site (spec.md §4.4.1).
        let type_name_result = evaluator.evaluate(args[0])?;
        let type_name = type_name_result
            .as_singleton()
            .and_then(|v| v.value.as_str())
            .map(|s| s.to_string());
        let Some(type_name) = type_name else {
            return Ok(Collection::empty());
        };
        // Strip a `System.`/`FHIR.` namespace qualifier before comparing,
        // matching the `is`/`as` paths (`interpreter.rs`'s `simple_type_name`) —
        // item type names are always bare (spec.md §3.3 `TypeName` closed set).
        let type_name = type_name.rsplit('.').next().unwrap_or(&type_name).to_string();
        let mut out = Vec::new();
        for item in target.iter() {
            let matches = item
                .type_info
                .as_ref()
                .map(|info| info.type_name.as_str() == type_name || info.name.as_deref() == Some(type_name.as_str()))
                .unwrap_or_else(|| item.value.type_name().as_str() == type_name);
            if matches {
                out.push(item.clone());
            }
        }
        Ok(Collection::from_vec(out))
    }
}
