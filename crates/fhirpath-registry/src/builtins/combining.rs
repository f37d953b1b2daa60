//! Combining functions (spec.md §4.1 catalogue): `combine`, `intersect`,
//! `exclude`. `union` is the `|` operator (see `operators.rs`) but shares
//! the same dedup-preserving-insertion-order semantics (spec.md §5).

use octofhir_fhirpath_ast::NodeId;
use octofhir_fhirpath_core::FhirPathError;
use octofhir_fhirpath_model::{BoxedValue, Collection};

use crate::builtins::support::values_equivalent;
use crate::operation::{check_arity, FhirPathOperation, LambdaEvaluator};

/// `union(a, b)` with de-duplication, preserving first-seen order (spec.md
/// §5 "set outputs preserve insertion order").
pub fn union_collections(a: &Collection, b: &Collection) -> Collection {
    let mut out: Vec<BoxedValue> = Vec::new();
    for item in a.iter().chain(b.iter()) {
        if !out.iter().any(|seen| values_equivalent(&seen.value, &item.value)) {
            out.push(item.clone());
        }
    }
    Collection::from_vec(out)
}

/// `combine`: concatenates without de-duplication (spec.md §4.1).
pub struct Combine;
impl FhirPathOperation for Combine {
    fn name(&self) -> &'static str {
        "combine"
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
        let other = evaluator.evaluate(args[0])?;
        let mut out: Vec<BoxedValue> = target.iter().cloned().collect();
        out.extend(other.into_vec());
        Ok(Collection::from_vec(out))
    }
}

pub struct Intersect;
impl FhirPathOperation for Intersect {
    fn name(&self) -> &'static str {
        "intersect"
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
        let other = evaluator.evaluate(args[0])?;
        let mut out: Vec<BoxedValue> = Vec::new();
        for item in target.iter() {
            let in_other = other.iter().any(|o| values_equivalent(&o.value, &item.value));
            let already_out = out.iter().any(|o| values_equivalent(&o.value, &item.value));
            if in_other && !already_out {
                out.push(item.clone());
            }
        }
        Ok(Collection::from_vec(out))
    }
}

pub struct Exclude;
impl FhirPathOperation for Exclude {
    fn name(&self) -> &'static str {
        "exclude"
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
        let other = evaluator.evaluate(args[0])?;
        let out: Vec<BoxedValue> = target
            .iter()
            .filter(|item| !other.iter().any(|o| values_equivalent(&o.value, &item.value)))
            .cloned()
            .collect();
        Ok(Collection::from_vec(out))
    }
}
