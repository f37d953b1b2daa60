//! Subsetting functions (spec.md §4.1 catalogue): `first`, `last`, `tail`,
//! `skip`, `take`, `single`. Indexing (`collection[i]`) is an AST node kind,
//! not a function, and is handled directly by the interpreter.

use octofhir_fhirpath_ast::NodeId;
use octofhir_fhirpath_core::FhirPathError;
use octofhir_fhirpath_model::Collection;

use crate::builtins::support::singleton_integer;
use crate::operation::{check_arity, FhirPathOperation, LambdaEvaluator};

macro_rules! fixed_op {
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
                #[allow(clippy::redundant_closure_call)]
                ($body)(target)
            }
        }
    };
}

fixed_op!(First, "first", |target: &Collection| {
    Ok(target
        .iter()
        .next()
        .map(|v| Collection::singleton(v.clone()))
        .unwrap_or_else(Collection::empty))
});

fixed_op!(Last, "last", |target: &Collection| {
    Ok(target
        .iter()
        .last()
        .map(|v| Collection::singleton(v.clone()))
        .unwrap_or_else(Collection::empty))
});

fixed_op!(Tail, "tail", |target: &Collection| {
    Ok(Collection::from_vec(
        target.iter().skip(1).cloned().collect(),
    ))
});

pub struct Skip;
impl FhirPathOperation for Skip {
    fn name(&self) -> &'static str {
        "skip"
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
        let count = singleton_integer(&evaluator.evaluate(args[0])?, "skip")?;
        let count = count.max(0) as usize;
        Ok(Collection::from_vec(target.iter().skip(count).cloned().collect()))
    }
}

pub struct Take;
impl FhirPathOperation for Take {
    fn name(&self) -> &'static str {
        "take"
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
        let count = singleton_integer(&evaluator.evaluate(args[0])?, "take")?;
        let count = count.max(0) as usize;
        Ok(Collection::from_vec(target.iter().take(count).cloned().collect()))
    }
}

pub struct Single;
impl FhirPathOperation for Single {
    fn name(&self) -> &'static str {
        "single"
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
        match target.as_singleton() {
            Some(item) => Ok(Collection::singleton(item.clone())),
            None if target.is_empty() => Ok(Collection::empty()),
            None => Err(FhirPathError::singleton_required("single")),
        }
    }
}
