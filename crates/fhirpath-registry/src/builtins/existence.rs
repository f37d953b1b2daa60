//! Existence functions (spec.md §4.1/§4.4.2 catalogue): `empty`, `exists`,
//! `count`, `all`, `allTrue`, `anyTrue`, `distinct`, `isDistinct`.

use octofhir_fhirpath_ast::NodeId;
use octofhir_fhirpath_core::FhirPathError;
use octofhir_fhirpath_model::Collection;

use crate::builtins::support::{boolean_collection, integer_collection, singleton_boolean, values_equivalent};
use crate::operation::{check_arity, FhirPathOperation, LambdaEvaluator};

macro_rules! simple_op {
    ($struct_name:ident, $name:literal, $arity:expr, $body:expr) => {
        pub struct $struct_name;
        impl FhirPathOperation for $struct_name {
            fn name(&self) -> &'static str {
                $name
            }
            fn arg_count_range(&self) -> (usize, Option<usize>) {
                $arity
            }
            fn evaluate(
                &self,
                target: &Collection,
                args: &[NodeId],
                evaluator: &mut dyn LambdaEvaluator,
            ) -> Result<Collection, FhirPathError> {
                check_arity($name, args.len(), $arity)?;
                #[allow(clippy::redundant_closure_call)]
                ($body)(target, args, evaluator)
            }
        }
    };
}

simple_op!(Empty, "empty", (0, Some(0)), |target: &Collection, _: &[NodeId], _: &mut dyn LambdaEvaluator| {
    Ok(boolean_collection(target.is_empty()))
});

simple_op!(Count, "count", (0, Some(0)), |target: &Collection, _: &[NodeId], _: &mut dyn LambdaEvaluator| {
    Ok(integer_collection(target.len() as i64))
});

pub struct Exists;
impl FhirPathOperation for Exists {
    fn name(&self) -> &'static str {
        "exists"
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
        if args.is_empty() {
            return Ok(boolean_collection(!target.is_empty()));
        }
        let mut any = false;
        for (index, item) in target.iter().enumerate() {
            let this = Collection::singleton(item.clone());
            let predicate = evaluator.evaluate_with_this(args[0], &this, index, target)?;
            if singleton_boolean(&predicate).unwrap_or(false) {
                any = true;
                break;
            }
        }
        Ok(boolean_collection(any))
    }
}

pub struct All;
impl FhirPathOperation for All {
    fn name(&self) -> &'static str {
        "all"
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
        for (index, item) in target.iter().enumerate() {
            let this = Collection::singleton(item.clone());
            let predicate = evaluator.evaluate_with_this(args[0], &this, index, target)?;
            if !singleton_boolean(&predicate)? {
                return Ok(boolean_collection(false));
            }
        }
        Ok(boolean_collection(true))
    }
}

simple_op!(AllTrue, "allTrue", (0, Some(0)), |target: &Collection, _: &[NodeId], _: &mut dyn LambdaEvaluator| {
    let mut all = true;
    for item in target.iter() {
        if !item.value.as_bool().unwrap_or(false) {
            all = false;
            break;
        }
    }
    Ok(boolean_collection(all))
});

simple_op!(AnyTrue, "anyTrue", (0, Some(0)), |target: &Collection, _: &[NodeId], _: &mut dyn LambdaEvaluator| {
    let any = target.iter().any(|item| item.value.as_bool().unwrap_or(false));
    Ok(boolean_collection(any))
});

simple_op!(Distinct, "distinct", (0, Some(0)), |target: &Collection, _: &[NodeId], _: &mut dyn LambdaEvaluator| {
    let mut out: Vec<octofhir_fhirpath_model::BoxedValue> = Vec::new();
    for item in target.iter() {
        if !out.iter().any(|seen: &octofhir_fhirpath_model::BoxedValue| values_equivalent(&seen.value, &item.value)) {
            out.push(item.clone());
        }
    }
    Ok(Collection::from_vec(out))
});

simple_op!(IsDistinct, "isDistinct", (0, Some(0)), |target: &Collection, _: &[NodeId], _: &mut dyn LambdaEvaluator| {
    let mut seen: Vec<&octofhir_fhirpath_model::BoxedValue> = Vec::new();
    for item in target.iter() {
        if seen.iter().any(|s| values_equivalent(&s.value, &item.value)) {
            return Ok(boolean_collection(false));
        }
        seen.push(item);
    }
    Ok(boolean_collection(true))
});

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
    fn empty_on_empty_collection_is_true() {
        let result = Empty.evaluate(&Collection::empty(), &[], &mut NoLambda).unwrap();
        assert_eq!(result.as_singleton().unwrap().value.as_bool(), Some(true));
    }

    #[test]
    fn distinct_drops_equivalent_strings_regardless_of_whitespace_run_length() {
        let target = Collection::from_vec(vec![
            BoxedValue::string("a  b"),
            BoxedValue::string("a b"),
            BoxedValue::string("c"),
        ]);
        let result = Distinct.evaluate(&target, &[], &mut NoLambda).unwrap();
        assert_eq!(result.len(), 2);
    }
}
