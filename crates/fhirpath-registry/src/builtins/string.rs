//! String functions (spec.md §4.1 catalogue): `substring`, `startsWith`,
//! `endsWith`, `contains` (string form), `matches`, `replace`,
//! `replaceMatches`, `split`, `join`, `upper`, `lower`, `trim`, `length`,
//! `indexOf`, `toChars`. All require a singleton `String` receiver
//! (spec.md §4.4.1 "singleton enforcement").

use octofhir_fhirpath_ast::NodeId;
use octofhir_fhirpath_core::FhirPathError;
use octofhir_fhirpath_model::{BoxedValue, Collection};
use regex::Regex;

use crate::builtins::support::{integer_collection, singleton_integer, singleton_string, string_collection};
use crate::operation::{check_arity, FhirPathOperation, LambdaEvaluator};

fn receiver(target: &Collection, op: &str) -> Result<&str, FhirPathError> {
    singleton_string(target, op)
}

pub struct Substring;
impl FhirPathOperation for Substring {
    fn name(&self) -> &'static str {
        "substring"
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
        if target.is_empty() {
            return Ok(Collection::empty());
        }
        let s = receiver(target, "substring")?;
        let chars: Vec<char> = s.chars().collect();
        let start = singleton_integer(&evaluator.evaluate(args[0])?, "substring")?;
        if start < 0 {
            return Ok(Collection::empty());
        }
        let start = start as usize;
        // A start index at or past the end yields an empty string, not an
        // empty collection (spec.md §8: `'hello'.substring(10)` → `[""]`).
        if start >= chars.len() {
            return Ok(string_collection(""));
        }
        let end = match args.get(1) {
            Some(&len_node) => {
                let len = singleton_integer(&evaluator.evaluate(len_node)?, "substring")?;
                (start + len.max(0) as usize).min(chars.len())
            }
            None => chars.len(),
        };
        let result: String = chars[start..end].iter().collect();
        Ok(string_collection(result))
    }
}

macro_rules! string_predicate {
    ($struct_name:ident, $name:literal, $body:expr) => {
        pub struct $struct_name;
        impl FhirPathOperation for $struct_name {
            fn name(&self) -> &'static str {
                $name
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
                check_arity($name, args.len(), self.arg_count_range())?;
                if target.is_empty() {
                    return Ok(Collection::empty());
                }
                let s = receiver(target, $name)?;
                let other_result = evaluator.evaluate(args[0])?;
                let other = singleton_string(&other_result, $name)?;
                #[allow(clippy::redundant_closure_call)]
                Ok(($body)(s, other))
            }
        }
    };
}

string_predicate!(StartsWith, "startsWith", |s: &str, other: &str| {
    crate::builtins::support::boolean_collection(s.starts_with(other))
});
string_predicate!(EndsWith, "endsWith", |s: &str, other: &str| {
    crate::builtins::support::boolean_collection(s.ends_with(other))
});
string_predicate!(ContainsString, "contains", |s: &str, other: &str| {
    crate::builtins::support::boolean_collection(s.contains(other))
});

pub struct Matches;
impl FhirPathOperation for Matches {
    fn name(&self) -> &'static str {
        "matches"
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
        if target.is_empty() {
            return Ok(Collection::empty());
        }
        let s = receiver(target, "matches")?;
        let pattern_result = evaluator.evaluate(args[0])?;
        let pattern = singleton_string(&pattern_result, "matches")?;
        let re = Regex::new(pattern)
            .map_err(|e| FhirPathError::argument_type_mismatch("matches", e.to_string()))?;
        Ok(crate::builtins::support::boolean_collection(re.is_match(s)))
    }
}

pub struct Replace;
impl FhirPathOperation for Replace {
    fn name(&self) -> &'static str {
        "replace"
    }
    fn arg_count_range(&self) -> (usize, Option<usize>) {
        (2, Some(2))
    }
    fn evaluate(
        &self,
        target: &Collection,
        args: &[NodeId],
        evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError> {
        check_arity(self.name(), args.len(), self.arg_count_range())?;
        if target.is_empty() {
            return Ok(Collection::empty());
        }
        let s = receiver(target, "replace")?;
        let pattern_result = evaluator.evaluate(args[0])?;
        let pattern = singleton_string(&pattern_result, "replace")?;
        let replacement_result = evaluator.evaluate(args[1])?;
        let replacement = singleton_string(&replacement_result, "replace")?;
        Ok(string_collection(s.replace(pattern, replacement)))
    }
}

pub struct ReplaceMatches;
impl FhirPathOperation for ReplaceMatches {
    fn name(&self) -> &'static str {
        "replaceMatches"
    }
    fn arg_count_range(&self) -> (usize, Option<usize>) {
        (2, Some(2))
    }
    fn evaluate(
        &self,
        target: &Collection,
        args: &[NodeId],
        evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError> {
        check_arity(self.name(), args.len(), self.arg_count_range())?;
        if target.is_empty() {
            return Ok(Collection::empty());
        }
        let s = receiver(target, "replaceMatches")?;
        let pattern_result = evaluator.evaluate(args[0])?;
        let pattern = singleton_string(&pattern_result, "replaceMatches")?;
        let replacement_result = evaluator.evaluate(args[1])?;
        let replacement = singleton_string(&replacement_result, "replaceMatches")?;
        let re = Regex::new(pattern)
            .map_err(|e| FhirPathError::argument_type_mismatch("replaceMatches", e.to_string()))?;
        Ok(string_collection(re.replace_all(s, replacement).to_string()))
    }
}

pub struct Split;
impl FhirPathOperation for Split {
    fn name(&self) -> &'static str {
        "split"
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
        if target.is_empty() {
            return Ok(Collection::empty());
        }
        let s = receiver(target, "split")?;
        let sep_result = evaluator.evaluate(args[0])?;
        let sep = singleton_string(&sep_result, "split")?;
        let parts: Vec<BoxedValue> = if sep.is_empty() {
            vec![BoxedValue::string(s)]
        } else {
            s.split(sep).map(BoxedValue::string).collect()
        };
        Ok(Collection::from_vec(parts))
    }
}

pub struct Join;
impl FhirPathOperation for Join {
    fn name(&self) -> &'static str {
        "join"
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
        let separator = match args.first() {
            Some(&node) => {
                let result = evaluator.evaluate(node)?;
                singleton_string(&result, "join")?.to_string()
            }
            None => String::new(),
        };
        let parts: Result<Vec<&str>, FhirPathError> = target
            .iter()
            .map(|item| {
                item.value
                    .as_str()
                    .ok_or_else(|| FhirPathError::invalid_operand_type("join", "non-string", "String"))
            })
            .collect();
        Ok(string_collection(parts?.join(&separator)))
    }
}

macro_rules! string_transform {
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
                if target.is_empty() {
                    return Ok(Collection::empty());
                }
                let s = receiver(target, $name)?;
                #[allow(clippy::redundant_closure_call)]
                Ok(($body)(s))
            }
        }
    };
}

string_transform!(Upper, "upper", |s: &str| string_collection(s.to_uppercase()));
string_transform!(Lower, "lower", |s: &str| string_collection(s.to_lowercase()));
string_transform!(Trim, "trim", |s: &str| string_collection(s.trim()));
string_transform!(Length, "length", |s: &str| integer_collection(s.chars().count() as i64));
string_transform!(ToChars, "toChars", |s: &str| {
    Collection::from_vec(s.chars().map(|c| BoxedValue::string(c.to_string())).collect())
});

pub struct IndexOf;
impl FhirPathOperation for IndexOf {
    fn name(&self) -> &'static str {
        "indexOf"
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
        if target.is_empty() {
            return Ok(Collection::empty());
        }
        let s = receiver(target, "indexOf")?;
        let needle_result = evaluator.evaluate(args[0])?;
        let needle = singleton_string(&needle_result, "indexOf")?;
        let index = match s.find(needle) {
            // FHIRPath indexes are codepoint offsets, not byte offsets.
            Some(byte_index) => s[..byte_index].chars().count() as i64,
            None => -1,
        };
        Ok(integer_collection(index))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_ast::NodeId;

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
    fn length_counts_codepoints_not_bytes() {
        let target = string_collection("héllo");
        let result = Length.evaluate(&target, &[], &mut NoLambda).unwrap();
        assert_eq!(result.as_singleton().unwrap().value.as_integer(), Some(5));
    }
}
