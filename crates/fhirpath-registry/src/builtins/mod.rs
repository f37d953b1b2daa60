//! Built-in operator and function catalogue (spec.md §4.1). Each submodule
//! groups one category from the spec's catalogue; `register_all` wires every
//! one of them into a fresh `Registry` with its documented name, arity,
//! precedence and associativity.

pub mod aggregate;
pub mod combining;
pub mod conversion;
pub mod existence;
pub mod filtering;
pub mod math;
pub mod operators;
pub mod string;
pub mod subsetting;
pub mod support;
pub mod temporal_arith;

use std::sync::Arc;

use crate::function::{ArgumentArity, CardinalityRequirement, FunctionCategory, FunctionSignature};
use crate::registry::{Associativity, Registry};

fn fixed(name: &'static str, category: FunctionCategory, arity: usize, cardinality: CardinalityRequirement) -> FunctionSignature {
    FunctionSignature::new(name, category, ArgumentArity::Exact(arity), cardinality)
}

fn range(
    name: &'static str,
    category: FunctionCategory,
    min: usize,
    max: Option<usize>,
    cardinality: CardinalityRequirement,
) -> FunctionSignature {
    FunctionSignature::new(name, category, ArgumentArity::Range(min, max), cardinality)
}

/// Registers every built-in operator and function (spec.md §4.1 catalogue).
/// Called once by `Registry::new_with_builtins`; registration failures here
/// would indicate a bug in this table, not user input, so they're asserted
/// rather than propagated.
pub fn register_all(registry: &mut Registry) {
    register_operators(registry);
    register_functions(registry);
}

fn register_operators(registry: &mut Registry) {
    use operators::*;
    use Associativity::{Left, Right};

    let mut reg = |op: Arc<dyn crate::operation::FhirPathOperator>, precedence: u8, assoc: Associativity| {
        registry
            .register_operator(op, precedence, assoc)
            .expect("built-in operator registration must not conflict");
    };

    // Navigation (`.`) and postfix indexing are AST node kinds, handled by
    // the interpreter directly; `is`/`as` likewise need the unevaluated type
    // name and aren't `FhirPathOperator` impls. Their precedence is still
    // recorded here (spec.md §4.1 precedence table) so the parser's Pratt
    // loop can consult it uniformly for every infix token.
    registry
        .register_precedence_only(".", 100, Left)
        .expect("built-in operator registration must not conflict");
    registry
        .register_precedence_only("[", 95, Left)
        .expect("built-in operator registration must not conflict");
    registry
        .register_precedence_only("is", 90, Left)
        .expect("built-in operator registration must not conflict");
    registry
        .register_precedence_only("as", 90, Left)
        .expect("built-in operator registration must not conflict");

    reg(Arc::new(Mul), 80, Left);
    reg(Arc::new(Div), 80, Left);
    reg(Arc::new(IntDiv), 80, Left);
    reg(Arc::new(Mod), 80, Left);

    reg(Arc::new(Add), 70, Left);
    reg(Arc::new(Sub), 70, Left);
    reg(Arc::new(Concat), 70, Left);

    reg(Arc::new(UnionOp), 60, Left);

    reg(Arc::new(Lt), 50, Left);
    reg(Arc::new(Le), 50, Left);
    reg(Arc::new(Gt), 50, Left);
    reg(Arc::new(Ge), 50, Left);

    reg(Arc::new(Eq), 40, Left);
    reg(Arc::new(Neq), 40, Left);
    reg(Arc::new(Equiv), 40, Left);
    reg(Arc::new(NotEquiv), 40, Left);

    reg(Arc::new(In), 35, Left);
    reg(Arc::new(ContainsOp), 35, Left);

    reg(Arc::new(And), 30, Left);
    reg(Arc::new(Xor), 25, Left);
    reg(Arc::new(Or), 20, Left);
    reg(Arc::new(Implies), 10, Right);
}

fn register_functions(registry: &mut Registry) {
    use CardinalityRequirement::{AcceptsAny, AlwaysCollection, RequiresSingleton};
    use FunctionCategory::*;

    macro_rules! func {
        ($ty:expr, $sig:expr) => {
            registry
                .register_function(Arc::new($ty), $sig)
                .expect("built-in function registration must not fail");
        };
    }

    // Existence (spec.md §4.1, §4.4.2)
    func!(existence::Empty, fixed("empty", Existence, 0, AcceptsAny));
    func!(existence::Count, fixed("count", Existence, 0, AcceptsAny));
    func!(
        existence::Exists,
        range("exists", Existence, 0, Some(1), AcceptsAny).with_lambda_arguments()
    );
    func!(existence::All, fixed("all", Existence, 1, AcceptsAny).with_lambda_arguments());
    func!(existence::AllTrue, fixed("allTrue", Existence, 0, AcceptsAny));
    func!(existence::AnyTrue, fixed("anyTrue", Existence, 0, AcceptsAny));
    func!(existence::Distinct, fixed("distinct", Existence, 0, AcceptsAny));
    func!(existence::IsDistinct, fixed("isDistinct", Existence, 0, AcceptsAny));

    // Filtering/projection (spec.md §4.1)
    func!(filtering::Where, fixed("where", Filtering, 1, AcceptsAny).with_lambda_arguments());
    func!(filtering::Select, fixed("select", Filtering, 1, AcceptsAny).with_lambda_arguments());
    func!(filtering::Repeat, fixed("repeat", Filtering, 1, AcceptsAny).with_lambda_arguments());
    func!(filtering::OfType, fixed("ofType", Filtering, 1, AcceptsAny));

    // Subsetting (spec.md §4.1)
    func!(subsetting::First, fixed("first", Subsetting, 0, AcceptsAny));
    func!(subsetting::Last, fixed("last", Subsetting, 0, AcceptsAny));
    func!(subsetting::Tail, fixed("tail", Subsetting, 0, AcceptsAny));
    func!(subsetting::Skip, fixed("skip", Subsetting, 1, AcceptsAny));
    func!(subsetting::Take, fixed("take", Subsetting, 1, AcceptsAny));
    func!(subsetting::Single, fixed("single", Subsetting, 0, AcceptsAny));

    // Combining (spec.md §4.1, §5)
    func!(combining::Combine, fixed("combine", Combining, 1, AcceptsAny));
    func!(combining::Intersect, fixed("intersect", Combining, 1, AcceptsAny));
    func!(combining::Exclude, fixed("exclude", Combining, 1, AcceptsAny));

    // Aggregate (spec.md §4.1, §4.4.2)
    func!(
        aggregate::Aggregate,
        range("aggregate", Aggregate, 1, Some(2), AcceptsAny).with_lambda_arguments()
    );
    func!(aggregate::Sum, fixed("sum", Aggregate, 0, AcceptsAny));
    func!(aggregate::Sort, range("sort", Aggregate, 0, Some(1), AcceptsAny).with_lambda_arguments());
    func!(aggregate::Iif, range("iif", Utility, 2, Some(3), AcceptsAny));

    // String manipulation (spec.md §4.1)
    func!(string::Substring, range("substring", StringManip, 1, Some(2), RequiresSingleton));
    func!(string::StartsWith, fixed("startsWith", StringManip, 1, RequiresSingleton));
    func!(string::EndsWith, fixed("endsWith", StringManip, 1, RequiresSingleton));
    func!(string::ContainsString, fixed("contains", StringManip, 1, RequiresSingleton));
    func!(string::Matches, fixed("matches", StringManip, 1, RequiresSingleton));
    func!(string::Replace, fixed("replace", StringManip, 2, RequiresSingleton));
    func!(string::ReplaceMatches, fixed("replaceMatches", StringManip, 2, RequiresSingleton));
    func!(string::Split, fixed("split", StringManip, 1, RequiresSingleton));
    func!(string::Join, range("join", StringManip, 0, Some(1), AcceptsAny));
    func!(string::Upper, fixed("upper", StringManip, 0, RequiresSingleton));
    func!(string::Lower, fixed("lower", StringManip, 0, RequiresSingleton));
    func!(string::Trim, fixed("trim", StringManip, 0, RequiresSingleton));
    func!(string::Length, fixed("length", StringManip, 0, RequiresSingleton));
    func!(string::ToChars, fixed("toChars", StringManip, 0, RequiresSingleton));
    func!(string::IndexOf, fixed("indexOf", StringManip, 1, RequiresSingleton));

    // Conversion (spec.md §4.1)
    func!(conversion::ToStringFn, fixed("toString", Conversion, 0, RequiresSingleton));
    func!(conversion::ToInteger, fixed("toInteger", Conversion, 0, RequiresSingleton));
    func!(conversion::ToDecimal, fixed("toDecimal", Conversion, 0, RequiresSingleton));
    func!(conversion::ToBoolean, fixed("toBoolean", Conversion, 0, RequiresSingleton));
    func!(conversion::ToQuantity, fixed("toQuantity", Conversion, 0, RequiresSingleton));
    func!(conversion::ConvertsToInteger, fixed("convertsToInteger", Conversion, 0, RequiresSingleton));
    func!(conversion::ConvertsToDecimal, fixed("convertsToDecimal", Conversion, 0, RequiresSingleton));
    func!(conversion::ConvertsToBoolean, fixed("convertsToBoolean", Conversion, 0, RequiresSingleton));
    func!(conversion::ConvertsToString, fixed("convertsToString", Conversion, 0, RequiresSingleton));
    func!(conversion::ConvertsToQuantity, fixed("convertsToQuantity", Conversion, 0, RequiresSingleton));

    // Math (spec.md §4.1)
    func!(math::Abs, fixed("abs", Math, 0, RequiresSingleton));
    func!(math::Ceiling, fixed("ceiling", Math, 0, RequiresSingleton));
    func!(math::Floor, fixed("floor", Math, 0, RequiresSingleton));
    func!(math::Truncate, fixed("truncate", Math, 0, RequiresSingleton));
    func!(math::Sqrt, fixed("sqrt", Math, 0, RequiresSingleton));
    func!(math::Ln, fixed("ln", Math, 0, RequiresSingleton));
    func!(math::Exp, fixed("exp", Math, 0, RequiresSingleton));
    func!(math::Round, range("round", Math, 0, Some(1), RequiresSingleton));
    func!(math::Log, fixed("log", Math, 1, RequiresSingleton));
    func!(math::Power, fixed("power", Math, 1, RequiresSingleton));

    let _ = AlwaysCollection;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_precedence_table_matches_the_documented_scale() {
        let registry = Registry::new_with_builtins();
        let cases: &[(&str, i32)] = &[
            (".", 100),
            ("[", 95),
            ("is", 90),
            ("as", 90),
            ("*", 80),
            ("/", 80),
            ("div", 80),
            ("mod", 80),
            ("+", 70),
            ("-", 70),
            ("&", 70),
            ("|", 60),
            ("<", 50),
            ("<=", 50),
            (">", 50),
            (">=", 50),
            ("=", 40),
            ("!=", 40),
            ("~", 40),
            ("!~", 40),
            ("in", 35),
            ("contains", 35),
            ("and", 30),
            ("xor", 25),
            ("or", 20),
            ("implies", 10),
        ];
        for (symbol, expected) in cases {
            assert_eq!(registry.precedence(symbol), *expected, "precedence of {symbol}");
        }
    }

    #[test]
    fn every_documented_function_is_registered() {
        let registry = Registry::new_with_builtins();
        let names = [
            "empty", "count", "exists", "all", "allTrue", "anyTrue", "distinct", "isDistinct",
            "where", "select", "repeat", "ofType", "first", "last", "tail", "skip", "take",
            "single", "combine", "intersect", "exclude", "aggregate", "sum", "sort", "iif",
            "substring", "startsWith", "endsWith", "contains", "matches", "replace",
            "replaceMatches", "split", "join", "upper", "lower", "trim", "length", "toChars",
            "indexOf", "toString", "toInteger", "toDecimal", "toBoolean", "toQuantity",
            "convertsToInteger", "convertsToDecimal", "convertsToBoolean", "convertsToString",
            "convertsToQuantity", "abs", "ceiling", "floor", "truncate", "sqrt", "ln", "exp",
            "round", "log", "power",
        ];
        for name in names {
            assert!(registry.get_function(name).is_some(), "expected `{name}` to be registered");
        }
    }
}
