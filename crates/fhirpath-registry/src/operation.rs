//! The registry's operation trait (spec.md §4.1, §9 "dispatch-table (not
//! per-operator subclassing)" and "deferred per-element argument
//! re-evaluation via AST node + callback, not a precomputed list").

use octofhir_fhirpath_ast::NodeId;
use octofhir_fhirpath_core::FhirPathError;
use octofhir_fhirpath_model::Collection;

/// Lets a function body evaluate FHIRPath sub-expressions without the
/// registry crate depending on the evaluator crate. `fhirpath-evaluator`
/// implements this for its own interpreter; builtin functions only ever see
/// this trait object, never the concrete interpreter type.
pub trait LambdaEvaluator {
    /// Evaluate `node` once in the evaluator's current context (eager
    /// arguments, e.g. `substring(1, 2)`).
    fn evaluate(&mut self, node: NodeId) -> Result<Collection, FhirPathError>;

    /// Evaluate `node` with `$this`/`$index`/`$total` bound for one
    /// iteration of a lambda-taking function (`where`, `select`, `repeat`,
    /// `aggregate`, `sort`, ...), per spec.md §4.7.
    fn evaluate_with_this(
        &mut self,
        node: NodeId,
        this: &Collection,
        index: usize,
        total: &Collection,
    ) -> Result<Collection, FhirPathError>;

    /// Evaluate `node` for one `aggregate()` iteration: `$this`/`$index`
    /// bound to the current element, `$total` bound to the running
    /// accumulator (spec.md §4.4.2, §4.5). Returns the new accumulator
    /// value (the aggregator expression's result becomes the next
    /// `$total`).
    fn evaluate_aggregate(
        &mut self,
        node: NodeId,
        this: &Collection,
        index: usize,
        receiver: &Collection,
        total: &Collection,
    ) -> Result<Collection, FhirPathError>;
}

/// A registered function (spec.md §4.1). Implementations receive the raw
/// argument AST nodes, not pre-evaluated values, so lambda-taking functions
/// can re-evaluate an argument once per input element (spec.md §9).
pub trait FhirPathOperation: Send + Sync {
    fn name(&self) -> &'static str;

    /// `(min, max)`; `max = None` means unbounded (e.g. `combine` is
    /// effectively fixed-arity, but `trace` takes an optional name).
    fn arg_count_range(&self) -> (usize, Option<usize>);

    /// Whether repeated calls with the same target/args/provider state
    /// always produce the same result (spec.md §5 determinism note).
    /// `now()`/`today()` are the only built-ins expected to override this.
    fn is_pure(&self) -> bool {
        true
    }

    fn evaluate(
        &self,
        target: &Collection,
        args: &[NodeId],
        evaluator: &mut dyn LambdaEvaluator,
    ) -> Result<Collection, FhirPathError>;
}

/// A registered binary infix operator (spec.md §4.1, §6.2 precedence
/// packing). Operands are always fully evaluated collections — operators
/// never see raw AST nodes, unlike functions.
pub trait FhirPathOperator: Send + Sync {
    fn symbol(&self) -> &'static str;
    fn evaluate(&self, left: &Collection, right: &Collection) -> Result<Collection, FhirPathError>;
}

/// Validates an arity against `arg_count_range`, used by every built-in's
/// `evaluate` before doing real work.
pub fn check_arity(name: &str, args_len: usize, range: (usize, Option<usize>)) -> Result<(), FhirPathError> {
    let (min, max) = range;
    let ok = args_len >= min && max.map(|max| args_len <= max).unwrap_or(true);
    if ok {
        return Ok(());
    }
    let expected = match max {
        Some(max) if max == min => format!("{min}"),
        Some(max) => format!("{min}..{max}"),
        None => format!("at least {min}"),
    };
    Err(FhirPathError::invalid_argument_count(name, expected, args_len))
}
