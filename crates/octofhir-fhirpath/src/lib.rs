//! Public surface of the engine (spec.md §6.1): `parse`/`analyze`/`evaluate`
//! plus the `Registry` re-export components register new operators and
//! functions against. This crate wires the other crates together; it holds
//! no FHIRPath semantics of its own.

use std::sync::Arc;

use rustc_hash::FxHashMap;

pub use octofhir_fhirpath_analyzer::{analyze as analyze_ast, AnalyzeOptions, AnalyzeOutcome, CursorAnalysis};
pub use octofhir_fhirpath_ast::{Ast, CursorContext, Node, NodeId, NodeKind};
pub use octofhir_fhirpath_core::{FhirPathError, Result as CoreResult};
pub use octofhir_fhirpath_diagnostics::{Diagnostic, DiagnosticCode, Severity};
pub use octofhir_fhirpath_evaluator::{evaluate as evaluate_ast, RuntimeContext};
pub use octofhir_fhirpath_model::{
    BoxedValue, Collection, FhirPathValue, ModelProvider, Quantity, TypeInfo, TypeName,
};
pub use octofhir_fhirpath_parser::{parse as parse_ast, parse_lsp, ParseOutcome, ParserMode};
pub use octofhir_fhirpath_registry::Registry;

/// Options accepted by [`parse`] (spec.md §6.1 `parse` options). `mode`
/// selects between the fast standard parse and the LSP parse (ranges,
/// trivia, indexes, recovery); `cursor_position` switches on cursor-aware
/// parsing regardless of mode, since completion can be requested for a
/// plain (non-editor) caller too.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub mode: ParserMode,
    pub error_recovery: bool,
    pub cursor_position: Option<u32>,
    pub preserve_trivia: bool,
}

/// `parse(text, options?) → {ast, errors, indexes?, cursorContext?}` (spec.md
/// §6.1). Standard mode with no cursor position and no error recovery is
/// the fast path: a bare `Ast` with no indexes, aborting on the first
/// syntax error. Any other combination of options routes through the LSP
/// parser, which always recovers and always builds indexes.
pub fn parse(text: &str, options: &ParseOptions) -> ParseResult {
    let registry = default_registry();
    parse_with_registry(text, options, &registry)
}

/// Same as [`parse`] but against a caller-supplied registry, so a host that
/// has registered additional operators/functions (spec.md §4.1, §5
/// "additions must occur before parsing") gets them lexed and parsed too.
pub fn parse_with_registry(text: &str, options: &ParseOptions, registry: &Registry) -> ParseResult {
    let fast_path = options.mode == ParserMode::Standard
        && options.cursor_position.is_none()
        && !options.preserve_trivia;

    if fast_path && !options.error_recovery {
        return match parse_ast(text, registry) {
            Ok(ast) => ParseResult { ast, errors: Vec::new() },
            Err(err) => ParseResult { ast: Ast::new(), errors: vec![err] },
        };
    }

    let outcome = parse_lsp(text, registry, options.cursor_position);
    ParseResult {
        ast: outcome.ast,
        errors: outcome.errors,
    }
}

/// Result of [`parse`]. `ast.indexes`/`ast.root`'s `Cursor*` nodes carry the
/// LSP-relevant detail (spec.md §3.2, §6.1) when the caller asked for them;
/// this wrapper only adds the recovered `errors` list alongside.
#[derive(Debug)]
pub struct ParseResult {
    pub ast: Ast,
    pub errors: Vec<FhirPathError>,
}

/// `analyze(text|ast, options?) → {ast, diagnostics, stoppedAtCursor?,
/// cursorContext?}` (spec.md §6.1). Parses `text` first (LSP mode, so a
/// cursor position — if any — is honored), then runs the static analyzer
/// over the result.
pub async fn analyze(text: &str, options: AnalyzeOptions) -> AnalyzeResult {
    let registry = default_registry();
    analyze_with_registry(text, options, &registry).await
}

pub async fn analyze_with_registry(text: &str, options: AnalyzeOptions, registry: &Registry) -> AnalyzeResult {
    // `cursor_mode` only changes how the analyzer *reacts* to a `Cursor*`
    // node (spec.md §4.4.3); it does not by itself place one. A caller that
    // wants cursor-aware analysis should `parse` with a `cursor_position`
    // first and call `analyze_ast_in_place` on the result — this
    // text-in/text-out convenience always parses in full LSP mode so the
    // indexes a cursor lookup would need are available either way.
    let parse_options = ParseOptions {
        mode: ParserMode::Lsp,
        error_recovery: true,
        cursor_position: None,
        preserve_trivia: false,
    };
    let mut parsed = parse_with_registry(text, &parse_options, registry);
    let outcome = analyze_ast(&mut parsed.ast, registry, &options).await;
    AnalyzeResult {
        ast: parsed.ast,
        parse_errors: parsed.errors,
        diagnostics: outcome.diagnostics,
        stopped_at_cursor: outcome.stopped_at_cursor,
        cursor_context: outcome.cursor_context,
    }
}

/// Analyzes an already-parsed AST in place, for callers that parsed once and
/// want to analyze (or re-analyze) without re-lexing (spec.md §8
/// "re-analyzing an already-analyzed AST produces an equivalent typeInfo
/// map").
pub async fn analyze_ast_in_place(ast: &mut Ast, options: &AnalyzeOptions, registry: &Registry) -> AnalyzeOutcome {
    analyze_ast(ast, registry, options).await
}

#[derive(Debug)]
pub struct AnalyzeResult {
    pub ast: Ast,
    pub parse_errors: Vec<FhirPathError>,
    pub diagnostics: Vec<Diagnostic>,
    pub stopped_at_cursor: bool,
    pub cursor_context: Option<CursorAnalysis>,
}

/// Options accepted by [`evaluate`] (spec.md §6.1 `evaluate` options).
#[derive(Debug, Clone, Default)]
pub struct EvaluateOptions {
    /// The resource/tree the expression navigates. Absent means the empty
    /// collection (e.g. for expressions that only touch literals/variables).
    pub input: Option<serde_json::Value>,
    pub variables: FxHashMap<String, serde_json::Value>,
}

/// `evaluate(text|ast, options?) → unboxed value array` (spec.md §6.1).
/// Parses, then tree-walks; the public surface never hands back boxed
/// items (spec.md §3.4 "the public API unboxes on return").
pub fn evaluate(text: &str, options: &EvaluateOptions) -> Result<Vec<serde_json::Value>, FhirPathError> {
    let registry = default_registry();
    evaluate_with_registry(text, options, &registry)
}

pub fn evaluate_with_registry(
    text: &str,
    options: &EvaluateOptions,
    registry: &Registry,
) -> Result<Vec<serde_json::Value>, FhirPathError> {
    let ast = parse_ast(text, registry)?;
    let root = ast.root.ok_or_else(|| FhirPathError::generic("empty expression"))?;
    evaluate_ast_node(&ast, root, options, registry)
}

/// Evaluates an already-parsed AST node (spec.md §6.1 `evaluate(ast, ...)`
/// form), so a host that ran [`parse`] and/or [`analyze`] once can evaluate
/// without re-parsing.
pub fn evaluate_ast_node(
    ast: &Ast,
    root: NodeId,
    options: &EvaluateOptions,
    registry: &Registry,
) -> Result<Vec<serde_json::Value>, FhirPathError> {
    let input = match &options.input {
        Some(value) => Collection::singleton(BoxedValue::new(FhirPathValue::Object(value.clone()))),
        None => Collection::empty(),
    };
    let variables = options
        .variables
        .iter()
        .map(|(name, value)| {
            (
                name.clone(),
                Collection::singleton(BoxedValue::new(FhirPathValue::Object(value.clone()))),
            )
        })
        .collect::<FxHashMap<_, _>>();

    let result = evaluate_ast(ast, root, registry, input, variables)?;
    Ok(result.into_vec().into_iter().map(unbox).collect())
}

/// Unboxes one runtime item to plain JSON (spec.md §3.4). `primitiveElement`
/// siblings are dropped here — they exist to let navigation reach
/// `extension`/`id`, not to reappear in the final unboxed result.
fn unbox(item: BoxedValue) -> serde_json::Value {
    match item.value {
        FhirPathValue::Boolean(b) => serde_json::Value::Bool(b),
        FhirPathValue::Integer(i) => serde_json::Value::Number(i.into()),
        FhirPathValue::Decimal(d) => serde_json::Number::from_f64(d.to_string().parse().unwrap_or(0.0))
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        FhirPathValue::String(s) => serde_json::Value::String(s.to_string()),
        FhirPathValue::Quantity(q) => {
            serde_json::json!({ "value": q.value.to_string(), "unit": q.unit.clone().unwrap_or_default() })
        }
        other @ (FhirPathValue::Date(_) | FhirPathValue::DateTime(_) | FhirPathValue::Time(_)) => {
            serde_json::Value::String(other.to_display_string())
        }
        FhirPathValue::Object(v) => v,
    }
}

/// A fresh registry with every built-in operator and function registered
/// (spec.md §4.1). Hosts that need custom operators should build their own
/// `Registry::new_with_builtins()`, call `register_operator`/
/// `register_function`, and use the `_with_registry` entry points above —
/// the plain `parse`/`analyze`/`evaluate` helpers exist for the common case
/// of "just the built-ins".
pub fn default_registry() -> Registry {
    Registry::new_with_builtins()
}

/// Convenience: build an [`AnalyzeOptions`] wired to a [`ModelProvider`]
/// (spec.md §6.3), defaulting `input_type` to an untyped `Any` collection.
pub fn analyze_options_with_provider(provider: Arc<dyn ModelProvider>) -> AnalyzeOptions {
    AnalyzeOptions {
        model_provider: Some(provider),
        ..AnalyzeOptions::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn evaluate_arithmetic() {
        let result = evaluate("2 + 3", &EvaluateOptions::default()).expect("evaluate");
        assert_eq!(result, vec![serde_json::json!(5)]);
    }

    #[test]
    fn evaluate_string_concat() {
        let result = evaluate("'Hello' + ' ' + 'World'", &EvaluateOptions::default()).expect("evaluate");
        assert_eq!(result, vec![serde_json::json!("Hello World")]);
    }

    #[test]
    fn evaluate_navigation() {
        let input = serde_json::json!({"name":[{"given":["Ada","Grace"]},{"given":["Alan"]}]});
        let options = EvaluateOptions {
            input: Some(input),
            variables: FxHashMap::default(),
        };
        let result = evaluate("name.given", &options).expect("evaluate");
        assert_eq!(
            result,
            vec![
                serde_json::json!("Ada"),
                serde_json::json!("Grace"),
                serde_json::json!("Alan"),
            ]
        );
    }

    #[test]
    fn evaluate_where_filter() {
        let result = evaluate("(1 | 2 | 3).where($this > 1)", &EvaluateOptions::default()).expect("evaluate");
        assert_eq!(result, vec![serde_json::json!(2), serde_json::json!(3)]);
    }

    #[test]
    fn evaluate_substring() {
        let a = evaluate("'hello world'.substring(6)", &EvaluateOptions::default()).unwrap();
        assert_eq!(a, vec![serde_json::json!("world")]);
        let b = evaluate("'hello world'.substring(0,5)", &EvaluateOptions::default()).unwrap();
        assert_eq!(b, vec![serde_json::json!("hello")]);
        let c = evaluate("'hello'.substring(10)", &EvaluateOptions::default()).unwrap();
        assert_eq!(c, vec![serde_json::json!("")]);
    }

    #[test]
    fn parse_fast_path_has_no_indexes() {
        let result = parse("1 + 2", &ParseOptions::default());
        assert!(result.errors.is_empty());
        assert!(result.ast.indexes.is_none());
    }

    #[test]
    fn parse_lsp_mode_builds_indexes() {
        let options = ParseOptions {
            mode: ParserMode::Lsp,
            ..ParseOptions::default()
        };
        let result = parse("Patient.name", &options);
        assert!(result.errors.is_empty());
        assert!(result.ast.indexes.is_some());
    }

    #[tokio::test]
    async fn analyze_reports_unknown_property_without_provider() {
        let outcome = analyze("foo.bar", AnalyzeOptions::default()).await;
        assert!(!outcome.diagnostics.is_empty());
    }

    #[test]
    fn empty_propagation() {
        let result = evaluate("(1 + {})", &EvaluateOptions::default()).unwrap();
        assert!(result.is_empty());
    }
}
