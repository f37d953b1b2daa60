//! Top-down type-inference walk over a parsed AST (spec.md §4.4), grounded
//! on the teacher's `EvaluationContext`/`with_focus` derivation pattern
//! (`fhirpath-registry/src/operation.rs`) adapted to an analysis-time
//! `TypeInfo` environment instead of runtime values.
//!
//! The walk never fails: every node gets a best-effort `TypeInfo` even when
//! a lookup comes up empty, and problems are reported as `Diagnostic`s
//! rather than thrown (spec.md §4.4, §7 "analyze errors are never thrown").

use std::sync::Arc;

use futures::future::BoxFuture;
use rustc_hash::FxHashMap;

use octofhir_fhirpath_ast::{Ast, NodeId, NodeKind};
use octofhir_fhirpath_core::Span;
use octofhir_fhirpath_diagnostics::{Diagnostic, DiagnosticCode};
use octofhir_fhirpath_model::{primitive_type_name_to_type_name, ModelProvider, TypeInfo, TypeName};
use octofhir_fhirpath_registry::{CardinalityRequirement, FunctionCategory, FunctionSignature, Registry};

use crate::context::AnalyzeContext;

/// Options accepted by [`analyze`] (spec.md §6.1 `analyze` options).
pub struct AnalyzeOptions {
    pub variables: FxHashMap<String, TypeInfo>,
    pub input_type: TypeInfo,
    pub model_provider: Option<Arc<dyn ModelProvider>>,
    pub cursor_mode: bool,
}

impl Default for AnalyzeOptions {
    fn default() -> Self {
        Self {
            variables: FxHashMap::default(),
            input_type: TypeInfo::any_collection(),
            model_provider: None,
            cursor_mode: false,
        }
    }
}

/// What the analyzer recorded when it hit a `Cursor*` node (spec.md §4.4.3).
#[derive(Debug, Clone)]
pub struct CursorAnalysis {
    pub cursor_node: NodeId,
    pub type_before_cursor: TypeInfo,
    pub expected_type: TypeInfo,
}

/// `{ast, diagnostics, stoppedAtCursor?, cursorContext?}` (spec.md §4.4,
/// §6.1). The typed `ast` is mutated in place rather than returned
/// separately.
pub struct AnalyzeOutcome {
    pub diagnostics: Vec<Diagnostic>,
    pub stopped_at_cursor: bool,
    pub cursor_context: Option<CursorAnalysis>,
}

/// Walks `ast`, attaching `type_info` to every node and collecting
/// diagnostics (spec.md §4.4). Async because `ModelProvider` lookups may
/// require I/O (spec.md §5 "cooperatively asynchronous at each
/// ModelProvider lookup").
pub async fn analyze(ast: &mut Ast, registry: &Registry, options: &AnalyzeOptions) -> AnalyzeOutcome {
    let mut analyzer = Analyzer {
        registry,
        model_provider: options.model_provider.clone(),
        diagnostics: Vec::new(),
        stopped_at_cursor: false,
        cursor_context: None,
        cursor_mode: options.cursor_mode,
    };
    if let Some(root) = ast.root {
        let ctx = Arc::new(AnalyzeContext::new(options.input_type.clone(), options.variables.clone()));
        analyzer.visit_boxed(ast, root, ctx).await;
    }
    AnalyzeOutcome {
        diagnostics: analyzer.diagnostics,
        stopped_at_cursor: analyzer.stopped_at_cursor,
        cursor_context: analyzer.cursor_context,
    }
}

struct Analyzer<'r> {
    registry: &'r Registry,
    model_provider: Option<Arc<dyn ModelProvider>>,
    diagnostics: Vec<Diagnostic>,
    stopped_at_cursor: bool,
    cursor_context: Option<CursorAnalysis>,
    cursor_mode: bool,
}

impl<'r> Analyzer<'r> {
    /// Boxes the recursive call so `visit`'s future has a finite size
    /// (spec.md §9 arena-AST note applies equally to the analyzer's own
    /// recursion).
    fn visit_boxed<'a>(&'a mut self, ast: &'a mut Ast, id: NodeId, ctx: Arc<AnalyzeContext>) -> BoxFuture<'a, TypeInfo> {
        Box::pin(self.visit(ast, id, ctx))
    }

    async fn visit(&mut self, ast: &mut Ast, id: NodeId, ctx: Arc<AnalyzeContext>) -> TypeInfo {
        if self.stopped_at_cursor {
            return TypeInfo::any_collection();
        }
        let span = ast.get(id).range;
        let kind = ast.get(id).kind.clone();
        let ty = match kind {
            NodeKind::Cursor { .. } => {
                self.enter_cursor(id, ctx.this_type(), TypeInfo::any_collection());
                TypeInfo::any_collection()
            }
            NodeKind::Error { .. } => TypeInfo::any_collection(),
            NodeKind::Literal { value } => crate::literal_type(&value),
            NodeKind::Identifier { name } => {
                let this_ty = ctx.this_type().unwrap_or_else(TypeInfo::any_singleton);
                self.resolve_navigation(&this_ty, &name, span).await
            }
            NodeKind::Variable { name, .. } => self.resolve_variable(&ctx, &name, span),
            NodeKind::Unary { operand, .. } => self.visit_boxed(ast, operand, ctx.clone()).await,
            NodeKind::Binary { operator, left, right } => {
                self.visit_binary(ast, &operator, left, right, ctx.clone(), span).await
            }
            NodeKind::Index { target, index } => {
                let target_ty = self.visit_boxed(ast, target, ctx.clone()).await;
                self.visit_boxed(ast, index, ctx.clone()).await;
                target_ty.as_singleton()
            }
            NodeKind::Collection { elements } => {
                let mut acc: Option<TypeInfo> = None;
                for el in elements {
                    let el_ty = self.visit_boxed(ast, el, ctx.clone()).await;
                    acc = Some(match acc {
                        None => el_ty,
                        Some(prev) => prev.join(&el_ty),
                    });
                }
                acc.unwrap_or_else(TypeInfo::any_collection)
            }
            NodeKind::Function { name, arguments } => {
                let receiver = ctx.this_type().unwrap_or_else(TypeInfo::any_singleton);
                self.analyze_function(ast, name, &arguments, receiver, ctx.clone(), span).await
            }
        };
        ast.get_mut(id).type_info = Some(ty.clone());
        ty
    }

    fn enter_cursor(&mut self, cursor_node: NodeId, type_before_cursor: Option<TypeInfo>, expected_type: TypeInfo) {
        self.stopped_at_cursor = true;
        self.cursor_context = Some(CursorAnalysis {
            cursor_node,
            type_before_cursor: type_before_cursor.unwrap_or_else(TypeInfo::any_singleton),
            expected_type,
        });
    }

    fn resolve_variable(&mut self, ctx: &Arc<AnalyzeContext>, name: &str, span: Span) -> TypeInfo {
        match name {
            "this" => ctx.this_type().unwrap_or_else(TypeInfo::any_singleton),
            "index" => ctx.index_type().unwrap_or_else(|| TypeInfo::singleton(TypeName::Integer)),
            "total" => ctx.total_type().unwrap_or_else(TypeInfo::any_collection),
            "context" | "resource" | "rootResource" => ctx.this_type().unwrap_or_else(TypeInfo::any_singleton),
            _ => {
                if let Some(ty) = ctx.get_variable(name) {
                    return ty;
                }
                let code = if name.chars().next().is_some_and(|c| c.is_ascii_uppercase()) {
                    DiagnosticCode::UnknownVariable
                } else {
                    DiagnosticCode::UnknownUserVariable
                };
                if !self.cursor_mode {
                    self.diagnostics
                        .push(Diagnostic::error(span, code, format!("unknown variable '{name}'")));
                }
                TypeInfo::any_collection()
            }
        }
    }

    async fn visit_binary(
        &mut self,
        ast: &mut Ast,
        operator: &str,
        left: NodeId,
        right: NodeId,
        ctx: Arc<AnalyzeContext>,
        span: Span,
    ) -> TypeInfo {
        match operator {
            "." => {
                let left_ty = self.visit_boxed(ast, left, ctx.clone()).await;
                let right_kind = ast.get(right).kind.clone();
                let right_ty = match right_kind {
                    NodeKind::Identifier { name } => self.resolve_navigation(&left_ty, &name, ast.get(right).range).await,
                    NodeKind::Function { name, arguments } => {
                        self.analyze_function(ast, name, &arguments, left_ty.clone(), ctx.clone(), ast.get(right).range)
                            .await
                    }
                    NodeKind::Cursor { .. } => {
                        self.enter_cursor(right, Some(left_ty.clone()), TypeInfo::any_collection());
                        TypeInfo::any_collection()
                    }
                    _ => self.visit_boxed(ast, right, ctx.clone()).await,
                };
                ast.get_mut(right).type_info = Some(right_ty.clone());
                right_ty
            }
            "is" | "as" => {
                let left_ty = self.visit_boxed(ast, left, ctx.clone()).await;
                let type_name = match &ast.get(right).kind {
                    NodeKind::Identifier { name } => name.clone(),
                    _ => String::new(),
                };
                let resolved = self.resolve_type_specifier(&left_ty, &type_name, ast.get(right).range).await;
                ast.get_mut(right).type_info = Some(resolved.clone());
                if operator == "is" {
                    TypeInfo::singleton(TypeName::Boolean)
                } else {
                    resolved.as_singleton()
                }
            }
            _ => {
                let left_ty = self.visit_boxed(ast, left, ctx.clone()).await;
                let right_ty = self.visit_boxed(ast, right, ctx.clone()).await;
                self.infer_binary(operator, &left_ty, &right_ty, span)
            }
        }
    }

    fn infer_binary(&mut self, operator: &str, left: &TypeInfo, right: &TypeInfo, span: Span) -> TypeInfo {
        let numeric_result = |left: &TypeInfo, right: &TypeInfo| -> TypeInfo {
            if left.type_name == TypeName::Decimal || right.type_name == TypeName::Decimal {
                TypeInfo::singleton(TypeName::Decimal)
            } else {
                TypeInfo::singleton(TypeName::Integer)
            }
        };
        let temporal = matches!(left.type_name, TypeName::Date | TypeName::DateTime | TypeName::Time);
        match operator {
            "+" if left.type_name == TypeName::String && right.type_name == TypeName::String => {
                TypeInfo::singleton(TypeName::String)
            }
            "+" | "-" if temporal && right.type_name == TypeName::Quantity => TypeInfo::singleton(left.type_name),
            "+" | "-" | "*" | "/" if left.type_name.is_numeric() && right.type_name.is_numeric() => {
                numeric_result(left, right)
            }
            "+" | "-" | "*" | "/" if left.type_name == TypeName::Quantity && right.type_name == TypeName::Quantity => {
                TypeInfo::singleton(TypeName::Quantity)
            }
            "div" | "mod" if left.type_name.is_numeric() && right.type_name.is_numeric() => numeric_result(left, right),
            "&" => TypeInfo::singleton(TypeName::String),
            "|" => left.join(right),
            "<" | "<=" | ">" | ">=" | "=" | "!=" | "~" | "!~" | "in" | "contains" | "and" | "or" | "xor" | "implies" => {
                TypeInfo::singleton(TypeName::Boolean)
            }
            _ if left.is_any() || right.is_any() => TypeInfo::any_singleton(),
            _ => {
                self.diagnostics.push(Diagnostic::error(
                    span,
                    DiagnosticCode::InvalidOperandType,
                    format!("operator '{operator}' is not defined for {} and {}", left.type_name, right.type_name),
                ));
                TypeInfo::any_singleton()
            }
        }
    }

    /// Navigation `a.b` (spec.md §4.4.1). Only emits `UnknownProperty` when
    /// a schema is actually known for `left_ty` — without a configured
    /// `ModelProvider` the analyzer has nothing to check against, so it
    /// degrades silently to `Any`.
    async fn resolve_navigation(&mut self, left_ty: &TypeInfo, name: &str, span: Span) -> TypeInfo {
        let Some(provider) = &self.model_provider else {
            return TypeInfo::any_collection();
        };
        if left_ty.model_context.is_some() {
            if let Some(resolved) = provider.get_element_type(left_ty, name).await {
                return resolved;
            }
            if !self.cursor_mode {
                self.diagnostics
                    .push(Diagnostic::error(span, DiagnosticCode::UnknownProperty, format!("unknown property '{name}'")));
            }
            return TypeInfo::any_collection();
        }
        // No schema context yet — `name` may itself be the root type.
        if let Some(root) = provider.get_type(name).await {
            return root;
        }
        TypeInfo::any_collection()
    }

    async fn resolve_type_specifier(&mut self, receiver: &TypeInfo, type_name: &str, span: Span) -> TypeInfo {
        let simple = type_name.rsplit('.').next().unwrap_or(type_name);
        if let Some(tn) = primitive_type_name_to_type_name(simple) {
            return TypeInfo::singleton(tn);
        }
        match &self.model_provider {
            Some(provider) => {
                if let Some(resolved) = provider.of_type(receiver, simple).await {
                    return resolved;
                }
                TypeInfo::any_singleton()
            }
            None => {
                if !self.cursor_mode {
                    self.diagnostics.push(Diagnostic::error(
                        span,
                        DiagnosticCode::ModelProviderRequired,
                        format!("resolving type '{type_name}' requires a model provider"),
                    ));
                }
                TypeInfo::any_singleton()
            }
        }
    }

    async fn analyze_function(
        &mut self,
        ast: &mut Ast,
        name_node: NodeId,
        arguments: &[NodeId],
        receiver: TypeInfo,
        ctx: Arc<AnalyzeContext>,
        span: Span,
    ) -> TypeInfo {
        let fname = match &ast.get(name_node).kind {
            NodeKind::Identifier { name } => name.clone(),
            _ => String::new(),
        };
        ast.get_mut(name_node).type_info = Some(TypeInfo::any_singleton());

        let Some(signature) = self.registry.function_signature(&fname).cloned() else {
            if !self.cursor_mode {
                self.diagnostics
                    .push(Diagnostic::error(span, DiagnosticCode::UnknownFunction, format!("unknown function '{fname}'")));
            }
            for &arg in arguments {
                self.visit_boxed(ast, arg, ctx.clone()).await;
            }
            return TypeInfo::any_collection();
        };

        self.check_arity(&fname, &signature, arguments.len(), span);
        if signature.cardinality == CardinalityRequirement::RequiresSingleton && !receiver.singleton {
            if !self.cursor_mode {
                self.diagnostics.push(Diagnostic::error(
                    span,
                    DiagnosticCode::SingletonRequired,
                    format!("'{fname}' requires a singleton receiver"),
                ));
            }
        }
        if signature.category == FunctionCategory::StringManip
            && !matches!(receiver.type_name, TypeName::String | TypeName::Any)
            && !self.cursor_mode
        {
            self.diagnostics.push(Diagnostic::error(
                span,
                DiagnosticCode::InputTypeMismatch,
                format!("'{fname}' expects a String receiver, got {}", receiver.type_name),
            ));
        }

        if fname.eq_ignore_ascii_case("ofType") {
            return self.analyze_of_type(ast, arguments, &receiver, span).await;
        }
        if fname.eq_ignore_ascii_case("aggregate") {
            return self.analyze_aggregate(ast, arguments, &receiver, ctx).await;
        }
        if fname.eq_ignore_ascii_case("iif") {
            return self.analyze_iif(ast, arguments, ctx).await;
        }

        let arg_ctx = if signature.takes_lambda_arguments {
            ctx.with_iterator(receiver.as_singleton(), TypeInfo::singleton(TypeName::Integer))
        } else {
            ctx.clone()
        };
        let mut arg_types = Vec::with_capacity(arguments.len());
        for &arg in arguments {
            arg_types.push(self.visit_boxed(ast, arg, arg_ctx.clone()).await);
        }
        self.function_result_type(&fname, &signature, &receiver, &arg_types)
    }

    fn check_arity(&mut self, fname: &str, signature: &FunctionSignature, actual: usize, span: Span) {
        let (min, max) = signature.arity.as_range();
        if actual < min {
            if !self.cursor_mode {
                self.diagnostics.push(Diagnostic::error(
                    span,
                    DiagnosticCode::TooFewArgs,
                    format!("'{fname}' expects at least {min} argument(s), got {actual}"),
                ));
            }
        } else if let Some(max) = max {
            if actual > max && !self.cursor_mode {
                self.diagnostics.push(Diagnostic::error(
                    span,
                    DiagnosticCode::TooManyArgs,
                    format!("'{fname}' expects at most {max} argument(s), got {actual}"),
                ));
            }
        }
    }

    /// `ofType(Type)` — the argument is a bare type specifier, never a
    /// general expression, so it's resolved directly rather than visited
    /// like a normal argument (spec.md §4.4.1).
    async fn analyze_of_type(&mut self, ast: &mut Ast, arguments: &[NodeId], receiver: &TypeInfo, span: Span) -> TypeInfo {
        let Some(&arg) = arguments.first() else {
            return TypeInfo::any_collection();
        };
        let type_name = extract_type_name(ast, arg).unwrap_or_default();
        let resolved = self.resolve_type_specifier(receiver, &type_name, span).await;
        ast.get_mut(arg).type_info = Some(resolved.clone());
        resolved.as_collection()
    }

    /// `aggregate(expr, seed?)` — `$total`'s type is the seed's type when
    /// given, else inferred from the aggregator expression itself (spec.md
    /// §4.4.2).
    async fn analyze_aggregate(&mut self, ast: &mut Ast, arguments: &[NodeId], receiver: &TypeInfo, ctx: Arc<AnalyzeContext>) -> TypeInfo {
        let Some(&expr) = arguments.first() else {
            return TypeInfo::any_collection();
        };
        let seed_ty = if let Some(&seed) = arguments.get(1) {
            Some(self.visit_boxed(ast, seed, ctx.clone()).await)
        } else {
            None
        };
        let placeholder_total = seed_ty.clone().unwrap_or_else(TypeInfo::any_singleton);
        let lambda_ctx = ctx
            .with_iterator(receiver.as_singleton(), TypeInfo::singleton(TypeName::Integer))
            .with_total(placeholder_total);
        let expr_ty = self.visit_boxed(ast, expr, lambda_ctx).await;
        seed_ty.unwrap_or(expr_ty)
    }

    /// `iif(cond, then, else?)` — all three arguments are evaluated eagerly
    /// against the surrounding context, never as lambdas.
    async fn analyze_iif(&mut self, ast: &mut Ast, arguments: &[NodeId], ctx: Arc<AnalyzeContext>) -> TypeInfo {
        for &arg in arguments.iter().take(1) {
            self.visit_boxed(ast, arg, ctx.clone()).await;
        }
        let then_ty = match arguments.get(1) {
            Some(&arg) => self.visit_boxed(ast, arg, ctx.clone()).await,
            None => TypeInfo::any_collection(),
        };
        match arguments.get(2) {
            Some(&arg) => {
                let else_ty = self.visit_boxed(ast, arg, ctx.clone()).await;
                then_ty.join(&else_ty)
            }
            None => then_ty,
        }
    }

    /// The declared result type for a built-in, often parameterized by the
    /// receiver (spec.md §4.4.1).
    fn function_result_type(&self, fname: &str, signature: &FunctionSignature, receiver: &TypeInfo, arg_types: &[TypeInfo]) -> TypeInfo {
        match fname {
            "count" | "length" | "indexOf" => TypeInfo::singleton(TypeName::Integer),
            "empty" | "exists" | "all" | "allTrue" | "anyTrue" | "isDistinct" | "startsWith" | "endsWith" | "contains"
            | "matches" | "convertsToInteger" | "convertsToDecimal" | "convertsToBoolean" | "convertsToString"
            | "convertsToQuantity" => TypeInfo::singleton(TypeName::Boolean),
            "first" | "last" | "single" => receiver.as_singleton(),
            "tail" | "skip" | "take" | "distinct" | "repeat" | "where" | "select" => receiver.as_collection(),
            "combine" | "intersect" | "exclude" | "union" => match arg_types.first() {
                Some(arg_ty) => receiver.join(arg_ty),
                None => receiver.as_collection(),
            },
            "sort" => receiver.as_collection(),
            "sum" => {
                if receiver.type_name == TypeName::Decimal {
                    TypeInfo::singleton(TypeName::Decimal)
                } else {
                    TypeInfo::singleton(TypeName::Integer)
                }
            }
            "toString" | "upper" | "lower" | "trim" | "substring" | "replace" | "replaceMatches" | "join" => {
                TypeInfo::singleton(TypeName::String)
            }
            "toChars" | "split" => TypeInfo::collection(TypeName::String),
            "toInteger" => TypeInfo::singleton(TypeName::Integer),
            "toDecimal" => TypeInfo::singleton(TypeName::Decimal),
            "toBoolean" => TypeInfo::singleton(TypeName::Boolean),
            "toQuantity" => TypeInfo::singleton(TypeName::Quantity),
            "abs" | "ceiling" | "floor" | "round" | "truncate" | "power" => {
                if receiver.type_name == TypeName::Decimal {
                    TypeInfo::singleton(TypeName::Decimal)
                } else {
                    TypeInfo::singleton(TypeName::Integer)
                }
            }
            "sqrt" | "ln" | "exp" | "log" => TypeInfo::singleton(TypeName::Decimal),
            _ => match signature.cardinality {
                CardinalityRequirement::AlwaysCollection => receiver.as_collection(),
                _ => TypeInfo::any_singleton(),
            },
        }
    }
}

/// Walks an argument that should be a bare type specifier: a plain
/// `Identifier`, or a `.`-chain of identifiers (`FHIR.Patient`) parsed as
/// ordinary navigation since `ofType`'s argument goes through the general
/// expression grammar (spec.md §4.3).
fn extract_type_name(ast: &Ast, node: NodeId) -> Option<String> {
    match &ast.get(node).kind {
        NodeKind::Identifier { name } => Some(name.clone()),
        NodeKind::Binary { operator, left, right } if operator == "." => {
            let left = extract_type_name(ast, *left)?;
            let right = extract_type_name(ast, *right)?;
            Some(format!("{left}.{right}"))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_parser::parse;

    fn analyze_str(source: &str, input_type: TypeInfo) -> (Ast, AnalyzeOutcome) {
        let registry = Registry::new_with_builtins();
        let mut ast = parse(source, &registry).unwrap();
        let options = AnalyzeOptions {
            input_type,
            ..Default::default()
        };
        let outcome = futures::executor::block_on(analyze(&mut ast, &registry, &options));
        (ast, outcome)
    }

    #[test]
    fn arithmetic_literals_infer_integer() {
        let (ast, outcome) = analyze_str("2 + 3", TypeInfo::any_collection());
        assert!(outcome.diagnostics.is_empty());
        let root = ast.root.unwrap();
        assert_eq!(ast.get(root).type_info.as_ref().unwrap().type_name, TypeName::Integer);
    }

    #[test]
    fn string_concatenation_infers_string() {
        let (ast, outcome) = analyze_str("'a' + 'b'", TypeInfo::any_collection());
        assert!(outcome.diagnostics.is_empty());
        let root = ast.root.unwrap();
        assert_eq!(ast.get(root).type_info.as_ref().unwrap().type_name, TypeName::String);
    }

    #[test]
    fn unknown_function_is_reported() {
        let (_, outcome) = analyze_str("frobnicate()", TypeInfo::any_collection());
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::UnknownFunction));
    }

    #[test]
    fn too_few_arguments_is_reported() {
        let (_, outcome) = analyze_str("(1|2).skip()", TypeInfo::any_collection());
        assert!(outcome.diagnostics.iter().any(|d| d.code == DiagnosticCode::TooFewArgs));
    }

    #[test]
    fn navigation_without_model_provider_degrades_to_any_without_diagnostics() {
        let (ast, outcome) = analyze_str("Patient.name", TypeInfo::any_collection());
        assert!(outcome.diagnostics.is_empty());
        let root = ast.root.unwrap();
        assert!(ast.get(root).type_info.as_ref().unwrap().is_any());
    }

    #[test]
    fn ofType_without_provider_reports_model_provider_required_for_non_primitive() {
        let (_, outcome) = analyze_str("(1|'a').ofType(HumanName)", TypeInfo::any_collection());
        assert!(outcome
            .diagnostics
            .iter()
            .any(|d| d.code == DiagnosticCode::ModelProviderRequired));
    }

    #[test]
    fn ofType_primitive_resolves_without_a_provider() {
        let (ast, outcome) = analyze_str("(1|'a').ofType(String)", TypeInfo::any_collection());
        assert!(outcome.diagnostics.is_empty());
        let root = ast.root.unwrap();
        assert_eq!(ast.get(root).type_info.as_ref().unwrap().type_name, TypeName::String);
    }

    #[test]
    fn where_lambda_binds_this_to_singleton_element_type() {
        let (ast, outcome) = analyze_str("(1|2|3).where($this > 1)", TypeInfo::any_collection());
        assert!(outcome.diagnostics.is_empty());
        let root = ast.root.unwrap();
        // Result type of `.where` preserves the receiver's collection-ness.
        assert!(!ast.get(root).type_info.as_ref().unwrap().singleton);
    }

    #[test]
    fn substring_on_a_collection_reports_singleton_required() {
        let (_, outcome) = analyze_str("('a'|'b').substring(0)", TypeInfo::any_collection());
        assert!(outcome.diagnostics.iter().any(|d| d.code == DiagnosticCode::SingletonRequired));
    }

    #[test]
    fn cursor_node_halts_analysis_with_no_diagnostics() {
        let registry = Registry::new_with_builtins();
        let outcome_ast = octofhir_fhirpath_parser::parse_lsp("Patient.", &registry, Some(8));
        let mut ast = outcome_ast.ast;
        let options = AnalyzeOptions {
            cursor_mode: true,
            ..Default::default()
        };
        let outcome = futures::executor::block_on(analyze(&mut ast, &registry, &options));
        assert!(outcome.stopped_at_cursor);
        assert!(outcome.cursor_context.is_some());
        assert!(outcome.diagnostics.is_empty());
    }
}
