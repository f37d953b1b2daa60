//! The tree-walking interpreter (spec.md §4.5).
//!
//! `Interpreter` walks an analyzed or bare `Ast` node by node, evaluating
//! every node kind to a `Collection` (spec.md §3.4: "every expression
//! evaluates to a collection, possibly empty"). It implements
//! [`LambdaEvaluator`] so the registry's lambda-taking built-ins (`where`,
//! `select`, `aggregate`, ...) can re-enter evaluation for each element
//! without the registry crate depending on this one (spec.md §9 "deferred
//! per-element argument re-evaluation via AST node + callback").
//!
//! `.`/`is`/`as` have no `FhirPathOperator` registration (spec.md §3.2 note,
//! `registry.rs`'s `register_precedence_only` doc comment) — they're handled
//! here as dedicated `Binary`-node cases, not through `registry.get_operator`.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use octofhir_fhirpath_ast::{Ast, LiteralValue, NodeId, NodeKind, UnaryOperator};
use octofhir_fhirpath_core::FhirPathError;
use octofhir_fhirpath_model::{
    BoxedValue, Collection, DatePrecision, FhirPathValue, PrecisionDate, PrecisionDateTime,
    PrecisionTime, Quantity, TimePrecision,
};
use octofhir_fhirpath_registry::{LambdaEvaluator, Registry};
use rust_decimal::Decimal;
use rustc_hash::FxHashMap;

use crate::context::RuntimeContext;

/// Evaluates `root` against `input`, with `variables` seeding `%name`
/// lookups (spec.md §6.1 `evaluate`). The public entry point; everything
/// else in this module is reached only through `Interpreter`.
pub fn evaluate(
    ast: &Ast,
    root: NodeId,
    registry: &Registry,
    input: Collection,
    variables: FxHashMap<String, Collection>,
) -> Result<Collection, FhirPathError> {
    let ctx = Arc::new(RuntimeContext::create(input, variables));
    let mut interpreter = Interpreter::new(ast, registry, ctx);
    interpreter.eval_node(root)
}

/// One evaluation run over one `Ast`. Cheap to construct; `ctx` is the only
/// field that changes as evaluation descends into lambdas (spec.md §4.7).
pub struct Interpreter<'a> {
    ast: &'a Ast,
    registry: &'a Registry,
    ctx: Arc<RuntimeContext>,
    /// Set immediately before invoking `ofType`/`is`/`as`-shaped built-ins so
    /// the next `LambdaEvaluator::evaluate` call returns the raw type name
    /// instead of evaluating the argument as an ordinary expression (spec.md
    /// §4.4.1: a type specifier is not itself an evaluable expression).
    type_specifier_pending: bool,
}

impl<'a> Interpreter<'a> {
    pub fn new(ast: &'a Ast, registry: &'a Registry, ctx: Arc<RuntimeContext>) -> Self {
        Self {
            ast,
            registry,
            ctx,
            type_specifier_pending: false,
        }
    }

    fn eval_node(&mut self, id: NodeId) -> Result<Collection, FhirPathError> {
        match &self.ast.get(id).kind {
            NodeKind::Literal { value } => self.eval_literal(value),
            NodeKind::Identifier { name } => {
                let name = name.clone();
                Ok(self.navigate_property(&self.ctx.this(), &name))
            }
            NodeKind::Variable { name, prefix: _ } => self.eval_variable(name),
            NodeKind::Binary { operator, left, right } => {
                let operator = operator.clone();
                self.eval_binary(&operator, *left, *right)
            }
            NodeKind::Unary { operator, operand } => self.eval_unary(*operator, *operand),
            NodeKind::Function { name, arguments } => {
                let arguments = arguments.clone();
                self.eval_function(*name, &arguments)
            }
            NodeKind::Index { target, index } => self.eval_index(*target, *index),
            NodeKind::Collection { elements } => {
                let elements = elements.clone();
                self.eval_collection(&elements)
            }
            NodeKind::Cursor { .. } => Ok(Collection::empty()),
            NodeKind::Error { message, .. } => Err(FhirPathError::generic(message.clone())),
        }
    }

    fn eval_literal(&mut self, value: &LiteralValue) -> Result<Collection, FhirPathError> {
        let item = match value {
            LiteralValue::Integer(i) => BoxedValue::integer(*i),
            LiteralValue::Decimal(d) => BoxedValue::decimal(*d),
            LiteralValue::String(s) => BoxedValue::string(s.clone()),
            LiteralValue::Boolean(b) => BoxedValue::boolean(*b),
            LiteralValue::Date(text) => BoxedValue::new(parse_date_literal(text)?),
            LiteralValue::DateTime(text) => BoxedValue::new(parse_datetime_literal(text)?),
            LiteralValue::Time(text) => BoxedValue::new(parse_time_literal(text)?),
            LiteralValue::Quantity { value, unit } => {
                BoxedValue::new(FhirPathValue::Quantity(Quantity::new(*value, unit.clone())))
            }
        };
        Ok(Collection::singleton(item))
    }

    fn eval_variable(&mut self, name: &str) -> Result<Collection, FhirPathError> {
        match name {
            "this" => Ok(self.ctx.this()),
            "index" => Ok(self.ctx.index().map_or_else(Collection::empty, |i| {
                Collection::singleton(BoxedValue::integer(i))
            })),
            "total" => Ok(self.ctx.total()),
            "context" => Ok(self.ctx.context()),
            "resource" => Ok(self.ctx.resource()),
            "rootResource" => Ok(self.ctx.root_resource()),
            other => Ok(self.ctx.get_variable(other).unwrap_or_else(Collection::empty)),
        }
    }

    fn eval_unary(&mut self, operator: UnaryOperator, operand: NodeId) -> Result<Collection, FhirPathError> {
        let value = self.eval_node(operand)?;
        match operator {
            UnaryOperator::Plus => Ok(value),
            UnaryOperator::Minus => negate(value),
        }
    }

    fn eval_binary(&mut self, operator: &str, left: NodeId, right: NodeId) -> Result<Collection, FhirPathError> {
        match operator {
            "." => self.eval_dot(left, right),
            "is" => self.eval_is(left, right),
            "as" => self.eval_as(left, right),
            _ => {
                let left_value = self.eval_node(left)?;
                let right_value = self.eval_node(right)?;
                let op = self
                    .registry
                    .get_operator(operator)
                    .ok_or_else(|| FhirPathError::unknown_operator(operator))?
                    .clone();
                op.evaluate(&left_value, &right_value)
            }
        }
    }

    /// `a.b` navigation (spec.md §4.5): the left side is evaluated once and
    /// fed as the explicit receiver of the right side, never by mutating
    /// `$this` — `FhirPathOperation::evaluate` already takes its target as
    /// an argument.
    fn eval_dot(&mut self, left: NodeId, right: NodeId) -> Result<Collection, FhirPathError> {
        let target = self.eval_node(left)?;
        match &self.ast.get(right).kind {
            NodeKind::Identifier { name } => {
                let name = name.clone();
                Ok(self.navigate_property(&target, &name))
            }
            NodeKind::Function { name, arguments } => {
                let name = *name;
                let arguments = arguments.clone();
                self.eval_function_on(target, name, &arguments)
            }
            _ => self.eval_node(right),
        }
    }

    fn eval_is(&mut self, left: NodeId, right: NodeId) -> Result<Collection, FhirPathError> {
        let target = self.eval_node(left)?;
        let type_name = extract_type_name(self.ast, right).ok_or_else(FhirPathError::invalid_type_specifier)?;
        let type_name = simple_type_name(&type_name);
        let Some(item) = target.as_singleton() else {
            if target.is_empty() {
                return Ok(Collection::empty());
            }
            return Err(FhirPathError::singleton_required("is"));
        };
        Ok(Collection::singleton(BoxedValue::boolean(item_matches_type(item, &type_name))))
    }

    fn eval_as(&mut self, left: NodeId, right: NodeId) -> Result<Collection, FhirPathError> {
        let target = self.eval_node(left)?;
        let type_name = extract_type_name(self.ast, right).ok_or_else(FhirPathError::invalid_type_specifier)?;
        let type_name = simple_type_name(&type_name);
        let Some(item) = target.as_singleton() else {
            if target.is_empty() {
                return Ok(Collection::empty());
            }
            return Err(FhirPathError::singleton_required("as"));
        };
        if item_matches_type(item, &type_name) {
            Ok(Collection::singleton(item.clone()))
        } else {
            Ok(Collection::empty())
        }
    }

    fn eval_index(&mut self, target: NodeId, index: NodeId) -> Result<Collection, FhirPathError> {
        let target = self.eval_node(target)?;
        let index_value = self.eval_node(index)?;
        let Some(index_item) = index_value.as_singleton() else {
            return Ok(Collection::empty());
        };
        let Some(i) = index_item.value.as_integer() else {
            return Ok(Collection::empty());
        };
        if i < 0 {
            return Ok(Collection::empty());
        }
        match target.as_slice().get(i as usize) {
            Some(item) => Ok(Collection::singleton(item.clone())),
            None => Ok(Collection::empty()),
        }
    }

    fn eval_collection(&mut self, elements: &[NodeId]) -> Result<Collection, FhirPathError> {
        let mut out = Collection::empty();
        for &element in elements {
            out.extend(self.eval_node(element)?);
        }
        Ok(out)
    }

    /// Function call reached directly (not via `.`) — receiver is `$this`
    /// (spec.md §4.5).
    fn eval_function(&mut self, name: NodeId, arguments: &[NodeId]) -> Result<Collection, FhirPathError> {
        let target = self.ctx.this();
        self.eval_function_on(target, name, arguments)
    }

    fn eval_function_on(
        &mut self,
        target: Collection,
        name: NodeId,
        arguments: &[NodeId],
    ) -> Result<Collection, FhirPathError> {
        let NodeKind::Identifier { name: function_name } = &self.ast.get(name).kind else {
            return Err(FhirPathError::generic("function name is not an identifier"));
        };
        let function_name = function_name.clone();
        let op = self
            .registry
            .get_function(&function_name)
            .ok_or_else(|| FhirPathError::unknown_function(function_name.clone()))?
            .clone();
        // `ofType`'s sole argument is a type specifier, not an ordinary
        // expression (spec.md §4.4.1) — the next `evaluate()` call this
        // operation makes against `self` must short-circuit to the raw type
        // name instead of walking the argument as `Identifier`/`Binary("." )`
        // navigation against `$this`.
        self.type_specifier_pending = function_name.eq_ignore_ascii_case("ofType");
        let result = op.evaluate(&target, arguments, self);
        self.type_specifier_pending = false;
        result
    }

    /// Navigates one property step over one receiver item (spec.md §4.5,
    /// §3.4 primitive-extension note): object property lookup, with the
    /// FHIR `_field` sibling's extension/id folded into the returned item's
    /// `primitive_element` when the looked-up value is a JSON scalar.
    fn navigate_property(&self, target: &Collection, name: &str) -> Collection {
        let mut out = Vec::new();
        for item in target.iter() {
            let serde_json::Value::Object(map) = &json_view(item) else {
                continue;
            };
            if let Some(value) = map.get(name) {
                push_json_value(&mut out, value, map.get(&format!("_{name}")));
            }
        }
        Collection::from_vec(out)
    }
}

impl<'a> LambdaEvaluator for Interpreter<'a> {
    fn evaluate(&mut self, node: NodeId) -> Result<Collection, FhirPathError> {
        if self.type_specifier_pending {
            self.type_specifier_pending = false;
            let type_name = extract_type_name(self.ast, node).ok_or_else(FhirPathError::invalid_type_specifier)?;
            return Ok(Collection::singleton(BoxedValue::string(type_name)));
        }
        self.eval_node(node)
    }

    fn evaluate_with_this(
        &mut self,
        node: NodeId,
        this: &Collection,
        index: usize,
        total: &Collection,
    ) -> Result<Collection, FhirPathError> {
        let saved = self.ctx.clone();
        self.ctx = self
            .ctx
            .with_iterator(this.clone(), index as i64)
            .with_total(total.clone());
        let result = self.eval_node(node);
        self.ctx = saved;
        result
    }

    fn evaluate_aggregate(
        &mut self,
        node: NodeId,
        this: &Collection,
        index: usize,
        _receiver: &Collection,
        total: &Collection,
    ) -> Result<Collection, FhirPathError> {
        self.evaluate_with_this(node, this, index, total)
    }
}

/// `-x` (spec.md §4.1 unary minus): numeric/quantity negation, singleton
/// only.
fn negate(value: Collection) -> Result<Collection, FhirPathError> {
    let Some(item) = value.as_singleton() else {
        if value.is_empty() {
            return Ok(Collection::empty());
        }
        return Err(FhirPathError::singleton_required("unary -"));
    };
    let negated = match &item.value {
        FhirPathValue::Integer(i) => FhirPathValue::Integer(-i),
        FhirPathValue::Decimal(d) => FhirPathValue::Decimal(-d),
        FhirPathValue::Quantity(q) => FhirPathValue::Quantity(Quantity::new(-q.value, q.unit.clone())),
        other => return Err(FhirPathError::generic(format!("cannot negate {:?}", other.type_name()))),
    };
    Ok(Collection::singleton(BoxedValue::new(negated)))
}

/// Recovers a dot-joined qualified type name from an `is`/`as` right-hand
/// operand (a single `Identifier`) or an `ofType(...)` argument (a nested
/// `Binary(".")` chain of `Identifier`s) — mirrors
/// `fhirpath-analyzer::analyzer::extract_type_name` exactly since both
/// crates face the same two parser shapes (spec.md §3.2 note).
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

/// Strips a `System.`/`FHIR.` namespace prefix, leaving the bare type name
/// `is`/`as`/`ofType` match against (spec.md §4.4.1).
fn simple_type_name(qualified: &str) -> String {
    qualified.rsplit('.').next().unwrap_or(qualified).to_string()
}

/// Whether `item` matches `type_name`, consulting the item's analyzed
/// `TypeInfo` first and falling back to the runtime value's own type plus a
/// FHIR `resourceType` check (no `ModelProvider` is available at evaluation
/// time, spec.md §6.3 — the analyzer is the only consumer of that seam).
fn item_matches_type(item: &BoxedValue, type_name: &str) -> bool {
    if let Some(info) = &item.type_info {
        if info.type_name.as_str() == type_name || info.name.as_deref() == Some(type_name) {
            return true;
        }
    }
    if item.value.type_name().as_str() == type_name {
        return true;
    }
    if let FhirPathValue::Object(serde_json::Value::Object(map)) = &item.value {
        if let Some(resource_type) = map.get("resourceType").and_then(|v| v.as_str()) {
            return resource_type == type_name;
        }
    }
    false
}

/// The JSON view of one boxed item, used by property navigation. Primitive
/// scalars are represented as their own JSON scalar so `_field` sibling
/// lookups still work uniformly; `Object` items pass through untouched.
fn json_view(item: &BoxedValue) -> serde_json::Value {
    match &item.value {
        FhirPathValue::Object(v) => v.clone(),
        other => serde_json::Value::String(other.to_display_string()),
    }
}

/// Pushes one navigated JSON value as a boxed item, folding a FHIR
/// `_field` sibling's `extension`/`id` in as `primitive_element` (spec.md
/// §3.4).
fn push_json_value(out: &mut Vec<BoxedValue>, value: &serde_json::Value, sibling: Option<&serde_json::Value>) {
    match value {
        serde_json::Value::Array(items) => {
            for item in items {
                push_json_scalar(out, item, None);
            }
        }
        other => push_json_scalar(out, other, sibling),
    }
}

fn push_json_scalar(out: &mut Vec<BoxedValue>, value: &serde_json::Value, sibling: Option<&serde_json::Value>) {
    let mut boxed = BoxedValue::new(json_to_fhirpath_value(value));
    if let Some(sibling) = sibling {
        boxed = boxed.with_primitive_element(sibling.clone());
    }
    out.push(boxed);
}

fn json_to_fhirpath_value(value: &serde_json::Value) -> FhirPathValue {
    match value {
        serde_json::Value::Bool(b) => FhirPathValue::Boolean(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FhirPathValue::Integer(i)
            } else if let Some(f) = n.as_f64() {
                FhirPathValue::Decimal(Decimal::try_from(f).unwrap_or_default())
            } else {
                FhirPathValue::Integer(0)
            }
        }
        serde_json::Value::String(s) => FhirPathValue::string(s.clone()),
        other => FhirPathValue::Object(other.clone()),
    }
}

fn split_timezone(text: &str) -> (&str, Option<i32>) {
    if let Some(stripped) = text.strip_suffix('Z') {
        return (stripped, Some(0));
    }
    let bytes = text.as_bytes();
    for i in (1..bytes.len()).rev() {
        if (bytes[i] == b'+' || bytes[i] == b'-') && (bytes[i - 1] != b'T') {
            let (body, offset) = text.split_at(i);
            if let Some(minutes) = parse_offset(offset) {
                return (body, Some(minutes));
            }
        }
    }
    (text, None)
}

fn parse_offset(offset: &str) -> Option<i32> {
    let sign = match offset.as_bytes().first()? {
        b'+' => 1,
        b'-' => -1,
        _ => return None,
    };
    let rest = &offset[1..];
    let (hh, mm) = rest.split_once(':').unwrap_or((rest, "0"));
    let hh: i32 = hh.parse().ok()?;
    let mm: i32 = mm.parse().ok()?;
    Some(sign * (hh * 60 + mm))
}

/// Parses the `YYYY[-MM[-DD]]` body of a `@...` literal, excluding the `@`
/// prefix (spec.md §3.1 lexer note: literal text is preserved with the
/// sigil; the interpreter strips it here).
fn parse_date_part(text: &str) -> Result<PrecisionDate, FhirPathError> {
    let mut parts = text.splitn(3, '-');
    let year: i32 = parts
        .next()
        .and_then(|y| y.parse().ok())
        .ok_or_else(|| FhirPathError::generic(format!("invalid date literal '@{text}'")))?;
    let month = parts.next();
    let day = parts.next();
    let (date, precision) = match (month, day) {
        (None, _) => (
            NaiveDate::from_ymd_opt(year, 1, 1).ok_or_else(|| FhirPathError::generic("invalid date"))?,
            DatePrecision::Year,
        ),
        (Some(m), None) => {
            let month: u32 = m.parse().map_err(|_| FhirPathError::generic("invalid month"))?;
            (
                NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(|| FhirPathError::generic("invalid date"))?,
                DatePrecision::Month,
            )
        }
        (Some(m), Some(d)) => {
            let month: u32 = m.parse().map_err(|_| FhirPathError::generic("invalid month"))?;
            let day: u32 = d.parse().map_err(|_| FhirPathError::generic("invalid day"))?;
            (
                NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| FhirPathError::generic("invalid date"))?,
                DatePrecision::Day,
            )
        }
    };
    Ok(PrecisionDate { date, precision })
}

fn parse_time_part(text: &str) -> Result<PrecisionTime, FhirPathError> {
    let mut parts = text.splitn(3, ':');
    let hour: u32 = parts
        .next()
        .and_then(|h| h.parse().ok())
        .ok_or_else(|| FhirPathError::generic(format!("invalid time literal 'T{text}'")))?;
    let minute = parts.next();
    let second = parts.next();
    let (time, precision) = match (minute, second) {
        (None, _) => (
            NaiveTime::from_hms_opt(hour, 0, 0).ok_or_else(|| FhirPathError::generic("invalid time"))?,
            TimePrecision::Hour,
        ),
        (Some(m), None) => {
            let minute: u32 = m.parse().map_err(|_| FhirPathError::generic("invalid minute"))?;
            (
                NaiveTime::from_hms_opt(hour, minute, 0).ok_or_else(|| FhirPathError::generic("invalid time"))?,
                TimePrecision::Minute,
            )
        }
        (Some(m), Some(s)) => {
            let minute: u32 = m.parse().map_err(|_| FhirPathError::generic("invalid minute"))?;
            if let Some((sec, frac)) = s.split_once('.') {
                let second: u32 = sec.parse().map_err(|_| FhirPathError::generic("invalid second"))?;
                let millis: u32 = format!("{frac:0<3}")[..3]
                    .parse()
                    .map_err(|_| FhirPathError::generic("invalid millisecond"))?;
                (
                    NaiveTime::from_hms_milli_opt(hour, minute, second, millis)
                        .ok_or_else(|| FhirPathError::generic("invalid time"))?,
                    TimePrecision::Millisecond,
                )
            } else {
                let second: u32 = s.parse().map_err(|_| FhirPathError::generic("invalid second"))?;
                (
                    NaiveTime::from_hms_opt(hour, minute, second).ok_or_else(|| FhirPathError::generic("invalid time"))?,
                    TimePrecision::Second,
                )
            }
        }
    };
    Ok(PrecisionTime { time, precision })
}

fn parse_date_literal(text: &str) -> Result<FhirPathValue, FhirPathError> {
    let body = text.strip_prefix('@').unwrap_or(text);
    Ok(FhirPathValue::Date(parse_date_part(body)?))
}

fn parse_time_literal(text: &str) -> Result<FhirPathValue, FhirPathError> {
    let body = text.strip_prefix('@').and_then(|s| s.strip_prefix('T')).unwrap_or(text);
    let (body, _) = split_timezone(body);
    Ok(FhirPathValue::Time(parse_time_part(body)?))
}

fn parse_datetime_literal(text: &str) -> Result<FhirPathValue, FhirPathError> {
    let body = text.strip_prefix('@').unwrap_or(text);
    let (body, tz_offset_minutes) = split_timezone(body);
    match body.split_once('T') {
        Some((date_part, time_part)) => {
            let date = parse_date_part(date_part)?;
            let time = if time_part.is_empty() {
                None
            } else {
                Some(parse_time_part(time_part)?)
            };
            Ok(FhirPathValue::DateTime(PrecisionDateTime {
                date,
                time,
                tz_offset_minutes,
            }))
        }
        None => Ok(FhirPathValue::DateTime(PrecisionDateTime {
            date: parse_date_part(body)?,
            time: None,
            tz_offset_minutes,
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_parser::parse;

    fn eval(source: &str, input: serde_json::Value) -> Collection {
        let registry = Registry::new_with_builtins();
        let ast = parse(source, &registry).expect("parse");
        let root = ast.root.expect("root");
        let collection = Collection::singleton(BoxedValue::new(FhirPathValue::Object(input)));
        evaluate(&ast, root, &registry, collection, FxHashMap::default()).expect("evaluate")
    }

    #[test]
    fn literal_arithmetic() {
        let result = eval("1 + 2 * 3", serde_json::json!({}));
        assert_eq!(result.as_singleton().unwrap().value.as_integer(), Some(7));
    }

    #[test]
    fn property_navigation() {
        let result = eval("name.given", serde_json::json!({"name": {"given": "Alice"}}));
        assert_eq!(result.as_singleton().unwrap().value.as_str(), Some("Alice"));
    }

    #[test]
    fn primitive_extension_sibling_propagates() {
        let result = eval(
            "value",
            serde_json::json!({"value": 5, "_value": {"id": "x"}}),
        );
        let item = result.as_singleton().unwrap();
        assert_eq!(item.value.as_integer(), Some(5));
        assert_eq!(item.primitive_element.as_ref().unwrap()["id"], "x");
    }

    #[test]
    fn where_filters_by_predicate() {
        let result = eval(
            "items.where($this > 1)",
            serde_json::json!({"items": [1, 2, 3]}),
        );
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn select_projects_each_element() {
        let result = eval(
            "items.select($this * 2)",
            serde_json::json!({"items": [1, 2, 3]}),
        );
        let values: Vec<_> = result.iter().map(|v| v.value.as_integer().unwrap()).collect();
        assert_eq!(values, vec![2, 4, 6]);
    }

    #[test]
    fn of_type_filters_by_system_type() {
        let result = eval(
            "items.ofType(System.String)",
            serde_json::json!({"items": [1, "two", 3]}),
        );
        assert_eq!(result.len(), 1);
        assert_eq!(result.as_singleton().unwrap().value.as_str(), Some("two"));
    }

    #[test]
    fn is_checks_runtime_type() {
        let result = eval("5 is Integer", serde_json::json!({}));
        assert_eq!(result.as_singleton().unwrap().value.as_bool(), Some(true));
    }

    #[test]
    fn as_keeps_matching_value_and_empties_otherwise() {
        let matches = eval("5 as Integer", serde_json::json!({}));
        assert_eq!(matches.as_singleton().unwrap().value.as_integer(), Some(5));
        let no_match = eval("'x' as Integer", serde_json::json!({}));
        assert!(no_match.is_empty());
    }

    #[test]
    fn substring_on_literal_string() {
        let result = eval("'hello'.substring(1, 3)", serde_json::json!({}));
        assert_eq!(result.as_singleton().unwrap().value.as_str(), Some("ell"));
    }

    #[test]
    fn date_literal_precision_round_trips_through_to_string() {
        let result = eval("@2023-01.toString()", serde_json::json!({}));
        assert_eq!(result.as_singleton().unwrap().value.as_str(), Some("2023-01"));
    }

    #[test]
    fn datetime_literal_with_offset_round_trips() {
        let result = eval("@2023-01-01T12:30:00.500+02:00.toString()", serde_json::json!({}));
        assert_eq!(
            result.as_singleton().unwrap().value.as_str(),
            Some("2023-01-01T12:30:00.500+02:00")
        );
    }

    #[test]
    fn index_out_of_range_is_empty_not_an_error() {
        let result = eval("items[5]", serde_json::json!({"items": [1, 2]}));
        assert!(result.is_empty());
    }

    #[test]
    fn unknown_function_is_an_error() {
        let registry = Registry::new_with_builtins();
        let ast = parse("nope()", &registry).expect("parse");
        let root = ast.root.expect("root");
        let collection = Collection::singleton(BoxedValue::new(FhirPathValue::Object(serde_json::json!({}))));
        let result = evaluate(&ast, root, &registry, collection, FxHashMap::default());
        assert!(matches!(result, Err(FhirPathError::UnknownFunction { .. })));
    }
}
