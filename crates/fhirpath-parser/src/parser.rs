//! Pratt (precedence-climbing) parser turning a token stream into an AST
//! (spec.md §4.3, §4.3.1, §4.3.2).
//!
//! The loop itself never hard-codes a precedence table: every infix symbol
//! is looked up in the [`Registry`] that also serves the analyzer and
//! interpreter, so adding an operator is a registry-only change. `.` and
//! `[` are registered for precedence alone (spec.md §4.1) and handled here
//! as dedicated productions rather than generic binary operators, since
//! their right-hand side has its own grammar (a property/function name, an
//! index expression).

use rust_decimal::Decimal;

use octofhir_fhirpath_ast::{Ast, CursorContext, LiteralValue, NodeId, NodeKind, UnaryOperator, VariablePrefix};
use octofhir_fhirpath_core::{FhirPathError, Position, Result, Span};
use octofhir_fhirpath_registry::{Associativity, Registry};

use crate::lexer::{Lexer, CALENDAR_UNIT_WORDS};
use crate::token::{KeywordOperator, Token, TokenKind};

/// Which parsing discipline to apply (spec.md §4.3.1): `Standard` stops at
/// the first syntax error, `Lsp` recovers into `Error` nodes so a partial
/// AST is always available to an editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserMode {
    Standard,
    Lsp,
}

impl Default for ParserMode {
    fn default() -> Self {
        Self::Standard
    }
}

/// Result of an LSP-mode parse: always succeeds, carrying whatever errors
/// were recovered from along the way (spec.md §4.3.2, §7).
#[derive(Debug)]
pub struct ParseOutcome {
    pub ast: Ast,
    pub errors: Vec<FhirPathError>,
}

/// Parses `source` in standard mode: the first syntax error aborts the
/// parse (spec.md §7 "lex/parse fatal-unless-recovery in standard mode").
pub fn parse(source: &str, registry: &Registry) -> Result<Ast> {
    let tokens = Lexer::new(source).tokenize()?;
    let mut parser = Parser::new(tokens, registry, ParserMode::Standard, None);
    let root = parser.parse_expression(0)?;
    parser.expect_eof()?;
    parser.ast.root = Some(root);
    Ok(parser.ast)
}

/// Parses `source` in LSP mode: trivia is preserved, parent/sibling links
/// and indexes are finalized, and syntax errors are recovered into `Error`
/// nodes rather than aborting (spec.md §4.3.1, §4.3.2). `cursor_offset`, if
/// given, causes a `Cursor` node to be synthesized wherever the cursor
/// falls inside an otherwise-incomplete production (spec.md §3.2).
pub fn parse_lsp(source: &str, registry: &Registry, cursor_offset: Option<u32>) -> ParseOutcome {
    let tokens = match Lexer::with_trivia(source, true).tokenize() {
        Ok(tokens) => tokens,
        Err(err) => {
            let mut ast = Ast::new();
            let span = Span::empty_at(Position::start());
            let root = ast.alloc(
                NodeKind::Error {
                    message: err.to_string(),
                    partial: None,
                },
                span,
            );
            ast.root = Some(root);
            ast.finalize_lsp_links(source);
            return ParseOutcome {
                ast,
                errors: vec![err],
            };
        }
    };

    let mut parser = Parser::new(tokens, registry, ParserMode::Lsp, cursor_offset);
    let root = match parser.parse_expression(0) {
        Ok(id) => id,
        Err(err) => parser.recover(err),
    };
    while !parser.at_eof() {
        let tok = parser.peek().clone();
        let err = FhirPathError::unexpected_token(tok.kind.describe(), tok.span);
        parser.recover(err);
    }
    parser.ast.root = Some(root);
    parser.ast.finalize_lsp_links(source);
    ParseOutcome {
        ast: parser.ast,
        errors: parser.errors,
    }
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    registry: &'a Registry,
    ast: Ast,
    mode: ParserMode,
    cursor_offset: Option<u32>,
    errors: Vec<FhirPathError>,
}

impl<'a> Parser<'a> {
    fn new(tokens: Vec<Token>, registry: &'a Registry, mode: ParserMode, cursor_offset: Option<u32>) -> Self {
        Self {
            tokens,
            pos: 0,
            registry,
            ast: Ast::new(),
            mode,
            cursor_offset,
            errors: Vec::new(),
        }
    }

    fn last_index(&self) -> usize {
        self.tokens.len() - 1
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos.min(self.last_index())]
    }

    fn peek_at(&self, ahead: usize) -> &Token {
        &self.tokens[(self.pos + ahead).min(self.last_index())]
    }

    fn bump(&mut self) -> Token {
        let tok = self.tokens[self.pos.min(self.last_index())].clone();
        if self.pos < self.last_index() {
            self.pos += 1;
        }
        tok
    }

    fn at_eof(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn expect_eof(&mut self) -> Result<()> {
        if self.at_eof() {
            Ok(())
        } else {
            let tok = self.peek().clone();
            Err(FhirPathError::unexpected_token(tok.kind.describe(), tok.span))
        }
    }

    fn expect_rparen(&mut self) -> Result<()> {
        if matches!(self.peek().kind, TokenKind::RParen) {
            self.bump();
            Ok(())
        } else {
            Err(FhirPathError::expected_close_paren(self.peek().span))
        }
    }

    fn expect_rbracket(&mut self) -> Result<()> {
        if matches!(self.peek().kind, TokenKind::RBracket) {
            self.bump();
            Ok(())
        } else {
            Err(FhirPathError::expected_close_bracket(self.peek().span))
        }
    }

    fn expect_rbrace(&mut self) -> Result<()> {
        if matches!(self.peek().kind, TokenKind::RBrace) {
            self.bump();
            Ok(())
        } else {
            let tok = self.peek().clone();
            Err(FhirPathError::unexpected_token(tok.kind.describe(), tok.span))
        }
    }

    fn expect_identifier_text(&mut self) -> Result<String> {
        match self.peek().kind.clone() {
            TokenKind::Identifier { name, .. } => {
                self.bump();
                Ok(name)
            }
            _ => Err(FhirPathError::expected_type_name(self.peek().span)),
        }
    }

    /// Recovers from `err` (LSP mode only): records it, allocates an `Error`
    /// node, then skips tokens until a synchronizing one so the caller can
    /// keep parsing the rest of the expression (spec.md §4.3.2).
    fn recover(&mut self, err: FhirPathError) -> NodeId {
        let span = Span::empty_at(self.peek().span.start);
        self.errors.push(err.clone());
        while !self.at_eof() && !self.at_sync_token() {
            self.bump();
        }
        self.ast.alloc(
            NodeKind::Error {
                message: err.to_string(),
                partial: None,
            },
            span,
        )
    }

    fn at_sync_token(&self) -> bool {
        matches!(
            self.peek().kind,
            TokenKind::Comma | TokenKind::RParen | TokenKind::RBracket | TokenKind::RBrace | TokenKind::Semicolon
        )
    }

    /// Runs `f`; in LSP mode a failure is downgraded into a recovered
    /// `Error` node instead of aborting the whole parse, so one malformed
    /// sub-expression doesn't swallow its well-formed siblings.
    fn parse_or_recover(&mut self, f: impl FnOnce(&mut Self) -> Result<NodeId>) -> Result<NodeId> {
        match f(self) {
            Ok(id) => Ok(id),
            Err(err) if self.mode == ParserMode::Lsp => Ok(self.recover(err)),
            Err(err) => Err(err),
        }
    }

    /// Synthesizes a `Cursor` node when the cursor offset lands exactly at
    /// `at`'s start and nothing has been consumed for this production yet
    /// (spec.md §3.2, §4.3.1). A no-op outside LSP/cursor-aware parses.
    fn maybe_synth_cursor(&mut self, ctx: CursorContext, at: Span) -> Option<NodeId> {
        if self.mode != ParserMode::Lsp {
            return None;
        }
        let offset = self.cursor_offset?;
        if at.start.offset == offset {
            Some(self.ast.alloc(NodeKind::Cursor { context: ctx }, Span::empty_at(at.start)))
        } else {
            None
        }
    }

    // ---- Pratt loop ----

    fn parse_expression(&mut self, min_prec: i32) -> Result<NodeId> {
        let mut left = self.parse_unary()?;
        loop {
            let Some(sym) = self.current_operator_symbol() else {
                break;
            };
            let prec = self.registry.precedence(sym);
            if prec == -1 || prec < min_prec {
                break;
            }
            left = self.parse_infix(left, sym, prec)?;
        }
        Ok(left)
    }

    fn current_operator_symbol(&self) -> Option<&'static str> {
        Some(match &self.peek().kind {
            TokenKind::Dot => ".",
            TokenKind::LBracket => "[",
            TokenKind::Keyword(KeywordOperator::Is) => "is",
            TokenKind::Keyword(KeywordOperator::As) => "as",
            TokenKind::Star => "*",
            TokenKind::Slash => "/",
            TokenKind::Keyword(KeywordOperator::Div) => "div",
            TokenKind::Keyword(KeywordOperator::Mod) => "mod",
            TokenKind::Plus => "+",
            TokenKind::Minus => "-",
            TokenKind::Ampersand => "&",
            TokenKind::Pipe => "|",
            TokenKind::Lt => "<",
            TokenKind::Le => "<=",
            TokenKind::Gt => ">",
            TokenKind::Ge => ">=",
            TokenKind::Eq => "=",
            TokenKind::NotEq => "!=",
            TokenKind::Equiv => "~",
            TokenKind::NotEquiv => "!~",
            TokenKind::Keyword(KeywordOperator::In) => "in",
            TokenKind::Keyword(KeywordOperator::Contains) => "contains",
            TokenKind::Keyword(KeywordOperator::And) => "and",
            TokenKind::Keyword(KeywordOperator::Xor) => "xor",
            TokenKind::Keyword(KeywordOperator::Or) => "or",
            TokenKind::Keyword(KeywordOperator::Implies) => "implies",
            _ => return None,
        })
    }

    fn parse_infix(&mut self, left: NodeId, sym: &'static str, prec: i32) -> Result<NodeId> {
        match sym {
            "." => self.parse_dot(left),
            "[" => self.parse_index(left),
            "is" | "as" => self.parse_type_operator(left, sym),
            _ => {
                let assoc = self.registry.associativity(sym);
                self.bump();
                let next_min = match assoc {
                    Associativity::Left => prec + 1,
                    Associativity::Right => prec,
                };
                let right = self.parse_or_recover(|p| p.parse_expression(next_min))?;
                let span = self.ast.get(left).range.merge(self.ast.get(right).range);
                Ok(self.ast.alloc(
                    NodeKind::Binary {
                        operator: sym.to_string(),
                        left,
                        right,
                    },
                    span,
                ))
            }
        }
    }

    /// Unary `+`/`-` binds looser than `.`/`[` (so `-a.b` is `-(a.b)`) and
    /// tighter than the multiplicative operators (so `-a*b` is `(-a)*b`) —
    /// hence operand parsing stops just above the multiplicative precedence
    /// of 80 (spec.md §4.1 precedence table).
    const UNARY_PRECEDENCE: i32 = 81;

    fn parse_unary(&mut self) -> Result<NodeId> {
        let op = match self.peek().kind {
            TokenKind::Plus => UnaryOperator::Plus,
            TokenKind::Minus => UnaryOperator::Minus,
            _ => return self.parse_primary(),
        };
        let start = self.peek().span;
        self.bump();
        let operand = self.parse_or_recover(|p| p.parse_expression(Self::UNARY_PRECEDENCE))?;
        let span = start.merge(self.ast.get(operand).range);
        Ok(self.ast.alloc(NodeKind::Unary { operator: op, operand }, span))
    }

    // ---- Primary / prefix parselets ----

    fn parse_primary(&mut self) -> Result<NodeId> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::Integer(v) => {
                self.bump();
                self.literal_or_quantity(Decimal::from(v), Some(v), tok.span)
            }
            TokenKind::Decimal(v) => {
                self.bump();
                self.literal_or_quantity(v, None, tok.span)
            }
            TokenKind::String(s) => {
                self.bump();
                Ok(self.ast.alloc(NodeKind::Literal { value: LiteralValue::String(s) }, tok.span))
            }
            TokenKind::Boolean(b) => {
                self.bump();
                Ok(self.ast.alloc(NodeKind::Literal { value: LiteralValue::Boolean(b) }, tok.span))
            }
            TokenKind::Date(s) => {
                self.bump();
                Ok(self.ast.alloc(NodeKind::Literal { value: LiteralValue::Date(s) }, tok.span))
            }
            TokenKind::DateTime(s) => {
                self.bump();
                Ok(self.ast.alloc(NodeKind::Literal { value: LiteralValue::DateTime(s) }, tok.span))
            }
            TokenKind::Time(s) => {
                self.bump();
                Ok(self.ast.alloc(NodeKind::Literal { value: LiteralValue::Time(s) }, tok.span))
            }
            TokenKind::Identifier { name, .. } => {
                self.bump();
                self.parse_identifier_or_call(name, tok.span)
            }
            TokenKind::SpecialIdentifier(name) => {
                self.bump();
                let name = name.unwrap_or_else(|| "this".to_string());
                Ok(self.ast.alloc(NodeKind::Variable { name, prefix: VariablePrefix::Dollar }, tok.span))
            }
            TokenKind::EnvVar { name, .. } => {
                self.bump();
                Ok(self.ast.alloc(NodeKind::Variable { name, prefix: VariablePrefix::Percent }, tok.span))
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_or_recover(|p| p.parse_expression(0))?;
                self.expect_rparen()?;
                Ok(inner)
            }
            TokenKind::LBrace => self.parse_collection_literal(),
            TokenKind::Eof => {
                if let Some(cursor) = self.maybe_synth_cursor(CursorContext::Identifier, tok.span) {
                    Ok(cursor)
                } else {
                    Err(FhirPathError::expected_expression(tok.span))
                }
            }
            _ => Err(FhirPathError::unexpected_token(tok.kind.describe(), tok.span)),
        }
    }

    /// Fuses a number directly followed by a quoted UCUM unit or a bare
    /// calendar-unit word into a quantity literal (spec.md §3.5); the
    /// lexer deliberately leaves this to the parser (see `lexer.rs`'s
    /// `try_fuse_quantity_unit`), since only here do we have token-level
    /// lookahead to tell `4 'wk'`/`4 days` apart from `4.days()`.
    fn literal_or_quantity(&mut self, value: Decimal, bare_int: Option<i64>, start_span: Span) -> Result<NodeId> {
        if let TokenKind::String(unit) = self.peek().kind.clone() {
            let unit_span = self.peek().span;
            self.bump();
            let span = start_span.merge(unit_span);
            return Ok(self.ast.alloc(
                NodeKind::Literal {
                    value: LiteralValue::Quantity { value, unit: Some(unit) },
                },
                span,
            ));
        }
        if let TokenKind::Identifier { name, was_delimited: false } = self.peek().kind.clone() {
            if CALENDAR_UNIT_WORDS.contains(&name.as_str()) {
                let unit_span = self.peek().span;
                self.bump();
                let span = start_span.merge(unit_span);
                return Ok(self.ast.alloc(
                    NodeKind::Literal {
                        value: LiteralValue::Quantity { value, unit: Some(name) },
                    },
                    span,
                ));
            }
        }
        let lit = match bare_int {
            Some(i) => LiteralValue::Integer(i),
            None => LiteralValue::Decimal(value),
        };
        Ok(self.ast.alloc(NodeKind::Literal { value: lit }, start_span))
    }

    fn parse_identifier_or_call(&mut self, name: String, span: Span) -> Result<NodeId> {
        let ident = self.ast.alloc(NodeKind::Identifier { name }, span);
        if matches!(self.peek().kind, TokenKind::LParen) {
            self.parse_function_call(ident)
        } else {
            Ok(ident)
        }
    }

    fn parse_function_call(&mut self, name: NodeId) -> Result<NodeId> {
        let start = self.ast.get(name).range;
        self.bump(); // '('
        let mut args = Vec::new();
        if !matches!(self.peek().kind, TokenKind::RParen) {
            loop {
                let arg_span = self.peek().span;
                let arg = if let Some(cursor) = self.maybe_synth_cursor(CursorContext::Argument { argument_index: args.len() }, arg_span) {
                    cursor
                } else {
                    self.parse_or_recover(|p| p.parse_expression(0))?
                };
                args.push(arg);
                if matches!(self.peek().kind, TokenKind::Comma) {
                    self.bump();
                    if matches!(self.peek().kind, TokenKind::RParen) {
                        return Err(FhirPathError::trailing_comma(self.peek().span));
                    }
                    continue;
                }
                break;
            }
        }
        let end_span = self.peek().span;
        self.expect_rparen()?;
        let span = start.merge(end_span);
        Ok(self.ast.alloc(NodeKind::Function { name, arguments: args }, span))
    }

    fn parse_collection_literal(&mut self) -> Result<NodeId> {
        let start = self.peek().span;
        self.bump(); // '{'
        let mut elements = Vec::new();
        if !matches!(self.peek().kind, TokenKind::RBrace) {
            loop {
                elements.push(self.parse_or_recover(|p| p.parse_expression(0))?);
                if matches!(self.peek().kind, TokenKind::Comma) {
                    self.bump();
                    if matches!(self.peek().kind, TokenKind::RBrace) {
                        return Err(FhirPathError::trailing_comma(self.peek().span));
                    }
                    continue;
                }
                break;
            }
        }
        let end_span = self.peek().span;
        self.expect_rbrace()?;
        let span = start.merge(end_span);
        Ok(self.ast.alloc(NodeKind::Collection { elements }, span))
    }

    // ---- `.`, `[`, `is`/`as` productions ----

    /// The right side of `.` is restricted to a property name or a
    /// function call, never a general expression (spec.md §3.2 navigation
    /// contract) — a parenthesized expression after `.` is a syntax error.
    fn parse_dot(&mut self, left: NodeId) -> Result<NodeId> {
        self.bump(); // '.'
        let next_span = self.peek().span;
        let right = if let Some(cursor) = self.maybe_synth_cursor(CursorContext::Identifier, next_span) {
            cursor
        } else {
            match self.peek().kind.clone() {
                TokenKind::Identifier { name, .. } => {
                    self.bump();
                    self.parse_identifier_or_call(name, next_span)?
                }
                TokenKind::Keyword(k) => {
                    // A keyword word used as a function name (e.g. the
                    // string function `contains`) still lexes as a
                    // `Keyword` token regardless of position; only the
                    // call form makes sense here.
                    self.bump();
                    self.parse_identifier_or_call(k.as_str().to_string(), next_span)?
                }
                _ => return Err(FhirPathError::expected_identifier(next_span)),
            }
        };
        let span = self.ast.get(left).range.merge(self.ast.get(right).range);
        Ok(self.ast.alloc(
            NodeKind::Binary {
                operator: ".".to_string(),
                left,
                right,
            },
            span,
        ))
    }

    fn parse_index(&mut self, left: NodeId) -> Result<NodeId> {
        self.bump(); // '['
        let inner_span = self.peek().span;
        let index = if let Some(cursor) = self.maybe_synth_cursor(CursorContext::Index, inner_span) {
            cursor
        } else {
            self.parse_or_recover(|p| p.parse_expression(0))?
        };
        let end_span = self.peek().span;
        self.expect_rbracket()?;
        let span = self.ast.get(left).range.merge(end_span);
        Ok(self.ast.alloc(NodeKind::Index { target: left, index }, span))
    }

    fn parse_type_operator(&mut self, left: NodeId, sym: &'static str) -> Result<NodeId> {
        self.bump(); // 'is' / 'as'
        let next_span = self.peek().span;
        let right = if let Some(cursor) = self.maybe_synth_cursor(CursorContext::Type, next_span) {
            cursor
        } else {
            self.parse_or_recover(|p| p.parse_type_name())?
        };
        let span = self.ast.get(left).range.merge(self.ast.get(right).range);
        Ok(self.ast.alloc(
            NodeKind::Binary {
                operator: sym.to_string(),
                left,
                right,
            },
            span,
        ))
    }

    /// A dotted type specifier (`Patient`, `FHIR.Patient`, `System.String`),
    /// never a general expression (spec.md §4.3).
    fn parse_type_name(&mut self) -> Result<NodeId> {
        let start = self.peek().span;
        let mut end = start;
        let mut parts = vec![self.expect_identifier_text()?];
        while matches!(self.peek().kind, TokenKind::Dot) && matches!(self.peek_at(1).kind, TokenKind::Identifier { .. }) {
            self.bump(); // '.'
            let span = self.peek().span;
            parts.push(self.expect_identifier_text()?);
            end = span;
        }
        let span = start.merge(end);
        Ok(self.ast.alloc(NodeKind::Identifier { name: parts.join(".") }, span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_ast::NodeKind::*;

    fn registry() -> Registry {
        Registry::new_with_builtins()
    }

    fn root(source: &str) -> (Ast, NodeId) {
        let registry = registry();
        let ast = parse(source, &registry).unwrap_or_else(|e| panic!("{source}: {e}"));
        let root = ast.root.unwrap();
        (ast, root)
    }

    #[test]
    fn navigation_chains_left_associatively() {
        let (ast, root) = root("Patient.name.given");
        match &ast.get(root).kind {
            Binary { operator, left, right } => {
                assert_eq!(operator, ".");
                assert!(matches!(&ast.get(*right).kind, Identifier { name } if name == "given"));
                match &ast.get(*left).kind {
                    Binary { operator, left, right } => {
                        assert_eq!(operator, ".");
                        assert!(matches!(&ast.get(*left).kind, Identifier { name } if name == "Patient"));
                        assert!(matches!(&ast.get(*right).kind, Identifier { name } if name == "name"));
                    }
                    other => panic!("expected nested Binary, got {other:?}"),
                }
            }
            other => panic!("expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn multiplicative_binds_tighter_than_additive() {
        let (ast, root) = root("1 + 2 * 3");
        match &ast.get(root).kind {
            Binary { operator, right, .. } => {
                assert_eq!(operator, "+");
                assert!(matches!(&ast.get(*right).kind, Binary { operator, .. } if operator == "*"));
            }
            other => panic!("expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn implies_is_right_associative() {
        let (ast, root) = root("a implies b implies c");
        match &ast.get(root).kind {
            Binary { operator, right, .. } => {
                assert_eq!(operator, "implies");
                assert!(matches!(&ast.get(*right).kind, Binary { operator, .. } if operator == "implies"));
            }
            other => panic!("expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn unary_minus_binds_looser_than_dot_tighter_than_star() {
        let (ast, root) = root("-4.abs()");
        match &ast.get(root).kind {
            Unary { operator, operand } => {
                assert_eq!(*operator, UnaryOperator::Minus);
                assert!(matches!(&ast.get(*operand).kind, Binary { operator, .. } if operator == "."));
            }
            other => panic!("expected Unary, got {other:?}"),
        }

        let (ast, root) = root("-4 * 3");
        match &ast.get(root).kind {
            Binary { operator, left, .. } => {
                assert_eq!(operator, "*");
                assert!(matches!(&ast.get(*left).kind, Unary { .. }));
            }
            other => panic!("expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn bare_calendar_word_fuses_into_a_quantity_literal() {
        let (ast, root) = root("4 days");
        match &ast.get(root).kind {
            Literal { value: LiteralValue::Quantity { value, unit } } => {
                assert_eq!(*value, Decimal::from(4));
                assert_eq!(unit.as_deref(), Some("days"));
            }
            other => panic!("expected Quantity literal, got {other:?}"),
        }
    }

    #[test]
    fn quoted_unit_fuses_into_a_quantity_literal() {
        let (ast, root) = root("5 'mg'");
        match &ast.get(root).kind {
            Literal { value: LiteralValue::Quantity { unit, .. } } => {
                assert_eq!(unit.as_deref(), Some("mg"));
            }
            other => panic!("expected Quantity literal, got {other:?}"),
        }
    }

    #[test]
    fn dotted_method_call_is_not_mistaken_for_a_quantity() {
        let (ast, root) = root("4.days()");
        match &ast.get(root).kind {
            Binary { operator, left, right } => {
                assert_eq!(operator, ".");
                assert!(matches!(&ast.get(*left).kind, Literal { value: LiteralValue::Integer(4) }));
                assert!(matches!(&ast.get(*right).kind, Function { .. }));
            }
            other => panic!("expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn is_operator_accepts_a_qualified_type_name() {
        let (ast, root) = root("value is FHIR.Patient");
        match &ast.get(root).kind {
            Binary { operator, right, .. } => {
                assert_eq!(operator, "is");
                assert!(matches!(&ast.get(*right).kind, Identifier { name } if name == "FHIR.Patient"));
            }
            other => panic!("expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn postfix_index_wraps_its_target() {
        let (ast, root) = root("name[0]");
        match &ast.get(root).kind {
            Index { target, index } => {
                assert!(matches!(&ast.get(*target).kind, Identifier { name } if name == "name"));
                assert!(matches!(&ast.get(*index).kind, Literal { value: LiteralValue::Integer(0) }));
            }
            other => panic!("expected Index, got {other:?}"),
        }
    }

    #[test]
    fn collection_literal_parses_its_elements() {
        let (ast, root) = root("{1, 2, 3}");
        match &ast.get(root).kind {
            Collection { elements } => assert_eq!(elements.len(), 3),
            other => panic!("expected Collection, got {other:?}"),
        }
    }

    #[test]
    fn collection_literal_rejects_a_trailing_comma() {
        let registry = registry();
        assert!(parse("{1, 2,}", &registry).is_err());
    }

    #[test]
    fn function_call_with_a_lambda_style_argument() {
        let (ast, root) = root("name.where(use = 'official')");
        match &ast.get(root).kind {
            Binary { operator, right, .. } => {
                assert_eq!(operator, ".");
                match &ast.get(*right).kind {
                    Function { name, arguments } => {
                        assert!(matches!(&ast.get(*name).kind, Identifier { name } if name == "where"));
                        assert_eq!(arguments.len(), 1);
                    }
                    other => panic!("expected Function, got {other:?}"),
                }
            }
            other => panic!("expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn keyword_string_function_is_callable_after_a_dot() {
        let (ast, root) = root("name.contains('a')");
        match &ast.get(root).kind {
            Binary { right, .. } => {
                assert!(matches!(&ast.get(*right).kind, Function { .. }));
            }
            other => panic!("expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn special_and_environment_variables_parse() {
        let (ast, root) = root("$this");
        assert!(matches!(&ast.get(root).kind, Variable { name, prefix: VariablePrefix::Dollar } if name == "this"));

        let (ast, root) = root("%resource");
        assert!(matches!(&ast.get(root).kind, Variable { name, prefix: VariablePrefix::Percent } if name == "resource"));
    }

    #[test]
    fn lsp_mode_synthesizes_a_cursor_node_after_a_dot() {
        let registry = registry();
        let source = "Patient.";
        let outcome = parse_lsp(source, &registry, Some(source.len() as u32));
        let root = outcome.ast.root.unwrap();
        match &outcome.ast.get(root).kind {
            Binary { right, .. } => {
                assert!(matches!(&outcome.ast.get(*right).kind, Cursor { context: CursorContext::Identifier }));
            }
            other => panic!("expected Binary, got {other:?}"),
        }
    }

    #[test]
    fn lsp_mode_recovers_from_a_syntax_error() {
        let registry = registry();
        let outcome = parse_lsp("name.where(, true)", &registry, None);
        assert!(!outcome.errors.is_empty());
        assert!(outcome.ast.root.is_some());
    }

    #[test]
    fn standard_mode_rejects_trailing_tokens() {
        let registry = registry();
        assert!(parse("1 2", &registry).is_err());
    }
}
