//! Hand-written tokenizer for FHIRPath source text (spec.md §4.2).
//!
//! Positions are 1-based line/column, 0-based byte offset, per spec.md
//! §3.1. Trivia (whitespace + comments) is recorded as a token's leading
//! trivia only when the lexer is constructed in trivia-preserving mode —
//! standard-mode parses skip the allocation entirely.

use std::iter::Peekable;
use std::str::CharIndices;

use octofhir_fhirpath_core::{FhirPathError, Position, Result, Span};
use rust_decimal::Decimal;

use crate::token::{EnvVarForm, Token, TokenKind};

/// Calendar-unit words recognised as a quantity's bare (non-quoted) unit,
/// e.g. `4 days`. Kept as a lookup the parser consults after a numeric
/// literal, not as dedicated tokens (spec.md §3.5).
pub const CALENDAR_UNIT_WORDS: &[&str] = &[
    "year", "years", "month", "months", "week", "weeks", "day", "days", "hour", "hours", "minute",
    "minutes", "second", "seconds", "millisecond", "milliseconds",
];

pub struct Lexer<'a> {
    source: &'a str,
    chars: Peekable<CharIndices<'a>>,
    offset: u32,
    line: u32,
    column: u32,
    trivia_preserving: bool,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self::with_trivia(source, false)
    }

    pub fn with_trivia(source: &'a str, trivia_preserving: bool) -> Self {
        Self {
            source,
            chars: source.char_indices().peekable(),
            offset: 0,
            line: 1,
            column: 1,
            trivia_preserving,
        }
    }

    fn position(&self) -> Position {
        Position::new(self.line, self.column, self.offset)
    }

    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|&(_, c)| c)
    }

    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.clone().nth(ahead).map(|(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let (_, c) = self.chars.next()?;
        self.offset += c.len_utf8() as u32;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn eat_while(&mut self, mut pred: impl FnMut(char) -> bool) -> String {
        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            if !pred(c) {
                break;
            }
            s.push(c);
            self.bump();
        }
        s
    }

    /// Consumes whitespace and `//`/`/* */` comments, returning the raw
    /// trivia text (empty if none was consumed).
    fn skip_trivia(&mut self) -> String {
        let mut trivia = String::new();
        loop {
            match self.peek_char() {
                Some(c) if c.is_whitespace() => {
                    trivia.push(c);
                    self.bump();
                }
                Some('/') if self.peek_at(1) == Some('/') => {
                    trivia.push_str("//");
                    self.bump();
                    self.bump();
                    while let Some(c) = self.peek_char() {
                        if c == '\n' {
                            break;
                        }
                        trivia.push(c);
                        self.bump();
                    }
                }
                Some('/') if self.peek_at(1) == Some('*') => {
                    trivia.push_str("/*");
                    self.bump();
                    self.bump();
                    loop {
                        match self.peek_char() {
                            None => break,
                            Some('*') if self.peek_at(1) == Some('/') => {
                                trivia.push_str("*/");
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(c) => {
                                trivia.push(c);
                                self.bump();
                            }
                        }
                    }
                }
                _ => break,
            }
        }
        trivia
    }

    /// Tokenizes the whole input, stopping (inclusively) at a trailing
    /// `Eof` token.
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            let tok = self.next_token()?;
            let is_eof = tok.is_eof();
            tokens.push(tok);
            if is_eof {
                break;
            }
        }
        Ok(tokens)
    }

    pub fn next_token(&mut self) -> Result<Token> {
        let trivia = self.skip_trivia();
        let start = self.position();

        let Some(c) = self.peek_char() else {
            let mut tok = Token::new(TokenKind::Eof, Span::empty_at(start));
            if self.trivia_preserving && !trivia.is_empty() {
                tok.leading_trivia = Some(trivia);
            }
            return Ok(tok);
        };

        let mut kind = match c {
            '0'..='9' => self.lex_number()?,
            '\'' | '"' => self.lex_string(c)?,
            '@' => self.lex_datetime()?,
            '`' => self.lex_delimited_identifier()?,
            '$' => self.lex_special_identifier(),
            '%' => self.lex_env_var()?,
            c if is_ident_start(c) => self.lex_identifier(),
            _ => self.lex_symbol()?,
        };
        let end = self.position();
        let span = Span::new(start, end);

        // Fuse an immediately-following quoted or bare-word unit onto a
        // numeric literal into a quantity (spec.md §3.5). The unit must
        // directly follow with only trivia (no operator) between them;
        // since we've already consumed the number, we just peek ahead.
        if matches!(kind, TokenKind::Integer(_) | TokenKind::Decimal(_)) {
            kind = self.try_fuse_quantity_unit(kind)?;
        }

        let mut token = Token::new(kind, span);
        if self.trivia_preserving && !trivia.is_empty() {
            token.leading_trivia = Some(trivia);
        }
        Ok(token)
    }

    fn try_fuse_quantity_unit(&mut self, _number_kind: TokenKind) -> Result<TokenKind> {
        // Quantity fusion happens in the parser's literal parselet, which
        // has lookahead over full tokens (string vs. bare unit word) and
        // can tell a genuine unit apart from, e.g., `4.days()` navigation.
        // The lexer only hands back the plain numeric token here.
        Ok(_number_kind)
    }

    fn lex_number(&mut self) -> Result<TokenKind> {
        let mut text = self.eat_while(|c| c.is_ascii_digit());
        let mut is_decimal = false;
        if self.peek_char() == Some('.') && self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) {
            is_decimal = true;
            text.push('.');
            self.bump();
            text.push_str(&self.eat_while(|c| c.is_ascii_digit()));
        }
        if is_decimal {
            let value: Decimal = text
                .parse()
                .map_err(|_| FhirPathError::unexpected_char('.', Span::empty_at(self.position())))?;
            Ok(TokenKind::Decimal(value))
        } else {
            match text.parse::<i64>() {
                Ok(v) => Ok(TokenKind::Integer(v)),
                Err(_) => {
                    let value: Decimal = text
                        .parse()
                        .map_err(|_| FhirPathError::unexpected_char('0', Span::empty_at(self.position())))?;
                    Ok(TokenKind::Decimal(value))
                }
            }
        }
    }

    fn lex_string(&mut self, quote: char) -> Result<TokenKind> {
        let start = self.position();
        self.bump(); // opening quote
        let mut s = String::new();
        loop {
            match self.peek_char() {
                None => return Err(FhirPathError::unterminated_string(Span::new(start, self.position()))),
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    s.push(self.lex_escape(start)?);
                }
                Some(c) => {
                    s.push(c);
                    self.bump();
                }
            }
        }
        Ok(TokenKind::String(s))
    }

    fn lex_escape(&mut self, string_start: Position) -> Result<char> {
        let esc_pos = self.position();
        let Some(c) = self.bump() else {
            return Err(FhirPathError::unterminated_string(Span::new(string_start, esc_pos)));
        };
        match c {
            'n' => Ok('\n'),
            't' => Ok('\t'),
            'r' => Ok('\r'),
            '\\' => Ok('\\'),
            '\'' => Ok('\''),
            '"' => Ok('"'),
            '`' => Ok('`'),
            'f' => Ok('\u{000C}'),
            '/' => Ok('/'),
            'u' => {
                let hex: String = (0..4).filter_map(|_| self.bump()).collect();
                if hex.len() != 4 {
                    return Err(FhirPathError::invalid_escape('u', Span::new(esc_pos, self.position())));
                }
                u32::from_str_radix(&hex, 16)
                    .ok()
                    .and_then(char::from_u32)
                    .ok_or_else(|| FhirPathError::invalid_escape('u', Span::new(esc_pos, self.position())))
            }
            other => Err(FhirPathError::invalid_escape(other, Span::new(esc_pos, self.position()))),
        }
    }

    /// `@YYYY[-MM[-DD]][Thh:mm[:ss[.fff]]][Z|±hh:mm]` or `@Thh:mm[...]`.
    fn lex_datetime(&mut self) -> Result<TokenKind> {
        let start = self.position();
        self.bump(); // '@'
        let mut text = String::from("@");

        if self.peek_char() == Some('T') {
            text.push('T');
            self.bump();
            text.push_str(&self.lex_time_body());
            return Ok(TokenKind::Time(text));
        }

        let year = self.eat_while(|c| c.is_ascii_digit());
        if year.len() != 4 {
            return Err(FhirPathError::invalid_datetime(format!("{text}{year}"), Span::new(start, self.position())));
        }
        text.push_str(&year);

        let mut has_date_parts = false;
        if self.peek_char() == Some('-') {
            has_date_parts = true;
            text.push('-');
            self.bump();
            let month = self.eat_while(|c| c.is_ascii_digit());
            if month.len() != 2 {
                return Err(FhirPathError::invalid_datetime(text, Span::new(start, self.position())));
            }
            text.push_str(&month);

            if self.peek_char() == Some('-') {
                text.push('-');
                self.bump();
                let day = self.eat_while(|c| c.is_ascii_digit());
                if day.len() != 2 {
                    return Err(FhirPathError::invalid_datetime(text, Span::new(start, self.position())));
                }
                text.push_str(&day);
            }
        }
        let _ = has_date_parts;

        if self.peek_char() == Some('T') {
            text.push('T');
            self.bump();
            text.push_str(&self.lex_time_body());
            return Ok(TokenKind::DateTime(text));
        }

        Ok(TokenKind::Date(text))
    }

    /// Consumes `hh:mm[:ss[.fff]][Z|±hh:mm]` — the part after the `T`.
    fn lex_time_body(&mut self) -> String {
        let mut text = String::new();
        text.push_str(&self.eat_while(|c| c.is_ascii_digit())); // hh
        if self.peek_char() == Some(':') {
            text.push(':');
            self.bump();
            text.push_str(&self.eat_while(|c| c.is_ascii_digit())); // mm
            if self.peek_char() == Some(':') {
                text.push(':');
                self.bump();
                text.push_str(&self.eat_while(|c| c.is_ascii_digit())); // ss
                if self.peek_char() == Some('.') {
                    text.push('.');
                    self.bump();
                    text.push_str(&self.eat_while(|c| c.is_ascii_digit())); // fff
                }
            }
        }
        match self.peek_char() {
            Some('Z') => {
                text.push('Z');
                self.bump();
            }
            Some(sign @ ('+' | '-')) => {
                text.push(sign);
                self.bump();
                text.push_str(&self.eat_while(|c| c.is_ascii_digit()));
                if self.peek_char() == Some(':') {
                    text.push(':');
                    self.bump();
                    text.push_str(&self.eat_while(|c| c.is_ascii_digit()));
                }
            }
            _ => {}
        }
        text
    }

    fn lex_delimited_identifier(&mut self) -> Result<TokenKind> {
        let start = self.position();
        self.bump(); // opening backtick
        let mut s = String::new();
        loop {
            match self.peek_char() {
                None => return Err(FhirPathError::unterminated_delimited_ident(Span::new(start, self.position()))),
                Some('`') => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    self.bump();
                    s.push(self.lex_escape(start)?);
                }
                Some(c) => {
                    s.push(c);
                    self.bump();
                }
            }
        }
        Ok(TokenKind::Identifier { name: s, was_delimited: true })
    }

    fn lex_identifier(&mut self) -> TokenKind {
        let text = self.eat_while(is_ident_continue);
        match text.as_str() {
            "true" => TokenKind::Boolean(true),
            "false" => TokenKind::Boolean(false),
            _ => match KeywordOperatorLookup::lookup(&text) {
                Some(op) => TokenKind::Keyword(op),
                None => TokenKind::Identifier { name: text, was_delimited: false },
            },
        }
    }

    fn lex_special_identifier(&mut self) -> TokenKind {
        self.bump(); // '$'
        if self.peek_char().is_some_and(is_ident_start) {
            let name = self.eat_while(is_ident_continue);
            TokenKind::SpecialIdentifier(Some(name))
        } else {
            TokenKind::SpecialIdentifier(None)
        }
    }

    fn lex_env_var(&mut self) -> Result<TokenKind> {
        let start = self.position();
        self.bump(); // '%'
        match self.peek_char() {
            Some('`') => {
                self.bump();
                let mut s = String::new();
                loop {
                    match self.peek_char() {
                        None => return Err(FhirPathError::invalid_env_var(Span::new(start, self.position()))),
                        Some('`') => {
                            self.bump();
                            break;
                        }
                        Some(c) => {
                            s.push(c);
                            self.bump();
                        }
                    }
                }
                Ok(TokenKind::EnvVar { name: s, form: EnvVarForm::Delimited })
            }
            Some('\'') => {
                self.bump();
                let mut s = String::new();
                loop {
                    match self.peek_char() {
                        None => return Err(FhirPathError::invalid_env_var(Span::new(start, self.position()))),
                        Some('\'') => {
                            self.bump();
                            break;
                        }
                        Some(c) => {
                            s.push(c);
                            self.bump();
                        }
                    }
                }
                Ok(TokenKind::EnvVar { name: s, form: EnvVarForm::Legacy })
            }
            Some(c) if is_ident_start(c) => {
                let name = self.eat_while(is_ident_continue);
                Ok(TokenKind::EnvVar { name, form: EnvVarForm::Bare })
            }
            _ => Err(FhirPathError::invalid_env_var(Span::new(start, self.position()))),
        }
    }

    fn lex_symbol(&mut self) -> Result<TokenKind> {
        let start = self.position();
        let c = self.bump().expect("checked by caller");
        let kind = match c {
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '&' => TokenKind::Ampersand,
            '|' => TokenKind::Pipe,
            '.' => TokenKind::Dot,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            ';' => TokenKind::Semicolon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '=' => TokenKind::Eq,
            '~' => TokenKind::Equiv,
            '<' => {
                if self.peek_char() == Some('=') {
                    self.bump();
                    TokenKind::Le
                } else {
                    TokenKind::Lt
                }
            }
            '>' => {
                if self.peek_char() == Some('=') {
                    self.bump();
                    TokenKind::Ge
                } else {
                    TokenKind::Gt
                }
            }
            '!' => match self.peek_char() {
                Some('=') => {
                    self.bump();
                    TokenKind::NotEq
                }
                Some('~') => {
                    self.bump();
                    TokenKind::NotEquiv
                }
                _ => return Err(FhirPathError::unexpected_char('!', Span::new(start, self.position()))),
            },
            other => return Err(FhirPathError::unexpected_char(other, Span::new(start, self.position()))),
        };
        Ok(kind)
    }
}

/// Small dispatch so `lex_identifier` doesn't need `KeywordOperator` to be
/// `pub(crate)`-reachable from a free function; kept as a unit struct to
/// mirror the registry's dispatch-table style rather than a raw match.
struct KeywordOperatorLookup;

impl KeywordOperatorLookup {
    fn lookup(word: &str) -> Option<crate::token::KeywordOperator> {
        crate::token::KeywordOperator::from_word(word)
    }
}

fn is_ident_start(c: char) -> bool {
    c == '_' || unicode_xid::UnicodeXID::is_xid_start(c)
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || unicode_xid::UnicodeXID::is_xid_continue(c)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Lexer::new(source)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn lexes_simple_navigation() {
        let k = kinds("Patient.name.given");
        assert_eq!(
            k,
            vec![
                TokenKind::Identifier { name: "Patient".into(), was_delimited: false },
                TokenKind::Dot,
                TokenKind::Identifier { name: "name".into(), was_delimited: false },
                TokenKind::Dot,
                TokenKind::Identifier { name: "given".into(), was_delimited: false },
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn keyword_operators_are_recognised_case_insensitively() {
        assert_eq!(kinds("a AND b")[1], TokenKind::Keyword(crate::token::KeywordOperator::And));
        assert_eq!(kinds("a div b")[1], TokenKind::Keyword(crate::token::KeywordOperator::Div));
    }

    #[test]
    fn function_names_are_plain_identifiers_not_keywords() {
        let k = kinds("name.where(use = 'official')");
        assert_eq!(k[2], TokenKind::Identifier { name: "where".into(), was_delimited: false });
    }

    #[test]
    fn backtick_delimited_identifier_escapes_a_keyword() {
        let k = kinds("`div`");
        assert_eq!(k[0], TokenKind::Identifier { name: "div".into(), was_delimited: true });
    }

    #[test]
    fn string_escapes_decode() {
        let k = kinds(r#"'a\nbA'"#);
        assert_eq!(k[0], TokenKind::String("a\nbA".into()));
    }

    #[test]
    fn unterminated_string_is_an_error() {
        assert!(Lexer::new("'abc").tokenize().is_err());
    }

    #[test]
    fn partial_datetime_literal_is_an_error() {
        assert!(Lexer::new("@20").tokenize().is_err());
    }

    #[test]
    fn full_datetime_literal_preserves_source_form() {
        let k = kinds("@2023-01-01T12:30:00.500Z");
        assert_eq!(k[0], TokenKind::DateTime("@2023-01-01T12:30:00.500Z".into()));
    }

    #[test]
    fn environment_variable_forms() {
        let k = kinds("%resource + %`us-zip` + %'vs-1'");
        assert_eq!(k[0], TokenKind::EnvVar { name: "resource".into(), form: EnvVarForm::Bare });
        assert_eq!(k[2], TokenKind::EnvVar { name: "us-zip".into(), form: EnvVarForm::Delimited });
        assert_eq!(k[4], TokenKind::EnvVar { name: "vs-1".into(), form: EnvVarForm::Legacy });
    }

    #[test]
    fn special_identifier_bare_dollar_is_allowed() {
        let k = kinds("$this + $");
        assert_eq!(k[0], TokenKind::SpecialIdentifier(Some("this".into())));
        assert_eq!(k[2], TokenKind::SpecialIdentifier(None));
    }

    #[test]
    fn comments_are_skipped_and_optionally_preserved() {
        assert_eq!(kinds("1 // comment\n+ 2")[0], TokenKind::Integer(1));
        let tokens = Lexer::with_trivia("1 /* c */+ 2", true).tokenize().unwrap();
        assert_eq!(tokens[1].leading_trivia.as_deref(), Some("/* c */"));
    }

    #[test]
    fn decimal_and_integer_numbers() {
        assert_eq!(kinds("42")[0], TokenKind::Integer(42));
        assert_eq!(kinds("3.14")[0], TokenKind::Decimal("3.14".parse().unwrap()));
    }
}
