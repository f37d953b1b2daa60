//! Token shapes produced by the lexer (spec.md §3.1, §4.2).
//!
//! Only the true operator keywords (`and or xor implies div mod in contains
//! is as`) and the boolean literals get dedicated token kinds; every other
//! bare word — function names like `where`/`select`/`first` included —
//! lexes as a plain [`TokenKind::Identifier`]. The parser decides, per
//! occurrence, whether an identifier names a property, a type, or (with a
//! following `(`) a function call. This keeps adding a built-in function to
//! the registry a zero-lexer-change operation.

use octofhir_fhirpath_core::Span;
use rust_decimal::Decimal;

/// The ten operator keywords that do get a dedicated token kind (spec.md
/// §4.1 precedence table; matched case-insensitively per that section).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeywordOperator {
    And,
    Or,
    Xor,
    Implies,
    Div,
    Mod,
    In,
    Contains,
    Is,
    As,
}

impl KeywordOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Xor => "xor",
            Self::Implies => "implies",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::In => "in",
            Self::Contains => "contains",
            Self::Is => "is",
            Self::As => "as",
        }
    }

    /// Case-insensitive lookup (spec.md §4.1: "Keyword operators … are
    /// matched case-insensitively").
    pub fn from_word(word: &str) -> Option<Self> {
        match word.to_ascii_lowercase().as_str() {
            "and" => Some(Self::And),
            "or" => Some(Self::Or),
            "xor" => Some(Self::Xor),
            "implies" => Some(Self::Implies),
            "div" => Some(Self::Div),
            "mod" => Some(Self::Mod),
            "in" => Some(Self::In),
            "contains" => Some(Self::Contains),
            "is" => Some(Self::Is),
            "as" => Some(Self::As),
            _ => None,
        }
    }
}

/// Prefix used on a `%`-variable reference (spec.md §4.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnvVarForm {
    /// `%ident`
    Bare,
    /// `` %`ident` ``
    Delimited,
    /// `%'ident'` — legacy form, still accepted.
    Legacy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Integer(i64),
    Decimal(Decimal),
    String(String),
    /// Literal form kept including the `@` prefix, as spec.md §3.1 requires.
    Date(String),
    DateTime(String),
    Time(String),
    Boolean(bool),
    /// Any bare word that isn't one of the ten operator keywords or a
    /// boolean literal. Case and backtick-delimiting are both folded in
    /// here; `was_delimited` lets the parser tell `` `div` `` (an
    /// identifier) apart from `div` (the keyword).
    Identifier { name: String, was_delimited: bool },
    /// `$`, `$this`, `$index`, `$total`, or any other `$ident`.
    SpecialIdentifier(Option<String>),
    EnvVar { name: String, form: EnvVarForm },
    Keyword(KeywordOperator),

    Plus,
    Minus,
    Star,
    Slash,
    Ampersand,
    Eq,
    NotEq,
    Equiv,
    NotEquiv,
    Lt,
    Le,
    Gt,
    Ge,
    Pipe,
    Dot,
    Comma,
    Colon,
    Semicolon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,

    Eof,
}

impl TokenKind {
    pub fn describe(&self) -> String {
        match self {
            Self::Integer(v) => v.to_string(),
            Self::Decimal(v) => v.to_string(),
            Self::String(s) => format!("'{s}'"),
            Self::Date(s) | Self::DateTime(s) | Self::Time(s) => s.clone(),
            Self::Boolean(b) => b.to_string(),
            Self::Identifier { name, .. } => name.clone(),
            Self::SpecialIdentifier(name) => format!("${}", name.as_deref().unwrap_or("")),
            Self::EnvVar { name, .. } => format!("%{name}"),
            Self::Keyword(k) => k.as_str().to_string(),
            Self::Plus => "+".into(),
            Self::Minus => "-".into(),
            Self::Star => "*".into(),
            Self::Slash => "/".into(),
            Self::Ampersand => "&".into(),
            Self::Eq => "=".into(),
            Self::NotEq => "!=".into(),
            Self::Equiv => "~".into(),
            Self::NotEquiv => "!~".into(),
            Self::Lt => "<".into(),
            Self::Le => "<=".into(),
            Self::Gt => ">".into(),
            Self::Ge => ">=".into(),
            Self::Pipe => "|".into(),
            Self::Dot => ".".into(),
            Self::Comma => ",".into(),
            Self::Colon => ":".into(),
            Self::Semicolon => ";".into(),
            Self::LParen => "(".into(),
            Self::RParen => ")".into(),
            Self::LBracket => "[".into(),
            Self::RBracket => "]".into(),
            Self::LBrace => "{".into(),
            Self::RBrace => "}".into(),
            Self::Eof => "<eof>".into(),
        }
    }
}

/// One lexed token: its kind, its source span, and (trivia-preserving mode
/// only) the whitespace/comment text that preceded it.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
    pub leading_trivia: Option<String>,
}

impl Token {
    pub fn new(kind: TokenKind, span: Span) -> Self {
        Self {
            kind,
            span,
            leading_trivia: None,
        }
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }
}
