//! Error types shared across the FHIRPath engine.
//!
//! One flat `thiserror`-derived enum covers the lexer, parser and
//! interpreter error tiers (spec.md §7); the analyzer never raises through
//! this type — its findings are collected as `Diagnostic`s instead.

use thiserror::Error;

use crate::span::Span;

/// Result type alias used throughout the engine.
pub type Result<T> = std::result::Result<T, FhirPathError>;

/// Unified error type for lexing, parsing and evaluation failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FhirPathError {
    // ---- Lex errors (spec.md §7) ----
    #[error("unexpected character '{ch}' at {span:?}")]
    UnexpectedChar { ch: char, span: Span },

    #[error("unterminated string literal starting at {span:?}")]
    UnterminatedString { span: Span },

    #[error("unterminated delimited identifier starting at {span:?}")]
    UnterminatedDelimitedIdent { span: Span },

    #[error("invalid date/time literal '{text}' at {span:?}")]
    InvalidDatetime { text: String, span: Span },

    #[error("invalid environment variable reference at {span:?}")]
    InvalidEnvVar { span: Span },

    #[error("invalid escape sequence '\\{ch}' at {span:?}")]
    InvalidEscape { ch: char, span: Span },

    // ---- Parse errors (spec.md §7) ----
    #[error("expected an expression at {span:?}")]
    ExpectedExpression { span: Span },

    #[error("expected an identifier at {span:?}")]
    ExpectedIdentifier { span: Span },

    #[error("expected ')' at {span:?}")]
    ExpectedCloseParen { span: Span },

    #[error("expected ']' at {span:?}")]
    ExpectedCloseBracket { span: Span },

    #[error("expected a type name at {span:?}")]
    ExpectedTypeName { span: Span },

    #[error("trailing comma not permitted at {span:?}")]
    TrailingComma { span: Span },

    #[error("unexpected token '{text}' at {span:?}")]
    UnexpectedToken { text: String, span: Span },

    // ---- Runtime errors (spec.md §4.5, §7) ----
    #[error("argument type mismatch in '{function_name}': {message}")]
    ArgumentTypeMismatch {
        function_name: String,
        message: String,
    },

    #[error("'{operation}' requires a singleton receiver")]
    SingletonRequired { operation: String },

    #[error("invalid operand type for operator '{operator}': {left_type} and {right_type}")]
    InvalidOperandType {
        operator: String,
        left_type: String,
        right_type: String,
    },

    #[error("division by zero")]
    DivisionByZero,

    #[error("unknown function: {function_name}")]
    UnknownFunction { function_name: String },

    #[error("unknown operator: '{operator}'")]
    UnknownOperator { operator: String },

    #[error("function '{function_name}' expects {expected} arguments, got {actual}")]
    InvalidArgumentCount {
        function_name: String,
        expected: String,
        actual: usize,
    },

    #[error("index {index} out of bounds for collection of size {size}")]
    IndexOutOfBounds { index: i64, size: usize },

    #[error("conversion error: cannot convert {from} to {to}")]
    ConversionError { from: String, to: String },

    #[error("incompatible units: '{left_unit}' and '{right_unit}'")]
    IncompatibleUnits {
        left_unit: String,
        right_unit: String,
    },

    #[error("invalid type specifier")]
    InvalidTypeSpecifier,

    // ---- Registry errors ----
    #[error("operator precedence {precedence} is out of range [0,255]")]
    PrecedenceOutOfRange { precedence: i32 },

    #[error(
        "cannot re-register operator '{symbol}' with a different precedence or associativity"
    )]
    OperatorRedefinition { symbol: String },

    // ---- Generic ----
    #[error("{message}")]
    Generic { message: String },
}

impl FhirPathError {
    pub fn unexpected_char(ch: char, span: Span) -> Self {
        Self::UnexpectedChar { ch, span }
    }

    pub fn unterminated_string(span: Span) -> Self {
        Self::UnterminatedString { span }
    }

    pub fn unterminated_delimited_ident(span: Span) -> Self {
        Self::UnterminatedDelimitedIdent { span }
    }

    pub fn invalid_datetime(text: impl Into<String>, span: Span) -> Self {
        Self::InvalidDatetime {
            text: text.into(),
            span,
        }
    }

    pub fn invalid_env_var(span: Span) -> Self {
        Self::InvalidEnvVar { span }
    }

    pub fn invalid_escape(ch: char, span: Span) -> Self {
        Self::InvalidEscape { ch, span }
    }

    pub fn expected_expression(span: Span) -> Self {
        Self::ExpectedExpression { span }
    }

    pub fn expected_identifier(span: Span) -> Self {
        Self::ExpectedIdentifier { span }
    }

    pub fn expected_close_paren(span: Span) -> Self {
        Self::ExpectedCloseParen { span }
    }

    pub fn expected_close_bracket(span: Span) -> Self {
        Self::ExpectedCloseBracket { span }
    }

    pub fn expected_type_name(span: Span) -> Self {
        Self::ExpectedTypeName { span }
    }

    pub fn trailing_comma(span: Span) -> Self {
        Self::TrailingComma { span }
    }

    pub fn unexpected_token(text: impl Into<String>, span: Span) -> Self {
        Self::UnexpectedToken {
            text: text.into(),
            span,
        }
    }

    pub fn argument_type_mismatch(
        function_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ArgumentTypeMismatch {
            function_name: function_name.into(),
            message: message.into(),
        }
    }

    pub fn singleton_required(operation: impl Into<String>) -> Self {
        Self::SingletonRequired {
            operation: operation.into(),
        }
    }

    pub fn invalid_operand_type(
        operator: impl Into<String>,
        left_type: impl Into<String>,
        right_type: impl Into<String>,
    ) -> Self {
        Self::InvalidOperandType {
            operator: operator.into(),
            left_type: left_type.into(),
            right_type: right_type.into(),
        }
    }

    pub fn division_by_zero() -> Self {
        Self::DivisionByZero
    }

    pub fn unknown_function(function_name: impl Into<String>) -> Self {
        Self::UnknownFunction {
            function_name: function_name.into(),
        }
    }

    pub fn unknown_operator(operator: impl Into<String>) -> Self {
        Self::UnknownOperator {
            operator: operator.into(),
        }
    }

    pub fn invalid_argument_count(
        function_name: impl Into<String>,
        expected: impl Into<String>,
        actual: usize,
    ) -> Self {
        Self::InvalidArgumentCount {
            function_name: function_name.into(),
            expected: expected.into(),
            actual,
        }
    }

    pub fn index_out_of_bounds(index: i64, size: usize) -> Self {
        Self::IndexOutOfBounds { index, size }
    }

    pub fn conversion_error(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::ConversionError {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn incompatible_units(left_unit: impl Into<String>, right_unit: impl Into<String>) -> Self {
        Self::IncompatibleUnits {
            left_unit: left_unit.into(),
            right_unit: right_unit.into(),
        }
    }

    pub fn invalid_type_specifier() -> Self {
        Self::InvalidTypeSpecifier
    }

    pub fn precedence_out_of_range(precedence: i32) -> Self {
        Self::PrecedenceOutOfRange { precedence }
    }

    pub fn operator_redefinition(symbol: impl Into<String>) -> Self {
        Self::OperatorRedefinition {
            symbol: symbol.into(),
        }
    }

    pub fn generic(message: impl Into<String>) -> Self {
        Self::Generic {
            message: message.into(),
        }
    }

    /// Whether this error belongs to the lex/parse tier (fatal in standard
    /// mode, recoverable in LSP mode — spec.md §7 propagation policy).
    pub fn is_syntax_error(&self) -> bool {
        matches!(
            self,
            Self::UnexpectedChar { .. }
                | Self::UnterminatedString { .. }
                | Self::UnterminatedDelimitedIdent { .. }
                | Self::InvalidDatetime { .. }
                | Self::InvalidEnvVar { .. }
                | Self::InvalidEscape { .. }
                | Self::ExpectedExpression { .. }
                | Self::ExpectedIdentifier { .. }
                | Self::ExpectedCloseParen { .. }
                | Self::ExpectedCloseBracket { .. }
                | Self::ExpectedTypeName { .. }
                | Self::TrailingComma { .. }
                | Self::UnexpectedToken { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn syntax_errors_are_classified() {
        let span = Span::empty_at(crate::span::Position::start());
        assert!(FhirPathError::expected_expression(span).is_syntax_error());
        assert!(!FhirPathError::division_by_zero().is_syntax_error());
    }

    #[test]
    fn constructors_roundtrip_fields() {
        let err = FhirPathError::invalid_argument_count("substring", "1-2", 3);
        match err {
            FhirPathError::InvalidArgumentCount {
                function_name,
                expected,
                actual,
            } => {
                assert_eq!(function_name, "substring");
                assert_eq!(expected, "1-2");
                assert_eq!(actual, 3);
            }
            _ => panic!("wrong variant"),
        }
    }
}
