//! LSP-compatible diagnostics produced by the analyzer (spec.md §4.4.4, §6.4).

use octofhir_fhirpath_core::Span;
use serde::{Deserialize, Serialize};

/// Diagnostic severity, numbered to match the LSP `DiagnosticSeverity` scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Severity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

/// The closed code taxonomy from spec.md §4.4.4.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCode {
    UnknownVariable,
    UnknownUserVariable,
    UnknownFunction,
    UnknownProperty,
    TooFewArgs,
    TooManyArgs,
    ArgumentTypeMismatch,
    InputTypeMismatch,
    TypeMismatch,
    InvalidOperandType,
    SingletonRequired,
    ModelProviderRequired,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownVariable => "UNKNOWN_VARIABLE",
            Self::UnknownUserVariable => "UNKNOWN_USER_VARIABLE",
            Self::UnknownFunction => "UNKNOWN_FUNCTION",
            Self::UnknownProperty => "UNKNOWN_PROPERTY",
            Self::TooFewArgs => "TOO_FEW_ARGS",
            Self::TooManyArgs => "TOO_MANY_ARGS",
            Self::ArgumentTypeMismatch => "ARGUMENT_TYPE_MISMATCH",
            Self::InputTypeMismatch => "INPUT_TYPE_MISMATCH",
            Self::TypeMismatch => "TYPE_MISMATCH",
            Self::InvalidOperandType => "INVALID_OPERAND_TYPE",
            Self::SingletonRequired => "SINGLETON_REQUIRED",
            Self::ModelProviderRequired => "MODEL_PROVIDER_REQUIRED",
        }
    }
}

impl std::fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The 0-based LSP position/range types, reused from `lsp-types` rather than
/// redefined, converted from the 1-based lexer `Position` at this boundary
/// (spec.md §6.4).
pub type LspPosition = lsp_types::Position;
pub type LspRange = lsp_types::Range;

pub fn range_from_span(span: Span) -> LspRange {
    LspRange {
        start: LspPosition {
            line: span.start.line.saturating_sub(1),
            character: span.start.column.saturating_sub(1),
        },
        end: LspPosition {
            line: span.end.line.saturating_sub(1),
            character: span.end.column.saturating_sub(1),
        },
    }
}

/// `source` is always `"fhirpath-analyzer"` per spec.md §4.4.4.
pub const DIAGNOSTIC_SOURCE: &str = "fhirpath-analyzer";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub range: LspRange,
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    pub source: &'static str,
}

impl Diagnostic {
    pub fn new(span: Span, severity: Severity, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            range: range_from_span(span),
            severity,
            code,
            message: message.into(),
            source: DIAGNOSTIC_SOURCE,
        }
    }

    pub fn error(span: Span, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(span, Severity::Error, code, message)
    }

    pub fn warning(span: Span, code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self::new(span, Severity::Warning, code, message)
    }
}

#[cfg(feature = "terminal")]
impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use colored::Colorize;
        let label = match self.severity {
            Severity::Error => "error".red().bold(),
            Severity::Warning => "warning".yellow().bold(),
            Severity::Information => "info".blue().bold(),
            Severity::Hint => "hint".normal(),
        };
        write!(
            f,
            "{label} [{}] {}:{}: {}",
            self.code,
            self.range.start.line + 1,
            self.range.start.character + 1,
            self.message
        )
    }
}

#[cfg(not(feature = "terminal"))]
impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[{}] {}:{}: {}",
            self.code,
            self.range.start.line + 1,
            self.range.start.character + 1,
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_core::Position;

    #[test]
    fn span_converts_to_zero_based_lsp_range() {
        let span = Span::new(Position::new(1, 1, 0), Position::new(1, 5, 4));
        let range: LspRange = range_from_span(span);
        assert_eq!(range.start.line, 0);
        assert_eq!(range.start.character, 0);
        assert_eq!(range.end.character, 4);
    }

    #[test]
    fn diagnostic_carries_fixed_source() {
        let span = Span::new(Position::start(), Position::start());
        let diag = Diagnostic::error(span, DiagnosticCode::UnknownProperty, "no such property");
        assert_eq!(diag.source, "fhirpath-analyzer");
        assert_eq!(diag.code.as_str(), "UNKNOWN_PROPERTY");
    }
}
