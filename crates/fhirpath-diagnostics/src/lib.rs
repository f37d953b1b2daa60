//! LSP-compatible diagnostic records emitted by the analyzer (spec.md §4.4.4).
//!
//! This crate deliberately contains no transport: it only shapes diagnostic
//! data the way an LSP server would want it, re-using `lsp-types` for the
//! `Position`/`Range` primitives rather than redefining them.

pub mod diagnostic;

pub use diagnostic::{
    range_from_span, Diagnostic, DiagnosticCode, LspPosition, LspRange, Severity,
    DIAGNOSTIC_SOURCE,
};
