//! Static type analysis for FHIRPath expressions (spec.md §4.4).
//!
//! [`analyzer::analyze`] walks a parsed [`octofhir_fhirpath_ast::Ast`],
//! attaching a `TypeInfo` to every node and collecting `Diagnostic`s,
//! consulting an optional `ModelProvider` for FHIR schema-aware navigation.
//! [`context::AnalyzeContext`] is the structural-inheritance type
//! environment threaded through that walk (spec.md §4.7).

pub mod analyzer;
pub mod context;

pub use analyzer::{analyze, AnalyzeOptions, AnalyzeOutcome, CursorAnalysis};
pub use context::AnalyzeContext;

use octofhir_fhirpath_ast::LiteralValue;
use octofhir_fhirpath_model::{TypeInfo, TypeName};

/// The static type of a literal node (spec.md §4.4.1).
pub(crate) fn literal_type(value: &LiteralValue) -> TypeInfo {
    match value {
        LiteralValue::Integer(_) => TypeInfo::singleton(TypeName::Integer),
        LiteralValue::Decimal(_) => TypeInfo::singleton(TypeName::Decimal),
        LiteralValue::String(_) => TypeInfo::singleton(TypeName::String),
        LiteralValue::Boolean(_) => TypeInfo::singleton(TypeName::Boolean),
        LiteralValue::Date(_) => TypeInfo::singleton(TypeName::Date),
        LiteralValue::DateTime(_) => TypeInfo::singleton(TypeName::DateTime),
        LiteralValue::Time(_) => TypeInfo::singleton(TypeName::Time),
        LiteralValue::Quantity { .. } => TypeInfo::singleton(TypeName::Quantity),
    }
}
