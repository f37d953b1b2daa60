//! Core types shared by every crate in the FHIRPath engine: the unified
//! error taxonomy (spec.md §7) and source position/span primitives
//! (spec.md §3.1) used by tokens, AST nodes and diagnostics alike.

pub mod error;
pub mod span;

pub use error::{FhirPathError, Result};
pub use span::{Position, Span};
