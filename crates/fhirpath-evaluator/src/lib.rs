//! The runtime half of the engine (spec.md §4.5, §4.7): [`interpreter`]
//! walks an `Ast` and produces `Collection`s; [`context`] is the
//! structural-inheritance environment it threads through that walk.
//!
//! Kept deliberately synchronous (spec.md §5: "the core is single-threaded
//! ... synchronous" — only the analyzer's `ModelProvider` lookups are
//! async).

pub mod context;
pub mod interpreter;

pub use context::RuntimeContext;
pub use interpreter::{evaluate, Interpreter};
