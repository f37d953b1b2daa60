//! Operator and function registry for the FHIRPath engine (spec.md §4.1,
//! §9): a dispatch-table registry consulted by the parser (operator
//! precedence/associativity), the analyzer (function signatures) and the
//! interpreter (both tables, for dispatch).

pub mod builtins;
pub mod function;
pub mod operation;
pub mod registry;

pub use function::{ArgumentArity, CardinalityRequirement, FunctionCategory, FunctionSignature};
pub use operation::{check_arity, FhirPathOperation, FhirPathOperator, LambdaEvaluator};
pub use registry::{Associativity, Registry};
