//! Lexer and Pratt parser for FHIRPath expressions (spec.md §4.2, §4.3).
//!
//! [`lexer::Lexer`] turns source text into a flat [`Token`] stream;
//! [`parser::parse`]/[`parser::parse_lsp`] turn that stream into an
//! [`octofhir_fhirpath_ast::Ast`], consulting a `Registry` for operator
//! precedence so the grammar itself never hard-codes it.

pub mod lexer;
pub mod parser;
pub mod token;

pub use lexer::Lexer;
pub use parser::{parse, parse_lsp, ParseOutcome, ParserMode};
pub use token::{EnvVarForm, KeywordOperator, Token, TokenKind};
