//! The FHIRPath AST (spec.md §3.2): an arena of `Node`s addressed by
//! `NodeId`, with `Cursor*` node kinds for editor/LSP-mode parses and
//! `Error` nodes for parser recovery (spec.md §4.3.2).

pub mod node;

pub use node::{
    Ast, CursorContext, Indexes, LiteralValue, Node, NodeId, NodeKind, UnaryOperator,
    VariablePrefix,
};
