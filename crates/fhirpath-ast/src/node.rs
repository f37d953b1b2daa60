//! The FHIRPath AST (spec.md §3.2), implemented as an arena: a single
//! `Vec<Node>` per parse with index-based parent/child links, per spec.md
//! §9 "Cyclic AST ↔ parent" design note. This sidesteps ownership cycles
//! while still supporting LSP-mode parent pointers and unique node IDs.

use octofhir_fhirpath_core::Span;
use octofhir_fhirpath_model::TypeInfo;
use rustc_hash::FxHashMap;

/// Index into an `Ast`'s node arena. Stable for the lifetime of one parse;
/// the interpreter and analyzer never mutate the tree shape, only attach
/// `type_info` (spec.md §3.7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariablePrefix {
    /// `$this`, `$index`, `$total`, bare `$`.
    Dollar,
    /// `%foo`, `` %`foo` ``.
    Percent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Plus,
    Minus,
}

/// What a synthesized `Cursor*` node represents (spec.md §3.2, §4.3.1).
/// Only ever produced in LSP/cursor-aware parses.
#[derive(Debug, Clone, PartialEq)]
pub enum CursorContext {
    /// Cursor immediately after `.` — completing a property/function name.
    Identifier,
    /// Cursor inside `(` or after `,` in an argument list.
    Argument { argument_index: usize },
    /// Cursor after `is`/`as`.
    Type,
    /// Cursor inside `[`.
    Index,
    /// Cursor in an operator position between two complete expressions.
    Operator,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LiteralValue {
    Integer(i64),
    Decimal(rust_decimal::Decimal),
    String(String),
    Boolean(bool),
    /// Literal form including the `@` prefix is preserved in `raw`/source
    /// slice; here we keep only the parsed text for the lexeme.
    Date(String),
    DateTime(String),
    Time(String),
    Quantity { value: rust_decimal::Decimal, unit: Option<String> },
}

/// One AST node kind (spec.md §3.2 node-kind table).
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Literal {
        value: LiteralValue,
    },
    /// Property/type reference. `TypeOrIdentifier` resolution (spec.md
    /// §3.2 note) happens in the analyzer, not the parser: the parser
    /// always emits `Identifier` and the analyzer decides whether a given
    /// occurrence names a type or a property.
    Identifier {
        name: String,
    },
    Variable {
        name: String,
        prefix: VariablePrefix,
    },
    /// Covers `.` (navigation), arithmetic, comparison, logical, union `|`,
    /// membership `in`/`contains`, and type `is`/`as` (spec.md §3.2).
    Binary {
        operator: String,
        left: NodeId,
        right: NodeId,
    },
    Unary {
        operator: UnaryOperator,
        operand: NodeId,
    },
    /// Invoked via `.`; `name` is an `Identifier` node. Arguments are
    /// evaluated lazily per function semantics (spec.md §3.2, §4.5).
    Function {
        name: NodeId,
        arguments: Vec<NodeId>,
    },
    Index {
        target: NodeId,
        index: NodeId,
    },
    Collection {
        elements: Vec<NodeId>,
    },
    Cursor {
        context: CursorContext,
    },
    /// Produced by error recovery (spec.md §4.3.2). `partial` is the
    /// best-effort subtree recovered before the error, if any.
    Error {
        message: String,
        partial: Option<NodeId>,
    },
}

impl NodeKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Literal { .. } => "Literal",
            Self::Identifier { .. } => "Identifier",
            Self::Variable { .. } => "Variable",
            Self::Binary { .. } => "Binary",
            Self::Unary { .. } => "Unary",
            Self::Function { .. } => "Function",
            Self::Index { .. } => "Index",
            Self::Collection { .. } => "Collection",
            Self::Cursor { .. } => "Cursor",
            Self::Error { .. } => "Error",
        }
    }

    /// Direct children, in source order. Used to wire up LSP-mode links and
    /// to walk the tree generically (analyzer, interpreter).
    pub fn children(&self) -> Vec<NodeId> {
        match self {
            Self::Literal { .. } | Self::Identifier { .. } | Self::Variable { .. } | Self::Cursor { .. } => {
                vec![]
            }
            Self::Binary { left, right, .. } => vec![*left, *right],
            Self::Unary { operand, .. } => vec![*operand],
            Self::Function { name, arguments } => {
                let mut v = vec![*name];
                v.extend(arguments.iter().copied());
                v
            }
            Self::Index { target, index } => vec![*target, *index],
            Self::Collection { elements } => elements.clone(),
            Self::Error { partial, .. } => partial.iter().copied().collect(),
        }
    }
}

/// Fields every node carries, plus the LSP-mode-only extras (spec.md §3.2).
#[derive(Debug, Clone)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub range: Span,
    /// Set by the analyzer; absent until then (spec.md §3.3 invariant).
    pub type_info: Option<TypeInfo>,

    // LSP-mode-only fields (spec.md §3.2). `None` in standard mode.
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub previous_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    pub depth: Option<u32>,
    pub raw: Option<String>,
    pub leading_trivia: Option<String>,
    pub trailing_trivia: Option<String>,
}

impl Node {
    fn new(id: NodeId, kind: NodeKind, range: Span) -> Self {
        Self {
            id,
            kind,
            range,
            type_info: None,
            parent: None,
            children: Vec::new(),
            previous_sibling: None,
            next_sibling: None,
            depth: None,
            raw: None,
            leading_trivia: None,
            trailing_trivia: None,
        }
    }
}

/// Indexes maintained only in LSP mode (spec.md §4.3.1).
#[derive(Debug, Clone, Default)]
pub struct Indexes {
    pub node_by_id: FxHashMap<NodeId, NodeId>,
    pub nodes_by_kind: FxHashMap<&'static str, Vec<NodeId>>,
    pub identifiers: FxHashMap<String, Vec<NodeId>>,
}

/// The arena-backed AST produced by one parse.
#[derive(Debug, Clone)]
pub struct Ast {
    nodes: Vec<Node>,
    pub root: Option<NodeId>,
    pub indexes: Option<Indexes>,
}

impl Ast {
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            root: None,
            indexes: None,
        }
    }

    pub fn alloc(&mut self, kind: NodeKind, range: Span) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node::new(id, kind, range));
        id
    }

    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Node> {
        self.nodes.iter()
    }

    /// Wires up `parent`/`children`/sibling links, `depth`, and builds the
    /// `Indexes` (node-by-id, nodes-by-kind, identifiers-by-name). Called
    /// once after a complete LSP-mode parse (spec.md §4.3.1).
    pub fn finalize_lsp_links(&mut self, source: &str) {
        let root = match self.root {
            Some(root) => root,
            None => return,
        };
        let mut indexes = Indexes::default();
        let mut stack = vec![(root, 0u32)];
        while let Some((id, depth)) = stack.pop() {
            let children = self.get(id).kind.children();
            {
                let node = self.get_mut(id);
                node.depth = Some(depth);
                node.children = children.clone();
                let start = node.range.start.offset as usize;
                let end = node.range.end.offset as usize;
                node.raw = source.get(start..end).map(|s| s.to_string());
            }
            indexes.node_by_id.insert(id, id);
            indexes
                .nodes_by_kind
                .entry(self.get(id).kind.kind_name())
                .or_default()
                .push(id);
            if let NodeKind::Identifier { name } = &self.get(id).kind {
                indexes.identifiers.entry(name.clone()).or_default().push(id);
            }

            let mut previous: Option<NodeId> = None;
            for &child in &children {
                self.get_mut(child).parent = Some(id);
                self.get_mut(child).previous_sibling = previous;
                if let Some(prev) = previous {
                    self.get_mut(prev).next_sibling = Some(child);
                }
                previous = Some(child);
                stack.push((child, depth + 1));
            }
        }
        self.indexes = Some(indexes);
    }
}

impl Default for Ast {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use octofhir_fhirpath_core::Position;

    fn span() -> Span {
        Span::empty_at(Position::start())
    }

    #[test]
    fn finalize_wires_parent_and_children() {
        let mut ast = Ast::new();
        let left = ast.alloc(
            NodeKind::Literal {
                value: LiteralValue::Integer(1),
            },
            span(),
        );
        let right = ast.alloc(
            NodeKind::Literal {
                value: LiteralValue::Integer(2),
            },
            span(),
        );
        let root = ast.alloc(
            NodeKind::Binary {
                operator: "+".into(),
                left,
                right,
            },
            span(),
        );
        ast.root = Some(root);
        ast.finalize_lsp_links("1+2");

        assert_eq!(ast.get(left).parent, Some(root));
        assert_eq!(ast.get(right).parent, Some(root));
        assert_eq!(ast.get(right).previous_sibling, Some(left));
        assert_eq!(ast.get(left).next_sibling, Some(right));
        assert_eq!(ast.get(root).depth, Some(0));
        assert_eq!(ast.get(left).depth, Some(1));

        let indexes = ast.indexes.as_ref().unwrap();
        assert!(indexes.node_by_id.contains_key(&root));
        assert_eq!(indexes.nodes_by_kind["Literal"].len(), 2);
    }
}
