//! Source positions shared by the lexer, the AST and diagnostics.

/// A single point in source text: 1-based line/column plus a 0-based byte offset.
///
/// Line/column follow human-editor convention (spec.md §3.1); diagnostics convert
/// to 0-based LSP `Position`s at the boundary (spec.md §6.4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
    pub offset: u32,
}

impl Position {
    pub fn new(line: u32, column: u32, offset: u32) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }

    pub const fn start() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }
}

/// A half-open `[start, end)` byte range with its line/column endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// A zero-width span at `pos`, used for synthesized cursor/error nodes.
    pub fn empty_at(pos: Position) -> Self {
        Self {
            start: pos,
            end: pos,
        }
    }

    pub fn merge(self, other: Span) -> Span {
        let start = if self.start.offset <= other.start.offset {
            self.start
        } else {
            other.start
        };
        let end = if self.end.offset >= other.end.offset {
            self.end
        } else {
            other.end
        };
        Span::new(start, end)
    }

    pub fn contains_offset(&self, offset: u32) -> bool {
        offset >= self.start.offset && offset < self.end.offset
    }
}
