//! Red layer: absolute offsets and parent links over green data.

use std::fmt;

use text_size::{TextRange, TextSize};
use triomphe::Arc;

use crate::green::{Green, GreenNode, GreenToken, NodeOrToken};
use crate::syntax_kind::SyntaxKind;

/// Node handle carrying its absolute position and parent.
///
/// Handles are cheap to clone and recreated per tree; the parent link is a
/// navigation aid only and never an ownership edge, so green data reused from
/// an older tree picks up fresh parents in the new one.
#[derive(Clone)]
pub struct SyntaxNode {
    data: Arc<NodeData>,
}

struct NodeData {
    parent: Option<SyntaxNode>,
    offset: TextSize,
    green: GreenNode,
}

/// Token handle carrying its absolute position and parent.
#[derive(Clone)]
pub struct SyntaxToken {
    parent: SyntaxNode,
    offset: TextSize,
    green: GreenToken,
}

pub type SyntaxElement = NodeOrToken<SyntaxNode, SyntaxToken>;

impl SyntaxNode {
    pub fn new_root(green: GreenNode) -> Self {
        Self { data: Arc::new(NodeData { parent: None, offset: TextSize::new(0), green }) }
    }

    pub fn kind(&self) -> SyntaxKind {
        self.data.green.kind()
    }

    pub fn green(&self) -> &GreenNode {
        &self.data.green
    }

    pub fn parent(&self) -> Option<SyntaxNode> {
        self.data.parent.clone()
    }

    pub fn ancestors(&self) -> impl Iterator<Item = SyntaxNode> + use<> {
        std::iter::successors(Some(self.clone()), SyntaxNode::parent)
    }

    pub fn text_range(&self) -> TextRange {
        TextRange::at(self.data.offset, self.data.green.width())
    }

    pub fn children(&self) -> SyntaxChildren {
        SyntaxChildren { parent: self.clone(), index: 0, offset: self.data.offset }
    }

    pub fn child_nodes(&self) -> impl Iterator<Item = SyntaxNode> + use<> {
        self.children().filter_map(SyntaxElement::into_node)
    }

    /// First token of the subtree, in document order.
    pub fn first_token(&self) -> Option<SyntaxToken> {
        for child in self.children() {
            match child {
                NodeOrToken::Token(token) => return Some(token),
                NodeOrToken::Node(node) => {
                    if let Some(token) = node.first_token() {
                        return Some(token);
                    }
                }
            }
        }
        None
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }

    /// Indented tree dump used by snapshot tests and the CLI.
    pub fn debug_dump(&self) -> String {
        let mut out = String::new();
        self.dump_into(&mut out, 0);
        out
    }

    fn dump_into(&self, out: &mut String, depth: usize) {
        use std::fmt::Write as _;

        let range = self.text_range();
        let _ = writeln!(out, "{:indent$}{:?}@{range:?}", "", self.kind(), indent = depth * 2);
        for child in self.children() {
            match child {
                NodeOrToken::Node(node) => node.dump_into(out, depth + 1),
                NodeOrToken::Token(token) => {
                    let _ = write!(
                        out,
                        "{:indent$}{:?}@{:?}",
                        "",
                        token.kind(),
                        token.text_range(),
                        indent = (depth + 1) * 2,
                    );
                    if token.green().is_missing() {
                        let _ = write!(out, " missing");
                    } else {
                        let _ = write!(out, " {:?}", token.text());
                    }
                    out.push('\n');
                }
            }
        }
    }
}

impl fmt::Debug for SyntaxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?}", self.kind(), self.text_range())
    }
}

impl SyntaxToken {
    pub fn kind(&self) -> SyntaxKind {
        self.green.kind()
    }

    pub fn green(&self) -> &GreenToken {
        &self.green
    }

    pub fn parent(&self) -> &SyntaxNode {
        &self.parent
    }

    /// Range including attached trivia.
    pub fn text_range(&self) -> TextRange {
        TextRange::at(self.offset, self.green.width())
    }

    /// Range of the token itself, trivia excluded.
    pub fn trimmed_range(&self) -> TextRange {
        let range = self.text_range();
        TextRange::new(
            range.start() + self.green.leading().len(),
            range.end() - self.green.trailing().len(),
        )
    }

    /// Token text including trivia.
    pub fn text(&self) -> &str {
        self.green.text()
    }

    /// Token text with trivia stripped.
    pub fn text_trimmed(&self) -> &str {
        self.green.text_trimmed()
    }
}

impl fmt::Debug for SyntaxToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}@{:?} {:?}", self.kind(), self.text_range(), self.text())
    }
}

/// Iterator over the direct children of a node.
pub struct SyntaxChildren {
    parent: SyntaxNode,
    index: usize,
    offset: TextSize,
}

impl Iterator for SyntaxChildren {
    type Item = SyntaxElement;

    fn next(&mut self) -> Option<SyntaxElement> {
        let green = self.parent.data.green.children().get(self.index)?.clone();
        self.index += 1;
        let offset = self.offset;
        self.offset += green.width();
        Some(match green {
            Green::Node(node) => NodeOrToken::Node(SyntaxNode {
                data: Arc::new(NodeData {
                    parent: Some(self.parent.clone()),
                    offset,
                    green: node,
                }),
            }),
            Green::Token(token) => NodeOrToken::Token(SyntaxToken {
                parent: self.parent.clone(),
                offset,
                green: token,
            }),
        })
    }
}
