//! Builder assembling green trees from parser output.

use wattle_errors::Diagnostic;

use crate::green::{Green, GreenNode, GreenToken};
use crate::syntax_kind::SyntaxKind;

/// Stack-based green tree builder.
///
/// Besides the usual start/finish pairing it supports wrapping
/// already-pushed children into a node after the fact (for productions whose
/// kind depends on what was consumed) and rolling back to a checkpoint (for
/// speculative parses).
pub struct TreeBuilder {
    parents: Vec<(SyntaxKind, usize)>,
    children: Vec<Green>,
}

/// Position to wrap retroactively via [`TreeBuilder::wrap_node`].
#[derive(Clone, Copy)]
pub struct NodeMark {
    children: usize,
}

/// Rollback point for speculative parsing.
#[derive(Clone, Copy)]
pub struct BuilderCheckpoint {
    parents: usize,
    children: usize,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self { parents: Vec::with_capacity(16), children: Vec::with_capacity(64) }
    }

    pub fn start_node(&mut self, kind: SyntaxKind) {
        debug_assert!(kind.is_node());
        self.parents.push((kind, self.children.len()));
    }

    pub fn finish_node(&mut self) {
        self.finish_node_with(Vec::new());
    }

    pub fn finish_node_with(&mut self, diagnostics: Vec<Diagnostic>) {
        let (kind, first_child) = self.parents.pop().expect("no started node to finish");
        let children = self.children.drain(first_child..).collect();
        self.children.push(Green::Node(GreenNode::new(kind, children, diagnostics)));
    }

    /// Remembers the current position so children pushed from here on can be
    /// wrapped into a node once their kind is known.
    pub fn mark(&self) -> NodeMark {
        NodeMark { children: self.children.len() }
    }

    pub fn wrap_node(&mut self, mark: NodeMark, kind: SyntaxKind, diagnostics: Vec<Diagnostic>) {
        debug_assert!(kind.is_node());
        debug_assert!(
            self.parents.last().is_none_or(|&(_, first)| mark.children >= first),
            "mark must not cross into an enclosing node",
        );
        let children = self.children.drain(mark.children..).collect();
        self.children.push(Green::Node(GreenNode::new(kind, children, diagnostics)));
    }

    pub fn token(&mut self, token: GreenToken) {
        self.children.push(Green::Token(token));
    }

    /// Splices a finished green element, typically one reused from a previous
    /// tree.
    pub fn push(&mut self, green: Green) {
        self.children.push(green);
    }

    pub fn checkpoint(&self) -> BuilderCheckpoint {
        BuilderCheckpoint { parents: self.parents.len(), children: self.children.len() }
    }

    /// Discards everything produced since `checkpoint`.
    pub fn restore(&mut self, checkpoint: BuilderCheckpoint) {
        debug_assert!(checkpoint.parents <= self.parents.len());
        debug_assert!(checkpoint.children <= self.children.len());
        self.parents.truncate(checkpoint.parents);
        self.children.truncate(checkpoint.children);
    }

    pub fn finish(mut self) -> GreenNode {
        assert!(self.parents.is_empty(), "unfinished nodes remain");
        assert_eq!(self.children.len(), 1, "exactly one root expected");
        match self.children.pop() {
            Some(Green::Node(root)) => root,
            _ => panic!("root must be a node"),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::green::GreenTrivia;

    use super::*;

    fn token(kind: SyntaxKind, text: &str) -> GreenToken {
        GreenToken::new(kind, text, GreenTrivia::empty(), GreenTrivia::empty(), Vec::new())
    }

    #[test]
    fn builds_nested_nodes() {
        let mut builder = TreeBuilder::new();
        builder.start_node(SyntaxKind::DOCUMENT);
        builder.start_node(SyntaxKind::ELEMENT);
        builder.token(token(SyntaxKind::LESS_THAN, "<"));
        builder.token(token(SyntaxKind::IDENTIFIER, "a"));
        builder.token(token(SyntaxKind::SLASH_GREATER_THAN, "/>"));
        builder.finish_node();
        builder.token(token(SyntaxKind::EOF, ""));
        builder.finish_node();

        let root = builder.finish();
        assert_eq!(root.kind(), SyntaxKind::DOCUMENT);
        assert_eq!(root.to_string(), "<a/>");
    }

    #[test]
    fn wrap_node_from_mark() {
        let mut builder = TreeBuilder::new();
        builder.start_node(SyntaxKind::DOCUMENT);
        let mark = builder.mark();
        builder.token(token(SyntaxKind::TEXT, "a"));
        builder.token(token(SyntaxKind::INTERPOLATION, "{x}"));
        builder.wrap_node(mark, SyntaxKind::MULTIPART_VALUE, Vec::new());
        builder.finish_node();

        let root = builder.finish();
        let child = root.children()[0].as_node().unwrap();
        assert_eq!(child.kind(), SyntaxKind::MULTIPART_VALUE);
        assert_eq!(child.children().len(), 2);
    }

    #[test]
    fn restore_discards_speculation() {
        let mut builder = TreeBuilder::new();
        builder.start_node(SyntaxKind::DOCUMENT);
        let checkpoint = builder.checkpoint();
        builder.start_node(SyntaxKind::CLOSING_TAG);
        builder.token(token(SyntaxKind::LESS_THAN_SLASH, "</"));
        builder.restore(checkpoint);
        builder.token(token(SyntaxKind::EOF, ""));
        builder.finish_node();

        let root = builder.finish();
        assert_eq!(root.children().len(), 1);
    }
}
