//! Lossless, immutable syntax tree for the embedded markup language.
//!
//! The tree is split the usual way: *green* data is position independent and
//! freely shared between trees (which is what makes incremental reuse a
//! pointer copy), the *red* layer adds absolute offsets and parent links and
//! is rebuilt on demand for each tree.

/// Typed AST wrappers around the raw syntax tree.
pub mod ast;
mod builder;
mod green;
mod red;
mod syntax_kind;
mod syntax_set;

pub use builder::{BuilderCheckpoint, NodeMark, TreeBuilder};
pub use green::{
    Green, GreenFlags, GreenNode, GreenToken, GreenTrivia, NodeOrToken, TriviaPiece,
    TriviaPieceKind,
};
pub use red::{SyntaxChildren, SyntaxElement, SyntaxNode, SyntaxToken};
pub use syntax_kind::SyntaxKind;
pub use syntax_set::SyntaxSet;
