use std::fmt;

use text_size::{TextLen, TextSize};
use triomphe::{Arc, ThinArc};
use wattle_errors::Diagnostic;

use crate::SyntaxKind;

/// Node-or-token wrapper used throughout the API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeOrToken<N, T> {
    Node(N),
    Token(T),
}

impl<N, T> NodeOrToken<N, T> {
    pub fn into_node(self) -> Option<N> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    pub fn into_token(self) -> Option<T> {
        match self {
            NodeOrToken::Node(_) => None,
            NodeOrToken::Token(token) => Some(token),
        }
    }

    pub fn as_node(&self) -> Option<&N> {
        match self {
            NodeOrToken::Node(node) => Some(node),
            NodeOrToken::Token(_) => None,
        }
    }

    pub fn as_token(&self) -> Option<&T> {
        match self {
            NodeOrToken::Node(_) => None,
            NodeOrToken::Token(token) => Some(token),
        }
    }
}

/// Green element: position-independent node or token data.
pub type Green = NodeOrToken<GreenNode, GreenToken>;

impl Green {
    pub fn kind(&self) -> SyntaxKind {
        match self {
            NodeOrToken::Node(node) => node.kind(),
            NodeOrToken::Token(token) => token.kind(),
        }
    }

    pub fn width(&self) -> TextSize {
        match self {
            NodeOrToken::Node(node) => node.width(),
            NodeOrToken::Token(token) => token.width(),
        }
    }

    pub fn flags(&self) -> GreenFlags {
        match self {
            NodeOrToken::Node(node) => node.flags(),
            NodeOrToken::Token(token) => token.flags(),
        }
    }
}

bitflags::bitflags! {
    /// Summary bits carried by every green element.
    ///
    /// The `CONTAINS_*` bits are unioned over the whole subtree so the
    /// reconciler can rule out dirty subtrees without walking them.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct GreenFlags: u8 {
        /// The token itself was synthesized during recovery.
        const MISSING = 1 << 0;
        /// The subtree contains at least one missing token.
        const CONTAINS_MISSING = 1 << 1;
        /// The subtree carries at least one diagnostic.
        const CONTAINS_DIAGNOSTICS = 1 << 2;
    }
}

impl GreenFlags {
    /// The bits a parent inherits from this element.
    fn inherited(self) -> Self {
        let mut flags = self & (Self::CONTAINS_MISSING | Self::CONTAINS_DIAGNOSTICS);
        if self.contains(Self::MISSING) {
            flags |= Self::CONTAINS_MISSING;
        }
        flags
    }
}

/// Kinds of trivia attached to tokens.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum TriviaPieceKind {
    Whitespace,
    Newline,
    /// An XML-style `<!-- -->` comment.
    Comment,
}

/// A trivia fragment with its kind and length.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct TriviaPiece {
    pub kind: TriviaPieceKind,
    pub len: TextSize,
}

impl TriviaPiece {
    pub fn new(kind: TriviaPieceKind, len: TextSize) -> Self {
        Self { kind, len }
    }
}

/// Trivia attached to one side of a token, stored as pieces; the text itself
/// lives in the token so reconstruction is a single concatenation.
#[derive(Clone)]
pub struct GreenTrivia {
    ptr: Option<ThinArc<TextSize, TriviaPiece>>,
}

impl GreenTrivia {
    pub fn new(pieces: &[TriviaPiece]) -> Self {
        if pieces.is_empty() {
            return Self::empty();
        }
        let total_len = pieces.iter().map(|piece| piece.len).sum();
        Self { ptr: Some(ThinArc::from_header_and_slice(total_len, pieces)) }
    }

    pub const fn empty() -> Self {
        Self { ptr: None }
    }

    pub fn len(&self) -> TextSize {
        match &self.ptr {
            None => TextSize::new(0),
            Some(ptr) => ptr.header.header,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ptr.is_none()
    }

    pub fn pieces(&self) -> &[TriviaPiece] {
        match &self.ptr {
            None => &[],
            Some(ptr) => &ptr.slice,
        }
    }
}

impl PartialEq for GreenTrivia {
    fn eq(&self, other: &Self) -> bool {
        self.pieces() == other.pieces()
    }
}

impl Eq for GreenTrivia {}

impl fmt::Debug for GreenTrivia {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreenTrivia")
            .field("pieces", &self.pieces())
            .field("total_len", &self.len())
            .finish()
    }
}

/// Terminal green element. The text includes leading and trailing trivia;
/// diagnostic ranges are relative to the token start.
#[derive(Clone)]
pub struct GreenToken {
    data: Arc<GreenTokenData>,
}

struct GreenTokenData {
    kind: SyntaxKind,
    text: Box<str>,
    leading: GreenTrivia,
    trailing: GreenTrivia,
    flags: GreenFlags,
    diagnostics: Box<[Diagnostic]>,
}

impl GreenToken {
    pub fn new(
        kind: SyntaxKind,
        text: impl Into<Box<str>>,
        leading: GreenTrivia,
        trailing: GreenTrivia,
        diagnostics: Vec<Diagnostic>,
    ) -> Self {
        let mut flags = GreenFlags::empty();
        if !diagnostics.is_empty() {
            flags |= GreenFlags::CONTAINS_DIAGNOSTICS;
        }
        let text = text.into();
        debug_assert!(usize::from(leading.len() + trailing.len()) <= text.len());
        Self {
            data: Arc::new(GreenTokenData {
                kind,
                text,
                leading,
                trailing,
                flags,
                diagnostics: diagnostics.into(),
            }),
        }
    }

    /// A zero-width token synthesized during recovery.
    pub fn missing(kind: SyntaxKind, diagnostics: Vec<Diagnostic>) -> Self {
        let mut flags = GreenFlags::MISSING | GreenFlags::CONTAINS_MISSING;
        if !diagnostics.is_empty() {
            flags |= GreenFlags::CONTAINS_DIAGNOSTICS;
        }
        Self {
            data: Arc::new(GreenTokenData {
                kind,
                text: "".into(),
                leading: GreenTrivia::empty(),
                trailing: GreenTrivia::empty(),
                flags,
                diagnostics: diagnostics.into(),
            }),
        }
    }

    pub fn kind(&self) -> SyntaxKind {
        self.data.kind
    }

    /// Full token text, trivia included.
    pub fn text(&self) -> &str {
        &self.data.text
    }

    /// Token text with leading and trailing trivia stripped.
    pub fn text_trimmed(&self) -> &str {
        let start = usize::from(self.data.leading.len());
        let end = self.data.text.len() - usize::from(self.data.trailing.len());
        &self.data.text[start..end]
    }

    pub fn width(&self) -> TextSize {
        self.data.text.text_len()
    }

    pub fn leading(&self) -> &GreenTrivia {
        &self.data.leading
    }

    pub fn trailing(&self) -> &GreenTrivia {
        &self.data.trailing
    }

    pub fn flags(&self) -> GreenFlags {
        self.data.flags
    }

    pub fn is_missing(&self) -> bool {
        self.data.flags.contains(GreenFlags::MISSING)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.data.diagnostics
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for GreenToken {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.data.kind == other.data.kind
                && self.data.text == other.data.text
                && self.data.leading == other.data.leading
                && self.data.trailing == other.data.trailing
                && self.data.flags == other.data.flags
                && self.data.diagnostics == other.data.diagnostics)
    }
}

impl Eq for GreenToken {}

impl fmt::Debug for GreenToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreenToken")
            .field("kind", &self.kind())
            .field("text", &self.text())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for GreenToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.text())
    }
}

/// Interior green element with an ordered list of children. Slots that the
/// grammar leaves out are simply absent; collection slots are child nodes of
/// the corresponding list kind. Diagnostic ranges are relative to the node
/// start.
#[derive(Clone)]
pub struct GreenNode {
    data: Arc<GreenNodeData>,
}

struct GreenNodeData {
    kind: SyntaxKind,
    width: TextSize,
    flags: GreenFlags,
    children: Box<[Green]>,
    diagnostics: Box<[Diagnostic]>,
}

impl GreenNode {
    pub fn new(kind: SyntaxKind, children: Vec<Green>, diagnostics: Vec<Diagnostic>) -> Self {
        let width = children.iter().map(Green::width).sum();
        let mut flags = GreenFlags::empty();
        for child in &children {
            flags |= child.flags().inherited();
        }
        if !diagnostics.is_empty() {
            flags |= GreenFlags::CONTAINS_DIAGNOSTICS;
        }
        Self {
            data: Arc::new(GreenNodeData {
                kind,
                width,
                flags,
                children: children.into(),
                diagnostics: diagnostics.into(),
            }),
        }
    }

    pub fn kind(&self) -> SyntaxKind {
        self.data.kind
    }

    pub fn width(&self) -> TextSize {
        self.data.width
    }

    pub fn flags(&self) -> GreenFlags {
        self.data.flags
    }

    pub fn children(&self) -> &[Green] {
        &self.data.children
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.data.diagnostics
    }

    /// `true` when neither missing tokens nor diagnostics occur in the
    /// subtree.
    pub fn is_clean(&self) -> bool {
        !self
            .data
            .flags
            .intersects(GreenFlags::CONTAINS_MISSING | GreenFlags::CONTAINS_DIAGNOSTICS)
    }

    pub fn first_token(&self) -> Option<&GreenToken> {
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
}

impl PartialEq for GreenNode {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
            || (self.data.kind == other.data.kind
                && self.data.width == other.data.width
                && self.data.flags == other.data.flags
                && self.data.children == other.data.children
                && self.data.diagnostics == other.data.diagnostics)
    }
}

impl Eq for GreenNode {}

impl fmt::Debug for GreenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GreenNode")
            .field("kind", &self.kind())
            .field("width", &self.width())
            .finish_non_exhaustive()
    }
}

impl fmt::Display for GreenNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for child in self.children() {
            match child {
                NodeOrToken::Node(node) => fmt::Display::fmt(node, f)?,
                NodeOrToken::Token(token) => fmt::Display::fmt(token, f)?,
            }
        }
        Ok(())
    }
}
