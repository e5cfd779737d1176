use text_size::{TextRange, TextSize};
use wattle_errors::Diagnostic;
use wattle_syntax::{Green, GreenNode, GreenToken, SyntaxKind, SyntaxNode};
use wattle_text::SourceText;

/// A subtree or token of the previous tree that the reconciler spliced into
/// this one, described by its kind and its range in the new text. Exposed for
/// testability and telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReusedRange {
    pub kind: SyntaxKind,
    pub range: TextRange,
}

/// The parse root: the concrete tree, its source, the interpolation map, and
/// what the last incremental step managed to reuse.
///
/// Documents are immutable; an edit produces a new document via
/// [`crate::reparse`].
#[derive(Clone)]
pub struct Document {
    text: SourceText,
    root: GreenNode,
    interpolations: Box<[TextRange]>,
    reused: Box<[ReusedRange]>,
}

impl Document {
    pub(crate) fn new(text: SourceText, root: GreenNode, reused: Vec<ReusedRange>) -> Self {
        let mut interpolations = Vec::new();
        collect_interpolations(&root, TextSize::new(0), &mut interpolations);
        Self { text, root, interpolations: interpolations.into(), reused: reused.into() }
    }

    pub fn text(&self) -> &SourceText {
        &self.text
    }

    pub fn green(&self) -> &GreenNode {
        &self.root
    }

    pub fn syntax(&self) -> SyntaxNode {
        SyntaxNode::new_root(self.root.clone())
    }

    /// Full-fidelity width of the tree; always equals the buffer length.
    pub fn width(&self) -> TextSize {
        self.root.width()
    }

    /// Interpolation token ranges in document order; the index is the
    /// interpolation's ordinal. Rebuilt per document, so reused tokens can
    /// never carry a stale ordinal.
    pub fn interpolations(&self) -> &[TextRange] {
        &self.interpolations
    }

    pub fn interpolation(&self, ordinal: usize) -> Option<TextRange> {
        self.interpolations.get(ordinal).copied()
    }

    /// What the producing incremental step reused; empty for full parses.
    pub fn reused(&self) -> &[ReusedRange] {
        &self.reused
    }

    /// All diagnostics in the tree, depth first, with absolute ranges.
    pub fn all_diagnostics(&self) -> Vec<Diagnostic> {
        let mut out = Vec::new();
        collect_diagnostics(&self.root, TextSize::new(0), &mut out);
        out
    }

    /// Exact reconstruction of the source text.
    pub fn to_full_string(&self) -> String {
        self.root.to_string()
    }

    /// Reconstruction with all trivia stripped.
    pub fn to_trimmed_string(&self) -> String {
        let mut out = String::new();
        collect_trimmed(&self.root, &mut out);
        out
    }

    /// Tree plus diagnostics dump used by tests and the CLI.
    pub fn debug_tree(&self) -> String {
        let mut out = self.syntax().debug_dump();
        out.push_str("Errors:\n");
        for diagnostic in self.all_diagnostics() {
            out.push_str("  ");
            out.push_str(diagnostic.message());
            out.push('\n');
        }
        out
    }
}

// Salsa stores the `document` tracked query's output in its memo slot. The
// query is `no_eq`, so salsa never backdates it and always treats the output as
// changed; the minimal correct `Update` impl simply overwrites in place and
// reports "changed".
unsafe impl salsa::Update for Document {
    unsafe fn maybe_update(old_pointer: *mut Self, new_value: Self) -> bool {
        let old_value = unsafe { &mut *old_pointer };
        *old_value = new_value;
        true
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("width", &self.width())
            .field("interpolations", &self.interpolations.len())
            .field("reused", &self.reused.len())
            .finish()
    }
}

fn collect_interpolations(node: &GreenNode, offset: TextSize, out: &mut Vec<TextRange>) {
    let mut child_offset = offset;
    for child in node.children() {
        match child {
            Green::Node(child) => collect_interpolations(child, child_offset, out),
            Green::Token(token) => {
                if token.kind() == SyntaxKind::INTERPOLATION {
                    out.push(trimmed_token_range(token, child_offset));
                }
            }
        }
        child_offset += child.width();
    }
}

fn trimmed_token_range(token: &GreenToken, offset: TextSize) -> TextRange {
    TextRange::new(
        offset + token.leading().len(),
        offset + token.width() - token.trailing().len(),
    )
}

fn collect_diagnostics(node: &GreenNode, offset: TextSize, out: &mut Vec<Diagnostic>) {
    for diagnostic in node.diagnostics() {
        out.push(diagnostic.clone().offset_by(offset));
    }
    let mut child_offset = offset;
    for child in node.children() {
        match child {
            Green::Node(child) => collect_diagnostics(child, child_offset, out),
            Green::Token(token) => {
                for diagnostic in token.diagnostics() {
                    out.push(diagnostic.clone().offset_by(child_offset));
                }
            }
        }
        child_offset += child.width();
    }
}

fn collect_trimmed(node: &GreenNode, out: &mut String) {
    for child in node.children() {
        match child {
            Green::Node(child) => collect_trimmed(child, out),
            Green::Token(token) => out.push_str(token.text_trimmed()),
        }
    }
}
