use drop_bomb::DropBomb;
use text_size::{TextRange, TextSize};
use tokio_util::sync::CancellationToken;
use wattle_errors::{Diagnostic, DiagnosticCode};
use wattle_syntax::{
    BuilderCheckpoint, Green, GreenNode, GreenToken, NodeMark, SyntaxKind, SyntaxSet, TreeBuilder,
};
use wattle_tokenizer::{LexMode, Token, Tokenizer};
use wattle_text::SourceText;

use crate::Cancelled;
use crate::blender::Blender;
use crate::document::ReusedRange;

pub(crate) struct Parser<'t> {
    text: &'t SourceText,
    tokenizer: Tokenizer<'t>,
    pos: TextSize,
    lookahead: Option<Lookahead>,
    modes: Vec<LexMode>,
    builder: TreeBuilder,
    blender: Option<Blender>,
    reused: Vec<ReusedRange>,
    cancel: CancellationToken,
}

struct Lookahead {
    mode: LexMode,
    pos: TextSize,
    token: Token,
}

impl<'t> Parser<'t> {
    pub(crate) fn new(
        text: &'t SourceText,
        interpolations: &'t [TextRange],
        blender: Option<Blender>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            text,
            tokenizer: Tokenizer::new(text, interpolations),
            pos: TextSize::new(0),
            lookahead: None,
            modes: vec![LexMode::Default],
            builder: TreeBuilder::new(),
            blender,
            reused: Vec::new(),
            cancel,
        }
    }

    pub(crate) fn pos(&self) -> TextSize {
        self.pos
    }

    fn mode(&self) -> LexMode {
        *self.modes.last().expect("the mode stack is never empty")
    }

    pub(crate) fn push_mode(&mut self, mode: LexMode) {
        self.modes.push(mode);
        self.lookahead = None;
    }

    pub(crate) fn pop_mode(&mut self) {
        self.modes.pop();
        debug_assert!(!self.modes.is_empty());
        self.lookahead = None;
    }

    fn peek(&mut self) -> &Token {
        let mode = self.mode();
        let cached = matches!(
            &self.lookahead,
            Some(lookahead) if lookahead.mode == mode && lookahead.pos == self.pos
        );
        if !cached {
            let token = self.tokenizer.token_at(self.pos, mode);
            self.lookahead = Some(Lookahead { mode, pos: self.pos, token });
        }
        &self.lookahead.as_ref().expect("lookahead was just filled").token
    }

    pub(crate) fn peek_kind(&mut self) -> SyntaxKind {
        self.peek().kind
    }

    pub(crate) fn at(&mut self, kind: SyntaxKind) -> bool {
        self.peek_kind() == kind
    }

    /// The lookahead-1 fragment heuristic: the current token is an
    /// identifier with `=` immediately after it (no trivia in between), so
    /// it reads as an attribute name rather than a tag name.
    pub(crate) fn at_attribute_name(&mut self) -> bool {
        if !self.at(SyntaxKind::IDENTIFIER) {
            return false;
        }
        let (next_pos, has_trailing) = {
            let token = self.peek();
            (token.full_range().end(), !token.trailing.is_empty())
        };
        if has_trailing {
            return false;
        }
        let mode = self.mode();
        let second = self.tokenizer.token_at(next_pos, mode);
        second.kind == SyntaxKind::EQUALS && second.leading.is_empty()
    }

    /// Absolute range of the current token, trivia excluded. Used to anchor
    /// diagnostics at the offending text.
    pub(crate) fn peek_anchor(&mut self) -> TextRange {
        self.peek().kind_range
    }

    /// Text of the current token, trivia excluded.
    pub(crate) fn peek_token_text(&mut self) -> String {
        let range = self.peek().kind_range;
        self.text.slice(range)
    }

    pub(crate) fn bump(&mut self) {
        self.peek();
        let Lookahead { token, .. } = self.lookahead.take().expect("lookahead was just filled");
        let full = token.full_range();
        let green = GreenToken::new(
            token.kind,
            self.text.slice(full),
            token.leading,
            token.trailing,
            Vec::new(),
        );
        let green = match self.blender.as_mut().and_then(|blender| blender.try_token(full.start(), &green))
        {
            Some(old) => {
                self.reused.push(ReusedRange { kind: old.kind(), range: full });
                old
            }
            None => green,
        };
        self.pos = full.end();
        self.builder.token(green);
    }

    /// Synthesizes a zero-width missing token of `kind` without advancing.
    pub(crate) fn bump_missing(&mut self, kind: SyntaxKind, diagnostics: Vec<Diagnostic>) {
        self.builder.token(GreenToken::missing(kind, diagnostics));
    }

    /// Consumes `kind` or synthesizes it as missing with an
    /// [`DiagnosticCode::UnexpectedToken`] anchored at the found token.
    pub(crate) fn expect(&mut self, kind: SyntaxKind) {
        if self.at(kind) {
            self.bump();
            return;
        }
        let found = self.peek_kind();
        let anchor = self.peek_anchor();
        tracing::trace!(expected = ?kind, ?found, "synthesizing missing token");
        let diagnostic = Diagnostic::error(
            DiagnosticCode::UnexpectedToken,
            format!("expected {}, found {}", kind.describe(), found.describe()),
            anchor - self.pos,
        );
        self.bump_missing(kind, vec![diagnostic]);
    }

    pub(crate) fn start_node(&mut self, kind: SyntaxKind) {
        self.check_cancelled();
        self.builder.start_node(kind);
    }

    pub(crate) fn finish_node(&mut self) {
        self.builder.finish_node();
    }

    pub(crate) fn finish_node_with(&mut self, diagnostics: Vec<Diagnostic>) {
        self.builder.finish_node_with(diagnostics);
    }

    pub(crate) fn mark(&self) -> NodeMark {
        self.builder.mark()
    }

    pub(crate) fn wrap_node(&mut self, mark: NodeMark, kind: SyntaxKind, diagnostics: Vec<Diagnostic>) {
        self.builder.wrap_node(mark, kind, diagnostics);
    }

    /// Attempts to splice a subtree of the previous tree at the current
    /// position. `parents` restricts which old parent kinds the candidate may
    /// come from (lexing context), and `follow_veto` rejects a candidate when
    /// the token right after it would continue the production (e.g. a text
    /// run must really end at the candidate's edge).
    pub(crate) fn try_reuse(
        &mut self,
        kinds: SyntaxSet,
        parents: Option<SyntaxSet>,
        follow_veto: Option<SyntaxSet>,
    ) -> bool {
        if self.blender.is_none() {
            return false;
        }
        let (first_kind, first_width, first_leading) = {
            let token = self.peek();
            (token.kind, token.full_width(), token.leading.len())
        };
        let blender = self.blender.as_mut().expect("blender checked above");
        let Some(node) =
            blender.candidate(kinds, parents, self.pos, first_kind, first_width, first_leading)
        else {
            return false;
        };
        if let Some(veto) = follow_veto {
            let after = self.pos + node.width();
            let mode = self.mode();
            let next_kind = self.tokenizer.token_at(after, mode).kind;
            if veto.contains(next_kind) {
                tracing::trace!(kind = ?node.kind(), "reuse vetoed by following token");
                return false;
            }
        }
        let width = node.width();
        let range = TextRange::at(self.pos, width);
        tracing::debug!(kind = ?node.kind(), ?range, "reused subtree");
        self.reused.push(ReusedRange { kind: node.kind(), range });
        let blender = self.blender.as_mut().expect("blender checked above");
        blender.consume();
        self.pos += width;
        self.lookahead = None;
        self.builder.push(Green::Node(node));
        true
    }

    pub(crate) fn checkpoint(&mut self) -> Checkpoint {
        Checkpoint {
            pos: self.pos,
            builder: self.builder.checkpoint(),
            modes: self.modes.len(),
            reused: self.reused.len(),
            bomb: DropBomb::new("a parser checkpoint must be committed or rewound"),
        }
    }

    /// Rolls the parser back to `checkpoint`. The blender cursor is not
    /// rewound; it only ever moves forward, so a rewind merely forfeits reuse
    /// for the tokens the speculation consumed.
    pub(crate) fn rewind(&mut self, mut checkpoint: Checkpoint) {
        checkpoint.bomb.defuse();
        self.pos = checkpoint.pos;
        self.builder.restore(checkpoint.builder);
        self.modes.truncate(checkpoint.modes);
        self.reused.truncate(checkpoint.reused);
        self.lookahead = None;
    }

    pub(crate) fn check_cancelled(&self) {
        if self.cancel.is_cancelled() {
            Cancelled::throw();
        }
    }

    pub(crate) fn finish(self) -> (GreenNode, Vec<ReusedRange>) {
        (self.builder.finish(), self.reused)
    }
}

pub(crate) struct Checkpoint {
    pos: TextSize,
    builder: BuilderCheckpoint,
    modes: usize,
    reused: usize,
    bomb: DropBomb,
}

impl Checkpoint {
    /// Keeps the speculatively parsed output.
    pub(crate) fn commit(mut self) {
        self.bomb.defuse();
    }
}
