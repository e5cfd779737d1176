//! The reconciler: walks a cursor through the previous tree in lock-step
//! with the new text and decides, production by production, whether an old
//! subtree can be spliced into the new tree verbatim.
//!
//! Reuse of a subtree requires all of:
//! - the parser's position maps cleanly into old-text coordinates (positions
//!   inside an edited region never map);
//! - a subtree of an expected kind starts exactly at the mapped offset;
//! - the subtree is clean: nonzero width, no missing tokens, no diagnostics;
//! - every change range lies entirely before it (touching its leading edge is
//!   allowed, the boundary re-lex catches merged tokens) or strictly after it
//!   (touching the trailing edge could extend its last token);
//! - the interpolation spans inside it are the same in both generations,
//!   modulo the position shift;
//! - re-lexing at the new position reproduces its first token.
//!
//! Anything less descends to child granularity; tokens overlapping an edit
//! are re-lexed from scratch; a kind mismatch or an exhausted cursor falls
//! through to the ordinary recursive-descent code path.

use text_size::{TextRange, TextSize};
use wattle_syntax::{Green, GreenNode, GreenToken, SyntaxKind, SyntaxSet};
use wattle_text::ChangeRange;

pub(crate) struct Blender {
    /// Composed change ranges in old-text coordinates, position ordered.
    changes: Box<[ChangeRange]>,
    /// Interpolation token spans of the previous document (old coordinates).
    old_interpolations: Box<[TextRange]>,
    /// Normalized interpolation spans of the current call (new coordinates).
    new_interpolations: Box<[TextRange]>,
    /// DFS cursor over the old green tree: stack of (node, next child index).
    stack: Vec<(GreenNode, usize)>,
    /// Old-text offset of the next unvisited element.
    offset: TextSize,
}

impl Blender {
    pub(crate) fn new(
        old_root: GreenNode,
        old_interpolations: Box<[TextRange]>,
        new_interpolations: Box<[TextRange]>,
        changes: &[ChangeRange],
    ) -> Self {
        Self {
            changes: changes.into(),
            old_interpolations,
            new_interpolations,
            stack: vec![(old_root, 0)],
            offset: TextSize::new(0),
        }
    }

    /// Maps a position in the new text back into old-text coordinates.
    /// Returns `None` for positions inside an edited region.
    fn map_new_to_old(&self, new_pos: TextSize) -> Option<TextSize> {
        let pos = i64::from(u32::from(new_pos));
        let mut delta = 0i64;
        for change in &self.changes {
            let old_start = i64::from(u32::from(change.span.start()));
            let old_len = i64::from(u32::from(change.span.len()));
            let new_len = i64::from(u32::from(change.new_len));
            let new_start = old_start + delta;
            if pos < new_start {
                break;
            }
            if pos < new_start + new_len {
                return None;
            }
            delta += new_len - old_len;
        }
        let old = pos - delta;
        debug_assert!(old >= 0);
        Some(TextSize::new(old as u32))
    }

    /// Whether every change lies entirely outside `old_span`. A change
    /// touching the leading edge is tolerated (the boundary re-lex guards
    /// it); one touching the trailing edge is not, since it could extend the
    /// last token of the span.
    fn changes_clear(&self, old_span: TextRange) -> bool {
        self.changes.iter().all(|change| {
            change.span.end() <= old_span.start() || change.span.start() > old_span.end()
        })
    }

    /// Both generations must agree on the interpolations inside the subtree:
    /// the old spans within `old_span`, shifted by `shift`, must be exactly
    /// the new spans within the shifted window.
    fn interpolations_consistent(&self, old_span: TextRange, shift: i64) -> bool {
        let olds = self
            .old_interpolations
            .iter()
            .filter(|span| span.start() < old_span.end() && span.end() > old_span.start());
        let new_window = |span: &&TextRange| {
            let start = i64::from(u32::from(span.start())) - shift;
            let end = i64::from(u32::from(span.end())) - shift;
            // Back-shifted into old coordinates for comparison.
            end > i64::from(u32::from(old_span.start())) && start < i64::from(u32::from(old_span.end()))
        };
        let mut news = self.new_interpolations.iter().filter(new_window);

        for old in olds {
            let Some(new) = news.next() else { return false };
            let shifted_start = i64::from(u32::from(old.start())) + shift;
            let shifted_end = i64::from(u32::from(old.end())) + shift;
            if i64::from(u32::from(new.start())) != shifted_start
                || i64::from(u32::from(new.end())) != shifted_end
            {
                return false;
            }
        }
        news.next().is_none()
    }

    /// Next unvisited element and its old-text start, popping exhausted
    /// frames.
    fn peek_element(&mut self) -> Option<(Green, TextSize)> {
        loop {
            let (node, index) = self.stack.last()?;
            match node.children().get(*index) {
                Some(child) => return Some((child.clone(), self.offset)),
                None => {
                    self.stack.pop();
                }
            }
        }
    }

    /// Advances past the current element.
    fn skip(&mut self) {
        if let Some((node, index)) = self.stack.last_mut() {
            if let Some(child) = node.children().get(*index) {
                self.offset += child.width();
                *index += 1;
            }
        }
    }

    /// Steps into the current element (which must be a node).
    fn descend(&mut self) {
        let child = {
            let (node, index) = self.stack.last().expect("descend requires a current frame");
            match node.children().get(*index) {
                Some(Green::Node(child)) => child.clone(),
                _ => return,
            }
        };
        // The parent's frame is advanced now; offsets accumulate through the
        // child's own children, summing to the same width.
        self.stack.last_mut().expect("frame exists").1 += 1;
        self.stack.push((child, 0));
    }

    /// Positions the cursor at a reusable node of one of `kinds` for the
    /// parser position `new_pos`, without consuming it. The `first_*`
    /// arguments describe the token the parser's lexer produced at `new_pos`
    /// and implement the boundary re-lex check. When `parents` is given, the
    /// candidate's old parent kind must be in the set; value nodes are only
    /// interchangeable between equal lexing contexts, and the old parent is
    /// what records the context a value was lexed in.
    pub(crate) fn candidate(
        &mut self,
        kinds: SyntaxSet,
        parents: Option<SyntaxSet>,
        new_pos: TextSize,
        first_kind: SyntaxKind,
        first_width: TextSize,
        first_leading: TextSize,
    ) -> Option<GreenNode> {
        let old_pos = self.map_new_to_old(new_pos)?;
        loop {
            let (element, start) = self.peek_element()?;
            let end = start + element.width();
            if end <= old_pos {
                self.skip();
                continue;
            }
            if start < old_pos {
                // The position falls inside this element: only finer
                // granularity can help.
                match element {
                    Green::Node(_) => {
                        self.descend();
                        continue;
                    }
                    Green::Token(_) => return None,
                }
            }
            match element {
                Green::Token(_) => return None,
                Green::Node(node) => {
                    if !kinds.contains(node.kind()) {
                        self.descend();
                        continue;
                    }
                    let parent_ok = parents.is_none_or(|parents| {
                        self.stack
                            .last()
                            .is_some_and(|(parent, _)| parents.contains(parent.kind()))
                    });
                    if parent_ok
                        && self.node_reusable(
                            &node,
                            start,
                            new_pos,
                            first_kind,
                            first_width,
                            first_leading,
                        )
                    {
                        return Some(node);
                    }
                    // Right kind but not reusable as a whole; descend so its
                    // untouched children and tokens can still be shared.
                    self.descend();
                    return None;
                }
            }
        }
    }

    /// Consumes the candidate returned by the last successful
    /// [`Blender::candidate`] call.
    pub(crate) fn consume(&mut self) {
        self.skip();
    }

    fn node_reusable(
        &self,
        node: &GreenNode,
        old_start: TextSize,
        new_pos: TextSize,
        first_kind: SyntaxKind,
        first_width: TextSize,
        first_leading: TextSize,
    ) -> bool {
        let width = node.width();
        if width == TextSize::new(0) || !node.is_clean() {
            return false;
        }
        let old_span = TextRange::at(old_start, width);
        if !self.changes_clear(old_span) {
            return false;
        }
        let shift = i64::from(u32::from(new_pos)) - i64::from(u32::from(old_start));
        if !self.interpolations_consistent(old_span, shift) {
            return false;
        }
        let Some(first) = node.first_token() else { return false };
        first.kind() == first_kind
            && first.width() == first_width
            && first.leading().len() == first_leading
    }

    /// Attempts to share the identical old token at `new_pos` instead of the
    /// freshly lexed `fresh`. The output tree is the same either way; sharing
    /// feeds the reuse telemetry and keeps allocations down.
    pub(crate) fn try_token(&mut self, new_pos: TextSize, fresh: &GreenToken) -> Option<GreenToken> {
        if fresh.kind() == SyntaxKind::EOF || fresh.width() == TextSize::new(0) {
            return None;
        }
        let old_pos = self.map_new_to_old(new_pos)?;
        loop {
            let (element, start) = self.peek_element()?;
            let end = start + element.width();
            if end <= old_pos {
                self.skip();
                continue;
            }
            if start < old_pos {
                match element {
                    Green::Node(_) => {
                        self.descend();
                        continue;
                    }
                    Green::Token(_) => return None,
                }
            }
            match element {
                Green::Node(_) => {
                    self.descend();
                    continue;
                }
                Green::Token(old) => {
                    let old_span = TextRange::at(start, old.width());
                    if old.flags().is_empty() && self.changes_clear(old_span) && old == *fresh {
                        self.skip();
                        return Some(old);
                    }
                    return None;
                }
            }
        }
    }
}
