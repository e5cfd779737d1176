//! Parser and incremental reparser for the embedded markup language.
//!
//! [`parse`] builds a full-fidelity [`Document`] from a
//! [`wattle_text::SourceText`]; [`reparse`] does the same against a previous
//! document, reusing every subtree the edit provably did not touch. The
//! grammar is total: malformed source yields a tree laden with diagnostics,
//! never an error. Only malformed *edit descriptions* fail hard, and they do
//! so in `wattle-text` before a parser ever runs.

use std::panic::{AssertUnwindSafe, catch_unwind, resume_unwind};

use text_size::TextRange;
use tokio_util::sync::CancellationToken;
use wattle_text::{ChangeRange, SourceText};

mod blender;
mod document;
mod grammar;
mod parser;
#[cfg(test)]
mod tests;

pub use document::{Document, ReusedRange};

use blender::Blender;

/// A cooperative cancellation observed between node productions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cancelled;

impl Cancelled {
    pub(crate) fn throw() -> ! {
        resume_unwind(Box::new(Cancelled))
    }

    fn catch<T>(f: impl FnOnce() -> T) -> Result<T, Cancelled> {
        match catch_unwind(AssertUnwindSafe(f)) {
            Ok(value) => Ok(value),
            Err(payload) => match payload.downcast::<Cancelled>() {
                Ok(cancelled) => Err(*cancelled),
                Err(payload) => resume_unwind(payload),
            },
        }
    }
}

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("the parse was cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// Parses `text` from scratch.
///
/// `interpolations` marks the spans substituted by the host as opaque
/// content; each becomes a single interpolation token. The list is a
/// description, not source text, but unlike edit descriptions it is
/// normalized defensively (sorted, clamped, overlaps merged) instead of
/// failing.
pub fn parse(text: &SourceText, interpolations: &[TextRange]) -> Document {
    let interpolations = normalize_interpolations(interpolations, text);
    parse_impl(text, &interpolations, None, &CancellationToken::new())
}

/// [`parse`] with a cancellation signal, polled at node boundaries.
pub fn parse_cancelable(
    text: &SourceText,
    interpolations: &[TextRange],
    cancel: &CancellationToken,
) -> Result<Document, Cancelled> {
    let interpolations = normalize_interpolations(interpolations, text);
    Cancelled::catch(|| parse_impl(text, &interpolations, None, cancel))
}

/// Reparses after an edit, deriving the change ranges from the recorded
/// lineage between `old`'s text and `text` (possibly several generations
/// apart). Falls back to a full replacement, and therefore a full parse,
/// when no lineage connects the two.
pub fn reparse(old: &Document, text: &SourceText, interpolations: &[TextRange]) -> Document {
    let changes = text.change_ranges(old.text());
    reparse_with_changes(old, text, interpolations, &changes)
}

/// Reparses with an explicit, already-composed change-range list describing
/// how to get from `old`'s text to `text`.
pub fn reparse_with_changes(
    old: &Document,
    text: &SourceText,
    interpolations: &[TextRange],
    changes: &[ChangeRange],
) -> Document {
    let interpolations = normalize_interpolations(interpolations, text);
    let blender = Blender::new(
        old.green().clone(),
        old.interpolations().into(),
        interpolations.clone().into(),
        changes,
    );
    parse_impl(text, &interpolations, Some(blender), &CancellationToken::new())
}

/// [`reparse`] with a cancellation signal.
pub fn reparse_cancelable(
    old: &Document,
    text: &SourceText,
    interpolations: &[TextRange],
    cancel: &CancellationToken,
) -> Result<Document, Cancelled> {
    let changes = text.change_ranges(old.text());
    let interpolations = normalize_interpolations(interpolations, text);
    let blender = Blender::new(
        old.green().clone(),
        old.interpolations().into(),
        interpolations.clone().into(),
        &changes,
    );
    Cancelled::catch(|| parse_impl(text, &interpolations, Some(blender), cancel))
}

fn parse_impl(
    text: &SourceText,
    interpolations: &[TextRange],
    blender: Option<Blender>,
    cancel: &CancellationToken,
) -> Document {
    let mut parser = parser::Parser::new(text, interpolations, blender, cancel.clone());
    grammar::document(&mut parser);
    let (root, reused) = parser.finish();
    debug_assert_eq!(root.width(), text.len(), "the tree must cover the buffer exactly");
    Document::new(text.clone(), root, reused)
}

fn normalize_interpolations(spans: &[TextRange], text: &SourceText) -> Vec<TextRange> {
    let len = text.len();
    let mut spans: Vec<TextRange> = spans
        .iter()
        .map(|span| TextRange::new(span.start().min(len), span.end().min(len)))
        .filter(|span| !span.is_empty())
        .collect();
    spans.sort_by_key(|span| (span.start(), span.end()));
    let mut out: Vec<TextRange> = Vec::with_capacity(spans.len());
    for span in spans {
        if let Some(last) = out.last_mut() {
            if span.start() < last.end() {
                *last = TextRange::new(last.start(), last.end().max(span.end()));
                continue;
            }
        }
        out.push(span);
    }
    out
}
