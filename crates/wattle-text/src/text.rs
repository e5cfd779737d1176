use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use text_size::{TextLen, TextRange, TextSize};

use crate::change::{ChangeRange, compose_all};
use crate::error::EditError;

/// Immutable, cheaply clonable source buffer.
///
/// All offsets are byte offsets and must fall on character boundaries.
#[derive(Clone)]
pub struct SourceText {
    inner: Arc<TextInner>,
}

struct TextInner {
    repr: Repr,
    len: TextSize,
    line_starts: OnceLock<Box<[TextSize]>>,
}

enum Repr {
    /// A plain owned string.
    Flat(Box<str>),
    /// A view into a span of a base buffer.
    Sub { base: SourceText, span: TextRange },
    /// Ordered segments with their cumulative start offsets. Never nests:
    /// composite segments are spliced flat on construction.
    Composite { segments: Box<[SourceText]>, starts: Box<[TextSize]> },
    /// An edited buffer. `old` is weak so history can be collected while the
    /// change-range chain survives for diffing.
    Changed { old: WeakSourceText, text: SourceText, ranges: Box<[ChangeRange]> },
}

/// A single replacement: `span` of the old text becomes `text`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChange {
    pub span: TextRange,
    pub text: String,
}

impl TextChange {
    pub fn new(span: TextRange, text: impl Into<String>) -> Self {
        Self { span, text: text.into() }
    }

    pub fn insert(offset: TextSize, text: impl Into<String>) -> Self {
        Self::new(TextRange::empty(offset), text)
    }

    pub fn delete(span: TextRange) -> Self {
        Self::new(span, String::new())
    }
}

/// Weak handle to a [`SourceText`], used for predecessor links.
#[derive(Clone)]
pub struct WeakSourceText {
    inner: Weak<TextInner>,
}

impl WeakSourceText {
    pub fn upgrade(&self) -> Option<SourceText> {
        self.inner.upgrade().map(|inner| SourceText { inner })
    }
}

/// Zero-based line/column position; the column is a byte offset into the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineCol {
    pub line: u32,
    pub col: u32,
}

impl SourceText {
    pub fn empty() -> Self {
        Self::flat("")
    }

    fn flat(text: &str) -> Self {
        Self::with_repr(Repr::Flat(text.into()), text.text_len())
    }

    fn with_repr(repr: Repr, len: TextSize) -> Self {
        Self { inner: Arc::new(TextInner { repr, len, line_starts: OnceLock::new() }) }
    }

    pub fn len(&self) -> TextSize {
        self.inner.len
    }

    pub fn is_empty(&self) -> bool {
        self.inner.len == TextSize::new(0)
    }

    pub fn downgrade(&self) -> WeakSourceText {
        WeakSourceText { inner: Arc::downgrade(&self.inner) }
    }

    /// Returns `true` when both handles point at the same allocation.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns the character starting at `offset`, if any.
    pub fn char_at(&self, offset: TextSize) -> Option<char> {
        if offset >= self.len() {
            return None;
        }
        self.chunk_at(offset).chars().next()
    }

    /// Returns the longest contiguous `&str` starting at `offset`.
    ///
    /// The chunk is never empty unless `offset` is at the end of the buffer.
    pub fn chunk_at(&self, offset: TextSize) -> &str {
        assert!(offset <= self.len(), "offset {offset:?} out of bounds ({:?})", self.len());
        if offset == self.len() {
            return "";
        }
        match &self.inner.repr {
            Repr::Flat(text) => &text[usize::from(offset)..],
            Repr::Sub { base, span } => {
                let chunk = base.chunk_at(span.start() + offset);
                let available = usize::from(span.end() - span.start() - offset);
                &chunk[..chunk.len().min(available)]
            }
            Repr::Composite { segments, starts } => {
                let index = starts.partition_point(|&start| start <= offset) - 1;
                segments[index].chunk_at(offset - starts[index])
            }
            Repr::Changed { text, .. } => text.chunk_at(offset),
        }
    }

    /// Copies the text covered by `span` out of the buffer.
    pub fn slice(&self, span: TextRange) -> String {
        assert!(span.end() <= self.len(), "span {span:?} out of bounds ({:?})", self.len());
        let mut out = String::with_capacity(span.len().into());
        let mut pos = span.start();
        while pos < span.end() {
            let chunk = self.chunk_at(pos);
            debug_assert!(!chunk.is_empty());
            let take = usize::from(span.end() - pos).min(chunk.len());
            out.push_str(&chunk[..take]);
            pos += TextSize::new(take as u32);
        }
        out
    }

    /// Iterates the characters of the buffer across all segments.
    pub fn chars(&self) -> TextChars<'_> {
        TextChars { text: self, pos: TextSize::new(0), chunk: self.chunk_at(TextSize::new(0)).chars() }
    }

    /// Compares the textual content of two buffers, regardless of shape.
    pub fn content_eq(&self, other: &Self) -> bool {
        if self.ptr_eq(other) {
            return true;
        }
        if self.len() != other.len() {
            return false;
        }
        let mut pos = TextSize::new(0);
        while pos < self.len() {
            let lhs = self.chunk_at(pos);
            let rhs = other.chunk_at(pos);
            let n = lhs.len().min(rhs.len());
            debug_assert!(n > 0);
            // Compare bytes: `n` is the shorter chunk's length and may not be
            // a character boundary of the longer one.
            if lhs.as_bytes()[..n] != rhs.as_bytes()[..n] {
                return false;
            }
            pos += TextSize::new(n as u32);
        }
        true
    }

    fn is_char_boundary(&self, offset: TextSize) -> bool {
        if offset == TextSize::new(0) || offset >= self.len() {
            return offset <= self.len();
        }
        match &self.inner.repr {
            Repr::Flat(text) => text.is_char_boundary(offset.into()),
            Repr::Sub { base, span } => base.is_char_boundary(span.start() + offset),
            Repr::Composite { segments, starts } => {
                let index = starts.partition_point(|&start| start <= offset) - 1;
                segments[index].is_char_boundary(offset - starts[index])
            }
            Repr::Changed { text, .. } => text.is_char_boundary(offset),
        }
    }

    /// Returns a view of `span`: the buffer itself when the span covers it
    /// entirely, an empty flat text for an empty span, a sub-text otherwise.
    pub fn sub_text(&self, span: TextRange) -> Self {
        assert!(span.end() <= self.len(), "span {span:?} out of bounds ({:?})", self.len());
        assert!(
            self.is_char_boundary(span.start()) && self.is_char_boundary(span.end()),
            "span {span:?} does not fall on character boundaries",
        );
        if span == TextRange::up_to(self.len()) {
            return self.clone();
        }
        if span.is_empty() {
            return Self::empty();
        }
        match &self.inner.repr {
            // Views never stack: re-base onto the underlying buffer.
            Repr::Sub { base, span: base_span } => base.sub_text(span + base_span.start()),
            Repr::Changed { text, .. } => text.sub_text(span),
            _ => Self::with_repr(Repr::Sub { base: self.clone(), span }, span.len()),
        }
    }

    /// Builds a composite from `segments`, splicing nested composites flat and
    /// dropping empty segments.
    fn composite(segments: Vec<SourceText>) -> Self {
        fn push_flat(out: &mut Vec<SourceText>, segment: SourceText) {
            match &segment.inner.repr {
                Repr::Composite { segments, .. } => {
                    for child in segments {
                        push_flat(out, child.clone());
                    }
                }
                Repr::Changed { text, .. } => push_flat(out, text.clone()),
                _ => {
                    if !segment.is_empty() {
                        out.push(segment);
                    }
                }
            }
        }

        let mut flat = Vec::with_capacity(segments.len());
        for segment in segments {
            push_flat(&mut flat, segment);
        }
        match flat.len() {
            0 => Self::empty(),
            1 => flat.pop().expect("one segment"),
            _ => {
                let mut starts = Vec::with_capacity(flat.len());
                let mut len = TextSize::new(0);
                for segment in &flat {
                    starts.push(len);
                    len += segment.len();
                }
                Self::with_repr(
                    Repr::Composite { segments: flat.into(), starts: starts.into() },
                    len,
                )
            }
        }
    }

    /// Applies an ordered, non-overlapping list of changes, producing a new
    /// buffer that remembers this one as its predecessor.
    pub fn with_changes(&self, changes: &[TextChange]) -> Result<Self, EditError> {
        if changes.is_empty() {
            return Ok(self.clone());
        }

        let mut previous: Option<TextRange> = None;
        for change in changes {
            let span = change.span;
            if span.end() > self.len() {
                return Err(EditError::OutOfBounds { span, len: self.len() });
            }
            if !self.is_char_boundary(span.start()) || !self.is_char_boundary(span.end()) {
                return Err(EditError::NotCharBoundary { span });
            }
            if let Some(previous) = previous {
                if span.start() < previous.start() {
                    return Err(EditError::OutOfOrder { previous, span });
                }
                if span.start() < previous.end() {
                    return Err(EditError::Overlapping { previous, span });
                }
            }
            previous = Some(span);
        }

        let mut segments = Vec::with_capacity(changes.len() * 2 + 1);
        let mut ranges = Vec::with_capacity(changes.len());
        let mut pos = TextSize::new(0);
        for change in changes {
            if pos < change.span.start() {
                segments.push(self.sub_text(TextRange::new(pos, change.span.start())));
            }
            if !change.text.is_empty() {
                segments.push(Self::flat(&change.text));
            }
            pos = change.span.end();
            ranges.push(ChangeRange::new(change.span, change.text.text_len()));
        }
        if pos < self.len() {
            segments.push(self.sub_text(TextRange::new(pos, self.len())));
        }

        let text = Self::composite(segments);
        let len = text.len();
        Ok(Self::with_repr(
            Repr::Changed { old: self.downgrade(), text, ranges: ranges.into() },
            len,
        ))
    }

    /// Describes how to get from `old` to `self`.
    ///
    /// Returns the empty list when the two are textually identical, the
    /// composed change-range chain when recorded lineage connects them, and a
    /// single full replacement otherwise (including when the lineage has been
    /// collected in the meantime).
    pub fn change_ranges(&self, old: &Self) -> Vec<ChangeRange> {
        if self.ptr_eq(old) || self.content_eq(old) {
            return Vec::new();
        }

        let mut generations: Vec<Box<[ChangeRange]>> = Vec::new();
        let mut current = self.clone();
        loop {
            let (predecessor, ranges) = match &current.inner.repr {
                Repr::Changed { old, ranges, .. } => (old.clone(), ranges.clone()),
                _ => break,
            };
            generations.push(ranges);
            match predecessor.upgrade() {
                Some(predecessor) => {
                    if predecessor.ptr_eq(old) {
                        generations.reverse();
                        return compose_all(generations.iter().map(AsRef::as_ref));
                    }
                    current = predecessor;
                }
                None => break,
            }
        }

        vec![ChangeRange::new(TextRange::up_to(old.len()), self.len())]
    }

    /// Line start offsets, built lazily from a single left-to-right scan.
    ///
    /// Recognizes `\n`, `\r`, `\r\n`, U+0085, U+2028 and U+2029.
    pub fn line_starts(&self) -> &[TextSize] {
        self.inner.line_starts.get_or_init(|| compute_line_starts(self))
    }

    pub fn line_col(&self, offset: TextSize) -> LineCol {
        assert!(offset <= self.len(), "offset {offset:?} out of bounds ({:?})", self.len());
        let starts = self.line_starts();
        let line = starts.partition_point(|&start| start <= offset) - 1;
        LineCol { line: line as u32, col: (offset - starts[line]).into() }
    }

    pub fn line_start(&self, line: u32) -> Option<TextSize> {
        self.line_starts().get(line as usize).copied()
    }
}

fn compute_line_starts(text: &SourceText) -> Box<[TextSize]> {
    let mut starts = vec![TextSize::new(0)];
    let mut pos = TextSize::new(0);
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        pos += c.text_len();
        match c {
            '\r' => {
                if chars.peek() == Some(&'\n') {
                    chars.next();
                    pos += '\n'.text_len();
                }
                starts.push(pos);
            }
            '\n' | '\u{0085}' | '\u{2028}' | '\u{2029}' => starts.push(pos),
            _ => {}
        }
    }
    starts.into()
}

impl From<&str> for SourceText {
    fn from(text: &str) -> Self {
        Self::flat(text)
    }
}

impl From<String> for SourceText {
    fn from(text: String) -> Self {
        let len = text.text_len();
        Self::with_repr(Repr::Flat(text.into()), len)
    }
}

impl fmt::Display for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut pos = TextSize::new(0);
        while pos < self.len() {
            let chunk = self.chunk_at(pos);
            f.write_str(chunk)?;
            pos += chunk.text_len();
        }
        Ok(())
    }
}

impl fmt::Debug for SourceText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match &self.inner.repr {
            Repr::Flat(_) => "flat",
            Repr::Sub { .. } => "sub",
            Repr::Composite { .. } => "composite",
            Repr::Changed { .. } => "changed",
        };
        f.debug_struct("SourceText").field("shape", &shape).field("len", &self.len()).finish()
    }
}

/// Character iterator over a [`SourceText`], transparently crossing segments.
pub struct TextChars<'a> {
    text: &'a SourceText,
    pos: TextSize,
    chunk: std::str::Chars<'a>,
}

impl Iterator for TextChars<'_> {
    type Item = char;

    fn next(&mut self) -> Option<char> {
        loop {
            if let Some(c) = self.chunk.next() {
                self.pos += c.text_len();
                return Some(c);
            }
            if self.pos >= self.text.len() {
                return None;
            }
            self.chunk = self.text.chunk_at(self.pos).chars();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(start: u32, end: u32) -> TextRange {
        TextRange::new(TextSize::new(start), TextSize::new(end))
    }

    #[test]
    fn flat_access() {
        let text = SourceText::from("hello world");
        assert_eq!(text.len(), TextSize::new(11));
        assert_eq!(text.char_at(TextSize::new(0)), Some('h'));
        assert_eq!(text.char_at(TextSize::new(10)), Some('d'));
        assert_eq!(text.char_at(TextSize::new(11)), None);
        assert_eq!(text.slice(range(6, 11)), "world");
        assert_eq!(text.to_string(), "hello world");
    }

    #[test]
    fn sub_text_identity_and_views() {
        let text = SourceText::from("hello world");
        let whole = text.sub_text(range(0, 11));
        assert!(whole.ptr_eq(&text));

        let empty = text.sub_text(range(4, 4));
        assert!(empty.is_empty());

        let sub = text.sub_text(range(6, 11));
        assert_eq!(sub.to_string(), "world");
        assert_eq!(sub.char_at(TextSize::new(0)), Some('w'));

        // A view of a view re-bases onto the original buffer.
        let sub_sub = sub.sub_text(range(1, 3));
        assert_eq!(sub_sub.to_string(), "or");
    }

    #[test]
    fn with_changes_builds_composites() {
        let text = SourceText::from("hello world");
        let edited = text
            .with_changes(&[
                TextChange::new(range(0, 5), "goodbye"),
                TextChange::insert(TextSize::new(11), "!"),
            ])
            .unwrap();
        assert_eq!(edited.to_string(), "goodbye world!");
        assert_eq!(edited.len(), TextSize::new(14));
        assert_eq!(edited.slice(range(8, 13)), "world");
    }

    #[test]
    fn with_changes_rejects_overlap() {
        let text = SourceText::from("hello world");
        let err = text
            .with_changes(&[
                TextChange::new(range(0, 5), "a"),
                TextChange::new(range(4, 6), "b"),
            ])
            .unwrap_err();
        assert_eq!(
            err,
            EditError::Overlapping { previous: range(0, 5), span: range(4, 6) }
        );
    }

    #[test]
    fn with_changes_rejects_out_of_order() {
        let text = SourceText::from("hello world");
        let err = text
            .with_changes(&[
                TextChange::new(range(6, 7), "a"),
                TextChange::new(range(0, 1), "b"),
            ])
            .unwrap_err();
        assert_eq!(err, EditError::OutOfOrder { previous: range(6, 7), span: range(0, 1) });
    }

    #[test]
    fn with_changes_rejects_out_of_bounds() {
        let text = SourceText::from("short");
        let err = text.with_changes(&[TextChange::new(range(4, 9), "a")]).unwrap_err();
        assert_eq!(err, EditError::OutOfBounds { span: range(4, 9), len: TextSize::new(5) });
    }

    #[test]
    fn with_changes_rejects_split_characters() {
        let text = SourceText::from("aé");
        let err = text.with_changes(&[TextChange::new(range(2, 3), "x")]).unwrap_err();
        assert_eq!(err, EditError::NotCharBoundary { span: range(2, 3) });
    }

    #[test]
    fn change_ranges_identical_texts() {
        let a = SourceText::from("same");
        let b = SourceText::from("same");
        assert_eq!(a.change_ranges(&b), Vec::new());
    }

    #[test]
    fn change_ranges_through_lineage() {
        let a = SourceText::from("hello world");
        let b = a.with_changes(&[TextChange::new(range(0, 5), "goodbye")]).unwrap();
        let c = b.with_changes(&[TextChange::insert(TextSize::new(13), "!")]).unwrap();

        assert_eq!(c.to_string(), "goodbye world!");
        let ranges = c.change_ranges(&a);
        assert_eq!(
            ranges,
            vec![
                ChangeRange::new(range(0, 5), TextSize::new(7)),
                ChangeRange::new(range(11, 11), TextSize::new(1)),
            ]
        );
    }

    #[test]
    fn change_ranges_without_lineage_is_full_replace() {
        let a = SourceText::from("one");
        let b = SourceText::from("other");
        assert_eq!(
            b.change_ranges(&a),
            vec![ChangeRange::new(range(0, 3), TextSize::new(5))]
        );
    }

    #[test]
    fn change_ranges_survive_collected_predecessor_midway() {
        let a = SourceText::from("hello world");
        let b = a.with_changes(&[TextChange::new(range(0, 5), "goodbye")]).unwrap();
        let c = b.with_changes(&[TextChange::insert(TextSize::new(13), "!")]).unwrap();
        drop(b);

        // The intermediate generation is gone, so only a full replacement
        // remains between `a` and `c`.
        assert_eq!(
            c.change_ranges(&a),
            vec![ChangeRange::new(range(0, 11), TextSize::new(14))]
        );
    }

    #[test]
    fn line_starts_recognize_all_breaks() {
        let text = SourceText::from("a\nb\r\nc\rd\u{2028}e");
        let starts: Vec<u32> =
            text.line_starts().iter().map(|&offset| offset.into()).collect();
        assert_eq!(starts, vec![0, 2, 5, 7, 11]);

        assert_eq!(text.line_col(TextSize::new(0)), LineCol { line: 0, col: 0 });
        assert_eq!(text.line_col(TextSize::new(4)), LineCol { line: 1, col: 2 });
        assert_eq!(text.line_col(TextSize::new(11)), LineCol { line: 4, col: 0 });
    }

    #[test]
    fn composite_chars_cross_segments() {
        let text = SourceText::from("hello world");
        let edited = text.with_changes(&[TextChange::new(range(5, 6), "-->")]).unwrap();
        assert_eq!(edited.chars().collect::<String>(), "hello-->world");
        assert_eq!(edited.line_starts(), &[TextSize::new(0)]);
    }
}
