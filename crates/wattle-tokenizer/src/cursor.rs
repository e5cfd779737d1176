use std::str::Chars;

use text_size::{TextLen, TextSize};
use wattle_text::SourceText;

pub(crate) const EOF_CHAR: char = '\0';

/// Char cursor over a [`SourceText`], transparently crossing rope segments.
pub(crate) struct Cursor<'t> {
    text: &'t SourceText,
    pos: TextSize,
    chunk: Chars<'t>,
}

impl<'t> Cursor<'t> {
    pub(crate) fn new(text: &'t SourceText, pos: TextSize) -> Self {
        let mut cursor = Self { text, pos, chunk: "".chars() };
        cursor.seek(pos);
        cursor
    }

    pub(crate) fn pos(&self) -> TextSize {
        self.pos
    }

    pub(crate) fn is_eof(&self) -> bool {
        self.pos >= self.text.len()
    }

    pub(crate) fn seek(&mut self, pos: TextSize) {
        self.pos = pos;
        self.chunk = self.text.chunk_at(pos).chars();
    }

    pub(crate) fn peek(&self) -> char {
        // The chunk is refilled eagerly, so an empty chunk means end of input.
        self.chunk.clone().next().unwrap_or(EOF_CHAR)
    }

    pub(crate) fn second(&self) -> char {
        let mut chars = self.chunk.clone();
        match chars.next() {
            Some(first) => chars
                .next()
                .or_else(|| self.text.char_at(self.pos + first.text_len()))
                .unwrap_or(EOF_CHAR),
            None => EOF_CHAR,
        }
    }

    /// Whether the text at the cursor starts with `expected`.
    pub(crate) fn at_str(&self, expected: &str) -> bool {
        let mut pos = self.pos;
        for expected in expected.chars() {
            match self.text.char_at(pos) {
                Some(c) if c == expected => pos += c.text_len(),
                _ => return false,
            }
        }
        true
    }

    pub(crate) fn advance(&mut self) -> char {
        match self.chunk.next() {
            Some(c) => {
                self.pos += c.text_len();
                if self.chunk.as_str().is_empty() && !self.is_eof() {
                    self.chunk = self.text.chunk_at(self.pos).chars();
                }
                c
            }
            None => EOF_CHAR,
        }
    }

    /// Advances while `f` holds, never crossing `limit`.
    pub(crate) fn advance_while(&mut self, limit: TextSize, f: impl Fn(char) -> bool) {
        while self.pos < limit && f(self.peek()) {
            self.advance();
        }
    }
}
