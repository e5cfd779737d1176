//! Mode-scoped tokenizer for the embedded markup language.
//!
//! The tokenizer is driven one token at a time: the parser owns the mode
//! stack and asks for the token at a given offset in a given mode, which is
//! also what lets the reconciler re-lex single tokens at arbitrary positions
//! during incremental parsing. Trivia never becomes a token of its own; it is
//! attached to the neighboring significant tokens, leading/trailing split at
//! the first line break.

mod cursor;

use cursor::Cursor;
use text_size::{TextRange, TextSize};
pub use wattle_syntax::SyntaxKind;
use wattle_syntax::SyntaxKind::*;
use wattle_syntax::{GreenTrivia, TriviaPiece, TriviaPieceKind};
use wattle_text::SourceText;

/// One significant token with its attached trivia.
#[derive(Debug, Clone)]
pub struct Token {
    pub leading: GreenTrivia,
    pub kind: SyntaxKind,
    pub kind_range: TextRange,
    pub trailing: GreenTrivia,
}

impl Token {
    /// Range including leading and trailing trivia.
    pub fn full_range(&self) -> TextRange {
        TextRange::new(
            self.kind_range.start() - self.leading.len(),
            self.kind_range.end() + self.trailing.len(),
        )
    }

    pub fn full_width(&self) -> TextSize {
        self.full_range().len()
    }
}

/// Lexing context. The parser pushes and pops these explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexMode {
    /// Top level, outside any element; expects tags.
    Default,
    /// Inside `<...>`: names, `=`, and tag punctuation.
    Tag,
    /// Start of an attribute value.
    AttributeValue,
    /// Inside a quoted value. `run` is the length of the opening quote run,
    /// so shorter runs of the same quote stay content.
    StringLiteral { quote: char, run: u32 },
    /// Raw text and interpolations between tags.
    ElementValue,
}

pub struct Tokenizer<'t> {
    text: &'t SourceText,
    /// Sorted, non-overlapping, non-empty spans treated as opaque
    /// interpolation tokens.
    interpolations: &'t [TextRange],
    cursor: Cursor<'t>,
    pieces: Vec<TriviaPiece>,
}

impl<'t> Tokenizer<'t> {
    pub fn new(text: &'t SourceText, interpolations: &'t [TextRange]) -> Self {
        debug_assert!(
            interpolations.windows(2).all(|pair| pair[0].end() <= pair[1].start()),
            "interpolation spans must be sorted and disjoint",
        );
        debug_assert!(interpolations.iter().all(|span| !span.is_empty()));
        debug_assert!(interpolations.last().is_none_or(|span| span.end() <= text.len()));
        Self {
            text,
            interpolations,
            cursor: Cursor::new(text, TextSize::new(0)),
            pieces: Vec::with_capacity(4),
        }
    }

    /// Lexes the token starting at `pos` (trivia included) in `mode`.
    pub fn token_at(&mut self, pos: TextSize, mode: LexMode) -> Token {
        self.cursor.seek(pos);

        self.pieces.clear();
        self.scan_trivia(mode, false);
        let leading = GreenTrivia::new(&self.pieces);

        let kind_start = self.cursor.pos();
        let kind = self.scan_kind(mode);
        let kind_range = TextRange::new(kind_start, self.cursor.pos());

        self.pieces.clear();
        // Tokens whose right context is content (element values, string
        // bodies) must not absorb that content as trivia.
        let take_trailing = !matches!(kind, EOF | GREATER_THAN | SLASH_GREATER_THAN | STRING_START);
        if take_trailing {
            self.scan_trivia(mode, true);
        }
        let trailing = GreenTrivia::new(&self.pieces);

        Token { leading, kind, kind_range, trailing }
    }

    fn interpolation_at(&self, pos: TextSize) -> Option<TextRange> {
        let index = self.interpolations.partition_point(|span| span.start() < pos);
        self.interpolations.get(index).filter(|span| span.start() == pos).copied()
    }

    /// First position after `pos` that scanning must not run past.
    fn scan_limit(&self, pos: TextSize) -> TextSize {
        let index = self.interpolations.partition_point(|span| span.start() <= pos);
        self.interpolations.get(index).map_or(self.text.len(), |span| span.start())
    }

    fn scan_trivia(&mut self, mode: LexMode, trailing: bool) {
        let (whitespace, comments) = match mode {
            LexMode::Default => (true, true),
            LexMode::Tag | LexMode::AttributeValue => (true, false),
            LexMode::ElementValue => (false, true),
            LexMode::StringLiteral { .. } => return,
        };
        loop {
            if self.cursor.is_eof() || self.interpolation_at(self.cursor.pos()).is_some() {
                break;
            }
            let start = self.cursor.pos();
            let c = self.cursor.peek();
            let kind = if whitespace && is_line_break(c) {
                self.cursor.advance();
                if c == '\r' && self.cursor.peek() == '\n' {
                    self.cursor.advance();
                }
                TriviaPieceKind::Newline
            } else if whitespace && c.is_whitespace() {
                let limit = self.scan_limit(start);
                self.cursor.advance_while(limit, |c| c.is_whitespace() && !is_line_break(c));
                TriviaPieceKind::Whitespace
            } else if comments && self.cursor.at_str("<!--") {
                self.scan_comment(self.scan_limit(start));
                TriviaPieceKind::Comment
            } else {
                break;
            };
            self.pieces.push(TriviaPiece::new(kind, self.cursor.pos() - start));
            if trailing && kind == TriviaPieceKind::Newline {
                break;
            }
        }
    }

    fn scan_comment(&mut self, limit: TextSize) {
        for _ in "<!--".chars() {
            self.cursor.advance();
        }
        while self.cursor.pos() < limit {
            if self.cursor.at_str("-->") {
                for _ in "-->".chars() {
                    self.cursor.advance();
                }
                return;
            }
            self.cursor.advance();
        }
    }

    fn scan_kind(&mut self, mode: LexMode) -> SyntaxKind {
        if self.cursor.is_eof() {
            return EOF;
        }
        let pos = self.cursor.pos();
        if let Some(span) = self.interpolation_at(pos) {
            self.cursor.seek(span.end());
            return INTERPOLATION;
        }
        let limit = self.scan_limit(pos);

        match mode {
            LexMode::Default => match self.cursor.peek() {
                '<' if self.cursor.at_str("</") => self.advance_with(2, LESS_THAN_SLASH),
                '<' => self.advance_with(1, LESS_THAN),
                _ => {
                    self.cursor.advance();
                    self.cursor.advance_while(limit, |c| c != '<' && !c.is_whitespace());
                    UNKNOWN
                }
            },
            LexMode::Tag => {
                let c = self.cursor.peek();
                match c {
                    '>' => self.advance_with(1, GREATER_THAN),
                    '/' if self.cursor.at_str("/>") => self.advance_with(2, SLASH_GREATER_THAN),
                    '=' => self.advance_with(1, EQUALS),
                    '<' if self.cursor.at_str("</") => self.advance_with(2, LESS_THAN_SLASH),
                    '<' => self.advance_with(1, LESS_THAN),
                    _ if is_name_start(c) => {
                        self.cursor.advance();
                        self.cursor.advance_while(limit, is_name_continue);
                        IDENTIFIER
                    }
                    _ => self.advance_with(1, UNKNOWN),
                }
            }
            LexMode::AttributeValue => {
                let c = self.cursor.peek();
                match c {
                    '"' | '\'' => {
                        self.cursor.advance_while(limit, |q| q == c);
                        STRING_START
                    }
                    '<' if self.cursor.at_str("</") => self.advance_with(2, LESS_THAN_SLASH),
                    '<' => self.advance_with(1, LESS_THAN),
                    '>' => self.advance_with(1, GREATER_THAN),
                    '/' if self.cursor.at_str("/>") => self.advance_with(2, SLASH_GREATER_THAN),
                    '=' => self.advance_with(1, EQUALS),
                    _ => {
                        self.cursor.advance();
                        self.cursor.advance_while(limit, |c| {
                            !c.is_whitespace() && !matches!(c, '<' | '>' | '/' | '"' | '\'' | '=')
                        });
                        TEXT
                    }
                }
            }
            LexMode::StringLiteral { quote, run } => {
                if self.cursor.peek() == quote && self.quote_run_len(quote, limit) >= run {
                    for _ in 0..run {
                        self.cursor.advance();
                    }
                    return STRING_END;
                }
                self.scan_string_text(quote, run, limit);
                TEXT
            }
            LexMode::ElementValue => match self.cursor.peek() {
                '<' if self.cursor.at_str("</") => self.advance_with(2, LESS_THAN_SLASH),
                '<' => self.advance_with(1, LESS_THAN),
                _ => {
                    self.cursor.advance();
                    self.cursor.advance_while(limit, |c| c != '<');
                    TEXT
                }
            },
        }
    }

    fn advance_with(&mut self, count: usize, kind: SyntaxKind) -> SyntaxKind {
        for _ in 0..count {
            self.cursor.advance();
        }
        kind
    }

    /// Length of the run of `quote` characters at the cursor, not consuming.
    fn quote_run_len(&self, quote: char, limit: TextSize) -> u32 {
        let mut pos = self.cursor.pos();
        let mut count = 0;
        while pos < limit && self.text.char_at(pos) == Some(quote) {
            count += 1;
            pos += TextSize::of(quote);
        }
        count
    }

    fn scan_string_text(&mut self, quote: char, run: u32, limit: TextSize) {
        while self.cursor.pos() < limit {
            if self.cursor.peek() == quote {
                let available = self.quote_run_len(quote, limit);
                if available >= run {
                    break;
                }
                // A shorter run of the same quote is content.
                for _ in 0..available {
                    self.cursor.advance();
                }
            } else {
                self.cursor.advance();
            }
        }
    }
}

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{0085}' | '\u{2028}' | '\u{2029}')
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_name_continue(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')
}
