//! One routine per grammar production.
//!
//! Every routine first asks the parser whether the previous tree has a
//! reusable node of the expected kind at the current position, so the
//! incremental and from-scratch code paths are the same functions; a
//! non-incremental parse is simply one where reuse never succeeds.

use text_size::TextRange;
use wattle_errors::{Diagnostic, DiagnosticCode};
use wattle_syntax::SyntaxKind::{self, *};
use wattle_syntax::SyntaxSet;
use wattle_tokenizer::LexMode;

use crate::parser::Parser;

const ELEMENT_ONLY: SyntaxSet = SyntaxSet::new([ELEMENT]);
const ATTRIBUTE_ONLY: SyntaxSet = SyntaxSet::new([ATTRIBUTE]);
const ATTRIBUTE_LIST_ONLY: SyntaxSet = SyntaxSet::new([ATTRIBUTE_LIST]);
const CHILD_LIST_ONLY: SyntaxSet = SyntaxSet::new([CHILD_LIST]);
const VALUE_NODES: SyntaxSet =
    SyntaxSet::new([SCALAR_VALUE, INTERPOLATION_VALUE, MULTIPART_VALUE]);
const ATTRIBUTE_VALUES: SyntaxSet =
    SyntaxSet::new([STRING_LITERAL, SCALAR_VALUE, INTERPOLATION_VALUE, ELEMENT]);
const ATTRIBUTE_PARENT: SyntaxSet = SyntaxSet::new([ATTRIBUTE]);
/// A reused value node must not be continued by the token after it.
const RUN_TOKENS: SyntaxSet = SyntaxSet::new([TEXT, INTERPOLATION]);

pub(crate) fn document(p: &mut Parser<'_>) {
    p.start_node(DOCUMENT);
    loop {
        p.check_cancelled();
        match p.peek_kind() {
            EOF => break,
            LESS_THAN => {
                let before = p.pos();
                element(p);
                if p.pos() == before {
                    // Zero-width parse; force progress so the root loop
                    // terminates.
                    force_progress(p);
                }
            }
            _ => invalid_root(p),
        }
    }
    p.expect(EOF);
    p.finish_node();
}

fn force_progress(p: &mut Parser<'_>) {
    let start = p.pos();
    let anchor = p.peek_anchor();
    let found = p.peek_kind();
    p.start_node(INVALID);
    p.bump();
    p.finish_node_with(vec![Diagnostic::error(
        DiagnosticCode::UnexpectedToken,
        format!("unexpected {}", found.describe()),
        anchor - start,
    )]);
}

fn invalid_root(p: &mut Parser<'_>) {
    let start = p.pos();
    let anchor = p.peek_anchor();
    p.start_node(INVALID);
    match p.peek_kind() {
        LESS_THAN_SLASH => {
            closing_tag(p);
        }
        _ => p.bump(),
    }
    p.finish_node_with(vec![Diagnostic::error(
        DiagnosticCode::InvalidRootElement,
        "expected an element at the top level",
        anchor - start,
    )]);
}

/// `<name attrs ... />`, `<name attrs ...> children </name>`, or the
/// nameless fragment forms.
pub(crate) fn element(p: &mut Parser<'_>) {
    p.check_cancelled();
    if p.try_reuse(ELEMENT_ONLY, None, None) {
        return;
    }
    debug_assert!(p.at(LESS_THAN));

    let start = p.pos();
    let open_anchor = p.peek_anchor();
    let mut diagnostics = Vec::new();
    p.start_node(ELEMENT);
    p.bump();
    p.push_mode(LexMode::Tag);

    // Fragment disambiguation, lookahead 1: `<>` and `<name=` mean the tag
    // itself is nameless and `name` belongs to the first attribute.
    let mut name = None;
    let mut name_anchor = open_anchor;
    if p.at(IDENTIFIER) && !p.at_attribute_name() {
        name_anchor = p.peek_anchor();
        name = Some(p.peek_token_text());
        p.bump();
    } else if !p.at(IDENTIFIER) && !p.at(GREATER_THAN) {
        diagnostics.push(Diagnostic::error(
            DiagnosticCode::MissingElementIdentifier,
            "expected an element name after '<'",
            open_anchor - start,
        ));
        p.bump_missing(IDENTIFIER, Vec::new());
    }

    attribute_list(p);

    match p.peek_kind() {
        SLASH_GREATER_THAN => {
            p.bump();
            p.pop_mode();
        }
        GREATER_THAN => {
            p.bump();
            p.pop_mode();
            p.push_mode(LexMode::ElementValue);

            if !p.try_reuse(CHILD_LIST_ONLY, None, None) {
                p.start_node(CHILD_LIST);
                element_children(p);
                p.finish_node();
            }

            if p.at(LESS_THAN_SLASH) {
                let checkpoint = p.checkpoint();
                let closing_name = closing_tag(p);
                if closing_name == name {
                    checkpoint.commit();
                } else {
                    // Mismatched closing tag: give it back to an enclosing
                    // element and close this one with synthesized tokens.
                    p.rewind(checkpoint);
                    missing_closing_tag(p, name.as_deref(), name_anchor - start, &mut diagnostics);
                }
            } else {
                missing_closing_tag(p, name.as_deref(), name_anchor - start, &mut diagnostics);
            }
            p.pop_mode();
        }
        _ => {
            // Neither `/>` nor `>`: record the missing close and treat the
            // element as unclosed.
            p.expect(GREATER_THAN);
            p.pop_mode();
            missing_closing_tag(p, name.as_deref(), name_anchor - start, &mut diagnostics);
        }
    }

    p.finish_node_with(diagnostics);
}

fn missing_closing_tag(
    p: &mut Parser<'_>,
    name: Option<&str>,
    anchor: TextRange,
    diagnostics: &mut Vec<Diagnostic>,
) {
    p.start_node(CLOSING_TAG);
    p.bump_missing(LESS_THAN_SLASH, Vec::new());
    if name.is_some() {
        p.bump_missing(IDENTIFIER, Vec::new());
    }
    p.bump_missing(GREATER_THAN, Vec::new());
    p.finish_node();

    let message = match name {
        Some(name) => format!("missing closing tag for element `{name}`"),
        None => "missing closing tag for fragment".to_string(),
    };
    diagnostics.push(Diagnostic::error(
        DiagnosticCode::MissingElementClosingTag,
        message,
        anchor,
    ));
}

/// `</name>` or `</>`; returns the closing name for matching against the
/// opening tag. The fragment lookahead applies here exactly as it does on
/// opening tags.
fn closing_tag(p: &mut Parser<'_>) -> Option<String> {
    debug_assert!(p.at(LESS_THAN_SLASH));
    p.start_node(CLOSING_TAG);
    p.bump();
    p.push_mode(LexMode::Tag);
    let mut name = None;
    if p.at(IDENTIFIER) && !p.at_attribute_name() {
        name = Some(p.peek_token_text());
        p.bump();
    }
    p.expect(GREATER_THAN);
    p.pop_mode();
    p.finish_node();
    name
}

fn attribute_list(p: &mut Parser<'_>) {
    if p.try_reuse(ATTRIBUTE_LIST_ONLY, None, None) {
        return;
    }
    p.start_node(ATTRIBUTE_LIST);
    while p.at(IDENTIFIER) {
        attribute(p);
    }
    p.finish_node();
}

/// `name` or `name=value`.
fn attribute(p: &mut Parser<'_>) {
    p.check_cancelled();
    if p.try_reuse(ATTRIBUTE_ONLY, None, None) {
        return;
    }
    debug_assert!(p.at(IDENTIFIER));

    let start = p.pos();
    let name_anchor = p.peek_anchor();
    let name = p.peek_token_text();
    let mut diagnostics = Vec::new();
    p.start_node(ATTRIBUTE);
    p.bump();

    if p.at(EQUALS) {
        p.bump();
        p.push_mode(LexMode::AttributeValue);
        if !attribute_value(p) {
            diagnostics.push(Diagnostic::error(
                DiagnosticCode::MissingAttributeValue,
                format!("attribute `{name}` is missing a value"),
                name_anchor - start,
            ));
        }
        p.pop_mode();
    }

    p.finish_node_with(diagnostics);
}

/// The value after `name=`. Returns `false` when no value follows.
fn attribute_value(p: &mut Parser<'_>) -> bool {
    if p.try_reuse(ATTRIBUTE_VALUES, Some(ATTRIBUTE_PARENT), None) {
        return true;
    }
    match p.peek_kind() {
        STRING_START => {
            string_literal(p);
            true
        }
        INTERPOLATION => {
            let mark = p.mark();
            p.bump();
            p.wrap_node(mark, INTERPOLATION_VALUE, Vec::new());
            true
        }
        TEXT => {
            let mark = p.mark();
            p.bump();
            p.wrap_node(mark, SCALAR_VALUE, Vec::new());
            true
        }
        LESS_THAN => {
            element(p);
            true
        }
        _ => false,
    }
}

/// `"..."`-style value. The opening quote run's character and length scope
/// the string mode so shorter runs of the same quote stay content.
fn string_literal(p: &mut Parser<'_>) {
    debug_assert!(p.at(STRING_START));
    let start = p.pos();
    let anchor = p.peek_anchor();
    let start_text = p.peek_token_text();
    let quote = start_text.chars().next().unwrap_or('"');
    let run = start_text.chars().count() as u32;

    p.start_node(STRING_LITERAL);
    p.bump();
    p.push_mode(LexMode::StringLiteral { quote, run });

    if matches!(p.peek_kind(), TEXT | INTERPOLATION) {
        value_run(p, STRING_LITERAL);
    }

    let mut diagnostics = Vec::new();
    if p.at(STRING_END) {
        p.bump();
    } else {
        diagnostics.push(Diagnostic::error(
            DiagnosticCode::InvalidStringLiteralToken,
            "unterminated string literal",
            anchor - start,
        ));
        p.bump_missing(STRING_END, Vec::new());
    }
    p.pop_mode();
    p.finish_node_with(diagnostics);
}

fn element_children(p: &mut Parser<'_>) {
    loop {
        p.check_cancelled();
        match p.peek_kind() {
            TEXT | INTERPOLATION => value_run(p, CHILD_LIST),
            LESS_THAN => element(p),
            LESS_THAN_SLASH | EOF => break,
            _ => {
                let start = p.pos();
                let anchor = p.peek_anchor();
                let found = p.peek_kind();
                p.start_node(INVALID);
                p.bump();
                p.finish_node_with(vec![Diagnostic::error(
                    DiagnosticCode::InvalidElementChildToken,
                    format!("unexpected {} in element content", found.describe()),
                    anchor - start,
                )]);
            }
        }
    }
}

/// Collapses a run of text/interpolation tokens into a single value node.
/// The node kind is a pure function of the run: one text token is a scalar,
/// one interpolation is an interpolation value, anything longer is
/// multipart. `context` is the node kind the run is lexed under; reuse must
/// not cross lexing contexts.
fn value_run(p: &mut Parser<'_>, context: SyntaxKind) {
    if p.try_reuse(VALUE_NODES, Some(SyntaxSet::new([context])), Some(RUN_TOKENS)) {
        return;
    }
    let mark = p.mark();
    let mut texts = 0usize;
    let mut interpolations = 0usize;
    while matches!(p.peek_kind(), TEXT | INTERPOLATION) {
        if p.peek_kind() == TEXT {
            texts += 1;
        } else {
            interpolations += 1;
        }
        p.bump();
    }
    let kind: SyntaxKind = match (texts, interpolations) {
        (1, 0) => SCALAR_VALUE,
        (0, 1) => INTERPOLATION_VALUE,
        _ => MULTIPART_VALUE,
    };
    p.wrap_node(mark, kind, Vec::new());
}
