use expect_test::expect;
use text_size::{TextRange, TextSize};
use tokio_util::sync::CancellationToken;
use wattle_errors::DiagnosticCode;
use wattle_syntax::SyntaxKind;
use wattle_syntax::ast::{self, AstNode as _};
use wattle_text::{ChangeRange, SourceText, TextChange};

use crate::{Document, parse, parse_cancelable, reparse, reparse_with_changes};

fn parse_str(text: &str) -> Document {
    parse(&SourceText::from(text), &[])
}

fn range(start: u32, end: u32) -> TextRange {
    TextRange::new(TextSize::new(start), TextSize::new(end))
}

#[test]
fn self_closed_element() {
    let document = parse_str("<foo />");
    assert_eq!(document.to_full_string(), "<foo />");
    assert!(document.all_diagnostics().is_empty());

    let root = ast::Document::cast(document.syntax()).unwrap();
    let element = root.elements().next().unwrap();
    assert_eq!(element.name().unwrap().text_trimmed(), "foo");
    assert!(element.is_self_closing());
    assert!(element.closing_tag().is_none());

    expect![[r#"
        DOCUMENT@0..7
          ELEMENT@0..7
            LESS_THAN@0..1 "<"
            IDENTIFIER@1..5 "foo "
            ATTRIBUTE_LIST@5..5
            SLASH_GREATER_THAN@5..7 "/>"
          EOF@7..7 ""
        Errors:
    "#]]
    .assert_eq(&document.debug_tree());
}

#[test]
fn unterminated_element_recovers() {
    let document = parse_str("<foo>bar");
    assert_eq!(document.to_full_string(), "<foo>bar");

    let diagnostics = document.all_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code(), DiagnosticCode::MissingElementClosingTag);
    // Anchored at `foo`, not at the position the parser noticed the problem.
    assert_eq!(diagnostics[0].range(), range(1, 4));

    expect![[r#"
        DOCUMENT@0..8
          ELEMENT@0..8
            LESS_THAN@0..1 "<"
            IDENTIFIER@1..4 "foo"
            ATTRIBUTE_LIST@4..4
            GREATER_THAN@4..5 ">"
            CHILD_LIST@5..8
              SCALAR_VALUE@5..8
                TEXT@5..8 "bar"
            CLOSING_TAG@8..8
              LESS_THAN_SLASH@8..8 missing
              IDENTIFIER@8..8 missing
              GREATER_THAN@8..8 missing
          EOF@8..8 ""
        Errors:
          missing closing tag for element `foo`
    "#]]
    .assert_eq(&document.debug_tree());
}

#[test]
fn incremental_edit_inside_string_literal() {
    let old_text = SourceText::from(r#"<foo bar="baz" />"#);
    let old = parse(&old_text, &[]);
    assert!(old.all_diagnostics().is_empty());

    let new_text = old_text
        .with_changes(&[TextChange::insert(TextSize::new(13), "2")])
        .unwrap();
    assert_eq!(new_text.to_string(), r#"<foo bar="baz2" />"#);

    let new = reparse(&old, &new_text, &[]);
    assert_eq!(new.to_full_string(), r#"<foo bar="baz2" />"#);

    // Identical to a from-scratch parse, node for node.
    let fresh = parse(&new_text, &[]);
    assert_eq!(new.green(), fresh.green());
    assert_eq!(new.debug_tree(), fresh.debug_tree());

    // The tag skeleton and both quote tokens are shared with the old tree;
    // the text token and its enclosing nodes are rebuilt.
    let reused_kinds: Vec<SyntaxKind> = new.reused().iter().map(|reuse| reuse.kind).collect();
    assert!(reused_kinds.contains(&SyntaxKind::LESS_THAN));
    assert!(reused_kinds.contains(&SyntaxKind::EQUALS));
    assert!(reused_kinds.contains(&SyntaxKind::STRING_START));
    assert!(reused_kinds.contains(&SyntaxKind::STRING_END));
    assert!(reused_kinds.contains(&SyntaxKind::SLASH_GREATER_THAN));
    assert_eq!(
        reused_kinds.iter().filter(|kind| **kind == SyntaxKind::IDENTIFIER).count(),
        2
    );
    assert!(!reused_kinds.contains(&SyntaxKind::TEXT));

    // Nothing reused may overlap the changed region.
    let changed = range(13, 14);
    for reuse in new.reused() {
        assert!(
            reuse.range.end() <= changed.start() || reuse.range.start() >= changed.end(),
            "{reuse:?} overlaps the edit",
        );
    }
}

#[test]
fn fragments_round_trip_without_diagnostics() {
    let document = parse_str("<>x</>");
    assert!(document.all_diagnostics().is_empty());
    assert_eq!(document.to_full_string(), "<>x</>");

    let root = ast::Document::cast(document.syntax()).unwrap();
    let element = root.elements().next().unwrap();
    assert!(element.name().is_none());
    assert!(element.closing_tag().is_some());
}

#[test]
fn identifier_followed_by_equals_is_an_attribute() {
    // `<foo="1">` reads as a nameless fragment carrying attribute `foo`,
    // by the lookahead-1 heuristic.
    let document = parse_str(r#"<foo="1"></>"#);
    assert!(document.all_diagnostics().is_empty());

    let root = ast::Document::cast(document.syntax()).unwrap();
    let element = root.elements().next().unwrap();
    assert!(element.name().is_none());
    let attribute = element.attributes().next().unwrap();
    assert_eq!(attribute.name().unwrap().text_trimmed(), "foo");
    assert!(matches!(attribute.value(), Some(ast::Value::StringLiteral(_))));
}

#[test]
fn mismatched_closing_tag_is_given_back() {
    let document = parse_str("<a><b></a>");
    assert_eq!(document.to_full_string(), "<a><b></a>");

    let diagnostics = document.all_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code(), DiagnosticCode::MissingElementClosingTag);
    assert!(diagnostics[0].message().contains('b'));

    // `</a>` must close the outer element.
    let root = ast::Document::cast(document.syntax()).unwrap();
    let outer = root.elements().next().unwrap();
    assert_eq!(outer.name().unwrap().text_trimmed(), "a");
    let closing = outer.closing_tag().unwrap();
    assert_eq!(closing.name().unwrap().text_trimmed(), "a");
}

#[test]
fn stray_root_text_is_invalid_but_total() {
    let document = parse_str("hello <a/>");
    assert_eq!(document.to_full_string(), "hello <a/>");

    let diagnostics = document.all_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code(), DiagnosticCode::InvalidRootElement);

    let root = ast::Document::cast(document.syntax()).unwrap();
    assert_eq!(root.elements().count(), 1);
}

#[test]
fn missing_attribute_value() {
    let document = parse_str("<a b= />");
    let diagnostics = document.all_diagnostics();
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code(), DiagnosticCode::MissingAttributeValue);
    // Anchored at the attribute name.
    assert_eq!(diagnostics[0].range(), range(3, 4));
    assert_eq!(document.to_full_string(), "<a b= />");
}

#[test]
fn unterminated_string_literal() {
    let document = parse_str(r#"<a b="x"#);
    assert_eq!(document.to_full_string(), r#"<a b="x"#);
    let codes: Vec<DiagnosticCode> =
        document.all_diagnostics().iter().map(|d| d.code()).collect();
    assert!(codes.contains(&DiagnosticCode::InvalidStringLiteralToken));
    assert!(codes.contains(&DiagnosticCode::MissingElementClosingTag));
}

#[test]
fn nested_quote_runs_stay_content() {
    let document = parse_str(r#"<a b=""say "hi"" />"#);
    assert!(document.all_diagnostics().is_empty());
    assert_eq!(document.to_full_string(), r#"<a b=""say "hi"" />"#);
}

#[test]
fn interpolation_runs_collapse_to_multipart() {
    let text = SourceText::from("<a>x{i}y</a>");
    let document = parse(&text, &[range(4, 7)]);
    assert!(document.all_diagnostics().is_empty());

    let root = ast::Document::cast(document.syntax()).unwrap();
    let element = root.elements().next().unwrap();
    let value = element.values().next().unwrap();
    let ast::Value::Multipart(multipart) = value else {
        panic!("expected a multipart value");
    };
    let parts: Vec<SyntaxKind> = multipart.parts().map(|token| token.kind()).collect();
    assert_eq!(
        parts,
        vec![SyntaxKind::TEXT, SyntaxKind::INTERPOLATION, SyntaxKind::TEXT]
    );

    // The ordinal map is rebuilt from the token stream.
    assert_eq!(document.interpolations(), &[range(4, 7)]);
    assert_eq!(document.interpolation(0), Some(range(4, 7)));
    assert_eq!(document.interpolation(1), None);
}

#[test]
fn interpolation_as_attribute_value() {
    let text = SourceText::from("<a b={v} />");
    let document = parse(&text, &[range(5, 8)]);
    assert!(document.all_diagnostics().is_empty());

    let root = ast::Document::cast(document.syntax()).unwrap();
    let attribute = root.elements().next().unwrap().attributes().next().unwrap();
    assert!(matches!(attribute.value(), Some(ast::Value::Interpolation(_))));
}

#[test]
fn comments_are_preserved_as_trivia() {
    let document = parse_str("<!-- heading --><a/>");
    assert!(document.all_diagnostics().is_empty());
    assert_eq!(document.to_full_string(), "<!-- heading --><a/>");
}

#[test]
fn trimmed_reconstruction_strips_trivia() {
    let document = parse_str("<foo  bar=\"baz\" />");
    assert_eq!(document.to_full_string(), "<foo  bar=\"baz\" />");
    assert_eq!(document.to_trimmed_string(), "<foobar=\"baz\"/>");
}

#[test]
fn empty_input_parses_to_an_empty_document() {
    let document = parse_str("");
    assert_eq!(document.width(), TextSize::new(0));
    assert_eq!(document.to_full_string(), "");
    assert!(document.all_diagnostics().is_empty());
}

#[test]
fn cancellation_surfaces_as_an_error() {
    let cancel = CancellationToken::new();
    cancel.cancel();
    let text = SourceText::from("<a><b/></a>");
    let result = parse_cancelable(&text, &[], &cancel);
    assert_eq!(result.unwrap_err(), crate::Cancelled);
}

#[test]
fn reparse_without_lineage_falls_back_to_full_parse() {
    let old = parse_str("<a/>");
    let new_text = SourceText::from("<b/>");
    let new = reparse(&old, &new_text, &[]);
    assert_eq!(new.green(), parse(&new_text, &[]).green());
    assert!(new.reused().is_empty());
}

#[test]
fn reparse_across_multiple_generations() {
    let text_a = SourceText::from(r#"<foo bar="baz" /><qux />"#);
    let document_a = parse(&text_a, &[]);

    let text_b = text_a
        .with_changes(&[TextChange::insert(TextSize::new(13), "2")])
        .unwrap();
    let text_c = text_b
        .with_changes(&[TextChange::insert(TextSize::new(14), "3")])
        .unwrap();
    assert_eq!(text_c.to_string(), r#"<foo bar="baz23" /><qux />"#);

    // The old document diffs directly against the latest text even though
    // two edits happened in between.
    let document_c = reparse(&document_a, &text_c, &[]);
    assert_eq!(document_c.green(), parse(&text_c, &[]).green());
    assert!(!document_c.reused().is_empty());

    // The untouched sibling element is reused wholesale.
    assert!(
        document_c
            .reused()
            .iter()
            .any(|reuse| reuse.kind == SyntaxKind::ELEMENT),
        "expected `<qux />` to be reused as a whole: {:?}",
        document_c.reused(),
    );
}

#[test]
fn reparse_with_explicit_change_ranges() {
    let old_text = SourceText::from("<a>hello</a>");
    let old = parse(&old_text, &[]);

    let new_text = SourceText::from("<a>help</a>");
    // "hello" -> "help": replace [6, 8) ("lo") with "p"; the tag structure
    // stays shareable.
    let changes = [ChangeRange::new(range(6, 8), TextSize::new(1))];
    let new = reparse_with_changes(&old, &new_text, &[], &changes);
    assert_eq!(new.to_full_string(), "<a>help</a>");
    assert_eq!(new.green(), parse(&new_text, &[]).green());
}

#[test]
fn reparse_with_shifted_interpolations() {
    let text_a = SourceText::from("<a>{x}</a>");
    let document_a = parse(&text_a, &[range(3, 6)]);

    let text_b = text_a
        .with_changes(&[TextChange::insert(TextSize::new(3), "pre")])
        .unwrap();
    assert_eq!(text_b.to_string(), "<a>pre{x}</a>");

    let document_b = reparse(&document_a, &text_b, &[range(6, 9)]);
    assert_eq!(document_b.green(), parse(&text_b, &[range(6, 9)]).green());
    assert_eq!(document_b.interpolations(), &[range(6, 9)]);
}

/// New-text spans covered by a change-range list.
fn changed_new_spans(changes: &[ChangeRange]) -> Vec<TextRange> {
    let mut out = Vec::new();
    let mut delta = 0i64;
    for change in changes {
        let new_start = i64::from(u32::from(change.span.start())) + delta;
        out.push(TextRange::at(
            TextSize::new(new_start as u32),
            change.new_len,
        ));
        delta += i64::from(u32::from(change.new_len)) - i64::from(u32::from(change.span.len()));
    }
    out
}

#[cfg(test)]
mod properties {
    use proptest::prelude::*;

    use super::*;

    const FRAGMENTS: &[&str] = &[
        "<a>", "</a>", "<b ", "c=\"v\"", "\"", "'", " />", "/>", "<", ">", "=", "x", "yz", " ",
        "\n", "<!--", "-->", "</", "<>", "</>",
    ];

    fn arbitrary_text() -> impl Strategy<Value = String> {
        proptest::collection::vec(0..FRAGMENTS.len(), 0..12)
            .prop_map(|indices| indices.into_iter().map(|i| FRAGMENTS[i]).collect())
    }

    fn edits_from_seed(len: u32, seed: &[(u16, u8, usize)]) -> Vec<TextChange> {
        let mut edits = Vec::new();
        let mut pos = 0u32;
        for &(at, delete, insert) in seed {
            if pos > len {
                break;
            }
            let start = pos + u32::from(at) % (len - pos + 1);
            let deleted = u32::from(delete) % 4 % (len - start + 1);
            let text = FRAGMENTS[insert % FRAGMENTS.len()];
            edits.push(TextChange::new(
                TextRange::new(TextSize::new(start), TextSize::new(start + deleted)),
                text,
            ));
            pos = start + deleted;
        }
        edits
    }

    proptest! {
        #[test]
        fn round_trip(text in arbitrary_text()) {
            let source = SourceText::from(text.as_str());
            let document = parse(&source, &[]);
            prop_assert_eq!(document.to_full_string(), text);
            prop_assert_eq!(document.width(), source.len());
        }

        #[test]
        fn incremental_parse_matches_from_scratch(
            text in arbitrary_text(),
            seed in proptest::collection::vec((0u16..512, 0u8..255, 0usize..64), 1..4),
        ) {
            let old_text = SourceText::from(text.as_str());
            let old = parse(&old_text, &[]);

            let edits = edits_from_seed(u32::from(old_text.len()), &seed);
            let new_text = old_text.with_changes(&edits).unwrap();
            let new = reparse(&old, &new_text, &[]);
            let fresh = parse(&new_text, &[]);

            // Structural equality, reuse markers aside.
            prop_assert_eq!(new.green(), fresh.green());
            prop_assert_eq!(new.to_full_string(), new_text.to_string());

            // Reuse soundness: nothing reused overlaps a changed span.
            let changes = new_text.change_ranges(&old_text);
            for span in changed_new_spans(&changes) {
                for reuse in new.reused() {
                    prop_assert!(
                        reuse.range.end() <= span.start() || reuse.range.start() >= span.end(),
                        "{:?} overlaps changed span {:?}",
                        reuse,
                        span,
                    );
                }
            }
        }
    }
}
