//! Typed wrappers over the raw syntax tree.

use crate::SyntaxKind::*;
use crate::{SyntaxElement, SyntaxNode, SyntaxToken};

pub trait AstNode {
    fn cast(syntax: SyntaxNode) -> Option<Self>
    where
        Self: Sized;

    fn syntax(&self) -> &SyntaxNode;
}

fn child_token(node: &SyntaxNode, kind: crate::SyntaxKind) -> Option<SyntaxToken> {
    node.children().filter_map(SyntaxElement::into_token).find(|token| token.kind() == kind)
}

fn child_node(node: &SyntaxNode, kind: crate::SyntaxKind) -> Option<SyntaxNode> {
    node.child_nodes().find(|child| child.kind() == kind)
}

/// The parse root: a sequence of top-level elements.
#[derive(Debug, Clone)]
pub struct Document(SyntaxNode);

impl Document {
    pub fn elements(&self) -> impl Iterator<Item = Element> + use<> {
        self.0.child_nodes().filter_map(Element::cast)
    }
}

impl AstNode for Document {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        (syntax.kind() == DOCUMENT).then_some(Self(syntax))
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}

/// `<name attr=value>children</name>`, `<name />`, or the nameless fragment
/// forms `<>...</>`.
#[derive(Debug, Clone)]
pub struct Element(SyntaxNode);

impl Element {
    pub fn open_token(&self) -> Option<SyntaxToken> {
        child_token(&self.0, LESS_THAN)
    }

    /// The tag name; `None` for fragments.
    pub fn name(&self) -> Option<SyntaxToken> {
        child_token(&self.0, IDENTIFIER)
    }

    pub fn attributes(&self) -> impl Iterator<Item = Attribute> + use<> {
        child_node(&self.0, ATTRIBUTE_LIST)
            .into_iter()
            .flat_map(|list| list.child_nodes())
            .filter_map(Attribute::cast)
    }

    pub fn is_self_closing(&self) -> bool {
        child_token(&self.0, SLASH_GREATER_THAN).is_some()
    }

    pub fn values(&self) -> impl Iterator<Item = Value> + use<> {
        child_node(&self.0, CHILD_LIST)
            .into_iter()
            .flat_map(|list| list.child_nodes())
            .filter_map(Value::cast)
    }

    pub fn closing_tag(&self) -> Option<ClosingTag> {
        child_node(&self.0, CLOSING_TAG).and_then(ClosingTag::cast)
    }
}

impl AstNode for Element {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        (syntax.kind() == ELEMENT).then_some(Self(syntax))
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}

#[derive(Debug, Clone)]
pub struct ClosingTag(SyntaxNode);

impl ClosingTag {
    pub fn name(&self) -> Option<SyntaxToken> {
        child_token(&self.0, IDENTIFIER)
    }
}

impl AstNode for ClosingTag {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        (syntax.kind() == CLOSING_TAG).then_some(Self(syntax))
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}

/// `name`, `name=value`.
#[derive(Debug, Clone)]
pub struct Attribute(SyntaxNode);

impl Attribute {
    pub fn name(&self) -> Option<SyntaxToken> {
        child_token(&self.0, IDENTIFIER)
    }

    pub fn equals_token(&self) -> Option<SyntaxToken> {
        child_token(&self.0, EQUALS)
    }

    pub fn value(&self) -> Option<Value> {
        self.0.child_nodes().find_map(Value::cast)
    }
}

impl AstNode for Attribute {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        (syntax.kind() == ATTRIBUTE).then_some(Self(syntax))
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}

/// Anything a value slot can hold.
#[derive(Debug, Clone)]
pub enum Value {
    Scalar(ScalarValue),
    Interpolation(InterpolationValue),
    Multipart(MultipartValue),
    StringLiteral(StringLiteral),
    Element(Element),
    Invalid(InvalidNode),
}

impl AstNode for Value {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        match syntax.kind() {
            SCALAR_VALUE => Some(Self::Scalar(ScalarValue(syntax))),
            INTERPOLATION_VALUE => Some(Self::Interpolation(InterpolationValue(syntax))),
            MULTIPART_VALUE => Some(Self::Multipart(MultipartValue(syntax))),
            STRING_LITERAL => Some(Self::StringLiteral(StringLiteral(syntax))),
            ELEMENT => Some(Self::Element(Element(syntax))),
            INVALID => Some(Self::Invalid(InvalidNode(syntax))),
            _ => None,
        }
    }

    fn syntax(&self) -> &SyntaxNode {
        match self {
            Self::Scalar(it) => it.syntax(),
            Self::Interpolation(it) => it.syntax(),
            Self::Multipart(it) => it.syntax(),
            Self::StringLiteral(it) => it.syntax(),
            Self::Element(it) => it.syntax(),
            Self::Invalid(it) => it.syntax(),
        }
    }
}

/// A single run of plain text.
#[derive(Debug, Clone)]
pub struct ScalarValue(SyntaxNode);

impl ScalarValue {
    pub fn token(&self) -> Option<SyntaxToken> {
        child_token(&self.0, TEXT)
    }
}

impl AstNode for ScalarValue {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        (syntax.kind() == SCALAR_VALUE).then_some(Self(syntax))
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}

/// A single opaque interpolation.
#[derive(Debug, Clone)]
pub struct InterpolationValue(SyntaxNode);

impl InterpolationValue {
    pub fn token(&self) -> Option<SyntaxToken> {
        child_token(&self.0, INTERPOLATION)
    }
}

impl AstNode for InterpolationValue {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        (syntax.kind() == INTERPOLATION_VALUE).then_some(Self(syntax))
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}

/// Two or more text/interpolation parts in a row.
#[derive(Debug, Clone)]
pub struct MultipartValue(SyntaxNode);

impl MultipartValue {
    pub fn parts(&self) -> impl Iterator<Item = SyntaxToken> + use<> {
        self.0.children().filter_map(SyntaxElement::into_token)
    }
}

impl AstNode for MultipartValue {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        (syntax.kind() == MULTIPART_VALUE).then_some(Self(syntax))
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}

/// A quoted attribute value, possibly with interpolated parts.
#[derive(Debug, Clone)]
pub struct StringLiteral(SyntaxNode);

impl StringLiteral {
    pub fn start_token(&self) -> Option<SyntaxToken> {
        child_token(&self.0, STRING_START)
    }

    pub fn end_token(&self) -> Option<SyntaxToken> {
        child_token(&self.0, STRING_END)
    }

    pub fn value(&self) -> Option<Value> {
        self.0.child_nodes().find_map(Value::cast)
    }
}

impl AstNode for StringLiteral {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        (syntax.kind() == STRING_LITERAL).then_some(Self(syntax))
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}

/// Placeholder produced when a production had to give up.
#[derive(Debug, Clone)]
pub struct InvalidNode(SyntaxNode);

impl AstNode for InvalidNode {
    fn cast(syntax: SyntaxNode) -> Option<Self> {
        (syntax.kind() == INVALID).then_some(Self(syntax))
    }

    fn syntax(&self) -> &SyntaxNode {
        &self.0
    }
}
