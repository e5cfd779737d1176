#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum SyntaxKind {
    // Tokens.
    LESS_THAN,
    LESS_THAN_SLASH,
    GREATER_THAN,
    SLASH_GREATER_THAN,
    EQUALS,
    IDENTIFIER,
    TEXT,
    INTERPOLATION,
    STRING_START,
    STRING_END,
    UNKNOWN,
    EOF,

    // Nodes.
    DOCUMENT,
    ELEMENT,
    CLOSING_TAG,
    ATTRIBUTE_LIST,
    ATTRIBUTE,
    CHILD_LIST,
    SCALAR_VALUE,
    INTERPOLATION_VALUE,
    MULTIPART_VALUE,
    STRING_LITERAL,
    INVALID,
}

impl SyntaxKind {
    pub fn is_token(self) -> bool {
        (self as u16) <= (Self::EOF as u16)
    }

    pub fn is_node(self) -> bool {
        !self.is_token()
    }

    /// Kinds a value slot can hold.
    pub fn is_value(self) -> bool {
        matches!(
            self,
            Self::SCALAR_VALUE
                | Self::INTERPOLATION_VALUE
                | Self::MULTIPART_VALUE
                | Self::STRING_LITERAL
                | Self::ELEMENT
                | Self::INVALID
        )
    }

    /// Human-readable description used in diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            Self::LESS_THAN => "'<'",
            Self::LESS_THAN_SLASH => "'</'",
            Self::GREATER_THAN => "'>'",
            Self::SLASH_GREATER_THAN => "'/>'",
            Self::EQUALS => "'='",
            Self::IDENTIFIER => "an identifier",
            Self::TEXT => "text",
            Self::INTERPOLATION => "an interpolation",
            Self::STRING_START => "a string start quote",
            Self::STRING_END => "a closing quote",
            Self::UNKNOWN => "unrecognized text",
            Self::EOF => "end of input",
            Self::DOCUMENT => "a document",
            Self::ELEMENT => "an element",
            Self::CLOSING_TAG => "a closing tag",
            Self::ATTRIBUTE_LIST => "attributes",
            Self::ATTRIBUTE => "an attribute",
            Self::CHILD_LIST => "element children",
            Self::SCALAR_VALUE | Self::INTERPOLATION_VALUE | Self::MULTIPART_VALUE => "a value",
            Self::STRING_LITERAL => "a string literal",
            Self::INVALID => "invalid syntax",
        }
    }
}
