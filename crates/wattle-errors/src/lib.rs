use std::fmt::Display;

pub use annotate_snippets::Renderer;
use annotate_snippets::{Level, Snippet};
pub use text_size::{TextRange, TextSize};

/// Stable identifier for every diagnostic the engine can produce.
///
/// Structural codes are recovered with synthesized missing tokens; invalid
/// codes bubble an invalid placeholder node. Neither is ever fatal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    MissingElementIdentifier,
    MissingElementClosingTag,
    MissingAttributeValue,
    UnexpectedToken,
    InvalidElementChildToken,
    InvalidStringLiteralToken,
    InvalidRootElement,
}

impl DiagnosticCode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::MissingElementIdentifier => "missing-element-identifier",
            Self::MissingElementClosingTag => "missing-element-closing-tag",
            Self::MissingAttributeValue => "missing-attribute-value",
            Self::UnexpectedToken => "unexpected-token",
            Self::InvalidElementChildToken => "invalid-element-child-token",
            Self::InvalidStringLiteralToken => "invalid-string-literal-token",
            Self::InvalidRootElement => "invalid-root-element",
        }
    }
}

/// How severe a diagnostic is. The engine itself only emits errors; severity
/// policy for domain rules belongs to downstream consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    severity: Severity,
    code: DiagnosticCode,
    message: String,
    range: TextRange,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>, range: TextRange) -> Self {
        Self { severity: Severity::Error, code, message: message.into(), range }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub fn code(&self) -> DiagnosticCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn range(&self) -> TextRange {
        self.range
    }

    /// Shifts the diagnostic range by `base`. Diagnostics stored on tree nodes
    /// are relative to the node and re-anchored when the node's absolute
    /// position is known.
    pub fn offset_by(mut self, base: TextSize) -> Self {
        self.range = self.range + base;
        self
    }

    pub fn render<'a>(
        &'a self,
        renderer: &'a Renderer,
        path: &'a str,
        text: &'a str,
    ) -> impl Display + 'a {
        let level = match self.severity {
            Severity::Error => Level::Error,
            Severity::Warning => Level::Warning,
        };
        let message = level.title(&self.message).snippet(
            Snippet::source(text)
                .origin(path)
                .annotation(level.span(self.range.into()).label(self.code.as_str()))
                .fold(true),
        );
        renderer.render(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_re_anchors_relative_ranges() {
        let diagnostic = Diagnostic::error(
            DiagnosticCode::UnexpectedToken,
            "expected '>'",
            TextRange::new(TextSize::new(1), TextSize::new(4)),
        );
        let shifted = diagnostic.offset_by(TextSize::new(10));
        assert_eq!(shifted.range(), TextRange::new(TextSize::new(11), TextSize::new(14)));
    }
}
