use text_size::{TextRange, TextSize};
use thiserror::Error;

/// Rejected edit description passed to [`crate::SourceText::with_changes`].
///
/// Malformed source text is never an error; a bad *description of an edit* is
/// caller misuse and always is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EditError {
    #[error("edit span {span:?} is out of bounds for a text of length {len:?}")]
    OutOfBounds { span: TextRange, len: TextSize },
    #[error("edit span {span:?} starts before the preceding span {previous:?}")]
    OutOfOrder { previous: TextRange, span: TextRange },
    #[error("edit span {span:?} overlaps the preceding span {previous:?}")]
    Overlapping { previous: TextRange, span: TextRange },
    #[error("edit span {span:?} does not fall on character boundaries")]
    NotCharBoundary { span: TextRange },
}
