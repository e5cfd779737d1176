//! Immutable source buffers with edit history.
//!
//! A [`SourceText`] is one of four shapes: a flat string, a view into a base
//! buffer, a rope of segments, or an edited buffer that remembers the change
//! ranges linking it to its predecessor. Predecessors are held weakly, so
//! dropping an old buffer never leaks, while the change-range chain itself
//! stays available for diffing two generations against each other.

mod change;
mod error;
mod text;

pub use change::{ChangeRange, compose, compose_all};
pub use error::EditError;
pub use text::{LineCol, SourceText, TextChange, TextChars, WeakSourceText};
