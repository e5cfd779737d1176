//! Salsa boundary: file inputs, the tracked parse query, and diagnostic
//! accumulation. The engine itself stays database-free; this crate is how a
//! host compiler caches and invalidates parses per file.

use camino::Utf8PathBuf;
use salsa::{Accumulator, Database};
use wattle_parse::Document;
use wattle_text::SourceText;

#[salsa::input(debug)]
pub struct File {
    #[returns(ref)]
    pub path: Utf8PathBuf,
    #[returns(ref)]
    pub text: String,
}

#[salsa::tracked]
impl File {
    #[salsa::tracked(returns(ref), no_eq)]
    pub fn document(self, db: &dyn Database) -> Document {
        let text = SourceText::from(self.text(db).as_str());
        wattle_parse::parse(&text, &[])
    }
}

/// A parse diagnostic accumulated while checking a file.
#[salsa::accumulator]
pub struct FileDiagnostic {
    pub file: File,
    pub diagnostic: wattle_errors::Diagnostic,
}

#[salsa::tracked]
pub fn check_file(db: &dyn Database, file: File) {
    for diagnostic in file.document(db).all_diagnostics() {
        FileDiagnostic { file, diagnostic }.accumulate(db);
    }
}
