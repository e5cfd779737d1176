use anyhow::Context;
use camino::Utf8PathBuf;
use clap::Parser;
use mimalloc::MiMalloc;
use salsa::DatabaseImpl;
use wattle_db::{File, FileDiagnostic, check_file};
use wattle_errors::Renderer;
use wattle_text::SourceText;

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[derive(Parser)]
enum Options {
    /// Parse a file and report its diagnostics.
    Check { path: Utf8PathBuf },
    /// Parse a file and print the concrete syntax tree.
    Dump { path: Utf8PathBuf },
}

fn main() -> anyhow::Result<()> {
    match Options::parse() {
        Options::Check { path } => {
            let db = DatabaseImpl::default();
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read `{path}`"))?;

            let renderer = Renderer::styled();
            let file = File::new(&db, path, text);
            let diagnostics = check_file::accumulated::<FileDiagnostic>(&db, file);

            let path = file.path(&db).as_str();
            let text = file.text(&db).as_str();
            for entry in &diagnostics {
                eprintln!("{}", entry.diagnostic.render(&renderer, path, text));
            }

            Ok(())
        }
        Options::Dump { path } => {
            let text = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read `{path}`"))?;
            let document = wattle_parse::parse(&SourceText::from(text), &[]);
            print!("{}", document.debug_tree());
            Ok(())
        }
    }
}
