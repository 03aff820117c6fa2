//! The `quizforge validate` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use quizforge_core::parser::{load_import_file, validate_import};

pub fn execute(path: PathBuf) -> Result<()> {
    let outcome = load_import_file(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    println!(
        "{}: {} question(s), {} skipped",
        path.display(),
        outcome.questions.len(),
        outcome.skipped
    );

    let warnings = validate_import(&outcome.questions);
    for w in &warnings {
        println!("  [{}] WARNING: {}", w.index + 1, w.message);
    }

    if warnings.is_empty() {
        println!("Import file valid.");
    } else {
        println!("\n{} warning(s) found.", warnings.len());
    }

    Ok(())
}
