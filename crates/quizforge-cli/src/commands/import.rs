//! The `quizforge import` command.

use std::path::PathBuf;

use anyhow::{Context, Result};

use quizforge_core::parser::{parse_import, ImportFormat};

use super::connect;

pub async fn execute(
    config: Option<PathBuf>,
    user: Option<String>,
    test_id: String,
    file: PathBuf,
    format: Option<String>,
) -> Result<()> {
    let format = match format {
        Some(f) => f.parse::<ImportFormat>()?,
        None => ImportFormat::from_path(&file)?,
    };
    let content = std::fs::read_to_string(&file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let outcome = parse_import(&content, format)
        .with_context(|| format!("failed to parse {}", file.display()))?;

    if outcome.questions.is_empty() {
        anyhow::bail!(
            "no questions found in {} ({} skipped)",
            file.display(),
            outcome.skipped
        );
    }

    let ctx = connect(config, user)?;
    let summary = ctx.engine.import_questions(&test_id, &outcome.questions).await?;

    println!(
        "Imported {} question(s) from {} ({} skipped)",
        summary.questions_created,
        file.display(),
        outcome.skipped
    );
    if !summary.groups_created.is_empty() {
        println!("New groups: {}", summary.groups_created.join(", "));
    }
    Ok(())
}
