//! The `quizforge export` command.

use std::path::PathBuf;

use anyhow::Result;

use super::connect;

pub async fn execute(
    config: Option<PathBuf>,
    user: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let ctx = connect(config, user)?;
    let doc = ctx.engine.export().await?;

    let dir = output.unwrap_or_else(|| ctx.config.output_dir.clone());
    let path = dir.join(doc.default_file_name());
    doc.save_json(&path)?;

    println!(
        "Exported {} tests, {} questions, {} attempts, {} answers to {}",
        doc.summary.tests,
        doc.summary.questions,
        doc.summary.attempts,
        doc.summary.answers,
        path.display()
    );
    Ok(())
}
