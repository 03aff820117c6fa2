//! The `quizforge dashboard` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use super::{connect, truncate};

pub async fn execute(config: Option<PathBuf>, user: Option<String>) -> Result<()> {
    let ctx = connect(config, user)?;
    let summary = ctx.engine.dashboard().await?;

    println!("Dashboard for {}", summary.user_id);
    println!(
        "Tests: {} ({} active) | Questions: {} | Groups: {}",
        summary.tests, summary.active_tests, summary.questions, summary.groups
    );
    println!(
        "Attempts: {} | Average score: {:.1}%",
        summary.attempts, summary.average_score
    );

    if summary.recent_attempts.is_empty() {
        println!("\nNo attempts yet.");
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Attempt", "Test", "Score", "Completed"]);
    for a in &summary.recent_attempts {
        table.add_row(vec![
            Cell::new(&a.attempt_id),
            Cell::new(truncate(&a.test_title, 40)),
            Cell::new(format!("{}%", a.score)),
            Cell::new(
                a.completed_at
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "in progress".into()),
            ),
        ]);
    }
    println!("\nRecent attempts\n{table}");
    Ok(())
}
