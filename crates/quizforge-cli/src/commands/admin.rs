//! System-wide commands: `admin`, `delete-attempt`.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_core::statistics::AdminOverview;

use super::stats::overview_line;
use super::{connect, truncate};

fn print_text(admin: &AdminOverview) {
    println!(
        "Tests: {} ({} active) | Questions: {} | Groups: {} | Answers: {}",
        admin.total_tests,
        admin.active_tests,
        admin.total_questions,
        admin.total_groups,
        admin.total_answers
    );
    print!("{}", overview_line(&admin.overview));

    let mut users = Table::new();
    users.set_header(vec!["User", "Attempts", "Completed", "Average"]);
    for u in &admin.per_user {
        users.add_row(vec![
            Cell::new(&u.user_id),
            Cell::new(u.attempts),
            Cell::new(u.completed),
            Cell::new(format!("{:.1}%", u.average_score)),
        ]);
    }
    println!("\nUsers\n{users}");

    let mut tests = Table::new();
    tests.set_header(vec!["Test", "Attempts", "Average"]);
    for t in &admin.top_tests {
        tests.add_row(vec![
            Cell::new(truncate(&t.title, 40)),
            Cell::new(t.attempts),
            Cell::new(format!("{:.1}%", t.average_score)),
        ]);
    }
    println!("\nTop tests\n{tests}");
}

pub async fn execute(config: Option<PathBuf>, user: Option<String>, format: String) -> Result<()> {
    let ctx = connect(config, user)?;
    let admin = ctx.engine.admin_overview().await?;

    match format.as_str() {
        "text" => print_text(&admin),
        "markdown" | "md" => print!("{}", quizforge_report::generate_admin_markdown(&admin)),
        "json" => println!("{}", serde_json::to_string_pretty(&admin)?),
        other => anyhow::bail!("unknown format: {other} (expected text, markdown or json)"),
    }
    Ok(())
}

pub async fn delete_attempt(
    config: Option<PathBuf>,
    user: Option<String>,
    attempt_id: String,
) -> Result<()> {
    let ctx = connect(config, user)?;
    let removed = ctx.engine.delete_attempt(&attempt_id).await?;
    println!("Deleted attempt {attempt_id} and {removed} answer(s)");
    Ok(())
}
