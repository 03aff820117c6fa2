//! The `quizforge stats` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizforge_core::statistics::{Overview, StatisticsReport};

use super::{connect, truncate, write_output};

/// Plain-text rendering with one table per section.
fn render_text(report: &StatisticsReport) -> String {
    let mut out = String::new();
    out.push_str(&overview_line(&report.overview));

    let mut dist = Table::new();
    dist.set_header(vec!["Score range", "Attempts"]);
    for b in &report.distribution {
        dist.add_row(vec![Cell::new(format!("{}%", b.label)), Cell::new(b.count)]);
    }
    out.push_str(&format!("\nScore distribution\n{dist}\n"));

    let mut daily = Table::new();
    daily.set_header(vec!["Date", "Completed"]);
    for d in &report.daily_activity {
        daily.add_row(vec![Cell::new(d.date), Cell::new(d.count)]);
    }
    out.push_str(&format!("\nDaily activity\n{daily}\n"));

    let mut tests = Table::new();
    tests.set_header(vec!["Test", "Status", "Questions", "Attempts", "Average"]);
    for t in &report.per_test {
        tests.add_row(vec![
            Cell::new(truncate(&t.title, 40)),
            Cell::new(if t.is_active { "active" } else { "inactive" }),
            Cell::new(t.question_count),
            Cell::new(t.attempts),
            Cell::new(format!("{:.1}%", t.average_score)),
        ]);
    }
    out.push_str(&format!("\nTests\n{tests}\n"));

    if !report.difficulty.is_empty() {
        let mut hardest = Table::new();
        hardest.set_header(vec!["Question", "Group", "Answers", "Correct rate"]);
        for d in &report.difficulty {
            hardest.add_row(vec![
                Cell::new(truncate(&d.text, 50)),
                Cell::new(&d.group),
                Cell::new(d.answered),
                Cell::new(format!("{:.0}%", d.correct_rate * 100.0)),
            ]);
        }
        out.push_str(&format!("\nHardest questions\n{hardest}\n"));
    }
    out
}

pub(crate) fn overview_line(o: &Overview) -> String {
    format!(
        "Attempts: {} ({} completed) | Users: {} | Average score: {:.1}% | Completion: {:.1}%\n",
        o.total_attempts, o.completed_attempts, o.unique_users, o.average_score, o.completion_rate
    )
}

pub async fn execute(
    config: Option<PathBuf>,
    user: Option<String>,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let ctx = connect(config, user)?;
    let report = ctx.engine.statistics().await?;
    let title = ctx.config.user.clone().unwrap_or_default();

    let rendered = match format.as_str() {
        "text" => render_text(&report),
        "markdown" | "md" => quizforge_report::generate_markdown(&report, &title),
        "json" => serde_json::to_string_pretty(&report)?,
        "html" => {
            let path = output
                .unwrap_or_else(|| ctx.config.output_dir.join("quizforge-stats.html"));
            quizforge_report::write_html_report(&report, &title, &path)?;
            println!("HTML report written to {}", path.display());
            return Ok(());
        }
        other => anyhow::bail!("unknown format: {other} (expected text, markdown, html or json)"),
    };

    match output {
        Some(path) => {
            write_output(&path, &rendered)?;
            println!("Statistics written to {}", path.display());
        }
        None => print!("{rendered}"),
    }
    Ok(())
}
