//! Markdown statistics report generator.

use std::fmt::Write as _;

use quizforge_core::statistics::{AdminOverview, Overview, StatisticsReport};

/// Escape table-breaking characters in a cell.
fn cell(s: &str) -> String {
    s.replace('|', "\\|").replace('\n', " ")
}

fn overview_table(out: &mut String, overview: &Overview) {
    out.push_str("| Attempts | Completed | Unique users | Average score | Completion rate |\n");
    out.push_str("|---:|---:|---:|---:|---:|\n");
    let _ = writeln!(
        out,
        "| {} | {} | {} | {:.1}% | {:.1}% |",
        overview.total_attempts,
        overview.completed_attempts,
        overview.unique_users,
        overview.average_score,
        overview.completion_rate
    );
}

/// Render a statistics report as Markdown.
pub fn generate_markdown(report: &StatisticsReport, title: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Statistics: {}\n", cell(title));

    out.push_str("## Overview\n\n");
    overview_table(&mut out, &report.overview);

    out.push_str("\n## Score distribution\n\n| Range | Attempts |\n|---|---:|\n");
    for b in &report.distribution {
        let _ = writeln!(out, "| {}% | {} |", b.label, b.count);
    }

    out.push_str("\n## Daily activity\n\n| Date | Completed |\n|---|---:|\n");
    for d in &report.daily_activity {
        let _ = writeln!(out, "| {} | {} |", d.date, d.count);
    }

    out.push_str("\n## Tests\n\n| Test | Active | Questions | Attempts | Average |\n|---|---|---:|---:|---:|\n");
    for t in &report.per_test {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {} | {:.1}% |",
            cell(&t.title),
            if t.is_active { "yes" } else { "no" },
            t.question_count,
            t.attempts,
            t.average_score
        );
    }

    if !report.per_group.is_empty() {
        out.push_str("\n## Groups\n\n| Group | Questions |\n|---|---:|\n");
        for g in &report.per_group {
            let _ = writeln!(out, "| {} | {} |", cell(&g.group), g.questions);
        }
    }

    if !report.difficulty.is_empty() {
        out.push_str("\n## Hardest questions\n\n| Question | Group | Answers | Correct rate |\n|---|---|---:|---:|\n");
        for d in &report.difficulty {
            let _ = writeln!(
                out,
                "| {} | {} | {} | {:.0}% |",
                cell(&d.text),
                cell(&d.group),
                d.answered,
                d.correct_rate * 100.0
            );
        }
    }

    out
}

/// Render the admin overview as Markdown.
pub fn generate_admin_markdown(admin: &AdminOverview) -> String {
    let mut out = String::from("# Admin overview\n\n");
    let _ = writeln!(
        out,
        "{} tests ({} active), {} questions, {} groups, {} answers\n",
        admin.total_tests,
        admin.active_tests,
        admin.total_questions,
        admin.total_groups,
        admin.total_answers
    );
    overview_table(&mut out, &admin.overview);

    out.push_str("\n## Users\n\n| User | Attempts | Completed | Average |\n|---|---:|---:|---:|\n");
    for u in &admin.per_user {
        let _ = writeln!(
            out,
            "| {} | {} | {} | {:.1}% |",
            cell(&u.user_id),
            u.attempts,
            u.completed,
            u.average_score
        );
    }

    out.push_str("\n## Top tests\n\n| Test | Attempts | Average |\n|---|---:|---:|\n");
    for t in &admin.top_tests {
        let _ = writeln!(
            out,
            "| {} | {} | {:.1}% |",
            cell(&t.title),
            t.attempts,
            t.average_score
        );
    }
    out
}
