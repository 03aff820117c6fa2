//! HTML statistics report generator.
//!
//! The page is a single file: styles, the sort script and the charts are
//! all embedded.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use quizforge_core::statistics::{DailyCount, ScoreBucket, StatisticsReport};

/// Escape text for element content and attribute values.
fn esc(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Open a sortable table with the given column headings.
fn sortable_head(out: &mut String, id: &str, columns: &[&str]) {
    let _ = write!(out, "<table class=\"grid\" id=\"{id}\"><thead><tr>");
    for (i, col) in columns.iter().enumerate() {
        let _ = write!(out, "<th data-col=\"{i}\">{col}</th>");
    }
    out.push_str("</tr></thead><tbody>\n");
}

/// Render a statistics report as a standalone HTML page.
pub fn generate_html(report: &StatisticsReport, title: &str, generated_at: DateTime<Utc>) -> String {
    let o = &report.overview;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>quizforge: {}</title>\n<style>{STYLE}</style>\n</head>\n<body>",
        esc(title)
    );

    let _ = writeln!(
        out,
        "<h1>{}</h1>\n<p class=\"sub\">{} tests &middot; {} attempts &middot; generated {}</p>",
        esc(title),
        report.per_test.len(),
        o.total_attempts,
        generated_at.format("%Y-%m-%d %H:%M UTC")
    );

    out.push_str("<div class=\"cards\">\n");
    for (label, value) in [
        ("Attempts", o.total_attempts.to_string()),
        ("Completed", o.completed_attempts.to_string()),
        ("Users", o.unique_users.to_string()),
        ("Average score", format!("{:.1}%", o.average_score)),
        ("Completion rate", format!("{:.1}%", o.completion_rate)),
    ] {
        let _ = writeln!(
            out,
            "<div class=\"card\"><span>{label}</span><strong>{value}</strong></div>"
        );
    }
    out.push_str("</div>\n");

    let _ = writeln!(
        out,
        "<div class=\"charts\"><figure><figcaption>Score distribution</figcaption>{}</figure><figure><figcaption>Completed per day</figcaption>{}</figure></div>",
        distribution_chart(&report.distribution),
        activity_chart(&report.daily_activity)
    );

    out.push_str("<h2>Tests</h2>\n");
    sortable_head(
        &mut out,
        "tests",
        &["Test", "Status", "Questions", "Attempts", "Average"],
    );
    for t in &report.per_test {
        let status = if t.is_active { "active" } else { "inactive" };
        let _ = writeln!(
            out,
            "<tr><td>{}</td><td class=\"{status}\">{status}</td><td>{}</td><td>{}</td><td>{:.1}%</td></tr>",
            esc(&t.title),
            t.question_count,
            t.attempts,
            t.average_score
        );
    }
    out.push_str("</tbody></table>\n");

    if !report.per_group.is_empty() {
        out.push_str("<h2>Groups</h2>\n");
        sortable_head(&mut out, "groups", &["Group", "Questions"]);
        for g in &report.per_group {
            let _ = writeln!(out, "<tr><td>{}</td><td>{}</td></tr>", esc(&g.group), g.questions);
        }
        out.push_str("</tbody></table>\n");
    }

    if !report.difficulty.is_empty() {
        out.push_str("<h2>Hardest questions</h2>\n");
        sortable_head(
            &mut out,
            "difficulty",
            &["Question", "Group", "Answers", "Correct rate"],
        );
        for d in &report.difficulty {
            let class = if d.correct_rate < 0.5 { "low" } else { "ok" };
            let _ = writeln!(
                out,
                "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"{class}\">{:.0}%</td></tr>",
                esc(&d.text),
                esc(&d.group),
                d.answered,
                d.correct_rate * 100.0
            );
        }
        out.push_str("</tbody></table>\n");
    }

    let raw = serde_json::to_string_pretty(report).unwrap_or_default();
    let _ = writeln!(
        out,
        "<details><summary>Report data (JSON)</summary><pre>{}</pre></details>",
        esc(&raw)
    );

    let _ = write!(out, "<script>{SCRIPT}</script>\n</body>\n</html>\n");
    out
}

/// Render `report` and write it to `path`, creating parent directories.
pub fn write_html_report(report: &StatisticsReport, title: &str, path: &Path) -> Result<()> {
    let page = generate_html(report, title, Utc::now());
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
    }
    std::fs::write(path, page)
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    Ok(())
}

const ROW: usize = 24;
const GAP: usize = 6;
const MAX_WIDTH: usize = 400;
const LABEL_WIDTH: usize = 110;

/// Horizontal bars scaled to the largest count.
fn bar_chart(rows: &[(String, usize)], color: &str) -> String {
    let peak = rows.iter().map(|(_, n)| *n).max().unwrap_or(0).max(1);
    let height = rows.len() * (ROW + GAP) + GAP;
    let mut svg = String::new();
    let _ = writeln!(
        svg,
        "<svg viewBox=\"0 0 {} {height}\" width=\"{}\" height=\"{height}\" role=\"img\">",
        LABEL_WIDTH + MAX_WIDTH + 50,
        LABEL_WIDTH + MAX_WIDTH + 50
    );

    for (i, (label, count)) in rows.iter().enumerate() {
        let top = GAP + i * (ROW + GAP);
        let mid = top + ROW / 2;
        let len = count * MAX_WIDTH / peak;
        let _ = writeln!(
            svg,
            "<text x=\"{}\" y=\"{mid}\" text-anchor=\"end\" dominant-baseline=\"central\">{}</text>",
            LABEL_WIDTH - 8,
            esc(label)
        );
        let _ = writeln!(
            svg,
            "<rect x=\"{LABEL_WIDTH}\" y=\"{top}\" width=\"{len}\" height=\"{ROW}\" fill=\"{color}\"/>"
        );
        let _ = writeln!(
            svg,
            "<text x=\"{}\" y=\"{mid}\" dominant-baseline=\"central\">{count}</text>",
            LABEL_WIDTH + len + 6
        );
    }

    svg.push_str("</svg>");
    svg
}

fn distribution_chart(buckets: &[ScoreBucket]) -> String {
    let rows: Vec<(String, usize)> = buckets
        .iter()
        .map(|b| (format!("{}%", b.label), b.count))
        .collect();
    bar_chart(&rows, "#6366f1")
}

fn activity_chart(days: &[DailyCount]) -> String {
    let rows: Vec<(String, usize)> = days
        .iter()
        .map(|d| (d.date.format("%d %b").to_string(), d.count))
        .collect();
    bar_chart(&rows, "#14b8a6")
}

const STYLE: &str = r#"
body { font: 15px/1.5 system-ui, sans-serif; max-width: 1100px; margin: 0 auto; padding: 1.5rem; color: #1f2937; }
h1 { margin-bottom: 0; }
.sub { color: #6b7280; margin-top: 0.25rem; }
.cards { display: flex; flex-wrap: wrap; gap: 0.75rem; margin: 1.5rem 0; }
.card { border: 1px solid #d1d5db; border-radius: 6px; padding: 0.6rem 1rem; min-width: 9rem; }
.card span { display: block; font-size: 0.8rem; color: #6b7280; }
.card strong { font-size: 1.4rem; }
.charts { display: flex; flex-wrap: wrap; gap: 2rem; }
figcaption { font-weight: 600; }
svg text { font-size: 12px; fill: currentColor; }
.grid { border-collapse: collapse; width: 100%; }
.grid th, .grid td { border-bottom: 1px solid #e5e7eb; padding: 0.4rem 0.75rem; text-align: left; }
.grid th { cursor: pointer; user-select: none; }
.active, .ok { color: #047857; }
.inactive, .low { color: #b91c1c; }
pre { background: #f3f4f6; padding: 1rem; overflow-x: auto; font-size: 0.8rem; }
"#;

const SCRIPT: &str = r#"
document.querySelectorAll('table.grid th').forEach(th => {
  th.addEventListener('click', () => {
    const table = th.closest('table');
    const col = Number(th.dataset.col);
    const dir = table.dataset.col === String(col) && table.dataset.dir === 'up' ? 'down' : 'up';
    const key = td => { const n = parseFloat(td.textContent); return isNaN(n) ? td.textContent : n; };
    const body = table.tBodies[0];
    [...body.rows]
      .sort((x, y) => {
        const a = key(x.cells[col]), b = key(y.cells[col]);
        const c = typeof a === 'number' && typeof b === 'number' ? a - b : String(a).localeCompare(String(b));
        return dir === 'up' ? c : -c;
      })
      .forEach(r => body.appendChild(r));
    table.dataset.col = col;
    table.dataset.dir = dir;
  });
});
"#;
