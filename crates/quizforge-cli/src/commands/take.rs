//! The `quizforge take` command: an interactive, line-driven test session.

use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use anyhow::Result;
use chrono::Utc;
use comfy_table::{Cell, Table};

use quizforge_core::model::OptionLabel;
use quizforge_core::scorer::ScoreResult;
use quizforge_core::session::Session;

use super::{connect, truncate};

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Action {
    Select(OptionLabel),
    Next,
    Previous,
    /// One-based question number.
    Goto(usize),
    Flag,
    Submit,
    Quit,
    Help,
    Unknown(String),
}

fn parse_action(line: &str) -> Action {
    let line = line.trim();
    if let Ok(label) = line.parse::<OptionLabel>() {
        return Action::Select(label);
    }
    match line.to_lowercase().as_str() {
        "n" | "next" | "" => Action::Next,
        "p" | "prev" | "previous" => Action::Previous,
        "f" | "flag" => Action::Flag,
        "s" | "submit" => Action::Submit,
        "q" | "quit" => Action::Quit,
        "?" | "h" | "help" => Action::Help,
        other => match other
            .strip_prefix('g')
            .and_then(|n| n.trim().parse::<usize>().ok())
        {
            Some(n) => Action::Goto(n),
            None => Action::Unknown(line.to_string()),
        },
    }
}

/// How an interactive run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Ending {
    Submitted,
    Quit,
}

const HELP: &str = "Commands: a-d answer | n next | p previous | g N go to question N | f flag | s submit | q quit";

fn render_question(session: &Session, out: &mut impl Write) -> io::Result<()> {
    let q = session.current_question();
    let flag = if session.is_flagged(&q.id) { " [flagged]" } else { "" };
    writeln!(
        out,
        "\nQuestion {}/{}{} ({} answered)",
        session.position() + 1,
        session.len(),
        flag,
        session.answered_count()
    )?;
    writeln!(out, "{}", q.text)?;
    let selected = session.answer_for(&q.id);
    for label in OptionLabel::ALL {
        let marker = if selected == Some(label) { "*" } else { " " };
        writeln!(out, " {marker} {label}) {}", q.option(label))?;
    }
    out.flush()
}

/// Drive `session` from `input` until the user submits or quits.
/// End of input counts as quitting.
fn run_session(
    session: &mut Session,
    input: impl BufRead,
    out: &mut impl Write,
) -> io::Result<Ending> {
    writeln!(out, "{}: {} question(s)", session.test().title, session.len())?;
    writeln!(out, "{HELP}")?;
    render_question(session, out)?;

    for line in input.lines() {
        let line = line?;
        let now = Utc::now();
        match parse_action(&line) {
            Action::Select(label) => {
                session.select_answer(label, now);
                if !session.next(now) {
                    writeln!(out, "Last question answered. Enter `s` to submit.")?;
                }
            }
            Action::Next => {
                if !session.next(now) {
                    writeln!(out, "Already at the last question.")?;
                }
            }
            Action::Previous => {
                if !session.previous(now) {
                    writeln!(out, "Already at the first question.")?;
                }
            }
            Action::Goto(n) => {
                if n == 0 || !session.navigate(n - 1, now) {
                    writeln!(out, "No question {n}.")?;
                }
            }
            Action::Flag => {
                let flagged = session.toggle_flag();
                writeln!(out, "{}", if flagged { "Flagged." } else { "Unflagged." })?;
            }
            Action::Submit => {
                let unanswered = session.unanswered_count();
                if unanswered > 0 {
                    writeln!(out, "Submitting with {unanswered} unanswered question(s).")?;
                }
                return Ok(Ending::Submitted);
            }
            Action::Quit => return Ok(Ending::Quit),
            Action::Help => writeln!(out, "{HELP}")?,
            Action::Unknown(s) => writeln!(out, "Unknown command `{s}`. {HELP}")?,
        }
        render_question(session, out)?;
    }

    Ok(Ending::Quit)
}

fn print_results(session: &Session, result: &ScoreResult) {
    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct", "Result", "Time"]);
    for (i, (question, outcome)) in session.questions().iter().zip(&result.details).enumerate() {
        let status = match outcome.selected {
            None => "SKIPPED",
            Some(_) if outcome.is_correct => "OK",
            Some(_) => "WRONG",
        };
        let flag = if outcome.flagged { " (flagged)" } else { "" };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(truncate(&question.text, 50)),
            Cell::new(
                outcome
                    .selected
                    .map(|l| l.to_string())
                    .unwrap_or_else(|| "-".into()),
            ),
            Cell::new(outcome.correct_option),
            Cell::new(format!("{status}{flag}")),
            Cell::new(format!("{:.1}s", outcome.time_spent_ms as f64 / 1000.0)),
        ]);
    }
    println!("\n{table}");
    println!(
        "Score: {}/{} ({}%) in {:.1}s",
        result.correct,
        result.total,
        result.percentage,
        result.elapsed_ms as f64 / 1000.0
    );
}

pub async fn execute(config: Option<PathBuf>, user: Option<String>, test_id: String) -> Result<()> {
    let ctx = connect(config, user)?;
    if ctx.engine.auth().current_user().is_none() {
        anyhow::bail!("not signed in: set `user` in the config file or pass --user");
    }

    let mut session = ctx.engine.start_session(&test_id).await?;

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    match run_session(&mut session, stdin.lock(), &mut stdout)? {
        Ending::Quit => {
            println!("\nSession discarded, nothing was saved.");
            session.reset();
        }
        Ending::Submitted => {
            let submitted = ctx.engine.submit(&session).await?;
            print_results(&session, &submitted.result);
            println!("Saved attempt {}", submitted.attempt.id);
        }
    }
    Ok(())
}
