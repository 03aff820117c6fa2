//! Scoring of a finished session.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{OptionLabel, Question};

/// Outcome of one question within a scored session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOutcome {
    pub question_id: String,
    /// Selected option, `None` if the question was left unanswered.
    pub selected: Option<OptionLabel>,
    pub correct_option: OptionLabel,
    pub is_correct: bool,
    /// Informational only.
    pub flagged: bool,
    /// Time attributed to the question, 0 if never recorded.
    pub time_spent_ms: u64,
}

/// Result of scoring a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub correct: u32,
    pub total: u32,
    /// `round(correct / total * 100)`.
    pub percentage: u32,
    /// Wall-clock time from session start to scoring.
    pub elapsed_ms: u64,
    /// Per-question outcomes in original question order.
    pub details: Vec<QuestionOutcome>,
}

impl ScoreResult {
    pub fn incorrect(&self) -> u32 {
        self.total - self.correct
    }
}

/// Round `correct / total` to a whole percentage. Returns 0 when `total` is 0.
pub fn percentage(correct: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    (correct as f64 / total as f64 * 100.0).round() as u32
}

/// Score recorded answers against `questions`.
///
/// Unanswered questions count as incorrect. Pure: the same inputs always
/// give the same result.
pub fn score(
    questions: &[Question],
    answers: &HashMap<String, OptionLabel>,
    flags: &HashSet<String>,
    times: &HashMap<String, u64>,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> ScoreResult {
    let details: Vec<QuestionOutcome> = questions
        .iter()
        .map(|q| {
            let selected = answers.get(&q.id).copied();
            QuestionOutcome {
                question_id: q.id.clone(),
                selected,
                correct_option: q.correct,
                is_correct: selected == Some(q.correct),
                flagged: flags.contains(&q.id),
                time_spent_ms: times.get(&q.id).copied().unwrap_or(0),
            }
        })
        .collect();

    let correct = details.iter().filter(|d| d.is_correct).count() as u32;
    let total = questions.len() as u32;
    let elapsed_ms = (finished_at - started_at).num_milliseconds().max(0) as u64;

    ScoreResult {
        correct,
        total,
        percentage: percentage(correct, total),
        elapsed_ms,
        details,
    }
}
