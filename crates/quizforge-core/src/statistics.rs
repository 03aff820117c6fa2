//! Aggregate statistics over tests, questions and attempts.
//!
//! Every routine is a pure function over full collections; nothing is
//! cached between calls.

use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{Attempt, Group, Question, Test, UserAnswer};
use crate::scorer::percentage;

/// Length of the trailing daily activity series.
pub const DAILY_WINDOW_DAYS: usize = 7;

/// Number of attempts listed on the dashboard.
pub const RECENT_ATTEMPTS: usize = 5;

/// Number of tests listed in the admin overview ranking.
pub const TOP_TESTS: usize = 5;

/// Score ranges of the distribution buckets, bounds inclusive.
const BUCKETS: [(u32, u32); 5] = [(0, 20), (21, 40), (41, 60), (61, 80), (81, 100)];

/// Percentage score of one attempt.
pub fn attempt_score(attempt: &Attempt) -> u32 {
    percentage(attempt.correct_count, attempt.total_questions)
}

/// Number of distinct users with at least one attempt.
pub fn unique_users(attempts: &[Attempt]) -> usize {
    attempts
        .iter()
        .map(|a| a.user_id.as_str())
        .collect::<HashSet<_>>()
        .len()
}

/// Mean score of completed attempts, 0 when there are none.
pub fn average_score(attempts: &[Attempt]) -> f64 {
    let scores: Vec<u32> = attempts
        .iter()
        .filter(|a| a.is_completed())
        .map(attempt_score)
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().map(|&s| s as f64).sum::<f64>() / scores.len() as f64
}

/// Completed attempts as a percentage of all attempts, 0 when there are none.
pub fn completion_rate(attempts: &[Attempt]) -> f64 {
    if attempts.is_empty() {
        return 0.0;
    }
    let completed = attempts.iter().filter(|a| a.is_completed()).count();
    completed as f64 / attempts.len() as f64 * 100.0
}

/// One bar of the score distribution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBucket {
    /// e.g. "21-40".
    pub label: String,
    pub min: u32,
    pub max: u32,
    pub count: usize,
}

/// Index of the bucket a score falls in.
pub fn bucket_index(score: u32) -> usize {
    BUCKETS
        .iter()
        .position(|&(_, max)| score <= max)
        .unwrap_or(BUCKETS.len() - 1)
}

/// Count completed attempts per score range.
pub fn score_distribution(attempts: &[Attempt]) -> Vec<ScoreBucket> {
    let mut counts = [0usize; BUCKETS.len()];
    for attempt in attempts.iter().filter(|a| a.is_completed()) {
        counts[bucket_index(attempt_score(attempt))] += 1;
    }

    BUCKETS
        .iter()
        .zip(counts)
        .map(|(&(min, max), count)| ScoreBucket {
            label: format!("{min}-{max}"),
            min,
            max,
            count,
        })
        .collect()
}

/// Completed attempts on one day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCount {
    pub date: NaiveDate,
    pub count: usize,
}

/// Dense, oldest-first series of the `days` days ending on `today`,
/// counting completed attempts by completion date.
pub fn daily_activity(attempts: &[Attempt], today: NaiveDate, days: usize) -> Vec<DailyCount> {
    let mut per_day: HashMap<NaiveDate, usize> = HashMap::new();
    for completed_at in attempts.iter().filter_map(|a| a.completed_at) {
        *per_day.entry(completed_at.date_naive()).or_default() += 1;
    }

    (0..days)
        .rev()
        .map(|offset| {
            let date = today - Duration::days(offset as i64);
            DailyCount {
                date,
                count: per_day.get(&date).copied().unwrap_or(0),
            }
        })
        .collect()
}

/// Correct-answer rate of one question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionDifficulty {
    pub question_id: String,
    pub test_id: String,
    pub text: String,
    pub group: String,
    pub answered: usize,
    pub correct: usize,
    /// Fraction in `0.0..=1.0`.
    pub correct_rate: f64,
}

/// Rank questions by correct-answer rate, hardest first.
///
/// Questions nobody has answered are left out.
pub fn question_difficulty(
    questions: &[Question],
    answers: &[UserAnswer],
) -> Vec<QuestionDifficulty> {
    let mut tally: HashMap<&str, (usize, usize)> = HashMap::new();
    for answer in answers {
        let entry = tally.entry(answer.question_id.as_str()).or_default();
        entry.0 += 1;
        if answer.is_correct {
            entry.1 += 1;
        }
    }

    let mut ranked: Vec<QuestionDifficulty> = questions
        .iter()
        .filter_map(|q| {
            let &(answered, correct) = tally.get(q.id.as_str())?;
            Some(QuestionDifficulty {
                question_id: q.id.clone(),
                test_id: q.test_id.clone(),
                text: q.text.clone(),
                group: q.group.clone(),
                answered,
                correct,
                correct_rate: correct as f64 / answered as f64,
            })
        })
        .collect();

    ranked.sort_by(|a, b| a.correct_rate.total_cmp(&b.correct_rate));
    ranked
}

/// Number of questions carrying one group label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupCount {
    pub group: String,
    pub questions: usize,
}

/// Question counts per group label, ordered by name.
pub fn group_breakdown(questions: &[Question]) -> Vec<GroupCount> {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for q in questions {
        *counts.entry(q.group.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(group, questions)| GroupCount {
            group: group.to_string(),
            questions,
        })
        .collect()
}

/// Statistics for a single test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestStats {
    pub test_id: String,
    pub title: String,
    pub is_active: bool,
    pub question_count: usize,
    pub attempts: usize,
    pub completed: usize,
    pub average_score: f64,
}

/// Per-test question and attempt counts, in the order of `tests`.
pub fn test_breakdown(
    tests: &[Test],
    questions: &[Question],
    attempts: &[Attempt],
) -> Vec<TestStats> {
    let mut question_counts: HashMap<&str, usize> = HashMap::new();
    for q in questions {
        *question_counts.entry(q.test_id.as_str()).or_default() += 1;
    }

    let mut attempts_by_test: HashMap<&str, Vec<Attempt>> = HashMap::new();
    for a in attempts {
        attempts_by_test
            .entry(a.test_id.as_str())
            .or_default()
            .push(a.clone());
    }

    tests
        .iter()
        .map(|t| {
            let test_attempts = attempts_by_test
                .get(t.id.as_str())
                .map(Vec::as_slice)
                .unwrap_or_default();
            TestStats {
                test_id: t.id.clone(),
                title: t.title.clone(),
                is_active: t.is_active,
                question_count: question_counts.get(t.id.as_str()).copied().unwrap_or(0),
                attempts: test_attempts.len(),
                completed: test_attempts.iter().filter(|a| a.is_completed()).count(),
                average_score: average_score(test_attempts),
            }
        })
        .collect()
}

/// Headline attempt figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    pub total_attempts: usize,
    pub completed_attempts: usize,
    pub unique_users: usize,
    pub average_score: f64,
    pub completion_rate: f64,
}

impl Overview {
    pub fn compute(attempts: &[Attempt]) -> Self {
        Self {
            total_attempts: attempts.len(),
            completed_attempts: attempts.iter().filter(|a| a.is_completed()).count(),
            unique_users: unique_users(attempts),
            average_score: average_score(attempts),
            completion_rate: completion_rate(attempts),
        }
    }
}

/// An attempt as listed on the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentAttempt {
    pub attempt_id: String,
    pub test_id: String,
    pub test_title: String,
    pub score: u32,
    pub completed_at: Option<DateTime<Utc>>,
}

/// The signed-in user's landing summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub user_id: String,
    /// Tests owned by the user.
    pub tests: usize,
    pub active_tests: usize,
    /// Questions in the user's tests.
    pub questions: usize,
    /// Groups owned by the user.
    pub groups: usize,
    /// Attempts taken by the user.
    pub attempts: usize,
    pub average_score: f64,
    pub recent_attempts: Vec<RecentAttempt>,
}

impl DashboardSummary {
    pub fn compute(
        user_id: &str,
        tests: &[Test],
        questions: &[Question],
        groups: &[Group],
        attempts: &[Attempt],
    ) -> Self {
        let own_tests: Vec<&Test> = tests.iter().filter(|t| t.owner_id == user_id).collect();
        let own_test_ids: HashSet<&str> = own_tests.iter().map(|t| t.id.as_str()).collect();
        let titles: HashMap<&str, &str> = tests
            .iter()
            .map(|t| (t.id.as_str(), t.title.as_str()))
            .collect();

        let mut own_attempts: Vec<Attempt> = attempts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect();
        let average = average_score(&own_attempts);
        let attempt_count = own_attempts.len();

        own_attempts.sort_by_key(|a| std::cmp::Reverse(a.completed_at.unwrap_or(a.started_at)));
        let recent_attempts = own_attempts
            .iter()
            .take(RECENT_ATTEMPTS)
            .map(|a| RecentAttempt {
                attempt_id: a.id.clone(),
                test_id: a.test_id.clone(),
                test_title: titles
                    .get(a.test_id.as_str())
                    .map(|t| t.to_string())
                    .unwrap_or_else(|| "(deleted test)".to_string()),
                score: attempt_score(a),
                completed_at: a.completed_at,
            })
            .collect();

        Self {
            user_id: user_id.to_string(),
            tests: own_tests.len(),
            active_tests: own_tests.iter().filter(|t| t.is_active).count(),
            questions: questions
                .iter()
                .filter(|q| own_test_ids.contains(q.test_id.as_str()))
                .count(),
            groups: groups.iter().filter(|g| g.owner_id == user_id).count(),
            attempts: attempt_count,
            average_score: average,
            recent_attempts,
        }
    }
}

/// Statistics over a set of tests and their attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsReport {
    pub overview: Overview,
    pub distribution: Vec<ScoreBucket>,
    pub daily_activity: Vec<DailyCount>,
    pub per_test: Vec<TestStats>,
    pub per_group: Vec<GroupCount>,
    /// Hardest first.
    pub difficulty: Vec<QuestionDifficulty>,
}

impl StatisticsReport {
    /// Compute statistics for `tests`. Questions, attempts and answers that
    /// do not belong to one of them are ignored.
    pub fn compute(
        tests: &[Test],
        questions: &[Question],
        attempts: &[Attempt],
        answers: &[UserAnswer],
        today: NaiveDate,
    ) -> Self {
        let test_ids: HashSet<&str> = tests.iter().map(|t| t.id.as_str()).collect();
        let questions: Vec<Question> = questions
            .iter()
            .filter(|q| test_ids.contains(q.test_id.as_str()))
            .cloned()
            .collect();
        let attempts: Vec<Attempt> = attempts
            .iter()
            .filter(|a| test_ids.contains(a.test_id.as_str()))
            .cloned()
            .collect();

        Self {
            overview: Overview::compute(&attempts),
            distribution: score_distribution(&attempts),
            daily_activity: daily_activity(&attempts, today, DAILY_WINDOW_DAYS),
            per_test: test_breakdown(tests, &questions, &attempts),
            per_group: group_breakdown(&questions),
            difficulty: question_difficulty(&questions, answers),
        }
    }
}

/// Attempt activity of one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserActivity {
    pub user_id: String,
    pub attempts: usize,
    pub completed: usize,
    pub average_score: f64,
}

/// System-wide figures for administrators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminOverview {
    pub total_tests: usize,
    pub active_tests: usize,
    pub total_questions: usize,
    pub total_groups: usize,
    pub total_answers: usize,
    pub overview: Overview,
    /// Most active users first.
    pub per_user: Vec<UserActivity>,
    /// Tests with the most attempts.
    pub top_tests: Vec<TestStats>,
    pub distribution: Vec<ScoreBucket>,
    pub daily_activity: Vec<DailyCount>,
}

impl AdminOverview {
    pub fn compute(
        tests: &[Test],
        questions: &[Question],
        groups: &[Group],
        attempts: &[Attempt],
        answers: &[UserAnswer],
        today: NaiveDate,
    ) -> Self {
        let mut by_user: BTreeMap<&str, Vec<Attempt>> = BTreeMap::new();
        for a in attempts {
            by_user.entry(a.user_id.as_str()).or_default().push(a.clone());
        }
        let mut per_user: Vec<UserActivity> = by_user
            .into_iter()
            .map(|(user_id, user_attempts)| UserActivity {
                user_id: user_id.to_string(),
                attempts: user_attempts.len(),
                completed: user_attempts.iter().filter(|a| a.is_completed()).count(),
                average_score: average_score(&user_attempts),
            })
            .collect();
        // Stable: ties keep user id order
        per_user.sort_by(|a, b| b.attempts.cmp(&a.attempts));

        let mut top_tests = test_breakdown(tests, questions, attempts);
        top_tests.sort_by(|a, b| b.attempts.cmp(&a.attempts));
        top_tests.truncate(TOP_TESTS);

        Self {
            total_tests: tests.len(),
            active_tests: tests.iter().filter(|t| t.is_active).count(),
            total_questions: questions.len(),
            total_groups: groups.len(),
            total_answers: answers.len(),
            overview: Overview::compute(attempts),
            per_user,
            top_tests,
            distribution: score_distribution(attempts),
            daily_activity: daily_activity(attempts, today, DAILY_WINDOW_DAYS),
        }
    }
}
