//! In-progress test-taking state and navigation.
//!
//! A `Session` lives only in memory for one test-taking flow. Its question
//! list is a snapshot taken at start and never changes afterwards.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::error::SessionError;
use crate::model::{OptionLabel, Question, Test};
use crate::scorer::{score, ScoreResult};

/// Ephemeral state of one test being taken.
#[derive(Debug, Clone)]
pub struct Session {
    test: Test,
    questions: Vec<Question>,
    answers: HashMap<String, OptionLabel>,
    flags: HashSet<String>,
    times: HashMap<String, u64>,
    position: usize,
    started_at: DateTime<Utc>,
    visit_started_at: DateTime<Utc>,
}

impl Session {
    /// Start a session over `questions`.
    ///
    /// Fails with `SessionError::EmptyQuestionSet` when there is nothing to
    /// answer.
    pub fn start(
        test: Test,
        questions: Vec<Question>,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if questions.is_empty() {
            return Err(SessionError::EmptyQuestionSet);
        }

        Ok(Self {
            test,
            questions,
            answers: HashMap::new(),
            flags: HashSet::new(),
            times: HashMap::new(),
            position: 0,
            started_at: now,
            visit_started_at: now,
        })
    }

    pub fn test(&self) -> &Test {
        &self.test
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn answers(&self) -> &HashMap<String, OptionLabel> {
        &self.answers
    }

    pub fn flags(&self) -> &HashSet<String> {
        &self.flags
    }

    /// Milliseconds recorded per question id.
    pub fn times(&self) -> &HashMap<String, u64> {
        &self.times
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Zero-based index of the current question.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Number of questions in the session.
    pub fn len(&self) -> usize {
        self.questions.len()
    }

    /// Always `false`: a session cannot be started without questions.
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn current_question(&self) -> &Question {
        &self.questions[self.position]
    }

    /// Recorded answer for a question id.
    pub fn answer_for(&self, question_id: &str) -> Option<OptionLabel> {
        self.answers.get(question_id).copied()
    }

    pub fn is_answered(&self, question_id: &str) -> bool {
        self.answers.contains_key(question_id)
    }

    pub fn is_flagged(&self, question_id: &str) -> bool {
        self.flags.contains(question_id)
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    pub fn flagged_count(&self) -> usize {
        self.flags.len()
    }

    pub fn unanswered_count(&self) -> usize {
        self.questions.len() - self.answers.len()
    }

    /// Record `label` for the current question.
    ///
    /// The time attributed to the question is the time since it was last
    /// navigated to; changing the answer overwrites it.
    pub fn select_answer(&mut self, label: OptionLabel, now: DateTime<Utc>) {
        let question_id = self.questions[self.position].id.clone();
        let spent = (now - self.visit_started_at).num_milliseconds().max(0) as u64;
        tracing::debug!(question_id = %question_id, %label, spent_ms = spent, "answer selected");
        self.answers.insert(question_id.clone(), label);
        self.times.insert(question_id, spent);
    }

    /// Move to `index`. Out-of-range indices leave the position unchanged
    /// and return `false`.
    pub fn navigate(&mut self, index: usize, now: DateTime<Utc>) -> bool {
        if index >= self.questions.len() {
            return false;
        }
        self.position = index;
        self.visit_started_at = now;
        true
    }

    /// Move to the next question, if any.
    pub fn next(&mut self, now: DateTime<Utc>) -> bool {
        self.navigate(self.position + 1, now)
    }

    /// Move to the previous question, if any.
    pub fn previous(&mut self, now: DateTime<Utc>) -> bool {
        match self.position.checked_sub(1) {
            Some(index) => self.navigate(index, now),
            None => false,
        }
    }

    /// Flip the flag on the current question. Returns the new flag state.
    pub fn toggle_flag(&mut self) -> bool {
        let question_id = &self.questions[self.position].id;
        if self.flags.remove(question_id) {
            false
        } else {
            self.flags.insert(question_id.clone());
            true
        }
    }

    /// Score the session as of `finished_at`.
    pub fn score(&self, finished_at: DateTime<Utc>) -> ScoreResult {
        score(
            &self.questions,
            &self.answers,
            &self.flags,
            &self.times,
            self.started_at,
            finished_at,
        )
    }

    /// Discard the session.
    pub fn reset(self) {
        tracing::debug!(test_id = %self.test.id, "session discarded");
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    pub(crate) fn make_test() -> Test {
        Test {
            id: "t1".into(),
            title: "Arithmetic".into(),
            description: String::new(),
            is_active: true,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            owner_id: "owner".into(),
        }
    }

    pub(crate) fn make_question(id: &str, correct: OptionLabel) -> Question {
        Question {
            id: id.into(),
            test_id: "t1".into(),
            group: "Math".into(),
            text: format!("question {id}"),
            options: ["a".into(), "b".into(), "c".into(), "d".into()],
            correct,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap()
    }

    fn session(n: usize) -> Session {
        let questions = (0..n)
            .map(|i| make_question(&format!("q{i}"), OptionLabel::A))
            .collect();
        Session::start(make_test(), questions, t0()).unwrap()
    }

    #[test]
    fn start_rejects_empty_question_list() {
        let err = Session::start(make_test(), vec![], t0()).unwrap_err();
        assert_eq!(err, SessionError::EmptyQuestionSet);
    }

    #[test]
    fn start_initializes_empty_state() {
        let s = session(3);
        assert_eq!(s.position(), 0);
        assert_eq!(s.len(), 3);
        assert!(s.answers().is_empty());
        assert!(s.flags().is_empty());
        assert!(s.times().is_empty());
        assert_eq!(s.started_at(), t0());
        assert_eq!(s.unanswered_count(), 3);
    }

    #[test]
    fn navigate_out_of_range_is_noop() {
        let mut s = session(3);
        assert!(s.navigate(2, t0()));
        assert_eq!(s.position(), 2);
        assert!(!s.navigate(3, t0()));
        assert!(!s.navigate(usize::MAX, t0()));
        assert_eq!(s.position(), 2);
    }

    #[test]
    fn next_and_previous_stay_in_bounds() {
        let mut s = session(2);
        assert!(!s.previous(t0()));
        assert!(s.next(t0()));
        assert!(!s.next(t0()));
        assert_eq!(s.position(), 1);
        assert!(s.previous(t0()));
        assert_eq!(s.position(), 0);
    }

    #[test]
    fn answer_time_is_measured_from_last_visit() {
        let mut s = session(2);
        s.select_answer(OptionLabel::B, t0() + Duration::seconds(5));
        assert_eq!(s.times()["q0"], 5_000);

        s.navigate(1, t0() + Duration::seconds(10));
        s.navigate(0, t0() + Duration::seconds(20));
        s.select_answer(OptionLabel::C, t0() + Duration::seconds(23));

        // last answer's timer wins, not cumulative
        assert_eq!(s.times()["q0"], 3_000);
        assert_eq!(s.answer_for("q0"), Some(OptionLabel::C));
        assert!(s.is_answered("q0"));
        assert!(!s.is_answered("q1"));
        assert_eq!(s.answered_count(), 1);
    }

    #[test]
    fn answer_before_visit_start_records_zero() {
        let mut s = session(1);
        s.select_answer(OptionLabel::A, t0() - Duration::seconds(1));
        assert_eq!(s.times()["q0"], 0);
    }

    #[test]
    fn toggle_flag_flips_membership() {
        let mut s = session(2);
        assert!(s.toggle_flag());
        assert!(s.is_flagged("q0"));
        assert!(!s.toggle_flag());
        assert!(!s.is_flagged("q0"));
        assert_eq!(s.flagged_count(), 0);
    }

    #[test]
    fn flags_do_not_affect_score() {
        let mut s = session(2);
        s.select_answer(OptionLabel::A, t0());
        let unflagged = s.score(t0());
        s.toggle_flag();
        let flagged = s.score(t0());
        assert_eq!(unflagged.correct, flagged.correct);
        assert_eq!(unflagged.percentage, flagged.percentage);
    }
}
