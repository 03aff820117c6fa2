//! Central orchestrator.
//!
//! `QuizEngine` ties the backend, the auth hub and the pure session,
//! scoring and statistics modules together. Every operation awaits its
//! backend calls in sequence; only the collection fetches that feed a view
//! run concurrently and are joined before aggregation.

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::auth::AuthHub;
use crate::error::{SessionError, ValidationError};
use crate::loader::{self, ViewSlot};
use crate::model::{
    Attempt, Group, ImportedQuestion, OptionLabel, Question, Test, User, UserAnswer, DEFAULT_GROUP,
};
use crate::report::{CollectionSnapshot, ExportDocument};
use crate::scorer::ScoreResult;
use crate::session::Session;
use crate::statistics::{AdminOverview, DashboardSummary, StatisticsReport};
use crate::traits::{Backend, Direction, ListQuery};

/// User input for a new or edited question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionDraft {
    pub text: String,
    pub options: [String; 4],
    pub correct: OptionLabel,
    /// Empty means the default group.
    #[serde(default)]
    pub group: String,
}

impl QuestionDraft {
    /// Check required fields before anything is written.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.text.trim().is_empty() {
            return Err(ValidationError::MissingField("question text"));
        }
        if self.options.iter().any(|o| o.trim().is_empty()) {
            return Err(ValidationError::IncompleteOptions);
        }
        Ok(())
    }

    fn group_name(&self) -> String {
        match self.group.trim() {
            "" => DEFAULT_GROUP.to_string(),
            g => g.to_string(),
        }
    }
}

impl TryFrom<&ImportedQuestion> for QuestionDraft {
    type Error = ValidationError;

    fn try_from(q: &ImportedQuestion) -> Result<Self, Self::Error> {
        let correct = q
            .correct_label()
            .ok_or(ValidationError::CorrectOutOfRange(q.correct_index))?;
        Ok(Self {
            text: q.text.clone(),
            options: q.options.clone(),
            correct,
            group: q.group.clone(),
        })
    }
}

/// What an import wrote.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportSummary {
    pub questions_created: usize,
    /// Names of groups that did not exist before the import.
    pub groups_created: Vec<String>,
}

/// A persisted attempt together with its score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedAttempt {
    pub attempt: Attempt,
    pub result: ScoreResult,
    pub answers_saved: usize,
}

/// Orchestrates quiz operations against a backend.
#[derive(Clone)]
pub struct QuizEngine {
    backend: Arc<dyn Backend>,
    auth: AuthHub,
}

impl QuizEngine {
    pub fn new(backend: Arc<dyn Backend>, auth: AuthHub) -> Self {
        Self { backend, auth }
    }

    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    pub fn auth(&self) -> &AuthHub {
        &self.auth
    }

    fn require_user(&self) -> Result<User, ValidationError> {
        self.auth.current_user().ok_or(ValidationError::NotSignedIn)
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    /// Create a test owned by the signed-in user.
    pub async fn create_test(&self, title: &str, description: &str) -> Result<Test> {
        let user = self.require_user()?;
        if title.trim().is_empty() {
            return Err(ValidationError::MissingField("title").into());
        }

        let test = Test {
            id: String::new(),
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            is_active: true,
            created_at: Utc::now(),
            owner_id: user.id,
        };
        let test = self
            .backend
            .tests()
            .create(test)
            .await
            .context("failed to create test")?;
        tracing::info!(test_id = %test.id, title = %test.title, "test created");
        Ok(test)
    }

    /// All tests, newest first.
    pub async fn list_tests(&self) -> Result<Vec<Test>> {
        let query = ListQuery::all().order_by("created_at", Direction::Desc);
        let tests = self.backend.tests().list(&query).await?;
        tracing::debug!(count = tests.len(), "tests loaded");
        Ok(tests)
    }

    /// Fetch one test, failing if it does not exist.
    pub async fn get_test(&self, test_id: &str) -> Result<Test> {
        self.backend
            .tests()
            .get(test_id)
            .await?
            .ok_or_else(|| {
                ValidationError::NotFound {
                    kind: "test",
                    id: test_id.to_string(),
                }
                .into()
            })
    }

    /// Open or close a test for new attempts.
    pub async fn set_test_active(&self, test_id: &str, active: bool) -> Result<Test> {
        let mut test = self.get_test(test_id).await?;
        test.is_active = active;
        let test = self.backend.tests().update(test_id, test).await?;
        tracing::info!(test_id, active, "test activation changed");
        Ok(test)
    }

    /// Delete a test and its questions. Returns the number of questions
    /// removed. Attempts on the test are kept.
    pub async fn delete_test(&self, test_id: &str) -> Result<usize> {
        self.get_test(test_id).await?;
        let questions = self.list_questions(test_id).await?;
        for q in &questions {
            self.backend.questions().delete(&q.id).await?;
        }
        self.backend.tests().delete(test_id).await?;
        tracing::info!(test_id, questions = questions.len(), "test deleted");
        Ok(questions.len())
    }

    // -----------------------------------------------------------------------
    // Groups
    // -----------------------------------------------------------------------

    /// Create a group owned by the signed-in user.
    pub async fn create_group(&self, name: &str, description: &str) -> Result<Group> {
        let user = self.require_user()?;
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("group name").into());
        }
        let group = self
            .backend
            .groups()
            .create(Group {
                id: String::new(),
                name: name.trim().to_string(),
                description: description.trim().to_string(),
                owner_id: user.id,
                created_at: Utc::now(),
            })
            .await
            .context("failed to create group")?;
        tracing::info!(group_id = %group.id, name = %group.name, "group created");
        Ok(group)
    }

    /// The signed-in user's groups, by name.
    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        let user = self.require_user()?;
        let query = ListQuery::all()
            .eq("owner_id", user.id)
            .order_by("name", Direction::Asc);
        Ok(self.backend.groups().list(&query).await?)
    }

    pub async fn delete_group(&self, group_id: &str) -> Result<()> {
        self.backend.groups().delete(group_id).await?;
        tracing::info!(group_id, "group deleted");
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Questions
    // -----------------------------------------------------------------------

    /// Questions of a test in creation order.
    pub async fn list_questions(&self, test_id: &str) -> Result<Vec<Question>> {
        let query = ListQuery::all()
            .eq("test_id", test_id)
            .order_by("created_at", Direction::Asc);
        let questions = self.backend.questions().list(&query).await?;
        tracing::debug!(test_id, count = questions.len(), "questions loaded");
        Ok(questions)
    }

    pub async fn add_question(&self, test_id: &str, draft: QuestionDraft) -> Result<Question> {
        draft.validate()?;
        self.get_test(test_id).await?;
        let question = self
            .backend
            .questions()
            .create(Question {
                id: String::new(),
                test_id: test_id.to_string(),
                group: draft.group_name(),
                text: draft.text.trim().to_string(),
                options: draft.options.map(|o| o.trim().to_string()),
                correct: draft.correct,
                created_at: Utc::now(),
            })
            .await
            .context("failed to create question")?;
        tracing::info!(test_id, question_id = %question.id, "question added");
        Ok(question)
    }

    /// Replace the text, options, answer and group of a question.
    pub async fn update_question(&self, question_id: &str, draft: QuestionDraft) -> Result<Question> {
        draft.validate()?;
        let mut question = self
            .backend
            .questions()
            .get(question_id)
            .await?
            .ok_or_else(|| ValidationError::NotFound {
                kind: "question",
                id: question_id.to_string(),
            })?;
        question.group = draft.group_name();
        question.text = draft.text.trim().to_string();
        question.options = draft.options.map(|o| o.trim().to_string());
        question.correct = draft.correct;

        let question = self.backend.questions().update(question_id, question).await?;
        tracing::info!(question_id, "question updated");
        Ok(question)
    }

    pub async fn delete_question(&self, question_id: &str) -> Result<()> {
        self.backend.questions().delete(question_id).await?;
        tracing::info!(question_id, "question deleted");
        Ok(())
    }

    /// Add parsed questions to a test, creating any group the signed-in
    /// user does not have yet.
    pub async fn import_questions(
        &self,
        test_id: &str,
        records: &[ImportedQuestion],
    ) -> Result<ImportSummary> {
        self.require_user()?;
        self.get_test(test_id).await?;
        let drafts = records
            .iter()
            .map(QuestionDraft::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        for draft in &drafts {
            draft.validate()?;
        }

        let mut known: HashSet<String> = self
            .list_groups()
            .await?
            .into_iter()
            .map(|g| g.name)
            .collect();
        let mut summary = ImportSummary::default();
        for draft in &drafts {
            let name = draft.group_name();
            if known.insert(name.clone()) {
                self.create_group(&name, "").await?;
                summary.groups_created.push(name);
            }
        }

        for draft in drafts {
            self.add_question(test_id, draft).await?;
            summary.questions_created += 1;
        }
        tracing::info!(
            test_id,
            questions = summary.questions_created,
            groups = summary.groups_created.len(),
            "import complete"
        );
        Ok(summary)
    }

    // -----------------------------------------------------------------------
    // Taking tests
    // -----------------------------------------------------------------------

    /// Start a session on an active test. Its questions are fetched once.
    pub async fn start_session(&self, test_id: &str) -> Result<Session> {
        let test = self.get_test(test_id).await?;
        if !test.is_active {
            return Err(SessionError::InactiveTest(test.title).into());
        }
        let questions = self.list_questions(test_id).await?;
        let session = Session::start(test, questions, Utc::now())?;
        tracing::info!(test_id, questions = session.len(), "session started");
        Ok(session)
    }

    /// Score `session` and persist the attempt followed by one answer per
    /// answered question.
    ///
    /// Not atomic: if an answer write fails, the attempt stays with the
    /// answers saved before the failure.
    pub async fn submit(&self, session: &Session) -> Result<SubmittedAttempt> {
        let user = self.require_user()?;
        let finished_at = Utc::now();
        let result = session.score(finished_at);

        let attempt = self
            .backend
            .attempts()
            .create(Attempt {
                id: String::new(),
                test_id: session.test().id.clone(),
                user_id: user.id.clone(),
                correct_count: result.correct,
                total_questions: result.total,
                elapsed_ms: result.elapsed_ms,
                started_at: session.started_at(),
                completed_at: Some(finished_at),
            })
            .await
            .context("failed to save attempt")?;

        let mut answers_saved = 0;
        for outcome in &result.details {
            let Some(selected) = outcome.selected else {
                continue;
            };
            self.backend
                .answers()
                .create(UserAnswer {
                    id: String::new(),
                    attempt_id: attempt.id.clone(),
                    question_id: outcome.question_id.clone(),
                    user_id: user.id.clone(),
                    selected,
                    is_correct: outcome.is_correct,
                    time_spent_ms: outcome.time_spent_ms,
                    created_at: finished_at,
                })
                .await
                .context("failed to save answer")?;
            answers_saved += 1;
        }

        tracing::info!(
            attempt_id = %attempt.id,
            correct = result.correct,
            total = result.total,
            "attempt submitted"
        );
        Ok(SubmittedAttempt {
            attempt,
            result,
            answers_saved,
        })
    }

    /// Delete an attempt and its answers. Returns the number of answers
    /// removed.
    pub async fn delete_attempt(&self, attempt_id: &str) -> Result<usize> {
        let answers = self
            .backend
            .answers()
            .list(&ListQuery::all().eq("attempt_id", attempt_id))
            .await?;
        for a in &answers {
            self.backend.answers().delete(&a.id).await?;
        }
        self.backend.attempts().delete(attempt_id).await?;
        tracing::info!(attempt_id, answers = answers.len(), "attempt deleted");
        Ok(answers.len())
    }

    // -----------------------------------------------------------------------
    // Views
    // -----------------------------------------------------------------------

    /// The signed-in user's dashboard.
    pub async fn dashboard(&self) -> Result<DashboardSummary> {
        let user = self.require_user()?;
        let all = ListQuery::all();
        let own = ListQuery::all().eq("owner_id", user.id.as_str());
        let mine = ListQuery::all().eq("user_id", user.id.as_str());

        let (tests, questions, groups, attempts) = futures::try_join!(
            self.backend.tests().list(&all),
            self.backend.questions().list(&all),
            self.backend.groups().list(&own),
            self.backend.attempts().list(&mine),
        )?;
        tracing::debug!(user_id = %user.id, "dashboard data loaded");
        Ok(DashboardSummary::compute(
            &user.id, &tests, &questions, &groups, &attempts,
        ))
    }

    /// Statistics over the tests owned by the signed-in user.
    pub async fn statistics(&self) -> Result<StatisticsReport> {
        let user = self.require_user()?;
        let all = ListQuery::all();
        let own = ListQuery::all()
            .eq("owner_id", user.id.as_str())
            .order_by("created_at", Direction::Asc);

        let (tests, questions, attempts, answers) = futures::try_join!(
            self.backend.tests().list(&own),
            self.backend.questions().list(&all),
            self.backend.attempts().list(&all),
            self.backend.answers().list(&all),
        )?;
        tracing::debug!(user_id = %user.id, tests = tests.len(), "statistics data loaded");
        Ok(StatisticsReport::compute(
            &tests,
            &questions,
            &attempts,
            &answers,
            Utc::now().date_naive(),
        ))
    }

    /// System-wide figures.
    pub async fn admin_overview(&self) -> Result<AdminOverview> {
        let snapshot = self.snapshot().await?;
        Ok(AdminOverview::compute(
            &snapshot.tests,
            &snapshot.questions,
            &snapshot.groups,
            &snapshot.attempts,
            &snapshot.answers,
            Utc::now().date_naive(),
        ))
    }

    /// Fetch every collection.
    pub async fn snapshot(&self) -> Result<CollectionSnapshot> {
        let all = ListQuery::all();
        let (tests, questions, groups, attempts, answers) = futures::try_join!(
            self.backend.tests().list(&all),
            self.backend.questions().list(&all),
            self.backend.groups().list(&all),
            self.backend.attempts().list(&all),
            self.backend.answers().list(&all),
        )?;
        tracing::debug!(backend = self.backend.name(), "snapshot loaded");
        Ok(CollectionSnapshot {
            tests,
            questions,
            groups,
            attempts,
            answers,
        })
    }

    /// Build an anonymized export of every collection.
    pub async fn export(&self) -> Result<ExportDocument> {
        let snapshot = self.snapshot().await?;
        Ok(ExportDocument::build(snapshot, Utc::now()))
    }

    /// Run `load` and store its result in `slot` unless a newer load began
    /// meanwhile. Returns whether the result was applied.
    pub async fn refresh<T, F>(&self, slot: &ViewSlot<T>, load: F) -> Result<bool>
    where
        F: Future<Output = Result<T>>,
    {
        loader::refresh(slot, load).await
    }
}

impl std::fmt::Debug for QuizEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuizEngine")
            .field("backend", &self.backend.name())
            .field("auth", &self.auth)
            .finish()
    }
}
