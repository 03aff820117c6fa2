//! QuizEngine behaviour against the in-memory backend.

use std::sync::Arc;

use quizforge_core::auth::AuthHub;
use quizforge_core::engine::{QuestionDraft, QuizEngine};
use quizforge_core::error::{SessionError, StoreError, ValidationError};
use quizforge_core::loader::ViewSlot;
use quizforge_core::model::{ImportedQuestion, OptionLabel, User};
use quizforge_core::parser::{parse_import, ImportFormat};
use quizforge_core::report::ANONYMOUS_USER;
use quizforge_store::InMemoryBackend;

fn setup() -> (QuizEngine, Arc<InMemoryBackend>) {
    let backend = Arc::new(InMemoryBackend::new());
    let auth = AuthHub::new();
    auth.sign_in(User {
        id: "alice".into(),
        email: Some("alice@example.test".into()),
    });
    (QuizEngine::new(backend.clone(), auth), backend)
}

fn draft(text: &str, correct: OptionLabel) -> QuestionDraft {
    QuestionDraft {
        text: text.into(),
        options: ["one".into(), "two".into(), "three".into(), "four".into()],
        correct,
        group: String::new(),
    }
}

async fn seeded_test(engine: &QuizEngine, questions: usize) -> String {
    let test = engine.create_test("Numbers", "counting").await.unwrap();
    for i in 0..questions {
        let label = OptionLabel::from_index(i % 4).unwrap();
        engine
            .add_question(&test.id, draft(&format!("Question {i}"), label))
            .await
            .unwrap();
    }
    test.id
}

#[tokio::test]
async fn writes_require_sign_in() {
    let backend = Arc::new(InMemoryBackend::new());
    let engine = QuizEngine::new(backend.clone(), AuthHub::new());

    let err = engine.create_test("Title", "").await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<ValidationError>(),
        Some(&ValidationError::NotSignedIn)
    );
    assert_eq!(backend.tests.write_calls(), 0);
}

#[tokio::test]
async fn create_test_requires_title() {
    let (engine, backend) = setup();
    let err = engine.create_test("   ", "").await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<ValidationError>(),
        Some(&ValidationError::MissingField("title"))
    );
    assert!(backend.tests.records().is_empty());
}

#[tokio::test]
async fn add_question_validates_before_writing() {
    let (engine, backend) = setup();
    let test_id = seeded_test(&engine, 0).await;

    let mut bad = draft("Q", OptionLabel::A);
    bad.options[3] = String::new();
    let err = engine.add_question(&test_id, bad).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<ValidationError>(),
        Some(&ValidationError::IncompleteOptions)
    );
    assert_eq!(backend.questions.write_calls(), 0);

    let err = engine
        .add_question("missing", draft("Q", OptionLabel::A))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("test not found"));
}

#[tokio::test]
async fn take_and_submit_persists_attempt_and_answered_questions_only() {
    let (engine, backend) = setup();
    let test_id = seeded_test(&engine, 3).await;

    let mut session = engine.start_session(&test_id).await.unwrap();
    assert_eq!(session.len(), 3);
    let now = session.started_at();

    // q0 correct (A), q1 wrong, q2 left unanswered
    session.select_answer(OptionLabel::A, now);
    session.next(now);
    session.select_answer(OptionLabel::D, now);
    session.toggle_flag();

    let submitted = engine.submit(&session).await.unwrap();
    assert_eq!(submitted.result.correct, 1);
    assert_eq!(submitted.result.total, 3);
    assert_eq!(submitted.result.percentage, 33);
    assert_eq!(submitted.answers_saved, 2);

    let attempts = backend.attempts.records();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].user_id, "alice");
    assert_eq!(attempts[0].correct_count, 1);
    assert!(attempts[0].is_completed());

    let answers = backend.answers.records();
    assert_eq!(answers.len(), 2);
    assert!(answers.iter().all(|a| a.attempt_id == attempts[0].id));
    assert_eq!(answers.iter().filter(|a| a.is_correct).count(), 1);
}

#[tokio::test]
async fn session_questions_follow_creation_order() {
    let (engine, _backend) = setup();
    let test_id = seeded_test(&engine, 5).await;
    let session = engine.start_session(&test_id).await.unwrap();
    let texts: Vec<&str> = session.questions().iter().map(|q| q.text.as_str()).collect();
    assert_eq!(
        texts,
        vec!["Question 0", "Question 1", "Question 2", "Question 3", "Question 4"]
    );
}

#[tokio::test]
async fn start_session_rejects_empty_and_inactive_tests() {
    let (engine, _backend) = setup();
    let empty = seeded_test(&engine, 0).await;
    let err = engine.start_session(&empty).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<SessionError>(),
        Some(&SessionError::EmptyQuestionSet)
    );

    let closed = seeded_test(&engine, 2).await;
    engine.set_test_active(&closed, false).await.unwrap();
    let err = engine.start_session(&closed).await.unwrap_err();
    assert!(matches!(
        err.downcast_ref::<SessionError>(),
        Some(SessionError::InactiveTest(_))
    ));

    engine.set_test_active(&closed, true).await.unwrap();
    assert!(engine.start_session(&closed).await.is_ok());
}

#[tokio::test]
async fn submit_without_user_writes_nothing() {
    let (engine, backend) = setup();
    let test_id = seeded_test(&engine, 1).await;
    let session = engine.start_session(&test_id).await.unwrap();

    engine.auth().sign_out();
    let err = engine.submit(&session).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<ValidationError>(),
        Some(&ValidationError::NotSignedIn)
    );
    assert!(backend.attempts.records().is_empty());
}

#[tokio::test]
async fn import_creates_missing_groups_once() {
    let (engine, backend) = setup();
    let test_id = seeded_test(&engine, 0).await;
    engine.create_group("Math", "existing").await.unwrap();

    let content = r#"[
        {"question": "1 + 1?", "answers": ["1", "2", "3", "4"], "correctAnswer": 1, "group": "Math"},
        {"question": "H2O?", "answers": ["water", "salt", "air", "fire"], "group": "Science"},
        {"question": "Fe?", "answers": ["iron", "gold", "tin", "lead"], "group": "Science"},
        {"question": "Misc?", "answers": ["a", "b", "c", "d"]}
    ]"#;
    let outcome = parse_import(content, ImportFormat::Json).unwrap();
    let summary = engine
        .import_questions(&test_id, &outcome.questions)
        .await
        .unwrap();

    assert_eq!(summary.questions_created, 4);
    assert_eq!(summary.groups_created, vec!["Science", "General"]);
    let names: Vec<String> = engine
        .list_groups()
        .await
        .unwrap()
        .into_iter()
        .map(|g| g.name)
        .collect();
    assert_eq!(names, vec!["General", "Math", "Science"]);

    let questions = engine.list_questions(&test_id).await.unwrap();
    assert_eq!(questions[0].correct, OptionLabel::B);
    assert_eq!(questions[3].group, "General");
    assert_eq!(backend.questions.records().len(), 4);
}

#[tokio::test]
async fn import_with_invalid_record_writes_nothing() {
    let (engine, backend) = setup();
    let test_id = seeded_test(&engine, 0).await;
    let records = vec![ImportedQuestion {
        text: "ok?".into(),
        options: ["a".into(), String::new(), "c".into(), "d".into()],
        correct_index: 0,
        group: "G".into(),
    }];
    assert!(engine.import_questions(&test_id, &records).await.is_err());
    assert!(backend.groups.records().is_empty());
    assert!(backend.questions.records().is_empty());
}

#[tokio::test]
async fn import_with_correct_index_past_d_writes_nothing() {
    let (engine, backend) = setup();
    let test_id = seeded_test(&engine, 0).await;
    let records = vec![ImportedQuestion {
        text: "ok?".into(),
        options: ["a".into(), "b".into(), "c".into(), "d".into()],
        correct_index: 7,
        group: "G".into(),
    }];
    let err = engine.import_questions(&test_id, &records).await.unwrap_err();
    assert_eq!(
        err.downcast_ref::<ValidationError>(),
        Some(&ValidationError::CorrectOutOfRange(7))
    );
    assert!(backend.groups.records().is_empty());
    assert!(backend.questions.records().is_empty());
}

#[tokio::test]
async fn update_and_delete_question() {
    let (engine, _backend) = setup();
    let test_id = seeded_test(&engine, 2).await;
    let questions = engine.list_questions(&test_id).await.unwrap();

    let mut edit = draft("Edited", OptionLabel::C);
    edit.group = "Trivia".into();
    let updated = engine.update_question(&questions[0].id, edit).await.unwrap();
    assert_eq!(updated.text, "Edited");
    assert_eq!(updated.group, "Trivia");
    assert_eq!(updated.test_id, test_id);

    engine.delete_question(&questions[1].id).await.unwrap();
    assert_eq!(engine.list_questions(&test_id).await.unwrap().len(), 1);

    let err = engine
        .update_question("missing", draft("x", OptionLabel::A))
        .await
        .unwrap_err();
    assert!(err.to_string().contains("question not found"));
}

#[tokio::test]
async fn delete_test_removes_its_questions() {
    let (engine, backend) = setup();
    let keep = seeded_test(&engine, 1).await;
    let doomed = seeded_test(&engine, 3).await;

    assert_eq!(engine.delete_test(&doomed).await.unwrap(), 3);
    assert_eq!(backend.tests.records().len(), 1);
    assert!(backend
        .questions
        .records()
        .iter()
        .all(|q| q.test_id == keep));
}

#[tokio::test]
async fn delete_attempt_removes_its_answers() {
    let (engine, backend) = setup();
    let test_id = seeded_test(&engine, 2).await;

    let mut session = engine.start_session(&test_id).await.unwrap();
    session.select_answer(OptionLabel::A, session.started_at());
    let first = engine.submit(&session).await.unwrap();
    let second = engine.submit(&session).await.unwrap();

    assert_eq!(engine.delete_attempt(&first.attempt.id).await.unwrap(), 1);
    let attempts = backend.attempts.records();
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].id, second.attempt.id);
    assert!(backend
        .answers
        .records()
        .iter()
        .all(|a| a.attempt_id == second.attempt.id));
}

#[tokio::test]
async fn views_fetch_each_collection_once() {
    let (engine, backend) = setup();
    let test_id = seeded_test(&engine, 4).await;
    let mut session = engine.start_session(&test_id).await.unwrap();
    for _ in 0..4 {
        session.select_answer(session.current_question().correct, session.started_at());
        session.next(session.started_at());
    }
    engine.submit(&session).await.unwrap();

    let tests_before = backend.tests.list_calls();
    let attempts_before = backend.attempts.list_calls();
    let dashboard = engine.dashboard().await.unwrap();
    assert_eq!(backend.tests.list_calls(), tests_before + 1);
    assert_eq!(backend.attempts.list_calls(), attempts_before + 1);

    assert_eq!(dashboard.tests, 1);
    assert_eq!(dashboard.questions, 4);
    assert_eq!(dashboard.attempts, 1);
    assert!((dashboard.average_score - 100.0).abs() < f64::EPSILON);
    assert_eq!(dashboard.recent_attempts[0].score, 100);

    let stats = engine.statistics().await.unwrap();
    assert_eq!(stats.overview.total_attempts, 1);
    assert_eq!(stats.distribution[4].count, 1);
    assert_eq!(stats.difficulty.len(), 4);
    assert_eq!(stats.daily_activity.last().unwrap().count, 1);

    let admin = engine.admin_overview().await.unwrap();
    assert_eq!(admin.total_tests, 1);
    assert_eq!(admin.total_answers, 4);
    assert_eq!(admin.per_user[0].user_id, "alice");
}

#[tokio::test]
async fn backend_failure_surfaces_without_partial_state() {
    let (engine, backend) = setup();
    let test_id = seeded_test(&engine, 1).await;
    let session = engine.start_session(&test_id).await.unwrap();

    backend.set_offline(true);
    let err = engine.submit(&session).await.unwrap_err();
    assert!(err
        .chain()
        .any(|cause| matches!(cause.downcast_ref::<StoreError>(), Some(StoreError::Offline))));
    assert!(engine.dashboard().await.is_err());

    backend.set_offline(false);
    assert!(backend.attempts.records().is_empty());
}

#[tokio::test]
async fn export_is_anonymized() {
    let (engine, _backend) = setup();
    let test_id = seeded_test(&engine, 2).await;
    engine.create_group("Math", "").await.unwrap();
    let mut session = engine.start_session(&test_id).await.unwrap();
    session.select_answer(OptionLabel::A, session.started_at());
    engine.submit(&session).await.unwrap();

    let doc = engine.export().await.unwrap();
    assert_eq!(doc.summary.unique_users, 1);
    assert_eq!(doc.tests.len(), 1);
    assert_eq!(doc.questions.len(), 2);
    assert!(doc.attempts.iter().all(|a| a.user_id == ANONYMOUS_USER));
    assert!(doc.groups.iter().all(|g| g.owner_id == ANONYMOUS_USER));
    let json = serde_json::to_string(&doc).unwrap();
    assert!(!json.contains("alice"));
}

#[tokio::test]
async fn refresh_discards_superseded_load() {
    let (engine, _backend) = setup();
    seeded_test(&engine, 1).await;
    let slot = ViewSlot::new();

    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let slow = engine.refresh(&slot, async {
        let tests = engine.list_tests().await?;
        rx.await?;
        Ok::<_, anyhow::Error>(tests.len())
    });
    let fast = async {
        tokio::task::yield_now().await;
        engine.create_test("Second", "").await.unwrap();
        let applied = engine
            .refresh(&slot, async {
                Ok::<_, anyhow::Error>(engine.list_tests().await?.len())
            }).await;
        let _ = tx.send(());
        applied
    };

    let (slow_applied, fast_applied) = tokio::join!(slow, fast);
    assert!(!slow_applied.unwrap());
    assert!(fast_applied.unwrap());
    assert_eq!(slot.get(), Some(2));
}

#[tokio::test]
async fn failed_answer_write_leaves_partial_attempt() {
    let (engine, backend) = setup();
    let test_id = seeded_test(&engine, 2).await;
    let mut session = engine.start_session(&test_id).await.unwrap();
    session.select_answer(OptionLabel::A, chrono::Utc::now());

    backend.answers.set_read_only(true);
    let err = engine.submit(&session).await.unwrap_err();
    assert!(format!("{err:#}").contains("failed to save answer"));

    // The attempt row is already written; its answers are not
    let attempts = backend.attempts.records();
    assert_eq!(attempts.len(), 1);
    assert!(backend.answers.records().is_empty());

    backend.answers.set_read_only(false);
    assert_eq!(engine.delete_attempt(&attempts[0].id).await.unwrap(), 0);
    assert!(backend.attempts.records().is_empty());
}
