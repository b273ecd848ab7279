
use std::io;
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use lesson_forge::clients::gemini::models::GeminiModel;
use lesson_forge::clients::{FlexibleClient, GeminiClient, GeminiConfig, MockClient, MockResponse};
use lesson_forge::domain::{AnswerValue, QuestionType};
use lesson_forge::error::StoreError;
use lesson_forge::evaluator::MISSING_KEY_FEEDBACK;
use lesson_forge::progress::{ActivityOutcome, User};
use lesson_forge::store::{KeyValueStore, MemoryStore, LESSON_PROGRESS_KEY, USER_PROGRESS_KEY};
use lesson_forge::{Level, Skill, Tutor};

use crate::test_utils::*;

static INIT: Once = Once::new();

fn init_test_logging() {
    INIT.call_once(|| {
        print_test_client_info();
    });
}

#[tokio::test]
async fn practice_session_end_to_end() {
    let (client, handle) = MockClient::with_responses(vec![
        MockResponse::text(grammar_section_text()),
        MockResponse::text(feedback_json(true, 80, "Good sentence.")),
    ]);
    let mut tutor = Tutor::load(client, MemoryStore::new()).await.unwrap();

    let section = tutor.open_section(Skill::Grammar, Level::Beginner).await.unwrap();
    let lesson = &section.lessons[0];
    let at = Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap();

    let mut answers = Vec::new();
    for question in &lesson.questions {
        let answer = match question.kind {
            QuestionType::FillBlank => AnswerValue::from("Walked"),
            QuestionType::Mcq => AnswerValue::from(1usize),
            QuestionType::TrueFalse => AnswerValue::from(true),
            QuestionType::Open => AnswerValue::from("I played tennis yesterday."),
        };
        let submission = tutor
            .submit_at(Skill::Grammar, lesson, question, answer, at)
            .await
            .unwrap();
        answers.push(submission.answer);
    }

    // fill-blank 10 + mcq 10 + wrong true-false 0 + open 80% of 20
    assert_eq!(tutor.user().grammar.xp, 36);
    assert_eq!(tutor.user().total_xp, 36);
    assert_eq!(tutor.user().grammar.completed.len(), 4);
    assert_eq!(tutor.user().streak, 1);
    assert!(tutor.user().has_badge("first-steps"));
    assert_eq!(handle.call_count(), 2, "only the section and the open answer hit the model");

    let record = tutor.finish_lesson(lesson, &answers).await.unwrap();
    assert_eq!(record.score, 72);

    let store = tutor.store().inner();
    assert!(store.get(USER_PROGRESS_KEY).await.unwrap().is_some());
    assert!(store.get(LESSON_PROGRESS_KEY).await.unwrap().is_some());
}

#[tokio::test]
async fn progress_survives_reload() {
    let (client, _) = MockClient::with_responses(vec![MockResponse::text(grammar_section_text())]);
    let store = MemoryStore::new();
    let mut tutor = Tutor::load(client.clone(), store).await.unwrap();
    let section = tutor.open_section(Skill::Grammar, Level::Beginner).await.unwrap();
    let lesson = &section.lessons[0];
    let mcq = lesson
        .questions
        .iter()
        .find(|q| q.kind == QuestionType::Mcq)
        .unwrap();
    tutor
        .submit(Skill::Grammar, lesson, mcq, AnswerValue::from(1usize))
        .await
        .unwrap();

    let saved = tutor.store().inner().get(USER_PROGRESS_KEY).await.unwrap().unwrap();
    let memory = MemoryStore::new();
    memory.set(USER_PROGRESS_KEY, &saved).await.unwrap();
    let reloaded = Tutor::load(client, memory).await.unwrap();
    assert_eq!(reloaded.user(), tutor.user());
    assert_eq!(reloaded.user().grammar.xp, 10);
}

#[tokio::test]
async fn offline_session_still_serves_lessons() {
    let (client, _) = FlexibleClient::mock();
    let tutor = Tutor::load(client, MemoryStore::new()).await.unwrap();

    let section = tutor.open_section(Skill::Speaking, Level::Beginner).await.unwrap();
    assert_eq!(section.lessons.len(), 3);

    let feedback = tutor.evaluator().evaluate("Say hello", "Hello!", None).await;
    assert_eq!(feedback.score, 0);
}

#[tokio::test]
async fn blank_answer_earns_nothing() {
    let (client, handle) = MockClient::with_responses(vec![MockResponse::text(grammar_section_text())]);
    let mut tutor = Tutor::load(client, MemoryStore::new()).await.unwrap();
    let section = tutor.open_section(Skill::Grammar, Level::Beginner).await.unwrap();
    let lesson = &section.lessons[0];

    for kind in [QuestionType::Open, QuestionType::FillBlank] {
        let question = lesson.questions.iter().find(|q| q.kind == kind).unwrap();
        let submission = tutor
            .submit(Skill::Grammar, lesson, question, AnswerValue::from("   "))
            .await
            .unwrap();

        assert_eq!(submission.answer.points, Some(0));
        assert_eq!(submission.answer.is_correct, Some(false));
        assert_eq!(submission.outcome, ActivityOutcome::default());
    }

    assert_eq!(tutor.user(), &User::default());
    assert!(tutor.store().inner().get(USER_PROGRESS_KEY).await.unwrap().is_none());
    assert_eq!(handle.call_count(), 1, "blank answers are never sent for grading");
}

#[tokio::test]
async fn missing_key_reaches_the_learner() {
    let client = FlexibleClient::gemini(GeminiConfig {
        api_key: None,
        model: GeminiModel::Flash15,
        base_url: "http://127.0.0.1:9".into(),
        timeout: Duration::from_secs(1),
    });
    let tutor = Tutor::load(client, MemoryStore::new()).await.unwrap();

    let section = tutor.open_section(Skill::Writing, Level::Beginner).await.unwrap();
    assert_eq!(section.lessons.len(), 3);

    let feedback = tutor.evaluator().evaluate("Why?", "Because it rains.", None).await;
    assert_eq!(feedback.score, 0);
    assert!(!feedback.correct);
    assert_eq!(feedback.feedback, MISSING_KEY_FEEDBACK);
}

/// Reads nothing back and refuses every write.
#[derive(Debug)]
struct ReadOnlyStore;

#[async_trait]
impl KeyValueStore for ReadOnlyStore {
    async fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "read-only").into())
    }

    async fn remove(&self, _key: &str) -> Result<(), StoreError> {
        Ok(())
    }
}

#[tokio::test]
async fn failed_save_keeps_previous_progress() {
    let (client, _) = MockClient::with_responses(vec![MockResponse::text(grammar_section_text())]);
    let mut tutor = Tutor::load(client, ReadOnlyStore).await.unwrap();
    let section = tutor.open_section(Skill::Grammar, Level::Beginner).await.unwrap();
    let lesson = &section.lessons[0];
    let mcq = lesson.questions.iter().find(|q| q.kind == QuestionType::Mcq).unwrap();

    let result = tutor
        .submit(Skill::Grammar, lesson, mcq, AnswerValue::from(1usize))
        .await;

    assert!(matches!(result, Err(StoreError::Io(_))));
    assert_eq!(tutor.user(), &User::default());
}

#[tokio::test]
async fn level_gating() {
    let (client, _) = MockClient::new();
    let tutor = Tutor::load(client, MemoryStore::new()).await.unwrap();
    assert_eq!(
        tutor.levels(Skill::Reading),
        vec![
            (Level::Beginner, true),
            (Level::Intermediate, false),
            (Level::Advanced, false)
        ]
    );
}

#[tokio::test]
async fn live_gemini_section() {
    init_test_logging();

    if should_skip_live_tests() {
        println!("Skipping live test - no GEMINI_API_KEY");
        return;
    }

    let client = GeminiClient::new(GeminiConfig::default());
    let tutor = Tutor::load(client, MemoryStore::new()).await.unwrap();
    let section = tutor.open_section(Skill::Vocabulary, Level::Beginner).await.unwrap();

    println!("✅ {} ({} lessons)", section.title, section.lessons.len());
    assert!(!section.lessons.is_empty());
    for lesson in &section.lessons {
        assert!(!lesson.questions.is_empty());
    }
}

#[tokio::test]
async fn live_gemini_grading() {
    init_test_logging();

    if should_skip_live_tests() {
        println!("Skipping live test - no GEMINI_API_KEY");
        return;
    }

    let client = GeminiClient::new(GeminiConfig::default());
    let tutor = Tutor::load(client, MemoryStore::new()).await.unwrap();
    let feedback = tutor
        .evaluator()
        .evaluate_writing(
            "Describe your favourite place.",
            "My favourite place is the beach near my home. I walk there every morning and listen to the waves.",
            Some(20),
        )
        .await;

    println!("✅ score {}: {}", feedback.score, feedback.feedback);
    assert!(feedback.score <= 100);
}
