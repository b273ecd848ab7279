
use std::sync::Arc;

use async_trait::async_trait;
use lesson_forge::core::{LowLevelClient, ModelClient, RetryPolicy};
use lesson_forge::domain::{AnswerValue, LessonContent, QuestionType, RecentResult};
use lesson_forge::error::{AIError, GenerationError};
use lesson_forge::generator::{assemble_section, RequestTokens, SectionGenerator};
use lesson_forge::progress::User;
use lesson_forge::{Level, Skill};
use serde_json::json;

use crate::test_utils::*;

#[tokio::test]
async fn well_formed_section_is_assembled() {
    let response = grammar_section_text();
    let (generator, handle) = scripted_generator(&[&response]);

    let section = generator
        .generate(Skill::Grammar, Level::Intermediate, &User::default())
        .await;

    assert_eq!(handle.call_count(), 1);
    assert_eq!(section.title, "Grammar • Intermediate");
    assert_eq!(
        section.description,
        "AI-generated grammar lessons for intermediate level with adaptive difficulty"
    );
    assert_eq!(section.xp_required, 100);
    assert_eq!(section.lessons.len(), 3);
    assert_eq!(section.lessons[0].id, "g1");
    assert_eq!(section.lessons[0].questions.len(), 4);
    assert!(handle.prompts()[0].contains("Create dynamic grammar lessons for level intermediate"));
}

#[tokio::test]
async fn missing_ids_and_titles_are_synthesized() {
    let response = json!({
        "lessons": [
            {"text": "A passage.", "questions": [
                {"question": "True?", "type": "true-false", "correctAnswer": "true"},
                {"question": "Why?", "type": "open", "correctAnswer": "Because."}
            ]},
            {"id": "", "title": "", "text": "Another passage.", "questions": [
                {"id": "x", "question": "Pick", "type": "mcq", "options": ["a", "b", "c", "d"], "correctAnswer": 2, "points": 15}
            ]}
        ]
    })
    .to_string();
    let (generator, _) = scripted_generator(&[&response]);

    let section = generator.generate(Skill::Reading, Level::Beginner, &User::default()).await;

    assert_eq!(section.xp_required, 0);
    let first = &section.lessons[0];
    assert_eq!(first.id, "reading-beginner-lesson-1");
    assert_eq!(first.title, "Reading • Beginner: Lesson 1");
    assert_eq!(first.questions[0].id, "reading-beginner-lesson-1-q1");
    assert_eq!(first.questions[0].points, 10);
    assert_eq!(first.questions[1].points, 20);
    let second = &section.lessons[1];
    assert_eq!(second.id, "reading-beginner-lesson-2");
    assert_eq!(second.questions[0].id, "x");
    assert_eq!(second.questions[0].points, 15);
}

#[tokio::test]
async fn repair_round_trip_recovers_bad_output() {
    let repaired = grammar_section_text();
    let (generator, handle) = scripted_generator(&["Sorry, here it is: {lessons: oops", &repaired]);

    let section = generator.generate(Skill::Grammar, Level::Beginner, &User::default()).await;

    assert_eq!(handle.call_count(), 2);
    assert!(handle.prompts()[1].contains("{lessons: oops"));
    assert_eq!(section.lessons[0].id, "g1");
}

#[tokio::test]
async fn failed_repair_falls_back_to_three_lessons() {
    let (generator, handle) = scripted_generator(&["not json", "still not json"]);

    let section = generator.generate(Skill::Listening, Level::Advanced, &User::default()).await;

    assert_eq!(handle.call_count(), 2);
    assert_eq!(section.lessons.len(), 3);
    assert_eq!(section.xp_required, 300);
    for (i, lesson) in section.lessons.iter().enumerate() {
        assert_eq!(lesson.id, format!("listening-advanced-lesson-{}", i + 1));
        assert!(matches!(&lesson.content, LessonContent::Listening { audio_text } if !audio_text.is_empty()));
    }
}

#[tokio::test]
async fn zero_lessons_fall_back() {
    let (generator, handle) = scripted_generator(&[r#"{"title": "x", "lessons": []}"#]);

    let err = generator
        .try_generate(Skill::Vocabulary, Level::Beginner, &User::default())
        .await
        .unwrap_err();
    assert!(matches!(err, GenerationError::EmptySection));

    handle.push_text(r#"{"title": "x", "lessons": []}"#);
    let section = generator.generate(Skill::Vocabulary, Level::Beginner, &User::default()).await;
    assert_eq!(section.lessons.len(), 3);
    assert!(matches!(&section.lessons[0].content, LessonContent::Vocabulary { words } if !words.is_empty()));
}

#[tokio::test]
async fn model_error_falls_back_without_repair() {
    let (client, handle) = lesson_forge::clients::MockClient::new();
    handle.push_error(missing_key());
    let generator = SectionGenerator::new(ModelClient::new(client, RetryPolicy::default()));

    let section = generator.generate(Skill::Writing, Level::Intermediate, &User::default()).await;

    assert_eq!(handle.call_count(), 1);
    assert_eq!(section.lessons.len(), 3);
    assert!(matches!(
        section.lessons[0].content,
        LessonContent::Writing { min_words: 120, .. }
    ));
}

#[tokio::test]
async fn lessons_with_the_wrong_shape_are_dropped() {
    let response = json!({"lessons": [
        {"title": "no audio", "questions": [{"question": "Q", "type": "open"}]},
        {"audioText": "Welcome aboard.", "questions": [{"question": "Where?", "type": "fill-blank", "correctAnswer": "plane"}]}
    ]})
    .to_string();
    let (generator, _) = scripted_generator(&[&response]);

    let section = generator.generate(Skill::Listening, Level::Beginner, &User::default()).await;
    assert_eq!(section.lessons.len(), 1);
    assert_eq!(section.lessons[0].id, "listening-beginner-lesson-1");
}

#[tokio::test]
async fn prompt_reflects_learner_progress() {
    let response = grammar_section_text();
    let (generator, handle) = scripted_generator(&[&response]);
    let mut user = User::default();
    user.grammar.xp = 250;
    user.grammar.completed.insert("one".into());

    generator.generate(Skill::Grammar, Level::Beginner, &user).await;

    let prompt = &handle.prompts()[0];
    assert!(prompt.contains("Overall difficulty target: 3 out of 5"));
    assert!(prompt.contains("completedActivities=1, xp=250"));
}

#[test]
fn assemble_keeps_existing_ids() {
    let mut lessons = lesson_forge::fallback::fallback_lessons(Skill::Grammar, Level::Beginner);
    lessons[1].id = "custom".into();
    let section = assemble_section(Skill::Grammar, Level::Beginner, lessons);
    assert_eq!(section.lessons[0].id, "grammar-beginner-lesson-1");
    assert_eq!(section.lessons[1].id, "custom");
    assert_eq!(section.lessons[1].questions[0].id, "custom-q1");
}

/// Starts a newer navigation while its own request is in flight.
#[derive(Debug, Clone)]
struct NavigatingClient {
    tokens: Arc<RequestTokens>,
    response: String,
}

#[async_trait]
impl LowLevelClient for NavigatingClient {
    async fn ask_raw(&self, _prompt: String) -> Result<String, AIError> {
        self.tokens.begin();
        Ok(self.response.clone())
    }

    fn clone_box(&self) -> Box<dyn LowLevelClient> {
        Box::new(self.clone())
    }
}

#[tokio::test]
async fn superseded_request_is_discarded() {
    let tokens = Arc::new(RequestTokens::new());
    let client = NavigatingClient {
        tokens: tokens.clone(),
        response: grammar_section_text(),
    };
    let generator = SectionGenerator::new(ModelClient::new(client, RetryPolicy::default()));

    let result = generator
        .generate_current(&tokens, Skill::Grammar, Level::Beginner, &User::default())
        .await;
    assert!(result.is_none());
}

#[tokio::test]
async fn current_request_is_applied() {
    let tokens = RequestTokens::new();
    let response = grammar_section_text();
    let (generator, _) = scripted_generator(&[&response]);

    let stale = tokens.begin();
    let result = generator
        .generate_current(&tokens, Skill::Grammar, Level::Beginner, &User::default())
        .await;
    assert!(result.is_some());
    assert!(!tokens.is_current(stale));
}

#[tokio::test]
async fn next_task_decodes_question_and_lesson_patch() {
    let response = json!({
        "lesson": {"explanation": "Use 'since' with a point in time.", "examples": ["since 2010"]},
        "question": {"question": "I have lived here ____ 2010.", "type": "fill-blank", "correctAnswer": "since"}
    })
    .to_string();
    let (generator, handle) = scripted_generator(&[&response]);
    let recent: Vec<RecentResult> = (0..8)
        .map(|i| RecentResult { correct: i % 2 == 0, points: Some(10) })
        .collect();

    let task = generator.next_task(Skill::Grammar, Level::Intermediate, &recent).await;

    assert_eq!(task.question.kind, QuestionType::FillBlank);
    assert!(task.question.id.starts_with("q-"));
    assert_eq!(task.question.points, 10);
    assert!(matches!(task.lesson, Some(LessonContent::Grammar { .. })));
    assert!(handle.prompts()[0].contains("(2 of 5 correct)"));
}

#[tokio::test]
async fn next_task_falls_back_to_fixed_question() {
    let (generator, _) = scripted_generator(&["nothing useful", "still nothing"]);

    let task = generator.next_task(Skill::Reading, Level::Beginner, &[]).await;

    assert_eq!(task.question.question, "Choose the correct option");
    assert_eq!(task.question.options.as_ref().map(Vec::len), Some(4));
    assert_eq!(task.question.correct_answer, Some(AnswerValue::from(0usize)));
    assert_eq!(task.question.points, 10);
    assert!(task.lesson.is_none());
}
