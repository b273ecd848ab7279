
use lesson_forge::domain::{AnswerValue, LessonContent, LessonData, Question, QuestionType};
use lesson_forge::evaluator::*;

use crate::test_utils::*;

fn question(kind: QuestionType, options: Option<Vec<&str>>, answer: Option<AnswerValue>, points: u32) -> Question {
    Question {
        id: "q1".into(),
        question: "Question?".into(),
        kind,
        options: options.map(|o| o.into_iter().map(String::from).collect()),
        correct_answer: answer,
        points,
    }
}

#[tokio::test]
async fn blank_answer_scores_20_without_a_call() {
    let (evaluator, handle) = scripted_evaluator(&[]);

    let feedback = evaluator.evaluate("Describe your day.", "   \n", None).await;

    assert_eq!(feedback.score, 20);
    assert!(!feedback.correct);
    assert_eq!(handle.call_count(), 0);
}

#[tokio::test]
async fn model_feedback_is_returned() {
    let reply = format!("Here is my evaluation:\n{}", feedback_json(true, 85, "Clear and accurate."));
    let (evaluator, handle) = scripted_evaluator(&[&reply]);

    let feedback = evaluator
        .evaluate("What did Tom buy?", "Fish and bread.", Some("Tom buys fish, bread and fruit."))
        .await;

    assert!(feedback.correct);
    assert_eq!(feedback.score, 85);
    assert_eq!(feedback.feedback, "Clear and accurate.");
    let prompt = &handle.prompts()[0];
    assert!(prompt.contains("Question: What did Tom buy?"));
    assert!(prompt.contains("Context: Tom buys fish, bread and fruit."));
    assert!(prompt.contains("Student's Answer: Fish and bread."));
}

#[tokio::test]
async fn unparseable_reply_uses_heuristic() {
    let (evaluator, handle) = scripted_evaluator(&["Great answer, well done!"]);

    let feedback = evaluator.evaluate("Why?", "Because it rains.", None).await;

    assert_eq!(feedback.score, 60);
    assert!(feedback.correct);
    assert_eq!(feedback.feedback, HEURISTIC_FEEDBACK);
    assert_eq!(handle.call_count(), 1, "grading never asks for a repair");
}

#[tokio::test]
async fn missing_key_gives_actionable_message() {
    let (evaluator, handle) = scripted_evaluator(&[]);
    handle.push_error(missing_key());

    let feedback = evaluator.evaluate("Why?", "Because.", None).await;

    assert_eq!(feedback.score, 0);
    assert!(!feedback.correct);
    assert_eq!(feedback.feedback, MISSING_KEY_FEEDBACK);
}

#[tokio::test]
async fn other_failures_give_generic_retry_message() {
    let (evaluator, _) = scripted_evaluator(&[]);

    let feedback = evaluator.evaluate("Why?", "Because.", None).await;

    assert_eq!(feedback.score, 0);
    assert!(!feedback.correct);
    assert_eq!(
        feedback.feedback,
        "Unable to evaluate your answer at the moment. Please try again later."
    );
}

#[tokio::test]
async fn body_reuse_failure_is_retried_once() {
    let (evaluator, handle) = scripted_evaluator(&[]);
    handle.push_error(body_consumed());
    handle.push_text(feedback_json(false, 40, "Add more detail."));

    let feedback = evaluator.evaluate("Why?", "Because.", None).await;

    assert_eq!(handle.call_count(), 2);
    assert_eq!(feedback.score, 40);
}

#[tokio::test]
async fn speaking_and_writing_framing() {
    let ok = feedback_json(true, 70, "Good.");
    let (evaluator, handle) = scripted_evaluator(&[&ok, &ok]);

    evaluator.evaluate_speaking("Describe your home.", "I live in a flat.").await;
    evaluator
        .evaluate_writing("Write about your town.", "My town is small and quiet.", Some(80))
        .await;

    let prompts = handle.prompts();
    assert!(prompts[0].contains("Speaking prompt: Describe your home."));
    assert!(prompts[0].contains("pronunciation, fluency, grammar, and content"));
    assert!(prompts[1].contains("Minimum words required: 80."));
    assert!(prompts[1].contains("Word count: 6."));
    assert!(prompts[1].contains("Do not penalize brevity"));
}

#[tokio::test]
async fn comprehension_grounds_on_the_passage() {
    let ok = feedback_json(true, 90, "Right.");
    let (evaluator, handle) = scripted_evaluator(&[&ok]);
    let lesson = LessonData {
        id: "l".into(),
        title: "t".into(),
        content: LessonContent::Listening {
            audio_text: "The train leaves from platform four.".into(),
        },
        questions: vec![],
    };
    let q = question(QuestionType::Open, None, None, 20);

    let answer = evaluator.grade(&lesson, &q, &AnswerValue::from("Platform four")).await;

    assert!(handle.prompts()[0].contains("Context: The train leaves from platform four."));
    assert_eq!(answer.is_correct, Some(true));
    assert_eq!(answer.points, Some(18));
}

#[tokio::test]
async fn objective_questions_never_call_the_model() {
    let (evaluator, handle) = scripted_evaluator(&[]);
    let lesson = LessonData {
        id: "l".into(),
        title: "t".into(),
        content: LessonContent::Reading { text: "x".into() },
        questions: vec![],
    };
    let q = question(QuestionType::TrueFalse, None, Some(AnswerValue::Bool(true)), 10);

    let answer = evaluator.grade(&lesson, &q, &AnswerValue::from("TRUE")).await;

    assert_eq!(answer.is_correct, Some(true));
    assert_eq!(answer.points, Some(10));
    assert_eq!(handle.call_count(), 0);
}

#[test]
fn mcq_grading_accepts_index_or_option_text() {
    let q = question(QuestionType::Mcq, Some(vec!["go", "went", "gone", "goes"]), Some(AnswerValue::from(1usize)), 10);

    let by_index = grade_objective(&q, &AnswerValue::from(1usize)).unwrap();
    assert_eq!(by_index.is_correct, Some(true));
    assert_eq!(by_index.feedback.as_deref(), Some("Correct!"));

    let by_text = grade_objective(&q, &AnswerValue::from("  WENT ")).unwrap();
    assert_eq!(by_text.is_correct, Some(true));

    let wrong = grade_objective(&q, &AnswerValue::from(0usize)).unwrap();
    assert_eq!(wrong.points, Some(0));
    assert_eq!(wrong.feedback.as_deref(), Some("Incorrect. The correct answer is: went"));
}

#[test]
fn fill_blank_is_case_and_space_insensitive() {
    let q = question(QuestionType::FillBlank, None, Some(AnswerValue::from("didn't see")), 0);
    let answer = grade_objective(&q, &AnswerValue::from("  Didn't   SEE ")).unwrap();
    assert_eq!(answer.is_correct, Some(true));
    assert_eq!(answer.points, Some(10));
}

#[test]
fn open_questions_are_not_graded_locally() {
    let q = question(QuestionType::Open, None, None, 20);
    assert!(grade_objective(&q, &AnswerValue::from("anything")).is_none());
}
