//! Answer grading. Objective questions are graded locally; open answers go to the model
//! with a rubric prompt. Every path produces feedback, never an error.

use serde::Deserialize;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::core::{LowLevelClient, ModelClient};
use crate::domain::{
    normalize_text, AiFeedback, Answer, AnswerValue, LessonContent, LessonData, Question,
    QuestionType,
};
use crate::json_utils::parse_as;
use crate::prompts;

pub const EMPTY_ANSWER_FEEDBACK: &str = "Please provide an answer so it can be evaluated.";
pub const HEURISTIC_FEEDBACK: &str = "Good effort! Keep practicing to improve your English skills.";
pub const UNAVAILABLE_FEEDBACK: &str =
    "Unable to evaluate your answer at the moment. Please try again later.";
pub const MISSING_KEY_FEEDBACK: &str =
    "API key missing. Add your Gemini API key (set GEMINI_API_KEY or run `tutor set-key`) to get AI feedback.";

/// Score at or above which a model reply that omits `correct` counts as correct.
pub const PASS_SCORE: u32 = 60;
/// Points an open question is worth when it does not say.
pub const DEFAULT_OPEN_POINTS: u32 = 20;

#[derive(Deserialize)]
struct RawFeedback {
    #[serde(default)]
    correct: Option<Value>,
    score: f64,
    #[serde(default)]
    feedback: Option<String>,
}

fn lenient_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => AnswerValue::Text(s.clone()).as_bool(),
        Value::Number(n) => match n.as_u64() {
            Some(i) => AnswerValue::Index(i).as_bool(),
            None => n.as_f64().and_then(|n| AnswerValue::Number(n).as_bool()),
        },
        _ => None,
    }
}

impl RawFeedback {
    fn into_feedback(self) -> AiFeedback {
        let score = if self.score.is_finite() {
            self.score.round().clamp(0.0, 100.0) as u32
        } else {
            0
        };
        let correct = self
            .correct
            .as_ref()
            .and_then(lenient_bool)
            .unwrap_or(score >= PASS_SCORE);
        let feedback = self
            .feedback
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .unwrap_or_else(|| HEURISTIC_FEEDBACK.to_string());
        AiFeedback {
            correct,
            score,
            feedback,
        }
    }
}

fn empty_answer() -> AiFeedback {
    AiFeedback {
        correct: false,
        score: 20,
        feedback: EMPTY_ANSWER_FEEDBACK.to_string(),
    }
}

fn heuristic() -> AiFeedback {
    AiFeedback {
        correct: true,
        score: 60,
        feedback: HEURISTIC_FEEDBACK.to_string(),
    }
}

fn unavailable(message: &str) -> AiFeedback {
    AiFeedback {
        correct: false,
        score: 0,
        feedback: message.to_string(),
    }
}

/// `round(score / 100 * points)`, with `points` defaulting for open questions.
#[must_use]
pub fn points_for(feedback: &AiFeedback, question: &Question) -> u32 {
    let points = if question.points == 0 {
        DEFAULT_OPEN_POINTS
    } else {
        question.points
    };
    (f64::from(feedback.score.min(100)) / 100.0 * f64::from(points)).round() as u32
}

/// Grade an MCQ, true-false or fill-blank answer without the model.
///
/// Returns `None` for open questions.
#[must_use]
pub fn grade_objective(question: &Question, answer: &AnswerValue) -> Option<Answer> {
    let correct = match question.kind {
        QuestionType::Mcq => {
            let expected = question.mcq_index();
            let given = answer.as_index().or_else(|| match answer {
                AnswerValue::Text(text) => {
                    let wanted = normalize_text(text);
                    question
                        .options
                        .as_ref()
                        .and_then(|opts| opts.iter().position(|o| normalize_text(o) == wanted))
                }
                _ => None,
            });
            expected.is_some() && expected == given
        }
        QuestionType::TrueFalse => {
            let expected = question.true_false_answer();
            expected.is_some() && expected == answer.as_bool()
        }
        QuestionType::FillBlank => {
            let expected = question
                .correct_answer
                .as_ref()
                .map(|a| normalize_text(&a.to_string()));
            expected.is_some_and(|e| !e.is_empty() && e == normalize_text(&answer.to_string()))
        }
        QuestionType::Open => return None,
    };

    let points = if correct { question.points_or_default() } else { 0 };
    let feedback = if correct {
        "Correct!".to_string()
    } else {
        format!(
            "Incorrect. The correct answer is: {}",
            question.correct_answer_display()
        )
    };

    Some(Answer {
        question_id: question.id.clone(),
        answer: answer.clone(),
        is_correct: Some(correct),
        points: Some(points),
        feedback: Some(feedback),
    })
}

#[derive(Debug, Clone)]
pub struct AnswerEvaluator<C: LowLevelClient> {
    model: ModelClient<C>,
}

impl<C: LowLevelClient> AnswerEvaluator<C> {
    pub fn new(model: ModelClient<C>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ModelClient<C> {
        &self.model
    }

    /// Grade an open answer. Blank answers are scored without calling the model.
    #[instrument(target = "lesson_forge::evaluator", skip_all, fields(answer_len = answer.len(), has_context = context.is_some()))]
    pub async fn evaluate(&self, question: &str, answer: &str, context: Option<&str>) -> AiFeedback {
        if answer.trim().is_empty() {
            info!("blank answer; skipping model call");
            return empty_answer();
        }

        let prompt = prompts::grading_prompt(question, answer, context);
        let raw = match self.model.send(&prompt).await {
            Ok(raw) => raw,
            Err(e) if e.is_missing_key() => {
                warn!("cannot grade without a Gemini API key");
                return unavailable(MISSING_KEY_FEEDBACK);
            }
            Err(e) => {
                warn!(error = %e, "grading call failed");
                return unavailable(UNAVAILABLE_FEEDBACK);
            }
        };

        match parse_as::<RawFeedback>(&raw) {
            Ok(raw) => raw.into_feedback(),
            Err(e) => {
                warn!(error = %e, "grading reply was not usable feedback; using heuristic score");
                heuristic()
            }
        }
    }

    /// Grade a speech transcript against a speaking prompt.
    pub async fn evaluate_speaking(&self, prompt: &str, transcript: &str) -> AiFeedback {
        self.evaluate(
            &prompts::speaking_question(prompt),
            transcript,
            Some(prompts::SPEAKING_CONTEXT),
        )
        .await
    }

    pub async fn evaluate_writing(&self, prompt: &str, essay: &str, min_words: Option<u32>) -> AiFeedback {
        let context = prompts::writing_context(prompts::word_count(essay), min_words);
        self.evaluate(prompt, essay, Some(&context)).await
    }

    /// Grade an answer grounded in the reading passage or listening script.
    pub async fn evaluate_comprehension(&self, question: &str, answer: &str, passage: &str) -> AiFeedback {
        self.evaluate(question, answer, Some(passage)).await
    }

    /// Pick the specialization that matches the lesson's skill.
    pub async fn evaluate_for_lesson(&self, lesson: &LessonData, question: &Question, answer: &str) -> AiFeedback {
        match &lesson.content {
            LessonContent::Speaking { .. } => self.evaluate_speaking(&question.question, answer).await,
            LessonContent::Writing { prompt, min_words, .. } => {
                let full = format!("{}\n{}", prompt, question.question);
                self.evaluate_writing(&full, answer, Some(*min_words)).await
            }
            LessonContent::Reading { text } => {
                self.evaluate_comprehension(&question.question, answer, text).await
            }
            LessonContent::Listening { audio_text } => {
                self.evaluate_comprehension(&question.question, answer, audio_text).await
            }
            _ => self.evaluate(&question.question, answer, None).await,
        }
    }

    /// Grade any question of `lesson`: objective types locally, open answers via the model.
    pub async fn grade(&self, lesson: &LessonData, question: &Question, answer: &AnswerValue) -> Answer {
        if let Some(graded) = grade_objective(question, answer) {
            return graded;
        }
        let feedback = self
            .evaluate_for_lesson(lesson, question, &answer.to_string())
            .await;
        Answer {
            question_id: question.id.clone(),
            answer: answer.clone(),
            is_correct: Some(feedback.correct),
            points: Some(points_for(&feedback, question)),
            feedback: Some(feedback.feedback),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(value: Value) -> AiFeedback {
        serde_json::from_value::<RawFeedback>(value).unwrap().into_feedback()
    }

    #[test]
    fn scores_are_clamped_and_correct_inferred() {
        let fb = raw(json!({"score": 140, "feedback": "  Great.  "}));
        assert_eq!(fb.score, 100);
        assert!(fb.correct);
        assert_eq!(fb.feedback, "Great.");

        let fb = raw(json!({"score": -5, "correct": "false"}));
        assert_eq!(fb.score, 0);
        assert!(!fb.correct);
        assert_eq!(fb.feedback, HEURISTIC_FEEDBACK);
    }

    #[test]
    fn points_scale_with_score() {
        let q = Question {
            id: "q".into(),
            question: "Why?".into(),
            kind: QuestionType::Open,
            options: None,
            correct_answer: None,
            points: 0,
        };
        let fb = AiFeedback {
            correct: true,
            score: 75,
            feedback: String::new(),
        };
        assert_eq!(points_for(&fb, &q), 15);
    }
}
