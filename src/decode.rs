//! Typed decoding of recovered JSON into lessons and questions.
//!
//! The model's output is only loosely shaped by the prompt, so decoding is lenient about
//! representation (numeric ids, string instructions where a list was asked for, float
//! points) and strict about meaning: a question whose answer cannot be resolved is
//! dropped, and a lesson without its skill's primary material is rejected.

use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::domain::{
    normalize_text, AnswerValue, Level, LessonContent, LessonData, Question, QuestionType, Skill,
    WordEntry,
};
use crate::error::DecodeError;
use crate::prompts::min_words;

/// Section-level fields plus the lessons that survived decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedSection {
    pub title: Option<String>,
    pub description: Option<String>,
    pub lessons: Vec<LessonData>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextOrList {
    Text(String),
    List(Vec<String>),
}

impl TextOrList {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) => s,
            Self::List(items) => items.join(" "),
        }
    }

    fn into_list(self) -> Vec<String> {
        match self {
            Self::Text(s) if s.trim().is_empty() => Vec::new(),
            Self::Text(s) => vec![s],
            Self::List(items) => items,
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListeningFields {
    audio_text: String,
}

#[derive(Deserialize)]
struct ReadingFields {
    text: String,
}

#[derive(Deserialize)]
struct SpeakingFields {
    #[serde(default)]
    instructions: Option<TextOrList>,
    #[serde(default)]
    prompts: Option<TextOrList>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct WritingFields {
    prompt: String,
    #[serde(default)]
    instructions: Option<TextOrList>,
    #[serde(default)]
    min_words: Option<f64>,
}

#[derive(Deserialize)]
struct GrammarFields {
    explanation: String,
    #[serde(default)]
    examples: Option<TextOrList>,
}

#[derive(Deserialize)]
struct VocabularyFields {
    words: Vec<WordEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawQuestion {
    #[serde(default)]
    id: Option<Value>,
    question: String,
    #[serde(rename = "type")]
    kind: QuestionType,
    #[serde(default)]
    options: Option<Vec<String>>,
    #[serde(default)]
    correct_answer: Option<AnswerValue>,
    #[serde(default)]
    points: Option<f64>,
}

fn mismatch(skill: Skill, reason: impl Into<String>) -> DecodeError {
    DecodeError::SchemaMismatch {
        skill,
        reason: reason.into(),
    }
}

fn fields<T: for<'de> Deserialize<'de>>(skill: Skill, value: &Value) -> Result<T, DecodeError> {
    T::deserialize(value).map_err(|e| mismatch(skill, e.to_string()))
}

fn require_text(skill: Skill, field: &str, text: String) -> Result<String, DecodeError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        Err(mismatch(skill, format!("`{}` is empty", field)))
    } else {
        Ok(trimmed.to_string())
    }
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decode the skill-specific material of one lesson object.
pub fn decode_content(skill: Skill, level: Level, value: &Value) -> Result<LessonContent, DecodeError> {
    let content = match skill {
        Skill::Listening => {
            let f: ListeningFields = fields(skill, value)?;
            LessonContent::Listening {
                audio_text: require_text(skill, "audioText", f.audio_text)?,
            }
        }
        Skill::Reading => {
            let f: ReadingFields = fields(skill, value)?;
            LessonContent::Reading {
                text: require_text(skill, "text", f.text)?,
            }
        }
        Skill::Speaking => {
            let f: SpeakingFields = fields(skill, value)?;
            let instructions = f.instructions.map(TextOrList::into_text).unwrap_or_default();
            let prompts = f.prompts.map(TextOrList::into_list).unwrap_or_default();
            if instructions.trim().is_empty() && prompts.is_empty() {
                return Err(mismatch(skill, "neither `instructions` nor `prompts` present"));
            }
            LessonContent::Speaking {
                instructions,
                prompts,
            }
        }
        Skill::Writing => {
            let f: WritingFields = fields(skill, value)?;
            let min_words = f
                .min_words
                .filter(|n| n.is_finite() && *n > 0.0)
                .map(|n| n.round() as u32)
                .unwrap_or_else(|| min_words(level));
            LessonContent::Writing {
                prompt: require_text(skill, "prompt", f.prompt)?,
                instructions: f.instructions.map(TextOrList::into_list).unwrap_or_default(),
                min_words,
            }
        }
        Skill::Grammar => {
            let f: GrammarFields = fields(skill, value)?;
            LessonContent::Grammar {
                explanation: require_text(skill, "explanation", f.explanation)?,
                examples: f.examples.map(TextOrList::into_list).unwrap_or_default(),
            }
        }
        Skill::Vocabulary => {
            let f: VocabularyFields = fields(skill, value)?;
            let words: Vec<WordEntry> = f
                .words
                .into_iter()
                .filter(|w| !w.word.trim().is_empty() && !w.definition.trim().is_empty())
                .collect();
            if words.is_empty() {
                return Err(mismatch(skill, "`words` has no usable entries"));
            }
            LessonContent::Vocabulary { words }
        }
    };
    Ok(content)
}

/// Decode one question and normalize its answer to the canonical representation
/// for its type: option index for MCQ, boolean for true-false, text otherwise.
pub fn decode_question(skill: Skill, value: &Value) -> Result<Question, DecodeError> {
    let raw: RawQuestion = fields(skill, value)?;
    let text = require_text(skill, "question", raw.question)?;
    let id = match raw.id {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    };
    let points = raw
        .points
        .filter(|p| p.is_finite() && *p > 0.0)
        .map(|p| p.round() as u32)
        .unwrap_or(0);

    let mut question = Question {
        id,
        question: text,
        kind: raw.kind,
        options: raw.options,
        correct_answer: raw.correct_answer,
        points,
    };

    match question.kind {
        QuestionType::Mcq => {
            let option_count = question.options.as_ref().map_or(0, Vec::len);
            if option_count < 2 {
                return Err(mismatch(skill, "multiple-choice question needs at least two options"));
            }
            let index = question
                .mcq_index()
                .ok_or_else(|| mismatch(skill, "multiple-choice answer does not match any option"))?;
            question.correct_answer = Some(AnswerValue::from(index));
        }
        QuestionType::TrueFalse => {
            let answer = question
                .true_false_answer()
                .ok_or_else(|| mismatch(skill, "true-false answer is not a boolean"))?;
            question.correct_answer = Some(AnswerValue::Bool(answer));
            question.options = None;
        }
        QuestionType::FillBlank => {
            let answer = question
                .correct_answer
                .as_ref()
                .map(ToString::to_string)
                .filter(|a| !normalize_text(a).is_empty())
                .ok_or_else(|| mismatch(skill, "fill-blank question has no expected answer"))?;
            question.correct_answer = Some(AnswerValue::Text(answer));
            question.options = None;
        }
        QuestionType::Open => {
            question.correct_answer = question
                .correct_answer
                .take()
                .map(|a| AnswerValue::Text(a.to_string()))
                .filter(|a| !a.is_blank());
            question.options = None;
        }
    }

    Ok(question)
}

/// Decode one lesson; questions that fail to decode are dropped.
pub fn decode_lesson(skill: Skill, level: Level, value: &Value) -> Result<LessonData, DecodeError> {
    let obj = value
        .as_object()
        .ok_or_else(|| mismatch(skill, "lesson is not an object"))?;
    let content = decode_content(skill, level, value)?;

    let questions: Vec<Question> = obj
        .get("questions")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|q| match decode_question(skill, q) {
                    Ok(q) => Some(q),
                    Err(e) => {
                        debug!(error = %e, "dropping question");
                        None
                    }
                })
                .collect()
        })
        .unwrap_or_default();

    if questions.is_empty() {
        return Err(mismatch(skill, "lesson has no valid questions"));
    }

    Ok(LessonData {
        id: string_field(obj, "id").unwrap_or_default(),
        title: string_field(obj, "title").unwrap_or_default(),
        content,
        questions,
    })
}

/// Decode a section: an object with a `lessons` array, or a bare array of lessons.
///
/// Lessons that fail individually are dropped and logged; the result may be empty.
pub fn decode_section(skill: Skill, level: Level, value: &Value) -> Result<DecodedSection, DecodeError> {
    let (obj, lessons) = match value {
        Value::Object(obj) => {
            let lessons = obj
                .get("lessons")
                .and_then(Value::as_array)
                .ok_or_else(|| mismatch(skill, "missing `lessons` array"))?;
            (Some(obj), lessons)
        }
        Value::Array(items) => (None, items),
        _ => return Err(mismatch(skill, "expected an object or an array")),
    };

    let total = lessons.len();
    let lessons: Vec<LessonData> = lessons
        .iter()
        .enumerate()
        .filter_map(|(i, lesson)| match decode_lesson(skill, level, lesson) {
            Ok(lesson) => Some(lesson),
            Err(e) => {
                warn!(lesson = i + 1, error = %e, "dropping lesson that does not match the schema");
                None
            }
        })
        .collect();
    debug!(%skill, kept = lessons.len(), total, "decoded section");

    Ok(DecodedSection {
        title: obj.and_then(|o| string_field(o, "title")),
        description: obj.and_then(|o| string_field(o, "description")),
        lessons,
    })
}
