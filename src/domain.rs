//! Lesson, question and feedback types shared by the generator, the evaluator and the store.
//!
//! Field names follow the camelCase JSON the model is asked to produce (`audioText`,
//! `correctAnswer`, `minWords`), so the same types serialize back into that shape.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One of the six learning categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Skill {
    Listening,
    Reading,
    Speaking,
    Writing,
    Grammar,
    Vocabulary,
}

impl Skill {
    pub const ALL: [Skill; 6] = [
        Skill::Listening,
        Skill::Reading,
        Skill::Speaking,
        Skill::Writing,
        Skill::Grammar,
        Skill::Vocabulary,
    ];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Listening => "listening",
            Self::Reading => "reading",
            Self::Speaking => "speaking",
            Self::Writing => "writing",
            Self::Grammar => "grammar",
            Self::Vocabulary => "vocabulary",
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Listening => "Listening",
            Self::Reading => "Reading",
            Self::Speaking => "Speaking",
            Self::Writing => "Writing",
            Self::Grammar => "Grammar",
            Self::Vocabulary => "Vocabulary",
        }
    }
}

impl fmt::Display for Skill {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Skill {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Skill::ALL
            .into_iter()
            .find(|skill| skill.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                format!(
                    "Unknown skill: '{}'. Supported: listening, reading, speaking, writing, grammar, vocabulary",
                    s
                )
            })
    }
}

/// Proficiency tier. Ordering follows progression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Beginner, Level::Intermediate, Level::Advanced];

    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }

    #[must_use]
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }

    /// The tier after this one, or `None` at the top.
    #[must_use]
    pub fn next(&self) -> Option<Level> {
        match self {
            Self::Beginner => Some(Self::Intermediate),
            Self::Intermediate => Some(Self::Advanced),
            Self::Advanced => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "beginner" => Ok(Self::Beginner),
            "intermediate" => Ok(Self::Intermediate),
            "advanced" => Ok(Self::Advanced),
            _ => Err(format!("Unknown level: '{}'. Supported: beginner, intermediate, advanced", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    #[serde(alias = "multiple-choice", alias = "multiple_choice", alias = "MCQ")]
    Mcq,
    #[serde(alias = "true_false", alias = "truefalse", alias = "boolean")]
    TrueFalse,
    #[serde(alias = "fill_blank", alias = "fill-in-the-blank", alias = "fill")]
    FillBlank,
    #[serde(alias = "open-ended", alias = "open_ended", alias = "essay")]
    Open,
}

/// A scalar answer as it appears in JSON: an option index, a boolean, or text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AnswerValue {
    Bool(bool),
    /// Non-negative integers, including option indices. Listed before `Number`
    /// so they keep their integer spelling on the wire.
    Index(u64),
    Number(f64),
    Text(String),
}

impl AnswerValue {
    /// Normalizes `true`/`false`/`1`/`0` in any of their JSON spellings, case-insensitively.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            Self::Index(1) => Some(true),
            Self::Index(0) => Some(false),
            Self::Index(_) => None,
            Self::Number(n) if *n == 1.0 => Some(true),
            Self::Number(n) if *n == 0.0 => Some(false),
            Self::Number(_) => None,
            Self::Text(s) => match s.trim().to_lowercase().as_str() {
                "true" | "1" => Some(true),
                "false" | "0" => Some(false),
                _ => None,
            },
        }
    }

    /// Non-negative integral numbers (or digit strings) as an index.
    #[must_use]
    pub fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(i) => usize::try_from(*i).ok(),
            Self::Number(n) if *n >= 0.0 && n.fract() == 0.0 => Some(*n as usize),
            Self::Text(s) => s.trim().parse::<usize>().ok(),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Text(s) if s.trim().is_empty())
    }
}

impl fmt::Display for AnswerValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Index(i) => write!(f, "{}", i),
            Self::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{}", n),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for AnswerValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<bool> for AnswerValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<usize> for AnswerValue {
    fn from(value: usize) -> Self {
        Self::Index(value as u64)
    }
}

/// Lowercase, trimmed, single-spaced. Used for option and fill-blank comparisons.
#[must_use]
pub fn normalize_text(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Question {
    #[serde(default)]
    pub id: String,
    pub question: String,
    #[serde(rename = "type")]
    pub kind: QuestionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<AnswerValue>,
    #[serde(default)]
    pub points: u32,
}

impl Question {
    /// Points awarded for a question that does not state its own.
    #[must_use]
    pub fn default_points(kind: QuestionType) -> u32 {
        match kind {
            QuestionType::Open => 20,
            _ => 10,
        }
    }

    #[must_use]
    pub fn points_or_default(&self) -> u32 {
        if self.points == 0 {
            Self::default_points(self.kind)
        } else {
            self.points
        }
    }

    /// Resolves the MCQ answer to an option index.
    ///
    /// Accepts the 0-based index the prompt asks for, and defensively a string
    /// matching one option's normalized text.
    #[must_use]
    pub fn mcq_index(&self) -> Option<usize> {
        let options = self.options.as_ref()?;
        let answer = self.correct_answer.as_ref()?;
        if let Some(idx) = answer.as_index() {
            return (idx < options.len()).then_some(idx);
        }
        match answer {
            AnswerValue::Text(text) => {
                let wanted = normalize_text(text);
                options.iter().position(|o| normalize_text(o) == wanted)
            }
            _ => None,
        }
    }

    #[must_use]
    pub fn true_false_answer(&self) -> Option<bool> {
        self.correct_answer.as_ref().and_then(AnswerValue::as_bool)
    }

    /// Human-readable correct answer for feedback messages.
    #[must_use]
    pub fn correct_answer_display(&self) -> String {
        match self.kind {
            QuestionType::Mcq => self
                .mcq_index()
                .and_then(|i| self.options.as_ref().and_then(|o| o.get(i)).cloned())
                .unwrap_or_default(),
            QuestionType::TrueFalse => self
                .true_false_answer()
                .map(|b| b.to_string())
                .unwrap_or_default(),
            _ => self
                .correct_answer
                .as_ref()
                .map(ToString::to_string)
                .unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,
    pub definition: String,
    #[serde(default)]
    pub example: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub synonyms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pronunciation: Option<String>,
}

/// Skill-specific lesson material, flattened into the lesson object on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LessonContent {
    Listening {
        #[serde(rename = "audioText")]
        audio_text: String,
    },
    Reading {
        text: String,
    },
    Writing {
        prompt: String,
        instructions: Vec<String>,
        #[serde(rename = "minWords")]
        min_words: u32,
    },
    Speaking {
        instructions: String,
        prompts: Vec<String>,
    },
    Grammar {
        explanation: String,
        examples: Vec<String>,
    },
    Vocabulary {
        words: Vec<WordEntry>,
    },
}

impl LessonContent {
    #[must_use]
    pub fn skill(&self) -> Skill {
        match self {
            Self::Listening { .. } => Skill::Listening,
            Self::Reading { .. } => Skill::Reading,
            Self::Writing { .. } => Skill::Writing,
            Self::Speaking { .. } => Skill::Speaking,
            Self::Grammar { .. } => Skill::Grammar,
            Self::Vocabulary { .. } => Skill::Vocabulary,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LessonData {
    pub id: String,
    pub title: String,
    #[serde(flatten)]
    pub content: LessonContent,
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl LessonData {
    #[must_use]
    pub fn skill(&self) -> Skill {
        self.content.skill()
    }

    /// Source passage used to ground comprehension grading.
    #[must_use]
    pub fn passage(&self) -> Option<&str> {
        match &self.content {
            LessonContent::Reading { text } => Some(text),
            LessonContent::Listening { audio_text } => Some(audio_text),
            _ => None,
        }
    }

    #[must_use]
    pub fn max_points(&self) -> u32 {
        self.questions.iter().map(Question::points_or_default).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionData {
    pub title: String,
    pub description: String,
    pub xp_required: u32,
    pub lessons: Vec<LessonData>,
}

/// Grading result for an open answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AiFeedback {
    /// Whether the answer is acceptable overall
    pub correct: bool,
    /// Overall quality from 0 to 100
    #[schemars(range(min = 0, max = 100))]
    pub score: u32,
    /// Concise feedback for the learner, at most 30 words
    pub feedback: String,
}

/// One submitted answer within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Answer {
    pub question_id: String,
    pub answer: AnswerValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_correct: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
}

impl Answer {
    #[must_use]
    pub fn as_recent(&self) -> RecentResult {
        RecentResult {
            correct: self.is_correct.unwrap_or(false),
            points: self.points,
        }
    }
}

/// Compact answer history fed back into adaptive next-task prompts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentResult {
    pub correct: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseResult {
    pub exercise_id: String,
    pub user_answer: AnswerValue,
    pub correct: bool,
    pub points: u32,
}

/// Completion record stored under `lesson-progress`, keyed by lesson id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonRecord {
    pub lesson_id: String,
    pub completed: bool,
    pub score: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub exercise_results: Vec<ExerciseResult>,
}

impl LessonRecord {
    /// Builds a completed record; `score` is the percentage of `max_points` earned.
    #[must_use]
    pub fn completed(
        lesson_id: &str,
        results: Vec<ExerciseResult>,
        max_points: u32,
        at: DateTime<Utc>,
    ) -> Self {
        let earned: u32 = results.iter().map(|r| r.points).sum();
        let score = if max_points == 0 {
            0
        } else {
            ((f64::from(earned) / f64::from(max_points)) * 100.0).round() as u32
        };
        Self {
            lesson_id: lesson_id.to_string(),
            completed: true,
            score: score.min(100),
            completed_at: Some(at),
            exercise_results: results,
        }
    }
}
