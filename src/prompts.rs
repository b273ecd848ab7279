//! Prompt and schema construction. Everything here is pure string building.

use schemars::schema_for;

use crate::domain::{AiFeedback, Level, RecentResult, Skill};
use crate::progress::SkillProgress;

/// Lessons requested per section.
pub const LESSONS_PER_SECTION: usize = 3;
/// Word ceiling for reading passages and listening scripts.
pub const PASSAGE_WORD_LIMIT: usize = 180;
/// Word ceiling for grading feedback.
pub const FEEDBACK_WORD_LIMIT: usize = 30;

const QUESTION_SCHEMA: &str = r#"{"id": string, "question": string, "type": "mcq"|"true-false"|"fill-blank"|"open", "options"?: string[], "correctAnswer": string|number|boolean, "points": number}"#;
const OPEN_QUESTION_SCHEMA: &str =
    r#"{"id": string, "question": string, "type": "open", "correctAnswer": string, "points": number}"#;
const VOCABULARY_QUESTION_SCHEMA: &str = r#"{"id": string, "question": string, "type": "mcq"|"true-false"|"fill-blank", "options"?: string[], "correctAnswer": string|number|boolean, "points": number}"#;

/// Target difficulty on a 1-5 scale: the level's base plus up to two points of XP bonus.
#[must_use]
pub fn difficulty(level: Level, xp: u32) -> u8 {
    let base = match level {
        Level::Beginner => 1,
        Level::Intermediate => 2,
        Level::Advanced => 3,
    };
    let bonus = (xp / 100).min(2) as u8;
    base + bonus
}

/// Minimum word target for writing lessons.
#[must_use]
pub fn min_words(level: Level) -> u32 {
    match level {
        Level::Beginner => 80,
        Level::Intermediate => 120,
        Level::Advanced => 180,
    }
}

#[must_use]
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// TypeScript-style description of the JSON a section response must follow.
#[must_use]
pub fn schema_for_skill(skill: Skill) -> String {
    let lesson_fields = match skill {
        Skill::Listening => "      \"audioText\": string,".to_string(),
        Skill::Reading => "      \"text\": string,".to_string(),
        Skill::Speaking => "      \"instructions\": string,\n      \"prompts\": string[],".to_string(),
        Skill::Writing => "      \"prompt\": string,\n      \"instructions\": string[],\n      \"minWords\": number,".to_string(),
        Skill::Grammar => "      \"explanation\": string,\n      \"examples\": string[],".to_string(),
        Skill::Vocabulary => {
            "      \"words\": [{\"word\": string, \"definition\": string, \"example\": string, \"synonyms\"?: string[], \"pronunciation\"?: string}],"
                .to_string()
        }
    };
    let question = match skill {
        Skill::Speaking | Skill::Writing => OPEN_QUESTION_SCHEMA,
        Skill::Vocabulary => VOCABULARY_QUESTION_SCHEMA,
        _ => QUESTION_SCHEMA,
    };

    format!(
        "{{\n  \"title\": string,\n  \"description\": string,\n  \"lessons\": [\n    {{\n      \"id\": string,\n      \"title\": string,\n{}\n      \"questions\": [\n        {}\n      ]\n    }}\n  ]\n}}",
        lesson_fields, question
    )
}

/// Instruction prompt for one section of lessons, adapted to the learner's progress.
#[must_use]
pub fn section_prompt(skill: Skill, level: Level, progress: &SkillProgress) -> String {
    let diff = difficulty(level, progress.xp);
    format!(
        "You are an expert ESL curriculum designer. Create dynamic {skill} lessons for level {level}.
- Begin each lesson with a short tutorial/explanation appropriate to the skill (see schema fields like audioText/text/explanation/prompt/words).
- Then include 4-6 assignments/questions per lesson.
- Difficulty should increase lesson-by-lesson within the level. Overall difficulty target: {diff} out of 5.
- Adapt to learner profile: completedActivities={completed}, xp={xp}.
- IMPORTANT: Output STRICT JSON that matches this TypeScript type schema (no markdown, no commentary):
{schema}
- Create {lessons} lessons in the \"lessons\" array with progressively harder content.
- For MCQ include 4 options and correctAnswer as index (0-based). For fill-blank set correctAnswer as expected string. For true-false use boolean. For open put an exemplar correctAnswer string.
- Keep texts concise (<= {limit} words for reading/audio), writing minWords: beginner {b}, intermediate {i}, advanced {a}.
",
        skill = skill,
        level = level,
        diff = diff,
        completed = progress.completed.len(),
        xp = progress.xp,
        schema = schema_for_skill(skill),
        lessons = LESSONS_PER_SECTION,
        limit = PASSAGE_WORD_LIMIT,
        b = min_words(Level::Beginner),
        i = min_words(Level::Intermediate),
        a = min_words(Level::Advanced),
    )
}

/// Ask the model to turn its own previous output into strict JSON.
#[must_use]
pub fn repair_prompt(previous_output: &str) -> String {
    format!(
        "The following output was supposed to be a single valid JSON document but could not be parsed.
Fix it and return ONLY the corrected JSON: no markdown fences, no commentary, double-quoted keys and strings, no trailing commas.
Keep the content and structure unchanged wherever possible.

Output to fix:
{}",
        previous_output
    )
}

/// Rubric prompt for grading an open answer.
#[must_use]
pub fn grading_prompt(question: &str, answer: &str, context: Option<&str>) -> String {
    let schema = schema_for!(AiFeedback);
    let schema_json = serde_json::to_string_pretty(&schema)
        .unwrap_or_else(|_| "Schema serialization failed".to_string());
    let context_line = context
        .filter(|c| !c.trim().is_empty())
        .map(|c| format!("Context: {}\n", c))
        .unwrap_or_default();

    format!(
        "You are an English teacher evaluating a student's answer. Please provide structured feedback.

Question: {question}
{context_line}Student's Answer: {answer}

Please evaluate the answer and respond in this exact JSON format:
{{
  \"correct\": true/false,
  \"score\": number (0-100),
  \"feedback\": \"concise feedback (max {limit} words) on what is good and what could be improved\"
}}

Consider grammar, vocabulary, content relevance, and completeness in your evaluation.

## Response Format
The JSON must match this schema:
```json
{schema_json}
```",
        question = question,
        context_line = context_line,
        answer = answer,
        limit = FEEDBACK_WORD_LIMIT,
        schema_json = schema_json,
    )
}

/// Question framing for speaking answers (graded from a transcript).
#[must_use]
pub fn speaking_question(prompt: &str) -> String {
    format!("Speaking prompt: {}", prompt)
}

pub const SPEAKING_CONTEXT: &str =
    "This is a speaking exercise. Evaluate pronunciation, fluency, grammar, and content.";

/// Context for writing answers: word count against the target.
#[must_use]
pub fn writing_context(word_count: usize, min_words: Option<u32>) -> String {
    let minimum = min_words
        .map(|m| format!("Minimum words required: {}. ", m))
        .unwrap_or_default();
    format!(
        "This is a writing exercise. {}Word count: {}. Evaluate grammar, vocabulary, structure, and content. Do not penalize brevity if the content is adequate.",
        minimum, word_count
    )
}

/// One adaptive follow-up question based on the learner's latest results.
#[must_use]
pub fn next_task_prompt(skill: Skill, level: Level, recent: &[RecentResult]) -> String {
    let history = serde_json::to_string(recent).unwrap_or_else(|_| "[]".to_string());
    let correct = recent.iter().filter(|r| r.correct).count();
    format!(
        "You are an adaptive ESL tutor. Create ONE new {skill} practice question for a {level} learner.
Recent results (oldest first): {history} ({correct} of {total} correct).
- If most recent answers were correct, make it slightly harder; otherwise slightly easier.
- Output STRICT JSON only (no markdown, no commentary) matching:
{{\"lesson\"?: object with the lesson fields for this skill, \"question\": {question}}}
- For MCQ include 4 options and correctAnswer as index (0-based). For fill-blank set correctAnswer as expected string. For true-false use boolean. For open put an exemplar correctAnswer string.",
        skill = skill,
        level = level,
        history = history,
        correct = correct,
        total = recent.len(),
        question = QUESTION_SCHEMA,
    )
}
