//! Section generation: prompt, model call, JSON recovery with one repair round-trip,
//! schema decoding, and built-in lessons when any of that fails.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::core::{LowLevelClient, ModelClient};
use crate::decode::{decode_content, decode_question, decode_section};
use crate::domain::{Level, LessonContent, LessonData, Question, RecentResult, SectionData, Skill};
use crate::error::GenerationError;
use crate::fallback::{fallback_lessons, fallback_question};
use crate::json_utils::parse_recovering;
use crate::progress::{section_xp_required, User};
use crate::prompts;

/// How many recent results feed an adaptive next-task prompt.
pub const RECENT_WINDOW: usize = 5;

/// A navigation ticket issued by `RequestTokens`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// Generation counter used to discard responses for a navigation that was superseded.
///
/// Each navigation calls `begin`; a response is only applied while its ticket is current.
#[derive(Debug, Default)]
pub struct RequestTokens {
    latest: AtomicU64,
}

impl RequestTokens {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn begin(&self) -> Ticket {
        Ticket(self.latest.fetch_add(1, Ordering::SeqCst) + 1)
    }

    #[must_use]
    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.latest.load(Ordering::SeqCst) == ticket.0
    }

    /// Make every outstanding ticket stale.
    pub fn invalidate(&self) {
        self.latest.fetch_add(1, Ordering::SeqCst);
    }
}

/// An adaptive follow-up question, optionally with replacement lesson material.
#[derive(Debug, Clone, PartialEq)]
pub struct NextTask {
    pub question: Question,
    pub lesson: Option<LessonContent>,
}

/// Fill in ids, titles, question ids and default points, and wrap the lessons in a section.
#[must_use]
pub fn assemble_section(skill: Skill, level: Level, lessons: Vec<LessonData>) -> SectionData {
    let title = format!("{} • {}", skill.display_name(), level.display_name());
    let lessons = lessons
        .into_iter()
        .enumerate()
        .map(|(i, mut lesson)| {
            let n = i + 1;
            if lesson.id.trim().is_empty() {
                lesson.id = format!("{}-{}-lesson-{}", skill, level, n);
            }
            if lesson.title.trim().is_empty() {
                lesson.title = format!("{}: Lesson {}", title, n);
            }
            for (j, question) in lesson.questions.iter_mut().enumerate() {
                if question.id.trim().is_empty() {
                    question.id = format!("{}-q{}", lesson.id, j + 1);
                }
                question.points = question.points_or_default();
            }
            lesson
        })
        .collect();

    SectionData {
        title,
        description: format!(
            "AI-generated {} lessons for {} level with adaptive difficulty",
            skill, level
        ),
        xp_required: section_xp_required(level),
        lessons,
    }
}

/// The built-in section for `skill` at `level`.
#[must_use]
pub fn fallback_section(skill: Skill, level: Level) -> SectionData {
    assemble_section(skill, level, fallback_lessons(skill, level))
}

#[derive(Debug, Clone)]
pub struct SectionGenerator<C: LowLevelClient> {
    model: ModelClient<C>,
}

impl<C: LowLevelClient> SectionGenerator<C> {
    pub fn new(model: ModelClient<C>) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &ModelClient<C> {
        &self.model
    }

    /// Always returns a usable section; failures are logged and replaced by built-in lessons.
    #[instrument(target = "lesson_forge::generator", skip(self, user), fields(%skill, %level))]
    pub async fn generate(&self, skill: Skill, level: Level, user: &User) -> SectionData {
        match self.try_generate(skill, level, user).await {
            Ok(section) => section,
            Err(e) => {
                warn!(error = %e, "section generation failed; serving built-in lessons");
                fallback_section(skill, level)
            }
        }
    }

    /// `generate` under a navigation ticket. `None` when a newer navigation began while
    /// the request was in flight.
    pub async fn generate_current(
        &self,
        tokens: &RequestTokens,
        skill: Skill,
        level: Level,
        user: &User,
    ) -> Option<SectionData> {
        let ticket = tokens.begin();
        let section = self.generate(skill, level, user).await;
        if tokens.is_current(ticket) {
            Some(section)
        } else {
            info!(%skill, %level, "discarding section for a superseded request");
            None
        }
    }

    /// The generation pipeline without the fallback.
    pub async fn try_generate(
        &self,
        skill: Skill,
        level: Level,
        user: &User,
    ) -> Result<SectionData, GenerationError> {
        let prompt = prompts::section_prompt(skill, level, user.skill(skill));
        let value = self.request_json(&prompt).await?;
        let decoded = decode_section(skill, level, &value)?;
        if decoded.lessons.is_empty() {
            return Err(GenerationError::EmptySection);
        }
        info!(lessons = decoded.lessons.len(), "generated section");
        Ok(assemble_section(skill, level, decoded.lessons))
    }

    /// Send `prompt` and recover JSON, asking the model once to repair unparseable output.
    async fn request_json(&self, prompt: &str) -> Result<Value, GenerationError> {
        let raw = self.model.send(prompt).await?;
        match parse_recovering(&raw) {
            Ok(value) => Ok(value),
            Err(e) => {
                warn!(error = %e, "model output was not valid JSON; requesting repair");
                let repaired = self.model.send(&prompts::repair_prompt(&raw)).await?;
                Ok(parse_recovering(&repaired)?)
            }
        }
    }

    /// One adaptive question based on the last few results. Never fails.
    #[instrument(target = "lesson_forge::generator", skip(self, recent), fields(%skill, %level, recent = recent.len()))]
    pub async fn next_task(&self, skill: Skill, level: Level, recent: &[RecentResult]) -> NextTask {
        match self.try_next_task(skill, level, recent).await {
            Ok(task) => task,
            Err(e) => {
                warn!(error = %e, "next task generation failed; serving fallback question");
                NextTask {
                    question: fallback_question(Utc::now()),
                    lesson: None,
                }
            }
        }
    }

    pub async fn try_next_task(
        &self,
        skill: Skill,
        level: Level,
        recent: &[RecentResult],
    ) -> Result<NextTask, GenerationError> {
        let window = &recent[recent.len().saturating_sub(RECENT_WINDOW)..];
        let value = self
            .request_json(&prompts::next_task_prompt(skill, level, window))
            .await?;

        let question_value = value.get("question").unwrap_or(&value);
        let mut question = decode_question(skill, question_value)?;
        if question.id.is_empty() {
            question.id = format!("q-{}", Utc::now().timestamp_millis());
        }
        question.points = question.points_or_default();

        let lesson = value
            .get("lesson")
            .and_then(|l| decode_content(skill, level, l).ok());

        Ok(NextTask { question, lesson })
    }
}
