//! Session facade: owns the learner snapshot and wires generation, grading and
//! persistence together. Every progress mutation is saved before it returns.

use chrono::{DateTime, Utc};
use tracing::{info, instrument};

use crate::core::{LowLevelClient, ModelClient, RetryPolicy};
use crate::domain::{Answer, AnswerValue, ExerciseResult, LessonData, LessonRecord, Level, Question, SectionData, Skill};
use crate::error::StoreError;
use crate::evaluator::AnswerEvaluator;
use crate::generator::{NextTask, RequestTokens, SectionGenerator};
use crate::progress::{is_level_unlocked, ActivityOutcome, User};
use crate::store::{KeyValueStore, ProgressStore};

/// A graded answer and what it did to the learner's progress.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    pub answer: Answer,
    pub outcome: ActivityOutcome,
}

#[derive(Debug)]
pub struct Tutor<C: LowLevelClient + Clone, S: KeyValueStore> {
    generator: SectionGenerator<C>,
    evaluator: AnswerEvaluator<C>,
    store: ProgressStore<S>,
    tokens: RequestTokens,
    user: User,
}

impl<C: LowLevelClient + Clone, S: KeyValueStore> Tutor<C, S> {
    /// Load saved progress (or start fresh) and share `client` between generation and grading.
    pub async fn load(client: C, store: S) -> Result<Self, StoreError> {
        Self::with_policy(client, store, RetryPolicy::default()).await
    }

    pub async fn with_policy(client: C, store: S, policy: RetryPolicy) -> Result<Self, StoreError> {
        let store = ProgressStore::new(store);
        let user = store.load_user().await?;
        Ok(Self {
            generator: SectionGenerator::new(ModelClient::new(client.clone(), policy.clone())),
            evaluator: AnswerEvaluator::new(ModelClient::new(client, policy)),
            store,
            tokens: RequestTokens::new(),
            user,
        })
    }

    pub fn user(&self) -> &User {
        &self.user
    }

    pub fn store(&self) -> &ProgressStore<S> {
        &self.store
    }

    pub fn generator(&self) -> &SectionGenerator<C> {
        &self.generator
    }

    pub fn evaluator(&self) -> &AnswerEvaluator<C> {
        &self.evaluator
    }

    /// Levels of `skill` with whether each is unlocked for this learner.
    pub fn levels(&self, skill: Skill) -> Vec<(Level, bool)> {
        let xp = self.user.skill(skill).xp;
        Level::ALL
            .into_iter()
            .map(|level| (level, is_level_unlocked(xp, level)))
            .collect()
    }

    /// Generate a section for the latest navigation. `None` when superseded by a newer one.
    pub async fn open_section(&self, skill: Skill, level: Level) -> Option<SectionData> {
        self.generator
            .generate_current(&self.tokens, skill, level, &self.user)
            .await
    }

    /// Abandon any section request still in flight.
    pub fn cancel_pending(&self) {
        self.tokens.invalidate();
    }

    pub async fn next_task(&self, skill: Skill, history: &[Answer]) -> NextTask {
        let recent: Vec<_> = history.iter().map(Answer::as_recent).collect();
        self.generator
            .next_task(skill, self.user.skill(skill).level, &recent)
            .await
    }

    pub async fn submit(
        &mut self,
        skill: Skill,
        lesson: &LessonData,
        question: &Question,
        answer: AnswerValue,
    ) -> Result<Submission, StoreError> {
        self.submit_at(skill, lesson, question, answer, Utc::now()).await
    }

    /// Grade, apply XP/streak/badges and save. Each submission counts as one activity.
    ///
    /// A blank answer is graded for feedback only: it earns nothing and leaves
    /// progress untouched. Progress changes are committed only once saved.
    #[instrument(target = "lesson_forge::tutor", skip(self, lesson, question, answer), fields(%skill, lesson = %lesson.id, question = %question.id))]
    pub async fn submit_at(
        &mut self,
        skill: Skill,
        lesson: &LessonData,
        question: &Question,
        answer: AnswerValue,
        now: DateTime<Utc>,
    ) -> Result<Submission, StoreError> {
        let mut graded = self.evaluator.grade(lesson, question, &answer).await;
        if answer.is_blank() {
            graded.is_correct = Some(false);
            graded.points = Some(0);
            info!("blank answer; progress unchanged");
            return Ok(Submission {
                answer: graded,
                outcome: ActivityOutcome::default(),
            });
        }

        let points = graded.points.unwrap_or(0);
        let activity_id = format!("{}-{}-{}", lesson.id, question.id, now.timestamp_millis());

        let mut user = self.user.clone();
        let outcome = user.apply_activity(skill, points, &activity_id, now.date_naive());
        self.store.save_user(&user).await?;
        self.user = user;
        info!(points, correct = graded.is_correct.unwrap_or(false), "answer recorded");

        Ok(Submission {
            answer: graded,
            outcome,
        })
    }

    /// Store the completion record for a finished lesson.
    pub async fn finish_lesson(&self, lesson: &LessonData, answers: &[Answer]) -> Result<LessonRecord, StoreError> {
        let results = answers
            .iter()
            .map(|a| ExerciseResult {
                exercise_id: a.question_id.clone(),
                user_answer: a.answer.clone(),
                correct: a.is_correct.unwrap_or(false),
                points: a.points.unwrap_or(0),
            })
            .collect();
        let record = LessonRecord::completed(&lesson.id, results, lesson.max_points(), Utc::now());
        self.store.record_lesson(record.clone()).await?;
        Ok(record)
    }
}
