//! Per-skill XP thresholds, level unlocks, and the mutable user snapshot.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::badges::check_new_badges;
use crate::domain::{Level, Skill};

pub const BEGINNER_THRESHOLD: u32 = 100;
pub const INTERMEDIATE_THRESHOLD: u32 = 300;
pub const ADVANCED_THRESHOLD: u32 = 500;

/// XP that completes `level`.
#[must_use]
pub fn threshold(level: Level) -> u32 {
    match level {
        Level::Beginner => BEGINNER_THRESHOLD,
        Level::Intermediate => INTERMEDIATE_THRESHOLD,
        Level::Advanced => ADVANCED_THRESHOLD,
    }
}

#[must_use]
pub fn is_level_unlocked(xp: u32, target: Level) -> bool {
    match target {
        Level::Beginner => true,
        Level::Intermediate => xp >= BEGINNER_THRESHOLD,
        Level::Advanced => xp >= INTERMEDIATE_THRESHOLD,
    }
}

#[must_use]
pub fn is_level_completed(xp: u32, target: Level) -> bool {
    xp >= threshold(target)
}

/// True once `current` is completed and there is a tier above it.
#[must_use]
pub fn should_unlock_next_level(xp: u32, current: Level) -> bool {
    current.next().is_some() && is_level_completed(xp, current)
}

#[must_use]
pub fn next_level(level: Level) -> Option<Level> {
    level.next()
}

/// XP a learner needs before a section at `level` is offered.
#[must_use]
pub fn section_xp_required(level: Level) -> u32 {
    match level {
        Level::Beginner => 0,
        Level::Intermediate => BEGINNER_THRESHOLD,
        Level::Advanced => INTERMEDIATE_THRESHOLD,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillProgress {
    #[serde(default)]
    pub level: Level,
    #[serde(default)]
    pub xp: u32,
    /// Completed activity ids.
    #[serde(default)]
    pub completed: BTreeSet<String>,
}

/// Result of recording one activity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityOutcome {
    /// Badge ids earned by this activity, in catalog order.
    pub new_badges: Vec<String>,
    /// The new level when the skill advanced.
    pub leveled_up: Option<Level>,
}

/// The persisted learner snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub listening: SkillProgress,
    #[serde(default)]
    pub reading: SkillProgress,
    #[serde(default)]
    pub speaking: SkillProgress,
    #[serde(default)]
    pub writing: SkillProgress,
    #[serde(default)]
    pub grammar: SkillProgress,
    #[serde(default)]
    pub vocabulary: SkillProgress,
    #[serde(default, rename = "totalXP")]
    pub total_xp: u32,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub last_active_date: Option<NaiveDate>,
    #[serde(default)]
    pub badges: BTreeSet<String>,
}

impl User {
    #[must_use]
    pub fn skill(&self, skill: Skill) -> &SkillProgress {
        match skill {
            Skill::Listening => &self.listening,
            Skill::Reading => &self.reading,
            Skill::Speaking => &self.speaking,
            Skill::Writing => &self.writing,
            Skill::Grammar => &self.grammar,
            Skill::Vocabulary => &self.vocabulary,
        }
    }

    pub fn skill_mut(&mut self, skill: Skill) -> &mut SkillProgress {
        match skill {
            Skill::Listening => &mut self.listening,
            Skill::Reading => &mut self.reading,
            Skill::Speaking => &mut self.speaking,
            Skill::Writing => &mut self.writing,
            Skill::Grammar => &mut self.grammar,
            Skill::Vocabulary => &mut self.vocabulary,
        }
    }

    #[must_use]
    pub fn has_badge(&self, id: &str) -> bool {
        self.badges.contains(id)
    }

    pub fn add_xp(&mut self, skill: Skill, points: u32) {
        let progress = self.skill_mut(skill);
        progress.xp = progress.xp.saturating_add(points);
        self.total_xp = self.total_xp.saturating_add(points);
    }

    /// Mark an activity done and roll the daily streak forward.
    ///
    /// Same day leaves the streak alone, the following day extends it, and any
    /// longer gap restarts it at 1. Dates earlier than the last active one are ignored.
    pub fn complete_activity(&mut self, skill: Skill, activity_id: &str, today: NaiveDate) {
        self.skill_mut(skill).completed.insert(activity_id.to_string());

        match self.last_active_date {
            Some(last) if today <= last => {}
            Some(last) if last.succ_opt() == Some(today) => {
                self.streak = self.streak.saturating_add(1);
                self.last_active_date = Some(today);
            }
            _ => {
                self.streak = 1;
                self.last_active_date = Some(today);
            }
        }
    }

    /// Advance `skill` by at most one tier when its current tier is completed.
    pub fn level_up(&mut self, skill: Skill) -> Option<Level> {
        let progress = self.skill_mut(skill);
        if !should_unlock_next_level(progress.xp, progress.level) {
            return None;
        }
        let next = progress.level.next()?;
        progress.level = next;
        Some(next)
    }

    /// Record one answered activity: XP, completion, streak, level and badges.
    pub fn apply_activity(
        &mut self,
        skill: Skill,
        points: u32,
        activity_id: &str,
        today: NaiveDate,
    ) -> ActivityOutcome {
        self.add_xp(skill, points);
        self.complete_activity(skill, activity_id, today);
        let leveled_up = self.level_up(skill);
        if let Some(level) = leveled_up {
            info!(%skill, %level, "skill leveled up");
        }

        let new_badges = check_new_badges(self);
        for badge in &new_badges {
            info!(%badge, "badge earned");
            self.badges.insert(badge.clone());
        }

        ActivityOutcome {
            new_badges,
            leveled_up,
        }
    }
}
