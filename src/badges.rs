use crate::domain::{Level, Skill};
use crate::progress::User;

/// What a badge's `requirement` is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BadgeCategory {
    /// Any XP at all.
    General,
    /// Consecutive active days.
    Streak,
    /// Total XP across skills.
    Xp,
    /// Completed activities in one skill.
    Skill(Skill),
    /// The skill has reached the advanced level.
    Mastery(Skill),
}

impl BadgeCategory {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Streak => "streak",
            Self::Xp => "xp",
            Self::Skill(skill) => skill.as_str(),
            Self::Mastery(_) => "mastery",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Badge {
    pub id: &'static str,
    pub name: &'static str,
    pub icon: &'static str,
    pub description: &'static str,
    pub requirement: u32,
    pub category: BadgeCategory,
}

impl Badge {
    #[must_use]
    pub fn is_earned_by(&self, user: &User) -> bool {
        match self.category {
            BadgeCategory::General => user.total_xp > 0,
            BadgeCategory::Streak => user.streak >= self.requirement,
            BadgeCategory::Xp => user.total_xp >= self.requirement,
            BadgeCategory::Skill(skill) => {
                user.skill(skill).completed.len() >= self.requirement as usize
            }
            BadgeCategory::Mastery(skill) => user.skill(skill).level == Level::Advanced,
        }
    }
}

const fn badge(
    id: &'static str,
    name: &'static str,
    icon: &'static str,
    description: &'static str,
    requirement: u32,
    category: BadgeCategory,
) -> Badge {
    Badge {
        id,
        name,
        icon,
        description,
        requirement,
        category,
    }
}

pub static BADGES: [Badge; 17] = [
    badge("first-steps", "First Steps", "👶", "Complete your first activity", 1, BadgeCategory::General),
    badge("streak-3", "Consistency", "🔥", "Maintain a 3-day streak", 3, BadgeCategory::Streak),
    badge("streak-7", "Week Warrior", "⚡", "Maintain a 7-day streak", 7, BadgeCategory::Streak),
    badge("grammar-ninja", "Grammar Ninja", "🥷", "Complete 10 grammar exercises", 10, BadgeCategory::Skill(Skill::Grammar)),
    badge("word-wizard", "Word Wizard", "🪄", "Learn 50 new vocabulary words", 50, BadgeCategory::Skill(Skill::Vocabulary)),
    badge("listening-master", "Listening Master", "🎧", "Complete 20 listening exercises", 20, BadgeCategory::Skill(Skill::Listening)),
    badge("reading-champion", "Reading Champion", "📖", "Complete 15 reading exercises", 15, BadgeCategory::Skill(Skill::Reading)),
    badge("speaking-star", "Speaking Star", "⭐", "Complete 10 speaking exercises", 10, BadgeCategory::Skill(Skill::Speaking)),
    badge("writing-pro", "Writing Pro", "✍️", "Complete 12 writing exercises", 12, BadgeCategory::Skill(Skill::Writing)),
    badge("xp-1000", "Rising Star", "🌟", "Earn 1000 total XP", 1000, BadgeCategory::Xp),
    badge("xp-5000", "Super Learner", "🚀", "Earn 5000 total XP", 5000, BadgeCategory::Xp),
    badge("listening-mastery", "Listening Mastery", "🏆", "Complete Advanced Listening", 1, BadgeCategory::Mastery(Skill::Listening)),
    badge("reading-mastery", "Reading Mastery", "🏆", "Complete Advanced Reading", 1, BadgeCategory::Mastery(Skill::Reading)),
    badge("speaking-mastery", "Speaking Mastery", "🏆", "Complete Advanced Speaking", 1, BadgeCategory::Mastery(Skill::Speaking)),
    badge("writing-mastery", "Writing Mastery", "🏆", "Complete Advanced Writing", 1, BadgeCategory::Mastery(Skill::Writing)),
    badge("grammar-mastery", "Grammar Mastery", "🏆", "Complete Advanced Grammar", 1, BadgeCategory::Mastery(Skill::Grammar)),
    badge("vocabulary-mastery", "Vocabulary Mastery", "🏆", "Complete Advanced Vocabulary", 1, BadgeCategory::Mastery(Skill::Vocabulary)),
];

#[must_use]
pub fn find_badge(id: &str) -> Option<&'static Badge> {
    BADGES.iter().find(|b| b.id == id)
}

/// Ids of catalog badges the user qualifies for but has not been awarded, in catalog order.
#[must_use]
pub fn check_new_badges(user: &User) -> Vec<String> {
    BADGES
        .iter()
        .filter(|b| !user.has_badge(b.id))
        .filter(|b| b.is_earned_by(user))
        .map(|b| b.id.to_string())
        .collect()
}
