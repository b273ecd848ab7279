use chrono::NaiveDate;
use lesson_forge::progress::*;
use lesson_forge::{Level, Skill};

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

#[test]
fn beginner_is_always_unlocked() {
    assert!(is_level_unlocked(0, Level::Beginner));
    assert!(is_level_unlocked(50, Level::Beginner));
}

#[test]
fn intermediate_unlocks_at_100() {
    assert!(!is_level_unlocked(99, Level::Intermediate));
    assert!(is_level_unlocked(100, Level::Intermediate));
    assert!(is_level_unlocked(150, Level::Intermediate));
}

#[test]
fn advanced_unlocks_at_300() {
    assert!(!is_level_unlocked(299, Level::Advanced));
    assert!(is_level_unlocked(300, Level::Advanced));
    assert!(is_level_unlocked(400, Level::Advanced));
}

#[test]
fn completion_thresholds() {
    assert!(!is_level_completed(99, Level::Beginner));
    assert!(is_level_completed(100, Level::Beginner));
    assert!(!is_level_completed(299, Level::Intermediate));
    assert!(is_level_completed(300, Level::Intermediate));
    assert!(!is_level_completed(499, Level::Advanced));
    assert!(is_level_completed(500, Level::Advanced));
}

#[test]
fn next_level_unlock() {
    assert!(should_unlock_next_level(100, Level::Beginner));
    assert!(!should_unlock_next_level(99, Level::Beginner));
    assert!(should_unlock_next_level(300, Level::Intermediate));
    assert!(!should_unlock_next_level(299, Level::Intermediate));
    assert!(!should_unlock_next_level(10_000, Level::Advanced));

    assert_eq!(next_level(Level::Beginner), Some(Level::Intermediate));
    assert_eq!(next_level(Level::Intermediate), Some(Level::Advanced));
    assert_eq!(next_level(Level::Advanced), None);
}

#[test]
fn section_requirements() {
    assert_eq!(section_xp_required(Level::Beginner), 0);
    assert_eq!(section_xp_required(Level::Intermediate), 100);
    assert_eq!(section_xp_required(Level::Advanced), 300);
}

#[test]
fn xp_accumulates_per_skill_and_in_total() {
    let mut user = User::default();
    user.add_xp(Skill::Reading, 30);
    user.add_xp(Skill::Writing, 15);
    assert_eq!(user.reading.xp, 30);
    assert_eq!(user.writing.xp, 15);
    assert_eq!(user.total_xp, 45);
}

#[test]
fn streak_rules() {
    let mut user = User::default();
    user.complete_activity(Skill::Grammar, "a", day(1));
    assert_eq!(user.streak, 1);

    user.complete_activity(Skill::Grammar, "b", day(1));
    assert_eq!(user.streak, 1, "same day leaves the streak alone");

    user.complete_activity(Skill::Grammar, "c", day(2));
    user.complete_activity(Skill::Grammar, "d", day(3));
    assert_eq!(user.streak, 3);

    user.complete_activity(Skill::Grammar, "e", day(6));
    assert_eq!(user.streak, 1, "a gap restarts the streak");
    assert_eq!(user.last_active_date, Some(day(6)));
    assert_eq!(user.grammar.completed.len(), 5);
}

#[test]
fn completed_ids_are_a_set() {
    let mut user = User::default();
    user.complete_activity(Skill::Vocabulary, "same", day(1));
    user.complete_activity(Skill::Vocabulary, "same", day(1));
    assert_eq!(user.vocabulary.completed.len(), 1);
}

#[test]
fn level_advances_one_tier_and_never_regresses() {
    let mut user = User::default();
    let outcome = user.apply_activity(Skill::Listening, 400, "big", day(1));
    assert_eq!(outcome.leveled_up, Some(Level::Intermediate));
    assert_eq!(user.listening.level, Level::Intermediate);

    let outcome = user.apply_activity(Skill::Listening, 0, "zero", day(1));
    assert_eq!(outcome.leveled_up, Some(Level::Advanced));

    let outcome = user.apply_activity(Skill::Listening, 1_000, "more", day(1));
    assert_eq!(outcome.leveled_up, None);
    assert_eq!(user.listening.level, Level::Advanced);
}

#[test]
fn first_activity_earns_first_steps_once() {
    let mut user = User::default();
    let outcome = user.apply_activity(Skill::Reading, 10, "r1", day(1));
    assert_eq!(outcome.new_badges, vec!["first-steps".to_string()]);
    assert!(user.has_badge("first-steps"));

    let outcome = user.apply_activity(Skill::Reading, 10, "r2", day(1));
    assert!(outcome.new_badges.is_empty());
}

#[test]
fn mastery_badge_follows_level_up_immediately() {
    let mut user = User::default();
    user.grammar.level = Level::Intermediate;
    user.grammar.xp = 290;
    let outcome = user.apply_activity(Skill::Grammar, 10, "g", day(1));
    assert_eq!(outcome.leveled_up, Some(Level::Advanced));
    assert!(outcome.new_badges.contains(&"grammar-mastery".to_string()));
}

#[test]
fn snapshot_uses_camel_case_wire_names() {
    let mut user = User::default();
    user.apply_activity(Skill::Speaking, 20, "s1", day(4));
    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["totalXP"], 20);
    assert_eq!(json["lastActiveDate"], "2024-03-04");
    assert_eq!(json["speaking"]["level"], "beginner");
    assert_eq!(json["speaking"]["completed"][0], "s1");

    let back: User = serde_json::from_value(json).unwrap();
    assert_eq!(back, user);
}

#[test]
fn partial_snapshot_fills_defaults() {
    let user: User = serde_json::from_str(r#"{"totalXP": 5, "reading": {"xp": 5}}"#).unwrap();
    assert_eq!(user.total_xp, 5);
    assert_eq!(user.reading.level, Level::Beginner);
    assert!(user.badges.is_empty());
}
