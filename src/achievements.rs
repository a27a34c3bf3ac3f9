use crate::analytics::learning_streak;
use crate::stats::SessionRecord;
use chrono::NaiveDate;
use itertools::Itertools;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum AchievementKind {
    #[strum(serialize = "practice time")]
    PracticeTime,
    #[strum(serialize = "characters")]
    Characters,
    #[strum(serialize = "speed")]
    Speed,
    #[strum(serialize = "accuracy")]
    Accuracy,
    #[strum(serialize = "lessons")]
    Lessons,
    #[strum(serialize = "sessions")]
    Sessions,
    #[strum(serialize = "streak")]
    Streak,
    #[strum(serialize = "review")]
    Review,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Achievement {
    pub id: &'static str,
    pub kind: AchievementKind,
    pub title: &'static str,
    pub description: &'static str,
    /// seconds, characters, cpm, percent, lessons, sessions, days or reviews depending on `kind`
    pub requirement: u64,
    pub points: u32,
}

const fn achievement(
    id: &'static str,
    kind: AchievementKind,
    title: &'static str,
    description: &'static str,
    requirement: u64,
    points: u32,
) -> Achievement {
    Achievement {
        id,
        kind,
        title,
        description,
        requirement,
        points,
    }
}

use AchievementKind::*;

pub const ACHIEVEMENTS: [Achievement; 24] = [
    achievement("practice_time_1", PracticeTime, "First Steps", "Practice for 1 hour in total", 3_600, 100),
    achievement("practice_time_2", PracticeTime, "Diligent", "Practice for 5 hours in total", 18_000, 300),
    achievement("practice_time_3", PracticeTime, "Persistent", "Practice for 10 hours in total", 36_000, 500),
    achievement("char_count_1", Characters, "Getting Started", "Type 1000 characters", 1_000, 100),
    achievement("char_count_2", Characters, "Into the Groove", "Type 5000 characters", 5_000, 300),
    achievement("char_count_3", Characters, "Seasoned", "Type 10000 characters", 10_000, 500),
    achievement("speed_1", Speed, "Quick Off the Mark", "Reach 30 characters per minute", 30, 100),
    achievement("speed_2", Speed, "Like the Wind", "Reach 60 characters per minute", 60, 300),
    achievement("speed_3", Speed, "Lightning", "Reach 100 characters per minute", 100, 500),
    achievement("accuracy_1", Accuracy, "Steady Hands", "Finish a drill with 95% accuracy", 95, 100),
    achievement("accuracy_2", Accuracy, "Precise", "Finish a drill with 98% accuracy", 98, 300),
    achievement("accuracy_3", Accuracy, "Flawless", "Finish a drill with 100% accuracy", 100, 500),
    achievement("lesson_complete_1", Lessons, "Student", "Complete 5 different lessons", 5, 100),
    achievement("lesson_complete_2", Lessons, "Scholar", "Complete 10 different lessons", 10, 300),
    achievement("lesson_complete_3", Lessons, "Graduate", "Complete 15 different lessons", 15, 500),
    achievement("sessions_1", Sessions, "Hello Shuangpin", "Finish your first session", 1, 50),
    achievement("sessions_2", Sessions, "Regular", "Finish 10 sessions", 10, 150),
    achievement("sessions_3", Sessions, "Devoted", "Finish 50 sessions", 50, 400),
    achievement("streak_1", Streak, "On a Roll", "Practice 3 days in a row", 3, 100),
    achievement("streak_2", Streak, "Week Streak", "Practice 7 days in a row", 7, 300),
    achievement("streak_3", Streak, "Unstoppable", "Practice 30 days in a row", 30, 500),
    achievement("review_1", Review, "Old Made New", "Finish 5 review drills", 5, 100),
    achievement("review_2", Review, "It All Connects", "Finish 15 review drills", 15, 300),
    achievement("review_3", Review, "Never Tired of Learning", "Finish 30 review drills", 30, 500),
];

pub fn by_id(id: &str) -> Option<&'static Achievement> {
    ACHIEVEMENTS.iter().find(|a| a.id == id)
}

/// Cumulative progress values the catalog is checked against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub practice_secs: u64,
    pub characters: u64,
    pub best_speed_cpm: u32,
    /// best accuracy among sessions that reached the last character
    pub best_completed_accuracy: u32,
    pub completed_lessons: u64,
    pub sessions: u64,
    pub streak_days: u64,
    /// finished review drills
    pub reviews: u64,
}

impl ProgressSnapshot {
    pub fn from_history(history: &[SessionRecord], today: NaiveDate) -> Self {
        let completed = || history.iter().filter(|s| s.completed);
        Self {
            practice_secs: history.iter().map(|s| s.duration_ms).sum::<u64>() / 1000,
            characters: history.iter().map(|s| s.correct_characters as u64).sum(),
            best_speed_cpm: history.iter().map(|s| s.speed_cpm).max().unwrap_or(0),
            best_completed_accuracy: completed().map(|s| s.accuracy_pct).max().unwrap_or(0),
            completed_lessons: completed().filter_map(|s| s.lesson).unique().count() as u64,
            sessions: history.len() as u64,
            streak_days: learning_streak(history, today) as u64,
            reviews: 0,
        }
    }

    pub fn with_reviews(mut self, reviews: u64) -> Self {
        self.reviews = reviews;
        self
    }

    fn value(&self, kind: AchievementKind) -> u64 {
        match kind {
            PracticeTime => self.practice_secs,
            Characters => self.characters,
            Speed => self.best_speed_cpm as u64,
            Accuracy => self.best_completed_accuracy as u64,
            Lessons => self.completed_lessons,
            Sessions => self.sessions,
            Streak => self.streak_days,
            Review => self.reviews,
        }
    }
}

/// Catalog entries met by `progress` that are not in `unlocked` yet
pub fn newly_unlocked(
    progress: &ProgressSnapshot,
    unlocked: &HashSet<String>,
) -> Vec<&'static Achievement> {
    ACHIEVEMENTS
        .iter()
        .filter(|a| !unlocked.contains(a.id))
        .filter(|a| progress.value(a.kind) >= a.requirement)
        .collect()
}

pub fn total_points<'a, I: IntoIterator<Item = &'a str>>(unlocked_ids: I) -> u32 {
    unlocked_ids
        .into_iter()
        .filter_map(by_id)
        .map(|a| a.points)
        .sum()
}
