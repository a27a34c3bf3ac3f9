use crate::drill::DrillItem;
use crate::language::Dictionary;
use crate::lessons::{LessonCatalog, LessonKind};
use crate::metrics::SessionResult;
use chrono::{DateTime, Local};
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Items at or below this priority are left out of a review
pub const REVIEW_THRESHOLD: f64 = 0.6;

const ERROR_SATURATION: f64 = 5.0;
const REVIEW_SATURATION: f64 = 5.0;
const RECENCY_DAYS: f64 = 7.0;

/// Mistake history for one character
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    pub character: char,
    pub initial_code: String,
    pub final_code: String,
    pub error_count: u32,
    pub last_error: DateTime<Local>,
    /// clean completions inside review drills
    pub review_count: u32,
    pub last_review: Option<DateTime<Local>>,
}

/// How a character fared in one drill
#[derive(Debug, Clone, PartialEq)]
pub struct CharacterOutcome<'a> {
    pub item: &'a DrillItem,
    pub misses: u32,
    pub completed: bool,
}

/// Characters the learner reached in `result`, with their miss counts.
/// Characters after the cursor of an unfinished drill are left out.
pub fn character_outcomes<'a>(
    items: &'a [DrillItem],
    result: &SessionResult,
) -> Vec<CharacterOutcome<'a>> {
    let misses = result.errors.iter().counts_by(|e| e.item_index);
    items
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            let completed = idx < result.correct_characters;
            let misses = misses.get(&idx).copied().unwrap_or(0) as u32;
            (completed || misses > 0).then_some(CharacterOutcome {
                item,
                misses,
                completed,
            })
        })
        .collect()
}

fn days_between(earlier: DateTime<Local>, now: DateTime<Local>) -> f64 {
    (now - earlier).num_milliseconds() as f64 / 86_400_000.0
}

/// Weighted urgency in `0.0..=1.0`.
///
/// Frequent mistakes weigh 0.4, a recent mistake 0.3, few reviews so far 0.2
/// and a long gap since the last review 0.1.
pub fn priority(record: &ReviewRecord, now: DateTime<Local>) -> f64 {
    let errors = (record.error_count as f64 / ERROR_SATURATION).min(1.0) * 0.4;

    let error_age = days_between(record.last_error, now);
    let recency = (1.0 - error_age / RECENCY_DAYS).clamp(0.0, 1.0) * 0.3;

    let reviews = (1.0 - record.review_count as f64 / REVIEW_SATURATION).max(0.0) * 0.2;

    let review_gap = match record.last_review {
        Some(at) => (days_between(at, now) / RECENCY_DAYS).clamp(0.0, 1.0),
        None => 1.0,
    } * 0.1;

    errors + recency + reviews + review_gap
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewItem {
    pub record: ReviewRecord,
    pub priority: f64,
}

/// Records above [`REVIEW_THRESHOLD`], most urgent first
pub fn review_items(records: &[ReviewRecord], now: DateTime<Local>) -> Vec<ReviewItem> {
    records
        .iter()
        .map(|record| ReviewItem {
            priority: priority(record, now),
            record: record.clone(),
        })
        .filter(|item| item.priority > REVIEW_THRESHOLD)
        .sorted_by(|a, b| b.priority.total_cmp(&a.priority))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewFocus {
    InitialCodes(Vec<String>),
    FinalCodes(Vec<String>),
    Characters(Vec<char>),
}

impl fmt::Display for ReviewFocus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewFocus::InitialCodes(codes) => write!(f, "initial keys: {}", codes.join(" ")),
            ReviewFocus::FinalCodes(codes) => write!(f, "final keys: {}", codes.join(" ")),
            ReviewFocus::Characters(chars) => {
                write!(f, "characters: {}", chars.iter().join(" "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewPlan {
    pub initial_codes: Vec<String>,
    pub final_codes: Vec<String>,
    /// in priority order
    pub characters: Vec<char>,
    pub focus: Vec<ReviewFocus>,
    /// catalog lessons that train at least one of the characters
    pub related_lessons: Vec<u32>,
    pub items: Vec<ReviewItem>,
}

impl ReviewPlan {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

pub fn generate_plan(
    items: Vec<ReviewItem>,
    catalog: &LessonCatalog,
    dictionary: &Dictionary,
) -> ReviewPlan {
    let initial_codes: Vec<String> = items
        .iter()
        .map(|i| i.record.initial_code.clone())
        .filter(|c| !c.is_empty())
        .unique()
        .collect();
    let final_codes: Vec<String> = items
        .iter()
        .map(|i| i.record.final_code.clone())
        .filter(|c| !c.is_empty())
        .unique()
        .collect();
    let characters: Vec<char> = items.iter().map(|i| i.record.character).unique().collect();

    let mut focus = Vec::new();
    if !initial_codes.is_empty() {
        focus.push(ReviewFocus::InitialCodes(initial_codes.clone()));
    }
    if !final_codes.is_empty() {
        focus.push(ReviewFocus::FinalCodes(final_codes.clone()));
    }
    if !characters.is_empty() {
        focus.push(ReviewFocus::Characters(characters.clone()));
    }

    let related_lessons = catalog
        .lessons
        .iter()
        .filter(|l| l.kind != LessonKind::Phrase)
        .filter(|l| {
            let pool = l.characters(dictionary);
            characters.iter().any(|c| pool.contains(c))
        })
        .map(|l| l.id)
        .collect();

    ReviewPlan {
        initial_codes,
        final_codes,
        characters,
        focus,
        related_lessons,
        items,
    }
}
