use crate::engine::ErrorRecord;
use crate::metrics::SessionResult;
use crate::stats::SessionRecord;
use chrono::{Days, NaiveDate};
use itertools::Itertools;
use std::collections::BTreeSet;

pub const DAILY_GOAL_MINUTES: u32 = 30;

/// Totals and averages over a set of sessions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    pub sessions: usize,
    pub total_duration_ms: u64,
    pub total_characters: usize,
    pub avg_speed_cpm: u32,
    pub avg_accuracy_pct: u32,
    pub best_speed_cpm: u32,
    pub best_accuracy_pct: u32,
}

impl Summary {
    pub fn practice_minutes(&self) -> f64 {
        self.total_duration_ms as f64 / 60_000.0
    }
}

pub fn summarize<'a, I>(records: I) -> Summary
where
    I: IntoIterator<Item = &'a SessionRecord>,
{
    let records: Vec<&SessionRecord> = records.into_iter().collect();
    if records.is_empty() {
        return Summary::default();
    }
    let n = records.len() as f64;
    let avg = |total: u32| (total as f64 / n).round() as u32;

    Summary {
        sessions: records.len(),
        total_duration_ms: records.iter().map(|r| r.duration_ms).sum(),
        total_characters: records.iter().map(|r| r.correct_characters).sum(),
        avg_speed_cpm: avg(records.iter().map(|r| r.speed_cpm).sum()),
        avg_accuracy_pct: avg(records.iter().map(|r| r.accuracy_pct).sum()),
        best_speed_cpm: records.iter().map(|r| r.speed_cpm).max().unwrap_or(0),
        best_accuracy_pct: records.iter().map(|r| r.accuracy_pct).max().unwrap_or(0),
    }
}

pub fn today_summary(records: &[SessionRecord], today: NaiveDate) -> Summary {
    summarize(records.iter().filter(|r| r.timestamp.date_naive() == today))
}

/// Consecutive practice days ending today, or yesterday if today has no session yet
pub fn learning_streak(records: &[SessionRecord], today: NaiveDate) -> u32 {
    let days: BTreeSet<NaiveDate> = records.iter().map(|r| r.timestamp.date_naive()).collect();

    let mut day = if days.contains(&today) {
        today
    } else {
        match today.checked_sub_days(Days::new(1)) {
            Some(yesterday) if days.contains(&yesterday) => yesterday,
            _ => return 0,
        }
    };

    let mut streak = 0;
    while days.contains(&day) {
        streak += 1;
        match day.checked_sub_days(Days::new(1)) {
            Some(prev) => day = prev,
            None => break,
        }
    }
    streak
}

/// Level from total practice time: 2/5/10/20/40 hour steps, then one level per 10 hours up to 10
pub fn user_level(total_practice_ms: u64) -> u32 {
    let hours = total_practice_ms as f64 / 3_600_000.0;
    match hours {
        h if h < 2.0 => 1,
        h if h < 5.0 => 2,
        h if h < 10.0 => 3,
        h if h < 20.0 => 4,
        h if h < 40.0 => 5,
        h => ((h / 10.0).floor() as u32 + 1).min(10),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Trend {
    Improving,
    Stable,
    Declining,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedTrend {
    pub current_avg_cpm: u32,
    pub previous_avg_cpm: u32,
    pub change_pct: i32,
    pub trend: Trend,
}

/// Average speed of the last `window` sessions against the `window` before them
pub fn speed_trend(records: &[SessionRecord], window: usize) -> SpeedTrend {
    let split = records.len().saturating_sub(window);
    let current = summarize(&records[split..]).avg_speed_cpm;
    let previous = summarize(&records[split.saturating_sub(window)..split]).avg_speed_cpm;

    let change_pct = match previous {
        0 => 0,
        p => ((current as f64 - p as f64) / p as f64 * 100.0).round() as i32,
    };
    let trend = match change_pct {
        c if c > 5 => Trend::Improving,
        c if c < -5 => Trend::Declining,
        _ => Trend::Stable,
    };

    SpeedTrend {
        current_avg_cpm: current,
        previous_avg_cpm: previous,
        change_pct,
        trend,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyStats {
    pub date: NaiveDate,
    pub avg_speed_cpm: u32,
    pub avg_accuracy_pct: u32,
    pub minutes: u32,
}

/// One entry per day for the last `days` days, oldest first; idle days are zero
pub fn daily_stats(records: &[SessionRecord], today: NaiveDate, days: u64) -> Vec<DailyStats> {
    (0..days)
        .rev()
        .filter_map(|back| today.checked_sub_days(Days::new(back)))
        .map(|date| {
            let day = today_summary(records, date);
            DailyStats {
                date,
                avg_speed_cpm: day.avg_speed_cpm,
                avg_accuracy_pct: day.avg_accuracy_pct,
                minutes: day.practice_minutes().round() as u32,
            }
        })
        .collect()
}

pub fn daily_progress_pct(today: &Summary, goal_minutes: u32) -> u32 {
    if goal_minutes == 0 {
        return 100;
    }
    ((today.practice_minutes() / goal_minutes as f64 * 100.0).round() as u32).min(100)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum Area {
    Accuracy,
    Speed,
    Consistency,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Goals {
    pub target_speed: u32,
    pub target_accuracy: u32,
}

impl Default for Goals {
    fn default() -> Self {
        Self {
            target_speed: 30,
            target_accuracy: 95,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recommendation {
    pub area: Area,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PerformanceAnalysis {
    /// percent change against the historical average speed
    pub speed_change_pct: i32,
    /// accuracy points above or below the historical average
    pub accuracy_change: i32,
    pub weak_areas: Vec<Area>,
    pub strong_areas: Vec<Area>,
    pub recommendations: Vec<Recommendation>,
}

/// Compare one session to the learner's history and suggest what to work on
pub fn analyze_performance(
    result: &SessionResult,
    overall: &Summary,
    goals: &Goals,
) -> PerformanceAnalysis {
    let speed = result.speed_cpm;
    let accuracy = result.accuracy_pct;
    let error_count = result.errors.len();

    let speed_change_pct = match overall.avg_speed_cpm {
        0 => 0,
        avg => ((speed as f64 - avg as f64) / avg as f64 * 100.0).round() as i32,
    };
    let accuracy_change = match overall.avg_accuracy_pct {
        0 => 0,
        avg => accuracy as i32 - avg as i32,
    };

    let mut weak_areas = Vec::new();
    if accuracy < 90 {
        weak_areas.push(Area::Accuracy);
    }
    if speed < 20 {
        weak_areas.push(Area::Speed);
    }
    if error_count > 5 {
        weak_areas.push(Area::Consistency);
    }

    let mut strong_areas = Vec::new();
    if accuracy >= goals.target_accuracy {
        strong_areas.push(Area::Accuracy);
    }
    if speed >= goals.target_speed {
        strong_areas.push(Area::Speed);
    }
    if error_count <= 2 {
        strong_areas.push(Area::Consistency);
    }

    let mut recommendations = Vec::new();
    if accuracy < 90 {
        recommendations.push(Recommendation {
            area: Area::Accuracy,
            message: "Slow down and focus on pressing the right code".into(),
        });
    }
    if (speed as f64) < overall.avg_speed_cpm as f64 * 0.8 {
        recommendations.push(Recommendation {
            area: Area::Speed,
            message: format!(
                "Slower than your average of {} cpm; try to keep a steady pace",
                overall.avg_speed_cpm
            ),
        });
    }
    let common = common_error_codes(&result.errors, 3);
    if !common.is_empty() {
        recommendations.push(Recommendation {
            area: Area::Consistency,
            message: format!("Practice these keys: {}", common.join(", ")),
        });
    }

    PerformanceAnalysis {
        speed_change_pct,
        accuracy_change,
        weak_areas,
        strong_areas,
        recommendations,
    }
}

/// Most frequently missed expected codes, most missed first
pub fn common_error_codes(errors: &[ErrorRecord], limit: usize) -> Vec<String> {
    errors
        .iter()
        .map(|e| e.expected_code.as_str())
        .counts()
        .into_iter()
        .sorted_by(|(a_code, a), (b_code, b)| b.cmp(a).then(a_code.cmp(b_code)))
        .take(limit)
        .map(|(code, _)| code.to_string())
        .collect()
}
