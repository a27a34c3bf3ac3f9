use crate::engine::{ErrorRecord, KeystrokeRecord, SessionState, Stage};
use crate::time_series::TimeSeriesPoint;
use crate::util::{percentage, std_dev};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// Completed characters per minute; 0 before any active time has passed
pub fn compute_speed_cpm(completed_characters: usize, active_elapsed_ms: u64) -> u32 {
    if active_elapsed_ms == 0 {
        return 0;
    }
    (completed_characters as f64 / (active_elapsed_ms as f64 / 60_000.0)).round() as u32
}

/// Keystroke-level accuracy; 100 when nothing has been typed yet
pub fn compute_accuracy_pct(correct_keystrokes: usize, total_keystrokes: usize) -> u32 {
    percentage(correct_keystrokes, total_keystrokes).map_or(100, |pct| pct.round() as u32)
}

pub fn compute_score(speed_cpm: u32, accuracy_pct: u32) -> u32 {
    (speed_cpm as f64 * accuracy_pct as f64 / 100.0).round() as u32
}

/// Read-only snapshot for display refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveStats {
    pub cursor: usize,
    pub stage: Stage,
    pub correct_count: usize,
    pub error_count: usize,
    pub speed_cpm: u32,
    pub accuracy_pct: u32,
    pub progress_pct: u32,
    pub elapsed_ms: u64,
    pub remaining_ms: Option<u64>,
}

pub fn compute_live_stats(state: &SessionState, now_ms: u64) -> LiveStats {
    let elapsed_ms = state.active_elapsed_ms(now_ms);
    LiveStats {
        cursor: state.cursor(),
        stage: state.stage(),
        correct_count: state.correct_count(),
        error_count: state.error_count(),
        speed_cpm: compute_speed_cpm(state.cursor(), elapsed_ms),
        accuracy_pct: compute_accuracy_pct(
            state.correct_count(),
            state.correct_count() + state.error_count(),
        ),
        progress_pct: percentage(state.cursor(), state.items().len())
            .map_or(0, |pct| pct.round() as u32),
        elapsed_ms,
        remaining_ms: None,
    }
}

/// Final record of a session, handed to history, analytics and achievements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub started_at: DateTime<Local>,
    pub duration_ms: u64,
    pub total_characters: usize,
    pub correct_characters: usize,
    pub errors: Vec<ErrorRecord>,
    pub keystrokes: Vec<KeystrokeRecord>,
    pub speed_cpm: u32,
    pub accuracy_pct: u32,
    pub completed: bool,
    pub score: u32,
    pub speed_series: Vec<TimeSeriesPoint>,
    pub rhythm_std_dev: f64,
}

pub fn build_session_result(
    state: &SessionState,
    now_ms: u64,
    started_at: DateTime<Local>,
) -> SessionResult {
    let duration_ms = state.active_elapsed_ms(now_ms);
    let speed_cpm = compute_speed_cpm(state.cursor(), duration_ms);
    let accuracy_pct = compute_accuracy_pct(state.correct_count(), state.keystrokes().len());

    SessionResult {
        started_at,
        duration_ms,
        total_characters: state.items().len(),
        correct_characters: state.cursor(),
        errors: state.errors().to_vec(),
        keystrokes: state.keystrokes().to_vec(),
        speed_cpm,
        accuracy_pct,
        completed: state.is_complete(),
        score: compute_score(speed_cpm, accuracy_pct),
        speed_series: speed_series(state.keystrokes()),
        rhythm_std_dev: rhythm_std_dev(state.keystrokes()),
    }
}

/// Cumulative cpm sampled at each whole second of active time in which a
/// character was completed
fn speed_series(keystrokes: &[KeystrokeRecord]) -> Vec<TimeSeriesPoint> {
    let mut points: Vec<TimeSeriesPoint> = Vec::new();
    let mut active_ms = 0;
    let mut completed = 0;

    for keystroke in keystrokes {
        active_ms += keystroke.interval_ms;
        if !(keystroke.correct && keystroke.stage == Stage::AwaitingFinal) {
            continue;
        }
        completed += 1;

        let second = (active_ms as f64 / 1000.0).ceil().max(1.0);
        let cpm = completed as f64 * 60.0 / second;
        match points.last_mut() {
            Some(last) if last.t == second => last.cpm = cpm,
            _ => points.push(TimeSeriesPoint::new(second, cpm)),
        }
    }

    points
}

/// Spread of the gaps between correct keystrokes, lower is steadier
fn rhythm_std_dev(keystrokes: &[KeystrokeRecord]) -> f64 {
    let intervals: Vec<f64> = keystrokes
        .iter()
        .filter(|k| k.correct)
        .skip(1)
        .map(|k| k.interval_ms as f64)
        .collect();
    std_dev(&intervals).unwrap_or(0.0)
}
