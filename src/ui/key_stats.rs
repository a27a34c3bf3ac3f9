use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, Wrap},
    Frame,
};
use shuangpin::{engine::KeystrokeRecord, stats::KeySummary};
use std::{cmp::Ordering, collections::HashMap};

use crate::{App, SortBy};

pub struct KeyRowData {
    pub code: String,
    pub avg_time: f64,
    pub miss_rate: f64,
    pub attempts: i64,
    /// attempts and misses in the drill just finished
    pub session_attempts: usize,
    pub session_misses: usize,
}

/// Join the stored per-code history with the last drill's keystrokes
pub fn key_rows(summary: &[KeySummary], keystrokes: &[KeystrokeRecord]) -> Vec<KeyRowData> {
    let mut session: HashMap<&str, (usize, usize)> = HashMap::new();
    for k in keystrokes {
        let entry = session.entry(k.expected_code.as_str()).or_default();
        entry.0 += 1;
        if !k.correct {
            entry.1 += 1;
        }
    }

    summary
        .iter()
        .map(|s| {
            let (session_attempts, session_misses) =
                session.get(s.code.as_str()).copied().unwrap_or_default();
            KeyRowData {
                code: s.code.clone(),
                avg_time: s.avg_time_ms,
                miss_rate: s.miss_rate,
                attempts: s.total_attempts,
                session_attempts,
                session_misses,
            }
        })
        .collect()
}

pub fn sort_rows(rows: &mut [KeyRowData], sort_by: &SortBy, ascending: bool) {
    rows.sort_by(|a, b| {
        let cmp = match sort_by {
            SortBy::Code => a.code.cmp(&b.code),
            SortBy::AvgTime => a.avg_time.partial_cmp(&b.avg_time).unwrap_or(Ordering::Equal),
            SortBy::MissRate => a.miss_rate.partial_cmp(&b.miss_rate).unwrap_or(Ordering::Equal),
            SortBy::Attempts => a.attempts.cmp(&b.attempts),
        };
        if ascending {
            cmp
        } else {
            cmp.reverse()
        }
    });
}

/// Pure presenter for a single key row
pub fn present_row(data: &KeyRowData) -> Row<'static> {
    let time_color = if data.avg_time < 300.0 {
        Color::Green
    } else if data.avg_time < 600.0 {
        Color::Yellow
    } else {
        Color::Red
    };

    let miss_color = if data.miss_rate == 0.0 {
        Color::Green
    } else if data.miss_rate < 10.0 {
        Color::Yellow
    } else {
        Color::Red
    };

    let session_display = match (data.session_attempts, data.session_misses) {
        (0, _) => "—".to_string(),
        (n, 0) => format!("+{n}"),
        (n, missed) => format!("+{n} ({missed} missed)"),
    };

    Row::new(vec![
        Cell::from(data.code.clone()).style(Style::default().add_modifier(Modifier::BOLD)),
        Cell::from(format!("{:.1}", data.avg_time)).style(Style::default().fg(time_color)),
        Cell::from(format!("{:.1}", data.miss_rate)).style(Style::default().fg(miss_color)),
        Cell::from(data.attempts.to_string()),
        Cell::from(session_display),
    ])
}

/// Render the Key Statistics screen
pub fn render_key_stats(app: &mut App, f: &mut Frame) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(2)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Min(0),    // Stats table
            Constraint::Length(4), // Instructions
        ])
        .split(area);

    let state = &mut app.key_stats_state;
    let sort_direction = if state.sort_ascending { "↑" } else { "↓" };
    let sort_by_text = match state.sort_by {
        SortBy::Code => "Code",
        SortBy::AvgTime => "Avg Time",
        SortBy::MissRate => "Miss Rate",
        SortBy::Attempts => "Attempts",
    };

    let title = Paragraph::new(format!(
        "Key Statistics - {} (Sort: {sort_by_text} {sort_direction})",
        app.resolver.scheme.name
    ))
    .block(Block::default().borders(Borders::ALL).title("Stats"))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .alignment(Alignment::Center);
    f.render_widget(title, chunks[0]);

    if app.key_summary.is_empty() {
        let no_data = Paragraph::new("No key statistics available yet. Finish a drill to collect data.")
            .alignment(Alignment::Center)
            .style(Style::default().fg(Color::Gray));
        f.render_widget(no_data, chunks[1]);
    } else {
        let keystrokes = app
            .session
            .result()
            .map(|r| r.keystrokes.as_slice())
            .unwrap_or_default();
        let mut rows = key_rows(&app.key_summary, keystrokes);
        sort_rows(&mut rows, &state.sort_by, state.sort_ascending);

        // borders + header
        let table_height = chunks[1].height.saturating_sub(3) as usize;
        let max_scroll = rows.len().saturating_sub(table_height);
        state.scroll_offset = state.scroll_offset.min(max_scroll);

        let indicator = |column: SortBy| {
            if state.sort_by == column {
                sort_direction
            } else {
                ""
            }
        };
        let header = Row::new(vec![
            Cell::from(format!("Code {}", indicator(SortBy::Code))),
            Cell::from(format!("Avg Time (ms) {}", indicator(SortBy::AvgTime))),
            Cell::from(format!("Miss Rate (%) {}", indicator(SortBy::MissRate))),
            Cell::from(format!("Attempts {}", indicator(SortBy::Attempts))),
            Cell::from("Last Drill"),
        ])
        .style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        );

        let visible_rows: Vec<Row> = rows
            .iter()
            .skip(state.scroll_offset)
            .take(table_height)
            .map(present_row)
            .collect();

        let widths = [
            Constraint::Length(8),
            Constraint::Length(18),
            Constraint::Length(18),
            Constraint::Length(12),
            Constraint::Min(10),
        ];

        let table = Table::new(visible_rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title("Codes"))
            .column_spacing(2);

        f.render_widget(table, chunks[1]);
    }

    let instructions = Paragraph::new(
        "(↑/↓) scroll  (PgUp/PgDn) page  (Home) top  (1-4) sort  (space) direction  (b/backspace) back  (n) new  (r) retry",
    )
    .alignment(Alignment::Center)
    .wrap(Wrap { trim: true });
    f.render_widget(instructions, chunks[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use shuangpin::Stage;

    fn summary(code: &str, avg: f64, miss: f64, attempts: i64) -> KeySummary {
        KeySummary {
            code: code.into(),
            avg_time_ms: avg,
            miss_rate: miss,
            total_attempts: attempts,
        }
    }

    fn keystroke(expected: &str, correct: bool) -> KeystrokeRecord {
        KeystrokeRecord {
            item_index: 0,
            stage: Stage::AwaitingInitial,
            expected_code: expected.into(),
            key: if correct { expected.into() } else { "x".into() },
            correct,
            timestamp_ms: 0,
            interval_ms: 100,
        }
    }

    #[test]
    fn test_key_rows_merge_last_drill() {
        let rows = key_rows(
            &[summary("a", 200.0, 0.0, 4), summary("b", 500.0, 25.0, 8)],
            &[keystroke("b", false), keystroke("b", true)],
        );

        assert_eq!(rows.len(), 2);
        assert_eq!((rows[0].session_attempts, rows[0].session_misses), (0, 0));
        assert_eq!((rows[1].session_attempts, rows[1].session_misses), (2, 1));
    }

    #[test]
    fn test_sort_rows() {
        let mut rows = key_rows(
            &[
                summary("a", 200.0, 10.0, 4),
                summary("b", 500.0, 0.0, 8),
                summary("c", 300.0, 30.0, 2),
            ],
            &[],
        );

        sort_rows(&mut rows, &SortBy::MissRate, false);
        let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["c", "a", "b"]);

        sort_rows(&mut rows, &SortBy::Attempts, true);
        let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["c", "a", "b"]);

        sort_rows(&mut rows, &SortBy::AvgTime, true);
        let codes: Vec<&str> = rows.iter().map(|r| r.code.as_str()).collect();
        assert_eq!(codes, vec!["a", "c", "b"]);
    }

    #[test]
    fn test_present_row_does_not_panic() {
        let rows = key_rows(&[summary(";", 900.0, 50.0, 3)], &[keystroke(";", false)]);
        let _ = present_row(&rows[0]);
    }
}
