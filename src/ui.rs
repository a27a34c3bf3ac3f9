pub mod charting;
pub mod key_stats;
pub mod screen;

use ratatui::{
    buffer::Buffer,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Widget, Wrap},
};
use shuangpin::{scheme::KeyLabel, Lifecycle, SessionState, Stage};
use unicode_width::UnicodeWidthChar;

use crate::{App, AppState};

const HORIZONTAL_MARGIN: u16 = 5;
const VERTICAL_MARGIN: u16 = 2;

/// Keyboard hint rows
const KEYBOARD_LINES: u16 = 3;

fn bold() -> Style {
    Style::default().add_modifier(Modifier::BOLD)
}

fn dim_bold() -> Style {
    bold().add_modifier(Modifier::DIM)
}

impl Widget for &App {
    fn render(self, area: Rect, buf: &mut Buffer) {
        match self.state {
            AppState::Drill => render_drill(self, area, buf),
            AppState::Results | AppState::KeyStats => render_results(self, area, buf),
        }
    }
}

fn render_drill(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(state) = app.session.state() else {
        return;
    };

    let max_width = area.width.saturating_sub(HORIZONTAL_MARGIN * 2).max(1) as usize;
    let text_width: usize = state
        .items()
        .iter()
        .map(|item| item.character.width().unwrap_or(0))
        .sum();
    let text_lines = if text_width <= max_width {
        1
    } else {
        text_width.div_ceil(max_width) as u16 + 1
    };

    let content = text_lines + 6;
    let keyboard_lines = if area.height >= content + KEYBOARD_LINES + 2 {
        KEYBOARD_LINES
    } else {
        0
    };
    let padding = area.height.saturating_sub(content + keyboard_lines + 1) / 2;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .constraints([
            Constraint::Length(padding),
            Constraint::Length(1), // live stats
            Constraint::Length(1),
            Constraint::Length(text_lines),
            Constraint::Length(1),
            Constraint::Length(1), // code hint
            Constraint::Length(1), // feedback
            Constraint::Length(1),
            Constraint::Length(keyboard_lines),
            Constraint::Min(0),
            Constraint::Length(1), // legend
        ])
        .split(area);

    if let Some(stats) = app.session.live_stats() {
        let mut line = format!(
            "{} cpm   {}% acc   {}%",
            stats.speed_cpm, stats.accuracy_pct, stats.progress_pct
        );
        if let Some(remaining) = stats.remaining_ms {
            line.push_str(&format!("   {:.1}s", remaining as f64 / 1000.0));
        }
        Paragraph::new(Span::styled(line, dim_bold()))
            .alignment(Alignment::Center)
            .render(chunks[1], buf);
    }

    if app.session.lifecycle() == Lifecycle::Paused {
        Paragraph::new(Span::styled(
            "PAUSED - press Tab to resume",
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD | Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[3], buf);
    } else {
        Paragraph::new(Line::from(text_spans(state)))
            .alignment(if text_lines == 1 {
                Alignment::Center
            } else {
                Alignment::Left
            })
            .wrap(Wrap { trim: true })
            .render(chunks[3], buf);

        Paragraph::new(Line::from(hint_spans(app, state)))
            .alignment(Alignment::Center)
            .render(chunks[5], buf);
    }

    if let Some(feedback) = &app.feedback {
        Paragraph::new(Span::styled(
            format!("expected {}, got {}", feedback.expected, feedback.actual),
            Style::default().fg(Color::Red).add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[6], buf);
    }

    if keyboard_lines > 0 {
        let expected = state.expected_code().and_then(|code| code.chars().next());
        let rows: Vec<Line> = app
            .resolver
            .scheme
            .keyboard_layout()
            .iter()
            .enumerate()
            .map(|(indent, row)| keyboard_line(row, indent, expected))
            .collect();
        Paragraph::new(rows)
            .alignment(Alignment::Center)
            .render(chunks[8], buf);
    }

    Paragraph::new(Span::styled(
        "(tab) pause / (←) retry / (→) new / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[10], buf);
}

/// Practice characters: done ones green (red if a key was missed), the
/// current one underlined, the rest dimmed
fn text_spans(state: &SessionState) -> Vec<Span<'static>> {
    let green = bold().fg(Color::Green);
    let red = bold().fg(Color::Red);
    let missed = |idx: usize| state.errors().iter().any(|e| e.item_index == idx);

    state
        .items()
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let style = match idx.cmp(&state.cursor()) {
                std::cmp::Ordering::Less if missed(idx) => red,
                std::cmp::Ordering::Less => green,
                std::cmp::Ordering::Equal => {
                    let current = dim_bold().add_modifier(Modifier::UNDERLINED);
                    match state.stage() {
                        Stage::AwaitingInitial => current,
                        Stage::AwaitingFinal => current.fg(Color::Yellow),
                    }
                }
                std::cmp::Ordering::Greater => dim_bold(),
            };
            Span::styled(item.character.to_string(), style)
        })
        .collect()
}

/// Pinyin of the current character followed by its two codes; the code
/// still expected is highlighted
fn hint_spans(app: &App, state: &SessionState) -> Vec<Span<'static>> {
    let Some(item) = state.current_item() else {
        return Vec::new();
    };
    if !item.is_reachable() {
        return vec![Span::styled(
            format!("no shuangpin code for {}", item.character),
            Style::default().fg(Color::Red),
        )];
    }

    let pinyin = app
        .resolver
        .dictionary
        .pinyin(item.character)
        .unwrap_or_default()
        .to_string();
    let expected = Style::default()
        .fg(Color::Cyan)
        .add_modifier(Modifier::BOLD | Modifier::UNDERLINED);
    let (initial_style, final_style) = match state.stage() {
        Stage::AwaitingInitial => (expected, dim_bold()),
        Stage::AwaitingFinal => (bold().fg(Color::Green), expected),
    };

    vec![
        Span::styled(format!("{pinyin}   "), Style::default().add_modifier(Modifier::ITALIC)),
        Span::styled(item.initial_code.clone(), initial_style),
        Span::raw(" "),
        Span::styled(item.final_code.clone(), final_style),
    ]
}

fn keyboard_line(row: &[KeyLabel], indent: usize, expected: Option<char>) -> Line<'static> {
    let mut spans = vec![Span::raw(" ".repeat(indent))];
    for label in row {
        let style = if Some(label.key) == expected {
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD)
        } else if label.initials.is_empty() && label.finals.is_empty() {
            Style::default().add_modifier(Modifier::DIM)
        } else {
            Style::default()
        };
        spans.push(Span::styled(format!(" {} ", label.key), style));
    }
    Line::from(spans)
}

fn render_results(app: &App, area: Rect, buf: &mut Buffer) {
    let Some(result) = app.session.result() else {
        return;
    };
    let report = app.report.as_ref();
    let achievement_lines = report.map_or(0, |r| r.new_achievements.len()) as u16;
    let recommendation_lines = report.map_or(0, |r| r.analysis.recommendations.len()) as u16;

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .horizontal_margin(HORIZONTAL_MARGIN)
        .vertical_margin(VERTICAL_MARGIN)
        .constraints([
            Constraint::Min(1),    // chart
            Constraint::Length(1), // stats
            Constraint::Length(1), // level, streak, comparison
            Constraint::Length(achievement_lines),
            Constraint::Length(recommendation_lines),
            Constraint::Length(1), // padding
            Constraint::Length(1), // legend
        ])
        .split(area);

    let points: Vec<(f64, f64)> = result.speed_series.iter().copied().map(Into::into).collect();
    let limit_secs = app.session.time_limit_ms().map(|ms| ms as f64 / 1000.0);
    let (overall_duration, highest_cpm) = charting::compute_chart_params(&points, limit_secs);

    let datasets = vec![Dataset::default()
        .marker(ratatui::symbols::Marker::Braille)
        .style(Style::default().fg(Color::Magenta))
        .graph_type(GraphType::Line)
        .data(&points)];

    Chart::new(datasets)
        .x_axis(
            Axis::default()
                .title("seconds")
                .bounds([1.0, overall_duration])
                .labels(vec![
                    Span::styled("1", bold()),
                    Span::styled(charting::format_label(overall_duration), bold()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title("cpm")
                .bounds([0.0, highest_cpm])
                .labels(vec![
                    Span::styled("0", bold()),
                    Span::styled(charting::format_label(highest_cpm), bold()),
                ]),
        )
        .render(chunks[0], buf);

    Paragraph::new(Span::styled(
        format!(
            "{} cpm   {}% acc   {} score   {:.2} sd   {}/{} chars",
            result.speed_cpm,
            result.accuracy_pct,
            result.score,
            result.rhythm_std_dev,
            result.correct_characters,
            result.total_characters
        ),
        bold(),
    ))
    .alignment(Alignment::Center)
    .render(chunks[1], buf);

    if let Some(report) = report {
        let analysis = &report.analysis;
        let standing = match report.standing {
            Some(standing) => format!(
                "level {}   streak {} days   {:+}% speed / {:+} acc vs your average",
                standing.level,
                standing.streak_days,
                analysis.speed_change_pct,
                analysis.accuracy_change
            ),
            None => "history is not being saved".to_string(),
        };
        Paragraph::new(Span::styled(
            standing,
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::ITALIC),
        ))
        .alignment(Alignment::Center)
        .render(chunks[2], buf);

        let unlocked: Vec<Line> = report
            .new_achievements
            .iter()
            .map(|a| {
                Line::from(Span::styled(
                    format!("★ {} - {} (+{})", a.title, a.description, a.points),
                    bold().fg(Color::Yellow),
                ))
            })
            .collect();
        Paragraph::new(unlocked)
            .alignment(Alignment::Center)
            .render(chunks[3], buf);

        let advice: Vec<Line> = analysis
            .recommendations
            .iter()
            .map(|r| {
                Line::from(Span::styled(
                    format!("{}: {}", r.area, r.message),
                    Style::default().fg(Color::Gray),
                ))
            })
            .collect();
        Paragraph::new(advice)
            .alignment(Alignment::Center)
            .render(chunks[4], buf);
    }

    Paragraph::new(Span::styled(
        "(r)etry / (n)ew / (s)tats / (esc)ape",
        Style::default().add_modifier(Modifier::ITALIC),
    ))
    .render(chunks[6], buf);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppState, Feedback, TextSource};
    use ratatui::{buffer::Buffer, layout::Rect};
    use shuangpin::{
        config::Config, language::Dictionary, scheme::SchemeKind, stats::StatsDb, SchemeResolver,
    };

    fn create_test_app(prompt: &str) -> App {
        App::new(
            Config::default(),
            TextSource::Prompt(prompt.to_string()),
            SchemeResolver::new(Dictionary::embedded().unwrap(), SchemeKind::Xiaohe.scheme()),
            Some(StatsDb::in_memory().unwrap()),
        )
        .unwrap()
    }

    fn rendered(app: &App, width: u16, height: u16) -> String {
        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);
        app.render(area, &mut buffer);
        buffer.content().iter().map(|c| c.symbol()).collect()
    }

    #[test]
    fn test_drill_shows_codes_and_keyboard() {
        let app = create_test_app("把中");
        let screen = rendered(&app, 80, 24);

        assert!(screen.contains("ba"));
        assert!(screen.contains("(tab) pause"));
        assert!(screen.contains(" q "));
        assert!(screen.contains("cpm"));
    }

    #[test]
    fn test_drill_shows_feedback() {
        let mut app = create_test_app("把");
        app.press("x");

        assert_eq!(
            app.feedback,
            Some(Feedback {
                expected: "b".into(),
                actual: "x".into()
            })
        );
        assert!(rendered(&app, 80, 24).contains("expected b, got x"));
    }

    #[test]
    fn test_paused_overlay() {
        let mut app = create_test_app("把");
        app.session.pause().unwrap();

        assert!(rendered(&app, 80, 24).contains("PAUSED"));
    }

    #[test]
    fn test_time_limit_shows_timer() {
        let mut app = create_test_app("把");
        app.config.practice_time_secs = Some(30);
        let chars = app.chars.clone();
        app.reset(Some(chars)).unwrap();

        let screen = rendered(&app, 80, 24);
        assert!(screen.contains("30.0s") || screen.contains("29.9s"));
    }

    #[test]
    fn test_results_screen() {
        let mut app = create_test_app("把");
        app.press("b");
        app.press("a");
        assert_eq!(app.state, AppState::Results);

        let screen = rendered(&app, 100, 30);
        assert!(screen.contains("100% acc"));
        assert!(screen.contains("1/1 chars"));
        assert!(screen.contains("(r)etry"));
        assert!(screen.contains("level 1"));
    }

    #[test]
    fn test_results_without_history() {
        let mut app = App::new(
            Config::default(),
            TextSource::Prompt("把".into()),
            SchemeResolver::new(Dictionary::embedded().unwrap(), SchemeKind::Xiaohe.scheme()),
            None,
        )
        .unwrap();
        app.press("b");
        app.press("a");

        let screen = rendered(&app, 100, 30);
        assert!(screen.contains("history is not being saved"));
        assert!(!screen.contains("level"));
    }

    #[test]
    fn test_small_area() {
        let app = create_test_app("把中国人民");
        let area = Rect::new(0, 0, 20, 5);
        let mut buffer = Buffer::empty(area);

        app.render(area, &mut buffer);

        assert!(*buffer.area() == area);
    }

    #[test]
    fn test_keyboard_line_highlights_expected_key() {
        let layout = SchemeKind::Xiaohe.scheme().keyboard_layout();
        let line = keyboard_line(&layout[1], 1, Some('a'));

        let highlighted: Vec<&Span> = line
            .spans
            .iter()
            .filter(|s| s.style.bg == Some(Color::Cyan))
            .collect();
        assert_eq!(highlighted.len(), 1);
        assert_eq!(highlighted[0].content, " a ");
    }

    #[test]
    fn test_ui_constants() {
        assert_eq!(HORIZONTAL_MARGIN, 5);
        assert_eq!(VERTICAL_MARGIN, 2);
    }
}
