use ratatui::Frame;

use crate::{ui::key_stats::render_key_stats, App, AppState};

/// A UI Screen boundary: responsible for rendering one app state
pub trait Screen {
    fn render(&self, app: &mut App, f: &mut Frame);
}

/// Practice text, code hint and keyboard
pub struct DrillScreen;

impl Screen for DrillScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Speed chart, achievements and recommendations
pub struct ResultsScreen;

impl Screen for ResultsScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        f.render_widget(&*app, f.area());
    }
}

/// Per-code history table
pub struct KeyStatsScreen;

impl Screen for KeyStatsScreen {
    fn render(&self, app: &mut App, f: &mut Frame) {
        render_key_stats(app, f);
    }
}

pub fn current_screen(state: &AppState) -> Box<dyn Screen> {
    match state {
        AppState::Drill => Box::new(DrillScreen),
        AppState::Results => Box::new(ResultsScreen),
        AppState::KeyStats => Box::new(KeyStatsScreen),
    }
}
