mod ui;

use chrono::Local;
use clap::{error::ErrorKind, CommandFactory, Parser};
use crossterm::{
    event::{KeyCode, KeyEvent, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
    tty::IsTty,
};
use log::{info, warn, LevelFilter};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Frame, Terminal,
};
use shuangpin::{
    achievements::{self, Achievement, ProgressSnapshot},
    analytics::{self, analyze_performance, summarize, Goals, PerformanceAnalysis, Summary},
    config::{Config, ConfigStore, FileConfigStore, Selection},
    language::Dictionary,
    export::{self, ExportFormat},
    lessons::{LessonCatalog, LessonKind},
    prepare_items,
    review::{self, character_outcomes, review_items},
    runtime::{key_token, CrosstermEventSource, DrillEvent, FixedTicker, Runner},
    scheme::{Scheme, SchemeKind},
    stats::{KeySummary, StatsDb},
    text_generator::{TextGenConfig, TextGenerator, TextSources},
    DrillItem, KeystrokeResult, Lifecycle, SchemeResolver, Session, SessionResult, TICK_RATE_MS,
};
use std::{
    collections::{HashMap, HashSet},
    error::Error,
    io::{self, stdin},
    path::PathBuf,
    time::Duration,
};

/// shuangpin typing tutor with live stats, history and achievements
#[derive(Parser, Debug, Clone)]
#[clap(
    version,
    about,
    long_about = "A terminal tutor for shuangpin (dual-pinyin) input. Every character is typed as two keys: its initial code, then its final code. Practice adapts to the codes you miss most."
)]
pub struct Cli {
    /// number of characters to practice
    #[clap(short = 'n', long, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    number_of_chars: Option<usize>,

    /// number of seconds to run the drill
    #[clap(short = 's', long, value_parser = clap::value_parser!(u64).range(1..))]
    number_of_secs: Option<u64>,

    /// custom practice text
    #[clap(short = 'p', long)]
    prompt: Option<String>,

    /// lesson to practice (see --list-lessons)
    #[clap(short = 'l', long)]
    lesson: Option<u32>,

    /// shuangpin scheme to drill
    #[clap(long, value_enum)]
    scheme: Option<SchemeKind>,

    /// draw characters at random instead of targeting your weakest codes
    #[clap(long)]
    random: bool,

    /// drill the characters you have been getting wrong lately
    #[clap(long, conflicts_with = "prompt")]
    review: bool,

    /// print the lesson catalog and exit
    #[clap(long)]
    list_lessons: bool,

    /// print the built-in schemes and exit
    #[clap(long)]
    list_schemes: bool,

    /// print practice history and exit
    #[clap(long)]
    history: bool,

    /// write practice history to a file and exit
    #[clap(long, value_name = "PATH")]
    export: Option<PathBuf>,

    /// file format for --export
    #[clap(long, value_enum, default_value_t = ExportFormat::Json, requires = "export")]
    format: ExportFormat,

    /// merge a JSON export into the practice history and exit
    #[clap(long, value_name = "PATH")]
    import: Option<PathBuf>,

    /// delete all practice history, statistics and achievements, then exit
    #[clap(long)]
    clear_history: bool,

    /// log to stderr; only for commands that print and exit
    #[clap(long)]
    verbose: bool,
}

impl Cli {
    /// Fold command line overrides into the stored configuration
    fn apply(&self, config: &mut Config) {
        if let Some(n) = self.number_of_chars {
            config.number_of_chars = n;
        }
        if self.number_of_secs.is_some() {
            config.practice_time_secs = self.number_of_secs;
        }
        if self.lesson.is_some() {
            config.lesson = self.lesson;
        }
        if let Some(kind) = self.scheme {
            config.scheme = kind.to_string();
            config.custom_scheme_path = None;
        }
        if self.random {
            config.selection = Selection::Random;
        }
    }

    /// Commands that print and exit instead of opening the drill screen
    fn prints_and_exits(&self) -> bool {
        self.list_lessons
            || self.list_schemes
            || self.history
            || self.export.is_some()
            || self.import.is_some()
            || self.clear_history
    }

    /// stderr output would draw over the drill screen, so it stays off there
    fn log_level(&self) -> LevelFilter {
        if self.verbose && self.prints_and_exits() {
            LevelFilter::Trace
        } else {
            LevelFilter::Off
        }
    }

    fn text_source(&self) -> TextSource {
        match (&self.prompt, self.review) {
            (Some(prompt), _) => TextSource::Prompt(prompt.clone()),
            (None, true) => TextSource::Review,
            (None, false) => TextSource::Generated,
        }
    }
}

/// Where the characters of the next drill come from
#[derive(Debug, Clone, PartialEq)]
pub enum TextSource {
    /// lesson or dictionary draw, per the config
    Generated,
    Prompt(String),
    Review,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AppState {
    Drill,
    Results,
    KeyStats,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortBy {
    Code,
    AvgTime,
    MissRate,
    Attempts,
}

#[derive(Debug)]
pub struct KeyStatsState {
    pub scroll_offset: usize,
    pub sort_by: SortBy,
    pub sort_ascending: bool,
}

impl Default for KeyStatsState {
    fn default() -> Self {
        Self {
            scroll_offset: 0,
            sort_by: SortBy::Code,
            sort_ascending: true,
        }
    }
}

/// Mismatch shown under the practice text until the next correct key
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    pub expected: String,
    pub actual: String,
}

/// Lifetime progress; only known when history is saved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Standing {
    pub level: u32,
    pub streak_days: u64,
}

/// What the results screen shows beyond the raw session result
#[derive(Debug, Clone)]
pub struct Report {
    pub analysis: PerformanceAnalysis,
    pub new_achievements: Vec<&'static Achievement>,
    pub standing: Option<Standing>,
}

pub struct App {
    pub config: Config,
    pub source: TextSource,
    pub resolver: SchemeResolver,
    pub lessons: LessonCatalog,
    pub db: Option<StatsDb>,
    pub session: Session,
    pub chars: Vec<char>,
    pub feedback: Option<Feedback>,
    pub report: Option<Report>,
    pub key_summary: Vec<KeySummary>,
    pub state: AppState,
    pub key_stats_state: KeyStatsState,
}

impl App {
    pub fn new(
        config: Config,
        source: TextSource,
        resolver: SchemeResolver,
        db: Option<StatsDb>,
    ) -> shuangpin::Result<Self> {
        let mut app = Self {
            config,
            source,
            resolver,
            lessons: LessonCatalog::embedded()?,
            db,
            session: Session::new(),
            chars: Vec::new(),
            feedback: None,
            report: None,
            key_summary: Vec::new(),
            state: AppState::Drill,
            key_stats_state: KeyStatsState::default(),
        };
        app.reset(None)?;
        Ok(app)
    }

    /// Start a fresh drill, either over `chars` again or over newly generated text
    pub fn reset(&mut self, chars: Option<Vec<char>>) -> shuangpin::Result<()> {
        let chars = match chars {
            Some(chars) => chars,
            None => self.generate()?,
        };

        let mut session = Session::new().with_time_limit(self.config.practice_time_ms());
        session.start(prepare_items(&chars, &self.resolver))?;

        self.session = session;
        self.chars = chars;
        self.feedback = None;
        self.report = None;
        self.state = AppState::Drill;
        self.key_stats_state = KeyStatsState::default();
        Ok(())
    }

    fn generate(&self) -> shuangpin::Result<Vec<char>> {
        let key_stats = match &self.db {
            Some(db) => db.key_difficulties().unwrap_or_else(|e| {
                warn!("could not load key statistics: {e}");
                HashMap::new()
            }),
            None => HashMap::new(),
        };

        let review_chars = match self.source {
            TextSource::Review => self.review_plan().characters,
            _ => Vec::new(),
        };

        let generator = TextGenerator::new(TextGenConfig {
            number_of_chars: self.config.number_of_chars,
            custom_prompt: match &self.source {
                TextSource::Prompt(prompt) => Some(prompt.clone()),
                _ => None,
            },
            lesson: self.config.lesson,
            selection: self.config.selection,
            review: self.source == TextSource::Review,
        });
        generator.generate(&TextSources {
            dictionary: &self.resolver.dictionary,
            lessons: &self.lessons,
            resolver: &self.resolver,
            key_stats: &key_stats,
            review_chars: &review_chars,
        })
    }

    /// Characters due for review right now; empty without history
    pub fn review_plan(&self) -> review::ReviewPlan {
        let records = match &self.db {
            Some(db) => db.review_records().unwrap_or_else(|e| {
                warn!("could not load review records: {e}");
                Vec::new()
            }),
            None => Vec::new(),
        };
        review::generate_plan(
            review_items(&records, Local::now()),
            &self.lessons,
            &self.resolver.dictionary,
        )
    }

    /// Lesson credited for the running drill; custom text and reviews never count
    fn lesson(&self) -> Option<u32> {
        match self.source {
            TextSource::Generated => self.config.lesson,
            TextSource::Prompt(_) | TextSource::Review => None,
        }
    }

    /// Leave a custom prompt behind; reviews and generated text carry on
    pub fn next_text(&mut self) -> shuangpin::Result<()> {
        if let TextSource::Prompt(_) = self.source {
            self.source = TextSource::Generated;
        }
        self.reset(None)
    }

    pub fn press(&mut self, key: &str) {
        if let KeystrokeResult::Processed(outcome) = self.session.press(key) {
            self.feedback = (!outcome.matched).then(|| Feedback {
                expected: outcome.expected_code,
                actual: outcome.actual_key,
            });
        }
        if self.session.lifecycle() == Lifecycle::Stopped {
            self.on_finished();
        }
    }

    pub fn on_tick(&mut self) {
        if self.session.lifecycle() == Lifecycle::Active && self.session.time_limit_reached() {
            if let Err(e) = self.session.stop() {
                warn!("could not stop session: {e}");
            }
            self.on_finished();
        }
    }

    /// Save the finished drill and prepare the results screen
    fn on_finished(&mut self) {
        let Some(result) = self.session.result().cloned() else {
            return;
        };
        let goals = Goals {
            target_speed: self.config.target_speed,
            target_accuracy: self.config.target_accuracy,
        };
        let drill = DrillInfo {
            scheme: self.resolver.scheme.key.clone(),
            lesson: self.lesson(),
            reviewing: self.source == TextSource::Review,
        };
        let items: Vec<DrillItem> = self
            .session
            .state()
            .map(|state| state.items().to_vec())
            .unwrap_or_default();

        let report = match self.db.as_mut() {
            Some(db) => match persist(db, &result, &items, &drill, &goals) {
                Ok(report) => Some(report),
                Err(e) => {
                    warn!("could not save session: {e}");
                    None
                }
            },
            None => None,
        };
        self.report = Some(report.unwrap_or_else(|| Report {
            analysis: analyze_performance(&result, &Summary::default(), &goals),
            new_achievements: Vec::new(),
            standing: None,
        }));

        if let Some(db) = &self.db {
            match db.key_summary() {
                Ok(summary) => self.key_summary = summary,
                Err(e) => warn!("could not load key statistics: {e}"),
            }
        }
        self.feedback = None;
        self.state = AppState::Results;
    }
}

/// How a finished drill is filed in the history
#[derive(Debug, Clone, PartialEq)]
struct DrillInfo {
    scheme: String,
    lesson: Option<u32>,
    reviewing: bool,
}

/// Record `result`, then evaluate it against history and unlock achievements
fn persist(
    db: &mut StatsDb,
    result: &SessionResult,
    items: &[DrillItem],
    drill: &DrillInfo,
    goals: &Goals,
) -> shuangpin::Result<Report> {
    let previous = db.all_sessions()?;
    let analysis = analyze_performance(result, &summarize(&previous), goals);

    let session_id = db.record_session(result, &drill.scheme, drill.lesson)?;
    db.update_review_records(
        &character_outcomes(items, result),
        drill.reviewing,
        Local::now(),
    )?;
    if drill.reviewing && result.completed {
        db.record_review_session(session_id)?;
    }

    let history = db.all_sessions()?;
    let snapshot = ProgressSnapshot::from_history(&history, Local::now().date_naive())
        .with_reviews(db.review_session_count()?);
    let unlocked: HashSet<String> = db
        .unlocked_achievements()?
        .into_iter()
        .map(|a| a.id)
        .collect();

    let now = Local::now();
    let mut new_achievements = Vec::new();
    for achievement in achievements::newly_unlocked(&snapshot, &unlocked) {
        if db.unlock_achievement(achievement.id, now)? {
            info!("achievement unlocked: {}", achievement.id);
            new_achievements.push(achievement);
        }
    }

    Ok(Report {
        analysis,
        new_achievements,
        standing: Some(Standing {
            level: analytics::user_level(summarize(&history).total_duration_ms),
            streak_days: snapshot.streak_days,
        }),
    })
}

fn load_scheme(config: &Config) -> shuangpin::Result<Scheme> {
    match &config.custom_scheme_path {
        Some(path) => Scheme::from_json(path),
        None => Scheme::by_key(&config.scheme),
    }
}

fn open_db() -> Option<StatsDb> {
    match StatsDb::new() {
        Ok(db) => Some(db),
        Err(e) => {
            warn!("statistics disabled: {e}");
            None
        }
    }
}

fn print_lessons(catalog: &LessonCatalog) {
    for kind in [LessonKind::Initial, LessonKind::Final, LessonKind::Phrase] {
        println!("{kind}:");
        for lesson in catalog.by_kind(kind) {
            println!("  {:>3}  {}  {}", lesson.id, lesson.title, lesson.description);
        }
    }
}

fn print_schemes() {
    for kind in SchemeKind::ALL {
        let scheme = kind.scheme();
        let usage = scheme.key_usage();
        println!("{:<14} {}  {}", scheme.key, scheme.name, scheme.description);
        println!(
            "{:<14} shared final keys: {}  unused keys: {}",
            "",
            usage.shared_final_keys.join(" "),
            usage.unused_keys.join(" ")
        );
    }
}

fn print_history(
    db: &StatsDb,
    catalog: &LessonCatalog,
    dictionary: &Dictionary,
) -> shuangpin::Result<()> {
    let history = db.all_sessions()?;
    let today = Local::now().date_naive();
    let overall = summarize(&history);
    let today_summary = analytics::today_summary(&history, today);
    let trend = analytics::speed_trend(&history, 5);
    let unlocked = db.unlocked_achievements()?;

    println!(
        "level {}  streak {} days  {} sessions  {:.0} minutes",
        analytics::user_level(overall.total_duration_ms),
        analytics::learning_streak(&history, today),
        overall.sessions,
        overall.practice_minutes()
    );
    println!(
        "average {} cpm / {}%   best {} cpm / {}%",
        overall.avg_speed_cpm,
        overall.avg_accuracy_pct,
        overall.best_speed_cpm,
        overall.best_accuracy_pct
    );
    println!(
        "today {:.0} minutes ({}% of the {} minute goal)",
        today_summary.practice_minutes(),
        analytics::daily_progress_pct(&today_summary, analytics::DAILY_GOAL_MINUTES),
        analytics::DAILY_GOAL_MINUTES
    );
    println!(
        "speed {} ({} cpm vs {} cpm, {:+}%)",
        trend.trend, trend.current_avg_cpm, trend.previous_avg_cpm, trend.change_pct
    );

    println!();
    for day in analytics::daily_stats(&history, today, 7) {
        println!(
            "{}  {:>3} min  {:>3} cpm  {:>3}%",
            day.date, day.minutes, day.avg_speed_cpm, day.avg_accuracy_pct
        );
    }

    println!();
    println!(
        "achievements: {} unlocked, {} points",
        unlocked.len(),
        achievements::total_points(unlocked.iter().map(|a| a.id.as_str()))
    );
    for entry in &unlocked {
        if let Some(a) = achievements::by_id(&entry.id) {
            println!(
                "  {}  {} ({})",
                entry.unlocked_at.format("%Y-%m-%d"),
                a.title,
                a.description
            );
        }
    }

    let plan = review::generate_plan(
        review_items(&db.review_records()?, Local::now()),
        catalog,
        dictionary,
    );
    println!();
    if plan.is_empty() {
        println!("nothing to review");
    } else {
        println!(
            "review: {} characters due (practice them with --review)",
            plan.characters.len()
        );
        for focus in &plan.focus {
            println!("  {focus}");
        }
        if !plan.related_lessons.is_empty() {
            let ids: Vec<String> = plan.related_lessons.iter().map(u32::to_string).collect();
            println!("  lessons: {}", ids.join(" "));
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    if cli.verbose {
        colog::init();
    }
    log::set_max_level(cli.log_level());

    if cli.list_schemes {
        print_schemes();
        return Ok(());
    }
    if cli.list_lessons {
        print_lessons(&LessonCatalog::embedded()?);
        return Ok(());
    }
    if cli.history {
        let db = StatsDb::new()?;
        print_history(&db, &LessonCatalog::embedded()?, &Dictionary::embedded()?)?;
        return Ok(());
    }
    if let Some(path) = &cli.export {
        for written in export::export(&StatsDb::new()?, path, cli.format)? {
            println!("wrote {}", written.display());
        }
        return Ok(());
    }
    if let Some(path) = &cli.import {
        let summary = export::import(&mut StatsDb::new()?, path)?;
        println!(
            "imported {} sessions and {} achievements from {}",
            summary.sessions,
            summary.achievements,
            path.display()
        );
        return Ok(());
    }
    if cli.clear_history {
        let db = StatsDb::new()?;
        let sessions = db.all_sessions()?.len();
        db.clear_all()?;
        println!("removed {sessions} sessions, key statistics, reviews and achievements");
        return Ok(());
    }

    if !stdin().is_tty() {
        let mut cmd = Cli::command();
        cmd.error(ErrorKind::Io, "stdin must be a tty").exit();
    }

    let store = FileConfigStore::new();
    let mut config = store.load();
    cli.apply(&mut config);
    if let Err(e) = store.save(&config) {
        warn!("could not save config to {}: {e}", store.path().display());
    }

    let resolver = SchemeResolver::new(Dictionary::embedded()?, load_scheme(&config)?);

    let mut app = App::new(config, cli.text_source(), resolver, open_db())?;
    if app.source == TextSource::Review && app.review_plan().is_empty() {
        return Err("nothing to review yet; finish a few drills first".into());
    }

    enable_raw_mode()?;

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let outcome = start_tui(&mut terminal, &mut app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen,)?;
    terminal.show_cursor()?;

    outcome
}

#[derive(Debug, PartialEq)]
enum ExitType {
    Restart,
    New,
    Quit,
}

fn start_tui<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> Result<(), Box<dyn Error>> {
    let runner = Runner::new(
        CrosstermEventSource::new(),
        FixedTicker::new(Duration::from_millis(TICK_RATE_MS)),
    );

    loop {
        terminal.draw(|f| ui(app, f))?;

        let exit_type = loop {
            match runner.step() {
                DrillEvent::Tick => {
                    if app.session.lifecycle() == Lifecycle::Active {
                        app.on_tick();
                        terminal.draw(|f| ui(app, f))?;
                    }
                }
                DrillEvent::Resize => {
                    terminal.draw(|f| ui(app, f))?;
                }
                DrillEvent::Key(key) => {
                    if let Some(exit_type) = handle_key(app, key) {
                        break exit_type;
                    }
                    terminal.draw(|f| ui(app, f))?;
                }
            }
        };

        match exit_type {
            ExitType::Restart => {
                let chars = app.chars.clone();
                app.reset(Some(chars))?;
            }
            ExitType::New => app.next_text()?,
            ExitType::Quit => break,
        }
    }

    Ok(())
}

/// Apply one key press; returns how to leave the current drill, if at all
fn handle_key(app: &mut App, key: KeyEvent) -> Option<ExitType> {
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(ExitType::Quit);
    }

    match key.code {
        KeyCode::Esc => return Some(ExitType::Quit),
        KeyCode::Left => return Some(ExitType::Restart),
        KeyCode::Right => return Some(ExitType::New),
        _ => {}
    }

    match app.state {
        AppState::Drill => match key.code {
            KeyCode::Tab => {
                if let Err(e) = app.session.toggle_pause() {
                    warn!("{e}");
                }
            }
            _ => {
                if let Some(token) = key_token(&key) {
                    app.press(&token);
                }
            }
        },
        AppState::Results => match key.code {
            KeyCode::Char('r') => return Some(ExitType::Restart),
            KeyCode::Char('n') => return Some(ExitType::New),
            KeyCode::Char('s') => app.state = AppState::KeyStats,
            _ => {}
        },
        AppState::KeyStats => {
            let stats = &mut app.key_stats_state;
            match key.code {
                KeyCode::Char('r') => return Some(ExitType::Restart),
                KeyCode::Char('n') => return Some(ExitType::New),
                KeyCode::Char('b') | KeyCode::Backspace => app.state = AppState::Results,
                KeyCode::Up => stats.scroll_offset = stats.scroll_offset.saturating_sub(1),
                // clamped against the table height while rendering
                KeyCode::Down => stats.scroll_offset += 1,
                KeyCode::PageUp => stats.scroll_offset = stats.scroll_offset.saturating_sub(10),
                KeyCode::PageDown => stats.scroll_offset += 10,
                KeyCode::Home => stats.scroll_offset = 0,
                KeyCode::Char(c @ '1'..='4') => {
                    stats.sort_by = match c {
                        '1' => SortBy::Code,
                        '2' => SortBy::AvgTime,
                        '3' => SortBy::MissRate,
                        _ => SortBy::Attempts,
                    };
                    stats.scroll_offset = 0;
                }
                KeyCode::Char(' ') => {
                    stats.sort_ascending = !stats.sort_ascending;
                    stats.scroll_offset = 0;
                }
                _ => {}
            }
        }
    }
    None
}

fn ui(app: &mut App, f: &mut Frame) {
    let screen = crate::ui::screen::current_screen(&app.state);
    screen.render(app, f);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use shuangpin::Stage;

    fn resolver() -> SchemeResolver {
        SchemeResolver::new(Dictionary::embedded().unwrap(), SchemeKind::Xiaohe.scheme())
    }

    fn app_with_prompt(prompt: &str) -> App {
        App::new(
            Config::default(),
            TextSource::Prompt(prompt.to_string()),
            resolver(),
            Some(StatsDb::in_memory().unwrap()),
        )
        .unwrap()
    }

    fn press(app: &mut App, code: KeyCode) -> Option<ExitType> {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE))
    }

    #[test]
    fn test_cli_default_values() {
        let cli = Cli::parse_from(["shuangpin"]);

        assert_eq!(cli.number_of_chars, None);
        assert_eq!(cli.number_of_secs, None);
        assert_eq!(cli.prompt, None);
        assert_eq!(cli.lesson, None);
        assert_eq!(cli.scheme, None);
        assert!(!cli.random);
        assert!(!cli.verbose);
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::parse_from([
            "shuangpin",
            "-n",
            "40",
            "-s",
            "60",
            "-l",
            "3",
            "--scheme",
            "zhineng-abc",
            "--random",
        ]);

        assert_eq!(cli.number_of_chars, Some(40));
        assert_eq!(cli.number_of_secs, Some(60));
        assert_eq!(cli.lesson, Some(3));
        assert_eq!(cli.scheme, Some(SchemeKind::ZhinengAbc));
        assert!(cli.random);

        let cli = Cli::parse_from(["shuangpin", "--prompt", "你好"]);
        assert_eq!(cli.prompt, Some("你好".to_string()));
    }

    #[test]
    fn test_cli_overrides_config() {
        let mut config = Config {
            custom_scheme_path: Some("my_scheme.json".into()),
            ..Config::default()
        };
        let cli = Cli::parse_from(["shuangpin", "-n", "8", "--scheme", "microsoft", "--random"]);

        cli.apply(&mut config);

        assert_eq!(config.number_of_chars, 8);
        assert_eq!(config.scheme, "microsoft");
        assert_eq!(config.custom_scheme_path, None);
        assert_eq!(config.selection, Selection::Random);
        assert_eq!(config.practice_time_secs, None);
    }

    #[test]
    fn test_cli_without_flags_keeps_config() {
        let mut config = Config {
            number_of_chars: 33,
            lesson: Some(2),
            ..Config::default()
        };
        Cli::parse_from(["shuangpin"]).apply(&mut config);

        assert_eq!(config.number_of_chars, 33);
        assert_eq!(config.lesson, Some(2));
        assert_eq!(config.selection, Selection::Adaptive);
    }

    #[test]
    fn test_load_scheme() {
        let config = Config {
            scheme: "sogou".into(),
            ..Config::default()
        };
        assert_eq!(load_scheme(&config).unwrap().key, "sogou");

        let config = Config {
            scheme: "qwerty".into(),
            ..Config::default()
        };
        assert!(load_scheme(&config).is_err());
    }

    #[test]
    fn test_app_new_starts_drill() {
        let app = app_with_prompt("把中");

        assert_eq!(app.chars, vec!['把', '中']);
        assert_eq!(app.state, AppState::Drill);
        assert_eq!(app.session.lifecycle(), Lifecycle::Active);
        assert_eq!(app.session.state().unwrap().items().len(), 2);
    }

    #[test]
    fn test_mismatch_sets_feedback() {
        let mut app = app_with_prompt("把");

        press(&mut app, KeyCode::Char('x'));
        assert_eq!(
            app.feedback,
            Some(Feedback {
                expected: "b".into(),
                actual: "x".into(),
            })
        );

        press(&mut app, KeyCode::Char('b'));
        assert_eq!(app.feedback, None);
        assert_eq!(app.session.state().unwrap().stage(), Stage::AwaitingFinal);
    }

    #[test]
    fn test_completing_drill_shows_results() {
        let mut app = app_with_prompt("把中");

        for c in ['b', 'a', 'v', 's'] {
            assert_eq!(press(&mut app, KeyCode::Char(c)), None);
        }

        assert_eq!(app.session.lifecycle(), Lifecycle::Stopped);
        assert_eq!(app.state, AppState::Results);
        let report = app.report.as_ref().unwrap();
        assert!(report
            .new_achievements
            .iter()
            .any(|a| a.id == "sessions_1"));
        assert!(!app.key_summary.is_empty());
        assert_eq!(app.db.as_ref().unwrap().all_sessions().unwrap().len(), 1);
    }

    #[test]
    fn test_tab_pauses_and_ignores_typing() {
        let mut app = app_with_prompt("把");

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.session.lifecycle(), Lifecycle::Paused);

        press(&mut app, KeyCode::Char('b'));
        assert_eq!(app.session.state().unwrap().keystrokes().len(), 0);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.session.lifecycle(), Lifecycle::Active);
    }

    #[test]
    fn test_navigation_keys() {
        let mut app = app_with_prompt("把");

        assert_eq!(press(&mut app, KeyCode::Left), Some(ExitType::Restart));
        assert_eq!(press(&mut app, KeyCode::Right), Some(ExitType::New));
        assert_eq!(press(&mut app, KeyCode::Esc), Some(ExitType::Quit));
        assert_eq!(
            handle_key(
                &mut app,
                KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)
            ),
            Some(ExitType::Quit)
        );
    }

    #[test]
    fn test_results_and_key_stats_keys() {
        let mut app = app_with_prompt("把");
        press(&mut app, KeyCode::Char('b'));
        press(&mut app, KeyCode::Char('a'));
        assert_eq!(app.state, AppState::Results);

        press(&mut app, KeyCode::Char('s'));
        assert_eq!(app.state, AppState::KeyStats);

        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.key_stats_state.sort_by, SortBy::MissRate);
        press(&mut app, KeyCode::Char(' '));
        assert!(!app.key_stats_state.sort_ascending);
        press(&mut app, KeyCode::Down);
        press(&mut app, KeyCode::Up);
        press(&mut app, KeyCode::Up);
        assert_eq!(app.key_stats_state.scroll_offset, 0);

        press(&mut app, KeyCode::Char('b'));
        assert_eq!(app.state, AppState::Results);
        assert_eq!(press(&mut app, KeyCode::Char('r')), Some(ExitType::Restart));
    }

    #[test]
    fn test_reset_reuses_characters() {
        let mut app = app_with_prompt("把中");
        press(&mut app, KeyCode::Char('b'));

        let chars = app.chars.clone();
        app.reset(Some(chars)).unwrap();

        assert_eq!(app.chars, vec!['把', '中']);
        assert_eq!(app.state, AppState::Drill);
        assert_eq!(app.session.state().unwrap().keystrokes().len(), 0);
        assert!(app.report.is_none());
    }

    #[test]
    fn test_new_text_drops_prompt() {
        let mut app = app_with_prompt("把中");
        app.next_text().unwrap();

        assert_eq!(app.source, TextSource::Generated);
        assert_eq!(app.chars.len(), Config::default().number_of_chars);
    }

    #[test]
    fn test_time_limit_stops_on_tick() {
        let mut app = app_with_prompt("把中");
        app.config.practice_time_secs = Some(0);
        let chars = app.chars.clone();
        app.reset(Some(chars)).unwrap();

        app.on_tick();

        assert_eq!(app.session.lifecycle(), Lifecycle::Stopped);
        assert_eq!(app.state, AppState::Results);
        assert!(!app.session.result().unwrap().completed);
    }

    #[test]
    fn test_persist_analyses_against_previous_sessions() {
        let mut db = StatsDb::in_memory().unwrap();
        let mut app = app_with_prompt("把");
        press(&mut app, KeyCode::Char('b'));
        press(&mut app, KeyCode::Char('a'));
        let result = app.session.result().cloned().unwrap();

        let items = app.session.state().unwrap().items().to_vec();
        let drill = DrillInfo {
            scheme: "xiaohe".into(),
            lesson: Some(1),
            reviewing: false,
        };

        let first = persist(&mut db, &result, &items, &drill, &Goals::default()).unwrap();
        let second = persist(&mut db, &result, &items, &drill, &Goals::default()).unwrap();

        assert!(!first.new_achievements.is_empty());
        assert!(second.new_achievements.iter().all(|a| a.id != "sessions_1"));
        assert_eq!(second.analysis.speed_change_pct, 0);
        assert_eq!(second.standing.unwrap().streak_days, 1);
    }

    #[test]
    fn test_cli_rejects_zero_counts() {
        assert!(Cli::try_parse_from(["shuangpin", "-n", "0"]).is_err());
        assert!(Cli::try_parse_from(["shuangpin", "-s", "0"]).is_err());
        assert_eq!(
            Cli::parse_from(["shuangpin", "-n", "1"]).number_of_chars,
            Some(1)
        );
    }

    #[test]
    fn test_cli_export_and_review_flags() {
        let cli = Cli::parse_from(["shuangpin", "--export", "out.csv", "--format", "csv"]);
        assert_eq!(cli.export, Some(PathBuf::from("out.csv")));
        assert_eq!(cli.format, ExportFormat::Csv);
        assert!(cli.prints_and_exits());

        let cli = Cli::parse_from(["shuangpin", "--export", "out.json"]);
        assert_eq!(cli.format, ExportFormat::Json);

        assert!(Cli::try_parse_from(["shuangpin", "--format", "csv"]).is_err());
        assert!(Cli::try_parse_from(["shuangpin", "--review", "-p", "把"]).is_err());

        assert_eq!(Cli::parse_from(["shuangpin", "--review"]).text_source(), TextSource::Review);
        assert_eq!(
            Cli::parse_from(["shuangpin", "-p", "把"]).text_source(),
            TextSource::Prompt("把".into())
        );
        assert_eq!(Cli::parse_from(["shuangpin"]).text_source(), TextSource::Generated);
        assert!(Cli::parse_from(["shuangpin", "--clear-history"]).prints_and_exits());
        assert!(!Cli::parse_from(["shuangpin", "--review"]).prints_and_exits());
    }

    #[test]
    fn test_logging_stays_off_on_the_drill_screen() {
        assert_eq!(Cli::parse_from(["shuangpin"]).log_level(), LevelFilter::Off);
        assert_eq!(
            Cli::parse_from(["shuangpin", "--verbose"]).log_level(),
            LevelFilter::Off
        );
        assert_eq!(
            Cli::parse_from(["shuangpin", "--history"]).log_level(),
            LevelFilter::Off
        );
        assert_eq!(
            Cli::parse_from(["shuangpin", "--verbose", "--history"]).log_level(),
            LevelFilter::Trace
        );
    }

    #[test]
    fn test_results_without_history_have_no_standing() {
        let mut app = App::new(
            Config::default(),
            TextSource::Prompt("把".into()),
            resolver(),
            None,
        )
        .unwrap();
        press(&mut app, KeyCode::Char('b'));
        press(&mut app, KeyCode::Char('a'));

        let report = app.report.as_ref().unwrap();
        assert_eq!(report.standing, None);
        assert!(report.new_achievements.is_empty());
    }

    #[test]
    fn test_review_drill_targets_missed_characters() {
        let mut app = app_with_prompt("把");
        assert!(app.review_plan().is_empty());
        for c in ['x', 'b', 'a'] {
            press(&mut app, KeyCode::Char(c));
        }
        assert_eq!(app.review_plan().characters, vec!['把']);

        app.source = TextSource::Review;
        app.config.number_of_chars = 2;
        app.reset(None).unwrap();
        assert_eq!(app.chars, vec!['把', '把']);
        assert_eq!(app.lesson(), None);
        for c in ['b', 'a', 'b', 'a'] {
            press(&mut app, KeyCode::Char(c));
        }
        assert_eq!(app.state, AppState::Results);

        let db = app.db.as_ref().unwrap();
        assert_eq!(db.review_session_count().unwrap(), 1);
        let records = db.review_records().unwrap();
        assert_eq!(records[0].error_count, 1);
        assert_eq!(records[0].review_count, 1);

        // reviews carry on when asking for new text
        app.next_text().unwrap();
        assert_eq!(app.source, TextSource::Review);
    }
}
