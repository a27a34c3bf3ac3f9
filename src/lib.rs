// Library surface: the drill engine plus everything the TUI and the
// headless integration tests share. Terminal rendering stays in main.rs/ui.
pub mod achievements;
pub mod analytics;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod drill;
pub mod engine;
pub mod error;
pub mod export;
pub mod language;
pub mod lessons;
pub mod metrics;
pub mod resolver;
pub mod review;
pub mod runtime;
pub mod scheme;
pub mod session;
pub mod stats;
pub mod text_generator;
pub mod time_series;
pub mod util;

pub use drill::{prepare_items, DrillItem};
pub use engine::{IgnoreReason, KeystrokeOutcome, KeystrokeResult, SessionState, Stage};
pub use error::{DrillError, Result};
pub use metrics::{compute_accuracy_pct, compute_live_stats, compute_speed_cpm, LiveStats, SessionResult};
pub use resolver::{CodePair, PhoneticResolver, SchemeResolver};
pub use session::{Lifecycle, Session, SessionEvent};

/// UI refresh interval; live stats are recomputed on every tick
pub const TICK_RATE_MS: u64 = 100;
