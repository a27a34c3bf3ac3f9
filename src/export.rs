use crate::error::{CsvSnafu, IoSnafu, JsonFileSnafu, Result};
use crate::review::ReviewRecord;
use crate::stats::{KeySummary, SessionRecord, StatsDb, UnlockedAchievement};
use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Csv,
}

/// Everything the statistics database holds, as one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    pub exported_at: DateTime<Local>,
    pub app_version: String,
    pub sessions: Vec<SessionRecord>,
    pub key_summary: Vec<KeySummary>,
    pub achievements: Vec<UnlockedAchievement>,
    #[serde(default)]
    pub review_records: Vec<ReviewRecord>,
}

impl ExportBundle {
    pub fn collect(db: &StatsDb) -> Result<Self> {
        Ok(Self {
            exported_at: Local::now(),
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            sessions: db.all_sessions()?,
            key_summary: db.key_summary()?,
            achievements: db.unlocked_achievements()?,
            review_records: db.review_records()?,
        })
    }
}

/// `history.csv` becomes `history_keys.csv`
pub fn key_summary_path(path: &Path) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "export".to_string());
    path.with_file_name(format!("{stem}_keys.csv"))
}

/// Write the history to `path`; returns every file written.
///
/// JSON writes one bundle. CSV writes the sessions to `path` and the
/// per-key summary next to it (see [`key_summary_path`]).
pub fn export(db: &StatsDb, path: &Path, format: ExportFormat) -> Result<Vec<PathBuf>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).context(IoSnafu)?;
    }

    match format {
        ExportFormat::Json => {
            let bundle = ExportBundle::collect(db)?;
            let data = serde_json::to_vec_pretty(&bundle).context(JsonFileSnafu { path })?;
            fs::write(path, data).context(IoSnafu)?;
            Ok(vec![path.to_path_buf()])
        }
        ExportFormat::Csv => {
            write_csv(path, &db.all_sessions()?)?;
            let keys_path = key_summary_path(path);
            write_csv(&keys_path, &db.key_summary()?)?;
            Ok(vec![path.to_path_buf(), keys_path])
        }
    }
}

fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context(CsvSnafu)?;
    for row in rows {
        writer.serialize(row).context(CsvSnafu)?;
    }
    writer.flush().context(IoSnafu)?;
    Ok(())
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportSummary {
    pub sessions: usize,
    pub achievements: usize,
}

/// Merge a JSON export into `db`. Sessions already present are skipped and
/// achievements keep their first unlock time.
pub fn import(db: &mut StatsDb, path: &Path) -> Result<ImportSummary> {
    let data = fs::read(path).context(IoSnafu)?;
    let bundle: ExportBundle = serde_json::from_slice(&data).context(JsonFileSnafu { path })?;

    let sessions = db.import_sessions(&bundle.sessions)?;
    let mut achievements = 0;
    for entry in &bundle.achievements {
        if db.unlock_achievement(&entry.id, entry.unlocked_at)? {
            achievements += 1;
        }
    }
    Ok(ImportSummary {
        sessions,
        achievements,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_summary_path() {
        assert_eq!(
            key_summary_path(Path::new("/tmp/out/history.csv")),
            PathBuf::from("/tmp/out/history_keys.csv")
        );
        assert_eq!(
            key_summary_path(Path::new("stats")),
            PathBuf::from("stats_keys.csv")
        );
    }

    #[test]
    fn test_format_names() {
        assert_eq!(ExportFormat::Json.to_string(), "json");
        assert_eq!(ExportFormat::Csv.to_string(), "csv");
    }

    #[test]
    fn test_import_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "not json").unwrap();
        let mut db = StatsDb::in_memory().unwrap();

        let err = import(&mut db, &path).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }
}
