use crate::app_dirs::AppDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// How drill characters are drawn when no lesson or prompt is given
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Selection {
    #[default]
    Adaptive,
    Random,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub scheme: String,
    pub number_of_chars: usize,
    pub practice_time_secs: Option<u64>,
    pub selection: Selection,
    pub lesson: Option<u32>,
    pub target_speed: u32,
    pub target_accuracy: u32,
    pub custom_scheme_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheme: "xiaohe".to_string(),
            number_of_chars: 20,
            practice_time_secs: None,
            selection: Selection::Adaptive,
            lesson: None,
            target_speed: 30,
            target_accuracy: 95,
            custom_scheme_path: None,
        }
    }
}

impl Config {
    pub fn practice_time_ms(&self) -> Option<u64> {
        self.practice_time_secs.map(|secs| secs * 1000)
    }
}

pub trait ConfigStore {
    fn load(&self) -> Config;
    fn save(&self, cfg: &Config) -> std::io::Result<()>;
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new() -> Self {
        let path =
            AppDirs::config_path().unwrap_or_else(|| PathBuf::from("shuangpin_config.json"));
        Self { path }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    /// Missing or unreadable files fall back to defaults
    fn load(&self) -> Config {
        fs::read(&self.path)
            .ok()
            .and_then(|bytes| serde_json::from_slice::<Config>(&bytes).ok())
            .unwrap_or_default()
    }

    fn save(&self, cfg: &Config) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_vec_pretty(cfg)?;
        fs::write(&self.path, data)
    }
}
