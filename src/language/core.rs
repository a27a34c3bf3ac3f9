use crate::error::{DataFileSnafu, DataParseSnafu, Result};
use include_dir::{include_dir, Dir};
use serde::Deserialize;
use snafu::{OptionExt, ResultExt};
use std::collections::BTreeMap;

use super::syllable::split_syllable;

static LANG_DIR: Dir = include_dir!("src/lang");

/// Read an embedded data file from `src/lang`
pub(crate) fn read_data_file(file_name: &str) -> Result<&'static str> {
    LANG_DIR
        .get_file(file_name)
        .and_then(|file| file.contents_utf8())
        .context(DataFileSnafu { name: file_name })
}

/// Character -> toneless pinyin table (ü written as `v`)
#[derive(Deserialize, Clone, Debug)]
pub struct Dictionary {
    pub name: String,
    pub size: u32,
    pub characters: BTreeMap<char, String>,
}

impl Dictionary {
    /// The dictionary compiled into the binary
    pub fn embedded() -> Result<Self> {
        Self::from_file("hanzi.json")
    }

    fn from_file(file_name: &str) -> Result<Self> {
        let contents = read_data_file(file_name)?;
        serde_json::from_str(contents).context(DataParseSnafu)
    }

    pub fn pinyin(&self, character: char) -> Option<&str> {
        self.characters.get(&character).map(String::as_str)
    }

    pub fn all_characters(&self) -> Vec<char> {
        self.characters.keys().copied().collect()
    }

    /// Characters whose initial or final equals one of `parts`
    pub fn characters_with_parts(&self, parts: &[String]) -> Vec<char> {
        self.characters
            .iter()
            .filter(|(_, pinyin)| {
                let (initial, fin) = split_syllable(pinyin);
                parts.iter().any(|p| p == initial || p == fin)
            })
            .map(|(c, _)| *c)
            .collect()
    }
}
