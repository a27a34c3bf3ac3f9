use crate::error::{DataParseSnafu, Result, UnknownLessonSnafu};
use crate::language::core::read_data_file;
use crate::language::Dictionary;
use itertools::Itertools;
use serde::Deserialize;
use snafu::{OptionExt, ResultExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, strum_macros::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LessonKind {
    Initial,
    Final,
    Phrase,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Lesson {
    pub id: u32,
    pub kind: LessonKind,
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// pinyin initials or finals the lesson trains
    #[serde(default)]
    pub parts: Vec<String>,
    #[serde(default)]
    pub examples: String,
    #[serde(default)]
    pub phrases: Vec<String>,
}

impl Lesson {
    /// Distinct characters that practice this lesson, examples first
    pub fn characters(&self, dictionary: &Dictionary) -> Vec<char> {
        match self.kind {
            LessonKind::Phrase => self.phrases.iter().flat_map(|p| p.chars()).unique().collect(),
            LessonKind::Initial | LessonKind::Final => self
                .examples
                .chars()
                .chain(dictionary.characters_with_parts(&self.parts))
                .unique()
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LessonCatalog {
    pub lessons: Vec<Lesson>,
}

impl LessonCatalog {
    pub fn embedded() -> Result<Self> {
        let contents = read_data_file("lessons.json")?;
        serde_json::from_str(contents).context(DataParseSnafu)
    }

    pub fn get(&self, id: u32) -> Result<&Lesson> {
        self.lessons
            .iter()
            .find(|l| l.id == id)
            .context(UnknownLessonSnafu { id })
    }

    pub fn by_kind(&self, kind: LessonKind) -> impl Iterator<Item = &Lesson> {
        self.lessons.iter().filter(move |l| l.kind == kind)
    }
}
