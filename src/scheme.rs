use crate::error::{DataParseSnafu, DrillError, InvalidSchemeSnafu, IoSnafu, Result};
use crate::language::split_syllable;
use crate::resolver::CodePair;
use serde::{Deserialize, Serialize};
use snafu::ResultExt;
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

/// Physical key rows shown by keyboard hints (`;` is a valid code key in some schemes)
pub const KEYBOARD_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl;", "zxcvbnm,./"];

pub const REQUIRED_INITIALS: [&str; 23] = [
    "b", "p", "m", "f", "d", "t", "n", "l", "g", "k", "h", "j", "q", "x", "zh", "ch", "sh", "r",
    "z", "c", "s", "y", "w",
];

pub const REQUIRED_FINALS: [&str; 33] = [
    "a", "o", "e", "i", "u", "v", "ai", "ei", "ui", "ao", "ou", "iu", "ie", "ue", "ve", "an", "en",
    "in", "un", "ang", "eng", "ing", "ong", "ia", "iao", "ian", "iang", "iong", "ua", "uai", "uan",
    "uang", "uo",
];

const PLAIN_INITIALS: [&str; 20] = [
    "b", "p", "m", "f", "d", "t", "n", "l", "g", "k", "h", "j", "q", "x", "r", "z", "c", "s", "y",
    "w",
];

const XIAOHE_FINALS: &[(&str, &str)] = &[
    ("a", "a"), ("o", "o"), ("e", "e"), ("i", "i"), ("u", "u"), ("v", "v"),
    ("ai", "d"), ("ei", "w"), ("ui", "v"), ("ao", "c"), ("ou", "z"), ("iu", "q"),
    ("ie", "p"), ("ue", "t"), ("ve", "t"), ("an", "j"), ("en", "f"), ("in", "b"),
    ("un", "y"), ("ang", "h"), ("eng", "g"), ("ing", "k"), ("ong", "s"), ("ia", "x"),
    ("iao", "n"), ("ian", "m"), ("iang", "l"), ("iong", "s"), ("ua", "x"), ("uai", "k"),
    ("uan", "r"), ("uang", "l"), ("uo", "o"),
];

const MICROSOFT_FINALS: &[(&str, &str)] = &[
    ("a", "a"), ("o", "o"), ("e", "e"), ("i", "i"), ("u", "u"), ("v", "y"),
    ("ai", "l"), ("ei", "z"), ("ui", "v"), ("ao", "k"), ("ou", "b"), ("iu", "q"),
    ("ie", "x"), ("ue", "t"), ("ve", "v"), ("an", "j"), ("en", "f"), ("in", "n"),
    ("un", "p"), ("ang", "h"), ("eng", "g"), ("ing", ";"), ("ong", "s"), ("ia", "w"),
    ("iao", "c"), ("ian", "m"), ("iang", "d"), ("iong", "s"), ("ua", "w"), ("uai", "y"),
    ("uan", "r"), ("uang", "d"), ("uo", "o"), ("er", "r"),
];

const ZIRANMA_FINALS: &[(&str, &str)] = &[
    ("a", "a"), ("o", "o"), ("e", "e"), ("i", "i"), ("u", "u"), ("v", "v"),
    ("ai", "l"), ("ei", "z"), ("ui", "v"), ("ao", "k"), ("ou", "b"), ("iu", "q"),
    ("ie", "x"), ("ue", "t"), ("ve", "t"), ("an", "j"), ("en", "f"), ("in", "n"),
    ("un", "p"), ("ang", "h"), ("eng", "g"), ("ing", "y"), ("ong", "s"), ("ia", "w"),
    ("iao", "c"), ("ian", "m"), ("iang", "d"), ("iong", "s"), ("ua", "w"), ("uai", "y"),
    ("uan", "r"), ("uang", "d"), ("uo", "o"),
];

const SOGOU_FINALS: &[(&str, &str)] = &[
    ("a", "a"), ("o", "o"), ("e", "e"), ("i", "i"), ("u", "u"), ("v", "y"),
    ("ai", "l"), ("ei", "z"), ("ui", "v"), ("ao", "k"), ("ou", "b"), ("iu", "q"),
    ("ie", "x"), ("ue", "t"), ("ve", "t"), ("an", "j"), ("en", "f"), ("in", "n"),
    ("un", "p"), ("ang", "h"), ("eng", "g"), ("ing", ";"), ("ong", "s"), ("ia", "w"),
    ("iao", "c"), ("ian", "m"), ("iang", "d"), ("iong", "s"), ("ua", "w"), ("uai", "y"),
    ("uan", "r"), ("uang", "d"), ("uo", "o"), ("er", "r"),
];

const ZHINENG_ABC_FINALS: &[(&str, &str)] = &[
    ("a", "a"), ("o", "o"), ("e", "e"), ("i", "i"), ("u", "u"), ("v", "v"),
    ("ai", "l"), ("ei", "q"), ("ui", "m"), ("ao", "k"), ("ou", "b"), ("iu", "r"),
    ("ie", "x"), ("ue", "m"), ("ve", "v"), ("an", "j"), ("en", "f"), ("in", "c"),
    ("un", "n"), ("ang", "h"), ("eng", "g"), ("ing", "y"), ("ong", "s"), ("ia", "d"),
    ("iao", "z"), ("ian", "w"), ("iang", "t"), ("iong", "s"), ("ua", "d"), ("uai", "c"),
    ("uan", "p"), ("uang", "t"), ("uo", "o"), ("er", "r"),
];

const PINYIN_JIAJIA_FINALS: &[(&str, &str)] = &[
    ("a", "a"), ("o", "o"), ("e", "e"), ("i", "i"), ("u", "u"), ("v", "v"),
    ("ai", "s"), ("ei", "w"), ("ui", "v"), ("ao", "d"), ("ou", "p"), ("iu", "n"),
    ("ie", "m"), ("ue", "x"), ("ve", "x"), ("an", "f"), ("en", "r"), ("in", "l"),
    ("un", "z"), ("ang", "g"), ("eng", "t"), ("ing", "q"), ("ong", "y"), ("ia", "b"),
    ("iao", "k"), ("ian", "j"), ("iang", "h"), ("iong", "y"), ("ua", "b"), ("uai", "x"),
    ("uan", "c"), ("uang", "h"), ("uo", "o"), ("er", "q"),
];

/// Built-in schemes selectable from the command line
#[derive(Debug, Copy, Clone, PartialEq, Eq, clap::ValueEnum, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SchemeKind {
    Xiaohe,
    Microsoft,
    Ziranma,
    Sogou,
    ZhinengAbc,
    PinyinJiajia,
}

impl SchemeKind {
    pub const ALL: [SchemeKind; 6] = [
        SchemeKind::Xiaohe,
        SchemeKind::Microsoft,
        SchemeKind::Ziranma,
        SchemeKind::Sogou,
        SchemeKind::ZhinengAbc,
        SchemeKind::PinyinJiajia,
    ];

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.to_string() == key)
    }

    pub fn scheme(&self) -> Scheme {
        match self {
            SchemeKind::Xiaohe => Scheme::builtin(
                *self,
                "小鹤双拼",
                "Flypy layout; zero-initial syllables are typed by their own letters",
                ("v", "i", "u"),
                XIAOHE_FINALS,
                ZeroInitial::FirstLetter,
            ),
            SchemeKind::Microsoft => Scheme::builtin(
                *self,
                "微软双拼",
                "Layout built into Windows input methods",
                ("v", "i", "u"),
                MICROSOFT_FINALS,
                ZeroInitial::Fixed("o".into()),
            ),
            SchemeKind::Ziranma => Scheme::builtin(
                *self,
                "自然码双拼",
                "Classic Ziranma layout",
                ("v", "i", "u"),
                ZIRANMA_FINALS,
                ZeroInitial::FirstLetter,
            ),
            SchemeKind::Sogou => Scheme::builtin(
                *self,
                "搜狗双拼",
                "Sogou input method layout",
                ("v", "i", "u"),
                SOGOU_FINALS,
                ZeroInitial::Fixed("o".into()),
            ),
            SchemeKind::ZhinengAbc => Scheme::builtin(
                *self,
                "智能ABC双拼",
                "Zhineng ABC layout",
                ("a", "e", "v"),
                ZHINENG_ABC_FINALS,
                ZeroInitial::Fixed("o".into()),
            ),
            SchemeKind::PinyinJiajia => Scheme::builtin(
                *self,
                "拼音加加双拼",
                "Pinyin Jiajia layout",
                ("v", "u", "i"),
                PINYIN_JIAJIA_FINALS,
                ZeroInitial::FirstLetter,
            ),
        }
    }
}

/// How syllables without an initial consonant are typed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum ZeroInitial {
    /// single-letter finals double, two-letter finals are typed literally,
    /// longer finals use their first letter then the final key
    FirstLetter,
    /// a fixed key stands in for the missing initial
    Fixed(String),
}

/// A shuangpin key mapping: pinyin part -> key token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scheme {
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub initials: BTreeMap<String, String>,
    pub finals: BTreeMap<String, String>,
    pub zero_initial: ZeroInitial,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyUsage {
    /// keys carrying more than one final
    pub shared_final_keys: Vec<String>,
    /// keys no mapping uses
    pub unused_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLabel {
    pub key: char,
    pub initials: Vec<String>,
    pub finals: Vec<String>,
}

impl Scheme {
    fn builtin(
        kind: SchemeKind,
        name: &str,
        description: &str,
        (zh, ch, sh): (&str, &str, &str),
        finals: &[(&str, &str)],
        zero_initial: ZeroInitial,
    ) -> Self {
        let mut initials: BTreeMap<String, String> = PLAIN_INITIALS
            .iter()
            .map(|i| (i.to_string(), i.to_string()))
            .collect();
        initials.insert("zh".into(), zh.into());
        initials.insert("ch".into(), ch.into());
        initials.insert("sh".into(), sh.into());

        Self {
            key: kind.to_string(),
            name: name.to_string(),
            description: description.to_string(),
            initials,
            finals: finals
                .iter()
                .map(|(f, k)| (f.to_string(), k.to_string()))
                .collect(),
            zero_initial,
        }
    }

    /// Resolve a built-in scheme by its key (e.g. `xiaohe`)
    pub fn by_key(key: &str) -> Result<Self> {
        SchemeKind::from_key(key)
            .map(|k| k.scheme())
            .ok_or_else(|| DrillError::UnknownScheme {
                name: key.to_string(),
            })
    }

    /// Load a user supplied scheme from a JSON file; invalid schemes are rejected
    pub fn from_json<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = fs::read(path.as_ref()).context(IoSnafu)?;
        let scheme: Scheme = serde_json::from_slice(&bytes).context(DataParseSnafu)?;
        let errors = scheme.validate();
        if !errors.is_empty() {
            return InvalidSchemeSnafu { errors }.fail();
        }
        Ok(scheme)
    }

    /// Two-key code for a toneless pinyin syllable, `None` if any part is unmapped
    pub fn code_for(&self, pinyin: &str) -> Option<CodePair> {
        let (initial, fin) = split_syllable(pinyin);
        if fin.is_empty() {
            return None;
        }

        if initial.is_empty() {
            return self.zero_initial_code(fin);
        }

        let initial_code = self.initials.get(initial)?;
        let final_code = self.finals.get(fin)?;
        Some(CodePair::new(initial_code, final_code))
    }

    fn zero_initial_code(&self, fin: &str) -> Option<CodePair> {
        match &self.zero_initial {
            ZeroInitial::Fixed(key) => {
                let final_code = self.finals.get(fin)?;
                Some(CodePair::new(key, final_code))
            }
            ZeroInitial::FirstLetter => {
                let mut letters = fin.chars();
                let first = letters.next()?.to_string();
                match fin.chars().count() {
                    1 => Some(CodePair::new(&first, &first)),
                    2 => Some(CodePair::new(&first, &letters.collect::<String>())),
                    _ => {
                        let final_code = self.finals.get(fin)?;
                        Some(CodePair::new(&first, final_code))
                    }
                }
            }
        }
    }

    /// Problems that make the scheme unusable for drills; empty when valid
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("missing scheme name".to_string());
        }

        let missing_initials: Vec<&str> = REQUIRED_INITIALS
            .iter()
            .copied()
            .filter(|i| !self.initials.contains_key(*i))
            .collect();
        if !missing_initials.is_empty() {
            errors.push(format!("missing initials: {}", missing_initials.join(", ")));
        }

        let missing_finals: Vec<&str> = REQUIRED_FINALS
            .iter()
            .copied()
            .filter(|f| !self.finals.contains_key(*f))
            .collect();
        if !missing_finals.is_empty() {
            errors.push(format!("missing finals: {}", missing_finals.join(", ")));
        }

        for (part, code) in self.initials.iter().chain(self.finals.iter()) {
            if code.chars().count() != 1 {
                errors.push(format!("code for '{part}' must be a single key, got '{code}'"));
            }
        }

        if let ZeroInitial::Fixed(key) = &self.zero_initial {
            if key.chars().count() != 1 {
                errors.push(format!("zero-initial key must be a single key, got '{key}'"));
            }
        }

        errors
    }

    /// Keys shared between finals (must be disambiguated by the learner) and unused keys
    pub fn key_usage(&self) -> KeyUsage {
        let mut per_key: BTreeMap<&str, usize> = BTreeMap::new();
        for code in self.finals.values() {
            *per_key.entry(code.as_str()).or_insert(0) += 1;
        }

        let used: BTreeSet<&str> = self
            .initials
            .values()
            .chain(self.finals.values())
            .map(String::as_str)
            .collect();

        KeyUsage {
            shared_final_keys: per_key
                .into_iter()
                .filter(|(_, n)| *n > 1)
                .map(|(k, _)| k.to_string())
                .collect(),
            unused_keys: "abcdefghijklmnopqrstuvwxyz;"
                .chars()
                .map(|c| c.to_string())
                .filter(|k| !used.contains(k.as_str()))
                .collect(),
        }
    }

    /// Keyboard rows annotated with the initials and finals living on each key
    pub fn keyboard_layout(&self) -> Vec<Vec<KeyLabel>> {
        KEYBOARD_ROWS
            .iter()
            .map(|row| {
                row.chars()
                    .map(|key| KeyLabel {
                        key,
                        initials: parts_on_key(&self.initials, key),
                        finals: parts_on_key(&self.finals, key),
                    })
                    .collect()
            })
            .collect()
    }
}

fn parts_on_key(map: &BTreeMap<String, String>, key: char) -> Vec<String> {
    map.iter()
        .filter(|(_, code)| code.chars().eq(std::iter::once(key)))
        .map(|(part, _)| part.clone())
        .collect()
}
