use crate::language::Dictionary;
use crate::scheme::Scheme;
use serde::{Deserialize, Serialize};

/// The two key tokens that type one character
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CodePair {
    pub initial_code: String,
    pub final_code: String,
}

impl CodePair {
    pub fn new(initial_code: &str, final_code: &str) -> Self {
        Self {
            initial_code: initial_code.to_string(),
            final_code: final_code.to_string(),
        }
    }

    /// Both codes present, i.e. the character can be typed at all
    pub fn is_resolved(&self) -> bool {
        !self.initial_code.is_empty() && !self.final_code.is_empty()
    }
}

/// Maps a character to its expected code pair.
///
/// Implementations must be total and deterministic: characters without a
/// mapping resolve to `CodePair::default()` (both codes empty).
pub trait PhoneticResolver {
    fn resolve(&self, character: char) -> CodePair;
}

/// Dictionary pinyin run through a scheme's key tables
#[derive(Debug, Clone)]
pub struct SchemeResolver {
    pub dictionary: Dictionary,
    pub scheme: Scheme,
}

impl SchemeResolver {
    pub fn new(dictionary: Dictionary, scheme: Scheme) -> Self {
        Self { dictionary, scheme }
    }
}

impl PhoneticResolver for SchemeResolver {
    fn resolve(&self, character: char) -> CodePair {
        self.dictionary
            .pinyin(character)
            .and_then(|pinyin| self.scheme.code_for(pinyin))
            .unwrap_or_default()
    }
}
