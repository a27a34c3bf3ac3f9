use crate::config::Selection;
use crate::error::{InvalidInputSnafu, Result};
use crate::language::{AdaptiveSelector, CharSelector, Dictionary, KeyDifficulty, RandomSelector};
use crate::lessons::{LessonCatalog, LessonKind};
use crate::resolver::PhoneticResolver;
use log::info;
use rand::seq::SliceRandom;
use std::collections::HashMap;

/// What to practice
#[derive(Debug, Clone)]
pub struct TextGenConfig {
    pub number_of_chars: usize,
    pub custom_prompt: Option<String>,
    pub lesson: Option<u32>,
    pub selection: Selection,
    /// drill the characters of the current review plan
    pub review: bool,
}

/// Borrowed data a generator draws from
pub struct TextSources<'a> {
    pub dictionary: &'a Dictionary,
    pub lessons: &'a LessonCatalog,
    pub resolver: &'a dyn PhoneticResolver,
    /// per-code history; empty when none is recorded yet
    pub key_stats: &'a HashMap<String, KeyDifficulty>,
    /// review plan characters, most urgent first
    pub review_chars: &'a [char],
}

/// Handles all practice text generation logic
pub struct TextGenerator {
    config: TextGenConfig,
}

impl TextGenerator {
    pub fn new(config: TextGenConfig) -> Self {
        Self { config }
    }

    /// Characters for one drill. A custom prompt wins over a review, then a
    /// lesson, then a draw from the whole dictionary. A review with nothing
    /// left to review falls through to the next source.
    pub fn generate(&self, sources: &TextSources) -> Result<Vec<char>> {
        if let Some(prompt) = &self.config.custom_prompt {
            let chars: Vec<char> = prompt.chars().filter(|c| !c.is_whitespace()).collect();
            if chars.is_empty() {
                return InvalidInputSnafu {
                    reason: "custom prompt has no characters",
                }
                .fail();
            }
            return Ok(chars);
        }

        if self.config.review {
            if !sources.review_chars.is_empty() {
                return Ok(self.review_text(sources.review_chars));
            }
            info!("nothing left to review");
        }

        if let Some(id) = self.config.lesson {
            let lesson = sources.lessons.get(id)?;
            return Ok(match lesson.kind {
                LessonKind::Phrase => self.phrase_text(&lesson.phrases),
                LessonKind::Initial | LessonKind::Final => {
                    self.select(&lesson.characters(sources.dictionary), sources)
                }
            });
        }

        Ok(self.select(&sources.dictionary.all_characters(), sources))
    }

    fn select(&self, pool: &[char], sources: &TextSources) -> Vec<char> {
        let selector: Box<dyn CharSelector> = match self.config.selection {
            Selection::Adaptive => Box::new(AdaptiveSelector),
            Selection::Random => Box::new(RandomSelector),
        };
        selector.select_chars(
            pool,
            self.config.number_of_chars,
            sources.resolver,
            sources.key_stats,
        )
    }

    /// The most urgent review characters, repeated up to the drill length and shuffled
    fn review_text(&self, review_chars: &[char]) -> Vec<char> {
        let mut chars: Vec<char> = review_chars
            .iter()
            .copied()
            .cycle()
            .take(self.config.number_of_chars)
            .collect();
        chars.shuffle(&mut rand::thread_rng());
        chars
    }

    /// Whole phrases in random order until enough characters are collected
    fn phrase_text(&self, phrases: &[String]) -> Vec<char> {
        let mut rng = rand::thread_rng();
        let mut chars = Vec::new();
        while chars.len() < self.config.number_of_chars {
            let Some(phrase) = phrases.choose(&mut rng) else {
                break;
            };
            chars.extend(phrase.chars());
        }
        chars
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DrillError;
    use crate::resolver::SchemeResolver;
    use crate::scheme::SchemeKind;
    use assert_matches::assert_matches;

    struct Fixture {
        dictionary: Dictionary,
        lessons: LessonCatalog,
        resolver: SchemeResolver,
        key_stats: HashMap<String, KeyDifficulty>,
        review_chars: Vec<char>,
    }

    impl Fixture {
        fn new() -> Self {
            let dictionary = Dictionary::embedded().unwrap();
            Self {
                resolver: SchemeResolver::new(dictionary.clone(), SchemeKind::Xiaohe.scheme()),
                dictionary,
                lessons: LessonCatalog::embedded().unwrap(),
                key_stats: HashMap::new(),
                review_chars: Vec::new(),
            }
        }

        fn sources(&self) -> TextSources<'_> {
            TextSources {
                dictionary: &self.dictionary,
                lessons: &self.lessons,
                resolver: &self.resolver,
                key_stats: &self.key_stats,
                review_chars: &self.review_chars,
            }
        }
    }

    fn config() -> TextGenConfig {
        TextGenConfig {
            number_of_chars: 12,
            custom_prompt: None,
            lesson: None,
            selection: Selection::Random,
            review: false,
        }
    }

    #[test]
    fn test_custom_prompt_strips_whitespace() {
        let fixture = Fixture::new();
        let generator = TextGenerator::new(TextGenConfig {
            custom_prompt: Some("你好 世界\n".into()),
            lesson: Some(1),
            ..config()
        });

        assert_eq!(
            generator.generate(&fixture.sources()).unwrap(),
            vec!['你', '好', '世', '界']
        );
    }

    #[test]
    fn test_blank_prompt_is_rejected() {
        let fixture = Fixture::new();
        let generator = TextGenerator::new(TextGenConfig {
            custom_prompt: Some("  ".into()),
            ..config()
        });

        assert_matches!(
            generator.generate(&fixture.sources()),
            Err(DrillError::InvalidInput { .. })
        );
    }

    #[test]
    fn test_lesson_text_uses_lesson_characters() {
        let fixture = Fixture::new();
        let generator = TextGenerator::new(TextGenConfig {
            lesson: Some(5),
            ..config()
        });

        let chars = generator.generate(&fixture.sources()).unwrap();
        let pool = fixture.lessons.get(5).unwrap().characters(&fixture.dictionary);
        assert_eq!(chars.len(), 12);
        assert!(chars.iter().all(|c| pool.contains(c)));
    }

    #[test]
    fn test_phrase_lesson_keeps_whole_phrases() {
        let fixture = Fixture::new();
        let generator = TextGenerator::new(TextGenConfig {
            lesson: Some(16),
            ..config()
        });

        let chars = generator.generate(&fixture.sources()).unwrap();
        assert!(chars.len() >= 12);
        let text: String = chars.iter().collect();
        let phrases = &fixture.lessons.get(16).unwrap().phrases;
        assert!(phrases.iter().any(|p| text.starts_with(p.as_str())));
    }

    #[test]
    fn test_unknown_lesson() {
        let fixture = Fixture::new();
        let generator = TextGenerator::new(TextGenConfig {
            lesson: Some(404),
            ..config()
        });

        assert_matches!(
            generator.generate(&fixture.sources()),
            Err(DrillError::UnknownLesson { id: 404 })
        );
    }

    #[test]
    fn test_review_uses_plan_characters() {
        let mut fixture = Fixture::new();
        fixture.review_chars = vec!['中', '把', '想'];
        let generator = TextGenerator::new(TextGenConfig {
            review: true,
            lesson: Some(16),
            ..config()
        });

        let chars = generator.generate(&fixture.sources()).unwrap();
        assert_eq!(chars.len(), 12);
        assert_eq!(chars.iter().filter(|c| **c == '中').count(), 4);
        assert!(chars.iter().all(|c| fixture.review_chars.contains(c)));

        let short = TextGenerator::new(TextGenConfig {
            review: true,
            number_of_chars: 2,
            ..config()
        });
        let mut chars = short.generate(&fixture.sources()).unwrap();
        chars.sort();
        let mut expected = vec!['中', '把'];
        expected.sort();
        assert_eq!(chars, expected);
    }

    #[test]
    fn test_empty_review_falls_back_to_lesson() {
        let fixture = Fixture::new();
        let generator = TextGenerator::new(TextGenConfig {
            review: true,
            lesson: Some(5),
            ..config()
        });

        let chars = generator.generate(&fixture.sources()).unwrap();
        let pool = fixture.lessons.get(5).unwrap().characters(&fixture.dictionary);
        assert_eq!(chars.len(), 12);
        assert!(chars.iter().all(|c| pool.contains(c)));
    }

    #[test]
    fn test_dictionary_draw_is_resolvable() {
        let fixture = Fixture::new();
        for selection in [Selection::Random, Selection::Adaptive] {
            let generator = TextGenerator::new(TextGenConfig {
                selection,
                ..config()
            });
            let chars = generator.generate(&fixture.sources()).unwrap();

            assert_eq!(chars.len(), 12);
            assert!(chars
                .iter()
                .all(|c| fixture.resolver.resolve(*c).is_resolved()));
        }
    }
}
