use super::difficulty::KeyDifficulty;
use crate::resolver::PhoneticResolver;
use rand::seq::SliceRandom;
use std::collections::HashMap;

/// Strategy for drawing practice characters from a pool
pub trait CharSelector {
    fn select_chars(
        &self,
        pool: &[char],
        count: usize,
        resolver: &dyn PhoneticResolver,
        key_stats: &HashMap<String, KeyDifficulty>,
    ) -> Vec<char>;
}

/// Uniform draw with repetition
pub struct RandomSelector;

impl CharSelector for RandomSelector {
    fn select_chars(
        &self,
        pool: &[char],
        count: usize,
        _resolver: &dyn PhoneticResolver,
        _key_stats: &HashMap<String, KeyDifficulty>,
    ) -> Vec<char> {
        let mut rng = rand::thread_rng();
        (0..count)
            .filter_map(|_| pool.choose(&mut rng).copied())
            .collect()
    }
}

/// Prefers characters whose codes have a poor history
pub struct AdaptiveSelector;

impl CharSelector for AdaptiveSelector {
    fn select_chars(
        &self,
        pool: &[char],
        count: usize,
        resolver: &dyn PhoneticResolver,
        key_stats: &HashMap<String, KeyDifficulty>,
    ) -> Vec<char> {
        if key_stats.is_empty() {
            return RandomSelector.select_chars(pool, count, resolver, key_stats);
        }

        let mut scored: Vec<(char, f64)> = pool
            .iter()
            .map(|&c| (c, character_difficulty_score(c, resolver, key_stats)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        // Draw from the hardest 30% so weak codes dominate without repeating one character
        let pool_size = (scored.len() as f64 * 0.3)
            .max(count as f64)
            .min(scored.len() as f64) as usize;
        let hardest: Vec<char> = scored[..pool_size].iter().map(|(c, _)| *c).collect();

        RandomSelector.select_chars(&hardest, count, resolver, key_stats)
    }
}

/// Mean difficulty of the two codes of a character; unseen codes rank as fairly hard
fn character_difficulty_score(
    character: char,
    resolver: &dyn PhoneticResolver,
    key_stats: &HashMap<String, KeyDifficulty>,
) -> f64 {
    let codes = resolver.resolve(character);
    [codes.initial_code, codes.final_code]
        .iter()
        .map(|code| key_stats.get(code).map_or(10.0, KeyDifficulty::score))
        .sum::<f64>()
        / 2.0
}
