pub mod core;
pub mod difficulty;
pub mod selector;
pub mod syllable;

// Re-export the main types for convenience
pub use core::Dictionary;
pub use difficulty::KeyDifficulty;
pub use selector::{AdaptiveSelector, CharSelector, RandomSelector};
pub use syllable::split_syllable;
