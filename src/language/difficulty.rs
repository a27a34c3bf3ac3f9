/// Key-code difficulty metrics for adaptive character selection
#[derive(Debug, Clone, PartialEq)]
pub struct KeyDifficulty {
    pub miss_rate: f64,      // Percentage of incorrect attempts (0-100)
    pub avg_time_ms: f64,    // Average time to press the code correctly
    pub total_attempts: i64, // Total number of attempts for weighting
}

impl KeyDifficulty {
    /// Combined difficulty score (higher = more practice needed)
    pub fn score(&self) -> f64 {
        let miss_penalty = self.miss_rate * 2.0;
        let timing_penalty = if self.avg_time_ms > 400.0 {
            (self.avg_time_ms - 400.0) / 100.0
        } else {
            0.0
        };
        miss_penalty + timing_penalty
    }
}
