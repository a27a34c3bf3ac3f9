use serde::{Deserialize, Serialize};

/// Cumulative speed at `t` seconds of active practice
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub t: f64,
    pub cpm: f64,
}

impl TimeSeriesPoint {
    pub fn new(t: f64, cpm: f64) -> Self {
        Self { t, cpm }
    }
}

impl From<TimeSeriesPoint> for (f64, f64) {
    fn from(p: TimeSeriesPoint) -> Self {
        (p.t, p.cpm)
    }
}
