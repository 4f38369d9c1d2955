use super::{float_at, int_at};
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SleepMetrics {
    pub score: Option<i64>,
    /// Hours asleep.
    pub length_hours: Option<f64>,
}

/// Extract from `/wellness-service/wellness/dailySleepData`.
pub fn extract_sleep(payload: &Value) -> SleepMetrics {
    SleepMetrics {
        score: int_at(payload, &["dailySleepDTO", "sleepScores", "overall", "value"]),
        length_hours: float_at(payload, &["dailySleepDTO", "sleepTimeSeconds"])
            .filter(|secs| *secs > 0.0)
            .map(|secs| secs / 3600.0),
    }
}
