use super::int_at;
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SummaryMetrics {
    pub active_calories: Option<i64>,
    pub resting_calories: Option<i64>,
    pub resting_heart_rate: Option<i64>,
    pub average_stress: Option<i64>,
    /// Moderate minutes plus vigorous minutes counted double.
    pub intensity_minutes: Option<i64>,
    pub steps: Option<i64>,
}

/// Extract from `/usersummary-service/usersummary/daily`.
pub fn extract_summary(payload: &Value) -> SummaryMetrics {
    let moderate = int_at(payload, &["moderateIntensityMinutes"]);
    let vigorous = int_at(payload, &["vigorousIntensityMinutes"]);
    let intensity_minutes = match (moderate, vigorous) {
        (None, None) => None,
        (m, v) => Some(m.unwrap_or(0) + 2 * v.unwrap_or(0)),
    };

    SummaryMetrics {
        active_calories: int_at(payload, &["activeKilocalories"]),
        resting_calories: int_at(payload, &["bmrKilocalories"]),
        resting_heart_rate: int_at(payload, &["restingHeartRate"]),
        // Garmin reports -1 when there was not enough data for a stress score.
        average_stress: int_at(payload, &["averageStressLevel"]).filter(|s| *s >= 0),
        intensity_minutes,
        steps: int_at(payload, &["totalSteps"]),
    }
}
