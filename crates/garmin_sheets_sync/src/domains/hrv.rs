use super::{int_at, text_at};
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct HrvMetrics {
    /// Overnight average in milliseconds.
    pub last_night_avg: Option<i64>,
    pub status: Option<String>,
}

/// Extract from `/hrv-service/hrv/{date}`; `None` means the night had no reading.
pub fn extract_hrv(payload: Option<&Value>) -> HrvMetrics {
    let Some(payload) = payload else {
        return HrvMetrics::default();
    };
    HrvMetrics {
        last_night_avg: int_at(payload, &["hrvSummary", "lastNightAvg"]),
        status: text_at(payload, &["hrvSummary", "status"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extracts_summary() {
        let payload = json!({
            "userProfilePk": 1,
            "hrvSummary": {"lastNightAvg": 54, "lastNight5MinHigh": 80, "status": "BALANCED"}
        });
        let hrv = extract_hrv(Some(&payload));
        assert_eq!(hrv.last_night_avg, Some(54));
        assert_eq!(hrv.status.as_deref(), Some("BALANCED"));
    }

    #[test]
    fn no_content_is_blank() {
        assert_eq!(extract_hrv(None), HrvMetrics::default());
        assert_eq!(extract_hrv(Some(&json!({"hrvSummary": null}))), HrvMetrics::default());
    }
}
