use super::{float_at, lookup, text_at};
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrainingMetrics {
    pub status: Option<String>,
    pub vo2max_running: Option<f64>,
    pub vo2max_cycling: Option<f64>,
}

/// Extract from `/metrics-service/metrics/trainingstatus/aggregated/{date}`.
///
/// `latestTrainingStatusData` is keyed by device id; the first device wins.
pub fn extract_training(payload: &Value) -> TrainingMetrics {
    let first_device = lookup(
        payload,
        &["mostRecentTrainingStatus", "latestTrainingStatusData"],
    )
    .and_then(Value::as_object)
    .and_then(|devices| devices.values().next());

    let status = first_device
        .and_then(|device| text_at(device, &["trainingStatusFeedbackPhrase"]))
        .or_else(|| {
            text_at(
                payload,
                &["mostRecentTrainingStatus", "trainingStatusFeedbackPhrase"],
            )
        });

    TrainingMetrics {
        status,
        vo2max_running: float_at(payload, &["mostRecentVO2Max", "generic", "vo2MaxValue"]),
        vo2max_cycling: float_at(payload, &["mostRecentVO2Max", "cycling", "vo2MaxValue"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn first_device_status_and_vo2max() {
        let payload = json!({
            "mostRecentVO2Max": {
                "generic": {"vo2MaxValue": 52.0, "calendarDate": "2025-03-01"},
                "cycling": {"vo2MaxValue": 49.0}
            },
            "mostRecentTrainingStatus": {
                "latestTrainingStatusData": {
                    "3391234567": {"trainingStatusFeedbackPhrase": "PRODUCTIVE_1"},
                    "3391234999": {"trainingStatusFeedbackPhrase": "DETRAINING"}
                }
            }
        });
        let t = extract_training(&payload);
        assert_eq!(t.status.as_deref(), Some("PRODUCTIVE_1"));
        assert_eq!(t.vo2max_running, Some(52.0));
        assert_eq!(t.vo2max_cycling, Some(49.0));
    }

    #[test]
    fn falls_back_to_top_level_phrase() {
        let payload = json!({
            "mostRecentTrainingStatus": {
                "latestTrainingStatusData": {},
                "trainingStatusFeedbackPhrase": "MAINTAINING_2"
            },
            "mostRecentVO2Max": {"generic": null, "cycling": null}
        });
        let t = extract_training(&payload);
        assert_eq!(t.status.as_deref(), Some("MAINTAINING_2"));
        assert_eq!(t.vo2max_running, None);
    }

    #[test]
    fn empty_payload_is_blank() {
        assert_eq!(extract_training(&json!({})), TrainingMetrics::default());
    }
}
