use super::{float_at, int_at, lookup, text_at};
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BodyMetrics {
    pub weight_kg: Option<f64>,
    pub body_fat_pct: Option<f64>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BloodPressure {
    pub systolic: Option<i64>,
    pub diastolic: Option<i64>,
}

/// Extract from `/weight-service/weight/dateRange`. Garmin reports weight in
/// grams; the range average is preferred over the first weigh-in.
pub fn extract_body_composition(payload: &Value) -> BodyMetrics {
    let source = lookup(payload, &["totalAverage"])
        .filter(|avg| float_at(avg, &["weight"]).is_some())
        .or_else(|| {
            lookup(payload, &["dateWeightList"])
                .and_then(Value::as_array)
                .and_then(|list| list.first())
        });
    let Some(source) = source else {
        return BodyMetrics::default();
    };
    BodyMetrics {
        weight_kg: float_at(source, &["weight"])
            .filter(|g| *g > 0.0)
            .map(|g| g / 1000.0),
        body_fat_pct: float_at(source, &["bodyFat"]),
    }
}

/// Extract the most recent reading from
/// `/bloodpressure-service/bloodpressure/range`.
pub fn extract_blood_pressure(payload: &Value) -> BloodPressure {
    let measurements = lookup(payload, &["measurementSummaries"])
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(|summary| lookup(summary, &["measurements"]).and_then(Value::as_array))
        .flatten();

    let mut latest: Option<&Value> = None;
    for m in measurements {
        if int_at(m, &["systolic"]).is_none() {
            continue;
        }
        let newer = match latest {
            None => true,
            Some(prev) => {
                text_at(m, &["measurementTimestampLocal"])
                    > text_at(prev, &["measurementTimestampLocal"])
            }
        };
        if newer {
            latest = Some(m);
        }
    }

    latest
        .map(|m| BloodPressure {
            systolic: int_at(m, &["systolic"]),
            diastolic: int_at(m, &["diastolic"]),
        })
        .unwrap_or_default()
}
