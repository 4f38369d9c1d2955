//! Field extraction from raw Garmin Connect payloads.
//!
//! Each module owns one metric category and turns the nested JSON returned by
//! [`GarminClient`](garmin_connect_client::GarminClient) into a small typed
//! struct. Missing keys and `null`s become `None`; nothing here fails.
//!
//! # Modules
//!
//! - [`activities`]: per-sport counts, distances and durations
//! - [`body`]: weight, body fat and blood pressure
//! - [`hrv`]: overnight HRV average and status
//! - [`sleep`]: sleep score and length
//! - [`summary`]: calories, steps, resting HR, stress, intensity minutes
//! - [`training`]: training status phrase and VO2 max

pub mod activities;
pub mod body;
pub mod hrv;
pub mod sleep;
pub mod summary;
pub mod training;

use serde_json::Value;

/// Follow `path` through nested objects, treating `null` as missing.
pub(crate) fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    (!current.is_null()).then_some(current)
}

pub(crate) fn float_at(value: &Value, path: &[&str]) -> Option<f64> {
    lookup(value, path).and_then(Value::as_f64)
}

/// Integers sometimes arrive as `523.0`; those are rounded.
pub(crate) fn int_at(value: &Value, path: &[&str]) -> Option<i64> {
    let v = lookup(value, path)?;
    v.as_i64().or_else(|| v.as_f64().map(|f| f.round() as i64))
}

pub(crate) fn text_at(value: &Value, path: &[&str]) -> Option<String> {
    lookup(value, path)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn lookup_treats_null_as_missing() {
        let v = json!({"a": {"b": null, "c": 2}});
        assert!(lookup(&v, &["a", "b"]).is_none());
        assert!(lookup(&v, &["a", "x", "y"]).is_none());
        assert_eq!(int_at(&v, &["a", "c"]), Some(2));
    }

    #[test]
    fn int_at_rounds_floats() {
        let v = json!({"kcal": 523.6});
        assert_eq!(int_at(&v, &["kcal"]), Some(524));
    }

    #[test]
    fn text_at_skips_empty_strings() {
        let v = json!({"s": "", "t": "BALANCED"});
        assert!(text_at(&v, &["s"]).is_none());
        assert_eq!(text_at(&v, &["t"]).as_deref(), Some("BALANCED"));
    }
}
