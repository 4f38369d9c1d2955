use super::{float_at, int_at, text_at};
use serde_json::Value;

/// Sports broken out into their own columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ActivityKind {
    Running,
    Cycling,
    Strength,
    Cardio,
    Tennis,
}

const RUNNING_PARENT_TYPE: i64 = 1;
const CYCLING_PARENT_TYPE: i64 = 2;

/// Classify an activity by its `activityType`. First match wins, so a
/// `treadmill_running` counts as running even if its parent type says otherwise.
pub fn classify(activity: &Value) -> Option<ActivityKind> {
    let type_key = text_at(activity, &["activityType", "typeKey"])
        .unwrap_or_default()
        .to_lowercase();
    let parent = int_at(activity, &["activityType", "parentTypeId"]);

    if type_key.contains("run") || parent == Some(RUNNING_PARENT_TYPE) {
        Some(ActivityKind::Running)
    } else if type_key.contains("virtual_ride")
        || type_key.contains("cycling")
        || parent == Some(CYCLING_PARENT_TYPE)
    {
        Some(ActivityKind::Cycling)
    } else if type_key.contains("strength") {
        Some(ActivityKind::Strength)
    } else if type_key.contains("cardio") {
        Some(ActivityKind::Cardio)
    } else if type_key.contains("tennis") {
        Some(ActivityKind::Tennis)
    } else {
        None
    }
}

/// Per-day totals. Distances in kilometres, durations in minutes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ActivityTotals {
    pub all_count: i64,
    pub running_count: i64,
    pub running_distance_km: f64,
    pub cycling_count: i64,
    pub cycling_distance_km: f64,
    pub strength_count: i64,
    pub strength_minutes: f64,
    pub cardio_count: i64,
    pub cardio_minutes: f64,
    pub tennis_count: i64,
    pub tennis_minutes: f64,
    /// Sum of per-activity calories; `None` when no activity reported any.
    pub calories: Option<f64>,
}

/// Summarize a day's activity list. An empty day yields `None` so the
/// activity columns stay blank.
pub fn summarize_activities(activities: &[Value]) -> Option<ActivityTotals> {
    if activities.is_empty() {
        return None;
    }

    let mut totals = ActivityTotals {
        all_count: activities.len() as i64,
        ..ActivityTotals::default()
    };
    for activity in activities {
        let km = || float_at(activity, &["distance"]).unwrap_or(0.0) / 1000.0;
        let minutes = || float_at(activity, &["duration"]).unwrap_or(0.0) / 60.0;
        match classify(activity) {
            Some(ActivityKind::Running) => {
                totals.running_count += 1;
                totals.running_distance_km += km();
            }
            Some(ActivityKind::Cycling) => {
                totals.cycling_count += 1;
                totals.cycling_distance_km += km();
            }
            Some(ActivityKind::Strength) => {
                totals.strength_count += 1;
                totals.strength_minutes += minutes();
            }
            Some(ActivityKind::Cardio) => {
                totals.cardio_count += 1;
                totals.cardio_minutes += minutes();
            }
            Some(ActivityKind::Tennis) => {
                totals.tennis_count += 1;
                totals.tennis_minutes += minutes();
            }
            None => {}
        }
        if let Some(kcal) = float_at(activity, &["calories"]) {
            *totals.calories.get_or_insert(0.0) += kcal;
        }
    }
    Some(totals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn activity(type_key: &str, parent: i64, distance: f64, duration: f64, calories: f64) -> Value {
        json!({
            "activityType": {"typeKey": type_key, "parentTypeId": parent},
            "distance": distance,
            "duration": duration,
            "calories": calories
        })
    }

    #[test]
    fn classification_order() {
        assert_eq!(
            classify(&activity("Trail_Running", 17, 0.0, 0.0, 0.0)),
            Some(ActivityKind::Running)
        );
        assert_eq!(
            classify(&activity("indoor_something", 1, 0.0, 0.0, 0.0)),
            Some(ActivityKind::Running)
        );
        assert_eq!(
            classify(&activity("virtual_ride", 2, 0.0, 0.0, 0.0)),
            Some(ActivityKind::Cycling)
        );
        assert_eq!(
            classify(&activity("road_biking", 2, 0.0, 0.0, 0.0)),
            Some(ActivityKind::Cycling)
        );
        assert_eq!(
            classify(&activity("strength_training", 29, 0.0, 0.0, 0.0)),
            Some(ActivityKind::Strength)
        );
        assert_eq!(
            classify(&activity("indoor_cardio", 29, 0.0, 0.0, 0.0)),
            Some(ActivityKind::Cardio)
        );
        assert_eq!(
            classify(&activity("tennis_v2", 206, 0.0, 0.0, 0.0)),
            Some(ActivityKind::Tennis)
        );
        assert_eq!(classify(&activity("yoga", 29, 0.0, 0.0, 0.0)), None);
        assert_eq!(classify(&json!({})), None);
    }

    #[test]
    fn totals_convert_units() {
        let day = vec![
            activity("running", 1, 10_500.0, 3_000.0, 700.0),
            activity("treadmill_running", 1, 5_000.0, 1_500.0, 300.0),
            activity("cycling", 2, 40_000.0, 5_400.0, 900.0),
            activity("strength_training", 29, 0.0, 2_700.0, 250.0),
            activity("tennis", 206, 0.0, 3_600.0, 500.0),
            activity("yoga", 29, 0.0, 1_800.0, 100.0),
        ];
        let t = summarize_activities(&day).expect("totals");
        assert_eq!(t.all_count, 6);
        assert_eq!(t.running_count, 2);
        assert_eq!(t.running_distance_km, 15.5);
        assert_eq!(t.cycling_count, 1);
        assert_eq!(t.cycling_distance_km, 40.0);
        assert_eq!(t.strength_count, 1);
        assert_eq!(t.strength_minutes, 45.0);
        assert_eq!(t.cardio_count, 0);
        assert_eq!(t.tennis_minutes, 60.0);
        assert_eq!(t.calories, Some(2750.0));
    }

    #[test]
    fn empty_day_is_none() {
        assert!(summarize_activities(&[]).is_none());
    }

    #[test]
    fn missing_calories_stay_blank() {
        let day = vec![json!({"activityType": {"typeKey": "running"}, "distance": 1000.0})];
        let t = summarize_activities(&day).expect("totals");
        assert_eq!(t.running_distance_km, 1.0);
        assert_eq!(t.calories, None);
    }
}
