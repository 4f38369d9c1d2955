//! Shared test utilities and a mock `GarminClient` used by unit tests.
#![cfg(test)]

use async_trait::async_trait;
use chrono::NaiveDate;
use garmin_connect_client::{GarminClient, GarminError};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Serves one fully populated day; every other day comes back empty.
#[derive(Default)]
pub struct MockGarminClient {
    sample_day: Option<NaiveDate>,
    failures: HashMap<&'static str, fn() -> GarminError>,
    calls: AtomicUsize,
}

impl MockGarminClient {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_sample_day(date: NaiveDate) -> Self {
        Self {
            sample_day: Some(date),
            ..Self::default()
        }
    }

    /// Make one category (`sleep`, `hrv`, `body`, `blood_pressure`, `summary`,
    /// `training`, `activities`) fail on every call.
    pub fn failing(mut self, category: &'static str, make: fn() -> GarminError) -> Self {
        self.failures.insert(category, make);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn respond(&self, category: &str, date: NaiveDate) -> Result<Option<Value>, GarminError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(make) = self.failures.get(category) {
            return Err(make());
        }
        if self.sample_day == Some(date) {
            Ok(Some(sample_payload(category)))
        } else {
            Ok(None)
        }
    }
}

pub fn sample_payload(category: &str) -> Value {
    match category {
        "sleep" => json!({
            "dailySleepDTO": {
                "sleepTimeSeconds": 27900,
                "sleepScores": {"overall": {"value": 84}}
            }
        }),
        "hrv" => json!({"hrvSummary": {"lastNightAvg": 55, "status": "BALANCED"}}),
        "body" => json!({
            "dateWeightList": [{"weight": 80200.0, "bodyFat": 17.9}],
            "totalAverage": {"weight": 80200.0, "bodyFat": 17.9}
        }),
        "blood_pressure" => json!({
            "measurementSummaries": [{
                "measurements": [{"systolic": 121, "diastolic": 79, "measurementTimestampLocal": "2025-03-02T07:10:00.0"}]
            }]
        }),
        "summary" => json!({
            "activeKilocalories": 640.0,
            "bmrKilocalories": 1790.0,
            "restingHeartRate": 46,
            "averageStressLevel": 24,
            "moderateIntensityMinutes": 30,
            "vigorousIntensityMinutes": 10,
            "totalSteps": 10500
        }),
        "training" => json!({
            "mostRecentVO2Max": {"generic": {"vo2MaxValue": 53.0}, "cycling": null},
            "mostRecentTrainingStatus": {
                "latestTrainingStatusData": {"3391": {"trainingStatusFeedbackPhrase": "PRODUCTIVE_1"}}
            }
        }),
        "activities" => json!([{
            "activityType": {"typeKey": "running", "parentTypeId": 1},
            "distance": 8000.0,
            "duration": 2400.0,
            "calories": 520.0
        }]),
        _ => Value::Null,
    }
}

#[async_trait]
impl GarminClient for MockGarminClient {
    async fn get_user_summary(&self, date: NaiveDate) -> Result<Value, GarminError> {
        Ok(self.respond("summary", date)?.unwrap_or_else(|| json!({})))
    }

    async fn get_body_composition(
        &self,
        start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Value, GarminError> {
        Ok(self
            .respond("body", start)?
            .unwrap_or_else(|| json!({"dateWeightList": [], "totalAverage": {"weight": null}})))
    }

    async fn get_blood_pressure(
        &self,
        start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Value, GarminError> {
        Ok(self
            .respond("blood_pressure", start)?
            .unwrap_or_else(|| json!({"measurementSummaries": []})))
    }

    async fn get_sleep_data(&self, date: NaiveDate) -> Result<Value, GarminError> {
        Ok(self.respond("sleep", date)?.unwrap_or_else(|| json!({"dailySleepDTO": {}})))
    }

    async fn get_activities_by_date(
        &self,
        start: NaiveDate,
        _end: NaiveDate,
    ) -> Result<Vec<Value>, GarminError> {
        Ok(match self.respond("activities", start)? {
            Some(Value::Array(list)) => list,
            _ => Vec::new(),
        })
    }

    async fn get_training_status(&self, date: NaiveDate) -> Result<Value, GarminError> {
        Ok(self.respond("training", date)?.unwrap_or_else(|| json!({})))
    }

    async fn get_hrv_data(&self, date: NaiveDate) -> Result<Option<Value>, GarminError> {
        self.respond("hrv", date)
    }
}
