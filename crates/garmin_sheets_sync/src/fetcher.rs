//! Collects one [`DailyRecord`] per day from a [`GarminClient`].

use crate::date_range::DateRange;
use crate::domains::{activities, body, hrv, sleep, summary, training};
use crate::error::SyncResult;
use crate::record::DailyRecord;
use chrono::NaiveDate;
use garmin_connect_client::{GarminClient, GarminError};
use std::sync::Arc;

pub struct MetricFetcher {
    client: Arc<dyn GarminClient>,
}

impl MetricFetcher {
    pub fn new(client: Arc<dyn GarminClient>) -> Self {
        Self { client }
    }

    /// One record per day of `range`, in date order. Categories that fail are
    /// left blank; an authentication failure aborts the whole run.
    pub async fn fetch_range(&self, range: &DateRange) -> SyncResult<Vec<DailyRecord>> {
        tracing::info!("Fetching metrics from {} to {}...", range.start(), range.end());
        let mut records = Vec::with_capacity(range.len());
        for date in range.days() {
            records.push(self.fetch_day(date).await?);
        }
        Ok(records)
    }

    pub async fn fetch_day(&self, date: NaiveDate) -> SyncResult<DailyRecord> {
        tracing::info!("Fetching metrics for {date}");
        let client = &self.client;
        let mut record = DailyRecord::blank(date);

        if let Some(payload) = settle(date, "sleep", client.get_sleep_data(date).await)? {
            record.sleep = sleep::extract_sleep(&payload);
        }
        if let Some(payload) = settle(date, "hrv", client.get_hrv_data(date).await)? {
            record.hrv = hrv::extract_hrv(payload.as_ref());
        }
        if let Some(payload) = settle(
            date,
            "body composition",
            client.get_body_composition(date, date).await,
        )? {
            record.body = body::extract_body_composition(&payload);
        }
        if let Some(payload) = settle(
            date,
            "blood pressure",
            client.get_blood_pressure(date, date).await,
        )? {
            record.blood_pressure = body::extract_blood_pressure(&payload);
        }
        if let Some(payload) = settle(date, "user summary", client.get_user_summary(date).await)? {
            record.summary = summary::extract_summary(&payload);
        }
        if let Some(payload) = settle(
            date,
            "training status",
            client.get_training_status(date).await,
        )? {
            record.training = training::extract_training(&payload);
        }
        if let Some(list) = settle(
            date,
            "activities",
            client.get_activities_by_date(date, date).await,
        )? {
            record.activities = activities::summarize_activities(&list);
        }

        if record.is_blank() {
            tracing::debug!("no data recorded for {date}");
        }
        Ok(record)
    }
}

/// Keep a category's payload, or log and drop it. Auth errors propagate.
fn settle<T>(date: NaiveDate, category: &str, result: Result<T, GarminError>) -> SyncResult<Option<T>> {
    match result {
        Ok(payload) => Ok(Some(payload)),
        Err(e) if e.is_auth() => Err(e.into()),
        Err(e) => {
            tracing::warn!(%date, category, error = %e, "fetch failed; leaving fields blank");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Cell;
    use crate::test_utils::MockGarminClient;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, day).expect("date")
    }

    #[tokio::test]
    async fn one_record_per_day_in_order() {
        let client = Arc::new(MockGarminClient::empty());
        let fetcher = MetricFetcher::new(client.clone());
        let range = DateRange::new(d(1), d(4)).expect("range");
        let records = fetcher.fetch_range(&range).await.expect("records");
        let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![d(1), d(2), d(3), d(4)]);
        assert!(records.iter().all(DailyRecord::is_blank));
        // seven categories per day
        assert_eq!(client.call_count(), 28);
    }

    #[tokio::test]
    async fn populated_day_fills_columns() {
        let fetcher = MetricFetcher::new(Arc::new(MockGarminClient::with_sample_day(d(2))));
        let record = fetcher.fetch_day(d(2)).await.expect("record");
        assert_eq!(record.sleep.score, Some(84));
        assert_eq!(record.hrv.status.as_deref(), Some("BALANCED"));
        assert_eq!(record.body.weight_kg, Some(80.2));
        assert_eq!(record.blood_pressure.systolic, Some(121));
        assert_eq!(record.summary.intensity_minutes, Some(50));
        assert_eq!(record.training.status.as_deref(), Some("PRODUCTIVE_1"));
        let activities = record.activities.as_ref().expect("activities");
        assert_eq!(activities.running_count, 1);
        assert_eq!(record.to_row()[0], Cell::Text("2025-03-02".into()));

        let other = fetcher.fetch_day(d(3)).await.expect("record");
        assert!(other.is_blank());
    }

    #[tokio::test]
    async fn failing_category_is_blanked() {
        let client = MockGarminClient::with_sample_day(d(2)).failing("sleep", || GarminError::Api {
            status: 500,
            body: "boom".into(),
        });
        let fetcher = MetricFetcher::new(Arc::new(client));
        let record = fetcher.fetch_day(d(2)).await.expect("record");
        assert_eq!(record.sleep.score, None);
        assert_eq!(record.summary.steps, Some(10_500));
    }

    #[tokio::test]
    async fn auth_failure_aborts() {
        let client = MockGarminClient::with_sample_day(d(2))
            .failing("summary", || GarminError::Auth("session expired".into()));
        let fetcher = MetricFetcher::new(Arc::new(client));
        let err = fetcher
            .fetch_range(&DateRange::new(d(1), d(3)).expect("range"))
            .await
            .unwrap_err();
        assert!(err.is_auth());
    }
}
