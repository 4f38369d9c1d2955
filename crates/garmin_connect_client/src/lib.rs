//! Minimal `GarminClient` trait and a reqwest-based Garmin Connect session.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use thiserror::Error;

pub mod config;
pub mod http_client;
pub mod oauth1;
pub mod retry;
pub mod sso;
pub mod tokens;

#[derive(Debug, Error)]
pub enum GarminError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("rate limited: {0}")]
    RateLimited(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("unexpected status {status}: {body}")]
    Api { status: u16, body: String },
    #[error("decoding error: {0}")]
    Decode(String),
    #[error("token store error: {0}")]
    TokenStore(#[from] std::io::Error),
}

impl GarminError {
    /// Map a non-success HTTP status to the closest error variant.
    pub fn from_status(status: u16, body: String) -> Self {
        match status {
            401 | 403 => GarminError::Auth(body),
            404 => GarminError::NotFound(body),
            422 => GarminError::InvalidInput(body),
            429 => GarminError::RateLimited(body),
            _ => GarminError::Api { status, body },
        }
    }

    /// Statuses the Connect HTTP adapter retries on: 408, 429 and 5xx gateways.
    pub fn is_retryable(&self) -> bool {
        match self {
            GarminError::RateLimited(_) => true,
            GarminError::Api { status, .. } => matches!(status, 408 | 500 | 502 | 503 | 504),
            GarminError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, GarminError::Auth(_))
    }
}

/// Result of a username/password sign-in.
#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated,
    /// The account has two-factor authentication enabled; submit the code with
    /// [`http_client::ReqwestGarminClient::resume_login`].
    MfaRequired(MfaChallenge),
}

/// State carried between the credential POST and the MFA code POST.
#[derive(Clone, Debug)]
pub struct MfaChallenge {
    pub(crate) csrf: String,
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SocialProfile {
    pub display_name: String,
    pub full_name: Option<String>,
}

/// One call per metric category. Every method returns the raw JSON payload;
/// field extraction is left to the caller.
#[async_trait]
pub trait GarminClient: Send + Sync + 'static {
    /// Daily totals: calories, steps, intensity minutes, resting HR, stress.
    async fn get_user_summary(&self, date: NaiveDate) -> Result<serde_json::Value, GarminError>;

    /// Weight and body composition averaged over the inclusive range.
    async fn get_body_composition(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<serde_json::Value, GarminError>;

    /// Blood pressure readings over the inclusive range.
    async fn get_blood_pressure(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<serde_json::Value, GarminError>;

    async fn get_sleep_data(&self, date: NaiveDate) -> Result<serde_json::Value, GarminError>;

    /// All activities started within the inclusive range, across pages.
    async fn get_activities_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<serde_json::Value>, GarminError>;

    /// Training status and most recent VO2 max.
    async fn get_training_status(&self, date: NaiveDate)
    -> Result<serde_json::Value, GarminError>;

    /// Overnight HRV. `None` when the device recorded nothing for the night.
    async fn get_hrv_data(&self, date: NaiveDate)
    -> Result<Option<serde_json::Value>, GarminError>;
}
