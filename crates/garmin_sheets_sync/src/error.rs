//! Custom error types for the sync front end.

use thiserror::Error;

/// Errors raised while syncing Garmin metrics to a sink.
#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Garmin error: {0}")]
    Garmin(#[from] garmin_connect_client::GarminError),

    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    #[error("Profile '{0}' not found in the environment")]
    ProfileNotFound(String),

    #[error("Email or password not configured for profile '{0}'")]
    MissingCredentials(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not overwriting {0}: confirmation declined")]
    OverwriteDeclined(String),

    #[error("Google Sheets error: {0}")]
    Sheets(String),

    #[error("Google authorization error: {0}")]
    GoogleAuth(String),

    #[error("Google token refresh failed: {0}; run the `auth` command to authorize again")]
    GoogleTokenRefresh(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Prompt error: {0}")]
    Prompt(String),
}

impl SyncError {
    /// Authentication problems abort the run instead of blanking a metric.
    pub fn is_auth(&self) -> bool {
        match self {
            SyncError::Garmin(e) => e.is_auth(),
            SyncError::GoogleAuth(_) | SyncError::GoogleTokenRefresh(_) => true,
            _ => false,
        }
    }
}

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
