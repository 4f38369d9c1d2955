use crate::error::{SyncError, SyncResult};
use std::path::PathBuf;

pub const DEFAULT_CLIENT_SECRET_PATH: &str = "credentials/client_secret.json";
pub const DEFAULT_OUTPUT_DIR: &str = "output";
pub const DEFAULT_GARMIN_TOKEN_DIR: &str = ".garmin_tokens";
pub const DEFAULT_SHEETS_API_BASE_URL: &str = "https://sheets.googleapis.com";

/// Settings shared by every profile.
#[derive(Clone, Debug)]
pub struct Settings {
    pub client_secret_path: PathBuf,
    pub google_token_path: PathBuf,
    pub output_dir: PathBuf,
    pub garmin_token_dir: PathBuf,
    pub sheets_api_base_url: String,
    pub garmin: garmin_connect_client::config::Config,
}

impl Settings {
    pub fn from_env() -> SyncResult<Self> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Read settings through `get` so tests never touch the process environment.
    pub fn from_env_with<F>(mut get: F) -> SyncResult<Self>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let client_secret_path: PathBuf = non_empty(get("GOOGLE_CLIENT_SECRET_PATH"))
            .unwrap_or_else(|| DEFAULT_CLIENT_SECRET_PATH.into())
            .into();
        // The token lives next to the client secret unless placed explicitly.
        let google_token_path = non_empty(get("GOOGLE_TOKEN_PATH"))
            .map(PathBuf::from)
            .unwrap_or_else(|| client_secret_path.with_file_name("token.json"));
        let output_dir = non_empty(get("OUTPUT_DIR"))
            .unwrap_or_else(|| DEFAULT_OUTPUT_DIR.into())
            .into();
        let garmin_token_dir = non_empty(get("GARMIN_TOKEN_DIR"))
            .unwrap_or_else(|| DEFAULT_GARMIN_TOKEN_DIR.into())
            .into();
        let sheets_api_base_url = non_empty(get("SHEETS_API_BASE_URL"))
            .unwrap_or_else(|| DEFAULT_SHEETS_API_BASE_URL.into())
            .trim_end_matches('/')
            .to_string();
        if !sheets_api_base_url.starts_with("http://") && !sheets_api_base_url.starts_with("https://") {
            return Err(SyncError::Config(format!(
                "SHEETS_API_BASE_URL must be an http(s) URL, got {sheets_api_base_url:?}"
            )));
        }

        let garmin = garmin_connect_client::config::Config::from_env_with(&mut get)?;

        Ok(Self {
            client_secret_path,
            google_token_path,
            output_dir,
            garmin_token_dir,
            sheets_api_base_url,
            garmin,
        })
    }

    /// Default CSV destination for a profile: `<OUTPUT_DIR>/<PROFILE>.csv`.
    pub fn default_csv_path(&self, profile: &str) -> PathBuf {
        self.output_dir.join(format!("{profile}.csv"))
    }
}
