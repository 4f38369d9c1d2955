use crate::GarminError;

/// Endpoints of one Garmin Connect deployment (`garmin.com` or `garmin.cn`).
#[derive(Clone, Debug)]
pub struct Config {
    pub domain: String,
    pub sso_base_url: String,
    pub api_base_url: String,
    pub consumer_url: String,
}

pub const DEFAULT_DOMAIN: &str = "garmin.com";
pub const DEFAULT_CONSUMER_URL: &str = "https://thegarth.s3.amazonaws.com/oauth_consumer.json";

impl Default for Config {
    fn default() -> Self {
        Self::for_domain(DEFAULT_DOMAIN)
    }
}

impl Config {
    pub fn for_domain(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            sso_base_url: format!("https://sso.{domain}"),
            api_base_url: format!("https://connectapi.{domain}"),
            consumer_url: DEFAULT_CONSUMER_URL.to_string(),
        }
    }

    pub fn from_env() -> Result<Self, GarminError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function. This avoids mutating global environment in tests and keeps
    /// `from_env()` small and safe.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, GarminError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let domain = get("GARMIN_DOMAIN").unwrap_or_else(|| DEFAULT_DOMAIN.into());
        if domain.trim().is_empty() || domain.contains('/') {
            return Err(GarminError::Config(format!(
                "GARMIN_DOMAIN must be a bare host name, got {domain:?}"
            )));
        }
        let mut cfg = Self::for_domain(domain.trim());
        if let Some(sso) = get("GARMIN_SSO_URL") {
            cfg.sso_base_url = sso.trim_end_matches('/').to_string();
        }
        if let Some(api) = get("GARMIN_API_URL") {
            cfg.api_base_url = api.trim_end_matches('/').to_string();
        }
        if let Some(consumer) = get("GARMIN_OAUTH_CONSUMER_URL") {
            cfg.consumer_url = consumer;
        }
        Ok(cfg)
    }

    /// Build a config whose every endpoint lives under one base URL.
    /// Used against local mock servers.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            domain: DEFAULT_DOMAIN.to_string(),
            sso_base_url: base.to_string(),
            api_base_url: base.to_string(),
            consumer_url: format!("{base}/oauth_consumer.json"),
        }
    }
}
