//! OAuth tokens issued by Garmin's `oauth-service` and an on-disk cache for
//! them, so repeat runs skip the SSO sign-in.

use crate::GarminError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Seconds of slack before `expires_at` at which a token counts as expired.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Long-lived token returned by `oauth/preauthorized`; exchanged for
/// short-lived OAuth2 bearer tokens.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuth1Token {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    #[serde(default)]
    pub mfa_token: Option<String>,
    #[serde(default)]
    pub mfa_expiration_timestamp: Option<String>,
}

impl std::fmt::Debug for OAuth1Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth1Token")
            .field("oauth_token", &"[REDACTED]")
            .field("mfa_token", &self.mfa_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OAuth2Token {
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub jti: Option<String>,
    pub token_type: String,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    /// Unix seconds; filled in locally when the token is received.
    #[serde(default)]
    pub expires_at: i64,
    #[serde(default)]
    pub refresh_token_expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token_expires_at: Option<i64>,
}

impl std::fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("token_type", &self.token_type)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl OAuth2Token {
    /// Record absolute expiry times relative to `now` (unix seconds).
    pub fn stamped(mut self, now: i64) -> Self {
        self.expires_at = now + self.expires_in;
        self.refresh_token_expires_at = self.refresh_token_expires_in.map(|secs| now + secs);
        self
    }

    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at <= now + EXPIRY_MARGIN_SECS
    }
}

/// Everything needed to resume an authenticated session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredSession {
    pub oauth1: OAuth1Token,
    pub oauth2: OAuth2Token,
    pub display_name: String,
}

/// JSON file holding one profile's [`StoredSession`].
#[derive(Clone, Debug)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/garmin_<profile>.json`, with the profile name lower-cased.
    pub fn for_profile(dir: &Path, profile: &str) -> Self {
        Self::new(dir.join(format!("garmin_{}.json", profile.to_lowercase())))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `Ok(None)` when nothing has been cached yet.
    pub async fn load(&self) -> Result<Option<StoredSession>, GarminError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw).map(Some).map_err(|e| {
            GarminError::Decode(format!("token cache {}: {e}", self.path.display()))
        })
    }

    pub async fn save(&self, session: &StoredSession) -> Result<(), GarminError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let body = serde_json::to_string_pretty(session)
            .map_err(|e| GarminError::Decode(e.to_string()))?;
        tokio::fs::write(&self.path, body).await?;
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), GarminError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
