//! HTTP client implementation for Garmin Connect.
//!
//! This module provides a reqwest-based implementation of the [`GarminClient`](crate::GarminClient) trait.
//! Sign-in goes through the SSO embed widget; the resulting service ticket is
//! traded for an OAuth1 token, which in turn is exchanged for the short-lived
//! OAuth2 bearer token used on `connectapi`.

use crate::config::Config;
use crate::oauth1::OAuthConsumer;
use crate::retry::RetryPolicy;
use crate::tokens::{OAuth1Token, OAuth2Token, StoredSession, TokenStore};
use crate::{GarminClient, GarminError, LoginOutcome, MfaChallenge, SocialProfile, sso};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use reqwest::header::{AUTHORIZATION, REFERER};
use reqwest::{StatusCode, Url};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tokio::sync::{OnceCell, RwLock};

const USER_AGENT: &str = "com.garmin.android.apps.connectmobile";
const ACTIVITY_PAGE_SIZE: usize = 20;

/// Client for Garmin Connect using reqwest.
#[derive(Debug)]
pub struct ReqwestGarminClient {
    config: Config,
    email: String,
    password: SecretString,
    client: reqwest::Client,
    consumer: OnceCell<OAuthConsumer>,
    session: RwLock<Option<StoredSession>>,
    token_store: Option<TokenStore>,
    retry: RetryPolicy,
}

impl ReqwestGarminClient {
    /// Create a new, signed-out client.
    ///
    /// # Arguments
    /// * `config` - Endpoints of the Garmin deployment to talk to
    /// * `email` - Garmin account email
    /// * `password` - Garmin account password
    pub fn new(
        config: Config,
        email: impl Into<String>,
        password: SecretString,
    ) -> Result<Self, GarminError> {
        let client = reqwest::Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            config,
            email: email.into(),
            password,
            client,
            consumer: OnceCell::new(),
            session: RwLock::new(None),
            token_store: None,
            retry: RetryPolicy::default(),
        })
    }

    /// Persist tokens to `store` after sign-in and reuse them on later runs.
    pub fn with_token_store(mut self, store: TokenStore) -> Self {
        self.token_store = Some(store);
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn is_authenticated(&self) -> bool {
        self.session.read().await.is_some()
    }

    /// Display name of the signed-in user, used in several API paths.
    pub async fn display_name(&self) -> Result<String, GarminError> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|s| s.display_name.clone())
            .ok_or_else(not_signed_in)
    }

    /// Try to resume a cached session. Returns `Ok(false)` when there is no
    /// usable cache and a full [`login`](Self::login) is needed.
    pub async fn restore_session(&self) -> Result<bool, GarminError> {
        let Some(store) = &self.token_store else {
            return Ok(false);
        };
        let stored = match store.load().await {
            Ok(Some(stored)) => stored,
            Ok(None) => return Ok(false),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable garmin token cache");
                return Ok(false);
            }
        };
        *self.session.write().await = Some(stored);

        let verified = match self.access_token().await {
            Ok(token) => self.fetch_social_profile(&token).await.map(|_| ()),
            Err(e) => Err(e),
        };
        match verified {
            Ok(()) => {
                tracing::info!(path = %store.path().display(), "resumed cached garmin session");
                Ok(true)
            }
            Err(e) if e.is_auth() => {
                tracing::warn!("cached garmin session was rejected; signing in again");
                *self.session.write().await = None;
                if let Err(e) = store.clear().await {
                    tracing::warn!(error = %e, "could not remove stale garmin token cache");
                }
                Ok(false)
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not verify cached garmin session; signing in again");
                *self.session.write().await = None;
                Ok(false)
            }
        }
    }

    /// Sign in with email and password.
    pub async fn login(&self) -> Result<LoginOutcome, GarminError> {
        let sso_base = &self.config.sso_base_url;
        let embed_url = format!("{sso_base}/sso/embed");
        let signin_url = format!("{sso_base}/sso/signin");
        let signin_params = sso::signin_params(sso_base);

        // Establishes the SSO cookies.
        self.execute_text(
            self.client
                .get(&embed_url)
                .query(&sso::embed_params(sso_base)),
        )
        .await?;

        let page = self
            .execute_text(
                self.client
                    .get(&signin_url)
                    .query(&signin_params)
                    .header(REFERER, &embed_url),
            )
            .await?;
        let csrf = sso::extract_csrf(&page)?;

        let form = [
            ("username", self.email.as_str()),
            ("password", self.password.expose_secret()),
            ("embed", "true"),
            ("_csrf", csrf.as_str()),
        ];
        let page = self
            .execute_text(
                self.client
                    .post(&signin_url)
                    .query(&signin_params)
                    .header(REFERER, &signin_url)
                    .form(&form),
            )
            .await?;

        let title = sso::extract_title(&page)?;
        if sso::is_mfa_title(&title) {
            tracing::info!("garmin sso requested a two-factor code");
            let csrf = sso::extract_csrf(&page)?;
            return Ok(LoginOutcome::MfaRequired(MfaChallenge { csrf }));
        }

        self.complete_sso(&page).await?;
        Ok(LoginOutcome::Authenticated)
    }

    /// Finish a sign-in that returned [`LoginOutcome::MfaRequired`].
    pub async fn resume_login(&self, challenge: MfaChallenge, code: &str) -> Result<(), GarminError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(GarminError::InvalidInput("MFA code must not be empty".into()));
        }
        let sso_base = &self.config.sso_base_url;
        let signin_url = format!("{sso_base}/sso/signin");
        let verify_url = format!("{sso_base}/sso/verifyMFA/loginEnterMfaCode");

        let form = [
            ("mfa-code", code),
            ("embed", "true"),
            ("_csrf", challenge.csrf.as_str()),
            ("fromPage", "setupEnterMfaCode"),
        ];
        let page = self
            .execute_text(
                self.client
                    .post(&verify_url)
                    .query(&sso::signin_params(sso_base))
                    .header(REFERER, &signin_url)
                    .form(&form),
            )
            .await?;
        self.complete_sso(&page).await
    }

    /// Turn a successful SSO page into an authenticated session.
    async fn complete_sso(&self, page: &str) -> Result<(), GarminError> {
        let title = sso::extract_title(page)?;
        if title != sso::SUCCESS_TITLE {
            return Err(GarminError::Auth(format!(
                "garmin sso returned {title:?}; check the credentials or MFA code"
            )));
        }
        let ticket = sso::extract_ticket(page)?;

        let consumer = self.consumer().await?;
        let oauth1 = self.preauthorize(consumer, &ticket).await?;
        let oauth2 = self.exchange(consumer, &oauth1).await?;
        let profile = self.fetch_social_profile(&oauth2.access_token).await?;
        tracing::info!(display_name = %profile.display_name, "signed in to garmin connect");

        let session = StoredSession {
            oauth1,
            oauth2,
            display_name: profile.display_name,
        };
        *self.session.write().await = Some(session.clone());
        self.persist(&session).await;
        Ok(())
    }

    async fn consumer(&self) -> Result<&OAuthConsumer, GarminError> {
        self.consumer
            .get_or_try_init(|| async {
                self.execute_json::<OAuthConsumer>(self.client.get(&self.config.consumer_url))
                    .await
            })
            .await
    }

    async fn preauthorize(
        &self,
        consumer: &OAuthConsumer,
        ticket: &str,
    ) -> Result<OAuth1Token, GarminError> {
        let login_url = format!("{}/sso/embed", self.config.sso_base_url);
        let mut url = self.api_url("/oauth-service/oauth/preauthorized")?;
        url.query_pairs_mut()
            .append_pair("ticket", ticket)
            .append_pair("login-url", &login_url)
            .append_pair("accepts-mfa-tokens", "true");

        let header = consumer.authorization_header("GET", &url, None, &[]);
        let body = self
            .execute_text(self.client.get(url).header(AUTHORIZATION, header))
            .await?;
        serde_urlencoded::from_str(&body)
            .map_err(|e| GarminError::Decode(format!("oauth1 token response: {e}")))
    }

    async fn exchange(
        &self,
        consumer: &OAuthConsumer,
        oauth1: &OAuth1Token,
    ) -> Result<OAuth2Token, GarminError> {
        let url = self.api_url("/oauth-service/oauth/exchange/user/2.0")?;
        let form: Vec<(String, String)> = oauth1
            .mfa_token
            .iter()
            .map(|t| ("mfa_token".to_string(), t.clone()))
            .collect();
        let header = consumer.authorization_header(
            "POST",
            &url,
            Some((
                oauth1.oauth_token.as_str(),
                oauth1.oauth_token_secret.as_str(),
            )),
            &form,
        );
        let token: OAuth2Token = self
            .execute_json(self.client.post(url).header(AUTHORIZATION, header).form(&form))
            .await?;
        Ok(token.stamped(Utc::now().timestamp()))
    }

    async fn fetch_social_profile(&self, access_token: &str) -> Result<SocialProfile, GarminError> {
        let url = self.api_url("/userprofile-service/socialProfile")?;
        self.execute_json(self.client.get(url).bearer_auth(access_token))
            .await
    }

    /// Current bearer token, re-exchanged from the OAuth1 token once expired.
    async fn access_token(&self) -> Result<String, GarminError> {
        let now = Utc::now().timestamp();
        {
            let guard = self.session.read().await;
            match guard.as_ref() {
                None => return Err(not_signed_in()),
                Some(s) if !s.oauth2.is_expired_at(now) => return Ok(s.oauth2.access_token.clone()),
                Some(_) => {}
            }
        }

        let mut guard = self.session.write().await;
        let Some(session) = guard.as_mut() else {
            return Err(not_signed_in());
        };
        if !session.oauth2.is_expired_at(now) {
            return Ok(session.oauth2.access_token.clone());
        }
        tracing::info!("garmin access token expired; exchanging oauth1 token");
        let consumer = self.consumer().await?;
        session.oauth2 = self.exchange(consumer, &session.oauth1).await?;
        let snapshot = session.clone();
        drop(guard);

        self.persist(&snapshot).await;
        Ok(snapshot.oauth2.access_token)
    }

    async fn persist(&self, session: &StoredSession) {
        if let Some(store) = &self.token_store {
            if let Err(e) = store.save(session).await {
                tracing::warn!(error = %e, path = %store.path().display(), "could not cache garmin tokens");
            }
        }
    }

    fn api_url(&self, path: &str) -> Result<Url, GarminError> {
        Url::parse(&format!("{}{}", self.config.api_base_url, path))
            .map_err(|e| GarminError::Config(format!("invalid api url for {path}: {e}")))
    }

    /// Authenticated GET against `connectapi`, retried on transient statuses.
    /// Returns `Ok(None)` for 204 responses and empty bodies.
    async fn api_get(&self, path: &str, query: &[(&str, String)]) -> Result<Option<Value>, GarminError> {
        let url = format!("{}{}", self.config.api_base_url, path);
        let url = url.as_str();
        self.retry
            .retry_async_when(
                move || self.api_get_once(url, path, query),
                GarminError::is_retryable,
            )
            .await
    }

    async fn api_get_once(
        &self,
        url: &str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<Option<Value>, GarminError> {
        let token = self.access_token().await?;
        let resp = self
            .client
            .get(url)
            .query(query)
            .bearer_auth(&token)
            .send()
            .await?;
        let status = resp.status();
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(self.error_from_response(resp).await);
        }
        let text = resp.text().await?;
        if text.trim().is_empty() {
            return Ok(None);
        }
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|e| GarminError::Decode(format!("{path}: {e}")))
    }

    /// Execute a request and expect a JSON response.
    async fn execute_json<T: serde::de::DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, GarminError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }
        Ok(resp.json::<T>().await?)
    }

    /// Execute a request and expect a text response.
    async fn execute_text(&self, request: reqwest::RequestBuilder) -> Result<String, GarminError> {
        let resp = request.send().await?;
        if !resp.status().is_success() {
            return Err(self.error_from_response(resp).await);
        }
        Ok(resp.text().await?)
    }

    /// Extract error information from a failed response.
    async fn error_from_response(&self, resp: reqwest::Response) -> GarminError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();

        match status {
            429 => GarminError::RateLimited(format!(
                "Garmin is rate limiting requests; wait 5-10 minutes before trying again ({body_snippet})"
            )),
            _ => GarminError::from_status(status, body_snippet),
        }
    }

    async fn get_object(&self, path: &str, query: &[(&str, String)]) -> Result<Value, GarminError> {
        Ok(self.api_get(path, query).await?.unwrap_or(Value::Null))
    }
}

fn not_signed_in() -> GarminError {
    GarminError::Auth("not signed in to garmin connect".into())
}

#[async_trait]
impl GarminClient for ReqwestGarminClient {
    async fn get_user_summary(&self, date: NaiveDate) -> Result<Value, GarminError> {
        let display_name = self.display_name().await?;
        let path = format!("/usersummary-service/usersummary/daily/{display_name}");
        self.get_object(&path, &[("calendarDate", date.to_string())])
            .await
    }

    async fn get_body_composition(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value, GarminError> {
        self.get_object(
            "/weight-service/weight/dateRange",
            &[("startDate", start.to_string()), ("endDate", end.to_string())],
        )
        .await
    }

    async fn get_blood_pressure(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Value, GarminError> {
        let path = format!("/bloodpressure-service/bloodpressure/range/{start}/{end}");
        self.get_object(&path, &[("includeAll", "true".to_string())])
            .await
    }

    async fn get_sleep_data(&self, date: NaiveDate) -> Result<Value, GarminError> {
        let display_name = self.display_name().await?;
        let path = format!("/wellness-service/wellness/dailySleepData/{display_name}");
        self.get_object(
            &path,
            &[
                ("date", date.to_string()),
                ("nonSleepBufferMinutes", "60".to_string()),
            ],
        )
        .await
    }

    async fn get_activities_by_date(
        &self,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Vec<Value>, GarminError> {
        let mut activities = Vec::new();
        let mut offset = 0usize;
        loop {
            let page = self
                .api_get(
                    "/activitylist-service/activities/search/activities",
                    &[
                        ("startDate", start.to_string()),
                        ("endDate", end.to_string()),
                        ("start", offset.to_string()),
                        ("limit", ACTIVITY_PAGE_SIZE.to_string()),
                    ],
                )
                .await?;
            let items = match page {
                None | Some(Value::Null) => Vec::new(),
                Some(Value::Array(items)) => items,
                Some(other) => {
                    return Err(GarminError::Decode(format!(
                        "expected an activity list, got {other}"
                    )));
                }
            };
            let count = items.len();
            activities.extend(items);
            if count < ACTIVITY_PAGE_SIZE {
                break;
            }
            offset += count;
        }
        Ok(activities)
    }

    async fn get_training_status(&self, date: NaiveDate) -> Result<Value, GarminError> {
        let path = format!("/metrics-service/metrics/trainingstatus/aggregated/{date}");
        self.get_object(&path, &[]).await
    }

    async fn get_hrv_data(&self, date: NaiveDate) -> Result<Option<Value>, GarminError> {
        let path = format!("/hrv-service/hrv/{date}");
        self.api_get(&path, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ReqwestGarminClient {
        ReqwestGarminClient::new(
            Config::with_base_url("http://localhost"),
            "someone@example.com",
            SecretString::new("pw".into()),
        )
        .expect("client")
    }

    #[tokio::test]
    async fn new_client_is_signed_out() {
        let c = client();
        assert!(!c.is_authenticated().await);
        assert!(c.display_name().await.unwrap_err().is_auth());
    }

    #[tokio::test]
    async fn api_calls_require_sign_in() {
        let c = client().with_retry_policy(RetryPolicy::none());
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).expect("date");
        let err = c.get_training_status(date).await.unwrap_err();
        assert!(err.is_auth());
    }

    #[tokio::test]
    async fn restore_without_store_needs_login() {
        assert!(!client().restore_session().await.expect("restore"));
    }

    #[test]
    fn debug_hides_password() {
        let out = format!("{:?}", client());
        assert!(!out.contains("\"pw\""));
    }

    #[test]
    fn api_url_joins_base_and_path() {
        let url = client().api_url("/hrv-service/hrv/2025-03-01").expect("url");
        assert_eq!(url.as_str(), "http://localhost/hrv-service/hrv/2025-03-01");
    }
}
