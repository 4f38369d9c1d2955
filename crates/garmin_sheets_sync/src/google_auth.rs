//! Google OAuth for the Sheets API: installed-app authorization with PKCE and
//! a loopback redirect, plus a JSON token cache with refresh.

use crate::error::{SyncError, SyncResult};
use oauth2::basic::BasicClient;
use oauth2::reqwest::async_http_client;
use oauth2::{
    AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    RedirectUrl, RefreshToken, Scope, TokenResponse, TokenUrl,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

pub const SHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";
const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
/// Seconds of slack before expiry at which a cached token is refreshed.
const EXPIRY_MARGIN_SECS: i64 = 60;
/// How long an idle loopback connection may sit before it is dropped.
const REDIRECT_READ_TIMEOUT: Duration = Duration::from_secs(120);

/// The `installed` (or `web`) section of a downloaded client secret file.
#[derive(Clone, Deserialize)]
pub struct ClientSecretEntry {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ClientSecretEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSecretEntry")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .finish()
    }
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretEntry>,
    web: Option<ClientSecretEntry>,
}

impl ClientSecretEntry {
    pub fn parse(raw: &str) -> SyncResult<Self> {
        let file: ClientSecretFile = serde_json::from_str(raw)?;
        file.installed.or(file.web).ok_or_else(|| {
            SyncError::GoogleAuth("client secret has neither an 'installed' nor a 'web' section".into())
        })
    }
}

/// Cached Google credentials.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CachedToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("access_token", &"[REDACTED]")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl CachedToken {
    /// Tokens without an expiry are treated as expired.
    pub fn is_valid_at(&self, now: i64) -> bool {
        self.expires_at
            .is_some_and(|exp| exp > now + EXPIRY_MARGIN_SECS)
    }

    fn from_response<T: TokenResponse<oauth2::basic::BasicTokenType>>(
        response: &T,
        previous_refresh: Option<String>,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            access_token: response.access_token().secret().clone(),
            refresh_token: response
                .refresh_token()
                .map(|t| t.secret().clone())
                .or(previous_refresh),
            expires_at: response
                .expires_in()
                .map(|d| now + d.as_secs() as i64),
        }
    }
}

/// Loads, refreshes and obtains Google access tokens.
#[derive(Clone, Debug)]
pub struct GoogleAuthorizer {
    client_secret_path: PathBuf,
    token_path: PathBuf,
}

impl GoogleAuthorizer {
    pub fn new(client_secret_path: impl Into<PathBuf>, token_path: impl Into<PathBuf>) -> Self {
        Self {
            client_secret_path: client_secret_path.into(),
            token_path: token_path.into(),
        }
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    /// A usable access token: cached, refreshed, or freshly authorized.
    pub async fn access_token(&self) -> SyncResult<SecretString> {
        let token = match self.load_token().await? {
            Some(token) if token.is_valid_at(chrono::Utc::now().timestamp()) => token,
            Some(CachedToken {
                refresh_token: Some(refresh),
                ..
            }) => {
                tracing::info!("refreshing Google access token");
                let token = self.refresh(&refresh).await?;
                self.save_token(&token).await?;
                token
            }
            _ => self.authorize().await?,
        };
        Ok(SecretString::new(token.access_token.into()))
    }

    /// Run the browser authorization flow and cache the result.
    pub async fn authorize(&self) -> SyncResult<CachedToken> {
        let secret = self.client_secret().await?;
        let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
        let port = listener.local_addr()?.port();
        let client = oauth_client(&secret)?.set_redirect_uri(
            RedirectUrl::new(format!("http://127.0.0.1:{port}/"))
                .map_err(|e| SyncError::GoogleAuth(format!("invalid redirect url: {e}")))?,
        );

        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();
        let (auth_url, csrf) = client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new(SHEETS_SCOPE.to_string()))
            .add_extra_param("access_type", "offline")
            .add_extra_param("prompt", "consent")
            .set_pkce_challenge(pkce_challenge)
            .url();

        println!("Open this URL in your browser to authorize access to Google Sheets:\n\n{auth_url}\n");
        tracing::info!(port, "waiting for the Google authorization redirect");

        let (code, state) = receive_redirect(&listener).await?;
        if state != *csrf.secret() {
            return Err(SyncError::GoogleAuth(
                "authorization state mismatch; try again".into(),
            ));
        }

        let response = client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(pkce_verifier)
            .request_async(async_http_client)
            .await
            .map_err(|e| SyncError::GoogleAuth(format!("code exchange failed: {e}")))?;
        let token = CachedToken::from_response(&response, None);
        if token.refresh_token.is_none() {
            tracing::warn!("Google did not return a refresh token; authorization will be needed again after expiry");
        }
        self.save_token(&token).await?;
        tracing::info!(path = %self.token_path.display(), "saved Google token");
        Ok(token)
    }

    async fn refresh(&self, refresh_token: &str) -> SyncResult<CachedToken> {
        let secret = self.client_secret().await?;
        let response = oauth_client(&secret)?
            .exchange_refresh_token(&RefreshToken::new(refresh_token.to_string()))
            .request_async(async_http_client)
            .await
            .map_err(|e| SyncError::GoogleTokenRefresh(e.to_string()))?;
        Ok(CachedToken::from_response(
            &response,
            Some(refresh_token.to_string()),
        ))
    }

    async fn client_secret(&self) -> SyncResult<ClientSecretEntry> {
        let raw = tokio::fs::read_to_string(&self.client_secret_path)
            .await
            .map_err(|e| {
                SyncError::GoogleAuth(format!(
                    "cannot read client secret {}: {e}",
                    self.client_secret_path.display()
                ))
            })?;
        ClientSecretEntry::parse(&raw)
    }

    pub async fn load_token(&self) -> SyncResult<Option<CachedToken>> {
        let raw = match tokio::fs::read_to_string(&self.token_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                tracing::warn!(error = %e, path = %self.token_path.display(), "ignoring unreadable Google token cache");
                Ok(None)
            }
        }
    }

    pub async fn save_token(&self, token: &CachedToken) -> SyncResult<()> {
        if let Some(parent) = self.token_path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.token_path, serde_json::to_string_pretty(token)?).await?;
        Ok(())
    }
}

fn oauth_client(secret: &ClientSecretEntry) -> SyncResult<BasicClient> {
    Ok(BasicClient::new(
        ClientId::new(secret.client_id.clone()),
        Some(ClientSecret::new(secret.client_secret.clone())),
        AuthUrl::new(secret.auth_uri.clone())
            .map_err(|e| SyncError::GoogleAuth(format!("invalid auth url: {e}")))?,
        Some(
            TokenUrl::new(secret.token_uri.clone())
                .map_err(|e| SyncError::GoogleAuth(format!("invalid token url: {e}")))?,
        ),
    ))
}

/// Wait for the browser redirect and return its `(code, state)`. Browsers may
/// open extra connections (preconnects, favicon requests), so every
/// connection is served on its own task until one carries the callback.
async fn receive_redirect(listener: &TcpListener) -> SyncResult<(String, String)> {
    let (tx, mut rx) = mpsc::channel(1);
    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, _) = accepted?;
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(result) = serve_redirect(stream).await {
                        let _ = tx.send(result).await;
                    }
                });
            }
            Some(result) = rx.recv() => return result,
        }
    }
}

/// Answer one loopback connection. `None` when it was not the callback.
async fn serve_redirect(mut stream: TcpStream) -> Option<SyncResult<(String, String)>> {
    let mut request_line = String::new();
    let read = tokio::time::timeout(
        REDIRECT_READ_TIMEOUT,
        BufReader::new(&mut stream).read_line(&mut request_line),
    )
    .await;
    if !matches!(read, Ok(Ok(n)) if n > 0) {
        return None;
    }
    if !is_callback(&request_line) {
        tracing::debug!(request = request_line.trim(), "ignoring request on the authorization listener");
        let _ = write_response(&mut stream, "404 Not Found", "Not found").await;
        return None;
    }

    let parsed = parse_redirect(&request_line);
    let body = match &parsed {
        Ok(_) => "Authorization complete. You can close this window.",
        Err(_) => "Authorization failed. Check the terminal for details.",
    };
    if let Err(e) = write_response(&mut stream, "200 OK", body).await {
        tracing::debug!(error = %e, "could not answer the authorization redirect");
    }
    Some(parsed)
}

async fn write_response(stream: &mut TcpStream, status: &str, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {status}\r\ncontent-type: text/plain\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes()).await?;
    stream.shutdown().await
}

fn redirect_url(request_line: &str) -> SyncResult<reqwest::Url> {
    let target = request_line
        .split_whitespace()
        .nth(1)
        .ok_or_else(|| SyncError::GoogleAuth("malformed redirect request".into()))?;
    reqwest::Url::parse(&format!("http://127.0.0.1{target}"))
        .map_err(|e| SyncError::GoogleAuth(format!("malformed redirect url: {e}")))
}

/// True when the request carries an authorization `code` or `error`.
fn is_callback(request_line: &str) -> bool {
    redirect_url(request_line)
        .is_ok_and(|url| url.query_pairs().any(|(key, _)| key == "code" || key == "error"))
}

/// Pull `code` and `state` out of `GET /?code=..&state=.. HTTP/1.1`.
pub fn parse_redirect(request_line: &str) -> SyncResult<(String, String)> {
    let url = redirect_url(request_line)?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => {
                return Err(SyncError::GoogleAuth(format!(
                    "authorization denied: {value}"
                )));
            }
            _ => {}
        }
    }
    match (code, state) {
        (Some(code), Some(state)) => Ok((code, state)),
        _ => Err(SyncError::GoogleAuth(
            "redirect is missing the code or state parameter".into(),
        )),
    }
}
