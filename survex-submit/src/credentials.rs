use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::{SheetsConfig, SubmitError};

pub const SCOPES: &[&str] = &["https://www.googleapis.com/auth/spreadsheets"];

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_SKEW_SECS: i64 = 60;

/// Source of bearer tokens for the spreadsheet API
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, SubmitError>;
}

/// Fixed bearer token, for service tokens minted elsewhere.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn access_token(&self) -> Result<String, SubmitError> {
        Ok(self.0.clone())
    }
}

/// Contents of the token file, in the authorized-user layout written by the
/// Google client libraries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub scopes: Vec<String>,
    #[serde(default)]
    pub expiry: Option<DateTime<Utc>>,
}

impl AuthorizedUser {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        self.token.is_some()
            && self
                .expiry
                .is_none_or(|exp| exp - ChronoDuration::seconds(EXPIRY_SKEW_SECS) > now)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.is_some()
    }

    pub async fn read(path: &Path) -> Result<Option<Self>, SubmitError> {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => serde_json::from_str(&text)
                .map(Some)
                .map_err(|e| SubmitError::TokenFile(format!("{}: {e}", path.display()))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SubmitError::TokenFile(format!("{}: {e}", path.display()))),
        }
    }

    pub async fn write(&self, path: &Path) -> Result<(), SubmitError> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| SubmitError::TokenFile(e.to_string()))?;
        tokio::fs::write(path, text)
            .await
            .map_err(|e| SubmitError::TokenFile(format!("{}: {e}", path.display())))
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

/// Installed-app OAuth client: consent URL, code exchange and refresh
#[derive(Debug, Clone)]
pub struct OAuthClient {
    http: reqwest::Client,
    client_id: Option<String>,
    client_secret: Option<String>,
    token_uri: String,
    auth_uri: String,
    redirect_uri: String,
}

impl OAuthClient {
    pub fn new(config: &SheetsConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            token_uri: config.token_uri.clone(),
            auth_uri: config.auth_uri.clone(),
            redirect_uri: config.redirect_uri.clone(),
        }
    }

    pub fn authorization_url(&self) -> Result<Url, SubmitError> {
        let client_id = self.require_client_id()?;
        let scope = SCOPES.join(" ");
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("client_id", client_id),
                ("redirect_uri", self.redirect_uri.as_str()),
                ("response_type", "code"),
                ("scope", scope.as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| SubmitError::NotConfigured(format!("auth URI: {e}")))
    }

    /// Trades the code from the consent redirect for a refreshable token.
    pub async fn exchange_code(&self, code: &str) -> Result<AuthorizedUser, SubmitError> {
        let client_id = self.require_client_id()?;
        let client_secret = self.require_client_secret()?;
        let response = self
            .request_token(
                &self.token_uri,
                &[
                    ("code", code),
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                    ("redirect_uri", self.redirect_uri.as_str()),
                    ("grant_type", "authorization_code"),
                ],
            )
            .await?;

        Ok(AuthorizedUser {
            token: Some(response.access_token),
            refresh_token: response.refresh_token,
            token_uri: Some(self.token_uri.clone()),
            client_id: Some(client_id.to_string()),
            client_secret: Some(client_secret.to_string()),
            scopes: scopes_from(response.scope.as_deref()),
            expiry: expiry_from(response.expires_in),
        })
    }

    /// Client settings stored in the token file take precedence over config.
    pub async fn refresh(&self, user: &AuthorizedUser) -> Result<AuthorizedUser, SubmitError> {
        let refresh_token = user
            .refresh_token
            .as_deref()
            .ok_or_else(|| SubmitError::Authentication("no refresh token".to_string()))?;
        let client_id = match user.client_id.as_deref() {
            Some(id) => id,
            None => self.require_client_id()?,
        };
        let client_secret = match user.client_secret.as_deref() {
            Some(secret) => secret,
            None => self.require_client_secret()?,
        };
        let token_uri = user.token_uri.as_deref().unwrap_or(&self.token_uri);

        let response = self
            .request_token(
                token_uri,
                &[
                    ("client_id", client_id),
                    ("client_secret", client_secret),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await?;

        let mut refreshed = user.clone();
        refreshed.token = Some(response.access_token);
        refreshed.expiry = expiry_from(response.expires_in);
        if let Some(rt) = response.refresh_token {
            refreshed.refresh_token = Some(rt);
        }
        if response.scope.is_some() {
            refreshed.scopes = scopes_from(response.scope.as_deref());
        }
        Ok(refreshed)
    }

    async fn request_token(
        &self,
        token_uri: &str,
        form: &[(&str, &str)],
    ) -> Result<TokenResponse, SubmitError> {
        let resp = self
            .http
            .post(token_uri)
            .form(form)
            .send()
            .await
            .map_err(SubmitError::from_reqwest)?;

        let status = resp.status();
        if status.is_success() {
            resp.json::<TokenResponse>()
                .await
                .map_err(|e| SubmitError::Authentication(format!("bad token response: {e}")))
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(SubmitError::Authentication(format!("HTTP {status}: {body}")))
        }
    }

    fn require_client_id(&self) -> Result<&str, SubmitError> {
        self.client_id
            .as_deref()
            .ok_or_else(|| SubmitError::NotConfigured("GOOGLE_CLIENT_ID is not set".to_string()))
    }

    fn require_client_secret(&self) -> Result<&str, SubmitError> {
        self.client_secret
            .as_deref()
            .ok_or_else(|| SubmitError::NotConfigured("GOOGLE_CLIENT_SECRET is not set".to_string()))
    }
}

fn expiry_from(expires_in: Option<i64>) -> Option<DateTime<Utc>> {
    expires_in.map(|secs| Utc::now() + ChronoDuration::seconds(secs))
}

fn scopes_from(scope: Option<&str>) -> Vec<String> {
    match scope {
        Some(s) => s.split_whitespace().map(str::to_string).collect(),
        None => SCOPES.iter().map(|s| s.to_string()).collect(),
    }
}

/// Token file backed provider: read once, refreshed on expiry, rewritten
/// after every refresh.
pub struct TokenFileProvider {
    path: PathBuf,
    oauth: OAuthClient,
    cached: Mutex<Option<AuthorizedUser>>,
}

impl TokenFileProvider {
    pub fn new(path: impl Into<PathBuf>, oauth: OAuthClient) -> Self {
        Self {
            path: path.into(),
            oauth,
            cached: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the token file ahead of the first submission.
    pub async fn load(&self) -> Result<bool, SubmitError> {
        let user = AuthorizedUser::read(&self.path).await?;
        let found = user.is_some();
        if found {
            info!("Loaded credentials from {}", self.path.display());
        } else {
            warn!(
                "No token file at {}; remote submission needs `survex authorize`",
                self.path.display()
            );
        }
        *self.cached.lock().await = user;
        Ok(found)
    }
}

#[async_trait]
impl CredentialProvider for TokenFileProvider {
    async fn access_token(&self) -> Result<String, SubmitError> {
        let mut cached = self.cached.lock().await;
        if cached.is_none() {
            *cached = AuthorizedUser::read(&self.path).await?;
        }
        let Some(user) = cached.as_ref() else {
            return Err(SubmitError::AuthorizationRequired(self.path.clone()));
        };

        if user.is_valid_at(Utc::now()) {
            if let Some(token) = &user.token {
                return Ok(token.clone());
            }
        }
        if !user.can_refresh() {
            return Err(SubmitError::AuthorizationRequired(self.path.clone()));
        }

        debug!("Access token expired, refreshing");
        let refreshed = self.oauth.refresh(user).await?;
        refreshed.write(&self.path).await?;
        info!("Refreshed access token, saved to {}", self.path.display());
        let token = refreshed
            .token
            .clone()
            .ok_or_else(|| SubmitError::Authentication("refresh returned no token".to_string()))?;
        *cached = Some(refreshed);
        Ok(token)
    }
}
