//! OAuth2 credentials and access tokens
//!
//! Supports service account keys (a signed RS256 JWT exchanged for a token)
//! and the `authorized_user` refresh token written by
//! `earthengine authenticate`. Tokens are cached until shortly before they
//! expire.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use eeu_core::{Error, Profile, Result};
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

/// Google OAuth2 token endpoint
pub const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Scopes requested for Earth Engine access
pub const SCOPES: &str =
    "https://www.googleapis.com/auth/earthengine https://www.googleapis.com/auth/cloud-platform";

/// Refresh tokens this long before they expire
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Lifetime requested for service account assertions
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Installed-app OAuth client of the `earthengine` command line tool
///
/// Its credentials file stores only the refresh token.
pub const EARTHENGINE_CLIENT_ID: &str =
    "517222506229-vsmmajv00ul0bs7p89v5m89qs8eb9359.apps.googleusercontent.com";
pub const EARTHENGINE_CLIENT_SECRET: &str = "RUP0RZ6e0pPhDzsqIJ7KlNd1";

fn default_token_uri() -> String {
    TOKEN_URI.to_string()
}

fn default_client_id() -> String {
    EARTHENGINE_CLIENT_ID.to_string()
}

fn default_client_secret() -> String {
    EARTHENGINE_CLIENT_SECRET.to_string()
}

/// A service account JSON key
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("project_id", &self.project_id)
            .finish_non_exhaustive()
    }
}

/// User credentials holding a refresh token
#[derive(Clone, Deserialize)]
pub struct AuthorizedUser {
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_client_secret")]
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default, alias = "quota_project_id")]
    pub project: Option<String>,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl std::fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("project", &self.project)
            .finish_non_exhaustive()
    }
}

/// Where access tokens come from
#[derive(Debug, Clone)]
pub enum Credentials {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUser),
    /// A pre-issued bearer token, used as is
    AccessToken(String),
}

impl Credentials {
    /// Parse a service account key or authorized-user credentials document
    pub fn from_json(json: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let kind = value.get("type").and_then(|t| t.as_str());
        match kind {
            Some("service_account") => Ok(Credentials::ServiceAccount(serde_json::from_value(
                value,
            )?)),
            Some("authorized_user") => Ok(Credentials::AuthorizedUser(serde_json::from_value(
                value,
            )?)),
            None if value.get("refresh_token").is_some() => Ok(Credentials::AuthorizedUser(
                serde_json::from_value(value)?,
            )),
            None if value.get("private_key").is_some() => Ok(Credentials::ServiceAccount(
                serde_json::from_value(value)?,
            )),
            other => Err(Error::Auth(format!(
                "Unsupported credential type: {}",
                other.unwrap_or("unknown")
            ))),
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Auth(format!(
                "Cannot read credentials {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&content)
    }

    /// Credentials file written by `earthengine authenticate`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("earthengine").join("credentials"))
    }

    /// Pick credentials for a profile
    ///
    /// Inline key JSON wins over a key file, which wins over the
    /// `earthengine authenticate` credentials.
    pub fn from_profile(profile: &Profile) -> Result<Self> {
        let credentials = if let Some(json) = &profile.credential_json {
            Self::from_json(json)?
        } else if let Some(path) = &profile.credential_path {
            Self::from_file(Path::new(path))?
        } else {
            match Self::default_path().filter(|p| p.exists()) {
                Some(path) => {
                    tracing::debug!("Using credentials from {}", path.display());
                    Self::from_file(&path)?
                }
                None => {
                    return Err(Error::Auth(
                        "No credentials found. Set GEE_JSON or GOOGLE_APPLICATION_CREDENTIALS, or run `earthengine authenticate`".into(),
                    ));
                }
            }
        };

        if let (Some(expected), Credentials::ServiceAccount(key)) =
            (&profile.service_account, &credentials)
            && expected != &key.client_email
        {
            tracing::warn!(
                "Service account {expected} does not match key for {}",
                key.client_email
            );
        }
        Ok(credentials)
    }

    /// Project recorded in the credentials, if any
    pub fn project_id(&self) -> Option<&str> {
        match self {
            Credentials::ServiceAccount(key) => key.project_id.as_deref(),
            Credentials::AuthorizedUser(user) => user.project.as_deref(),
            Credentials::AccessToken(_) => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    3600
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + REFRESH_MARGIN < self.expires_at
    }
}

/// Hands out bearer tokens, fetching new ones when the cached one is stale
#[derive(Debug)]
pub struct TokenProvider {
    http: Client,
    credentials: Credentials,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenProvider {
    pub fn new(http: Client, credentials: Credentials) -> Self {
        Self {
            http,
            credentials,
            cache: RwLock::new(None),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// A valid access token
    pub async fn token(&self) -> Result<String> {
        if let Credentials::AccessToken(token) = &self.credentials {
            return Ok(token.clone());
        }

        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
                return Ok(cached.token.clone());
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(cached) = cache.as_ref().filter(|c| c.is_fresh()) {
            return Ok(cached.token.clone());
        }
        let fresh = self.fetch().await?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    async fn fetch(&self) -> Result<CachedToken> {
        let (token_uri, form) = match &self.credentials {
            Credentials::ServiceAccount(key) => {
                let assertion = sign_assertion(key)?;
                tracing::debug!("Requesting token for {}", key.client_email);
                (
                    key.token_uri.as_str(),
                    vec![
                        ("grant_type", "urn:ietf:params:oauth:grant-type:jwt-bearer".to_string()),
                        ("assertion", assertion),
                    ],
                )
            }
            Credentials::AuthorizedUser(user) => {
                tracing::debug!("Refreshing user token");
                (
                    user.token_uri.as_str(),
                    vec![
                        ("grant_type", "refresh_token".to_string()),
                        ("client_id", user.client_id.clone()),
                        ("client_secret", user.client_secret.clone()),
                        ("refresh_token", user.refresh_token.clone()),
                    ],
                )
            }
            Credentials::AccessToken(token) => {
                return Ok(CachedToken {
                    token: token.clone(),
                    expires_at: Instant::now() + Duration::from_secs(default_expires_in()),
                });
            }
        };

        let response = self
            .http
            .post(token_uri)
            .form(&form)
            .send()
            .await
            .map_err(|e| Error::Network(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::Auth(format!(
                "Token request rejected (HTTP {}): {body}",
                status.as_u16()
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("Invalid token response: {e}")))?;

        Ok(CachedToken {
            token: token.access_token,
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        })
    }
}

/// Build the RS256 JWT a service account trades for an access token
fn sign_assertion(key: &ServiceAccountKey) -> Result<String> {
    let now = jiff::Timestamp::now().as_second();
    let claims = AssertionClaims {
        iss: &key.client_email,
        scope: SCOPES,
        aud: &key.token_uri,
        iat: now,
        exp: now + ASSERTION_LIFETIME_SECS,
    };

    let mut header = Header::new(Algorithm::RS256);
    header.kid = key.private_key_id.clone();

    let encoding_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
        .map_err(|e| Error::Auth(format!("Invalid service account private key: {e}")))?;

    encode(&header, &claims, &encoding_key)
        .map_err(|e| Error::Auth(format!("Failed to sign token request: {e}")))
}
