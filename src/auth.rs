//! Google OAuth session for the calendar client.
//!
//! `glance auth` walks the OAuth 2.0 device flow once on a keyboard-
//! having machine and stores the grant; at run time [`Session::load_valid`]
//! hands out a bearer token, refreshing it shortly before expiry.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::config::{self, CalendarConfig};

const DEVICE_CODE_URL: &str = "https://oauth2.googleapis.com/device/code";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SCOPE: &str = "https://www.googleapis.com/auth/calendar.readonly";
const DEVICE_GRANT: &str = "urn:ietf:params:oauth:grant-type:device_code";

/// Refresh this close to expiry instead of racing the deadline.
const EXPIRY_MARGIN: time::Duration = time::Duration::seconds(30);

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// `calendar.client_id` / `client_secret` are empty in the config.
    #[error("no OAuth client configured; set calendar.client_id and client_secret")]
    NoClient,

    /// Nothing stored yet; `glance auth` has not been run.
    #[error("no stored token at {path}; run `glance auth` first")]
    NotAuthorized { path: PathBuf },

    #[error("failed to read token file {path}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse token file {path}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("failed to write token file {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize token data")]
    Serialize(#[from] toml::ser::Error),

    #[error("request to the OAuth endpoint failed")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered, but not with a usable grant.
    #[error("OAuth endpoint refused the request: {0}")]
    Endpoint(String),

    /// The user declined, or the device code expired unapproved.
    #[error("device sign-in failed: {0}")]
    Denied(String),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

/// The stored grant, a small TOML file owned by the appliance user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenData {
    access_token: String,
    refresh_token: String,
    #[serde(with = "time::serde::rfc3339")]
    expires_at: OffsetDateTime,
}

impl TokenData {
    fn from_grant(access_token: String, refresh_token: String, expires_in: i64) -> Self {
        Self {
            access_token,
            refresh_token,
            expires_at: OffsetDateTime::now_utc() + time::Duration::seconds(expires_in),
        }
    }

    pub fn load(path: &Path) -> Result<Self, AuthError> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(source) if source.kind() == std::io::ErrorKind::NotFound => {
                return Err(AuthError::NotAuthorized {
                    path: path.to_path_buf(),
                })
            }
            Err(source) => {
                return Err(AuthError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        toml::from_str(&contents).map_err(|source| AuthError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    fn save(&self, path: &Path) -> Result<(), AuthError> {
        let write_err = |source| AuthError::Write {
            path: path.to_path_buf(),
            source,
        };
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        std::fs::write(path, contents).map_err(write_err)?;

        // Owner-only, the file holds live OAuth tokens.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600)).map_err(write_err)?;
        }
        Ok(())
    }

    pub fn expires_at(&self) -> OffsetDateTime {
        self.expires_at
    }
}

/// What the token endpoint answers while polling and on refresh. Error
/// responses arrive with 4xx statuses but the same JSON shape, so every
/// field is optional and sorted out after parsing.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
    error_description: Option<String>,
}

impl TokenResponse {
    fn describe(&self, fallback: &str) -> String {
        let error = self.error.as_deref().unwrap_or(fallback);
        match self.error_description.as_deref() {
            Some(description) => format!("{error}: {description}"),
            None => error.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeviceAuthorization {
    device_code: String,
    user_code: String,
    // Google says verification_url, RFC 8628 says verification_uri.
    #[serde(alias = "verification_uri")]
    verification_url: String,
    expires_in: u64,
    interval: u64,
}

/// A usable bearer token plus the pieces needed to refresh it.
pub struct Session {
    http: reqwest::Client,
    client_id: String,
    client_secret: String,
    path: PathBuf,
    data: TokenData,
}

impl Session {
    /// Loads the stored grant, refreshing and persisting it when it is
    /// within [`EXPIRY_MARGIN`] of expiry.
    pub async fn load_valid(config: &CalendarConfig) -> Result<Self, AuthError> {
        if config.client_id.is_empty() || config.client_secret.is_empty() {
            return Err(AuthError::NoClient);
        }
        let path = config::token_path()?;
        let data = TokenData::load(&path)?;
        let mut session = Self {
            http: reqwest::Client::new(),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            path,
            data,
        };
        if session.is_expiring() {
            session.refresh().await?;
        }
        Ok(session)
    }

    pub fn access_token(&self) -> &str {
        &self.data.access_token
    }

    fn is_expiring(&self) -> bool {
        self.data.expires_at - OffsetDateTime::now_utc() < EXPIRY_MARGIN
    }

    async fn refresh(&mut self) -> Result<(), AuthError> {
        let response = self
            .http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("refresh_token", self.data.refresh_token.as_str()),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;
        let parsed: TokenResponse = response.json().await?;
        if parsed.error.is_some() {
            return Err(AuthError::Endpoint(parsed.describe("refresh failed")));
        }
        let access_token = parsed
            .access_token
            .ok_or_else(|| AuthError::Endpoint("refresh response carried no access token".into()))?;

        self.data.access_token = access_token;
        // Google does not usually hand back a new refresh token here.
        if let Some(refresh_token) = parsed.refresh_token {
            self.data.refresh_token = refresh_token;
        }
        self.data.expires_at =
            OffsetDateTime::now_utc() + time::Duration::seconds(parsed.expires_in.unwrap_or(3600));
        self.data.save(&self.path)?;
        Ok(())
    }
}

/// Interactive device-flow sign-in for `glance auth`: print the
/// verification URL and user code, then poll until approved.
pub async fn device_flow(config: &CalendarConfig) -> Result<(), AuthError> {
    if config.client_id.is_empty() || config.client_secret.is_empty() {
        return Err(AuthError::NoClient);
    }
    let http = reqwest::Client::new();

    let response = http
        .post(DEVICE_CODE_URL)
        .form(&[("client_id", config.client_id.as_str()), ("scope", SCOPE)])
        .send()
        .await?;
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::Endpoint(format!("{status}: {body}")));
    }
    let authorization: DeviceAuthorization = response.json().await?;

    println!("On another device, visit:\n\n  {}\n", authorization.verification_url);
    println!("and enter the code:\n\n  {}\n", authorization.user_code);
    println!("Waiting for approval...");

    let mut interval = Duration::from_secs(authorization.interval.max(1));
    let deadline = tokio::time::Instant::now() + Duration::from_secs(authorization.expires_in);
    loop {
        tokio::time::sleep(interval).await;
        if tokio::time::Instant::now() >= deadline {
            return Err(AuthError::Denied("the device code expired before approval".into()));
        }

        let response = http
            .post(TOKEN_URL)
            .form(&[
                ("client_id", config.client_id.as_str()),
                ("client_secret", config.client_secret.as_str()),
                ("device_code", authorization.device_code.as_str()),
                ("grant_type", DEVICE_GRANT),
            ])
            .send()
            .await?;
        let parsed: TokenResponse = response.json().await?;

        match parsed.error.as_deref() {
            Some("authorization_pending") => continue,
            Some("slow_down") => {
                interval += Duration::from_secs(5);
            }
            Some(_) => return Err(AuthError::Denied(parsed.describe("unknown error"))),
            None => {
                let access_token = parsed
                    .access_token
                    .clone()
                    .ok_or_else(|| AuthError::Endpoint("grant carried no access token".into()))?;
                let refresh_token = parsed
                    .refresh_token
                    .clone()
                    .ok_or_else(|| AuthError::Endpoint("grant carried no refresh token".into()))?;
                let data =
                    TokenData::from_grant(access_token, refresh_token, parsed.expires_in.unwrap_or(3600));
                let path = config::token_path()?;
                data.save(&path)?;
                println!("Signed in. Token stored at {}", path.display());
                return Ok(());
            }
        }
    }
}
