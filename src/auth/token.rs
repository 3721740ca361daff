use crate::auth::clock::{Clock, SystemClock};
use crate::auth::identity::{ApplicationIdentity, GOOGLE_TOKEN_URL};
use crate::auth::transport::{Transport, check_status};
use crate::auth::{AuthorizationProvider, insert_bearer};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::header::HeaderMap;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, info, instrument};

/// Seconds shaved off the advertised lifetime so a token is refreshed
/// slightly before the server would consider it expired.
pub const SAFETY_MARGIN_SECS: i64 = 100;

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    expires_in: Lifetime,
}

/// `expires_in` as sent by the endpoint, either `3600` or `"3600"`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Lifetime {
    Seconds(i64),
    Text(String),
}

impl Lifetime {
    fn seconds(&self) -> Result<i64> {
        match self {
            Lifetime::Seconds(seconds) => Ok(*seconds),
            Lifetime::Text(text) => text.trim().parse().map_err(|_| {
                AppError::InvalidArgument(format!("expires_in is not a number: {:?}", text))
            }),
        }
    }
}

#[derive(Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

/// Exchanges a refresh token for short-lived access tokens on demand.
///
/// Nothing is fetched until the first [`authorization_header`] call. After
/// that the cached access token is reused until its (margin-adjusted) expiry,
/// at which point the next call refreshes it.
///
/// [`authorization_header`]: AuthorizationProvider::authorization_header
pub struct RefreshableToken<'a, T, C = SystemClock> {
    identity: &'a ApplicationIdentity,
    refresh_token: String,
    transport: T,
    clock: C,
    cached: Option<CachedToken>,
}

impl<'a, T> RefreshableToken<'a, T, SystemClock>
where
    T: Transport,
{
    /// The refresh token should be persisted by the caller and reused across
    /// sessions for the same application and user.
    pub fn new(
        identity: &'a ApplicationIdentity,
        refresh_token: impl Into<String>,
        transport: T,
    ) -> Self {
        Self {
            identity,
            refresh_token: refresh_token.into(),
            transport,
            clock: SystemClock,
            cached: None,
        }
    }
}

impl<'a, T, C> RefreshableToken<'a, T, C>
where
    T: Transport,
    C: Clock,
{
    pub fn with_clock<C2: Clock>(self, clock: C2) -> RefreshableToken<'a, T, C2> {
        RefreshableToken {
            identity: self.identity,
            refresh_token: self.refresh_token,
            transport: self.transport,
            clock,
            cached: self.cached,
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.cached.as_ref().map(|cached| cached.expires_at)
    }

    /// Whether the cached access token can be used right now.
    pub fn is_valid(&self) -> bool {
        match &self.cached {
            Some(cached) => self.clock.now() < cached.expires_at,
            None => false,
        }
    }

    async fn valid_access_token(&mut self) -> Result<&str> {
        let now = self.clock.now();
        let needs_refresh = match &self.cached {
            Some(cached) if now < cached.expires_at => {
                debug!(expires_at = %cached.expires_at, "Using cached access token");
                false
            }
            Some(cached) => {
                debug!(expires_at = %cached.expires_at, "Access token expired, refreshing");
                true
            }
            None => {
                info!("No access token yet, fetching one");
                true
            }
        };

        if needs_refresh {
            self.refresh().await?;
        }

        self.cached
            .as_ref()
            .map(|cached| cached.access_token.as_str())
            .ok_or_else(|| AppError::Auth("No access token after refresh".to_string()))
    }

    #[instrument(name = "Refreshing access token", skip_all)]
    async fn refresh(&mut self) -> Result<()> {
        let request_time = self.clock.now();

        let form = [
            ("refresh_token", self.refresh_token.as_str()),
            ("client_id", self.identity.client_id()),
            ("client_secret", self.identity.client_secret()),
            ("grant_type", "refresh_token"),
        ];

        let response = self.transport.post_form(GOOGLE_TOKEN_URL, &form).await?;
        check_status(&response)?;

        let refreshed: RefreshResponse = serde_json::from_str(&response.body)?;
        let expires_at = expiry_from(request_time, refreshed.expires_in.seconds()?)?;

        self.cached = Some(CachedToken {
            access_token: refreshed.access_token,
            expires_at,
        });
        debug!(%expires_at, "Got new access token");

        Ok(())
    }
}

fn expiry_from(request_time: DateTime<Utc>, expires_in: i64) -> Result<DateTime<Utc>> {
    if expires_in <= SAFETY_MARGIN_SECS {
        return Err(AppError::InvalidArgument(format!(
            "Token lifetime of {}s does not exceed the {}s safety margin",
            expires_in, SAFETY_MARGIN_SECS
        )));
    }
    Duration::try_seconds(expires_in - SAFETY_MARGIN_SECS)
        .and_then(|lifetime| request_time.checked_add_signed(lifetime))
        .ok_or_else(|| {
            AppError::InvalidArgument(format!("Token lifetime of {}s is out of range", expires_in))
        })
}

#[async_trait]
impl<'a, T, C> AuthorizationProvider for RefreshableToken<'a, T, C>
where
    T: Transport,
    C: Clock,
{
    async fn authorization_header(&mut self, headers: Option<HeaderMap>) -> Result<HeaderMap> {
        let access_token = self.valid_access_token().await?;
        insert_bearer(headers, access_token)
    }
}

/// Make sure the refresh and access tokens are redacted
impl<T, C> fmt::Debug for RefreshableToken<'_, T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshableToken")
            .field("identity", self.identity)
            .field("refresh_token", &"<redacted>")
            .field("expires_at", &self.cached.as_ref().map(|c| c.expires_at))
            .finish()
    }
}
