mod clock;
mod delegated;
mod identity;
mod installed;
mod token;
mod transport;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use clock::{Clock, SystemClock};
pub use delegated::{DelegatedToken, ExternalCredential};
pub use identity::{ApplicationIdentity, SHEETS_SCOPE};
pub use installed::{InstalledFlowCredential, clear_tokens as clear_installed_flow_tokens};
pub use token::{RefreshableToken, SAFETY_MARGIN_SECS};
pub use transport::{Transport, TransportResponse, check_status};

use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};

/// Anything that can stamp outgoing requests with a currently valid bearer
/// credential.
///
/// The returned map keeps every entry of `headers` and adds (or overwrites)
/// `Authorization`. Passing `None` yields a map holding only that header.
#[async_trait]
pub trait AuthorizationProvider: Send {
    async fn authorization_header(&mut self, headers: Option<HeaderMap>) -> Result<HeaderMap>;
}

#[async_trait]
impl<P: AuthorizationProvider + ?Sized> AuthorizationProvider for Box<P> {
    async fn authorization_header(&mut self, headers: Option<HeaderMap>) -> Result<HeaderMap> {
        (**self).authorization_header(headers).await
    }
}

pub(crate) fn insert_bearer(headers: Option<HeaderMap>, access_token: &str) -> Result<HeaderMap> {
    let mut headers = headers.unwrap_or_default();

    let mut value = HeaderValue::from_str(&format!("Bearer {}", access_token)).map_err(|e| {
        AppError::InvalidArgument(format!("Access token is not a valid header value: {}", e))
    })?;
    value.set_sensitive(true);

    headers.insert(AUTHORIZATION, value);
    Ok(headers)
}
