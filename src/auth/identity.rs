use crate::auth::transport::{Transport, check_status};
use crate::error::Result;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;
use std::fmt;
use tracing::{debug, instrument};

pub(crate) const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
pub(crate) const GOOGLE_TOKEN_URL: &str = "https://www.googleapis.com/oauth2/v3/token";
pub(crate) const GOOGLE_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

// Read and write access to spreadsheets through the feeds API
pub const SHEETS_SCOPE: &str = "https://spreadsheets.google.com/feeds";

// Everything but unreserved characters and the path separator gets escaped
const QUOTE: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~')
    .remove(b'/');

#[derive(Debug, Deserialize)]
struct CodeExchangeResponse {
    refresh_token: String,
}

/// A registered Google application, able to mint refresh tokens via the
/// out-of-band installed-app flow.
///
/// A refresh token obtained here is what a [`RefreshableToken`] is built from.
///
/// [`RefreshableToken`]: crate::auth::RefreshableToken
#[derive(Clone, PartialEq, Eq)]
pub struct ApplicationIdentity {
    client_id: String,
    client_secret: String,
    redirect_uri: &'static str,
}

impl ApplicationIdentity {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            redirect_uri: GOOGLE_REDIRECT_URI,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub(crate) fn client_secret(&self) -> &str {
        &self.client_secret
    }

    pub fn redirect_uri(&self) -> &str {
        self.redirect_uri
    }

    /// URL the user opens in a browser to grant access and receive an
    /// authorization code.
    pub fn consent_url(&self) -> String {
        let scope = utf8_percent_encode(SHEETS_SCOPE, QUOTE);
        format!(
            "{}?scope={}&redirect_uri={}&response_type=code&client_id={}",
            GOOGLE_AUTH_URL, scope, self.redirect_uri, self.client_id
        )
    }

    /// Exchange a one-time authorization code for a long-lived refresh token.
    ///
    /// The refresh token is not retained; callers are expected to persist it.
    #[instrument(name = "Exchanging authorization code", skip_all)]
    pub async fn exchange_code<T>(&self, transport: &T, code: &str) -> Result<String>
    where
        T: Transport + ?Sized,
    {
        let form = [
            ("code", code),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("redirect_uri", self.redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let response = transport.post_form(GOOGLE_TOKEN_URL, &form).await?;
        check_status(&response)?;

        let exchanged: CodeExchangeResponse = serde_json::from_str(&response.body)?;
        debug!("Received refresh token");

        Ok(exchanged.refresh_token)
    }
}

/// Make sure `client_secret` is redacted
impl fmt::Debug for ApplicationIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApplicationIdentity")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::test_helpers::{MockTransport, mock_identity};
    use crate::error::AppError;

    #[test]
    fn test_consent_url() {
        let identity = mock_identity();

        assert_eq!(
            identity.consent_url(),
            "https://accounts.google.com/o/oauth2/auth?\
             scope=https%3A//spreadsheets.google.com/feeds&\
             redirect_uri=urn:ietf:wg:oauth:2.0:oob&\
             response_type=code&\
             client_id=client-123.apps.googleusercontent.com"
        );
    }

    #[test]
    fn test_consent_url_is_deterministic() {
        let a = ApplicationIdentity::new("id", "secret");
        let b = ApplicationIdentity::new("id", "secret");

        assert_eq!(a.consent_url(), b.consent_url());
        assert_eq!(a.consent_url(), a.consent_url());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let debug = format!("{:?}", mock_identity());

        assert!(debug.contains("client-123.apps.googleusercontent.com"));
        assert!(!debug.contains("shh"));
    }

    #[tokio::test]
    async fn test_exchange_code_returns_refresh_token() {
        let transport = MockTransport::new();
        transport.push_response(200, r#"{"access_token":"A","expires_in":3600,"refresh_token":"R","token_type":"Bearer"}"#);

        let refresh_token = mock_identity()
            .exchange_code(&transport, "code123")
            .await
            .unwrap();

        assert_eq!(refresh_token, "R");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, GOOGLE_TOKEN_URL);
        assert_eq!(
            requests[0].form,
            vec![
                ("code".to_string(), "code123".to_string()),
                (
                    "client_id".to_string(),
                    "client-123.apps.googleusercontent.com".to_string()
                ),
                ("client_secret".to_string(), "shh".to_string()),
                (
                    "redirect_uri".to_string(),
                    "urn:ietf:wg:oauth:2.0:oob".to_string()
                ),
                ("grant_type".to_string(), "authorization_code".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_exchange_code_http_failure() {
        let transport = MockTransport::new();
        transport.push_response(400, r#"{"error":"invalid_grant"}"#);

        let err = mock_identity()
            .exchange_code(&transport, "bad")
            .await
            .unwrap_err();

        match err {
            AppError::Http { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("expected Http error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exchange_code_missing_refresh_token() {
        let transport = MockTransport::new();
        transport.push_response(200, r#"{"access_token":"A","expires_in":3600}"#);

        let err = mock_identity()
            .exchange_code(&transport, "code123")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Serialization(_)));
    }
}
