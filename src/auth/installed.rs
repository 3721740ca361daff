use crate::auth::delegated::ExternalCredential;
use crate::auth::identity::{
    ApplicationIdentity, GOOGLE_AUTH_URL, GOOGLE_REDIRECT_URI, GOOGLE_TOKEN_URL, SHEETS_SCOPE,
};
use crate::config::{Config, remove_secret_file};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use hyper_util::client::legacy::connect::HttpConnector;
use std::path::Path;
use tracing::{debug, instrument};
use yup_oauth2::{
    ApplicationSecret, InstalledFlowAuthenticator, InstalledFlowReturnMethod,
    authenticator::Authenticator, hyper_rustls::HttpsConnector,
};

const GOOGLE_CERT_URL: &str = "https://www.googleapis.com/oauth2/v1/certs";

type AuthType = Authenticator<HttpsConnector<HttpConnector>>;

/// A yup-oauth2 installed-flow authenticator, usable as the credential
/// behind a [`DelegatedToken`](crate::auth::DelegatedToken).
///
/// The authenticator carries its own HTTP client and on-disk token cache, so
/// whatever handle the `DelegatedToken` holds is ignored.
pub struct InstalledFlowCredential {
    auth: AuthType,
    scopes: Vec<String>,
}

impl InstalledFlowCredential {
    /// Build an interactive installed-flow authenticator for `identity`,
    /// persisting its tokens to `token_cache_path`.
    ///
    /// The user copies the authorization code from the browser when the
    /// first token is requested.
    pub async fn from_installed_flow(
        identity: &ApplicationIdentity,
        token_cache_path: &Path,
    ) -> Result<Self> {
        // Build the OAuth application secret from the identity
        let secret = ApplicationSecret {
            client_id: identity.client_id().to_string(),
            client_secret: identity.client_secret().to_string(),
            auth_uri: GOOGLE_AUTH_URL.to_string(),
            token_uri: GOOGLE_TOKEN_URL.to_string(),
            auth_provider_x509_cert_url: Some(GOOGLE_CERT_URL.to_string()),
            redirect_uris: vec![GOOGLE_REDIRECT_URI.to_string()],
            project_id: None,
            client_email: None,
            client_x509_cert_url: None,
        };

        if let Some(parent) = token_cache_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                AppError::Auth(format!("Failed to create token cache directory: {}", e))
            })?;
        }

        let auth = InstalledFlowAuthenticator::builder(secret, InstalledFlowReturnMethod::Interactive)
            .persist_tokens_to_disk(token_cache_path.to_path_buf())
            .build()
            .await
            .map_err(|e| AppError::Auth(format!("Failed to build authenticator: {}", e)))?;

        Ok(Self {
            auth,
            scopes: vec![SHEETS_SCOPE.to_string()],
        })
    }
}

#[async_trait]
impl<H: Sync> ExternalCredential<H> for InstalledFlowCredential {
    async fn get_access_token(&mut self, _http: &H) -> Option<Result<String>> {
        let token = match self.auth.token(self.scopes.as_slice()).await {
            Ok(token) => token,
            Err(e) => return Some(Err(AppError::Auth(format!("Failed to get token: {}", e)))),
        };

        Some(
            token
                .token()
                .map(str::to_owned)
                .ok_or_else(|| AppError::Auth("Authenticator returned no access token".to_string())),
        )
    }
}

/// Clear cached installed-flow tokens by deleting the token cache file
#[instrument(name = "Clearing installed-flow tokens", skip_all)]
pub fn clear_tokens() -> Result<()> {
    let token_path = Config::installed_flow_token_file()?;
    if remove_secret_file(&token_path)? {
        debug!("Cleared installed-flow cached tokens");
    } else {
        debug!("No installed-flow tokens to clear");
    }

    Ok(())
}
