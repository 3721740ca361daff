use crate::auth::{AuthorizationProvider, insert_bearer};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::header::HeaderMap;
use tracing::debug;

/// An externally owned, already authorized credential that refreshes
/// through the HTTP handle `H`.
///
/// Credentials come in two shapes. Current ones implement
/// [`get_access_token`](Self::get_access_token) and manage expiry
/// themselves. Older ones only expose their cached token and an expiry flag,
/// leaving the holder to call [`refresh`](Self::refresh).
#[async_trait]
pub trait ExternalCredential<H: Sync>: Send {
    /// A valid access token, refreshed as needed. `None` when the credential
    /// does not offer this.
    async fn get_access_token(&mut self, _http: &H) -> Option<Result<String>> {
        None
    }

    fn access_token(&self) -> Option<&str> {
        None
    }

    fn access_token_expired(&self) -> bool {
        false
    }

    async fn refresh(&mut self, _http: &H) -> Result<()> {
        Err(AppError::Auth(
            "Delegated credential cannot be refreshed".to_string(),
        ))
    }
}

#[async_trait]
impl<'a, H, C> ExternalCredential<H> for &'a mut C
where
    H: Sync,
    C: ExternalCredential<H> + ?Sized,
{
    async fn get_access_token(&mut self, http: &H) -> Option<Result<String>> {
        (**self).get_access_token(http).await
    }

    fn access_token(&self) -> Option<&str> {
        (**self).access_token()
    }

    fn access_token_expired(&self) -> bool {
        (**self).access_token_expired()
    }

    async fn refresh(&mut self, http: &H) -> Result<()> {
        (**self).refresh(http).await
    }
}

#[async_trait]
impl<H, C> ExternalCredential<H> for Box<C>
where
    H: Sync,
    C: ExternalCredential<H> + ?Sized,
{
    async fn get_access_token(&mut self, http: &H) -> Option<Result<String>> {
        (**self).get_access_token(http).await
    }

    fn access_token(&self) -> Option<&str> {
        (**self).access_token()
    }

    fn access_token_expired(&self) -> bool {
        (**self).access_token_expired()
    }

    async fn refresh(&mut self, http: &H) -> Result<()> {
        (**self).refresh(http).await
    }
}

/// Produces authorization headers from a credential managed elsewhere.
///
/// The HTTP handle stays with the caller. The credential can be lent as
/// `&mut C` to keep it with the caller too, or moved in and recovered with
/// [`into_inner`](Self::into_inner).
///
/// Expiry policy belongs to the wrapped credential; no safety margin is
/// applied here.
pub struct DelegatedToken<'h, C, H> {
    credential: C,
    http: &'h H,
}

impl<'h, C, H> DelegatedToken<'h, C, H>
where
    C: ExternalCredential<H>,
    H: Sync,
{
    pub fn new(credential: C, http: &'h H) -> Self {
        Self { credential, http }
    }

    pub fn credential(&self) -> &C {
        &self.credential
    }

    pub fn into_inner(self) -> C {
        self.credential
    }

    async fn valid_access_token(&mut self) -> Result<String> {
        if let Some(access_token) = self.credential.get_access_token(self.http).await {
            return access_token;
        }

        let missing = self.credential.access_token().is_none_or(str::is_empty);
        if missing || self.credential.access_token_expired() {
            debug!(missing, "Refreshing delegated credential");
            self.credential.refresh(self.http).await?;
        }

        self.credential
            .access_token()
            .filter(|token| !token.is_empty())
            .map(str::to_owned)
            .ok_or_else(|| AppError::Auth("Delegated credential has no access token".to_string()))
    }
}

#[async_trait]
impl<'h, C, H> AuthorizationProvider for DelegatedToken<'h, C, H>
where
    C: ExternalCredential<H>,
    H: Sync,
{
    async fn authorization_header(&mut self, headers: Option<HeaderMap>) -> Result<HeaderMap> {
        let access_token = self.valid_access_token().await?;
        insert_bearer(headers, &access_token)
    }
}
