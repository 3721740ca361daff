use crate::error::{AppError, Result};
use async_trait::async_trait;

/// Status and raw body of a token endpoint response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

/// Sends form-encoded POST requests to an OAuth2 endpoint.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<TransportResponse>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn post_form(&self, url: &str, form: &[(&str, &str)]) -> Result<TransportResponse> {
        let response = self.post(url).form(form).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;

        Ok(TransportResponse { status, body })
    }
}

/// Reject any response outside the 2xx range, keeping the body for diagnostics.
pub fn check_status(response: &TransportResponse) -> Result<()> {
    if !(200..300).contains(&response.status) {
        return Err(AppError::Http {
            status: response.status,
            body: response.body.clone(),
        });
    }
    Ok(())
}
