//! OAuth2 access for Google Sheets.
//!
//! An [`ApplicationIdentity`] mints a refresh token through the out-of-band
//! consent flow. A [`RefreshableToken`] then turns that refresh token into
//! short-lived access tokens on demand, while a [`DelegatedToken`] defers to
//! a credential object managed elsewhere. Both implement
//! [`AuthorizationProvider`], so request code only ever asks for headers.

pub mod auth;
pub mod config;
pub mod error;

pub use auth::{
    ApplicationIdentity, AuthorizationProvider, DelegatedToken, ExternalCredential,
    RefreshableToken, Transport,
};
pub use error::{AppError, Result};
