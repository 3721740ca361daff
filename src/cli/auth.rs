use clap::Subcommand;
use dialoguer::Input;
use sheets_oauth::auth::{
    AuthorizationProvider, DelegatedToken, InstalledFlowCredential, RefreshableToken,
    clear_installed_flow_tokens,
};
use sheets_oauth::config::{Config, read_secret_file, remove_secret_file, write_secret_file};
use sheets_oauth::{AppError, Result};
use tracing::{debug, info, instrument};

#[derive(Subcommand, Debug)]
pub enum AuthAction {
    /// Print the consent URL to open in a browser
    Url,
    /// Exchange an authorization code for a refresh token and cache it
    Exchange {
        /// Code shown by Google after granting access; prompted for if omitted
        code: Option<String>,
    },
    /// Fetch an access token to check the cached credentials work
    Verify {
        /// Use the yup-oauth2 installed flow instead of the cached refresh token
        #[arg(long)]
        installed_flow: bool,
    },
    /// Delete all cached credentials
    Reset,
}

impl AuthAction {
    pub async fn execute(&self) -> Result<()> {
        match self {
            AuthAction::Url => show_consent_url(),
            AuthAction::Exchange { code } => exchange_code(code.as_deref()).await,
            AuthAction::Verify { installed_flow } => verify(*installed_flow).await,
            AuthAction::Reset => reset(),
        }
    }
}

fn show_consent_url() -> Result<()> {
    let config = Config::load()?;
    info!(url = %config.google.identity().consent_url(), "Consent URL");

    Ok(())
}

#[instrument(name = "Exchanging authorization code", skip_all)]
async fn exchange_code(code: Option<&str>) -> Result<()> {
    let config = Config::load()?;
    let identity = config.google.identity();

    let code = match code {
        Some(code) => code.to_string(),
        None => {
            println!("Open this URL in your browser:\n{}", identity.consent_url());
            println!();
            Input::<String>::new()
                .with_prompt("Authorization code")
                .interact_text()
                .map_err(|e| AppError::Other(e.into()))?
        }
    };

    let refresh_token = identity
        .exchange_code(&reqwest::Client::new(), code.trim())
        .await?;

    let path = Config::refresh_token_file()?;
    write_secret_file(&path, &refresh_token)?;
    info!(path = ?path, "Refresh token cached");

    Ok(())
}

#[instrument(name = "Verifying Google Sheets authorization", skip_all)]
async fn verify(installed_flow: bool) -> Result<()> {
    let config = Config::load()?;
    let identity = config.google.identity();

    let mut provider: Box<dyn AuthorizationProvider + '_> = if installed_flow {
        let token_path = Config::installed_flow_token_file()?;
        let credential = InstalledFlowCredential::from_installed_flow(&identity, &token_path).await?;
        Box::new(DelegatedToken::new(credential, &()))
    } else {
        let path = Config::refresh_token_file()?;
        let refresh_token = read_secret_file(&path)?.ok_or_else(|| {
            AppError::Config(format!(
                "No refresh token cached at {:?}. Run `auth exchange` first.",
                path
            ))
        })?;
        Box::new(RefreshableToken::new(
            &identity,
            refresh_token,
            reqwest::Client::new(),
        ))
    };

    let headers = provider.authorization_header(None).await?;
    debug!(headers = headers.len(), "Got authorization header");
    info!("Google Sheets authorization verified");

    Ok(())
}

#[instrument(name = "Clearing cached credentials", skip_all)]
fn reset() -> Result<()> {
    let path = Config::refresh_token_file()?;
    match remove_secret_file(&path)? {
        true => info!("Cleared cached refresh token"),
        false => debug!("No refresh token to clear"),
    }

    clear_installed_flow_tokens()
}
