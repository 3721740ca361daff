use clap::Subcommand;
use sheets_oauth::Result;
use sheets_oauth::config::Config;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum ShowResource {
    /// Show configuration path and cached credential files
    Paths,
}

impl ShowResource {
    pub async fn execute(&self) -> Result<()> {
        match self {
            ShowResource::Paths => show_paths(),
        }
    }
}

fn show_paths() -> Result<()> {
    let config_path = Config::config_file()?;
    let refresh_token_path = Config::refresh_token_file()?;
    let installed_flow_path = Config::installed_flow_token_file()?;

    info!(path = ?config_path, exists = config_path.exists(), "Config path");
    info!(
        path = ?refresh_token_path,
        cached = refresh_token_path.exists(),
        "Refresh token"
    );
    info!(
        path = ?installed_flow_path,
        cached = installed_flow_path.exists(),
        "Installed-flow tokens"
    );

    Ok(())
}
