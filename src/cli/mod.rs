mod auth;
mod show;

use clap::{Parser, Subcommand};
use sheets_oauth::Result;

pub use auth::AuthAction;
pub use show::ShowResource;

#[derive(Parser, Debug)]
#[command(name = "sheets-oauth")]
#[command(about = "Obtain and refresh OAuth2 tokens for Google Sheets", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Auth { action } => action.execute().await,
            Commands::Show { resource } => resource.execute().await,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage Google authorization
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Inspect local configuration
    Show {
        #[command(subcommand)]
        resource: ShowResource,
    },
}
