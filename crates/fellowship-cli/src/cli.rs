//! CLI argument definitions.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};

use fellowship::{StoreConfig, StoreUrl};

use crate::commands::{create, delete, get, list, login, logout, register, update, whoami};

const DEFAULT_ENDPOINT: &str = "https://firestore.googleapis.com";

/// Command-line client for community collections.
#[derive(Parser, Debug)]
#[command(name = "fellowship")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Output logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where the document store lives.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Store endpoint; a file:// URL selects the local store
    #[arg(long, env = "FELLOWSHIP_ENDPOINT", default_value = DEFAULT_ENDPOINT, global = true)]
    pub endpoint: String,

    /// Project id
    #[arg(long, env = "FELLOWSHIP_PROJECT_ID", global = true)]
    pub project: Option<String>,

    /// API key sent with every request
    #[arg(long, env = "FELLOWSHIP_API_KEY", hide_env_values = true, global = true)]
    pub api_key: Option<String>,

    /// Identity service endpoint
    #[arg(long, env = "FELLOWSHIP_AUTH_ENDPOINT", global = true)]
    pub auth_endpoint: Option<String>,

    /// Storage bucket
    #[arg(long, env = "FELLOWSHIP_STORAGE_BUCKET", global = true)]
    pub storage_bucket: Option<String>,
}

impl StoreArgs {
    /// Build the store configuration.
    ///
    /// The local store needs neither a project nor a key.
    pub fn to_config(&self) -> Result<StoreConfig> {
        let endpoint = StoreUrl::new(&self.endpoint).context("Invalid store endpoint")?;

        let (project, api_key) = if endpoint.is_local() {
            (
                self.project.clone().unwrap_or_else(|| "local".to_string()),
                self.api_key.clone().unwrap_or_default(),
            )
        } else {
            (
                self.project
                    .clone()
                    .context("A project id is required (--project or FELLOWSHIP_PROJECT_ID)")?,
                self.api_key
                    .clone()
                    .context("An API key is required (--api-key or FELLOWSHIP_API_KEY)")?,
            )
        };

        let mut config = StoreConfig::new(api_key, project, endpoint);
        if let Some(url) = &self.auth_endpoint {
            config = config
                .with_auth_endpoint(StoreUrl::new(url).context("Invalid identity endpoint")?);
        }
        if let Some(bucket) = &self.storage_bucket {
            config = config.with_storage_bucket(bucket);
        }
        Ok(config)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create an account and sign in
    Register(register::RegisterArgs),

    /// Sign in
    Login(login::LoginArgs),

    /// Display the signed-in user
    Whoami(whoami::WhoamiArgs),

    /// Sign out and clear cached lists
    Logout(logout::LogoutArgs),

    /// List documents in a collection
    List(list::ListArgs),

    /// Fetch a single document
    Get(get::GetArgs),

    /// Create a document
    Create(create::CreateArgs),

    /// Update a document
    Update(update::UpdateArgs),

    /// Delete a document
    Delete(delete::DeleteArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn store(endpoint: &str) -> StoreArgs {
        StoreArgs {
            endpoint: endpoint.to_string(),
            project: None,
            api_key: None,
            auth_endpoint: None,
            storage_bucket: None,
        }
    }

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn local_store_needs_no_project() {
        let config = store("file:///tmp/fellowship").to_config().unwrap();
        assert_eq!(config.project_id, "local");
        assert!(config.endpoint.is_local());
    }

    #[test]
    fn hosted_store_requires_project_and_key() {
        assert!(store(DEFAULT_ENDPOINT).to_config().is_err());

        let mut args = store(DEFAULT_ENDPOINT);
        args.project = Some("grace-chapel".to_string());
        args.api_key = Some("key".to_string());
        let config = args.to_config().unwrap();
        assert_eq!(config.project_id, "grace-chapel");
    }
}
