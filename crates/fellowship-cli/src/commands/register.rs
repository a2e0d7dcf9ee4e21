//! Register command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use fellowship::Credentials;
use fellowship::backend::open_authenticator;

use crate::cli::StoreArgs;
use crate::commands::login::finish_sign_in;

#[derive(Args, Debug)]
pub struct RegisterArgs {
    /// Email address to register
    #[arg(long)]
    pub email: String,

    /// Account password (at least 6 characters)
    #[arg(long)]
    pub password: String,

    /// Name shown to other members
    #[arg(long)]
    pub display_name: Option<String>,
}

pub async fn run(args: RegisterArgs, store: &StoreArgs) -> Result<()> {
    let config = store.to_config()?;
    let authenticator = open_authenticator(&config).context("Failed to open identity service")?;

    eprintln!("{}", "Creating account...".dimmed());

    let session = authenticator
        .sign_up(
            Credentials::new(&args.email, &args.password),
            args.display_name.as_deref(),
        )
        .await
        .context("Failed to create account")?;

    finish_sign_in(store, session, "Account created").await
}
