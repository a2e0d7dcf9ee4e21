//! Login command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use fellowship::backend::open_authenticator;
use fellowship::{Credentials, SessionCredential};

use crate::app::App;
use crate::cli::StoreArgs;
use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    #[arg(long)]
    pub email: String,

    /// Account password
    #[arg(long)]
    pub password: String,
}

pub async fn run(args: LoginArgs, store: &StoreArgs) -> Result<()> {
    let config = store.to_config()?;
    let authenticator = open_authenticator(&config).context("Failed to open identity service")?;

    eprintln!("{}", "Logging in...".dimmed());

    let session = authenticator
        .sign_in(Credentials::new(&args.email, &args.password))
        .await
        .context("Failed to login")?;

    finish_sign_in(store, session, "Logged in successfully").await
}

/// Persist a fresh session and stamp the member's last login.
pub(crate) async fn finish_sign_in(
    store: &StoreArgs,
    session: SessionCredential,
    message: &str,
) -> Result<()> {
    let app = App::open(store).await?;
    session::save_session(&app.config, &session).context("Failed to save session")?;
    app.identity.set(session.clone());

    // The session is usable even if the profile stamp fails.
    if let Err(e) = app.accessor.record_login().await {
        output::warning(&format!("Could not record login: {}", e));
    }

    output::success(message);
    println!();
    output::field("User", session.user_id());
    if let Some(name) = &session.profile.display_name {
        output::field("Name", name);
    }
    if let Some(email) = &session.profile.email {
        output::field("Email", email);
    }

    Ok(())
}
