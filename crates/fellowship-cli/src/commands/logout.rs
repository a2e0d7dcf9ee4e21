//! Logout command implementation.

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use fellowship::KeyValueStore;
use fellowship_file::FileKeyValueStore;

use crate::output;
use crate::session;

#[derive(Args, Debug)]
pub struct LogoutArgs {}

pub async fn run(_args: LogoutArgs) -> Result<()> {
    let had_session = session::clear_session()?;

    // Cached lists may hold documents only the signed-in member could read.
    FileKeyValueStore::new(session::cache_dir()?)
        .clear()
        .await
        .context("Failed to clear cache")?;

    if had_session {
        output::success("Logged out");
    } else {
        eprintln!("{}", "No active session.".dimmed());
    }
    Ok(())
}
