//! Whoami command implementation.

use anyhow::Result;
use clap::Args;

use crate::app::App;
use crate::cli::StoreArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct WhoamiArgs {}

pub async fn run(_args: WhoamiArgs, store: &StoreArgs) -> Result<()> {
    let app = App::open(store).await?;
    let session = app.require_session()?;

    output::field("User", session.user_id());
    if let Some(name) = &session.profile.display_name {
        output::field("Name", name);
    }
    if let Some(email) = &session.profile.email {
        output::field("Email", email);
    }
    output::field("Store", app.config.endpoint.as_str());

    Ok(())
}
