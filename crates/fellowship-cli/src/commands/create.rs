//! Create command implementation.

use anyhow::{Context, Result};
use clap::Args;

use crate::app::App;
use crate::cli::StoreArgs;
use crate::commands::parse_fields;
use crate::output;

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Collection name
    pub collection: String,

    /// Document fields as a JSON object
    #[arg(long)]
    pub data: String,
}

pub async fn run(args: CreateArgs, store: &StoreArgs) -> Result<()> {
    let app = App::open(store).await?;
    app.require_session()?;

    let handle = app
        .accessor
        .collection(&args.collection)
        .context("Invalid collection name")?;
    let fields = parse_fields(&args.data)?;

    let id = app
        .accessor
        .create(&handle, &fields)
        .await
        .context("Failed to create document")?;

    output::success("Document created");
    output::field("Id", id.as_str());
    Ok(())
}
