//! Update command implementation.

use anyhow::{Context, Result};
use clap::Args;

use fellowship::DocumentId;

use crate::app::App;
use crate::cli::StoreArgs;
use crate::commands::parse_fields;
use crate::output;

#[derive(Args, Debug)]
pub struct UpdateArgs {
    /// Collection name
    pub collection: String,

    /// Document id
    pub id: String,

    /// Fields to write as a JSON object
    #[arg(long)]
    pub data: String,

    /// Replace the whole document instead of merging fields
    #[arg(long)]
    pub replace: bool,
}

pub async fn run(args: UpdateArgs, store: &StoreArgs) -> Result<()> {
    let app = App::open(store).await?;
    app.require_session()?;

    let handle = app
        .accessor
        .collection(&args.collection)
        .context("Invalid collection name")?;
    let id = DocumentId::new(&args.id).context("Invalid document id")?;
    let fields = parse_fields(&args.data)?;

    app.accessor
        .update(&handle, &id, &fields, !args.replace)
        .await
        .context("Failed to update document")?;

    output::success("Document updated");
    Ok(())
}
