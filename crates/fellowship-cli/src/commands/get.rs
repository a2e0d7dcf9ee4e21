//! Get command implementation.

use anyhow::{Context, Result};
use clap::Args;

use fellowship::DocumentId;

use crate::app::App;
use crate::cli::StoreArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct GetArgs {
    /// Collection name
    pub collection: String,

    /// Document id
    pub id: String,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

pub async fn run(args: GetArgs, store: &StoreArgs) -> Result<()> {
    let app = App::open(store).await?;
    let handle = app
        .accessor
        .collection(&args.collection)
        .context("Invalid collection name")?;
    let id = DocumentId::new(&args.id).context("Invalid document id")?;

    let doc = app
        .accessor
        .get(&handle, &id)
        .await
        .context("Failed to get document")?;

    output::document(&doc, None, args.pretty)
}
