//! Delete command implementation.

use anyhow::{Context, Result};
use clap::Args;

use fellowship::DocumentId;

use crate::app::App;
use crate::cli::StoreArgs;
use crate::output;

#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Collection name
    pub collection: String,

    /// Document id
    pub id: String,
}

pub async fn run(args: DeleteArgs, store: &StoreArgs) -> Result<()> {
    let app = App::open(store).await?;
    app.require_session()?;

    let handle = app
        .accessor
        .collection(&args.collection)
        .context("Invalid collection name")?;
    let id = DocumentId::new(&args.id).context("Invalid document id")?;

    app.accessor
        .delete(&handle, &id)
        .await
        .context("Failed to delete document")?;

    output::success("Document deleted");
    Ok(())
}
