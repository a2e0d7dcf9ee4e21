//! Subcommand implementations.

pub mod create;
pub mod delete;
pub mod get;
pub mod list;
pub mod login;
pub mod logout;
pub mod register;
pub mod update;
pub mod whoami;

use anyhow::{Context, Result, bail};
use serde_json::Value;

use fellowship::{Fields, Operator, QuerySpec};

use crate::cli::{Commands, StoreArgs};

pub async fn handle(command: Commands, store: &StoreArgs) -> Result<()> {
    match command {
        Commands::Register(args) => register::run(args, store).await,
        Commands::Login(args) => login::run(args, store).await,
        Commands::Whoami(args) => whoami::run(args, store).await,
        Commands::Logout(args) => logout::run(args).await,
        Commands::List(args) => list::run(args, store).await,
        Commands::Get(args) => get::run(args, store).await,
        Commands::Create(args) => create::run(args, store).await,
        Commands::Update(args) => update::run(args, store).await,
        Commands::Delete(args) => delete::run(args, store).await,
    }
}

/// Parse a JSON object given on the command line.
pub(crate) fn parse_fields(data: &str) -> Result<Fields> {
    let value: Value = serde_json::from_str(data).context("Document data is not valid JSON")?;
    Fields::new(value).context("Document data must be a JSON object")
}

/// Parse a filter such as `title == Potluck` or `attendees array-contains uid-1`.
///
/// The value is read as JSON when it parses, otherwise as a plain string.
pub(crate) fn apply_filter(query: QuerySpec, filter: &str) -> Result<QuerySpec> {
    let mut parts = filter.trim().splitn(3, char::is_whitespace);
    let (Some(field), Some(op), Some(value)) = (parts.next(), parts.next(), parts.next()) else {
        bail!("Filter must look like '<field> <op> <value>', got '{}'", filter);
    };

    let op: Operator = op.parse().context("Invalid filter operator")?;
    let value = value.trim();
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));

    Ok(query.filter(field, op, value))
}
