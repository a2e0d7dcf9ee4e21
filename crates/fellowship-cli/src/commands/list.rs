//! List command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;

use fellowship::refresh::DEFAULT_INTERVAL;
use fellowship::{CollectionHandle, Direction, ListRefresher, ListState, QuerySpec, SortPolicy};

use crate::app::App;
use crate::cli::StoreArgs;
use crate::commands::apply_filter;
use crate::output;

#[derive(Args, Debug)]
pub struct ListArgs {
    /// Collection name
    pub collection: String,

    /// Filter as '<field> <op> <value>'; may be repeated
    #[arg(long = "where", value_name = "FILTER")]
    pub filters: Vec<String>,

    /// Field to order by
    #[arg(long)]
    pub order_by: Option<String>,

    /// Order descending
    #[arg(long, requires = "order_by")]
    pub desc: bool,

    /// Maximum number of documents
    #[arg(long)]
    pub limit: Option<u32>,

    /// Print `id<TAB>date` using this date field instead of JSON
    #[arg(long, value_name = "FIELD")]
    pub date_field: Option<String>,

    /// Keep polling and reprint the list whenever it changes
    #[arg(long)]
    pub watch: bool,

    /// Seconds between polls with --watch
    #[arg(long, default_value_t = DEFAULT_INTERVAL.as_secs(), requires = "watch")]
    pub interval: u64,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,
}

impl ListArgs {
    fn direction(&self) -> Direction {
        if self.desc { Direction::Desc } else { Direction::Asc }
    }

    fn query(&self) -> Result<QuerySpec> {
        let mut query = QuerySpec::new();
        for filter in &self.filters {
            query = apply_filter(query, filter)?;
        }
        if let Some(field) = &self.order_by {
            query = query.order_by(field, self.direction());
        }
        if let Some(limit) = self.limit {
            query = query.limit(limit);
        }
        query.validate().context("Invalid query")?;
        Ok(query)
    }
}

pub async fn run(args: ListArgs, store: &StoreArgs) -> Result<()> {
    let app = App::open(store).await?;
    let handle = app
        .accessor
        .collection(&args.collection)
        .context("Invalid collection name")?;
    let query = args.query()?;

    if args.watch {
        return watch(&app, args, handle, query).await;
    }

    let snapshot = app
        .accessor
        .fetch(&handle, &query)
        .await
        .context("Failed to list documents")?;

    output::origin(snapshot.origin);
    if snapshot.documents.is_empty() {
        eprintln!("{}", "No documents found.".dimmed());
        return Ok(());
    }
    for doc in &snapshot.documents {
        output::document(doc, args.date_field.as_deref(), args.pretty)?;
    }

    Ok(())
}

async fn watch(
    app: &App,
    args: ListArgs,
    handle: CollectionHandle,
    query: QuerySpec,
) -> Result<()> {
    let mut refresher = ListRefresher::new(app.accessor.clone(), handle, query)
        .with_interval(Duration::from_secs(args.interval.max(1)));
    if let Some(field) = &args.order_by {
        refresher = refresher.with_sort(SortPolicy::new(field, args.direction()));
    }

    eprintln!("{}", "Watching for changes. Press Ctrl+C to stop.".dimmed());
    let mut subscription = refresher.activate();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            state = subscription.changed() => match state {
                Ok(state) => print_state(&state, &args)?,
                Err(_) => break,
            },
        }
    }

    subscription.deactivate().await;
    Ok(())
}

fn print_state(state: &ListState, args: &ListArgs) -> Result<()> {
    if let Some(err) = &state.error {
        output::warning(&format!("Refresh failed: {}", err));
        return Ok(());
    }
    if let Some(origin) = state.origin {
        output::origin(origin);
    }

    eprintln!("{}", format!("-- {} document(s)", state.documents.len()).dimmed());
    for doc in &state.documents {
        output::document(doc, args.date_field.as_deref(), args.pretty)?;
    }
    Ok(())
}
