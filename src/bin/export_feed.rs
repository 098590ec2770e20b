use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use cura::api::CuraClient;
use cura::config;
use cura::feed::FeedAggregator;
use cura::filter::filter;
use cura::model::{Collection, Tab, Video};

#[derive(Debug, Parser)]
#[command(
    about = "Export every video of a collection to JSON, following the feed page by page."
)]
struct Args {
    /// Path to YAML config file (defaults to ./config.yaml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Collection to export
    #[arg(long)]
    collection: i64,

    /// Only export one tab (ALL, a category, or INFO which exports everything)
    #[arg(long, default_value = "ALL")]
    tab: Tab,

    /// Output file; stdout when omitted
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Serialize)]
struct Export<'a> {
    collection: &'a Collection,
    tab: String,
    videos: &'a [Video],
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(args.config.as_deref())?;
    let client = Arc::new(CuraClient::with_base_url(cfg.base_url()?)?);

    let collection = client
        .get_collection(args.collection)
        .await
        .with_context(|| format!("failed to load collection {}", args.collection))?;

    let feed = FeedAggregator::with_page_size(client, collection.id, cfg.feed.page_size);
    let total = feed
        .fetch_all()
        .await
        .context("failed to fetch collection videos")?;
    info!(collection_id = collection.id, total, "feed drained");

    let json = feed.with_items(|items| {
        let visible = filter(items, args.tab);
        serde_json::to_string_pretty(&Export {
            collection: &collection,
            tab: args.tab.to_string(),
            videos: &visible,
        })
    })?;

    match &args.out {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), "export written");
        }
        None => println!("{}", json),
    }
    Ok(())
}
