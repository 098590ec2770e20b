use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use cura::api::{ApiError, CuraClient, CuraService};
use cura::config::{self, Config};
use cura::feed::FeedAggregator;
use cura::import::{BatchForm, BatchImporter, BatchItem, ChannelImportFlow, ImportMode, ImportState, Progress};
use cura::model::{Category, CollectionDraft, CollectionId, CollectionPatch, CollectionType, Tab, VideoId, VideoPatch};
use cura::{links, view};

#[derive(Debug, Parser)]
#[command(author, version, about = "Curate YouTube videos into collections")]
struct Args {
    /// Path to YAML config file (defaults to ./config.yaml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List all collections
    Collections,
    /// Show a collection and its feed
    Show {
        id: CollectionId,
        /// ALL, INFO or a category (MV, LIVE, FANCAM, INTERVIEW, SHORTS, BEHIND, VLOG, ETC)
        #[arg(long, default_value = "ALL")]
        tab: Tab,
        /// Number of pages to load
        #[arg(long, default_value = "1")]
        pages: u32,
    },
    /// Add videos by link, one at a time. Use URL=CATEGORY to pre-assign a category
    Add {
        id: CollectionId,
        #[arg(required = true)]
        urls: Vec<BatchItem>,
    },
    /// Import a whole YouTube channel into a collection
    Import {
        id: CollectionId,
        /// Import from this channel instead of the collection's official link
        #[arg(long)]
        custom_url: Option<String>,
        /// Category for imported videos (custom channel only)
        #[arg(long)]
        category: Option<Category>,
        /// Maximum number of videos to import
        #[arg(long)]
        limit: Option<u32>,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Delete every video in a collection
    DeleteVideos {
        id: CollectionId,
        #[arg(long)]
        yes: bool,
    },
    /// Delete a collection and its videos
    DeleteCollection {
        id: CollectionId,
        #[arg(long)]
        yes: bool,
    },
    /// Delete one video
    DeleteVideo {
        id: VideoId,
        #[arg(long)]
        yes: bool,
    },
    /// Edit a video's fields
    EditVideo {
        id: VideoId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        category: Option<Category>,
        #[arg(long)]
        comment: Option<String>,
        #[arg(long)]
        channel_name: Option<String>,
        #[arg(long)]
        thumbnail_url: Option<String>,
    },
    /// Create a collection
    CreateCollection {
        title: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long)]
        official: bool,
        #[arg(long)]
        official_link: Option<String>,
        /// Local image uploaded as the cover
        #[arg(long)]
        cover: Option<PathBuf>,
        /// Local image uploaded as the profile picture
        #[arg(long)]
        profile: Option<PathBuf>,
    },
    /// Update a collection's fields
    UpdateCollection {
        id: CollectionId,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        official_link: Option<String>,
        #[arg(long)]
        cover: Option<PathBuf>,
        #[arg(long)]
        profile: Option<PathBuf>,
    },
    /// Upload an image and print its URL
    Upload { path: PathBuf },
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
    info!(base_url = %client.base_url(), "using API");

    match args.command {
        Command::Collections => list_collections(&client).await,
        Command::Show { id, tab, pages } => show(&cfg, client, id, tab, pages).await,
        Command::Add { id, urls } => add(client, id, urls).await,
        Command::Import {
            id,
            custom_url,
            category,
            limit,
            yes,
        } => {
            let limit = limit.unwrap_or(cfg.import.channel_limit);
            import_channel(client, id, custom_url, category, limit, yes).await
        }
        Command::DeleteVideos { id, yes } => {
            let collection = client.get_collection(id).await.map_err(user_error)?;
            let prompt = format!(
                "Delete ALL videos in \"{}\"? This cannot be undone.",
                collection.title
            );
            if !(yes || confirm(&prompt).await?) {
                println!("Cancelled.");
                return Ok(());
            }
            client.delete_all_videos(id).await.map_err(user_error)?;
            println!("All videos deleted successfully.");
            Ok(())
        }
        Command::DeleteCollection { id, yes } => {
            let collection = client.get_collection(id).await.map_err(user_error)?;
            let prompt = format!(
                "Delete collection \"{}\" and all of its videos?",
                collection.title
            );
            if !(yes || confirm(&prompt).await?) {
                println!("Cancelled.");
                return Ok(());
            }
            client.delete_collection(id).await.map_err(user_error)?;
            println!("Collection deleted.");
            Ok(())
        }
        Command::DeleteVideo { id, yes } => {
            if !(yes || confirm(&format!("Delete video {}?", id)).await?) {
                println!("Cancelled.");
                return Ok(());
            }
            client.delete_video(id).await.map_err(user_error)?;
            println!("Video deleted.");
            Ok(())
        }
        Command::EditVideo {
            id,
            title,
            category,
            comment,
            channel_name,
            thumbnail_url,
        } => {
            let patch = VideoPatch {
                title,
                category,
                comment,
                channel_name,
                thumbnail_url,
                ..Default::default()
            };
            if patch.is_empty() {
                bail!("nothing to update");
            }
            let video = client.update_video(id, &patch).await.map_err(user_error)?;
            print!("{}", view::thread_card(&video));
            Ok(())
        }
        Command::CreateCollection {
            title,
            description,
            official,
            official_link,
            cover,
            profile,
        } => {
            let draft = CollectionDraft {
                title,
                description,
                kind: if official {
                    CollectionType::Official
                } else {
                    CollectionType::User
                },
                cover_image_url: upload_opt(&client, cover).await?,
                profile_image_url: upload_opt(&client, profile).await?,
                official_link,
            };
            let collection = client.create_collection(&draft).await.map_err(user_error)?;
            println!("{}", view::collection_line(&collection));
            Ok(())
        }
        Command::UpdateCollection {
            id,
            title,
            description,
            official_link,
            cover,
            profile,
        } => {
            let patch = CollectionPatch {
                title,
                description,
                official_link,
                cover_image_url: upload_opt(&client, cover).await?,
                profile_image_url: upload_opt(&client, profile).await?,
                kind: None,
            };
            if patch.is_empty() {
                bail!("nothing to update");
            }
            let collection = client
                .update_collection(id, &patch)
                .await
                .map_err(user_error)?;
            println!("Collection updated successfully!");
            println!("{}", view::collection_line(&collection));
            Ok(())
        }
        Command::Upload { path } => {
            let url = client
                .upload_image(&path)
                .await
                .map_err(user_error)
                .with_context(|| format!("failed to upload {}", path.display()))?;
            println!("{}", url);
            Ok(())
        }
    }
}

fn user_error(err: ApiError) -> anyhow::Error {
    let message = err.user_message();
    anyhow::Error::new(err).context(message)
}

async fn upload_opt(client: &CuraClient, path: Option<PathBuf>) -> Result<Option<String>> {
    match path {
        Some(path) => {
            let url = client
                .upload_image(&path)
                .await
                .map_err(user_error)
                .with_context(|| format!("failed to upload {}", path.display()))?;
            Ok(Some(url))
        }
        None => Ok(None),
    }
}

/// Ask a yes/no question on the terminal. Anything but y/yes is a no.
async fn confirm(prompt: &str) -> Result<bool> {
    println!("{} [y/N]", prompt);
    let mut line = String::new();
    BufReader::new(tokio::io::stdin())
        .read_line(&mut line)
        .await
        .context("failed to read confirmation")?;
    let answer = line.trim().to_ascii_lowercase();
    Ok(answer == "y" || answer == "yes")
}

async fn list_collections(client: &CuraClient) -> Result<()> {
    let collections = client.list_collections().await.map_err(user_error)?;
    if collections.is_empty() {
        println!("No collections yet.");
    }
    for collection in &collections {
        println!("{}", view::collection_line(collection));
    }
    Ok(())
}

async fn show(
    cfg: &Config,
    client: Arc<CuraClient>,
    id: CollectionId,
    tab: Tab,
    pages: u32,
) -> Result<()> {
    let collection = client.get_collection(id).await.map_err(user_error)?;
    let feed = FeedAggregator::with_page_size(client, id, cfg.feed.page_size);
    for _ in 0..pages.max(1) {
        if !feed.has_more() {
            break;
        }
        feed.fetch_next().await.map_err(user_error)?;
    }

    print!("{}", view::header(&collection));
    println!();
    feed.with_items(|items| {
        println!("{}", view::tab_bar(items, tab));
        println!();
        print!("{}", view::render_tab(&collection, items, tab));
    });
    if feed.has_more() {
        println!(
            "… more available (loaded {}, use --pages {} to load more)",
            feed.len(),
            pages.max(1) + 1
        );
    }
    Ok(())
}

async fn add(client: Arc<CuraClient>, id: CollectionId, urls: Vec<BatchItem>) -> Result<()> {
    let mut form = BatchForm::from_items(urls);
    let items = form.pending();
    if items.is_empty() {
        bail!("no links given");
    }
    for item in items.iter().filter(|i| i.video_id().is_none()) {
        println!("  warning: no video id in {}; sending it anyway", item.url);
    }
    let importer = BatchImporter::new(client, id);
    let report = importer
        .run(&items, &|p: &Progress| println!("{}", p))
        .await;
    for failed in report.failures() {
        println!(
            "  failed: {} ({})",
            failed.url,
            failed.error_detail().unwrap_or_default()
        );
    }
    println!("{}", report.tally);
    form.apply_report(&report);
    if report.tally.success == 0 {
        bail!("no videos were added");
    }
    Ok(())
}

async fn import_channel(
    client: Arc<CuraClient>,
    id: CollectionId,
    custom_url: Option<String>,
    category: Option<Category>,
    limit: u32,
    yes: bool,
) -> Result<()> {
    if let Some(url) = custom_url.as_deref() {
        if !links::is_channel_url(url) {
            bail!("not a YouTube channel link: {}", url);
        }
    }
    let service: &dyn CuraService = client.as_ref();
    let mut flow = ChannelImportFlow::new(id).with_limit(limit);

    println!("{}", flow.title());
    flow.begin_check()?;
    println!("{}", flow.message());
    let info = service.get_channel_info(id).await;
    flow.finish_check(info)?;
    println!("{}", flow.message());

    if let ImportState::Error { .. } = flow.state() {
        flow.close()?;
        bail!("channel lookup failed");
    }

    if let Some(url) = custom_url {
        flow.set_mode(ImportMode::Custom);
        flow.set_custom_channel_url(url);
        flow.set_default_category(category);
    } else if category.is_some() {
        println!("--category only applies with --custom-url; ignoring it");
    }

    if !(yes || confirm("Start import?").await?) {
        flow.close()?;
        println!("Cancelled.");
        return Ok(());
    }

    let request = flow.begin_import()?;
    println!("{}", flow.message());
    let result = service.import_channel(id, &request).await;
    flow.finish_import(result)?;
    println!("{}: {}", flow.title(), flow.message());

    let failed = matches!(flow.state(), ImportState::Error { .. });
    flow.close()?;
    if failed {
        bail!("channel import failed");
    }
    Ok(())
}
