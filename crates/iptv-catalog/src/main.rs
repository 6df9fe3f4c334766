use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use iptv_catalog::{
    config::Config,
    models::{ContentKind, SourceCreateRequest, SourceKind},
    services::CatalogEngine,
};

#[derive(Parser)]
#[command(name = "iptv-catalog")]
#[command(version)]
#[command(about = "Unified IPTV catalog engine: ingestion, grouping and search")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Log level
    #[arg(short = 'v', long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register a new source
    AddSource {
        name: String,
        /// Source kind: manifest or api
        kind: String,
        /// Playlist URL, file path, or API base URL
        url: String,
        #[arg(long)]
        username: Option<String>,
        #[arg(long)]
        password: Option<String>,
        /// Grouping tie-break rank; lower wins
        #[arg(long, default_value_t = 0)]
        priority: i32,
    },
    /// List configured sources
    ListSources,
    /// Remove a source and everything derived from it
    RemoveSource { id: Uuid },
    /// Ingest one source, or every active source when no id is given
    Ingest {
        id: Option<Uuid>,
    },
    /// Search the catalog
    Search {
        query: String,
        /// Restrict to one kind: channel, movie or episode
        #[arg(long)]
        kind: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Show the grouped catalog for one kind
    Catalog { kind: String },
    /// Rebuild the full-text index
    Reindex,
    /// Rebuild all projected fields
    RebuildProjections,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_filter = format!("iptv_catalog={}", cli.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load_from_file(&cli.config)?;
    info!("Configuration loaded from: {}", cli.config);

    let engine = CatalogEngine::connect(config).await?;

    match cli.command {
        Command::AddSource {
            name,
            kind,
            url,
            username,
            password,
            priority,
        } => {
            let kind: SourceKind = kind
                .parse()
                .map_err(|_| anyhow::anyhow!("unknown source kind '{kind}'"))?;
            let source = engine
                .add_source(SourceCreateRequest {
                    name,
                    kind,
                    url,
                    username,
                    password,
                    priority,
                })
                .await?;
            println!("Added source '{}' ({})", source.name, source.id);
        }
        Command::ListSources => {
            for source in engine.list_sources().await? {
                println!(
                    "{}  {:<10} priority={} active={} last_ingested={}  {}",
                    source.id,
                    source.kind,
                    source.priority,
                    source.is_active,
                    source
                        .last_ingested_at
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "never".to_string()),
                    source.name,
                );
            }
        }
        Command::RemoveSource { id } => {
            engine.remove_source(id).await?;
            println!("Removed source {id}");
        }
        Command::Ingest { id } => {
            let reports = match id {
                Some(id) => vec![engine.ingest(id).await?],
                None => engine.ingest_all().await?,
            };
            for report in reports {
                match &report.error {
                    Some(error) => {
                        println!("{}: FAILED - {}", report.source_name, error)
                    }
                    None => println!("{}: {}", report.source_name, report.summary()),
                }
                for message in &report.messages {
                    println!("  {message}");
                }
            }
        }
        Command::Search { query, kind, limit } => {
            let kind = parse_kind(kind)?;
            for hit in engine.search(&query, kind, limit) {
                println!("{:.4}  {}  [{}]", hit.rank, hit.title, hit.summary);
            }
        }
        Command::Catalog { kind } => {
            let kind: ContentKind = kind
                .parse()
                .map_err(|_| anyhow::anyhow!("unknown content kind '{kind}'"))?;
            for item in engine.grouped_catalog(kind).await? {
                println!(
                    "{}  (quality {}, {} alternatives)",
                    item.title(),
                    item.primary.quality,
                    item.alternatives.len()
                );
            }
        }
        Command::Reindex => {
            let count = engine.rebuild_index().await?;
            println!("Reindexed {count} records");
        }
        Command::RebuildProjections => {
            let count = engine.rebuild_projections().await?;
            println!("Rebuilt projections for {count} series");
        }
    }

    Ok(())
}

fn parse_kind(kind: Option<String>) -> Result<Option<ContentKind>> {
    match kind {
        None => Ok(None),
        Some(kind) => kind
            .parse()
            .map(Some)
            .map_err(|_| anyhow::anyhow!("unknown content kind '{kind}'")),
    }
}
