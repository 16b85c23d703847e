//! Steamgraph main entry point
//!
//! This is the command-line interface for the Steamgraph friend-graph crawler.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use steamgraph::config::{load_config_with_hash, Config, QueueBackend};
use steamgraph::crawler::{wait_until_finished, CrawlRequest};
use steamgraph::output::{
    export_graph, print_crawl_report, CrawlReport, GraphExporter, JsonExporter, MarkdownExporter,
};
use steamgraph::steam::is_profile_private;
use steamgraph::{collect_graph_data, CrawlContext, CrawlDispatcher, CrawlWorkerPool};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// How often `crawl --wait` polls the crawl status
const STATUS_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Steamgraph: a Steam friend-graph crawler
///
/// Steamgraph crawls a Steam user and their friends up to a bounded number
/// of friend hops, then builds a graph of the users reached together with
/// their most played games.
#[derive(Parser, Debug)]
#[command(name = "steamgraph")]
#[command(version = "1.0.0")]
#[command(about = "A Steam friend-graph crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose", global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start a crawl for one or more SteamIDs
    Crawl {
        /// 17-digit SteamIDs to crawl
        #[arg(required = true, value_name = "STEAM_ID")]
        steam_ids: Vec<String>,

        /// Friend hops to follow from each target
        #[arg(short, long, default_value_t = 1)]
        level: u32,

        /// Run workers in-process, wait for the crawl and build its graph
        #[arg(long)]
        wait: bool,
    },

    /// Run a crawl worker pool until Ctrl+C
    Worker,

    /// Build and store the graph of a finished crawl
    CreateGraph {
        #[arg(value_name = "CRAWL_ID")]
        crawl_id: String,
    },

    /// Show the progress of a crawl
    Status {
        #[arg(value_name = "CRAWL_ID")]
        crawl_id: String,
    },

    /// Export the stored graph of a crawl as JSON
    Export {
        #[arg(value_name = "CRAWL_ID")]
        crawl_id: String,

        /// Also write a markdown summary
        #[arg(long)]
        markdown: bool,
    },

    /// Look up a finished crawl of a SteamID at a level
    CrawledBefore {
        #[arg(value_name = "STEAM_ID")]
        steam_id: String,

        /// Friend hops the crawl followed
        #[arg(short, long, default_value_t = 1)]
        level: u32,
    },

    /// Check whether a Steam profile is private
    CheckProfile {
        #[arg(value_name = "STEAM_ID")]
        steam_id: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let ctx = Arc::new(
        CrawlContext::from_config(&config)
            .await
            .context("failed to set up crawl context")?,
    );

    match cli.command {
        Command::Crawl {
            steam_ids,
            level,
            wait,
        } => handle_crawl(&config, ctx, steam_ids, level, wait).await,
        Command::Worker => handle_worker(&config, ctx).await,
        Command::CreateGraph { crawl_id } => handle_create_graph(&ctx, &crawl_id).await,
        Command::Status { crawl_id } => handle_status(&ctx, &crawl_id).await,
        Command::Export { crawl_id, markdown } => {
            handle_export(&config, &ctx, &crawl_id, markdown).await
        }
        Command::CrawledBefore { steam_id, level } => {
            handle_crawled_before(ctx, &steam_id, level).await
        }
        Command::CheckProfile { steam_id } => handle_check_profile(&ctx, &steam_id).await,
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("steamgraph=info,warn"),
            1 => EnvFilter::new("steamgraph=debug,info"),
            2 => EnvFilter::new("steamgraph=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles `crawl`: validates the request and seeds one crawl per SteamID
async fn handle_crawl(
    config: &Config,
    ctx: Arc<CrawlContext>,
    steam_ids: Vec<String>,
    level: u32,
    wait: bool,
) -> anyhow::Result<()> {
    if !wait && config.queue.backend == QueueBackend::Memory {
        tracing::warn!("The memory queue lives in this process; without --wait no worker will see these jobs");
    }

    // Workers have to be consuming before the root jobs are published
    let cancel = CancellationToken::new();
    let pool_handle = if wait {
        let pool = CrawlWorkerPool::new(Arc::clone(&ctx), ctx.settings.crawl_workers);
        let token = cancel.clone();
        Some(tokio::spawn(async move { pool.run(token).await }))
    } else {
        None
    };

    let dispatcher = CrawlDispatcher::new(Arc::clone(&ctx));
    let started = dispatcher
        .crawl_users(&CrawlRequest { steam_ids, level })
        .await
        .context("crawl request rejected")?;

    for crawl in &started {
        println!("{}  {}", crawl.crawl_id, crawl.steam_id);
    }

    let Some(pool_handle) = pool_handle else {
        return Ok(());
    };

    let mut outcome = Ok(());
    for crawl in &started {
        let result = async {
            let status =
                wait_until_finished(ctx.store.as_ref(), &crawl.crawl_id, STATUS_POLL_INTERVAL)
                    .await?;
            print_crawl_report(&CrawlReport::from(&status));
            collect_graph_data(&ctx, &crawl.crawl_id).await?;
            println!("Graph stored for crawl {}", crawl.crawl_id);
            Ok::<(), steamgraph::CrawlerError>(())
        }
        .await;

        if let Err(e) = result {
            tracing::error!(crawl_id = %crawl.crawl_id, "Crawl did not complete: {}", e);
            outcome = Err(e);
        }
    }

    cancel.cancel();
    pool_handle.await.context("worker pool panicked")??;
    outcome.map_err(Into::into)
}

/// Handles `worker`: consumes crawl jobs until Ctrl+C
async fn handle_worker(config: &Config, ctx: Arc<CrawlContext>) -> anyhow::Result<()> {
    if config.queue.backend == QueueBackend::Memory {
        tracing::warn!("Running a worker on the memory queue; only jobs published by this process are seen");
    }

    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Ctrl+C received, stopping workers");
            token.cancel();
        }
    });

    let pool = CrawlWorkerPool::new(Arc::clone(&ctx), ctx.settings.crawl_workers);
    pool.run(cancel).await?;
    Ok(())
}

/// Handles `create-graph`: builds and stores the graph of a crawl
async fn handle_create_graph(ctx: &CrawlContext, crawl_id: &str) -> anyhow::Result<()> {
    let graph = collect_graph_data(ctx, crawl_id).await?;

    println!("=== Graph for crawl {} ===\n", crawl_id);
    println!("  Target: {}", graph.user_details.user.steam_id());
    println!("  Friends: {}", graph.friend_details.len());
    println!("  Top games: {}", graph.top_game_details.len());
    Ok(())
}

/// Handles `status`: prints a crawl's progress report
async fn handle_status(ctx: &CrawlContext, crawl_id: &str) -> anyhow::Result<()> {
    let Some(status) = ctx.store.fetch_crawl_status(crawl_id).await? else {
        bail!("no crawl with ID {}", crawl_id);
    };

    print_crawl_report(&CrawlReport::from(&status));
    Ok(())
}

/// Handles `export`: writes a stored graph to the export directory
async fn handle_export(
    config: &Config,
    ctx: &CrawlContext,
    crawl_id: &str,
    markdown: bool,
) -> anyhow::Result<()> {
    let json = JsonExporter::new(&config.output.export_dir);
    let summary = MarkdownExporter::new(&config.output.export_dir);

    let mut exporters: Vec<&dyn GraphExporter> = vec![&json];
    if markdown {
        exporters.push(&summary);
    }

    for path in export_graph(ctx.store.as_ref(), crawl_id, &exporters).await? {
        println!("Wrote {}", path.display());
    }
    Ok(())
}

/// Handles `crawled-before`: prints the crawl ID of an earlier finished crawl
async fn handle_crawled_before(
    ctx: Arc<CrawlContext>,
    steam_id: &str,
    level: u32,
) -> anyhow::Result<()> {
    let dispatcher = CrawlDispatcher::new(ctx);
    match dispatcher.has_been_crawled_before(steam_id, level).await? {
        Some(crawl_id) => println!("{}  {}", crawl_id, steam_id),
        None => println!("{} has not been crawled at level {}", steam_id, level),
    }
    Ok(())
}

/// Handles `check-profile`: reports whether a profile's friends are visible
async fn handle_check_profile(ctx: &CrawlContext, steam_id: &str) -> anyhow::Result<()> {
    if !steamgraph::steam::is_valid_steam_id(steam_id) {
        bail!("{} is not a 17-digit SteamID", steam_id);
    }

    let private = is_profile_private(ctx.steam.as_ref(), steam_id).await?;
    println!(
        "{} is {}",
        steam_id,
        if private { "private" } else { "public" }
    );
    Ok(())
}
