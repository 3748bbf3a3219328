use anyhow::Context;
use clap::{Args, Parser};
use nt_core::{ArticleStorage, CanonicalArticle};
use nt_images::{HttpImageProbe, ImageResolver};
use nt_storage::{FeedFilter, FeedView, MemoryStorage, SentimentFilter};
use nt_sync::{init_logging, parse_duration, sync_once, HttpArticleSource, PollScheduler, SyncConfig, SyncStatus};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

fn parse_interval(s: &str) -> std::result::Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Live news feed with sentiment, from the terminal", long_about = None)]
pub struct Cli {
    /// Backend base URL (overrides NT_BACKEND_URL)
    #[arg(long, global = true)]
    backend_url: Option<String>,
    /// Articles requested per poll (overrides NT_BATCH_SIZE)
    #[arg(long, global = true)]
    count: Option<usize>,
    /// Articles per page (overrides NT_PAGE_SIZE)
    #[arg(long, global = true)]
    page_size: Option<usize>,
    /// Request timeout, e.g. 10s (overrides NT_REQUEST_TIMEOUT)
    #[arg(long, global = true, value_parser = parse_interval)]
    timeout: Option<Duration>,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Fetch one batch and print the first page
    Fetch {
        #[command(flatten)]
        filter: FilterArgs,
        /// Pages to show
        #[arg(long, default_value_t = 1)]
        pages: usize,
    },
    /// Keep polling and reprint the feed after every poll
    Watch {
        #[command(flatten)]
        filter: FilterArgs,
        /// Poll interval, e.g. 45s, 1m30s (overrides NT_POLL_INTERVAL)
        #[arg(long, value_parser = parse_interval)]
        interval: Option<Duration>,
    },
    /// Resolve an image reference through the fallback chain
    Image {
        reference: String,
        /// Shown when every candidate fails (overrides NT_PLACEHOLDER)
        #[arg(long)]
        placeholder: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
struct FilterArgs {
    /// Case-insensitive search over title and description
    #[arg(long, short, default_value = "")]
    query: String,
    /// Category name, or "all"
    #[arg(long, default_value = "all")]
    category: String,
    /// positive, neutral, negative or all
    #[arg(long, default_value = "all")]
    sentiment: SentimentFilter,
}

impl FilterArgs {
    fn filter(&self) -> FeedFilter {
        FeedFilter::new()
            .with_query(self.query.clone())
            .with_category(self.category.clone())
            .with_sentiment(self.sentiment)
    }
}

impl Cli {
    fn config(&self) -> anyhow::Result<SyncConfig> {
        let mut config = SyncConfig::from_env().context("reading NT_* environment")?;
        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(count) = self.count {
            config.batch_size = count;
        }
        if let Some(page_size) = self.page_size {
            config.page_size = page_size;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout = timeout;
        }
        match &self.command {
            Commands::Watch { interval: Some(interval), .. } => config.poll_interval = *interval,
            Commands::Image { placeholder: Some(placeholder), .. } => config.placeholder = placeholder.clone(),
            _ => {}
        }
        config.validate()?;
        Ok(config)
    }
}

fn print_article(article: &CanonicalArticle) {
    println!(
        "{} {:<8} {:>5.2}  {}",
        article.sentiment.emoji(),
        article.sentiment,
        article.sentiment_score,
        article.title
    );
    println!(
        "   {} | {} | {}",
        article.source,
        article.category,
        article.freshness().format("%Y-%m-%d %H:%M")
    );
    if let Some(url) = &article.url {
        println!("   {}", url);
    }
}

fn print_feed(view: &FeedView) {
    let visible = view.visible();
    if visible.is_empty() {
        println!("No articles match the current filters.");
    }
    for article in &visible {
        print_article(article);
    }

    let summary = view.summary();
    println!(
        "\n{} shown of {} | 📈 {} ➖ {} 📉 {} ❔ {} | avg score {:.2}{}",
        visible.len(),
        summary.total(),
        summary.positive,
        summary.neutral,
        summary.negative,
        summary.unknown,
        summary.average_score,
        if view.has_more() { " | more available" } else { "" }
    );
}

fn print_status(status: &SyncStatus) {
    match (&status.last_error, &status.last_report) {
        (Some(error), _) => warn!("⚠️ poll {} failed: {}", status.polls, error),
        (None, Some(report)) => info!(
            "🔄 poll {}: {} new, {} updated, {} unchanged ({} stored)",
            status.polls, report.new, report.updated, report.unchanged, status.article_count
        ),
        (None, None) => {}
    }
}

async fn fetch(config: &SyncConfig, filter: FeedFilter, pages: usize) -> anyhow::Result<()> {
    let source = HttpArticleSource::from_config(config)?;
    let storage = MemoryStorage::new();

    info!("📰 Fetching {} articles from {}", config.batch_size, config.backend_url);
    let report = sync_once(&source, &storage, config.batch_size).await?;
    info!("✨ {} new, {} updated, {} unchanged", report.new, report.updated, report.unchanged);

    let mut view = FeedView::new(storage.snapshot().await, filter, config.page_size);
    for _ in 1..pages {
        if !view.load_more() {
            break;
        }
    }
    print_feed(&view);
    Ok(())
}

async fn watch(config: &SyncConfig, filter: FeedFilter) -> anyhow::Result<()> {
    let logger = init_logging(Level::INFO).with_prefix("watch");
    let source = Arc::new(HttpArticleSource::from_config(config)?);
    let storage = Arc::new(MemoryStorage::new());

    let mut scheduler = PollScheduler::from_config(source, storage.clone(), config).with_logger(logger.clone());
    let mut status = scheduler.subscribe();
    let mut view = FeedView::new(storage.snapshot().await, filter, config.page_size);
    scheduler.start();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                logger.info("👋 Ctrl-C received");
                break;
            }
            changed = status.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = status.borrow_and_update().clone();
                print_status(&current);
                if current.last_error.is_none() {
                    view.refresh(storage.snapshot().await);
                    print_feed(&view);
                }
            }
        }
    }

    scheduler.stop().await;
    Ok(())
}

async fn image(config: &SyncConfig, reference: &str) -> anyhow::Result<()> {
    let probe = HttpImageProbe::new(config.request_timeout)?;
    let resolver = ImageResolver::new(Arc::new(probe), config.backend_url.clone(), config.placeholder.clone());

    info!("🖼️ Resolving {}", reference);
    let resolution = resolver.resolve_detached(Some(reference)).await;
    for (index, outcome) in resolution.outcomes.iter().enumerate() {
        match &outcome.error {
            None => println!("{}. ✅ {:<8} {}", index + 1, outcome.candidate.kind, outcome.candidate.url),
            Some(error) => println!(
                "{}. ❌ {:<8} {} ({})",
                index + 1,
                outcome.candidate.kind,
                outcome.candidate.url,
                error
            ),
        }
    }
    println!("{}", resolution.state);
    println!("{}", resolution.source());
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(if cli.verbose { Level::DEBUG } else { Level::INFO });
    let config = cli.config()?;

    match cli.command {
        Commands::Fetch { filter, pages } => fetch(&config, filter.filter(), pages).await,
        Commands::Watch { filter, .. } => watch(&config, filter.filter()).await,
        Commands::Image { reference, .. } => image(&config, &reference).await,
    }
}
