use anyhow::{Context, Result};
use clap::Parser;
use spider_core::{PageStore, Stopwords};
use spider_crawler::{CrawlConfig, Crawler, HttpFetcher};
use spider_indexer::Indexer;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, EnvFilter};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "spider-crawler")]
#[command(about = "Crawl a site breadth-first into a SQLite page store")]
struct Cli {
    /// Start url
    #[arg(long)]
    seed: String,
    /// SQLite store to write
    #[arg(long, default_value = "spider.db")]
    db: String,
    /// Maximum number of pages to index
    #[arg(long, default_value_t = 300)]
    max_pages: usize,
    /// Stopword list, one token per line
    #[arg(long, default_value = "stopwords.txt")]
    stopwords: String,
    /// Request timeout seconds
    #[arg(long, default_value_t = 12)]
    timeout_secs: u64,
    /// Stop crawling after this many seconds
    #[arg(long)]
    deadline_secs: Option<u64>,
    /// User-Agent string sent with every request
    #[arg(long, default_value = "spider-crawler/0.1")]
    user_agent: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Cli::parse();

    let seed = Url::parse(&args.seed)
        .or_else(|_| Url::parse(&format!("https://{}", args.seed)))
        .with_context(|| format!("invalid seed url: {}", args.seed))?;
    let store = Arc::new(PageStore::open(&args.db).with_context(|| format!("opening {}", args.db))?);
    let stopwords = Stopwords::load(&args.stopwords);
    let fetcher = HttpFetcher::new(&args.user_agent, Duration::from_secs(args.timeout_secs))?;
    let config = CrawlConfig {
        max_pages: args.max_pages,
        deadline: args.deadline_secs.map(Duration::from_secs),
    };
    tracing::info!(%seed, max_pages = config.max_pages, db = %args.db, stopwords = stopwords.len(), "starting crawl");

    let crawler = Crawler::new(fetcher, Indexer::new(store), stopwords, config);
    let stats = crawler.run(seed).await?;
    println!("Done! Indexed {} pages", stats.pages_indexed);
    Ok(())
}
