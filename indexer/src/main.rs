use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use spider_core::PageStore;
use tracing_subscriber::{EnvFilter, fmt};

#[derive(Parser)]
#[command(name = "spider-indexer")]
#[command(about = "Inspect a crawled page store", long_about = None)]
struct Cli {
    /// SQLite store written by the crawler
    #[arg(long, default_value = "spider.db")]
    db: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print row counts per table and a sample of stored pages
    Inspect {
        /// Number of pages to show
        #[arg(long, default_value_t = 5)]
        sample: usize,
    },
    /// Print the most frequent body keywords of one page
    Keywords {
        #[arg(long)]
        url: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let store = PageStore::open(&cli.db)?;

    match cli.command {
        Commands::Inspect { sample } => inspect(&store, sample),
        Commands::Keywords { url, limit } => keywords(&store, &url, limit),
    }
}

fn inspect(store: &PageStore, sample: usize) -> Result<()> {
    for (table, rows) in store.table_counts()? {
        println!("{table:<16} {rows}");
    }
    let pages = store.all_pages()?;
    for page in pages.iter().take(sample) {
        let rec = serde_json::json!({
            "id": page.id,
            "url": page.url,
            "title": page.title,
            "last_modified": page.last_modified,
            "size": page.size,
            "children": store.child_links(&page.url)?.len(),
        });
        println!("{}", serde_json::to_string(&rec)?);
    }
    tracing::info!(pages = pages.len(), "inspection complete");
    Ok(())
}

fn keywords(store: &PageStore, url: &str, limit: usize) -> Result<()> {
    if store.page_by_url(url)?.is_none() {
        return Err(anyhow!("page not found: {url}"));
    }
    for kw in store.top_keywords(url, limit)? {
        println!("{:<24} {}", kw.word, kw.frequency);
    }
    Ok(())
}
