use anyhow::Result;
use axum::Router;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use tracing_subscriber::{fmt, EnvFilter};
use spider_server::{build_app, EngineConfig, ServerConfig};
use tokio::net::TcpListener;

#[derive(Parser)]
struct Args {
    /// SQLite store written by the crawler
    #[arg(long, default_value = "spider.db")]
    db: PathBuf,
    /// Stopword list, one token per line
    #[arg(long, default_value = "stopwords.txt")]
    stopwords: PathBuf,
    /// Host to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,
    /// Port to bind
    #[arg(long, default_value_t = 3001)]
    port: u16,
    /// Weight of title terms relative to body terms
    #[arg(long, default_value_t = 3.0)]
    title_boost: f64,
    /// Results returned per query
    #[arg(long, default_value_t = 50)]
    max_results: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let args = Args::parse();
    let config = ServerConfig {
        db_path: args.db,
        stopwords_path: args.stopwords,
        engine: EngineConfig { title_boost: args.title_boost, ..EngineConfig::default() },
        max_results: args.max_results,
    };
    let app: Router = build_app(&config)?;

    let addr: SocketAddr = format!("{}:{}", args.host, args.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "server listening");
    axum::serve(listener, app).await?;
    Ok(())
}
