pub mod fetch;

use spider_core::{StorageError, Stopwords, NO_TITLE, UNKNOWN_LAST_MODIFIED};
use spider_indexer::Indexer;
use std::collections::{HashSet, VecDeque};
use std::time::{Duration, Instant};
use url::Url;

pub use fetch::{FetchError, FetchedPage, Fetcher, HttpFetcher, PageParser, ParsedPage};

#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Stop once this many pages have been indexed.
    pub max_pages: usize,
    /// Optional wall-clock budget for the whole crawl.
    pub deadline: Option<Duration>,
}

impl Default for CrawlConfig {
    fn default() -> Self { Self { max_pages: 300, deadline: None } }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStats {
    pub pages_indexed: usize,
    pub visited: usize,
    pub failed: usize,
    /// Urls still queued when the crawl stopped.
    pub queued: usize,
}

/// Breadth-first crawler feeding every fetched page to an [`Indexer`].
///
/// Runs on a single task: one fetch at a time, queue and visited set owned by
/// [`Crawler::run`].
pub struct Crawler<F> {
    fetcher: F,
    indexer: Indexer,
    stopwords: Stopwords,
    parser: PageParser,
    config: CrawlConfig,
}

impl<F: Fetcher> Crawler<F> {
    pub fn new(fetcher: F, indexer: Indexer, stopwords: Stopwords, config: CrawlConfig) -> Self {
        Self { fetcher, indexer, stopwords, parser: PageParser::new(), config }
    }

    /// Crawl from `seed` until the queue drains, `max_pages` pages are indexed,
    /// or the deadline passes.
    ///
    /// A failed fetch is logged and skipped. A storage error aborts the crawl.
    /// Edges are only recorded towards urls not yet visited when the link is seen.
    pub async fn run(&self, seed: Url) -> Result<CrawlStats, StorageError> {
        let started = Instant::now();
        let mut queue: VecDeque<Url> = VecDeque::from([fetch::normalize(&seed)]);
        let mut visited: HashSet<String> = HashSet::new();
        let mut stats = CrawlStats::default();

        while let Some(current) = queue.pop_front() {
            if stats.pages_indexed >= self.config.max_pages { break; }
            if let Some(limit) = self.config.deadline {
                if started.elapsed() >= limit {
                    tracing::warn!(elapsed_s = started.elapsed().as_secs_f64(), "crawl deadline reached");
                    queue.push_front(current);
                    break;
                }
            }
            let url = current.as_str().to_string();
            if !visited.insert(url.clone()) { continue; }

            tracing::info!(%url, "crawling");
            let fetched = match self.fetcher.fetch(&current).await {
                Ok(page) => page,
                Err(err) => {
                    tracing::warn!(%url, error = %err, "failed to crawl");
                    stats.failed += 1;
                    continue;
                }
            };

            let page = self.parser.parse(&fetched.body, &current);
            let title = page.title.as_deref().unwrap_or(NO_TITLE);
            let last_modified = fetched.last_modified.as_deref().unwrap_or(UNKNOWN_LAST_MODIFIED);
            let size = fetched.body.len() as u64;

            if self.indexer.index_page(&url, title, &page.text, last_modified, size)? {
                self.indexer.index_keywords(&url, &page.text, &self.stopwords, title)?;
            } else {
                tracing::debug!(%url, "page already stored, keywords left as is");
            }
            stats.pages_indexed += 1;
            if stats.pages_indexed >= self.config.max_pages { break; }

            for link in page.links {
                if visited.contains(link.as_str()) { continue; }
                self.indexer.index_link(&url, link.as_str())?;
                queue.push_back(link);
            }
        }

        stats.visited = visited.len();
        stats.queued = queue.len();
        tracing::info!(
            pages_indexed = stats.pages_indexed,
            visited = stats.visited,
            failed = stats.failed,
            queued = stats.queued,
            elapsed_s = started.elapsed().as_secs_f64(),
            "crawl done"
        );
        Ok(stats)
    }
}
