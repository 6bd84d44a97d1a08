use spider_core::{Link, PageStore, StorageError, Stopwords};
use spider_crawler::{CrawlConfig, CrawlStats, Crawler, FetchError, FetchedPage, Fetcher};
use spider_indexer::Indexer;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Serves a fixed set of pages; anything else fails like a dead host.
struct StaticSite {
    pages: HashMap<String, String>,
    last_modified: HashMap<String, String>,
    hits: Arc<AtomicUsize>,
}

impl StaticSite {
    fn new(pages: Vec<(&str, String)>) -> Self {
        let pages = pages
            .into_iter()
            .map(|(path, html)| (format!("http://site.test{path}"), html))
            .collect();
        Self { pages, last_modified: HashMap::new(), hits: Arc::new(AtomicUsize::new(0)) }
    }

    fn with_last_modified(mut self, path: &str, value: &str) -> Self {
        self.last_modified.insert(format!("http://site.test{path}"), value.to_string());
        self
    }
}

impl Fetcher for StaticSite {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        self.hits.fetch_add(1, Ordering::SeqCst);
        match self.pages.get(url.as_str()) {
            Some(body) => Ok(FetchedPage {
                body: body.clone(),
                last_modified: self.last_modified.get(url.as_str()).cloned(),
            }),
            None => Err(FetchError::Unavailable(url.to_string())),
        }
    }
}

fn page(title: &str, body: &str, links: &[&str]) -> String {
    let anchors: String = links.iter().map(|l| format!(r#"<a href="{l}">{l}</a>"#)).collect();
    format!("<html><head><title>{title}</title></head><body><p>{body}</p>{anchors}</body></html>")
}

fn seed() -> Url { Url::parse("http://site.test/a").unwrap() }

async fn crawl_with(site: StaticSite, config: CrawlConfig) -> (Arc<PageStore>, CrawlStats) {
    let store = Arc::new(PageStore::open_in_memory().unwrap());
    let crawler = Crawler::new(site, Indexer::new(store.clone()), Stopwords::from_words(["the"]), config);
    let stats = crawler.run(seed()).await.unwrap();
    (store, stats)
}

async fn crawl(site: StaticSite, max_pages: usize) -> (Arc<PageStore>, CrawlStats) {
    crawl_with(site, CrawlConfig { max_pages, deadline: None }).await
}

fn edge(parent: &str, child: &str) -> Link {
    Link { parent_url: format!("http://site.test{parent}"), child_url: format!("http://site.test{child}") }
}

#[tokio::test]
async fn crawls_three_page_site() {
    let site = StaticSite::new(vec![
        ("/a", page("Page A", "alpha", &["/b", "c"])),
        ("/b", page("Page B", "beta", &["/c"])),
        ("/c", page("Page C", "gamma", &[])),
    ]);
    let (store, stats) = crawl(site, 3).await;

    assert_eq!(stats.pages_indexed, 3);
    let urls: Vec<String> = store.all_pages().unwrap().into_iter().map(|p| p.url).collect();
    assert_eq!(urls, vec!["http://site.test/a", "http://site.test/b", "http://site.test/c"]);
    // C is still only queued when B is processed, so B -> C is recorded.
    assert_eq!(store.all_links().unwrap(), vec![edge("/a", "/b"), edge("/a", "/c"), edge("/b", "/c")]);
}

#[tokio::test]
async fn links_to_visited_pages_are_not_recorded() {
    let site = StaticSite::new(vec![
        ("/a", page("Page A", "alpha", &["/b", "/c"])),
        ("/b", page("Page B", "beta", &["/a"])),
        ("/c", page("Page C", "gamma", &["/b", "/a"])),
    ]);
    let (store, stats) = crawl(site, 10).await;

    assert_eq!(stats.pages_indexed, 3);
    assert_eq!(stats.queued, 0);
    assert_eq!(store.all_links().unwrap(), vec![edge("/a", "/b"), edge("/a", "/c")]);
    assert!(store.parent_links("http://site.test/a").unwrap().is_empty());
}

#[tokio::test]
async fn page_cap_stops_before_link_extraction() {
    let site = StaticSite::new(vec![
        ("/a", page("Page A", "alpha", &["/b"])),
        ("/b", page("Page B", "beta", &["/c"])),
        ("/c", page("Page C", "gamma", &[])),
    ]);
    let (store, stats) = crawl(site, 2).await;

    assert_eq!(stats.pages_indexed, 2);
    assert_eq!(store.all_pages().unwrap().len(), 2);
    assert_eq!(store.all_links().unwrap(), vec![edge("/a", "/b")]);
}

#[tokio::test]
async fn failed_fetches_are_skipped() {
    let site = StaticSite::new(vec![
        ("/a", page("Page A", "alpha", &["/missing", "/b", "/b#top"])),
        ("/b", page("Page B", "beta", &[])),
    ]);
    let (store, stats) = crawl(site, 10).await;

    assert_eq!(stats.pages_indexed, 2);
    assert_eq!(stats.failed, 1);
    assert_eq!(stats.visited, 3);
    assert!(store.page_by_url("http://site.test/missing").unwrap().is_none());
    // the edge to the dead page is still part of the graph
    assert_eq!(store.child_links("http://site.test/a").unwrap().len(), 3);
}

#[tokio::test]
async fn stores_page_fields_and_keywords() {
    let html = page("Rust Guide", "the rust book", &[]);
    let site = StaticSite::new(vec![("/a", html.clone())]);
    let (store, _) = crawl(site, 1).await;

    let stored = store.page_by_url("http://site.test/a").unwrap().unwrap();
    assert_eq!(stored.title, "Rust Guide");
    assert_eq!(stored.last_modified, "Unknown");
    assert_eq!(stored.size, html.len() as u64);

    let rust = store.term_id("rust").unwrap().unwrap();
    assert_eq!(store.positions(spider_core::Field::Body, &stored.url, rust).unwrap(), vec![1]);
    assert_eq!(store.positions(spider_core::Field::Title, &stored.url, rust).unwrap(), vec![0]);
    assert!(store.term_id("the").unwrap().is_none());
}

#[tokio::test]
async fn untitled_page_gets_placeholder() {
    let site = StaticSite::new(vec![("/a", "<html><body>plain text</body></html>".to_string())]);
    let (store, _) = crawl(site, 1).await;
    assert_eq!(store.page_by_url("http://site.test/a").unwrap().unwrap().title, "No Title");
}

#[tokio::test]
async fn last_modified_header_is_stored() {
    let site = StaticSite::new(vec![
        ("/a", page("Page A", "alpha", &["/b"])),
        ("/b", page("Page B", "beta", &[])),
    ])
    .with_last_modified("/a", "Mon, 06 May 2024 10:00:00 GMT");
    let (store, _) = crawl(site, 10).await;

    let a = store.page_by_url("http://site.test/a").unwrap().unwrap();
    let b = store.page_by_url("http://site.test/b").unwrap().unwrap();
    assert_eq!(a.last_modified, "Mon, 06 May 2024 10:00:00 GMT");
    assert_eq!(b.last_modified, "Unknown");
}

#[tokio::test]
async fn expired_deadline_leaves_seed_queued() {
    let site = StaticSite::new(vec![("/a", page("Page A", "alpha", &["/b"]))]);
    let hits = site.hits.clone();
    let config = CrawlConfig { max_pages: 10, deadline: Some(Duration::ZERO) };
    let (store, stats) = crawl_with(site, config).await;

    assert_eq!(stats.pages_indexed, 0);
    assert_eq!(stats.visited, 0);
    assert_eq!(stats.queued, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
    assert!(store.all_pages().unwrap().is_empty());
}

#[tokio::test]
async fn storage_failure_aborts_crawl() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("spider.db");
    let store = Arc::new(PageStore::open(&path).unwrap());
    rusqlite::Connection::open(&path).unwrap().execute_batch("DROP TABLE pages;").unwrap();

    let site = StaticSite::new(vec![
        ("/a", page("Page A", "alpha", &["/b"])),
        ("/b", page("Page B", "beta", &[])),
    ]);
    let hits = site.hits.clone();
    let config = CrawlConfig { max_pages: 10, deadline: None };
    let crawler = Crawler::new(site, Indexer::new(store.clone()), Stopwords::new(), config);

    let err = crawler.run(seed()).await.unwrap_err();
    assert!(matches!(err, StorageError::Sqlite(_)), "{err}");
    // stopped at the first page instead of moving on to /b
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(store.all_links().unwrap().is_empty());
}
