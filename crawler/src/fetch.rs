use reqwest::{header, Client, Url};
use scraper::{ElementRef, Html, Selector};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("page unavailable: {0}")]
    Unavailable(String),
}

/// Raw response of one page fetch.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub body: String,
    pub last_modified: Option<String>,
}

/// Source of page bodies for the crawler.
pub trait Fetcher {
    fn fetch(&self, url: &Url) -> impl Future<Output = Result<FetchedPage, FetchError>> + Send;
}

/// Fetches pages over HTTP. Responses are not filtered by status code.
#[derive(Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage, FetchError> {
        let resp = self.client.get(url.clone()).send().await?;
        tracing::debug!(%url, status = %resp.status(), "fetched");
        let last_modified = resp
            .headers()
            .get(header::LAST_MODIFIED)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string());
        let body = resp.text().await?;
        Ok(FetchedPage { body, last_modified })
    }
}

/// What the crawler keeps from a parsed HTML document.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    pub title: Option<String>,
    pub text: String,
    /// Absolute http(s) targets of every `<a href>`, in document order.
    pub links: Vec<Url>,
}

pub struct PageParser {
    title: Selector,
    body: Selector,
    anchor: Selector,
}

impl Default for PageParser {
    fn default() -> Self { Self::new() }
}

impl PageParser {
    pub fn new() -> Self {
        Self {
            title: Selector::parse("title").expect("valid selector"),
            body: Selector::parse("body").expect("valid selector"),
            anchor: Selector::parse("a[href]").expect("valid selector"),
        }
    }

    pub fn parse(&self, html: &str, base: &Url) -> ParsedPage {
        let doc = Html::parse_document(html);
        let title = doc
            .select(&self.title)
            .next()
            .map(|n| n.text().collect::<String>().trim().to_string())
            .filter(|t| !t.is_empty());
        let root = doc.select(&self.body).next().unwrap_or_else(|| doc.root_element());
        let text = visible_text(root);

        let mut links = Vec::new();
        for a in doc.select(&self.anchor) {
            if let Some(href) = a.value().attr("href") {
                if let Ok(u) = base.join(href.trim()) {
                    if matches!(u.scheme(), "http" | "https") { links.push(normalize(&u)); }
                }
            }
        }
        ParsedPage { title, text, links }
    }
}

/// Text content outside script/style, whitespace collapsed.
fn visible_text(root: ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else { continue };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map_or(false, |e| matches!(e.name(), "script" | "style" | "noscript"))
        });
        if !hidden { raw.push_str(text); }
    }
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Drop the fragment so `page#top` and `page` are the same url.
pub fn normalize(u: &Url) -> Url { let mut s = u.clone(); s.set_fragment(None); s }
