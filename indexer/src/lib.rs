use spider_core::store::Result;
use spider_core::tokenizer::tokenize;
use spider_core::{Field, PageStore, Stopwords};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Writes crawled pages into a [`PageStore`]: the page row, its outgoing links,
/// and per-field term frequencies with their positions.
#[derive(Clone)]
pub struct Indexer {
    store: Arc<PageStore>,
}

impl Indexer {
    pub fn new(store: Arc<PageStore>) -> Self { Self { store } }

    pub fn store(&self) -> &Arc<PageStore> { &self.store }

    /// Store the page row. Returns `false` if the url was already present.
    pub fn index_page(&self, url: &str, title: &str, content: &str, last_modified: &str, size: u64) -> Result<bool> {
        self.store.insert_page(url, title, content, last_modified, size)
    }

    pub fn index_link(&self, parent_url: &str, child_url: &str) -> Result<()> {
        self.store.insert_link(parent_url, child_url)
    }

    /// Tokenize title and body separately (each field has its own position space
    /// starting at 0) and write one frequency row plus the full position list for
    /// every distinct stem.
    pub fn index_keywords(&self, url: &str, content: &str, stopwords: &Stopwords, title: &str) -> Result<()> {
        for (field, text) in [(Field::Body, content), (Field::Title, title)] {
            let grouped = group_positions(text, stopwords);
            let distinct = grouped.len();
            for (term, positions) in grouped {
                let term_id = self.store.get_or_create_term_id(&term)?;
                self.store.insert_field_keyword(field, url, term_id, positions.len() as u32)?;
                self.store.insert_field_positions(field, url, term_id, &positions)?;
            }
            tracing::debug!(url, ?field, distinct, "indexed field");
        }
        Ok(())
    }
}

/// Stem -> ascending positions.
pub fn group_positions(text: &str, stopwords: &Stopwords) -> BTreeMap<String, Vec<usize>> {
    let mut grouped: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (term, pos) in tokenize(text, stopwords) {
        grouped.entry(term).or_default().push(pos);
    }
    grouped
}
