use crate::snapshot::IndexSnapshot;
use lazy_static::lazy_static;
use parking_lot::RwLock;
use regex::Regex;
use serde::Serialize;
use spider_core::store::Result;
use spider_core::tokenizer::terms;
use spider_core::{Field, KeywordCount, Page, PageId, PageStore, Stopwords, TermId, NO_TITLE};
use std::cmp::Ordering;
use std::sync::Arc;

lazy_static! {
    static ref PHRASE_RE: Regex = Regex::new(r#""([^"]*)""#).expect("valid regex");
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Title term multiplier in document vectors, and the score a title phrase match adds.
    pub title_boost: f64,
    pub snippet_chars: usize,
    pub keyword_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self { Self { title_boost: 3.0, snippet_chars: 200, keyword_limit: 10 } }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResult {
    pub id: PageId,
    pub url: String,
    pub title: String,
    pub snippet: String,
    pub score: f64,
    pub size: u64,
    pub last_modified: String,
    pub keywords: Vec<KeywordCount>,
    pub parent_links: Vec<String>,
    pub child_links: Vec<String>,
}

/// Ranks stored pages against free-text queries with quoted phrases.
///
/// Queries read the current [`IndexSnapshot`]; [`SearchEngine::build_index`]
/// replaces it wholesale, so in-flight searches keep the snapshot they started with.
pub struct SearchEngine {
    store: Arc<PageStore>,
    stopwords: Stopwords,
    config: EngineConfig,
    snapshot: RwLock<Arc<IndexSnapshot>>,
}

impl SearchEngine {
    pub fn new(store: Arc<PageStore>, stopwords: Stopwords, config: EngineConfig) -> Self {
        Self { store, stopwords, config, snapshot: RwLock::new(Arc::new(IndexSnapshot::empty())) }
    }

    /// Load every page from the store and swap in a freshly built snapshot.
    pub fn build_index(&self) -> Result<Arc<IndexSnapshot>> {
        let pages = self.store.all_pages()?;
        let snap = Arc::new(IndexSnapshot::build(pages, &self.stopwords, self.config.title_boost));
        tracing::info!(docs = snap.num_docs(), terms = snap.num_terms(), "index built");
        *self.snapshot.write() = snap.clone();
        Ok(snap)
    }

    pub fn snapshot(&self) -> Arc<IndexSnapshot> { self.snapshot.read().clone() }

    pub fn config(&self) -> &EngineConfig { &self.config }

    /// Phrase boost of one document: `title_boost` for a title match plus 1.0
    /// for a body match. Phrase words that are stopwords are dropped first.
    pub fn check_phrase_match(&self, phrase: &str, doc_id: PageId) -> Result<f64> {
        let snap = self.snapshot();
        let Some(doc) = snap.doc(doc_id) else { return Ok(0.0) };
        match self.resolve_phrase(phrase)? {
            Some(term_ids) => self.phrase_score(&term_ids, &doc.url),
            None => Ok(0.0),
        }
    }

    /// Rank every document by cosine similarity, scaled up by phrase matches:
    /// `score = sim + sim * boost`. Only positive scores are returned, best first.
    pub fn search(&self, query: &str) -> Result<Vec<SearchResult>> {
        let snap = self.snapshot();
        let (phrases, rest) = extract_phrases(query);

        let mut query_terms = terms(&rest, &self.stopwords);
        for phrase in &phrases {
            query_terms.extend(terms(phrase, &self.stopwords));
        }
        let query_vector = snap.query_vector(&query_terms);
        if query_vector.is_empty() {
            return Ok(Vec::new());
        }

        let resolved = phrases
            .iter()
            .map(|p| self.resolve_phrase(p))
            .collect::<Result<Vec<_>>>()?;

        let mut scored: Vec<(&Page, f64)> = Vec::new();
        for doc in snap.docs() {
            let similarity = snap.cosine_similarity(&query_vector, doc.id);
            // boost only multiplies, so zero similarity stays zero
            if similarity <= 0.0 { continue; }
            let mut boost = 0.0;
            for term_ids in resolved.iter().flatten() {
                boost += self.phrase_score(term_ids, &doc.url)?;
            }
            let score = similarity + similarity * boost;
            if score > 0.0 {
                scored.push((doc, score));
            }
        }
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal).then(a.0.id.cmp(&b.0.id)));

        let mut results = Vec::with_capacity(scored.len());
        for (doc, score) in scored {
            results.push(self.present(doc, score)?);
        }
        tracing::debug!(query, hits = results.len(), phrases = phrases.len(), "search");
        Ok(results)
    }

    fn present(&self, doc: &Page, score: f64) -> Result<SearchResult> {
        let title = if doc.title.trim().is_empty() { NO_TITLE.to_string() } else { doc.title.clone() };
        Ok(SearchResult {
            id: doc.id,
            url: doc.url.clone(),
            title,
            snippet: snippet(&doc.content, self.config.snippet_chars),
            score,
            size: doc.size,
            last_modified: doc.last_modified.clone(),
            keywords: self.store.top_keywords(&doc.url, self.config.keyword_limit)?,
            parent_links: self.store.parent_links(&doc.url)?,
            child_links: self.store.child_links(&doc.url)?,
        })
    }

    /// Term ids of the phrase's stems, or `None` if the phrase cannot match
    /// (no words left, or a word outside the vocabulary).
    fn resolve_phrase(&self, phrase: &str) -> Result<Option<Vec<TermId>>> {
        let words = terms(phrase, &self.stopwords);
        if words.is_empty() {
            return Ok(None);
        }
        let mut ids = Vec::with_capacity(words.len());
        for word in &words {
            match self.store.term_id(word)? {
                Some(id) => ids.push(id),
                None => return Ok(None),
            }
        }
        Ok(Some(ids))
    }

    fn phrase_score(&self, term_ids: &[TermId], url: &str) -> Result<f64> {
        let mut score = 0.0;
        if self.field_match(Field::Title, term_ids, url)? {
            score += self.config.title_boost;
        }
        if self.field_match(Field::Body, term_ids, url)? {
            score += 1.0;
        }
        Ok(score)
    }

    fn field_match(&self, field: Field, term_ids: &[TermId], url: &str) -> Result<bool> {
        let mut lists = Vec::with_capacity(term_ids.len());
        for &id in term_ids {
            let positions = self.store.positions(field, url, id)?;
            if positions.is_empty() {
                return Ok(false);
            }
            lists.push(positions);
        }
        Ok(consecutive_run(&lists))
    }
}

/// True if some `p` in the first list has `p + i` in the i-th list for every i.
/// Lists must be sorted ascending.
fn consecutive_run(lists: &[Vec<usize>]) -> bool {
    let Some((first, rest)) = lists.split_first() else { return false };
    first.iter().any(|&start| {
        rest.iter()
            .enumerate()
            .all(|(i, list)| list.binary_search(&(start + i + 1)).is_ok())
    })
}

/// Split a query into its double-quoted phrases and the text outside them.
pub fn extract_phrases(query: &str) -> (Vec<String>, String) {
    let phrases = PHRASE_RE.captures_iter(query).map(|c| c[1].to_string()).collect();
    // quoted spans are removed outright, so `foo"x"bar` leaves `foobar`
    let rest = PHRASE_RE.replace_all(query, "").into_owned();
    (phrases, rest)
}

fn snippet(content: &str, max_chars: usize) -> String {
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() { format!("{head}...") } else { head }
}
