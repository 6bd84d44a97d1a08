use spider_core::tokenizer::terms;
use spider_core::{Page, PageId, Stopwords};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Posting {
    pub doc_id: PageId,
    /// Raw frequency in the title-boosted term multiset.
    pub freq: u32,
}

/// Sparse tf-idf vector with its Euclidean norm.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightVector {
    pub weights: BTreeMap<String, f64>,
    pub norm: f64,
}

impl WeightVector {
    fn from_weights(weights: BTreeMap<String, f64>) -> Self {
        let norm = weights.values().map(|w| w * w).sum::<f64>().sqrt();
        Self { weights, norm }
    }

    pub fn dot(&self, other: &WeightVector) -> f64 {
        let (small, large) = if self.weights.len() <= other.weights.len() { (self, other) } else { (other, self) };
        small
            .weights
            .iter()
            .filter_map(|(term, w)| large.weights.get(term).map(|o| w * o))
            .sum()
    }

    pub fn is_empty(&self) -> bool { self.weights.is_empty() }
}

/// Immutable vector-space model over every stored page.
///
/// Built in one pass by [`IndexSnapshot::build`]; a rebuild produces a new value.
#[derive(Debug, Default)]
pub struct IndexSnapshot {
    docs: BTreeMap<PageId, Page>,
    postings: HashMap<String, Vec<Posting>>,
    idf: HashMap<String, f64>,
    max_tf: HashMap<PageId, u32>,
    vectors: HashMap<PageId, WeightVector>,
}

impl IndexSnapshot {
    pub fn empty() -> Self { Self::default() }

    /// The title's terms are counted `title_boost` times (truncated to an
    /// integer), the body's once. Weights are `(tf / max_tf) * ln(N / df)`.
    pub fn build(pages: Vec<Page>, stopwords: &Stopwords, title_boost: f64) -> Self {
        let repeat = title_boost.max(0.0) as u32;
        let mut snap = Self::default();
        let mut doc_tf: Vec<(PageId, BTreeMap<String, u32>, u32)> = Vec::with_capacity(pages.len());

        for page in pages {
            let mut tf: BTreeMap<String, u32> = BTreeMap::new();
            if repeat > 0 {
                for term in terms(&page.title, stopwords) {
                    *tf.entry(term).or_insert(0) += repeat;
                }
            }
            for term in terms(&page.content, stopwords) {
                *tf.entry(term).or_insert(0) += 1;
            }
            let max_tf = tf.values().copied().max().unwrap_or(1).max(1);
            for (term, &freq) in &tf {
                snap.postings.entry(term.clone()).or_default().push(Posting { doc_id: page.id, freq });
            }
            snap.max_tf.insert(page.id, max_tf);
            doc_tf.push((page.id, tf, max_tf));
            snap.docs.insert(page.id, page);
        }

        let n = snap.docs.len() as f64;
        for (term, plist) in &snap.postings {
            snap.idf.insert(term.clone(), (n / plist.len() as f64).ln());
        }

        for (doc_id, tf, max_tf) in doc_tf {
            let weights = tf
                .into_iter()
                .map(|(term, freq)| {
                    let idf = snap.idf[&term];
                    let w = (freq as f64 / max_tf as f64) * idf;
                    (term, w)
                })
                .collect();
            snap.vectors.insert(doc_id, WeightVector::from_weights(weights));
        }
        snap
    }

    /// Weight query terms the same way as documents, normalizing by the query's
    /// own max frequency. Terms outside the vocabulary are dropped.
    pub fn query_vector(&self, terms: &[String]) -> WeightVector {
        let mut tf: BTreeMap<&str, u32> = BTreeMap::new();
        for t in terms {
            *tf.entry(t.as_str()).or_insert(0) += 1;
        }
        let max_tf = tf.values().copied().max().unwrap_or(1).max(1);
        let weights = tf
            .into_iter()
            .filter_map(|(term, freq)| {
                self.idf.get(term).map(|idf| (term.to_string(), (freq as f64 / max_tf as f64) * idf))
            })
            .collect();
        WeightVector::from_weights(weights)
    }

    /// Cosine of the angle between the query and a document; 0 when either
    /// vector has zero length or the document is unknown.
    pub fn cosine_similarity(&self, query: &WeightVector, doc_id: PageId) -> f64 {
        let Some(doc) = self.vectors.get(&doc_id) else { return 0.0 };
        if query.norm == 0.0 || doc.norm == 0.0 {
            return 0.0;
        }
        query.dot(doc) / (query.norm * doc.norm)
    }

    pub fn idf(&self, term: &str) -> Option<f64> { self.idf.get(term).copied() }

    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn document_vector(&self, doc_id: PageId) -> Option<&WeightVector> { self.vectors.get(&doc_id) }

    pub fn max_tf(&self, doc_id: PageId) -> Option<u32> { self.max_tf.get(&doc_id).copied() }

    pub fn doc(&self, doc_id: PageId) -> Option<&Page> { self.docs.get(&doc_id) }

    /// Documents in ascending id order.
    pub fn docs(&self) -> impl Iterator<Item = &Page> { self.docs.values() }

    pub fn num_docs(&self) -> usize { self.docs.len() }

    pub fn num_terms(&self) -> usize { self.idf.len() }
}
