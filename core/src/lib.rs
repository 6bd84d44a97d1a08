pub mod store;
pub mod tokenizer;

use serde::{Deserialize, Serialize};

pub use store::{Field, PageStore, StorageError};
pub use tokenizer::Stopwords;

pub type PageId = i64;
pub type TermId = i64;

/// Placeholder stored when a page has no usable `<title>`.
pub const NO_TITLE: &str = "No Title";
/// Stored when the response carried no `Last-Modified` header.
pub const UNKNOWN_LAST_MODIFIED: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub url: String,
    pub title: String,
    pub content: String,
    pub last_modified: String,
    /// Length of the raw response text in bytes.
    pub size: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    pub parent_url: String,
    pub child_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordCount {
    pub word: String,
    pub frequency: u32,
}
