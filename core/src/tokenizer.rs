use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use unicode_normalization::UnicodeNormalization;
use std::collections::HashSet;
use std::path::Path;

lazy_static! {
    static ref RE: Regex = Regex::new(r"(?u)\w+").expect("valid regex");
    static ref STEMMER: Stemmer = Stemmer::create(Algorithm::English);
}

/// Set of lowercase tokens dropped before stemming.
#[derive(Debug, Clone, Default)]
pub struct Stopwords {
    words: HashSet<String>,
}

impl Stopwords {
    pub fn new() -> Self { Self::default() }

    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let words = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { words }
    }

    /// Load a stopword list, one token per line. A missing or unreadable file
    /// yields an empty set.
    pub fn load<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let set = Self::from_words(text.lines());
                tracing::debug!(path = %path.display(), count = set.len(), "loaded stopwords");
                set
            }
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "stopword file not readable, continuing without stopwords");
                Self::default()
            }
        }
    }

    pub fn contains(&self, token: &str) -> bool { self.words.contains(token) }

    pub fn len(&self) -> usize { self.words.len() }

    pub fn is_empty(&self) -> bool { self.words.is_empty() }
}

/// Split text into lowercase word tokens (NFKC-normalized runs of word characters).
/// The index of a token in this list is its position.
pub fn raw_tokens(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>().to_lowercase();
    RE.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
}

/// Tokenize text into (stem, position) pairs, dropping stopwords.
///
/// Positions index the unfiltered token sequence, so a removed stopword leaves a
/// gap: "rust and go" yields `[("rust", 0), ("go", 2)]`.
pub fn tokenize(text: &str, stopwords: &Stopwords) -> Vec<(String, usize)> {
    let mut tokens = Vec::new();
    for (pos, token) in raw_tokens(text).into_iter().enumerate() {
        if stopwords.contains(&token) { continue; }
        tokens.push((stem(&token), pos));
    }
    tokens
}

/// Same as [`tokenize`] without positions.
pub fn terms(text: &str, stopwords: &Stopwords) -> Vec<String> {
    tokenize(text, stopwords).into_iter().map(|(t, _)| t).collect()
}

pub fn stem(token: &str) -> String { STEMMER.stem(token).into_owned() }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_tokenize() {
        let t = tokenize("Running, runner's run!", &Stopwords::new());
        assert!(t.iter().any(|(w, _)| w == "run"));
    }

    #[test]
    fn positions_keep_stopword_gaps() {
        let stop = Stopwords::from_words(["the", "of"]);
        let t = tokenize("The art of computer programming", &stop);
        let positions: Vec<usize> = t.iter().map(|(_, p)| *p).collect();
        assert_eq!(positions, vec![1, 3, 4]);
    }

    #[test]
    fn compatibility_forms_share_positions_with_plain_text() {
        let stop = Stopwords::new();
        assert_eq!(tokenize("\u{FB01}ne print", &stop), tokenize("fine print", &stop));
    }

    #[test]
    fn stopwords_are_trimmed_and_lowercased() {
        let stop = Stopwords::from_words(["  The ", "", "AND"]);
        assert_eq!(stop.len(), 2);
        assert!(stop.contains("the"));
        assert!(stop.contains("and"));
    }

    #[test]
    fn missing_stopword_file_is_empty() {
        let stop = Stopwords::load("/nonexistent/stopwords.txt");
        assert!(stop.is_empty());
    }
}
