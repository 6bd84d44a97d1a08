use spider_core::tokenizer::{raw_tokens, terms, tokenize};
use spider_core::Stopwords;

#[test]
fn it_normalizes_and_stems() {
    let words = terms("Running Runners RUN! The café's menu.", &Stopwords::new());
    // Stemming to "run" should appear
    assert!(words.contains(&"run".to_string()));
    assert!(words.contains(&"menu".to_string()));
    assert!(words.iter().all(|w| w.chars().all(|c| !c.is_uppercase())));
}

#[test]
fn it_filters_stopwords() {
    let stop = Stopwords::from_words(["the", "and"]);
    let words = terms("The quick brown fox and the lazy dog", &stop);
    assert!(!words.contains(&"the".to_string()));
    assert!(!words.contains(&"and".to_string()));
    assert_eq!(words.len(), 5);
}

#[test]
fn raw_tokens_split_on_non_word_characters() {
    assert_eq!(raw_tokens("Hello, WORLD! foo_bar 42x"), vec!["hello", "world", "foo_bar", "42x"]);
    assert!(raw_tokens("  ...  ").is_empty());
}

#[test]
fn positions_index_the_unfiltered_sequence() {
    let stop = Stopwords::from_words(["a", "of"]);
    let text = "a tale of two cities";
    let positions: Vec<usize> = tokenize(text, &stop).into_iter().map(|(_, p)| p).collect();
    assert_eq!(positions, vec![1, 3, 4]);
    // without stopwords the positions are dense
    let dense: Vec<usize> = tokenize(text, &Stopwords::new()).into_iter().map(|(_, p)| p).collect();
    assert_eq!(dense, vec![0, 1, 2, 3, 4]);
}

#[test]
fn loads_stopwords_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stopwords.txt");
    std::fs::write(&path, "the\n\nAnd\n  of  \n").unwrap();
    let stop = Stopwords::load(&path);
    assert_eq!(stop.len(), 3);
    assert!(stop.contains("and"));
    assert!(stop.contains("of"));
}
