use criterion::{criterion_group, criterion_main, Criterion};
use spider_core::tokenizer::tokenize;
use spider_core::Stopwords;

fn bench_tokenize(c: &mut Criterion) {
    let text = "The quick brown fox jumps over the lazy dog while running through the forest. ".repeat(200);
    let stop = Stopwords::from_words(["the", "over", "while", "through"]);
    c.bench_function("tokenize_paragraphs", |b| b.iter(|| tokenize(&text, &stop)));
}

criterion_group!(benches, bench_tokenize);
criterion_main!(benches);
