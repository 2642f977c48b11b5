use criterion::{black_box, criterion_group, criterion_main, Criterion};
use gramdata::filtering::{Filter, Noisy};
use gramdata::ngram::{NgramCounter, NgramCounts, Tokenizer};

const DOCUMENTS: [&str; 4] = [
    "今日 は 晴れ て いる ので 散歩 に 行き ます",
    "東京 の 人口 は 多い 。 東京 は 日本 の 首都 です 。",
    "////////////////////////////////////////////////",
    "キーボード 配列 の 評価 に は n-gram の 頻度 が 使わ れる",
];

pub fn count(c: &mut Criterion) {
    let words = NgramCounter::default();
    c.bench_function("count_words_7gram", |b| {
        b.iter(|| {
            let mut counts = NgramCounts::new(words.max_n);
            for d in DOCUMENTS.iter() {
                words.count_text(black_box(d), &mut counts);
            }
            counts
        })
    });

    let chars = NgramCounter {
        max_n: 3,
        tokenizer: Tokenizer::Chars,
        japanese_only: true,
        ..Default::default()
    };
    c.bench_function("count_chars_japanese_3gram", |b| {
        b.iter(|| {
            let mut counts = NgramCounts::new(chars.max_n);
            for d in DOCUMENTS.iter() {
                chars.count_text(black_box(d), &mut counts);
            }
            counts
        })
    });
}

pub fn noisy(c: &mut Criterion) {
    let f = Noisy::default();
    c.bench_function("noisy_detect", |b| {
        b.iter(|| DOCUMENTS.iter().filter(|d| f.detect(black_box(**d))).count())
    });
}

criterion_group!(benches, count, noisy);
criterion_main!(benches);
