//! N-gram counting.
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{error, info};
use rayon::prelude::*;

use super::tokenizer::{is_japanese_token, Tokenizer};
use crate::error::Error;
use crate::io::compression;
use crate::io::jsonl;
use crate::processing::InputFormat;

/// Counts for n in `1..=max_n`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NgramCounts {
    counts: Vec<HashMap<String, u64>>,
}

impl NgramCounts {
    pub fn new(max_n: usize) -> Self {
        Self {
            counts: vec![HashMap::new(); max_n],
        }
    }

    pub fn max_n(&self) -> usize {
        self.counts.len()
    }

    /// Add `by` to `gram`. Returns `true` if the gram was not known yet.
    pub fn add(&mut self, n: usize, gram: String, by: u64) -> bool {
        let map = &mut self.counts[n - 1];
        match map.get_mut(&gram) {
            Some(c) => {
                *c += by;
                false
            }
            None => {
                map.insert(gram, by);
                true
            }
        }
    }

    pub fn get(&self, n: usize) -> &HashMap<String, u64> {
        &self.counts[n - 1]
    }

    pub fn count(&self, n: usize, gram: &str) -> u64 {
        self.counts
            .get(n - 1)
            .and_then(|m| m.get(gram))
            .copied()
            .unwrap_or(0)
    }

    /// Take the counts of `n`, leaving them empty.
    pub fn take(&mut self, n: usize) -> HashMap<String, u64> {
        std::mem::take(&mut self.counts[n - 1])
    }

    /// Sum `other` into `self`.
    pub fn merge(&mut self, other: NgramCounts) {
        if other.counts.len() > self.counts.len() {
            self.counts.resize(other.counts.len(), HashMap::new());
        }
        for (mine, theirs) in self.counts.iter_mut().zip(other.counts) {
            if mine.len() < theirs.len() {
                // merge the smaller map into the bigger one
                let small = std::mem::replace(mine, theirs);
                for (gram, c) in small {
                    *mine.entry(gram).or_insert(0) += c;
                }
            } else {
                for (gram, c) in theirs {
                    *mine.entry(gram).or_insert(0) += c;
                }
            }
        }
    }

    /// Number of distinct grams over all n.
    pub fn len(&self) -> usize {
        self.counts.iter().map(HashMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Tokenizes documents and counts their n-grams.
#[derive(Debug, Clone, Copy)]
pub struct NgramCounter {
    pub max_n: usize,
    pub tokenizer: Tokenizer,
    /// drop tokens without any Japanese character before building n-grams
    pub japanese_only: bool,
    pub format: InputFormat,
}

impl Default for NgramCounter {
    fn default() -> Self {
        Self {
            max_n: 7,
            tokenizer: Tokenizer::Whitespace,
            japanese_only: false,
            format: InputFormat::Auto,
        }
    }
}

impl NgramCounter {
    pub fn tokens<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut tokens = self.tokenizer.tokenize(text);
        if self.japanese_only {
            tokens.retain(|t| is_japanese_token(t));
        }
        tokens
    }

    /// Every n-gram of `text`, for n in `1..=max_n`.
    ///
    /// `f` is called with `(n, gram)`. Character n-grams never span whitespace.
    pub fn for_each_gram<F: FnMut(usize, String)>(&self, text: &str, mut f: F) {
        match self.tokenizer {
            Tokenizer::Chars => {
                for run in text.split_whitespace() {
                    self.grams_of(run, &mut f);
                }
            }
            Tokenizer::Words | Tokenizer::Whitespace => self.grams_of(text, &mut f),
        }
    }

    fn grams_of<F: FnMut(usize, String)>(&self, text: &str, f: &mut F) {
        let tokens = self.tokens(text);
        let joiner = self.tokenizer.joiner();
        for n in 1..=self.max_n.min(tokens.len()) {
            for window in tokens.windows(n) {
                f(n, window.join(joiner));
            }
        }
    }

    pub fn count_text(&self, text: &str, counts: &mut NgramCounts) {
        self.for_each_gram(text, |n, gram| {
            counts.add(n, gram, 1);
        });
    }

    /// Documents of a file: JSONL text fields or lines.
    pub fn texts(&self, path: &Path) -> Result<impl Iterator<Item = String>, Error> {
        let is_jsonl = self.format.is_jsonl(path);
        let lines = compression::lossy_lines(compression::open(path)?);
        let path = path.to_path_buf();
        Ok(lines.filter_map(move |line| match line {
            Ok(line) if is_jsonl => jsonl::extract_text(&line),
            Ok(line) => Some(line),
            Err(e) => {
                error!("read error in {:?}: {:?}", path, e);
                None
            }
        }))
    }

    pub fn count_file(&self, path: &Path) -> Result<NgramCounts, Error> {
        info!("counting {:?}", path);
        let mut counts = NgramCounts::new(self.max_n);
        for text in self.texts(path)? {
            self.count_text(&text, &mut counts);
        }
        Ok(counts)
    }

    /// Count every file in parallel and sum the counts. Unreadable files are logged and skipped.
    pub fn count_files(&self, files: &[PathBuf]) -> NgramCounts {
        files
            .par_iter()
            .filter_map(|path| match self.count_file(path) {
                Ok(c) => Some(c),
                Err(e) => {
                    error!("could not count {:?}: {:?}", path, e);
                    None
                }
            })
            .reduce(
                || NgramCounts::new(self.max_n),
                |mut a, b| {
                    a.merge(b);
                    a
                },
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_up_to_max() {
        let counter = NgramCounter {
            max_n: 3,
            ..Default::default()
        };
        let mut counts = NgramCounts::new(3);
        counter.count_text("今日 は 晴れ は", &mut counts);

        assert_eq!(counts.count(1, "は"), 2);
        assert_eq!(counts.count(2, "今日 は"), 1);
        assert_eq!(counts.count(3, "は 晴れ は"), 1);
        assert_eq!(counts.get(3).len(), 2);
        assert_eq!(counts.count(4, "今日 は 晴れ は"), 0);
    }

    #[test]
    fn short_text() {
        let counter = NgramCounter {
            max_n: 7,
            tokenizer: Tokenizer::Chars,
            ..Default::default()
        };
        let mut counts = NgramCounts::new(7);
        counter.count_text("あい", &mut counts);
        assert_eq!(counts.count(2, "あい"), 1);
        assert!(counts.get(3).is_empty());
        assert_eq!(counts.len(), 3);
    }

    #[test]
    fn chars_stop_at_spaces() {
        let counter = NgramCounter {
            max_n: 3,
            tokenizer: Tokenizer::Chars,
            ..Default::default()
        };
        let mut counts = NgramCounts::new(3);
        // two flattened lines
        counter.count_text("あい うえ", &mut counts);
        assert_eq!(counts.count(1, "う"), 1);
        assert_eq!(counts.count(2, "あい"), 1);
        assert_eq!(counts.count(2, "うえ"), 1);
        assert_eq!(counts.count(2, "いう"), 0);
        assert!(counts.get(3).is_empty());
    }

    #[test]
    fn japanese_only() {
        let counter = NgramCounter {
            max_n: 2,
            japanese_only: true,
            ..Default::default()
        };
        let mut counts = NgramCounts::new(2);
        counter.count_text("東京 in 2024 は", &mut counts);
        assert_eq!(counts.count(1, "in"), 0);
        assert_eq!(counts.count(2, "東京 は"), 1);
    }

    #[test]
    fn merge() {
        let mut a = NgramCounts::new(1);
        a.add(1, "あ".to_string(), 2);
        let mut b = NgramCounts::new(2);
        b.add(1, "あ".to_string(), 1);
        b.add(1, "い".to_string(), 1);
        b.add(2, "あい".to_string(), 5);
        a.merge(b);
        assert_eq!(a.max_n(), 2);
        assert_eq!(a.count(1, "あ"), 3);
        assert_eq!(a.count(1, "い"), 1);
        assert_eq!(a.count(2, "あい"), 5);
    }

    #[test]
    fn files_in_parallel() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.jsonl");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, "{\"text\": \"猫 が\"}\n{\"text\": \"猫\"}\n").unwrap();
        std::fs::write(&b, "猫 が\n").unwrap();
        let missing = dir.path().join("c.txt");

        let counter = NgramCounter {
            max_n: 2,
            ..Default::default()
        };
        let counts = counter.count_files(&[a, b, missing]);
        assert_eq!(counts.count(1, "猫"), 3);
        assert_eq!(counts.count(2, "猫 が"), 2);
    }
}
