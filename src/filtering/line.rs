//! line-level filtering
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use log::debug;
use unic_ucd::GeneralCategory;

use super::Filter;
use crate::error::Error;

const DEFAULT_EXCLUDE_WORDS: &str = include_str!("../../resources/exclude_words.txt");

/// Substring blocklist.
///
/// Returns `false` if the line contains any of the words.
/// Empty words are ignored.
pub struct ExcludeWords {
    words: Vec<String>,
    case_insensitive: bool,
}

impl ExcludeWords {
    pub fn new(words: impl IntoIterator<Item = String>, case_insensitive: bool) -> Self {
        let words = words
            .into_iter()
            .filter(|w| !w.is_empty())
            .map(|w| if case_insensitive { w.to_lowercase() } else { w })
            .collect();
        Self {
            words,
            case_insensitive,
        }
    }

    /// Read words from a list (one per line, `#` and `//` comments).
    pub fn from_reader<R: Read>(r: R, case_insensitive: bool) -> Result<Self, Error> {
        let mut words = Vec::new();
        for line in BufReader::new(r).lines() {
            let line = line?;
            let word = line.trim();
            if word.is_empty() || word.starts_with('#') || word.starts_with("//") {
                continue;
            }
            words.push(word.to_string());
        }
        debug!("loaded {} exclude words", words.len());
        Ok(Self::new(words, case_insensitive))
    }

    pub fn from_file(path: &Path, case_insensitive: bool) -> Result<Self, Error> {
        Self::from_reader(File::open(path)?, case_insensitive)
    }

    /// Built-in list, see `resources/exclude_words.txt`.
    pub fn builtin(case_insensitive: bool) -> Self {
        // reading from a slice cannot fail
        Self::from_reader(DEFAULT_EXCLUDE_WORDS.as_bytes(), case_insensitive)
            .unwrap_or_else(|_| Self::new(Vec::new(), case_insensitive))
    }

    pub fn extend(&mut self, other: ExcludeWords) {
        let ci = self.case_insensitive;
        self.words.extend(
            other
                .words
                .into_iter()
                .map(|w| if ci { w.to_lowercase() } else { w }),
        );
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

impl Default for ExcludeWords {
    fn default() -> Self {
        Self::builtin(false)
    }
}

impl Filter<&str> for ExcludeWords {
    fn detect(&self, line: &str) -> bool {
        if self.case_insensitive {
            let hay = line.to_lowercase();
            !self.words.iter().any(|w| hay.contains(w.as_str()))
        } else {
            !self.words.iter().any(|w| line.contains(w.as_str()))
        }
    }
}

/// Noisy content is content that has a too low letters/other ratio.
///
/// Returns `false` if more than `threshold` of the codepoints are not letters.
/// Whitespace counts as non-letter.
pub struct Noisy {
    threshold: f64,
}

impl Noisy {
    pub fn with_threshold(threshold: f64) -> Self {
        Self { threshold }
    }
}

impl Default for Noisy {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl Filter<&str> for Noisy {
    fn detect(&self, line: &str) -> bool {
        let nb_chars = line.chars().count();
        let threshold = (nb_chars as f64 * self.threshold).floor() as usize;

        let mut nonletter_count = 0;
        let mut letter_count = 0;

        for is_letter in line.chars().map(|c| GeneralCategory::of(c).is_letter()) {
            if !is_letter {
                nonletter_count += 1;

                // if count is more than what we consider to be the threshold, stop there
                if nonletter_count > threshold {
                    return false;
                }
            } else {
                letter_count += 1;

                // remaining codepoints can no longer exceed the threshold
                if letter_count >= nb_chars.saturating_sub(threshold) {
                    return true;
                }
            }
        }
        true
    }
}

/// Simple length filter.
/// Returns `false` if provided line is less than [Length::min_size] unicode codepoints.
pub struct Length {
    min_size: usize,
}

impl Length {
    /// specify a minimum length
    pub fn with_min_size(min_size: usize) -> Self {
        Self { min_size }
    }
}

impl Default for Length {
    fn default() -> Self {
        Length { min_size: 1 }
    }
}

impl Filter<&str> for Length {
    fn detect(&self, line: &str) -> bool {
        line.chars().count() >= self.min_size
    }
}

/// regroups line filter kinds
pub enum FilterKind {
    Exclude(ExcludeWords),
    Noisy(Noisy),
    Length(Length),
}

impl Filter<&str> for FilterKind {
    fn detect(&self, line: &str) -> bool {
        match self {
            Self::Exclude(f) => f.detect(line),
            Self::Noisy(f) => f.detect(line),
            Self::Length(f) => f.detect(line),
        }
    }
}

impl Default for FilterKind {
    fn default() -> Self {
        FilterKind::Exclude(ExcludeWords::default())
    }
}

/// Filter chaining, a line is kept if every filter keeps it.
///
/// Cheap filters should be added first.
#[derive(Default)]
pub struct FilterChain(Vec<FilterKind>);

impl FilterChain {
    pub fn add(&mut self, filter: FilterKind) -> &mut FilterChain {
        self.0.push(filter);
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Filter<&str> for FilterChain {
    fn detect(&self, line: &str) -> bool {
        self.0.iter().all(|f| f.detect(line))
    }
}
