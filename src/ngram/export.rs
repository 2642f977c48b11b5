/*! Writing n-gram counts

Counts are written per n, as `gram\tcount` lines, most frequent first (ties broken by gram).
Files are named `<n><name><idx:04>.txt`.
!*/
use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use itertools::Itertools;
use log::{debug, info};
use rayon::prelude::*;

use super::counter::{NgramCounter, NgramCounts};
use crate::error::Error;
use crate::io::RotatingWriter;

/// Entries of `map` with count `>= min_count`, by count descending then gram ascending.
pub fn sorted_entries(map: &HashMap<String, u64>, min_count: u64) -> Vec<(&str, u64)> {
    map.iter()
        .filter(|(_, c)| **c >= min_count)
        .map(|(g, c)| (g.as_str(), *c))
        .sorted_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)))
        .collect()
}

fn write_entries(writer: &mut RotatingWriter, entries: &[(&str, u64)]) -> Result<(), Error> {
    for (gram, count) in entries {
        writer.write_all(format!("{}\t{}\n", gram, count).as_bytes())?;
    }
    Ok(())
}

fn stem(n: usize, name: &str) -> String {
    format!("{}{}", n, name)
}

/// Write every n of `counts` into rotating parts of at most `part_size` bytes.
///
/// Returns created files, ordered by n then part index.
pub fn export(
    counts: &NgramCounts,
    dst: &Path,
    name: &str,
    min_count: u64,
    part_size: u64,
) -> Result<Vec<PathBuf>, Error> {
    std::fs::create_dir_all(dst)?;
    let per_n: Vec<Result<Vec<PathBuf>, Error>> = (1..=counts.max_n())
        .into_par_iter()
        .map(|n| {
            let entries = sorted_entries(counts.get(n), min_count);
            debug!("{}-grams: {} entries kept", n, entries.len());
            let mut writer = RotatingWriter::new(dst, &stem(n, name), ".txt", part_size);
            write_entries(&mut writer, &entries)?;
            Ok(writer.finish()?)
        })
        .collect();

    let mut created = Vec::new();
    for files in per_n {
        created.extend(files?);
    }
    info!("wrote {} files", created.len());
    Ok(created)
}

/// Memory-bounded counting.
///
/// Each n has its own counter, flushed into the next part once its estimated
/// serialized size reaches the limit. Counts of a gram may thus be split over several parts.
pub struct SpillCounter {
    counter: NgramCounter,
    counts: NgramCounts,
    sizes: Vec<u64>,
    indexes: Vec<usize>,
    limit: u64,
    dst: PathBuf,
    name: String,
    created: Vec<PathBuf>,
}

impl SpillCounter {
    pub fn new(counter: NgramCounter, dst: &Path, name: &str, limit: u64) -> Self {
        Self {
            counter,
            counts: NgramCounts::new(counter.max_n),
            sizes: vec![0; counter.max_n],
            indexes: vec![0; counter.max_n],
            limit,
            dst: dst.to_path_buf(),
            name: name.to_string(),
            created: Vec::new(),
        }
    }

    pub fn add_text(&mut self, text: &str) -> Result<(), Error> {
        let counts = &mut self.counts;
        let sizes = &mut self.sizes;
        self.counter.for_each_gram(text, |n, gram| {
            // gram, tab, at least one digit, newline
            let size = gram.len() as u64 + 3;
            if counts.add(n, gram, 1) {
                sizes[n - 1] += size;
            }
        });

        for n in 1..=self.counter.max_n {
            if self.sizes[n - 1] >= self.limit {
                self.flush(n)?;
            }
        }
        Ok(())
    }

    pub fn add_file(&mut self, path: &Path) -> Result<(), Error> {
        info!("counting {:?}", path);
        for text in self.counter.texts(path)? {
            self.add_text(&text)?;
        }
        Ok(())
    }

    fn flush(&mut self, n: usize) -> Result<(), Error> {
        let map = self.counts.take(n);
        self.sizes[n - 1] = 0;
        if map.is_empty() {
            return Ok(());
        }
        let entries = sorted_entries(&map, 1);
        let mut writer = RotatingWriter::new(&self.dst, &stem(n, &self.name), ".txt", u64::MAX)
            .starting_at(self.indexes[n - 1]);
        write_entries(&mut writer, &entries)?;
        self.indexes[n - 1] = writer.next_index();
        self.created.extend(writer.finish()?);
        Ok(())
    }

    /// Flush what remains and return every created file.
    pub fn finish(mut self) -> Result<Vec<PathBuf>, Error> {
        for n in 1..=self.counter.max_n {
            self.flush(n)?;
        }
        Ok(self.created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ngram::Tokenizer;

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn sorting() {
        let mut map = HashMap::new();
        map.insert("b".to_string(), 5);
        map.insert("a".to_string(), 5);
        map.insert("c".to_string(), 9);
        map.insert("d".to_string(), 1);
        assert_eq!(sorted_entries(&map, 2), vec![("c", 9), ("a", 5), ("b", 5)]);
    }

    #[test]
    fn exact_export() {
        let dir = tempfile::tempdir().unwrap();
        let counter = NgramCounter {
            max_n: 2,
            tokenizer: Tokenizer::Chars,
            ..Default::default()
        };
        let mut counts = NgramCounts::new(2);
        counter.count_text("あいあい", &mut counts);

        let files = export(&counts, dir.path(), "hplt", 2, 1024).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("1hplt0000.txt"), dir.path().join("2hplt0000.txt")]
        );
        assert_eq!(read(&files[0]), "あ\t2\nい\t2\n");
        assert_eq!(read(&files[1]), "あい\t2\n");
    }

    #[test]
    fn nothing_kept() {
        let dir = tempfile::tempdir().unwrap();
        let mut counts = NgramCounts::new(1);
        counts.add(1, "x".to_string(), 1);
        assert!(export(&counts, dir.path(), "w", 10, 1024).unwrap().is_empty());
    }

    #[test]
    fn spill() {
        let dir = tempfile::tempdir().unwrap();
        let counter = NgramCounter {
            max_n: 1,
            ..Default::default()
        };
        // each new unigram of one byte is estimated at 4 bytes
        let mut spill = SpillCounter::new(counter, dir.path(), "s", 8);
        spill.add_text("a b").unwrap();
        spill.add_text("a").unwrap();
        spill.add_text("c").unwrap();
        let files = spill.finish().unwrap();

        assert_eq!(
            files,
            vec![dir.path().join("1s0000.txt"), dir.path().join("1s0001.txt")]
        );
        assert_eq!(read(&files[0]), "a\t1\nb\t1\n");
        assert_eq!(read(&files[1]), "a\t1\nc\t1\n");
    }
}
