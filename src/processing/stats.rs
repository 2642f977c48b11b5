//! Size statistics of a set of text files.
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use log::warn;

use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStats {
    pub path: PathBuf,
    pub bytes: u64,
    /// unicode codepoints
    pub chars: u64,
}

impl FileStats {
    pub fn bytes_per_char(&self) -> f64 {
        ratio(self.bytes, self.chars)
    }
}

#[derive(Debug, Default)]
pub struct Stats {
    pub total_bytes: u64,
    pub total_chars: u64,
    /// sorted by decreasing size
    pub files: Vec<FileStats>,
}

fn ratio(bytes: u64, chars: u64) -> f64 {
    if chars == 0 {
        0.0
    } else {
        bytes as f64 / chars as f64
    }
}

impl Stats {
    pub fn bytes_per_char(&self) -> f64 {
        ratio(self.total_bytes, self.total_chars)
    }

    pub fn top(&self, n: usize) -> &[FileStats] {
        &self.files[..n.min(self.files.len())]
    }
}

/// Number of codepoints of a file, invalid UTF-8 being replaced.
///
/// The file is read line by line.
fn count_chars(path: &Path) -> Result<u64, Error> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut line = Vec::new();
    let mut chars = 0;
    while reader.read_until(b'\n', &mut line)? > 0 {
        chars += String::from_utf8_lossy(&line).chars().count() as u64;
        line.clear();
    }
    Ok(chars)
}

/// Compute statistics over `files`.
///
/// Files whose size cannot be read are ignored. Unreadable content counts its bytes as chars.
pub fn analyze(files: &[PathBuf]) -> Stats {
    let mut stats = Stats::default();
    for path in files {
        let bytes = match std::fs::metadata(path) {
            Ok(m) => m.len(),
            Err(e) => {
                warn!("ignoring {:?}: {:?}", path, e);
                continue;
            }
        };
        let chars = count_chars(path).unwrap_or_else(|e| {
            warn!("could not read {:?} ({:?}), counting bytes", path, e);
            bytes
        });
        stats.total_bytes += bytes;
        stats.total_chars += chars;
        stats.files.push(FileStats {
            path: path.clone(),
            bytes,
            chars,
        });
    }
    stats.files.sort_by(|a, b| b.bytes.cmp(&a.bytes));
    stats
}

/// Human readable size, 1024 based.
pub struct HumanSize(pub u64);

impl fmt::Display for HumanSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut n = self.0 as f64;
        for unit in ["", "K", "M", "G", "T"] {
            if n.abs() < 1024.0 {
                return write!(f, "{:.2}{}", n, unit);
            }
            n /= 1024.0;
        }
        write!(f, "{:.2}P", n)
    }
}
