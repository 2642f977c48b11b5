//! Checksum lists (`md5sum`/`sha256sum` output) and file digests.
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use md5::Md5;
use sha2::{Digest, Sha256};

use crate::error::Error;

const CHUNK_SIZE: usize = 8 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    Md5,
    Sha256,
}

impl FromStr for Algorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "md5" => Ok(Algorithm::Md5),
            "sha256" => Ok(Algorithm::Sha256),
            other => Err(Error::Custom(format!("unknown checksum algorithm {}", other))),
        }
    }
}

/// Published digests, indexed by full relative path and by basename.
#[derive(Debug, Default)]
pub struct ChecksumList {
    entries: HashMap<String, String>,
}

impl ChecksumList {
    /// Parse `<hex>  <path>` lines, ignoring blank lines and `#` comments.
    pub fn parse(text: &str) -> Self {
        let mut entries = HashMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 2 {
                continue;
            }
            let digest = parts[0].to_string();
            // md5sum prefixes binary-mode names with '*'
            let name = parts[parts.len() - 1].trim_start_matches('*');
            entries.insert(name.to_string(), digest.clone());
            entries.insert(basename(name).to_string(), digest);
        }
        debug!("parsed {} checksum keys", entries.len());
        Self { entries }
    }

    /// Look `path` up, first as given then by its basename.
    pub fn lookup(&self, path: &str) -> Option<&str> {
        self.entries
            .get(path)
            .or_else(|| self.entries.get(basename(path)))
            .map(String::as_str)
    }

    /// A few keys, for diagnostics.
    pub fn sample_keys(&self, n: usize) -> Vec<&str> {
        self.entries.keys().take(n).map(String::as_str).collect()
    }
}

fn basename(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn digest_reader<D: Digest, R: Read>(mut r: R) -> Result<String, Error> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = r.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    let digest = hasher.finalize();
    Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
}

/// Hex digest of a file.
pub fn digest_file(path: &Path, algorithm: Algorithm) -> Result<String, Error> {
    let f = File::open(path)?;
    match algorithm {
        Algorithm::Md5 => digest_reader::<Md5, _>(f),
        Algorithm::Sha256 => digest_reader::<Sha256, _>(f),
    }
}

/// Compare the digest of `path` with `expected` (case insensitive).
pub fn verify(path: &Path, expected: &str, algorithm: Algorithm) -> Result<(), Error> {
    let actual = digest_file(path, algorithm)?;
    if actual.eq_ignore_ascii_case(expected) {
        Ok(())
    } else {
        Err(Error::Checksum {
            path: path.to_path_buf(),
            expected: expected.to_string(),
            actual,
        })
    }
}

/// Verify `path` against the entry of `key` in `list`. A missing entry is an error.
pub fn verify_listed(
    list: &ChecksumList,
    key: &str,
    path: &Path,
    algorithm: Algorithm,
) -> Result<(), Error> {
    let expected = list.lookup(key).ok_or_else(|| {
        Error::Custom(format!(
            "no checksum for {} (known keys include {:?})",
            key,
            list.sample_keys(5)
        ))
    })?;
    verify(path, expected, algorithm)
}
