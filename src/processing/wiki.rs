/*! wiki40b markup removal

wiki40b dumps keep the article structure inline:

```text
_START_ARTICLE_ 東京 _START_SECTION_ 概要 _START_PARAGRAPH_ 東京は..._NEWLINE_...
```

Titles (article and section) are removed along with their marker, everything up to the next
`_START_PARAGRAPH_` being dropped. Paragraph and newline markers are simply removed.
!*/
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{error, info};

use crate::error::Error;
use crate::io::compression;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Marker {
    Article,
    Section,
    Paragraph,
    Newline,
}

const MARKERS: [(&str, Marker); 4] = [
    ("_START_ARTICLE_", Marker::Article),
    ("_START_SECTION_", Marker::Section),
    ("_START_PARAGRAPH_", Marker::Paragraph),
    ("_NEWLINE_", Marker::Newline),
];

/// First marker at or after `from`: (start, end, marker).
fn next_marker(s: &str, from: usize) -> Option<(usize, usize, Marker)> {
    MARKERS
        .iter()
        .filter_map(|(token, marker)| {
            s[from..]
                .find(token)
                .map(|pos| (from + pos, from + pos + token.len(), *marker))
        })
        .min_by_key(|(start, _, _)| *start)
}

/// Streaming marker remover. Title skipping carries over lines.
#[derive(Debug, Default)]
pub struct MarkerStripper {
    skipping: bool,
}

impl MarkerStripper {
    /// Strip a line. Returns `None` if nothing remains.
    pub fn strip_line(&mut self, line: &str) -> Option<String> {
        let mut out = String::with_capacity(line.len());
        let mut i = 0;

        while i < line.len() {
            match next_marker(line, i) {
                None => {
                    if !self.skipping {
                        out.push_str(&line[i..]);
                    }
                    break;
                }
                Some((start, end, marker)) => {
                    if !self.skipping {
                        out.push_str(&line[i..start]);
                    }
                    match marker {
                        Marker::Article | Marker::Section => self.skipping = true,
                        Marker::Paragraph => self.skipping = false,
                        Marker::Newline => (),
                    }
                    i = end;
                }
            }
        }

        let out = out.trim();
        if out.is_empty() {
            None
        } else {
            Some(out.to_string())
        }
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

/// Free name for the backup of `path` inside `backup_dir`.
///
/// `a.txt` if free, then `a.orig.1.txt`, `a.orig.2.txt`...
fn backup_path(path: &Path, backup_dir: &Path) -> PathBuf {
    let name = path.file_name().unwrap_or_default();
    let candidate = backup_dir.join(name);
    if !candidate.exists() {
        return candidate;
    }
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    (1..)
        .map(|k| backup_dir.join(format!("{}.orig.{}{}", stem, k, ext)))
        .find(|p| !p.exists())
        .unwrap_or(candidate)
}

fn write_stripped(src: &Path, tmp: &Path) -> Result<(), Error> {
    let mut stripper = MarkerStripper::default();
    let mut out = BufWriter::new(File::create(tmp)?);
    for line in compression::lossy_lines(compression::open(src)?) {
        if let Some(line) = stripper.strip_line(&line?) {
            out.write_all(line.as_bytes())?;
            out.write_all(b"\n")?;
        }
    }
    out.flush()?;
    Ok(())
}

/// Strip markers of `path`, replacing it.
///
/// The original is moved to `backup_dir` if provided. On failure the original is left untouched.
pub fn strip_in_place(path: &Path, backup_dir: Option<&Path>) -> Result<(), Error> {
    let tmp = tmp_path(path);
    info!("processing {:?} -> {:?}", path, tmp);

    if let Err(e) = write_stripped(path, &tmp) {
        if tmp.exists() {
            std::fs::remove_file(&tmp)?;
        }
        return Err(e);
    }

    match backup_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let backup = backup_path(path, dir);
            std::fs::rename(path, &backup)?;
            std::fs::rename(&tmp, path)?;
            info!("original backed up to {:?}", backup);
        }
        None => {
            std::fs::rename(&tmp, path)?;
            info!("replaced {:?} (no backup)", path);
        }
    }
    Ok(())
}

/// Strip every file, logging failures. Returns the number of rewritten files.
pub fn strip_all(files: &[PathBuf], backup_dir: Option<&Path>) -> usize {
    files
        .iter()
        .filter(|p| match strip_in_place(p, backup_dir) {
            Ok(()) => true,
            Err(e) => {
                error!("failed processing {:?}: {:?}", p, e);
                false
            }
        })
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_all_lines(lines: &[&str]) -> Vec<String> {
        let mut s = MarkerStripper::default();
        lines.iter().filter_map(|l| s.strip_line(l)).collect()
    }

    #[test]
    fn article() {
        let out = strip_all_lines(&[
            "_START_ARTICLE_ 東京 _START_SECTION_ 概要 _START_PARAGRAPH_ 東京は首都。_NEWLINE_人口が多い。",
        ]);
        assert_eq!(out, vec!["東京は首都。人口が多い。"]);
    }

    #[test]
    fn skipping_spans_lines() {
        let out = strip_all_lines(&[
            "前文 _START_ARTICLE_",
            "タイトル",
            "_START_PARAGRAPH_本文",
            "_NEWLINE_",
        ]);
        assert_eq!(out, vec!["前文", "本文"]);
    }

    #[test]
    fn plain_lines_untouched() {
        assert_eq!(strip_all_lines(&["  普通の行 "]), vec!["普通の行"]);
    }

    #[test]
    fn in_place_with_backup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wiki40b-ja_train.txt");
        let backups = dir.path().join("backup_originals");
        std::fs::create_dir(&backups).unwrap();
        std::fs::write(backups.join("wiki40b-ja_train.txt"), "older").unwrap();

        let original = "_START_ARTICLE_ 題 _START_PARAGRAPH_ 本文\n";
        std::fs::write(&path, original).unwrap();

        assert_eq!(strip_all(&[path.clone()], Some(&backups)), 1);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "本文\n");
        assert_eq!(
            std::fs::read_to_string(backups.join("wiki40b-ja_train.orig.1.txt")).unwrap(),
            original
        );
        assert!(!tmp_path(&path).exists());
    }

    #[test]
    fn missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");
        assert!(strip_in_place(&path, None).is_err());
        assert!(!tmp_path(&path).exists());
    }
}
