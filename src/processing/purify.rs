/*! Noise removal

Turns JSONL dumps or already extracted text into plain text, one document per line,
dropping lines rejected by a [FilterChain].

Runs can be chained (`purif -> purif2 -> ...`) with different word lists:
plain text inputs are read line by line.
!*/
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{error, info, warn};

use crate::error::Error;
use crate::filtering::{Filter, FilterChain};
use crate::io::compression::{self, strip_compression};
use crate::io::{jsonl, RotatingWriter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    /// JSONL if the file name ends in `.jsonl` (compression suffix ignored)
    Auto,
    Jsonl,
    Lines,
}

impl InputFormat {
    pub fn is_jsonl(&self, path: &Path) -> bool {
        match self {
            InputFormat::Jsonl => true,
            InputFormat::Lines => false,
            InputFormat::Auto => path
                .file_name()
                .and_then(|n| n.to_str())
                .map(|n| strip_compression(n).ends_with(".jsonl"))
                .unwrap_or(false),
        }
    }
}

impl FromStr for InputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(InputFormat::Auto),
            "jsonl" => Ok(InputFormat::Jsonl),
            "lines" | "txt" => Ok(InputFormat::Lines),
            other => Err(Error::Custom(format!("unknown input format {}", other))),
        }
    }
}

/// Collapse whitespace runs (newlines included) into single spaces and trim.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for word in text.split_whitespace() {
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(word);
    }
    out
}

#[derive(Debug, Default)]
pub struct PurifyReport {
    pub parts: Vec<PathBuf>,
    pub written: u64,
    /// empty or filtered out
    pub skipped: u64,
    pub failed: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
}

pub struct Purifier {
    filters: FilterChain,
    format: InputFormat,
    remove_sources: bool,
}

impl Purifier {
    pub fn new(filters: FilterChain) -> Self {
        Self {
            filters,
            format: InputFormat::Auto,
            remove_sources: false,
        }
    }

    pub fn with_format(mut self, format: InputFormat) -> Self {
        self.format = format;
        self
    }

    /// Delete each source once it has been completely processed.
    pub fn with_remove_sources(mut self, remove: bool) -> Self {
        self.remove_sources = remove;
        self
    }

    /// Normalize and filter a text. Returns `None` if it has to be skipped.
    pub fn purify_text(&self, text: &str) -> Option<String> {
        let line = normalize(text);
        if line.is_empty() || !self.filters.detect(line.as_str()) {
            None
        } else {
            Some(line)
        }
    }

    fn process_file(
        &self,
        src: &Path,
        writer: &mut RotatingWriter,
        report: &mut PurifyReport,
    ) -> Result<(), Error> {
        let is_jsonl = self.format.is_jsonl(src);
        for line in compression::lossy_lines(compression::open(src)?) {
            let line = line?;
            let text = if is_jsonl {
                match jsonl::extract_text(&line) {
                    Some(t) => t,
                    None => continue,
                }
            } else {
                line
            };

            match self.purify_text(&text) {
                Some(clean) => {
                    writer.write_line(&clean)?;
                    report.written += 1;
                }
                None => report.skipped += 1,
            }
        }
        Ok(())
    }

    /// Purify `files` into `dst/<prefix><index:04>.txt` parts of `part_size` bytes.
    ///
    /// Output of consecutive inputs is concatenated: a part is not closed at the end of an input.
    pub fn run(
        &self,
        files: &[PathBuf],
        dst: &Path,
        prefix: &str,
        part_size: u64,
    ) -> Result<PurifyReport, Error> {
        let mut writer = RotatingWriter::new(dst, prefix, ".txt", part_size);
        let mut report = PurifyReport::default();

        for src in files {
            info!("processing: {:?}", src);
            if let Err(e) = self.process_file(src, &mut writer, &mut report) {
                error!("error processing {:?}: {:?}", src, e);
                report.failed.push(src.clone());
                continue;
            }

            if self.remove_sources {
                match std::fs::remove_file(src) {
                    Ok(()) => {
                        info!("removed source: {:?}", src);
                        report.removed.push(src.clone());
                    }
                    Err(e) => warn!("failed to remove {:?}: {:?}", src, e),
                }
            }
        }

        report.parts = writer.finish()?;
        info!(
            "done: {} parts, {} lines written, {} skipped",
            report.parts.len(),
            report.written,
            report.skipped
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::{ExcludeWords, FilterKind};

    fn purifier() -> Purifier {
        let mut chain = FilterChain::default();
        chain.add(FilterKind::Exclude(ExcludeWords::new(
            vec!["カジノ".to_string(), "育毛".to_string()],
            false,
        )));
        Purifier::new(chain)
    }

    #[test]
    fn normalization() {
        assert_eq!(normalize("  今日は\r\n晴れ\t\tです  "), "今日は 晴れ です");
        assert_eq!(normalize("全角\u{3000}空白"), "全角 空白");
        assert_eq!(normalize(" \n "), "");
    }

    #[test]
    fn purify_text() {
        let p = purifier();
        assert_eq!(p.purify_text("a\nb"), Some("a b".to_string()));
        assert_eq!(p.purify_text("オンラインカジノ"), None);
        assert_eq!(p.purify_text("   "), None);
    }

    #[test]
    fn jsonl_to_parts() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("10_1_0000.jsonl");
        std::fs::write(
            &src,
            concat!(
                "{\"text\": \"一行目\\n続き\"}\n",
                "{\"text\": \"カジノ情報\"}\n",
                "{\"text\": \"   \"}\n",
                "\n",
                "{\"id\": 4, \"text\": \"最後\"\n",
            ),
        )
        .unwrap();

        let out = dir.path().join("purif");
        let report = purifier()
            .with_remove_sources(true)
            .run(&[src.clone()], &out, "purif", 1024)
            .unwrap();

        assert_eq!(report.written, 2);
        // the blank JSONL line is not a document, the empty text is
        assert_eq!(report.skipped, 2);
        assert_eq!(report.parts, vec![out.join("purif0000.txt")]);
        assert_eq!(
            std::fs::read_to_string(&report.parts[0]).unwrap(),
            "一行目 続き\n最後\n"
        );
        assert!(!src.exists());
    }

    #[test]
    fn plain_lines_are_chained() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("purif0000.txt");
        let b = dir.path().join("purif0001.txt");
        std::fs::write(&a, "一\n育毛剤\n").unwrap();
        std::fs::write(&b, "二\n").unwrap();
        let missing = dir.path().join("purif0002.txt");

        let out = dir.path().join("purif2");
        let report = purifier()
            .run(&[a.clone(), b.clone(), missing.clone()], &out, "purif2", 1024)
            .unwrap();
        assert_eq!(report.written, 2);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.failed, vec![missing]);
        assert_eq!(
            std::fs::read_to_string(out.join("purif20000.txt")).unwrap(),
            "一\n二\n"
        );
        // sources are kept by default
        assert!(a.exists() && b.exists());
    }
}
