//! Mirroring of URL lists (NWC2010 `filelist*` files).
//!
//! Behaves like `wget -x -nH -i filelist`: the URL path is recreated under the destination,
//! without the host name.
use std::io::{BufRead, BufReader, Read};
use std::path::{Path, PathBuf};

use futures::stream::{self, StreamExt};
use log::{debug, error, info, warn};
use reqwest::Url;

use super::fetch::{FetchOutcome, Fetcher};
use crate::error::Error;

/// Valid URLs of a list, and the lines that could not be used.
#[derive(Debug, Default)]
pub struct FileList {
    pub urls: Vec<Url>,
    pub invalid: Vec<String>,
}

impl FileList {
    /// Read a list, one URL per line. Blank lines and `#` comments are ignored.
    pub fn from_reader<R: Read>(r: R) -> Result<Self, Error> {
        let mut list = FileList::default();
        for line in BufReader::new(r).lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match Url::parse(line) {
                Ok(url) if url.host().is_some() => list.urls.push(url),
                _ => {
                    warn!("invalid URL, skipping: {}", line);
                    list.invalid.push(line.to_string());
                }
            }
        }
        debug!(
            "Got {valid}/{total} valid URLs",
            valid = list.urls.len(),
            total = list.urls.len() + list.invalid.len()
        );
        Ok(list)
    }
}

/// Local path of `url` under `root`, host name excluded.
pub fn mirror_path(root: &Path, url: &Url) -> PathBuf {
    let mut path = root.to_path_buf();
    if let Some(segments) = url.path_segments() {
        for segment in segments.filter(|s| !s.is_empty() && *s != "." && *s != "..") {
            path.push(segment);
        }
    }
    path
}

/// Download results.
#[derive(Debug, Default)]
pub struct Summary {
    pub downloaded: usize,
    pub skipped: usize,
    /// failed URLs along with the reason
    pub failed: Vec<(String, String)>,
}

/// Download every URL of `list` into `dst`, running at most `n_tasks` downloads at once.
///
/// Invalid lines of the list are reported as failures.
pub async fn download_all(list: &FileList, dst: &Path, fetcher: &Fetcher, n_tasks: usize) -> Summary {
    let nb_links = list.urls.len();
    let results: Vec<(String, Result<FetchOutcome, Error>)> = stream::iter(list.urls.iter().enumerate())
        .map(|(id, url)| {
            let path = mirror_path(dst, url);
            async move {
                info!("downloading {}/{}: {}", id + 1, nb_links, url);
                (url.to_string(), fetcher.fetch(url, &path).await)
            }
        })
        .buffer_unordered(n_tasks.max(1))
        .collect()
        .await;

    let mut summary = Summary::default();
    for line in &list.invalid {
        summary
            .failed
            .push((line.clone(), "invalid URL".to_string()));
    }
    for (url, result) in results {
        match result {
            Ok(FetchOutcome::Downloaded(_)) => summary.downloaded += 1,
            Ok(FetchOutcome::Skipped) => summary.skipped += 1,
            Ok(FetchOutcome::NotFound) => {
                error!("not found: {}", url);
                summary.failed.push((url, "not found".to_string()));
            }
            Err(e) => {
                error!("Error during download of {}:\n {:?}", url, e);
                summary.failed.push((url, format!("{:?}", e)));
            }
        }
    }
    info!(
        "done: downloaded={} skipped={} failed={}",
        summary.downloaded,
        summary.skipped,
        summary.failed.len()
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_list() {
        let list = "# nwc2010 word over9\n\
                    http://example.org/nwc2010-ngrams/word/over9/2gms/2gm-0000.xz\n\
                    \n\
                    not a url\n\
                    file:///tmp/local\n";
        let l = FileList::from_reader(list.as_bytes()).unwrap();
        assert_eq!(l.urls.len(), 1);
        assert_eq!(l.invalid, vec!["not a url", "file:///tmp/local"]);
    }

    #[test]
    fn mirror_without_host() {
        let url = Url::parse("http://example.org/nwc2010-ngrams/word/over9/2gms/2gm-0000.xz").unwrap();
        assert_eq!(
            mirror_path(Path::new("out"), &url),
            PathBuf::from("out/nwc2010-ngrams/word/over9/2gms/2gm-0000.xz")
        );
    }

    #[tokio::test]
    async fn invalid_lines_are_failures() {
        let list = FileList::from_reader("nope\n".as_bytes()).unwrap();
        let fetcher = Fetcher::new(super::super::RetryPolicy::linear(1)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let summary = download_all(&list, dir.path(), &fetcher, 4).await;
        assert_eq!(summary.downloaded, 0);
        assert_eq!(summary.failed.len(), 1);
    }
}
