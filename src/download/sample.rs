/*! Random sampling of numbered corpus shards.

Some corpora (llm-jp-corpus v4) are split into thousands of numbered shards.
Rather than downloading everything, each shard is selected with a given probability.

Targets are described in JSON:

```json
{
  "base_url": "https://gitlab.llm-jp.nii.ac.jp/datasets/llm-jp-corpus-v4/-/raw/main",
  "prob": 0.05,
  "targets": [
    { "name": "ja_cc_level0", "remote_dir": "ja/ja_cc/level0", "dst_dir": "llm-jp/ja_cc/level0",
      "index_min": 0, "index_max": 1619, "pattern": "{idx:04}.jsonl.gz" }
  ]
}
```
!*/
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::{info, warn};
use rand::Rng;
use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::fetch::{FetchOutcome, Fetcher};
use crate::error::Error;

const BUILTIN_TARGETS: &str = include_str!("../../resources/llm-jp.json");

fn default_prob() -> f64 {
    0.05
}

fn default_index_max() -> u32 {
    9999
}

fn default_pattern() -> String {
    "{idx:04}.jsonl.gz".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Target {
    pub name: Option<String>,
    pub remote_dir: String,
    /// relative paths are resolved against the output root
    pub dst_dir: PathBuf,
    #[serde(default)]
    pub index_min: u32,
    #[serde(default = "default_index_max")]
    pub index_max: u32,
    #[serde(default = "default_pattern")]
    pub pattern: String,
    /// overrides the global probability
    pub prob: Option<f64>,
}

impl Target {
    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.remote_dir)
    }

    /// File name of shard `idx`. `{idx:04}` is zero-padded, `{idx}` is not.
    pub fn file_name(&self, idx: u32) -> String {
        self.pattern
            .replace("{idx:04}", &format!("{:04}", idx))
            .replace("{idx:04d}", &format!("{:04}", idx))
            .replace("{idx}", &idx.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SampleConfig {
    pub base_url: String,
    #[serde(default = "default_prob")]
    pub prob: f64,
    pub targets: Vec<Target>,
}

impl SampleConfig {
    /// llm-jp-corpus v4 Japanese shards.
    pub fn builtin() -> Result<Self, Error> {
        Ok(serde_json::from_str(BUILTIN_TARGETS)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        Ok(serde_json::from_reader(File::open(path)?)?)
    }

    pub fn url(&self, target: &Target, idx: u32) -> Result<Url, Error> {
        let url = format!(
            "{}/{}/{}",
            self.base_url.trim_end_matches('/'),
            target.remote_dir.trim_matches('/'),
            target.file_name(idx)
        );
        Ok(Url::parse(&url)?)
    }

    /// Draw the shard indices of `target`.
    pub fn select<R: Rng>(&self, target: &Target, rng: &mut R) -> Vec<u32> {
        let prob = target.prob.unwrap_or(self.prob);
        (target.index_min..=target.index_max)
            .filter(|_| rng.gen::<f64>() < prob)
            .collect()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SampleSummary {
    pub selected: usize,
    pub downloaded: usize,
    pub skipped: usize,
    pub missed: usize,
}

impl std::ops::AddAssign for SampleSummary {
    fn add_assign(&mut self, other: Self) {
        self.selected += other.selected;
        self.downloaded += other.downloaded;
        self.skipped += other.skipped;
        self.missed += other.missed;
    }
}

/// Sample and download shards of every target, sequentially.
///
/// `pause` is waited after each download attempt to go easy on the server.
pub async fn sample<R: Rng>(
    config: &SampleConfig,
    out: &Path,
    fetcher: &Fetcher,
    rng: &mut R,
    pause: Duration,
) -> Result<SampleSummary, Error> {
    let mut total = SampleSummary::default();
    for target in &config.targets {
        let dst_dir = out.join(&target.dst_dir);
        info!(
            "target={} remote_dir={} dst_dir={:?} idx_range={}-{} prob={}",
            target.name(),
            target.remote_dir,
            dst_dir,
            target.index_min,
            target.index_max,
            target.prob.unwrap_or(config.prob)
        );
        std::fs::create_dir_all(&dst_dir)?;

        let mut summary = SampleSummary::default();
        for idx in config.select(target, rng) {
            summary.selected += 1;
            let url = config.url(target, idx)?;
            let dst = dst_dir.join(target.file_name(idx));

            match fetcher.fetch(&url, &dst).await {
                Ok(FetchOutcome::Downloaded(_)) => summary.downloaded += 1,
                Ok(FetchOutcome::Skipped) => {
                    summary.skipped += 1;
                    // nothing was requested, no need to wait
                    continue;
                }
                Ok(FetchOutcome::NotFound) => {
                    info!("not available: {}", url);
                    summary.missed += 1;
                }
                Err(e) => {
                    warn!("failed: {} ({:?})", url, e);
                    summary.missed += 1;
                }
            }
            tokio::time::sleep(pause).await;
        }
        info!(
            "finished target={} selected={} downloaded={}",
            target.name(),
            summary.selected,
            summary.downloaded
        );
        total += summary;
    }
    info!(
        "total_selected={} total_downloaded={}",
        total.selected, total.downloaded
    );
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn target(prob: Option<f64>) -> Target {
        Target {
            name: None,
            remote_dir: "/ja/ja_cc/level0/".to_string(),
            dst_dir: PathBuf::from("level0"),
            index_min: 0,
            index_max: 999,
            pattern: default_pattern(),
            prob,
        }
    }

    #[test]
    fn builtin_config() {
        let c = SampleConfig::builtin().unwrap();
        assert_eq!(c.prob, 0.05);
        assert!(c.targets.iter().any(|t| t.name() == "ja_nwc2010"));
        for t in &c.targets {
            assert!(t.index_min <= t.index_max);
            assert!(t.dst_dir.is_relative());
        }
    }

    #[test]
    fn names_and_urls() {
        let c = SampleConfig {
            base_url: "https://example.org/raw/main/".to_string(),
            prob: 0.05,
            targets: vec![],
        };
        let t = target(None);
        assert_eq!(t.name(), "/ja/ja_cc/level0/");
        assert_eq!(t.file_name(7), "0007.jsonl.gz");
        assert_eq!(
            c.url(&t, 1234).unwrap().as_str(),
            "https://example.org/raw/main/ja/ja_cc/level0/1234.jsonl.gz"
        );
    }

    #[test]
    fn selection_is_seeded() {
        let c = SampleConfig {
            base_url: String::new(),
            prob: 0.05,
            targets: vec![],
        };
        let t = target(None);
        let a = c.select(&t, &mut StdRng::seed_from_u64(42));
        let b = c.select(&t, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
        // 1000 draws at 5%
        assert!(a.len() > 10 && a.len() < 120, "{}", a.len());
        assert!(a.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn selection_probability_override() {
        let c = SampleConfig {
            base_url: String::new(),
            prob: 0.0,
            targets: vec![],
        };
        let mut rng = StdRng::seed_from_u64(1);
        assert!(c.select(&target(None), &mut rng).is_empty());
        assert_eq!(c.select(&target(Some(1.0)), &mut rng).len(), 1000);
    }
}
