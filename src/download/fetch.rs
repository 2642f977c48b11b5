//! HTTP fetching with retries and resumable partial files.
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use futures_util::StreamExt;
use log::{debug, info, warn};
use rand::Rng;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, RANGE};
use reqwest::{StatusCode, Url};
use tokio::io::AsyncWriteExt;

use crate::error::Error;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(3);
const USER_AGENT: &str = concat!("gramdata/", env!("CARGO_PKG_VERSION"));

/// How long to wait between two attempts.
#[derive(Debug, Clone, Copy)]
pub enum RetryPolicy {
    /// waits `base + step * attempt`
    Linear {
        retries: u32,
        base: Duration,
        step: Duration,
    },
    /// waits `min(2^attempt + U(0, 3), cap)` seconds
    Exponential { retries: u32, cap: Duration },
}

impl RetryPolicy {
    /// Policy used for bulk file lists: 3 tries, 1+attempt seconds.
    pub fn linear(retries: u32) -> Self {
        RetryPolicy::Linear {
            retries,
            base: Duration::from_secs(1),
            step: Duration::from_secs(1),
        }
    }

    /// Policy used for large single files: capped exponential backoff with jitter.
    pub fn exponential(retries: u32) -> Self {
        RetryPolicy::Exponential {
            retries,
            cap: Duration::from_secs(300),
        }
    }

    pub fn retries(&self) -> u32 {
        match self {
            RetryPolicy::Linear { retries, .. } => *retries,
            RetryPolicy::Exponential { retries, .. } => *retries,
        }
    }

    /// Delay after the failed attempt number `attempt` (starting at 1).
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            RetryPolicy::Linear { base, step, .. } => *base + *step * attempt,
            RetryPolicy::Exponential { cap, .. } => {
                let jitter: f64 = rand::thread_rng().gen_range(0.0..3.0);
                let secs = 2f64.powi(attempt.min(16) as i32) + jitter;
                Duration::from_secs_f64(secs).min(*cap)
            }
        }
    }
}

/// What to do when the destination already exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Existing {
    Overwrite,
    Skip,
    /// skip if the local size is equal to the remote Content-Length
    SkipSameSize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// number of bytes of the final file
    Downloaded(u64),
    Skipped,
    NotFound,
}

/// Path of the temporary file used while downloading `dst`.
pub fn part_path(dst: &Path) -> PathBuf {
    let mut name = dst.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Downloads files, writing into `<dst>.part` and renaming on completion.
pub struct Fetcher {
    client: reqwest::Client,
    policy: RetryPolicy,
    resume: bool,
    existing: Existing,
}

impl Fetcher {
    pub fn new(policy: RetryPolicy) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            policy,
            resume: false,
            existing: Existing::Overwrite,
        })
    }

    /// Keep partial files between attempts and continue them with a `Range` request.
    pub fn with_resume(mut self, resume: bool) -> Self {
        self.resume = resume;
        self
    }

    pub fn with_existing(mut self, existing: Existing) -> Self {
        self.existing = existing;
        self
    }

    /// Remote size as announced by a HEAD request.
    ///
    /// `None` if the server does not send a Content-Length.
    pub async fn remote_size(&self, url: &Url) -> Result<Option<u64>, Error> {
        let resp = self.client.head(url.clone()).send().await?;
        let resp = resp.error_for_status()?;
        Ok(content_length(resp.headers()))
    }

    /// Body of a small text resource, such as a checksum list.
    pub async fn get_text(&self, url: &Url) -> Result<String, Error> {
        let resp = self.client.get(url.clone()).send().await?;
        Ok(resp.error_for_status()?.text().await?)
    }

    async fn should_skip(&self, url: &Url, dst: &Path) -> bool {
        let local = match tokio::fs::metadata(dst).await {
            Ok(m) => m.len(),
            Err(_) => return false,
        };
        match self.existing {
            Existing::Overwrite => false,
            Existing::Skip => true,
            Existing::SkipSameSize => match self.remote_size(url).await {
                Ok(Some(remote)) => remote == local,
                Ok(None) => false,
                Err(e) => {
                    debug!("HEAD failed for {}: {:?}", url, e);
                    false
                }
            },
        }
    }

    /// Download `url` into `dst`, retrying following the policy.
    pub async fn fetch(&self, url: &Url, dst: &Path) -> Result<FetchOutcome, Error> {
        if self.should_skip(url, dst).await {
            info!("already present, skipping {:?}", dst);
            return Ok(FetchOutcome::Skipped);
        }

        let retries = self.policy.retries().max(1);
        let mut last_error = None;
        for attempt in 1..=retries {
            match self.try_fetch(url, dst).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) => {
                    warn!("[{}/{}] error on {}: {:?}", attempt, retries, url, e);
                    last_error = Some(e);
                    if attempt < retries {
                        let delay = self.policy.delay(attempt);
                        warn!("retrying in {:.1}s", delay.as_secs_f64());
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        if !self.resume {
            let part = part_path(dst);
            if tokio::fs::metadata(&part).await.is_ok() {
                tokio::fs::remove_file(&part).await?;
            }
        }

        Err(last_error
            .unwrap_or_else(|| Error::Custom(format!("could not download {}", url))))
    }

    async fn try_fetch(&self, url: &Url, dst: &Path) -> Result<FetchOutcome, Error> {
        let part = part_path(dst);
        let existing = if self.resume {
            tokio::fs::metadata(&part)
                .await
                .map(|m| m.len())
                .unwrap_or(0)
        } else {
            0
        };

        let mut request = self.client.get(url.clone());
        if existing > 0 {
            debug!("resuming {:?} from byte {}", part, existing);
            request = request.header(RANGE, format!("bytes={}-", existing));
        }
        let resp = request.send().await?;

        match resp.status() {
            StatusCode::NOT_FOUND => return Ok(FetchOutcome::NotFound),
            StatusCode::RANGE_NOT_SATISFIABLE if existing > 0 => {
                // stale partial file, start over on next attempt
                tokio::fs::remove_file(&part).await?;
                return Err(Error::Custom(format!(
                    "range not satisfiable for {:?}, partial file removed",
                    part
                )));
            }
            _ => (),
        }
        let resp = resp.error_for_status()?;

        // the server may ignore the range and send everything again
        let append = existing > 0 && resp.status() == StatusCode::PARTIAL_CONTENT;
        let offset = if append { existing } else { 0 };
        let total = content_length(resp.headers()).map(|l| l + offset);

        if let Some(parent) = dst.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut file = if append {
            tokio::fs::OpenOptions::new()
                .append(true)
                .open(&part)
                .await?
        } else {
            tokio::fs::File::create(&part).await?
        };

        let mut downloaded = offset;
        let mut last_report = Instant::now();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;

            if last_report.elapsed() >= PROGRESS_INTERVAL {
                last_report = Instant::now();
                match total {
                    Some(total) if total > 0 => info!(
                        "{:?}: {} / {} bytes ({:.1}%)",
                        dst,
                        downloaded,
                        total,
                        downloaded as f64 * 100.0 / total as f64
                    ),
                    _ => info!("{:?}: {} bytes", dst, downloaded),
                }
            }
        }
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&part, dst).await?;
        info!("downloaded {:?} ({} bytes)", dst, downloaded);
        Ok(FetchOutcome::Downloaded(downloaded))
    }
}
