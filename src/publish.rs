/*! Publishing of generated files to a git remote.

Generated parts are committed and pushed in small batches, to keep each push reasonably sized.
Each batch is committed with the message `(<path1>), (<path2>), ... を追加`.
!*/
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::time::Duration;

use itertools::Itertools;
use log::{debug, error, info, warn};

use crate::download::RetryPolicy;
use crate::error::Error;

/// Root of the git repository containing `start`, if any.
pub fn git_root(start: &Path) -> Option<PathBuf> {
    let output = Command::new("git")
        .args(["rev-parse", "--show-toplevel"])
        .current_dir(start)
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let root = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if root.is_empty() {
        None
    } else {
        Some(PathBuf::from(root))
    }
}

/// Path of `file` relative to `root`, with `/` separators.
///
/// Falls back to the absolute path if `file` is outside of `root`.
pub fn relative_path(file: &Path, root: &Path) -> String {
    let file = file.canonicalize().unwrap_or_else(|_| file.to_path_buf());
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let rel = file.strip_prefix(&root).unwrap_or(&file);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
        .replace("//", "/")
}

pub fn commit_message(paths: &[String]) -> String {
    format!(
        "{} を追加",
        paths.iter().map(|p| format!("({})", p)).join(", ")
    )
}

fn git(root: &Path, args: &[&str]) -> Result<Output, Error> {
    debug!("git {}", args.join(" "));
    let output = Command::new("git").args(args).current_dir(root).output()?;
    if output.status.success() {
        Ok(output)
    } else {
        Err(Error::Git(format!(
            "git {} failed: {}{}",
            args.first().unwrap_or(&""),
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        )))
    }
}

/// Git batch publisher.
pub struct Publisher {
    root: PathBuf,
    batch_size: usize,
    policy: RetryPolicy,
}

impl Publisher {
    pub fn new(root: PathBuf, batch_size: usize, retries: u32) -> Self {
        Self {
            root,
            batch_size: batch_size.max(1),
            policy: RetryPolicy::exponential(retries),
        }
    }

    /// Publisher for the repository containing `start`.
    pub fn discover(start: &Path, batch_size: usize, retries: u32) -> Result<Self, Error> {
        let root = git_root(start)
            .ok_or_else(|| Error::Git(format!("{:?} is not in a git repository", start)))?;
        Ok(Self::new(root, batch_size, retries))
    }

    /// Stage `paths` and commit them. `Ok(false)` if there was nothing to commit.
    fn commit(&self, paths: &[String], message: &str) -> Result<bool, Error> {
        let mut add = vec!["add", "--"];
        add.extend(paths.iter().map(String::as_str));
        git(&self.root, &add)?;

        let staged = git(&self.root, &["diff", "--cached", "--name-only"])?;
        if String::from_utf8_lossy(&staged.stdout).trim().is_empty() {
            return Ok(false);
        }

        git(&self.root, &["commit", "-m", message])?;
        Ok(true)
    }

    /// Commit unless `committed` is already known, then push.
    fn commit_and_push(
        &self,
        paths: &[String],
        message: &str,
        committed: &mut Option<bool>,
    ) -> Result<(), Error> {
        if committed.is_none() {
            *committed = Some(self.commit(paths, message)?);
        }
        git(&self.root, &["push"])?;
        Ok(())
    }

    /// Publish one batch, retrying with backoff.
    ///
    /// Once committed, later attempts only push. The push also runs when there was
    /// nothing to commit, so commits left unpushed by a former run are sent too.
    pub fn publish_batch(&self, files: &[PathBuf]) -> Result<(), Error> {
        if files.is_empty() {
            return Ok(());
        }
        let paths: Vec<String> = files
            .iter()
            .map(|f| relative_path(f, &self.root))
            .collect();
        let message = commit_message(&paths);

        let retries = self.policy.retries().max(1);
        let mut committed = None;
        for attempt in 1..=retries {
            match self.commit_and_push(&paths, &message, &mut committed) {
                Ok(()) => {
                    if committed == Some(true) {
                        info!("pushed {} files", paths.len());
                    } else {
                        info!("nothing to commit for {}", message);
                    }
                    return Ok(());
                }
                Err(e) => {
                    warn!("git error (attempt {}/{}): {:?}", attempt, retries, e);
                    if attempt < retries {
                        let delay: Duration = self.policy.delay(attempt);
                        warn!("retrying in {:.1}s", delay.as_secs_f64());
                        std::thread::sleep(delay);
                    }
                }
            }
        }
        error!("giving up on {}", message);
        Err(Error::Git(format!("could not publish {}", message)))
    }

    /// Publish `files` in batches. Stops at the first batch that cannot be pushed.
    pub fn publish(&self, files: &[PathBuf]) -> Result<usize, Error> {
        let mut batches = 0;
        for batch in files.chunks(self.batch_size) {
            self.publish_batch(batch)?;
            batches += 1;
        }
        Ok(batches)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message() {
        let paths = vec!["hplt/a.jsonl".to_string(), "hplt/b.jsonl".to_string()];
        assert_eq!(
            commit_message(&paths),
            "(hplt/a.jsonl), (hplt/b.jsonl) を追加"
        );
    }

    #[test]
    fn relative() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("hplt/data");
        std::fs::create_dir_all(&sub).unwrap();
        let file = sub.join("1hplt0000.txt");
        std::fs::write(&file, "").unwrap();

        assert_eq!(relative_path(&file, dir.path()), "hplt/data/1hplt0000.txt");
    }

    fn git_ok(dir: &Path, args: &[&str]) {
        git(dir, args).unwrap();
    }

    fn commit_count(dir: &Path) -> usize {
        let out = git(dir, &["rev-list", "--count", "HEAD"]).unwrap();
        String::from_utf8_lossy(&out.stdout).trim().parse().unwrap()
    }

    #[test]
    fn push_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let repo = dir.path();
        git_ok(repo, &["init", "-q"]);
        git_ok(repo, &["config", "user.email", "gramdata@example.com"]);
        git_ok(repo, &["config", "user.name", "gramdata"]);
        git_ok(repo, &["config", "commit.gpgsign", "false"]);
        let file = repo.join("1hplt0000.txt");
        std::fs::write(&file, "猫\t4\n").unwrap();

        // no remote: the commit succeeds, every push fails
        let publisher = Publisher {
            root: repo.to_path_buf(),
            batch_size: 5,
            policy: RetryPolicy::Linear {
                retries: 2,
                base: Duration::ZERO,
                step: Duration::ZERO,
            },
        };
        assert!(publisher.publish(&[file.clone()]).is_err());
        // the second attempt only pushed
        assert_eq!(commit_count(repo), 1);

        // already committed, still not pushed
        assert!(publisher.publish(&[file]).is_err());
        assert_eq!(commit_count(repo), 1);
    }

    #[test]
    fn no_repository() {
        let dir = tempfile::tempdir().unwrap();
        // temp directories are not inside a repository on test machines,
        // but an enclosing one would be found, so only check consistency
        let found = git_root(dir.path());
        let discovered = Publisher::discover(dir.path(), 5, 1);
        assert_eq!(found.is_some(), discovered.is_ok());
    }
}
