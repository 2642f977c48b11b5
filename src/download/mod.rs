/*! Corpus downloading

- [filelist]: mirror a list of URLs (NWC2010 file lists), concurrently.
- [fetch]: single large files with resume and checksum verification (HPLT shards).
- [sample]: random subsets of numbered shards (llm-jp corpus).
!*/
pub mod checksum;
pub mod fetch;
pub mod filelist;
pub mod sample;

pub use checksum::{verify_listed, Algorithm, ChecksumList};
pub use fetch::{Existing, FetchOutcome, Fetcher, RetryPolicy};
pub use filelist::{download_all, mirror_path, FileList};
pub use sample::{sample, SampleConfig};
