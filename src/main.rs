//! # gramdata
//!
//! Acquisition and preprocessing of Japanese n-gram corpora
//! (NWC2010, HPLT, llm-jp corpus, wiki40b and assorted frequency tables).
//!
//! ## Getting started
//!
//! ```sh
//! gramdata 0.3.0
//! Japanese n-gram corpus tooling.
//!
//! USAGE:
//!     gramdata <SUBCOMMAND>
//!
//! SUBCOMMANDS:
//!     convert     Convert frequency tables to JSON
//!     count       Count n-grams
//!     download    Download a list of URLs (NWC2010 file lists)
//!     fetch       Download a single large file, with resume and checksum verification
//!     help        Prints this message or the help of the given subcommand(s)
//!     prefix      Build the romaji prefix index of JSON frequency tables
//!     publish     Commit and push files in batches
//!     purify      Extract text and remove noisy lines
//!     sample      Download a random sample of numbered shards
//!     stats       Size statistics of text files
//!     tally       Count entries of JSON frequency tables
//!     unpack      Decompress and split in parts
//!     wiki        Remove wiki40b markers in place
//! ```
//!
//! Logging is controlled by `RUST_LOG` (e.g. `RUST_LOG=gramdata=info`).
use std::fs::File;
use std::io::Write;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use structopt::StructOpt;
use url::Url;

use gramdata::download::{
    self, download_all, mirror_path, verify_listed, ChecksumList, Existing, FetchOutcome, Fetcher,
    FileList, RetryPolicy, SampleConfig,
};
use gramdata::error::Error;
use gramdata::filtering::{ExcludeWords, FilterChain, FilterKind, Length, Noisy};
use gramdata::io::{list_files, MIB};
use gramdata::ngram::{self, NgramCounter, SpillCounter};
use gramdata::prefix::{PrefixIndex, RomajiMap};
use gramdata::processing::stats::{self, HumanSize};
use gramdata::processing::{unpack, wiki, Purifier};
use gramdata::publish::Publisher;
use gramdata::table::{self, tally};

#[macro_use]
extern crate log;

mod cli;

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::init();

    let opt = cli::Gramdata::from_args();
    debug!("cli args\n{:#?}", opt);

    match opt {
        cli::Gramdata::Download(d) => {
            let list = FileList::from_reader(File::open(&d.paths_file)?)?;
            let existing = if d.overwrite {
                Existing::Overwrite
            } else {
                Existing::SkipSameSize
            };
            let fetcher = Fetcher::new(RetryPolicy::linear(d.retries))?.with_existing(existing);
            let summary = download_all(&list, &d.dst, &fetcher, d.n_tasks.unwrap_or(4)).await;

            // write eventual download errors
            let mut error_file = File::create(&d.errors)?;
            for (url, reason) in &summary.failed {
                writeln!(error_file, "{}\t{}", url, reason)?;
            }
            println!(
                "downloaded: {}, skipped: {}, failed: {} (see {:?})",
                summary.downloaded,
                summary.skipped,
                summary.failed.len(),
                d.errors
            );
        }

        cli::Gramdata::Fetch(f) => {
            let url = Url::parse(&f.url)?;
            let fetcher = Fetcher::new(RetryPolicy::exponential(f.retries))?
                .with_resume(!f.no_resume)
                .with_existing(Existing::SkipSameSize);

            if f.check_size {
                match fetcher.remote_size(&url).await? {
                    Some(size) => println!("{}\t{} bytes ({})", url, size, HumanSize(size)),
                    None => println!("{}\tunknown size", url),
                }
                return Ok(());
            }

            let dst = mirror_path(&f.dst, &url);
            if let FetchOutcome::NotFound = fetcher.fetch(&url, &dst).await? {
                return Err(Error::Custom(format!("not found: {}", url)));
            }

            if let Some(list_url) = f.verify {
                let list = ChecksumList::parse(&fetcher.get_text(&Url::parse(&list_url)?).await?);
                let key = url.path().trim_start_matches('/');
                verify_listed(&list, key, &dst, f.algorithm)?;
                info!("checksum ok for {:?}", dst);
            }
            println!("{}", dst.display());
        }

        cli::Gramdata::Sample(s) => {
            let mut config = match &s.config {
                Some(path) => SampleConfig::from_file(path)?,
                None => SampleConfig::builtin()?,
            };
            if let Some(prob) = s.prob {
                config.prob = prob;
            }
            let mut rng = match s.seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_entropy(),
            };
            let fetcher =
                Fetcher::new(RetryPolicy::linear(s.retries))?.with_existing(Existing::Skip);
            let pause = Duration::from_secs_f64(s.pause.max(0.0));
            let summary = download::sample(&config, &s.dst, &fetcher, &mut rng, pause).await?;
            println!(
                "selected: {}, downloaded: {}, skipped: {}, missed: {}",
                summary.selected, summary.downloaded, summary.skipped, summary.missed
            );
        }

        cli::Gramdata::Unpack(u) => {
            let inputs = unpack::find_inputs(&u.src)?;
            if inputs.is_empty() {
                warn!("no compressed input in {:?}", u.src);
            }
            let parts = unpack::unpack(&inputs, &u.dst, u.size_mb * MIB, u.naming, u.force)?;
            println!("{} inputs, {} parts created", inputs.len(), parts.len());
        }

        cli::Gramdata::Purify(p) => {
            let mut words = if p.no_default_words {
                ExcludeWords::new(Vec::new(), p.ignore_case)
            } else {
                ExcludeWords::builtin(p.ignore_case)
            };
            for path in &p.exclude_words {
                words.extend(ExcludeWords::from_file(path, p.ignore_case)?);
            }

            let mut filters = FilterChain::default();
            if !words.is_empty() {
                filters.add(FilterKind::Exclude(words));
            }
            if let Some(min_size) = p.min_length {
                filters.add(FilterKind::Length(Length::with_min_size(min_size)));
            }
            if let Some(threshold) = p.noisy {
                filters.add(FilterKind::Noisy(Noisy::with_threshold(threshold)));
            }

            let files = list_files(&p.src, &p.pattern)?;
            info!("{} files to purify", files.len());
            let report = Purifier::new(filters)
                .with_format(p.format)
                .with_remove_sources(p.remove_sources)
                .run(&files, &p.dst, &p.prefix, p.size_mb * MIB)?;

            for part in &report.parts {
                let size = std::fs::metadata(part).map(|m| m.len()).unwrap_or(0);
                println!("{}\t{}", part.display(), HumanSize(size));
            }
            println!(
                "written: {}, skipped: {}, failed files: {}, removed files: {}",
                report.written,
                report.skipped,
                report.failed.len(),
                report.removed.len()
            );
        }

        cli::Gramdata::Stats(s) => {
            let files = list_files(&s.dir, &s.pattern)?;
            if files.is_empty() {
                println!("no file matching {:?}", s.dir.join(&s.pattern));
                return Ok(());
            }
            let stats = stats::analyze(&files);
            println!("files: {}", stats.files.len());
            println!(
                "total bytes: {} ({})",
                stats.total_bytes,
                HumanSize(stats.total_bytes)
            );
            println!("total chars: {}", stats.total_chars);
            println!("bytes/char: {:.3}", stats.bytes_per_char());
            println!();
            println!("top {} files (by size):", s.top);
            for f in stats.top(s.top) {
                println!(
                    " - {}: {} bytes, {} chars, bytes/char={:.3}",
                    f.path.file_name().unwrap_or_default().to_string_lossy(),
                    f.bytes,
                    f.chars,
                    f.bytes_per_char()
                );
            }
        }

        cli::Gramdata::Count(c) => {
            if c.max_n == 0 {
                return Err(Error::Custom("--max-n must be at least 1".to_string()));
            }
            let files = list_files(&c.src, &c.pattern)?;
            info!("counting {} files", files.len());
            let counter = NgramCounter {
                max_n: c.max_n,
                tokenizer: c.tokenizer,
                japanese_only: c.japanese_only,
                format: c.format,
            };

            let created = if c.spill {
                let mut spill = SpillCounter::new(counter, &c.dst, &c.name, c.size_mb * MIB);
                for path in &files {
                    if let Err(e) = spill.add_file(path) {
                        error!("could not count {:?}: {:?}", path, e);
                    }
                }
                spill.finish()?
            } else {
                let counts = counter.count_files(&files);
                ngram::export(&counts, &c.dst, &c.name, c.min_count, c.size_mb * MIB)?
            };
            for path in &created {
                println!("{}", path.display());
            }

            if c.publish {
                let publisher = Publisher::discover(&c.dst, c.batch_size, c.retries)?;
                let batches = publisher.publish(&created)?;
                info!("published {} batches", batches);
            }
        }

        cli::Gramdata::Wiki(w) => {
            let files = list_files(&w.src, &w.pattern)?;
            let done = wiki::strip_all(&files, w.backup_dir.as_deref());
            println!("{}/{} files processed", done, files.len());
        }

        cli::Gramdata::Convert(c) => {
            let results =
                table::convert_all(&c.inputs, &c.dst, c.format, c.sum_duplicates, c.indent);
            for (dst, report) in &results {
                println!(
                    "{}: {} entries, {} invalid lines, {} duplicates",
                    dst.display(),
                    report.entries,
                    report.invalid,
                    report.duplicates
                );
            }
            if results.len() < c.inputs.len() {
                return Err(Error::Custom(format!(
                    "{} of {} conversions failed",
                    c.inputs.len() - results.len(),
                    c.inputs.len()
                )));
            }
        }

        cli::Gramdata::Tally(t) => {
            for (name, count) in tally::tally(&t.dir, t.output)? {
                println!("{} {}", name, count);
            }
        }

        cli::Gramdata::Prefix(p) => {
            let romaji = RomajiMap::from_file(&p.kana)?;
            info!("{} target kana", romaji.len());
            let mut index = PrefixIndex::new(romaji);
            let indexed = index.add_dir(&p.src)?;
            let written = index.write(&p.dst)?;
            println!("{} tables indexed, {} files written", indexed, written.len());
        }

        cli::Gramdata::Publish(p) => {
            let publisher = Publisher::discover(&std::env::current_dir()?, p.batch_size, p.retries)?;
            let batches = publisher.publish(&p.files)?;
            println!("{} batches published", batches);
        }
    };
    Ok(())
}
