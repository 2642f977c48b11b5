//! Command line arguments and parameters management/parsing.
use std::path::PathBuf;

use structopt::StructOpt;

use gramdata::download::Algorithm;
use gramdata::ngram::Tokenizer;
use gramdata::processing::{InputFormat, Naming};
use gramdata::table::TableFormat;

#[derive(Debug, StructOpt)]
#[structopt(name = "gramdata", about = "Japanese n-gram corpus tooling.")]
/// Holds every command that is callable by the `gramdata` command.
pub enum Gramdata {
    #[structopt(about = "Download a list of URLs (NWC2010 file lists)")]
    Download(Download),
    #[structopt(about = "Download a single large file, with resume and checksum verification")]
    Fetch(Fetch),
    #[structopt(about = "Download a random sample of numbered shards")]
    Sample(Sample),
    #[structopt(about = "Decompress and split in parts")]
    Unpack(Unpack),
    #[structopt(about = "Extract text and remove noisy lines")]
    Purify(Purify),
    #[structopt(about = "Size statistics of text files")]
    Stats(Stats),
    #[structopt(about = "Count n-grams")]
    Count(Count),
    #[structopt(about = "Remove wiki40b markers in place")]
    Wiki(Wiki),
    #[structopt(about = "Convert frequency tables to JSON")]
    Convert(Convert),
    #[structopt(about = "Count entries of JSON frequency tables")]
    Tally(Tally),
    #[structopt(about = "Build the romaji prefix index of JSON frequency tables")]
    Prefix(Prefix),
    #[structopt(about = "Commit and push files in batches")]
    Publish(Publish),
}

#[derive(Debug, StructOpt)]
/// Download command and parameters.
/// ```sh
/// gramdata-download
/// Download a list of URLs (NWC2010 file lists)
///
/// USAGE:
///     gramdata download [FLAGS] [OPTIONS] <paths-file> <dst>
///
/// OPTIONS:
///     -t <n-tasks>        number of tokio tasks. Default is 4.
/// ```
pub struct Download {
    #[structopt(parse(from_os_str), help = "file with one URL per line")]
    pub paths_file: PathBuf,
    #[structopt(parse(from_os_str), help = "download destination")]
    pub dst: PathBuf,
    #[structopt(short = "t", help = "number of tokio tasks. Default is 4.")]
    pub n_tasks: Option<usize>,
    #[structopt(long = "retries", default_value = "3", help = "tries per URL")]
    pub retries: u32,
    #[structopt(
        long = "overwrite",
        help = "download again files already present with the remote size"
    )]
    pub overwrite: bool,
    #[structopt(
        parse(from_os_str),
        long = "errors",
        default_value = "errors.txt",
        help = "where failed URLs are written"
    )]
    pub errors: PathBuf,
}

#[derive(Debug, StructOpt)]
pub struct Fetch {
    #[structopt(help = "file URL")]
    pub url: String,
    #[structopt(
        parse(from_os_str),
        default_value = ".",
        help = "destination root, the URL path is mirrored below it"
    )]
    pub dst: PathBuf,
    #[structopt(long = "check-size", help = "only print the remote size")]
    pub check_size: bool,
    #[structopt(long = "retries", default_value = "6")]
    pub retries: u32,
    #[structopt(long = "no-resume", help = "restart partial downloads from scratch")]
    pub no_resume: bool,
    #[structopt(long = "verify", help = "URL of a checksum list to verify the file against")]
    pub verify: Option<String>,
    #[structopt(long = "algorithm", default_value = "md5", help = "md5 or sha256")]
    pub algorithm: Algorithm,
}

#[derive(Debug, StructOpt)]
pub struct Sample {
    #[structopt(parse(from_os_str), help = "destination root")]
    pub dst: PathBuf,
    #[structopt(
        parse(from_os_str),
        long = "config",
        help = "targets (JSON). Defaults to the llm-jp corpus v4 Japanese targets."
    )]
    pub config: Option<PathBuf>,
    #[structopt(long = "seed", help = "seed of the sampling, for reproducible samples")]
    pub seed: Option<u64>,
    #[structopt(long = "prob", help = "override the default selection probability")]
    pub prob: Option<f64>,
    #[structopt(
        long = "pause",
        default_value = "0.5",
        help = "seconds to wait between downloads"
    )]
    pub pause: f64,
    #[structopt(long = "retries", default_value = "3")]
    pub retries: u32,
}

#[derive(Debug, StructOpt)]
pub struct Unpack {
    #[structopt(parse(from_os_str), help = "compressed file, or directory searched recursively")]
    pub src: PathBuf,
    #[structopt(parse(from_os_str), help = "destination of parts")]
    pub dst: PathBuf,
    #[structopt(long = "size-mb", default_value = "50", help = "size of each part (in MiB)")]
    pub size_mb: u64,
    #[structopt(long = "naming", default_value = "auto", help = "auto, nwc2010 or stem")]
    pub naming: Naming,
    #[structopt(long = "force", help = "overwrite existing parts")]
    pub force: bool,
}

#[derive(Debug, StructOpt)]
pub struct Purify {
    #[structopt(parse(from_os_str), help = "input directory")]
    pub src: PathBuf,
    #[structopt(parse(from_os_str), help = "output directory")]
    pub dst: PathBuf,
    #[structopt(long = "pattern", default_value = "*.jsonl", help = "glob of input files")]
    pub pattern: String,
    #[structopt(long = "prefix", default_value = "purif", help = "prefix of output parts")]
    pub prefix: String,
    #[structopt(long = "size-mb", default_value = "50", help = "size of each part (in MiB)")]
    pub size_mb: u64,
    #[structopt(long = "format", default_value = "auto", help = "auto, jsonl or lines")]
    pub format: InputFormat,
    #[structopt(
        parse(from_os_str),
        long = "exclude-words",
        help = "additional exclusion word list"
    )]
    pub exclude_words: Vec<PathBuf>,
    #[structopt(long = "no-default-words", help = "do not use the built-in word list")]
    pub no_default_words: bool,
    #[structopt(short = "i", long = "ignore-case", help = "case insensitive word matching")]
    pub ignore_case: bool,
    #[structopt(long = "noisy", help = "drop lines with a larger non-letter ratio")]
    pub noisy: Option<f64>,
    #[structopt(long = "min-length", help = "drop lines shorter than this (in chars)")]
    pub min_length: Option<usize>,
    #[structopt(long = "remove-sources", help = "delete inputs once processed")]
    pub remove_sources: bool,
}

#[derive(Debug, StructOpt)]
pub struct Stats {
    #[structopt(parse(from_os_str))]
    pub dir: PathBuf,
    #[structopt(long = "pattern", short = "p", default_value = "*")]
    pub pattern: String,
    #[structopt(long = "top", short = "t", default_value = "10", help = "number of largest files shown")]
    pub top: usize,
}

#[derive(Debug, StructOpt)]
/// Count command and parameters.
///
/// Counts are exact unless `--spill` is set, in which case counts are flushed to disk
/// as they grow and are only partial in each file.
pub struct Count {
    #[structopt(parse(from_os_str), help = "input directory")]
    pub src: PathBuf,
    #[structopt(parse(from_os_str), help = "output directory")]
    pub dst: PathBuf,
    #[structopt(long = "pattern", default_value = "*.txt")]
    pub pattern: String,
    #[structopt(long = "name", default_value = "gram", help = "output files are <n><name><idx>.txt")]
    pub name: String,
    #[structopt(long = "max-n", default_value = "7")]
    pub max_n: usize,
    #[structopt(long = "min-count", default_value = "10", help = "ignored when spilling")]
    pub min_count: u64,
    #[structopt(long = "tokenizer", default_value = "whitespace", help = "chars, words or whitespace")]
    pub tokenizer: Tokenizer,
    #[structopt(long = "japanese-only", help = "ignore tokens without Japanese characters")]
    pub japanese_only: bool,
    #[structopt(long = "format", default_value = "auto", help = "auto, jsonl or lines")]
    pub format: InputFormat,
    #[structopt(long = "size-mb", default_value = "50", help = "size of each part (in MiB)")]
    pub size_mb: u64,
    #[structopt(long = "spill", help = "bound memory usage")]
    pub spill: bool,
    #[structopt(long = "publish", help = "commit and push created files")]
    pub publish: bool,
    #[structopt(long = "batch-size", default_value = "5")]
    pub batch_size: usize,
    #[structopt(long = "retries", default_value = "6")]
    pub retries: u32,
}

#[derive(Debug, StructOpt)]
pub struct Wiki {
    #[structopt(parse(from_os_str), help = "input directory")]
    pub src: PathBuf,
    #[structopt(long = "pattern", default_value = "wiki40b-ja_*.txt")]
    pub pattern: String,
    #[structopt(parse(from_os_str), long = "backup-dir", help = "keep originals there")]
    pub backup_dir: Option<PathBuf>,
}

#[derive(Debug, StructOpt)]
pub struct Convert {
    #[structopt(
        help = "token-count, token-tab-count, split-bigram, quoted, count-token or count-bigram"
    )]
    pub format: TableFormat,
    #[structopt(parse(from_os_str), required = true, help = "frequency tables")]
    pub inputs: Vec<PathBuf>,
    #[structopt(parse(from_os_str), long = "dst", default_value = ".", help = "output directory")]
    pub dst: PathBuf,
    #[structopt(long = "sum-duplicates", help = "sum counts of duplicated keys")]
    pub sum_duplicates: bool,
    #[structopt(long = "indent", default_value = "4")]
    pub indent: usize,
}

#[derive(Debug, StructOpt)]
pub struct Tally {
    #[structopt(parse(from_os_str), default_value = ".", help = "directory of JSON tables")]
    pub dir: PathBuf,
    #[structopt(parse(from_os_str), long = "output", help = "defaults to <dir>/count.txt")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, StructOpt)]
pub struct Prefix {
    #[structopt(parse(from_os_str), help = "directory of JSON tables")]
    pub src: PathBuf,
    #[structopt(parse(from_os_str), help = "kana definition file")]
    pub kana: PathBuf,
    #[structopt(parse(from_os_str), help = "output directory")]
    pub dst: PathBuf,
}

#[derive(Debug, StructOpt)]
pub struct Publish {
    #[structopt(parse(from_os_str), required = true)]
    pub files: Vec<PathBuf>,
    #[structopt(long = "batch-size", default_value = "5")]
    pub batch_size: usize,
    #[structopt(long = "retries", default_value = "6")]
    pub retries: u32,
}
