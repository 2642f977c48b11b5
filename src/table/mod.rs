/*! Frequency table conversion

Frequency tables come in several line formats (see [TableFormat]).
They are converted into a JSON object `{"<gram>": <count>, ...}`, keeping the order in which keys were first seen.

Invalid lines are reported and counted but never stop a conversion.
!*/
pub mod tally;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, error, info, warn};
use rayon::prelude::*;
use serde_json::{Map, Value};

use crate::error::Error;
use crate::io::{self, compression};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableFormat {
    /// `token count`, whitespace separated
    TokenCount,
    /// `ngram\tcount`, exactly two fields
    TokenTabCount,
    /// `a\tb\tcount`, keyed by `ab`
    SplitBigram,
    /// `"seq" "count"`
    Quoted,
    /// `count\ttoken`
    CountToken,
    /// tab separated csv `count\ta\tb`, keyed by `ab`
    CountBigram,
}

impl FromStr for TableFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "token-count" => Ok(TableFormat::TokenCount),
            "token-tab-count" => Ok(TableFormat::TokenTabCount),
            "split-bigram" => Ok(TableFormat::SplitBigram),
            "quoted" => Ok(TableFormat::Quoted),
            "count-token" => Ok(TableFormat::CountToken),
            "count-bigram" => Ok(TableFormat::CountBigram),
            other => Err(Error::Custom(format!("unknown table format {}", other))),
        }
    }
}

/// First run of ASCII digits of `s`.
fn first_digits(s: &str) -> Option<u64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let digits: String = s[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

fn parse_count(s: &str) -> Result<u64, String> {
    s.trim()
        .parse()
        .map_err(|_| format!("invalid count {:?}", s))
}

/// `"seq" "123..."`: the count is the leading digits of the second quoted field.
fn parse_quoted(line: &str) -> Result<(String, u64), String> {
    let invalid = || "expected \"seq\" \"count\"".to_string();
    let rest = line.strip_prefix('"').ok_or_else(invalid)?;
    let end = rest.find('"').filter(|e| *e > 0).ok_or_else(invalid)?;
    let seq = rest[..end].replace('\t', "");
    let rest = rest[end + 1..].trim_start();
    let rest = rest.strip_prefix('"').ok_or_else(invalid)?;
    let field = &rest[..rest.find('"').ok_or_else(invalid)?];
    let digits: String = field.chars().take_while(|c| c.is_ascii_digit()).collect();
    let count = digits.parse().map_err(|_| invalid())?;
    Ok((seq, count))
}

impl TableFormat {
    fn skips_comments(&self) -> bool {
        matches!(
            self,
            TableFormat::TokenTabCount | TableFormat::SplitBigram | TableFormat::CountToken
        )
    }

    /// Parse a line. `Ok(None)` for blank or comment lines.
    pub fn parse_line(&self, line: &str) -> Result<Option<(String, u64)>, String> {
        let trimmed = line.trim();
        if trimmed.is_empty() || (self.skips_comments() && trimmed.starts_with("//")) {
            return Ok(None);
        }

        let entry = match self {
            TableFormat::TokenCount => {
                let mut fields = trimmed.split_whitespace();
                match (fields.next(), fields.next()) {
                    (Some(token), Some(count)) => (token.to_string(), parse_count(count)?),
                    _ => return Err("expected `token count`".to_string()),
                }
            }
            TableFormat::TokenTabCount => {
                let fields: Vec<&str> = trimmed.split('\t').collect();
                match fields.as_slice() {
                    [gram, count] => (gram.to_string(), parse_count(count)?),
                    _ => return Err(format!("expected 2 fields, got {}", fields.len())),
                }
            }
            TableFormat::SplitBigram => {
                let fields: Vec<&str> = trimmed.split('\t').collect();
                if fields.len() < 3 {
                    return Err(format!("expected 3 fields, got {}", fields.len()));
                }
                let count = parse_count(fields[2])
                    .or_else(|e| first_digits(fields[2]).ok_or(e))?;
                (format!("{}{}", fields[0], fields[1]), count)
            }
            TableFormat::Quoted => parse_quoted(line)?,
            TableFormat::CountToken => match trimmed.split_once('\t') {
                Some((count, gram)) => (gram.to_string(), parse_count(count)?),
                None => return Err("expected `count\\ttoken`".to_string()),
            },
            TableFormat::CountBigram => {
                let fields: Vec<&str> = line.split('\t').collect();
                Self::count_bigram(&fields)?
            }
        };
        Ok(Some(entry))
    }

    fn count_bigram(fields: &[&str]) -> Result<(String, u64), String> {
        if fields.len() < 3 {
            return Err(format!("expected 3 fields, got {}", fields.len()));
        }
        Ok((
            format!("{}{}", fields[1], fields[2]),
            parse_count(fields[0])?,
        ))
    }
}

/// Conversion summary.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConvertReport {
    pub entries: usize,
    pub invalid: u64,
    pub duplicates: u64,
}

/// Insertion ordered frequency table.
#[derive(Debug, Default)]
pub struct Table {
    map: Map<String, Value>,
    sum_duplicates: bool,
    report: ConvertReport,
}

impl Table {
    pub fn new(sum_duplicates: bool) -> Self {
        Self {
            sum_duplicates,
            ..Default::default()
        }
    }

    /// Insert an entry. Duplicates replace the former count unless summing is enabled.
    pub fn insert(&mut self, key: String, count: u64) {
        match self.map.get_mut(&key) {
            Some(former) => {
                self.report.duplicates += 1;
                if self.sum_duplicates {
                    let old = former.as_u64().unwrap_or(0);
                    let sum = old.checked_add(count).unwrap_or_else(|| {
                        warn!("duplicate {:?}: {} + {} overflows, saturating", key, old, count);
                        u64::MAX
                    });
                    info!("duplicate {:?}: {} + {} = {}", key, old, count, sum);
                    *former = Value::from(sum);
                } else {
                    debug!("duplicate {:?}: {} replaced by {}", key, former, count);
                    *former = Value::from(count);
                }
            }
            None => {
                self.map.insert(key, Value::from(count));
            }
        }
    }

    fn invalid(&mut self, path: &Path, line_no: usize, reason: &str) {
        warn!("{:?}:{}: {}", path, line_no, reason);
        self.report.invalid += 1;
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.map.get(key).and_then(Value::as_u64)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.map.keys()
    }

    pub fn report(&self) -> ConvertReport {
        ConvertReport {
            entries: self.map.len(),
            ..self.report.clone()
        }
    }

    pub fn write(&self, path: &Path, indent: usize) -> Result<(), Error> {
        io::write_json(&self.map, path, indent)
    }
}

/// Read a frequency table file.
pub fn read_table(path: &Path, format: TableFormat, sum_duplicates: bool) -> Result<Table, Error> {
    let mut table = Table::new(sum_duplicates);

    if format == TableFormat::CountBigram {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .from_reader(BufReader::new(File::open(path)?));
        for (i, record) in reader.records().enumerate() {
            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    table.invalid(path, i + 1, &format!("{:?}", e));
                    continue;
                }
            };
            if record.iter().all(str::is_empty) {
                continue;
            }
            let fields: Vec<&str> = record.iter().collect();
            match TableFormat::count_bigram(&fields) {
                Ok((key, count)) => table.insert(key, count),
                Err(reason) => table.invalid(path, i + 1, &reason),
            }
        }
        return Ok(table);
    }

    for (i, line) in compression::lossy_lines(compression::open(path)?).enumerate() {
        match format.parse_line(&line?) {
            Ok(Some((key, count))) => table.insert(key, count),
            Ok(None) => (),
            Err(reason) => table.invalid(path, i + 1, &reason),
        }
    }
    Ok(table)
}

/// Convert `src` into the JSON object `dst`.
pub fn convert(
    src: &Path,
    dst: &Path,
    format: TableFormat,
    sum_duplicates: bool,
    indent: usize,
) -> Result<ConvertReport, Error> {
    let table = read_table(src, format, sum_duplicates)?;
    table.write(dst, indent)?;
    let report = table.report();
    info!(
        "{:?} -> {:?}: {} entries, {} invalid lines, {} duplicates",
        src, dst, report.entries, report.invalid, report.duplicates
    );
    Ok(report)
}

/// Destination of `src` inside `dst_dir`: same stem, `.json` extension.
pub fn json_path(src: &Path, dst_dir: &Path) -> PathBuf {
    let name = src
        .file_name()
        .map(|n| compression::strip_compression(&n.to_string_lossy()).to_string())
        .unwrap_or_default();
    let stem = Path::new(&name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or(name);
    dst_dir.join(format!("{}.json", stem))
}

/// Convert each file into `dst_dir`, in parallel. Failed files are logged and left out.
pub fn convert_all(
    files: &[PathBuf],
    dst_dir: &Path,
    format: TableFormat,
    sum_duplicates: bool,
    indent: usize,
) -> Vec<(PathBuf, ConvertReport)> {
    files
        .par_iter()
        .filter_map(|src| {
            let dst = json_path(src, dst_dir);
            match convert(src, &dst, format, sum_duplicates, indent) {
                Ok(report) => Some((dst, report)),
                Err(e) => {
                    error!("could not convert {:?}: {:?}", src, e);
                    None
                }
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(format: TableFormat, content: &str, sum: bool) -> Table {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.txt");
        std::fs::write(&path, content).unwrap();
        read_table(&path, format, sum).unwrap()
    }

    #[test]
    fn token_count() {
        let t = table(TableFormat::TokenCount, "あ 12 extra\n\nい\nう x\n", false);
        assert_eq!(t.get("あ"), Some(12));
        assert_eq!(t.len(), 1);
        assert_eq!(t.report().invalid, 2);
    }

    #[test]
    fn token_tab_count() {
        let t = table(
            TableFormat::TokenTabCount,
            "// ./word/over9/1gms/1gm-0000\nあいう\t40\nあ\tい\t3\nえ\tx\n",
            false,
        );
        assert_eq!(t.get("あいう"), Some(40));
        assert_eq!(t.len(), 1);
        assert_eq!(t.report().invalid, 2);
    }

    #[test]
    fn split_bigram() {
        let t = table(
            TableFormat::SplitBigram,
            "あ\tい\t15\nか\tき\t7回\nさ\tし\tなし\nた\tち\n",
            false,
        );
        assert_eq!(t.get("あい"), Some(15));
        assert_eq!(t.get("かき"), Some(7));
        assert_eq!(t.report().invalid, 2);
    }

    #[test]
    fn quoted() {
        assert_eq!(
            TableFormat::Quoted.parse_line("\"あ\tい\" \"123 回\"").unwrap(),
            Some(("あい".to_string(), 123))
        );
        assert!(TableFormat::Quoted.parse_line("\"\" \"1\"").is_err());
        assert!(TableFormat::Quoted.parse_line("あ 1").is_err());
    }

    #[test]
    fn count_token() {
        let t = table(TableFormat::CountToken, "// header\n12\tあ\tい\n3\tう\n", false);
        assert_eq!(t.get("あ\tい"), Some(12));
        assert_eq!(t.get("う"), Some(3));
    }

    #[test]
    fn count_bigram_csv() {
        let t = table(TableFormat::CountBigram, "10\tあ\tい\n\nx\tか\tき\n2\tさ\n", false);
        assert_eq!(t.get("あい"), Some(10));
        assert_eq!(t.len(), 1);
        assert_eq!(t.report().invalid, 2);
    }

    #[test]
    fn duplicates() {
        let content = "3\tあい\n4\tう\n5\tあい\n";
        let replaced = table(TableFormat::CountToken, content, false);
        assert_eq!(replaced.get("あい"), Some(5));
        assert_eq!(replaced.report().duplicates, 1);

        let summed = table(TableFormat::CountToken, content, true);
        assert_eq!(summed.get("あい"), Some(8));
        // first insertion order is kept
        assert_eq!(summed.keys().collect::<Vec<_>>(), vec!["あい", "う"]);
    }

    #[test]
    fn summed_duplicates_saturate() {
        let mut t = Table::new(true);
        t.insert("の".to_string(), u64::MAX - 1);
        t.insert("の".to_string(), 5);
        assert_eq!(t.get("の"), Some(u64::MAX));
        assert_eq!(t.report().duplicates, 1);
    }

    #[test]
    fn convert_to_json() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("tsukimiso1gram.txt");
        std::fs::write(&src, "の 100\nに 50\n").unwrap();

        let out = convert_all(&[src], dir.path(), TableFormat::TokenCount, false, 4);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, dir.path().join("tsukimiso1gram.json"));
        assert_eq!(
            std::fs::read_to_string(&out[0].0).unwrap(),
            "{\n    \"の\": 100,\n    \"に\": 50\n}"
        );
    }

    #[test]
    fn output_name() {
        assert_eq!(
            json_path(Path::new("/a/singeta2.csv.gz"), Path::new("/b")),
            PathBuf::from("/b/singeta2.json")
        );
    }
}
