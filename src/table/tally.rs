//! Entry counts of JSON frequency tables.
use std::fmt;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::{error, info, warn};
use serde_json::Value;

use crate::error::Error;
use crate::io::list_files;

/// Tally of a file. Integer sums are kept exact.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tally {
    Int(i64),
    Float(f64),
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tally::Int(i) => write!(f, "{}", i),
            Tally::Float(x) => write!(f, "{}", x),
        }
    }
}

/// Sum of the numbers of an object, or length of an array.
///
/// `None` for other values and for objects without any number.
pub fn tally_value(value: &Value) -> Option<Tally> {
    match value {
        Value::Object(map) => {
            let numbers: Vec<&serde_json::Number> = map
                .values()
                .filter_map(|v| match v {
                    Value::Number(n) => Some(n),
                    _ => None,
                })
                .collect();
            if numbers.is_empty() {
                return None;
            }
            let total = numbers
                .iter()
                .try_fold(0i64, |acc, n| n.as_i64().and_then(|i| acc.checked_add(i)));
            match total {
                Some(total) => Some(Tally::Int(total)),
                None => Some(Tally::Float(
                    numbers.iter().filter_map(|n| n.as_f64()).sum(),
                )),
            }
        }
        Value::Array(items) => Some(Tally::Int(items.len() as i64)),
        _ => None,
    }
}

pub fn tally_file(path: &Path) -> Result<Option<Tally>, Error> {
    let value: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
    Ok(tally_value(&value))
}

/// Tally every `*.json` of `dir`, by file name.
pub fn tally_dir(dir: &Path) -> Result<Vec<(String, Tally)>, Error> {
    let mut tallies = Vec::new();
    for path in list_files(dir, "*.json")? {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match tally_file(&path) {
            Ok(Some(t)) => tallies.push((name, t)),
            Ok(None) => warn!("{:?}: nothing to count", path),
            Err(e) => error!("could not read {:?}: {:?}", path, e),
        }
    }
    Ok(tallies)
}

/// Write `<file> <count>` lines.
pub fn write_tallies(tallies: &[(String, Tally)], dst: &Path) -> Result<(), Error> {
    let mut out = BufWriter::new(File::create(dst)?);
    for (name, tally) in tallies {
        writeln!(out, "{} {}", name, tally)?;
    }
    out.flush()?;
    info!("wrote {} counts to {:?}", tallies.len(), dst);
    Ok(())
}

/// Tally `dir` into `dst`, `<dir>/count.txt` by default.
pub fn tally(dir: &Path, dst: Option<PathBuf>) -> Result<Vec<(String, Tally)>, Error> {
    let tallies = tally_dir(dir)?;
    let dst = dst.unwrap_or_else(|| dir.join("count.txt"));
    write_tallies(&tallies, &dst)?;
    Ok(tallies)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn values() {
        assert_eq!(tally_value(&json!({"a": 3, "b": 4, "c": "x"})), Some(Tally::Int(7)));
        assert_eq!(tally_value(&json!({"a": 1.5, "b": 1})), Some(Tally::Float(2.5)));
        assert_eq!(tally_value(&json!([1, "a", {}])), Some(Tally::Int(3)));
        assert_eq!(tally_value(&json!({"a": "x"})), None);
        // too large for an integer sum
        assert_eq!(
            tally_value(&json!({"a": i64::MAX, "b": i64::MAX})),
            Some(Tally::Float(2.0 * i64::MAX as f64))
        );
        assert_eq!(tally_value(&json!(12)), None);
    }

    #[test]
    fn display() {
        assert_eq!(Tally::Int(12).to_string(), "12");
        assert_eq!(Tally::Float(2.5).to_string(), "2.5");
    }

    #[test]
    fn directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("b.json"), "[1, 2]").unwrap();
        std::fs::write(dir.path().join("a.json"), "{\"あ\": 10, \"い\": 5}").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let tallies = tally(dir.path(), None).unwrap();
        assert_eq!(tallies.len(), 2);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("count.txt")).unwrap(),
            "a.json 15\nb.json 2\n"
        );
    }
}
