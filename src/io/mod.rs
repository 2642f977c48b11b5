/*!
# IO utilities

Reading of (compressed) corpus files and writing of size-bounded parts.
!*/
pub mod compression;
pub mod jsonl;
pub mod rotating;

pub use compression::{lossy_lines, open, Compression};
pub use rotating::{RotatingWriter, MIB};

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use crate::error::Error;

/// List files of `dir` matching the glob `pattern`, sorted.
///
/// Directories are ignored, errors of individual entries are returned.
pub fn list_files(dir: &Path, pattern: &str) -> Result<Vec<PathBuf>, Error> {
    let full = dir.join(pattern);
    let full = full
        .to_str()
        .ok_or_else(|| Error::Custom(format!("{:?} is not valid unicode", full)))?;
    let mut files = Vec::new();
    for entry in glob::glob(full)? {
        let entry = entry?;
        if entry.is_file() {
            files.push(entry);
        }
    }
    files.sort();
    Ok(files)
}

/// Write `value` as pretty JSON, indented by `indent` spaces. Non-ASCII is kept as is.
pub fn write_json<T: Serialize>(value: &T, path: &Path, indent: usize) -> Result<(), Error> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let indent = " ".repeat(indent);
    let mut out = BufWriter::new(File::create(path)?);
    let mut ser = serde_json::Serializer::with_formatter(
        &mut out,
        PrettyFormatter::with_indent(indent.as_bytes()),
    );
    value.serialize(&mut ser)?;
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub/out.json");
        let value = serde_json::json!({"ん": 3, "あ": 1});
        write_json(&value, &path, 2).unwrap();
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "{\n  \"ん\": 3,\n  \"あ\": 1\n}"
        );
    }

    #[test]
    fn list_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.jsonl", "a.jsonl", "c.txt"] {
            std::fs::write(dir.path().join(name), "").unwrap();
        }
        std::fs::create_dir(dir.path().join("d.jsonl")).unwrap();

        let files = list_files(dir.path(), "*.jsonl").unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a.jsonl", "b.jsonl"]);
    }
}
