use std::collections::HashMap;
use std::io::Write;
use std::path::Path;

use gramdata::io::{self, RotatingWriter};
use rayon::iter::{IntoParallelIterator, ParallelIterator};

fn japanese_lines(nb: usize) -> Vec<String> {
    (0..nb).map(|x| format!("日本語の文 {}", x + 1)).collect()
}

fn english_lines(nb: usize) -> Vec<String> {
    (0..nb).map(|x| format!("english sentence number {}", x + 1)).collect()
}

fn read_parts(dst: &Path, stem: &str) -> Vec<String> {
    let mut lines = Vec::new();
    for part in io::list_files(dst, &format!("{}*.txt", stem)).unwrap() {
        let content = std::fs::read_to_string(&part).unwrap();
        lines.extend(content.lines().map(String::from));
    }
    lines
}

#[test]
fn parallel_writers() {
    let dst = tempfile::tempdir().unwrap();
    let mut inputs: HashMap<&str, Vec<String>> = HashMap::new();
    inputs.insert("ja_", japanese_lines(200));
    inputs.insert("en_", english_lines(150));

    let parts: Vec<(usize, Vec<String>)> = inputs
        .clone()
        .into_par_iter()
        .map(|(stem, lines)| {
            let mut w = RotatingWriter::new(dst.path(), stem, ".txt", 512);
            for line in &lines {
                w.write_line(line).unwrap();
            }
            assert_eq!(w.records(), lines.len() as u64);
            let created = w.finish().unwrap();
            (created.len(), lines)
        })
        .collect();

    for (nb_parts, _) in &parts {
        assert!(*nb_parts > 1);
    }

    for (stem, lines) in inputs {
        assert_eq!(read_parts(dst.path(), stem), lines);
    }
}

#[test]
fn parts_stay_under_limit() {
    let dst = tempfile::tempdir().unwrap();
    let limit = 100;
    let mut w = RotatingWriter::new(dst.path(), "purif", ".txt", limit);
    for line in japanese_lines(50) {
        w.write_all(format!("{}\n", line).as_bytes()).unwrap();
    }
    let created = w.finish().unwrap();

    for part in &created {
        let size = std::fs::metadata(part).unwrap().len();
        assert!(size <= limit, "{:?} is {} bytes", part, size);
        assert!(std::fs::read_to_string(part).unwrap().ends_with('\n'));
    }
    assert_eq!(read_parts(dst.path(), "purif"), japanese_lines(50));
}
