//! Rotating part writers.
use log::{debug, info};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Size of a MiB, the unit used for part sizes on the command line.
pub const MIB: u64 = 1024 * 1024;

/// Rotating part writer.
///
/// Implements [std::io::Write] and holds a size (bytes) limit.
/// Each call to `write` is considered a record (usually a line) and is never split across parts.
/// Parts are named `{stem}{index:04}{ext}` and are only created when something is written.
///
/// Note: if a record is larger than the whole limit, then it is an expected behaviour that
/// the size limit is ignored and a part is created for it alone.
pub struct RotatingWriter {
    dst: PathBuf,
    stem: String,
    ext: String,
    file: Option<BufWriter<File>>,
    size: u64,
    size_limit: u64,
    next_index: usize,
    parts: Vec<PathBuf>,
    records: u64,
}

impl RotatingWriter {
    /// Create a new [RotatingWriter].
    /// Note that nothing is created/written unless a write is performed.
    /// size_limit is in bytes.
    pub fn new(dst: &Path, stem: &str, ext: &str, size_limit: u64) -> Self {
        Self {
            dst: dst.to_path_buf(),
            stem: stem.to_string(),
            ext: ext.to_string(),
            file: None,
            size: 0,
            size_limit,
            next_index: 0,
            parts: Vec::new(),
            records: 0,
        }
    }

    /// Start numbering at `index` rather than 0.
    pub fn starting_at(mut self, index: usize) -> Self {
        self.next_index = index;
        self
    }

    /// Path of the part with the given index.
    pub fn part_path(&self, index: usize) -> PathBuf {
        self.dst
            .join(format!("{}{:04}{}", self.stem, index, self.ext))
    }

    /// Rotate file.
    fn create_next_file(&mut self) -> std::io::Result<()> {
        if let Some(mut f) = self.file.take() {
            f.flush()?;
        }

        std::fs::create_dir_all(&self.dst)?;
        let path = self.part_path(self.next_index);
        info!("creating {:?}", path);
        let file = File::create(&path)?;

        self.file = Some(BufWriter::new(file));
        self.parts.push(path);
        self.next_index += 1;
        self.size = 0;
        Ok(())
    }

    /// Write `line`, appending a newline.
    pub fn write_line(&mut self, line: &str) -> std::io::Result<()> {
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');
        self.write_all(&buf)
    }

    /// Parts created so far, in creation order.
    pub fn parts(&self) -> &[PathBuf] {
        &self.parts
    }

    /// Number of records written.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Index the next part would get.
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Flush and close the current part, returning every created part.
    pub fn finish(mut self) -> std::io::Result<Vec<PathBuf>> {
        if let Some(mut f) = self.file.take() {
            f.flush()?;
        }
        debug!("closed {} parts for {}", self.parts.len(), self.stem);
        Ok(self.parts)
    }
}

impl Write for RotatingWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        // if there's no file open, create one
        if self.file.is_none() {
            self.create_next_file()?;
        }

        // if there's no space left on the current file, create another one
        // ignore if the file is already empty (if we're already on a new file)
        let len = buf.len() as u64;
        if self.size + len > self.size_limit && self.size > 0 {
            self.create_next_file()?;
        }

        match &mut self.file {
            Some(f) => {
                f.write_all(buf)?;
                self.size += len;
                self.records += 1;
                Ok(buf.len())
            }
            None => Err(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("no open part for {}", self.stem),
            )),
        }
    }

    fn flush(&mut self) -> std::io::Result<()> {
        match &mut self.file {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[test]
    fn one_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut tw = RotatingWriter::new(dir.path(), "purif", ".txt", 11);
        tw.write_line("helloworld").unwrap();
        let parts = tw.finish().unwrap();

        assert_eq!(parts, vec![dir.path().join("purif0000.txt")]);
        assert_eq!(read(&parts[0]), "helloworld\n");
    }

    #[test]
    fn nothing_written_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let tw = RotatingWriter::new(dir.path(), "purif", ".txt", 10);
        assert!(tw.finish().unwrap().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn multiple_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut tw = RotatingWriter::new(dir.path(), "x_", ".txt", 11);
        for _ in 0..10 {
            tw.write_line("helloworld").unwrap();
        }
        let parts = tw.finish().unwrap();
        assert_eq!(parts.len(), 10);
        for (i, p) in parts.iter().enumerate() {
            assert_eq!(p, &dir.path().join(format!("x_{:04}.txt", i)));
            assert_eq!(read(p), "helloworld\n");
        }
    }

    #[test]
    fn multiple_files_different_sizes() {
        let dir = tempfile::tempdir().unwrap();
        let mut tw = RotatingWriter::new(dir.path(), "p", "", 10);
        let records = [
            "hello world\n", // 12 bytes, overflows but alone
            "tinytiny\n",    // 9 bytes
            "a\n",           // 2 bytes, would overflow part 2
            "bb\n",          // fits after "a"
            "document7\n",   // 10 bytes, new part
            "0\n",
        ];
        for r in records.iter() {
            tw.write_all(r.as_bytes()).unwrap();
        }
        assert_eq!(tw.records(), 6);
        let parts = tw.finish().unwrap();

        let expected = [
            "hello world\n",
            "tinytiny\n",
            "a\nbb\n",
            "document7\n",
            "0\n",
        ];
        assert_eq!(parts.len(), expected.len());
        for (p, e) in parts.iter().zip(expected.iter()) {
            assert_eq!(&read(p), e);
        }
    }

    #[test]
    fn starting_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut tw = RotatingWriter::new(dir.path(), "wordover92gms_", ".txt", MIB).starting_at(3);
        tw.write_line("a").unwrap();
        assert_eq!(tw.next_index(), 4);
        let parts = tw.finish().unwrap();
        assert_eq!(parts, vec![dir.path().join("wordover92gms_0003.txt")]);
    }
}
