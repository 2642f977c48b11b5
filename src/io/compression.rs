//! Transparent decompression of corpus files.
//!
//! NWC2010 is distributed as `.xz`, HPLT as `.zst` and llm-jp as `.gz`.
//! Readers returned here yield the decompressed bytes.
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use log::debug;
use xz2::read::XzDecoder;

use crate::error::Error;

const BUF_SIZE: usize = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Xz,
    Zstd,
}

impl Compression {
    /// Detect the compression from the file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("gz") => Compression::Gzip,
            Some("xz") => Compression::Xz,
            Some("zst") => Compression::Zstd,
            _ => Compression::None,
        }
    }

    /// Extension (with leading dot) of the compression, empty if none.
    pub fn suffix(&self) -> &'static str {
        match self {
            Compression::None => "",
            Compression::Gzip => ".gz",
            Compression::Xz => ".xz",
            Compression::Zstd => ".zst",
        }
    }
}

/// Remove the compression suffix of a file name.
///
/// `10_1.jsonl.zst` becomes `10_1.jsonl`, `2gm-0001.txt` is left untouched.
pub fn strip_compression(name: &str) -> &str {
    let compression = Compression::from_path(Path::new(name));
    name.strip_suffix(compression.suffix()).unwrap_or(name)
}

/// Open `path` as a buffered reader, decompressing if needed.
pub fn open(path: &Path) -> Result<Box<dyn BufRead + Send>, Error> {
    let f = File::open(path)?;
    let compression = Compression::from_path(path);
    debug!("opening {:?} ({:?})", path, compression);
    let reader: Box<dyn BufRead + Send> = match compression {
        Compression::None => Box::new(BufReader::with_capacity(BUF_SIZE, f)),
        Compression::Gzip => Box::new(BufReader::with_capacity(
            BUF_SIZE,
            MultiGzDecoder::new(BufReader::new(f)),
        )),
        Compression::Xz => Box::new(BufReader::with_capacity(
            BUF_SIZE,
            XzDecoder::new_multi_decoder(BufReader::new(f)),
        )),
        Compression::Zstd => Box::new(BufReader::with_capacity(
            BUF_SIZE,
            zstd::stream::read::Decoder::new(f)?,
        )),
    };
    Ok(reader)
}

/// Iterate over the lines of a (possibly compressed) file.
///
/// Invalid UTF-8 is replaced rather than reported, corpora are often slightly broken.
/// Returned lines do not contain the line terminator.
pub fn lossy_lines(reader: Box<dyn BufRead + Send>) -> LossyLines {
    LossyLines {
        reader,
        buf: Vec::new(),
    }
}

pub struct LossyLines {
    reader: Box<dyn BufRead + Send>,
    buf: Vec<u8>,
}

impl Iterator for LossyLines {
    type Item = std::io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buf.clear();
        match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(0) => None,
            Ok(_) => {
                if self.buf.last() == Some(&b'\n') {
                    self.buf.pop();
                    if self.buf.last() == Some(&b'\r') {
                        self.buf.pop();
                    }
                }
                Some(Ok(String::from_utf8_lossy(&self.buf).into_owned()))
            }
            Err(e) => Some(Err(e)),
        }
    }
}
