/*! Decompression and splitting

Compressed dumps are decompressed and split in parts of roughly `part_size` bytes,
always on line boundaries.

Naming of parts:
- NWC2010 archives (`nwc2010-ngrams/<kind>/<over>/<N>gms/<N>gm-0000.xz`) go to
  `<kind><over><N>gms_0000.txt`. All the archives of a directory share the same numbering.
- other files keep their name: `10_1.jsonl.zst` goes to `10_1_0000.jsonl`.
!*/
use std::collections::BTreeMap;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{error, info, warn};
use rayon::prelude::*;

use crate::error::Error;
use crate::io::compression::{self, strip_compression, Compression};
use crate::io::RotatingWriter;

const NWC_ROOT: &str = "nwc2010-ngrams";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Naming {
    /// NWC2010 naming if the path contains a `nwc2010-ngrams` component
    Auto,
    Nwc2010,
    Stem,
}

impl FromStr for Naming {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(Naming::Auto),
            "nwc2010" | "nwc" => Ok(Naming::Nwc2010),
            "stem" => Ok(Naming::Stem),
            other => Err(Error::Custom(format!("unknown naming {}", other))),
        }
    }
}

/// Part stem and extension of an input.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PartName {
    pub stem: String,
    pub ext: String,
}

impl PartName {
    pub fn of(path: &Path, naming: Naming) -> Self {
        let is_nwc = path.components().any(|c| c.as_os_str() == NWC_ROOT);
        match naming {
            Naming::Nwc2010 => Self::nwc2010(path),
            Naming::Auto if is_nwc => Self::nwc2010(path),
            _ => Self::stem(path),
        }
    }

    fn nwc2010(path: &Path) -> Self {
        let parts: Vec<String> = path
            .components()
            .map(|c| c.as_os_str().to_string_lossy().replace(' ', ""))
            .collect();

        let rel: &[String] = match parts.iter().position(|p| p == NWC_ROOT) {
            Some(idx) => &parts[idx + 1..],
            None => &parts[parts.len().saturating_sub(4)..],
        };
        let get = |i: usize| rel.get(i).map(String::as_str).unwrap_or("");
        let kind = if rel.is_empty() { "unknown" } else { get(0) };

        Self {
            stem: format!("{}{}{}_", kind, get(1), get(2)),
            ext: ".txt".to_string(),
        }
    }

    fn stem(path: &Path) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = strip_compression(&name);
        let (root, ext) = match name.rfind('.') {
            Some(dot) if dot > 0 => (&name[..dot], &name[dot..]),
            _ => (name, ""),
        };
        Self {
            stem: format!("{}_", root),
            ext: ext.to_string(),
        }
    }
}

/// Compressed files under `src` (or `src` itself if it is a file).
pub fn find_inputs(src: &Path) -> Result<Vec<PathBuf>, Error> {
    if src.is_file() {
        return Ok(vec![src.to_path_buf()]);
    }
    let files = crate::io::list_files(src, "**/*")?
        .into_iter()
        .filter(|p| Compression::from_path(p) != Compression::None)
        .collect();
    Ok(files)
}

/// Decompress `inputs` (sharing `writer`) line by line.
fn unpack_group(inputs: &[PathBuf], writer: &mut RotatingWriter) -> Result<(), Error> {
    let mut line = Vec::new();
    for input in inputs {
        info!("unpacking {:?}", input);
        let mut reader = compression::open(input)?;
        loop {
            line.clear();
            if reader.read_until(b'\n', &mut line)? == 0 {
                break;
            }
            writer.write_all(&line)?;
        }
    }
    Ok(())
}

/// Unpack every input into `dst`, in parts of `part_size` bytes.
///
/// Inputs that end up with the same part name are processed in order and continue numbering.
/// Unless `force` is set, groups whose first part already exists are skipped.
/// Returns the created parts.
pub fn unpack(
    inputs: &[PathBuf],
    dst: &Path,
    part_size: u64,
    naming: Naming,
    force: bool,
) -> Result<Vec<PathBuf>, Error> {
    std::fs::create_dir_all(dst)?;

    let mut groups: BTreeMap<PartName, Vec<PathBuf>> = BTreeMap::new();
    for input in inputs {
        groups
            .entry(PartName::of(input, naming))
            .or_default()
            .push(input.clone());
    }

    let results: Vec<Result<Vec<PathBuf>, Error>> = groups
        .into_par_iter()
        .map(|(name, mut files)| {
            files.sort();
            let mut writer = RotatingWriter::new(dst, &name.stem, &name.ext, part_size);
            let first = writer.part_path(0);
            if first.exists() && !force {
                warn!("{:?} exists, skipping (use --force to overwrite)", first);
                return Ok(Vec::new());
            }
            unpack_group(&files, &mut writer)?;
            let parts = writer.finish()?;
            info!("{}: {} inputs -> {} parts", name.stem, files.len(), parts.len());
            Ok(parts)
        })
        .collect();

    let mut parts = Vec::new();
    for result in results {
        match result {
            Ok(mut p) => parts.append(&mut p),
            Err(e) => error!("unpacking failed: {:?}", e),
        }
    }
    parts.sort();
    Ok(parts)
}
