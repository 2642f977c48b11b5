/*! Romaji prefix index

Frequency tables (`<category><n>gram.json`) are indexed by the romaji of the kana they contain,
to be looked up by keyboard layout tools while typing.

For a gram of `L` characters, every target kana `c` it contains adds the gram to
`<category>/<roma(c)>/<L>gm.json`, and every pair of adjacent target kana `c1 c2` adds it to
`<category>/<roma(c1)roma(c2)>/<L>gm.json`.
!*/
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use log::{debug, error, info, warn};
use serde_json::{Map, Value};

use crate::error::Error;
use crate::io::{list_files, write_json};

/// Small kana and sokuon, never used as prefixes.
pub const NOT_PREFIX: &str = "っゃゅょゎぁぃぅぇぉ";

lazy_static! {
    static ref BASIC_ROMAJI: HashMap<char, &'static str> = [
        ('あ', "a"), ('い', "i"), ('う', "u"), ('え', "e"), ('お', "o"),
        ('か', "ka"), ('き', "ki"), ('く', "ku"), ('け', "ke"), ('こ', "ko"),
        ('さ', "sa"), ('し', "shi"), ('す', "su"), ('せ', "se"), ('そ', "so"),
        ('た', "ta"), ('ち', "chi"), ('つ', "tsu"), ('て', "te"), ('と', "to"),
        ('な', "na"), ('に', "ni"), ('ぬ', "nu"), ('ね', "ne"), ('の', "no"),
        ('は', "ha"), ('ひ', "hi"), ('ふ', "fu"), ('へ', "he"), ('ほ', "ho"),
        ('ま', "ma"), ('み', "mi"), ('む', "mu"), ('め', "me"), ('も', "mo"),
        ('や', "ya"), ('ゆ', "yu"), ('よ', "yo"),
        ('ら', "ra"), ('り', "ri"), ('る', "ru"), ('れ', "re"), ('ろ', "ro"),
        ('わ', "wa"), ('を', "wo"),
        ('ん', "n"),
        ('が', "ga"), ('ぎ', "gi"), ('ぐ', "gu"), ('げ', "ge"), ('ご', "go"),
        ('ざ', "za"), ('じ', "ji"), ('ず', "zu"), ('ぜ', "ze"), ('ぞ', "zo"),
        ('だ', "da"), ('ぢ', "di"), ('づ', "zu"), ('で', "de"), ('ど', "do"),
        ('ば', "ba"), ('び', "bi"), ('ぶ', "bu"), ('べ', "be"), ('ぼ', "bo"),
        ('ぱ', "pa"), ('ぴ', "pi"), ('ぷ', "pu"), ('ぺ', "pe"), ('ぽ', "po"),
        ('ゐ', "wi"), ('ゑ', "we"),
    ]
    .into_iter()
    .collect();
}

/// Romaji of the target kana.
#[derive(Debug, Clone, Default)]
pub struct RomajiMap(HashMap<char, &'static str>);

impl RomajiMap {
    /// Map for the given kana. Kana without a basic romaji are warned about and left out.
    pub fn for_kana<I: IntoIterator<Item = char>>(kana: I) -> Self {
        let mut map = HashMap::new();
        for c in kana {
            if NOT_PREFIX.contains(c) || map.contains_key(&c) {
                continue;
            }
            match BASIC_ROMAJI.get(&c) {
                Some(roma) => {
                    map.insert(c, *roma);
                }
                None => warn!("no romaji for {:?}, not used as a prefix", c),
            }
        }
        Self(map)
    }

    /// Kana definition: every character of non-comment (`//`) lines is a target.
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, Error> {
        let mut kana = Vec::new();
        for line in reader.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            kana.extend(line.chars().filter(|c| !c.is_whitespace()));
        }
        Ok(Self::for_kana(kana))
    }

    pub fn from_file(path: &Path) -> Result<Self, Error> {
        Self::from_reader(BufReader::new(File::open(path)?))
    }

    pub fn roma(&self, c: char) -> Option<&'static str> {
        self.0.get(&c).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Category and n of a frequency table, from its file name.
///
/// `<name><n>gram.json` with a lowercase name, or the single-character `dvorakjp*` tables.
pub fn category(file_name: &str) -> Option<(String, usize)> {
    let stem = file_name.strip_suffix(".json")?;

    if let Some(head) = stem.strip_suffix("gram") {
        let name = head.trim_end_matches(|c: char| c.is_ascii_digit());
        let digits = &head[name.len()..];
        if !name.is_empty() && !digits.is_empty() && name.chars().all(|c| c.is_ascii_lowercase())
        {
            return digits.parse().ok().map(|n| (name.to_string(), n));
        }
    }

    let rest = stem.strip_prefix("dvorakjp")?;
    let kind = if rest.contains("en") {
        "dvorakjpen"
    } else if rest.contains("kana") {
        "dvorakjpkana"
    } else if rest.contains("roman") {
        "dvorakjproman"
    } else {
        return None;
    };
    Some((kind.to_string(), 1))
}

/// prefix -> gram length -> gram -> frequency
type Prefixes = BTreeMap<String, BTreeMap<usize, Map<String, Value>>>;

/// Prefix index of every category.
#[derive(Debug, Default)]
pub struct PrefixIndex {
    romaji: RomajiMap,
    categories: BTreeMap<String, Prefixes>,
}

impl PrefixIndex {
    pub fn new(romaji: RomajiMap) -> Self {
        Self {
            romaji,
            categories: BTreeMap::new(),
        }
    }

    /// Index a table. Later entries override former ones.
    pub fn add_table(&mut self, category: &str, table: &Map<String, Value>) {
        let prefixes = self.categories.entry(category.to_string()).or_default();
        for (text, freq) in table {
            let chars: Vec<char> = text.chars().collect();
            let len = chars.len();
            if len == 0 {
                continue;
            }
            let mut add = |prefix: String| {
                prefixes
                    .entry(prefix)
                    .or_default()
                    .entry(len)
                    .or_default()
                    .insert(text.clone(), freq.clone());
            };

            for c in &chars {
                if let Some(r) = self.romaji.roma(*c) {
                    add(r.to_string());
                }
            }
            for pair in chars.windows(2) {
                if let (Some(a), Some(b)) = (self.romaji.roma(pair[0]), self.romaji.roma(pair[1]))
                {
                    add(format!("{}{}", a, b));
                }
            }
        }
    }

    /// Index a table file. `Ok(false)` if the name gives no category.
    pub fn add_file(&mut self, path: &Path) -> Result<bool, Error> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let (category, n) = match category(&name) {
            Some(c) => c,
            None => {
                info!("skipping {:?}: unknown category", path);
                return Ok(false);
            }
        };
        info!("indexing {:?} (category {}, n={})", path, category, n);

        let value: Value = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        match value {
            Value::Object(table) => {
                self.add_table(&category, &table);
                Ok(true)
            }
            _ => Err(Error::Custom(format!("{:?} is not a JSON object", path))),
        }
    }

    /// Index every `*.json` of `dir`, in name order. Failing files are logged and skipped.
    pub fn add_dir(&mut self, dir: &Path) -> Result<usize, Error> {
        let mut indexed = 0;
        for path in list_files(dir, "*.json")? {
            match self.add_file(&path) {
                Ok(true) => indexed += 1,
                Ok(false) => (),
                Err(e) => error!("could not index {:?}: {:?}", path, e),
            }
        }
        Ok(indexed)
    }

    /// Entries for a category, prefix and gram length.
    pub fn get(&self, category: &str, prefix: &str, len: usize) -> Option<&Map<String, Value>> {
        self.categories.get(category)?.get(prefix)?.get(&len)
    }

    /// Write `out/<category>/<prefix>/<len>gm.json` files.
    pub fn write(&self, out: &Path) -> Result<Vec<PathBuf>, Error> {
        let mut written = Vec::new();
        for (category, prefixes) in &self.categories {
            info!("writing category {}", category);
            for (prefix, by_len) in prefixes {
                for (len, entries) in by_len {
                    let path = out
                        .join(category)
                        .join(prefix)
                        .join(format!("{}gm.json", len));
                    debug!("writing {:?}", path);
                    write_json(entries, &path, 2)?;
                    written.push(path);
                }
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kana_file() {
        let def = "// targets\nあいう\nっか ゃ\nゔ\n";
        let map = RomajiMap::from_reader(def.as_bytes()).unwrap();
        assert_eq!(map.len(), 4);
        assert_eq!(map.roma('か'), Some("ka"));
        assert_eq!(map.roma('っ'), None);
        assert_eq!(map.roma('ゔ'), None);
    }

    #[test]
    fn categories() {
        assert_eq!(category("tsukimiso3gram.json"), Some(("tsukimiso".to_string(), 3)));
        assert_eq!(category("wikikana12gram.json"), Some(("wikikana".to_string(), 12)));
        assert_eq!(category("dvorakjpen.json"), Some(("dvorakjpen".to_string(), 1)));
        assert_eq!(category("dvorakjproman.json"), Some(("dvorakjproman".to_string(), 1)));
        assert_eq!(category("Foo2gram.json"), None);
        assert_eq!(category("gram.json"), None);
        assert_eq!(category("singeta2gram.txt"), None);
        assert_eq!(category("count.json"), None);
    }

    #[test]
    fn indexing() {
        let romaji = RomajiMap::for_kana("かきっ".chars());
        let mut index = PrefixIndex::new(romaji);
        let table = json!({"かき": 10, "きっか": 3, "": 1});
        index.add_table("singeta", table.as_object().unwrap());

        let ka = index.get("singeta", "ka", 2).unwrap();
        assert_eq!(ka.get("かき"), Some(&json!(10)));
        assert_eq!(index.get("singeta", "kaki", 2).unwrap().len(), 1);
        assert!(index.get("singeta", "ka", 3).unwrap().contains_key("きっか"));
        // っ breaks the pair
        assert!(index.get("singeta", "kika", 3).is_none());
    }

    #[test]
    fn later_files_override() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tsukimiso1gram.json"), "{\"か\": 1}").unwrap();
        std::fs::write(dir.path().join("tsukimiso2gram.json"), "{\"か\": 7}").unwrap();
        std::fs::write(dir.path().join("other.json"), "{\"か\": 2}").unwrap();

        let mut index = PrefixIndex::new(RomajiMap::for_kana("か".chars()));
        assert_eq!(index.add_dir(dir.path()).unwrap(), 2);

        let out = dir.path().join("out");
        let written = index.write(&out).unwrap();
        assert_eq!(written, vec![out.join("tsukimiso/ka/1gm.json")]);
        assert_eq!(
            std::fs::read_to_string(&written[0]).unwrap(),
            "{\n  \"か\": 7\n}"
        );
    }
}
