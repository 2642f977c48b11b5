/*! Document text extraction from JSONL dumps.

HPLT and llm-jp distribute documents as one JSON object per line.
Only the textual content is kept, looked up in `text`, then `body`, then `content`.

Some dumps contain truncated or otherwise invalid lines. In that case the `"text": "..."`
literal is located by hand and unescaped on its own.
!*/
use log::warn;
use serde_json::Value;

const TEXT_FIELDS: [&str; 3] = ["text", "body", "content"];

/// Extract document text from a single JSONL line.
///
/// Returns `None` for blank lines and lines with no usable text.
pub fn extract_text(line: &str) -> Option<String> {
    let line = line.trim_end_matches(['\n', '\r']);
    if line.trim().is_empty() {
        return None;
    }

    match serde_json::from_str::<Value>(line) {
        Ok(Value::Object(obj)) => TEXT_FIELDS
            .iter()
            .filter_map(|field| obj.get(*field))
            .filter_map(Value::as_str)
            .find(|t| !t.is_empty())
            .map(String::from),
        Ok(_) => None,
        Err(e) => {
            let text = text_literal(line);
            if text.is_none() {
                warn!("skipping unparsable line ({})", e);
            }
            text
        }
    }
}

/// Locate `"text"\s*:\s*"..."` and unescape the string literal.
fn text_literal(line: &str) -> Option<String> {
    let mut search_from = 0;
    while let Some(pos) = line[search_from..].find("\"text\"") {
        let after_key = search_from + pos + "\"text\"".len();
        search_from = after_key;

        let rest = line[after_key..].trim_start();
        let rest = match rest.strip_prefix(':') {
            Some(r) => r.trim_start(),
            None => continue,
        };
        if !rest.starts_with('"') {
            continue;
        }

        // find the closing quote, honouring backslash escapes
        let mut escaped = false;
        let mut end = None;
        for (i, c) in rest.char_indices().skip(1) {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => {
                    end = Some(i);
                    break;
                }
                _ => (),
            }
        }

        let literal = &rest[..=end?];
        return serde_json::from_str::<String>(literal).ok();
    }
    None
}
