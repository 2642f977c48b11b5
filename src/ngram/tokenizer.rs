//! Tokenization of documents before n-gram counting.
use std::str::FromStr;

use unicode_script::{Script, UnicodeScript};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tokenizer {
    /// extended grapheme clusters, n-grams are concatenated.
    /// Whitespace is dropped and n-grams stop at it.
    Chars,
    /// unicode word boundaries, n-grams are space separated
    Words,
    /// already tokenized text (e.g. `mecab -Owakati` output), n-grams are space separated
    Whitespace,
}

impl Tokenizer {
    pub fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        match self {
            Tokenizer::Chars => text
                .graphemes(true)
                .filter(|g| !g.chars().all(char::is_whitespace))
                .collect(),
            Tokenizer::Words => text.unicode_words().collect(),
            Tokenizer::Whitespace => text.split_whitespace().collect(),
        }
    }

    /// String put between tokens of an n-gram.
    pub fn joiner(&self) -> &'static str {
        match self {
            Tokenizer::Chars => "",
            Tokenizer::Words | Tokenizer::Whitespace => " ",
        }
    }
}

impl FromStr for Tokenizer {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "chars" | "char" => Ok(Tokenizer::Chars),
            "words" | "word" => Ok(Tokenizer::Words),
            "whitespace" | "wakati" => Ok(Tokenizer::Whitespace),
            other => Err(Error::Custom(format!("unknown tokenizer {}", other))),
        }
    }
}

/// Japanese characters, Japanese punctuation and fullwidth forms included.
pub fn is_japanese_char(c: char) -> bool {
    matches!(
        c,
        '\u{3000}'..='\u{30FF}'
            | '\u{4E00}'..='\u{9FFF}'
            | '\u{FF00}'..='\u{FFEF}'
            | '\u{2010}'..='\u{2015}'
    ) || matches!(c.script(), Script::Hiragana | Script::Katakana | Script::Han)
}

/// A token is Japanese if it contains at least one Japanese character.
pub fn is_japanese_token(token: &str) -> bool {
    token.chars().any(is_japanese_char)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chars() {
        let t = Tokenizer::Chars;
        assert_eq!(t.tokenize("あい う"), vec!["あ", "い", "う"]);
        // combining dakuten stays with its base
        assert_eq!(t.tokenize("か\u{3099}"), vec!["か\u{3099}"]);
    }

    #[test]
    fn whitespace() {
        let t = Tokenizer::Whitespace;
        assert_eq!(t.tokenize("今日 は 晴れ\n"), vec!["今日", "は", "晴れ"]);
        assert_eq!(t.joiner(), " ");
    }

    #[test]
    fn words() {
        let t = Tokenizer::Words;
        assert_eq!(t.tokenize("hello, world"), vec!["hello", "world"]);
    }

    #[test]
    fn japanese() {
        assert!(is_japanese_token("ひらがな"));
        assert!(is_japanese_token("カタカナ"));
        assert!(is_japanese_token("漢字"));
        assert!(is_japanese_token("。"));
        assert!(is_japanese_token("ＡＢＣ"));
        assert!(is_japanese_token("abcー"));
        assert!(!is_japanese_token("abc"));
        assert!(!is_japanese_token("123."));
    }

    #[test]
    fn parse() {
        assert_eq!("chars".parse::<Tokenizer>().unwrap(), Tokenizer::Chars);
        assert_eq!("wakati".parse::<Tokenizer>().unwrap(), Tokenizer::Whitespace);
        assert!("mecab".parse::<Tokenizer>().is_err());
    }
}
