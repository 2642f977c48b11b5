/*! N-gram frequency counting

Documents are tokenized ([Tokenizer]), optionally restricted to Japanese tokens, and every
contiguous n-gram up to `max_n` is counted.

Two modes are available:
- exact: files are counted in parallel and merged, then exported with a minimum count ([export]),
- spill: memory-bounded, partial counts are flushed to disk as they grow ([SpillCounter]).
!*/
mod counter;
mod export;
mod tokenizer;

pub use counter::{NgramCounter, NgramCounts};
pub use export::{export, sorted_entries, SpillCounter};
pub use tokenizer::{is_japanese_char, is_japanese_token, Tokenizer};
