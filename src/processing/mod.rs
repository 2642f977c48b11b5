/*! Content processing

Offline operations on downloaded corpus files:
- [unpack]: decompression and splitting in parts,
- [purify]: text extraction and noise removal,
- [wiki]: wiki40b markup removal,
- [stats]: size statistics.
!*/
pub mod purify;
pub mod stats;
pub mod unpack;
pub mod wiki;

pub use purify::{InputFormat, Purifier};
pub use unpack::{unpack, Naming};
