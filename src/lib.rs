/*!
# gramdata

Acquisition and preprocessing of Japanese n-gram corpora.

Each stage of the pipeline is usable on its own, either from the `gramdata` binary or as a library:
- [download]: file lists, single large files and shard sampling,
- [processing]: decompression, noise removal, wiki markup removal, statistics,
- [ngram]: n-gram counting,
- [table]: conversion of frequency tables to JSON,
- [prefix]: romaji prefix index of frequency tables,
- [publish]: batched git commits of generated files.
!*/
pub mod download;
pub mod error;
pub mod filtering;
pub mod io;
pub mod ngram;
pub mod prefix;
pub mod processing;
pub mod publish;
pub mod table;
