//! File persistence for cached records.
//!
//! One JSON file per record type, optionally split into buckets:
//! `models.{TAG}.json` or `models.{TAG}.bucket-{bucket}.json`. Files are
//! written to a temporary sibling first and renamed over the target.

mod file;

pub use file::FileStorage;
