use std::collections::{BTreeMap, HashSet};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::info;

use crate::error::StoreError;
use crate::record::Record;

/// Directory-backed record files.
#[derive(Debug)]
pub struct FileStorage {
    dir: PathBuf,
    temp_seq: AtomicU64,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileStorage {
            dir: dir.into(),
            temp_seq: AtomicU64::new(1),
        }
    }

    /// File holding the records of `type_tag` in `bucket`.
    pub fn file_path(&self, type_tag: &str, bucket: &str) -> PathBuf {
        if bucket.is_empty() {
            self.dir.join(format!("models.{}.json", type_tag))
        } else {
            self.dir
                .join(format!("models.{}.bucket-{}.json", type_tag, bucket))
        }
    }

    fn belongs_to(type_tag: &str, file_name: &str) -> bool {
        let exact = format!("models.{}.json", type_tag);
        let bucket_prefix = format!("models.{}.bucket-", type_tag);
        file_name == exact || (file_name.starts_with(&bucket_prefix) && file_name.ends_with(".json"))
    }

    /// Write all `records` of one type, one file per bucket, and remove the
    /// files of buckets that no longer hold any record. Returns the number of
    /// files written.
    pub fn save<R: Record>(&self, records: &[R]) -> Result<usize, StoreError> {
        let mut buckets: BTreeMap<String, Vec<&R>> = BTreeMap::new();
        for record in records {
            buckets.entry(record.storage_bucket()).or_default().push(record);
        }
        for bucket in buckets.keys() {
            check_bucket(R::TYPE_TAG, bucket)?;
        }

        if !buckets.is_empty() {
            fs::create_dir_all(&self.dir).map_err(|e| StoreError::storage(&self.dir, e))?;
        }

        let mut written = HashSet::new();
        for (bucket, group) in &buckets {
            let path = self.file_path(R::TYPE_TAG, bucket);
            let temp = self.temp_path(&path);

            info!(path = %path.display(), count = group.len(), "writing record file");

            let file = File::create(&temp).map_err(|e| StoreError::storage(&temp, e))?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, group)
                .map_err(|e| StoreError::Serde(e.to_string()))?;
            writer.flush().map_err(|e| StoreError::storage(&temp, e))?;
            drop(writer);

            fs::rename(&temp, &path).map_err(|e| StoreError::storage(&path, e))?;
            written.insert(path);
        }

        for stale in self.files_of(R::TYPE_TAG)? {
            if !written.contains(&stale) {
                info!(path = %stale.display(), "removing stale record file");
                fs::remove_file(&stale).map_err(|e| StoreError::storage(&stale, e))?;
            }
        }

        Ok(buckets.len())
    }

    /// Read every file of one type. A missing directory yields no records.
    pub fn load<R: Record>(&self) -> Result<Vec<R>, StoreError> {
        let mut records = Vec::new();
        for path in self.files_of(R::TYPE_TAG)? {
            info!(path = %path.display(), "reading record file");
            let file = File::open(&path).map_err(|e| StoreError::storage(&path, e))?;
            let mut batch: Vec<R> = serde_json::from_reader(BufReader::new(file))
                .map_err(|e| StoreError::Serde(format!("{}: {}", path.display(), e)))?;
            records.append(&mut batch);
        }

        Ok(records)
    }

    /// Existing files of `type_tag`, sorted by path.
    fn files_of(&self, type_tag: &str) -> Result<Vec<PathBuf>, StoreError> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }

        let entries = fs::read_dir(&self.dir).map_err(|e| StoreError::storage(&self.dir, e))?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::storage(&self.dir, e))?;
            let name = entry.file_name();
            if Self::belongs_to(type_tag, &name.to_string_lossy()) {
                paths.push(entry.path());
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn temp_path(&self, path: &Path) -> PathBuf {
        let seq = self.temp_seq.fetch_add(1, Ordering::Relaxed);
        let mut name = path.as_os_str().to_owned();
        name.push(format!(".tmp.{}.{:03}", std::process::id(), seq % 1000));
        PathBuf::from(name)
    }
}

/// Bucket names become part of a file name and must stay inside the directory.
fn check_bucket(type_tag: &str, bucket: &str) -> Result<(), StoreError> {
    if bucket.contains(['/', '\\']) || bucket.contains("..") {
        return Err(StoreError::Storage {
            path: PathBuf::from(bucket),
            message: format!("invalid storage bucket for type {}", type_tag),
        });
    }
    Ok(())
}
