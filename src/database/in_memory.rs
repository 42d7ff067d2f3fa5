//! InMemoryDatabase - HashMap-backed document database for testing and development.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use super::DocumentDatabase;
use crate::error::CollectionError;
use crate::record::Record;

/// In-memory document database.
///
/// Storage key is `"database:id"`, documents are kept bitcode-encoded.
/// Clone-friendly via Arc.
#[derive(Clone, Default)]
pub struct InMemoryDatabase {
    storage: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl InMemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    fn make_key(database: &str, id: &str) -> String {
        format!("{}:{}", database, id)
    }

    fn encode<R: Record>(record: &R) -> Result<Vec<u8>, CollectionError> {
        bitcode::serialize(record).map_err(|e| CollectionError::Serde(e.to_string()))
    }

    /// Read one document back.
    pub fn get<R: Record>(&self, database: &str, id: &str) -> Result<Option<R>, CollectionError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| CollectionError::Backend("lock poisoned".into()))?;

        match storage.get(&Self::make_key(database, id)) {
            Some(bytes) => bitcode::deserialize(bytes)
                .map(Some)
                .map_err(|e| CollectionError::Serde(e.to_string())),
            None => Ok(None),
        }
    }

    /// Number of documents stored under `database`.
    pub fn count(&self, database: &str) -> usize {
        let prefix = format!("{}:", database);
        self.storage
            .read()
            .map(|s| s.keys().filter(|k| k.starts_with(&prefix)).count())
            .unwrap_or(0)
    }
}

impl DocumentDatabase for InMemoryDatabase {
    fn insert_document<R: Record>(
        &self,
        database: &str,
        id: &str,
        record: &R,
    ) -> Result<(), CollectionError> {
        let key = Self::make_key(database, id);
        let bytes = Self::encode(record)?;

        let mut storage = self
            .storage
            .write()
            .map_err(|_| CollectionError::Backend("lock poisoned".into()))?;

        if storage.contains_key(&key) {
            return Err(CollectionError::DuplicateKey {
                database: database.to_string(),
                id: id.to_string(),
            });
        }

        storage.insert(key, bytes);
        Ok(())
    }

    fn update_document<R: Record>(
        &self,
        database: &str,
        id: &str,
        record: &R,
    ) -> Result<(), CollectionError> {
        let key = Self::make_key(database, id);
        let bytes = Self::encode(record)?;

        let mut storage = self
            .storage
            .write()
            .map_err(|_| CollectionError::Backend("lock poisoned".into()))?;

        match storage.get_mut(&key) {
            Some(stored) => {
                *stored = bytes;
                Ok(())
            }
            None => Err(CollectionError::NotFound {
                database: database.to_string(),
                id: id.to_string(),
            }),
        }
    }

    fn all_documents<R: Record>(&self, database: &str) -> Result<Vec<R>, CollectionError> {
        let storage = self
            .storage
            .read()
            .map_err(|_| CollectionError::Backend("lock poisoned".into()))?;

        let prefix = format!("{}:", database);
        let mut results = Vec::new();

        for (key, bytes) in storage.iter() {
            if key.starts_with(&prefix) {
                let record: R = bitcode::deserialize(bytes)
                    .map_err(|e| CollectionError::Serde(e.to_string()))?;
                results.push(record);
            }
        }

        Ok(results)
    }
}
