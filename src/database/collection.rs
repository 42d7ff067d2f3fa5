//! Collection - Typed accessor for one database of a document store.

use std::marker::PhantomData;

use super::DocumentDatabase;
use crate::error::CollectionError;
use crate::record::Record;

/// Typed handle on the documents of one record type.
pub struct Collection<'a, D, R> {
    db: &'a D,
    database: String,
    _marker: PhantomData<fn() -> R>,
}

impl<'a, D: DocumentDatabase, R: Record> Collection<'a, D, R> {
    pub fn new(db: &'a D, database: impl Into<String>) -> Self {
        Self {
            db,
            database: database.into(),
            _marker: PhantomData,
        }
    }

    /// Insert a new document. Fails if the id already exists.
    pub fn insert(&self, id: &str, record: &R) -> Result<(), CollectionError> {
        self.db.insert_document(&self.database, id, record)
    }

    /// Replace an existing document.
    pub fn update(&self, id: &str, record: &R) -> Result<(), CollectionError> {
        self.db.update_document(&self.database, id, record)
    }

    pub fn get_all(&self) -> Result<Vec<R>, CollectionError> {
        self.db.all_documents(&self.database)
    }
}

/// Extension trait for typed collection access on any DocumentDatabase.
pub trait CollectionsExt: DocumentDatabase + Sized {
    fn collection<R: Record>(&self, database: &str) -> Collection<'_, Self, R> {
        Collection::new(self, database)
    }
}

impl<D: DocumentDatabase> CollectionsExt for D {}
