//! Document database - the external store the model cache synchronizes with.
//!
//! The store only needs three operations per collection: insert a new
//! document, update an existing one and read the whole collection back.
//! Serialization is the backend's business.
//!
//! ## Example
//!
//! ```ignore
//! use synced_rust::{CollectionsExt, InMemoryDatabase};
//!
//! let db = InMemoryDatabase::new();
//! let orders = db.collection::<Order>("orders");
//! orders.insert("A", &order)?;
//! let all = orders.get_all()?;
//! ```

mod collection;
mod in_memory;

use crate::error::CollectionError;
use crate::record::Record;

pub use collection::{Collection, CollectionsExt};
pub use in_memory::InMemoryDatabase;

/// Abstract document storage, addressed by database (collection) name and id.
///
/// Implementations must be safe to call from the sync worker thread while
/// other threads use the same handle.
pub trait DocumentDatabase: Send + Sync {
    /// Insert a new document. Fails with [`CollectionError::DuplicateKey`]
    /// when `id` already exists.
    fn insert_document<R: Record>(
        &self,
        database: &str,
        id: &str,
        record: &R,
    ) -> Result<(), CollectionError>;

    /// Replace an existing document. What happens for an unknown `id` is up
    /// to the backend.
    fn update_document<R: Record>(
        &self,
        database: &str,
        id: &str,
        record: &R,
    ) -> Result<(), CollectionError>;

    /// Every document stored under `database`.
    fn all_documents<R: Record>(&self, database: &str) -> Result<Vec<R>, CollectionError>;
}

impl<D: DocumentDatabase> DocumentDatabase for std::sync::Arc<D> {
    fn insert_document<R: Record>(
        &self,
        database: &str,
        id: &str,
        record: &R,
    ) -> Result<(), CollectionError> {
        (**self).insert_document(database, id, record)
    }

    fn update_document<R: Record>(
        &self,
        database: &str,
        id: &str,
        record: &R,
    ) -> Result<(), CollectionError> {
        (**self).update_document(database, id, record)
    }

    fn all_documents<R: Record>(&self, database: &str) -> Result<Vec<R>, CollectionError> {
        (**self).all_documents(database)
    }
}
