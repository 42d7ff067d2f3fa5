//! Registered record types and their typed sync strategies.
//!
//! The store keeps one [`Registration`] per type tag. Each carries a boxed
//! [`TypeSync`] built for the concrete record type at registration time, so
//! the sync loop can walk heterogeneous types without knowing them.

use std::marker::PhantomData;
use std::sync::Arc;

use super::sync::FlushReport;
use super::ModelStore;
use crate::database::DocumentDatabase;
use crate::error::StoreError;
use crate::record::Record;
use crate::storage::FileStorage;

/// Persistence settings of one record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSettings {
    /// Database (collection) name in the document store.
    pub database_name: String,
}

impl TypeSettings {
    pub fn new(database_name: impl Into<String>) -> Self {
        TypeSettings {
            database_name: database_name.into(),
        }
    }
}

/// Per-type sync operations, erased over the record type.
pub(crate) trait TypeSync<D>: Send + Sync {
    fn flush(&self, store: &ModelStore<D>, settings: &TypeSettings)
        -> Result<FlushReport, StoreError>;

    fn reload(&self, store: &ModelStore<D>, settings: &TypeSettings) -> Result<usize, StoreError>;

    fn load_file(&self, store: &ModelStore<D>, storage: &FileStorage) -> Result<usize, StoreError>;

    fn save_file(&self, store: &ModelStore<D>, storage: &FileStorage) -> Result<usize, StoreError>;
}

struct TypedSync<R>(PhantomData<fn() -> R>);

impl<D, R> TypeSync<D> for TypedSync<R>
where
    D: DocumentDatabase + 'static,
    R: Record,
{
    fn flush(
        &self,
        store: &ModelStore<D>,
        settings: &TypeSettings,
    ) -> Result<FlushReport, StoreError> {
        store.flush_type::<R>(settings)
    }

    fn reload(&self, store: &ModelStore<D>, settings: &TypeSettings) -> Result<usize, StoreError> {
        store.reload_type::<R>(settings)
    }

    fn load_file(&self, store: &ModelStore<D>, storage: &FileStorage) -> Result<usize, StoreError> {
        let records = storage.load::<R>()?;
        store.add_range(records)
    }

    fn save_file(&self, store: &ModelStore<D>, storage: &FileStorage) -> Result<usize, StoreError> {
        let records = store.fetch_typed::<R, _>(|_| true)?;
        storage.save(&records)
    }
}

/// One entry of the registered-type table.
pub(crate) struct Registration<D> {
    pub(crate) type_tag: &'static str,
    pub(crate) settings: TypeSettings,
    pub(crate) sync: Arc<dyn TypeSync<D>>,
}

impl<D> Clone for Registration<D> {
    fn clone(&self) -> Self {
        Registration {
            type_tag: self.type_tag,
            settings: self.settings.clone(),
            sync: Arc::clone(&self.sync),
        }
    }
}

impl<D: DocumentDatabase + 'static> Registration<D> {
    pub(crate) fn of<R: Record>(settings: TypeSettings) -> Self {
        Registration {
            type_tag: R::TYPE_TAG,
            settings,
            sync: Arc::new(TypedSync::<R>(PhantomData)),
        }
    }
}

/// Add or replace `registration`, keeping the original position on replace.
pub(crate) fn upsert<D>(table: &mut Vec<Registration<D>>, registration: Registration<D>) {
    match table
        .iter_mut()
        .find(|r| r.type_tag == registration.type_tag)
    {
        Some(existing) => *existing = registration,
        None => table.push(registration),
    }
}
