//! ModelStore - in-process record cache kept in sync with a document database.
//!
//! Records live in one map keyed by (type tag, id), guarded by a single
//! mutex together with the registered-type table. Reads copy what they need
//! and release the lock before running caller code; database and file I/O
//! never happens under the lock.
//!
//! ## Example
//!
//! ```ignore
//! use synced_rust::{InMemoryDatabase, ModelStore, TypeSettings};
//!
//! let store = ModelStore::new(InMemoryDatabase::new());
//! store.register_type::<Order>(TypeSettings::new("orders"))?;
//!
//! store.add(order)?;
//! let worker = store.run()?;
//!
//! let open = store.fetch_typed::<Order, _>(|o| !o.closed)?;
//! ```

mod events;
mod registry;
mod sync;

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

#[cfg(feature = "emitter")]
use event_emitter_rs::EventEmitter;

use crate::config::StoreConfig;
use crate::database::DocumentDatabase;
use crate::error::StoreError;
use crate::record::{AnyRecord, Record, RecordKey, SharedRecord, Timestamp};
use crate::storage::FileStorage;
use crate::worker::{StopSignal, Task, TaskQueue};

pub use events::{ModelsChanged, MODELS_CHANGED};
pub use registry::TypeSettings;
pub use sync::SyncReport;

use registry::Registration;

/// Loader for static/reference data, run by [`ModelStore::load`].
pub type StaticDataLoader<D> = Arc<dyn Fn(&ModelStore<D>) -> Result<(), StoreError> + Send + Sync>;

struct StoreState<D> {
    records: HashMap<RecordKey, SharedRecord>,
    types: Vec<Registration<D>>,
}

struct StoreInner<D> {
    database: D,
    config: StoreConfig,
    state: Mutex<StoreState<D>>,
    queue: TaskQueue,
    signal: Arc<StopSignal>,
    storage: Option<FileStorage>,
    static_data: Option<StaticDataLoader<D>>,
    latest_interaction: AtomicI64,
    #[cfg(feature = "emitter")]
    emitter: Mutex<EventEmitter>,
}

/// In-memory model cache. Clone-friendly via Arc: clones share everything.
pub struct ModelStore<D> {
    inner: Arc<StoreInner<D>>,
}

impl<D> Clone for ModelStore<D> {
    fn clone(&self) -> Self {
        ModelStore {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Builder for a [`ModelStore`] with non-default settings.
pub struct ModelStoreBuilder<D> {
    database: D,
    config: StoreConfig,
    static_data: Option<StaticDataLoader<D>>,
}

impl<D: DocumentDatabase + 'static> ModelStoreBuilder<D> {
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Register the static/reference data loader run by every `load()`.
    pub fn static_data<F>(mut self, loader: F) -> Self
    where
        F: Fn(&ModelStore<D>) -> Result<(), StoreError> + Send + Sync + 'static,
    {
        self.static_data = Some(Arc::new(loader));
        self
    }

    pub fn build(self) -> Result<ModelStore<D>, StoreError> {
        self.config.validate()?;
        Ok(ModelStore::from_parts(
            self.database,
            self.config,
            self.static_data,
        ))
    }
}

impl<D: DocumentDatabase + 'static> ModelStore<D> {
    /// Store with the default configuration: 2 s sync interval, no files.
    pub fn new(database: D) -> Self {
        Self::from_parts(database, StoreConfig::default(), None)
    }

    pub fn builder(database: D) -> ModelStoreBuilder<D> {
        ModelStoreBuilder {
            database,
            config: StoreConfig::default(),
            static_data: None,
        }
    }

    fn from_parts(
        database: D,
        config: StoreConfig,
        static_data: Option<StaticDataLoader<D>>,
    ) -> Self {
        let storage = config.storage_dir.clone().map(FileStorage::new);
        ModelStore {
            inner: Arc::new(StoreInner {
                database,
                config,
                state: Mutex::new(StoreState {
                    records: HashMap::new(),
                    types: Vec::new(),
                }),
                queue: TaskQueue::new(),
                signal: Arc::new(StopSignal::new()),
                storage,
                static_data,
                latest_interaction: AtomicI64::new(Timestamp::EPOCH.as_millis()),
                #[cfg(feature = "emitter")]
                emitter: Mutex::new(EventEmitter::new()),
            }),
        }
    }

    pub fn database(&self) -> &D {
        &self.inner.database
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    fn state(&self, operation: &'static str) -> Result<MutexGuard<'_, StoreState<D>>, StoreError> {
        self.inner
            .state
            .lock()
            .map_err(|_| StoreError::LockPoisoned(operation))
    }

    /// Push a task that runs against this store on the worker thread.
    ///
    /// The task holds a weak handle, so queued work never keeps a store alive.
    fn enqueue<F>(&self, label: &'static str, work: F) -> Result<(), StoreError>
    where
        F: FnOnce(&ModelStore<D>) -> Result<(), StoreError> + Send + 'static,
    {
        let weak: Weak<StoreInner<D>> = Arc::downgrade(&self.inner);
        self.inner.queue.push(Task::new(label, move || match weak.upgrade() {
            Some(inner) => work(&ModelStore { inner }),
            None => Ok(()),
        }))
    }

    // ------------------------------------------------------------------
    // Registration
    // ------------------------------------------------------------------

    /// Add or replace the persistence settings of `R`.
    ///
    /// Call before the worker runs; registration order is sync order.
    pub fn register_type<R: Record>(&self, settings: TypeSettings) -> Result<(), StoreError> {
        let mut state = self.state("register type")?;
        registry::upsert(&mut state.types, Registration::of::<R>(settings));
        Ok(())
    }

    /// Registered type tags with their settings, in registration order.
    pub fn registered_types(&self) -> Result<Vec<(&'static str, TypeSettings)>, StoreError> {
        let state = self.state("registered types")?;
        Ok(state
            .types
            .iter()
            .map(|r| (r.type_tag, r.settings.clone()))
            .collect())
    }

    fn registrations(&self) -> Result<Vec<Registration<D>>, StoreError> {
        Ok(self.state("registrations")?.types.clone())
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Insert or replace the record at its key.
    ///
    /// The record is stored as given; set its dirty flag to have the sync
    /// loop write it to the database.
    pub fn add<R: Record>(&self, record: R) -> Result<(), StoreError> {
        let key = RecordKey::of(&record);
        self.state("add")?.records.insert(key, Arc::new(record));
        self.notify_changed(R::TYPE_TAG, 1);
        Ok(())
    }

    /// Remove the record at the key of `record`. Returns whether one existed.
    pub fn delete<R: Record>(&self, record: &R) -> Result<bool, StoreError> {
        self.delete_by_id::<R>(record.id())
    }

    pub fn delete_by_id<R: Record>(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self
            .state("delete")?
            .records
            .remove(&RecordKey::new(R::TYPE_TAG, id))
            .is_some();
        if removed {
            self.notify_changed(R::TYPE_TAG, 1);
        }
        Ok(removed)
    }

    /// Last-writer-wins merge. A record replaces the cached one only if none
    /// exists yet or its update timestamp is strictly greater.
    ///
    /// Returns the number of records that were stored.
    pub fn add_range<R, I>(&self, records: I) -> Result<usize, StoreError>
    where
        R: Record,
        I: IntoIterator<Item = R>,
    {
        let mut updated = 0;
        {
            let mut state = self.state("add range")?;
            for record in records {
                let key = RecordKey::of(&record);
                let newer = match state.records.get(&key) {
                    Some(existing) => {
                        record.meta().timestamp_update > existing.record_meta().timestamp_update
                    }
                    None => true,
                };
                if newer {
                    state.records.insert(key, Arc::new(record));
                    updated += 1;
                }
            }
        }

        if updated > 0 {
            self.notify_changed(R::TYPE_TAG, updated);
        }
        Ok(updated)
    }

    /// Apply `change` to a copy of the cached record, mark it dirty and store
    /// it back. Returns the new version, or `None` when the key is absent.
    pub fn modify<R, F>(&self, id: &str, change: F) -> Result<Option<R>, StoreError>
    where
        R: Record,
        F: FnOnce(&mut R),
    {
        let key = RecordKey::new(R::TYPE_TAG, id);
        let updated = {
            let mut state = self.state("modify")?;
            let Some(mut record) = state
                .records
                .get(&key)
                .and_then(|r| r.downcast_ref::<R>())
                .cloned()
            else {
                return Ok(None);
            };
            change(&mut record);
            record.meta_mut().mark_dirty();
            state.records.insert(key, Arc::new(record.clone()));
            record
        };

        self.notify_changed(R::TYPE_TAG, 1);
        Ok(Some(updated))
    }

    /// Mark every cached record dirty, then schedule [`save`](Self::save).
    pub fn mark_all_dirty_for_save(&self) -> Result<(), StoreError> {
        {
            let mut state = self.state("mark all dirty")?;
            for record in state.records.values_mut() {
                let mut meta = *record.record_meta();
                if !meta.dirty {
                    meta.mark_dirty();
                    *record = record.with_meta(meta);
                }
            }
        }
        self.save()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Snapshot of every record matching `predicate`, any type.
    pub fn fetch<P>(&self, predicate: P) -> Result<Vec<SharedRecord>, StoreError>
    where
        P: Fn(&dyn AnyRecord) -> bool,
    {
        let state = self.state("fetch")?;
        Ok(state
            .records
            .values()
            .filter(|r| predicate(&***r))
            .cloned()
            .collect())
    }

    /// Like [`fetch`](Self::fetch), then `transform` runs on the copy after
    /// the lock is released.
    pub fn fetch_with<P, F, T>(&self, predicate: P, transform: F) -> Result<T, StoreError>
    where
        P: Fn(&dyn AnyRecord) -> bool,
        F: FnOnce(Vec<SharedRecord>) -> T,
    {
        let snapshot = self.fetch(predicate)?;
        Ok(transform(snapshot))
    }

    /// Snapshot (clones) of the records of type `R` matching `predicate`.
    pub fn fetch_typed<R, P>(&self, predicate: P) -> Result<Vec<R>, StoreError>
    where
        R: Record,
        P: Fn(&R) -> bool,
    {
        let state = self.state("fetch typed")?;
        Ok(state
            .records
            .values()
            .filter_map(|r| r.downcast_ref::<R>())
            .filter(|r| predicate(r))
            .cloned()
            .collect())
    }

    pub fn fetch_typed_with<R, P, F, T>(&self, predicate: P, transform: F) -> Result<T, StoreError>
    where
        R: Record,
        P: Fn(&R) -> bool,
        F: FnOnce(Vec<R>) -> T,
    {
        let snapshot = self.fetch_typed(predicate)?;
        Ok(transform(snapshot))
    }

    pub fn fetch_by_id<R: Record>(&self, id: &str) -> Result<Option<R>, StoreError> {
        let state = self.state("fetch by id")?;
        Ok(state
            .records
            .get(&RecordKey::new(R::TYPE_TAG, id))
            .and_then(|r| r.downcast_ref::<R>())
            .cloned())
    }

    /// Untyped point lookup.
    pub fn fetch_by_key(&self, type_tag: &str, id: &str) -> Result<Option<SharedRecord>, StoreError> {
        let state = self.state("fetch by key")?;
        Ok(state.records.get(&RecordKey::new(type_tag, id)).cloned())
    }

    /// Any one record of type `R` matching `predicate`.
    pub fn fetch_first<R, P>(&self, predicate: P) -> Result<Option<R>, StoreError>
    where
        R: Record,
        P: Fn(&R) -> bool,
    {
        let state = self.state("fetch first")?;
        Ok(state
            .records
            .values()
            .filter_map(|r| r.downcast_ref::<R>())
            .find(|r| predicate(r))
            .cloned())
    }

    /// Copy of the whole cache.
    pub fn fetch_all(&self) -> Result<HashMap<RecordKey, SharedRecord>, StoreError> {
        Ok(self.state("fetch all")?.records.clone())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.state("len")?.records.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    pub fn has_dirty(&self) -> Result<bool, StoreError> {
        let state = self.state("has dirty")?;
        Ok(state.records.values().any(|r| r.record_meta().dirty))
    }

    // ------------------------------------------------------------------
    // Interaction + change events
    // ------------------------------------------------------------------

    /// Last time [`touch`](Self::touch) was called.
    pub fn latest_interaction(&self) -> Timestamp {
        Timestamp::from_millis(self.inner.latest_interaction.load(Ordering::Relaxed))
    }

    /// Record user activity now.
    pub fn touch(&self) {
        self.inner
            .latest_interaction
            .store(Timestamp::now().as_millis(), Ordering::Relaxed);
    }

    /// Subscribe to [`ModelsChanged`] events. Listeners run on their own
    /// threads. Returns the listener id.
    #[cfg(feature = "emitter")]
    pub fn on_models_changed<F>(&self, listener: F) -> Result<String, StoreError>
    where
        F: Fn(ModelsChanged) + Send + Sync + 'static,
    {
        let mut emitter = self
            .inner
            .emitter
            .lock()
            .map_err(|_| StoreError::LockPoisoned("subscribe"))?;
        Ok(emitter.on(MODELS_CHANGED, listener))
    }

    #[cfg(feature = "emitter")]
    fn notify_changed(&self, type_tag: &'static str, count: usize) {
        if let Ok(mut emitter) = self.inner.emitter.lock() {
            emitter.emit(
                MODELS_CHANGED,
                ModelsChanged {
                    type_tag: type_tag.to_string(),
                    count,
                },
            );
        }
    }

    #[cfg(not(feature = "emitter"))]
    fn notify_changed(&self, _type_tag: &'static str, _count: usize) {}
}
