//! Background synchronization with the document database.
//!
//! A sync cycle first flushes every dirty record of every registered type
//! (in registration order), then reloads each collection and merges it with
//! the last-writer-wins rule of [`ModelStore::add_range`].
//!
//! A failed write never stops the cycle: the record stays dirty for the next
//! one, the remaining records and types are still flushed and every type is
//! still reloaded. The cycle then reports [`StoreError::Incomplete`].

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};

use super::registry::{Registration, TypeSettings};
use super::ModelStore;
use crate::database::{CollectionsExt, DocumentDatabase};
use crate::error::{CollectionError, StoreError};
use crate::record::{same_version, AnyRecord, Record, RecordKey, SharedRecord, Timestamp};
use crate::worker::SyncWorkerThread;

/// Outcome of one flush of a single type.
#[derive(Debug, Default)]
pub(crate) struct FlushReport {
    pub(crate) inserted: usize,
    pub(crate) updated: usize,
    pub(crate) duplicates: usize,
    /// Writes that failed; their records are still dirty.
    pub(crate) failures: Vec<CollectionError>,
}

/// Outcome of one full sync cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Records written with a database insert.
    pub inserted: usize,
    /// Records written with a database update.
    pub updated: usize,
    /// Inserts rejected as duplicate keys (kept locally, not retried).
    pub duplicates: usize,
    /// Records replaced by newer versions from the database (or files).
    pub reloaded: usize,
    /// Writes, reloads and file operations that failed.
    pub failed: usize,
}

/// Running totals of one cycle plus the first failure seen.
#[derive(Default)]
struct Cycle {
    report: SyncReport,
    first_error: Option<StoreError>,
}

impl Cycle {
    fn absorb(&mut self, flush: FlushReport) {
        self.report.inserted += flush.inserted;
        self.report.updated += flush.updated;
        self.report.duplicates += flush.duplicates;
        for err in flush.failures {
            self.fail(err.into());
        }
    }

    fn fail(&mut self, err: StoreError) {
        self.report.failed += 1;
        self.first_error.get_or_insert(err);
    }

    fn finish(self) -> Result<SyncReport, StoreError> {
        match self.first_error {
            None => Ok(self.report),
            Some(first) => Err(StoreError::Incomplete {
                report: self.report,
                first: Box::new(first),
            }),
        }
    }
}

impl<D: DocumentDatabase + 'static> ModelStore<D> {
    /// Start the background worker: load persisted data, then sync every
    /// `sync_interval` until the returned handle is stopped or dropped.
    ///
    /// Only the first call starts a worker; later calls fail with
    /// [`StoreError::AlreadyRunning`]. Dropping the returned handle stops the
    /// worker for good, so keep it or call
    /// [`SyncWorkerThread::detach`].
    pub fn run(&self) -> Result<SyncWorkerThread, StoreError> {
        let receiver = self.inner.queue.take_receiver()?;
        let worker = SyncWorkerThread::spawn(
            receiver,
            self.inner.queue.sender(),
            Arc::clone(&self.inner.signal),
        );

        self.load()?;
        self.trigger_loop()?;
        Ok(worker)
    }

    /// Queue the next loop iteration: delay, sync, re-queue. The next
    /// iteration is queued whatever the outcome of this one.
    fn trigger_loop(&self) -> Result<(), StoreError> {
        self.enqueue("sync loop", |store| {
            if store.inner.signal.wait_timeout(store.inner.config.sync_interval()) {
                return Ok(());
            }

            let result = store.sync_now().map(|_| ());
            store.trigger_loop()?;
            result
        })
    }

    /// Schedule a flush. The task does nothing when no record is dirty;
    /// otherwise it flushes every registered type to the database and, with
    /// a storage directory configured, rewrites the record files.
    pub fn save(&self) -> Result<(), StoreError> {
        self.enqueue("save", |store| {
            if !store.has_dirty()? {
                return Ok(());
            }
            store.save_now().map(|_| ())
        })
    }

    /// Schedule a load: record files, then static data, then a reload from
    /// the database.
    pub fn load(&self) -> Result<(), StoreError> {
        self.enqueue("load", |store| store.load_now().map(|_| ()))
    }

    /// Flush every dirty record and write record files, on this thread.
    ///
    /// Files are written even when some database writes failed.
    pub fn save_now(&self) -> Result<SyncReport, StoreError> {
        let types = self.registrations()?;
        let mut cycle = Cycle::default();

        for registration in &types {
            match registration.sync.flush(self, &registration.settings) {
                Ok(flush) => cycle.absorb(flush),
                Err(err) => cycle.fail(err),
            }
        }

        if let Some(storage) = &self.inner.storage {
            for registration in &types {
                if let Err(err) = registration.sync.save_file(self, storage) {
                    error!(type_tag = registration.type_tag, error = %err, "failed to write record files");
                    cycle.fail(err);
                }
            }
        }

        cycle.finish()
    }

    /// Load record files, static data and database contents, on this thread.
    /// Returns the number of records that were stored.
    pub fn load_now(&self) -> Result<usize, StoreError> {
        let types = self.registrations()?;
        let mut cycle = Cycle::default();

        if let Some(storage) = &self.inner.storage {
            for registration in &types {
                match registration.sync.load_file(self, storage) {
                    Ok(loaded) => cycle.report.reloaded += loaded,
                    Err(err) => {
                        error!(type_tag = registration.type_tag, error = %err, "failed to read record files");
                        cycle.fail(err);
                    }
                }
            }
        }

        if let Some(static_data) = &self.inner.static_data {
            if let Err(err) = static_data(self) {
                error!(error = %err, "static data loader failed");
                cycle.fail(err);
            }
        }

        self.reload_all(&types, &mut cycle);
        cycle.finish().map(|report| report.reloaded)
    }

    /// Run one sync cycle on this thread: flush all types, then reload all.
    ///
    /// Every type is flushed and reloaded even if some operations fail; the
    /// failures are then returned as [`StoreError::Incomplete`].
    #[instrument(skip_all)]
    pub fn sync_now(&self) -> Result<SyncReport, StoreError> {
        let types = self.registrations()?;
        let mut cycle = Cycle::default();

        for registration in &types {
            match registration.sync.flush(self, &registration.settings) {
                Ok(flush) => cycle.absorb(flush),
                Err(err) => cycle.fail(err),
            }
        }

        self.reload_all(&types, &mut cycle);
        cycle.finish()
    }

    fn reload_all(&self, types: &[Registration<D>], cycle: &mut Cycle) {
        for registration in types {
            match registration.sync.reload(self, &registration.settings) {
                Ok(reloaded) => cycle.report.reloaded += reloaded,
                Err(err) => {
                    error!(type_tag = registration.type_tag, error = %err, "reload failed");
                    cycle.fail(err);
                }
            }
        }
    }

    /// Write dirty records of `R` until none are left.
    ///
    /// Records written while a pass is running are picked up by the next one.
    /// A record whose write fails stays dirty and is skipped for the rest of
    /// this flush.
    #[instrument(skip_all, fields(type_tag = R::TYPE_TAG, database = %settings.database_name))]
    pub(crate) fn flush_type<R: Record>(
        &self,
        settings: &TypeSettings,
    ) -> Result<FlushReport, StoreError> {
        let collection = self.inner.database.collection::<R>(&settings.database_name);
        let mut report = FlushReport::default();
        let mut failed: HashSet<String> = HashSet::new();

        loop {
            let batch = self.dirty_snapshot::<R>(&failed)?;
            if batch.is_empty() {
                break;
            }

            let now = Timestamp::now();
            info!(count = batch.len(), "saving {} records of type {}", batch.len(), R::TYPE_TAG);

            for (snapshot, record) in batch {
                let meta = *record.meta();
                let mut stamped = record;

                if !meta.is_persisted() {
                    *stamped.meta_mut() = meta.stamped_inserted(now);
                    match collection.insert(stamped.id(), &stamped) {
                        Ok(()) => report.inserted += 1,
                        Err(err) if err.is_duplicate_key() => {
                            warn!(id = stamped.id(), error = %err, "skipped duplicate insert");
                            report.duplicates += 1;
                        }
                        Err(err) => {
                            error!(id = stamped.id(), error = %err, "insert failed, record stays dirty");
                            failed.insert(stamped.id().to_string());
                            report.failures.push(err);
                            continue;
                        }
                    }
                    self.commit_flushed(&snapshot, stamped)?;
                } else {
                    *stamped.meta_mut() = meta.stamped_updated(now);
                    let committed = self.commit_flushed(&snapshot, stamped.clone())?;
                    match collection.update(stamped.id(), &stamped) {
                        Ok(()) => report.updated += 1,
                        Err(err) => {
                            error!(id = stamped.id(), error = %err, "update failed, record stays dirty");
                            if let Some(committed) = committed {
                                self.restore_dirty(&committed)?;
                            }
                            failed.insert(stamped.id().to_string());
                            report.failures.push(err);
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    /// Merge the full database collection of `R` into the cache.
    #[instrument(skip_all, fields(type_tag = R::TYPE_TAG, database = %settings.database_name))]
    pub(crate) fn reload_type<R: Record>(&self, settings: &TypeSettings) -> Result<usize, StoreError> {
        let documents = self
            .inner
            .database
            .collection::<R>(&settings.database_name)
            .get_all()?;
        if documents.is_empty() {
            return Ok(0);
        }

        let updated = self.add_range(documents)?;
        info!(count = updated, "loaded {} records of type {}", updated, R::TYPE_TAG);
        Ok(updated)
    }

    /// Dirty records of `R` not in `skip`, each with the stored handle it
    /// was copied from.
    fn dirty_snapshot<R: Record>(
        &self,
        skip: &HashSet<String>,
    ) -> Result<Vec<(SharedRecord, R)>, StoreError> {
        let state = self.state("dirty snapshot")?;
        Ok(state
            .records
            .values()
            .filter(|r| r.record_meta().dirty && !skip.contains(r.record_id()))
            .filter_map(|r| r.downcast_ref::<R>().map(|typed| (Arc::clone(r), typed.clone())))
            .collect())
    }

    /// Store the stamped copy of a flushed record.
    ///
    /// Only replaces the exact version that was snapshotted. A version written
    /// meanwhile stays dirty and only inherits the insert timestamp; a record
    /// deleted meanwhile stays deleted.
    ///
    /// Returns the stored handle when the stamped copy replaced the snapshot.
    fn commit_flushed<R: Record>(
        &self,
        snapshot: &SharedRecord,
        stamped: R,
    ) -> Result<Option<SharedRecord>, StoreError> {
        let key = RecordKey::of(&stamped);
        let mut state = self.state("commit flushed")?;

        let Some(current) = state.records.get(&key) else {
            return Ok(None);
        };

        if same_version(current, snapshot) {
            let committed: SharedRecord = Arc::new(stamped);
            state.records.insert(key, Arc::clone(&committed));
            return Ok(Some(committed));
        }

        if !current.record_meta().is_persisted() && stamped.meta().is_persisted() {
            let mut meta = *current.record_meta();
            meta.timestamp_insert = stamped.meta().timestamp_insert;
            let carried = current.with_meta(meta);
            state.records.insert(key, carried);
        }

        Ok(None)
    }

    /// Mark a committed version dirty again after its write failed. A version
    /// written meanwhile is dirty already and is left alone.
    fn restore_dirty(&self, committed: &SharedRecord) -> Result<(), StoreError> {
        let key = RecordKey::new(committed.type_tag(), committed.record_id());
        let mut state = self.state("restore dirty")?;

        if let Some(current) = state.records.get(&key) {
            if same_version(current, committed) {
                let mut meta = *current.record_meta();
                meta.mark_dirty();
                let restored = current.with_meta(meta);
                state.records.insert(key, restored);
            }
        }

        Ok(())
    }
}
