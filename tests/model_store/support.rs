//! Shared fixtures: two record types, a call-recording database and a
//! polling helper for threaded tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::{Arc, Mutex, Once};
use std::thread;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use synced_rust::{
    CollectionError, DocumentDatabase, InMemoryDatabase, Record, RecordMeta, Timestamp,
};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub total: u64,
    pub meta: RecordMeta,
}

impl Record for Order {
    const TYPE_TAG: &'static str = "Order";
    fn id(&self) -> &str {
        &self.id
    }
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
}

impl Order {
    /// A local order that has never been written to the database.
    pub fn new(id: &str, total: u64) -> Self {
        Order {
            id: id.into(),
            total,
            meta: RecordMeta::new_dirty(),
        }
    }

    /// A clean order as it would come back from the database.
    pub fn stored(id: &str, total: u64, updated: i64) -> Self {
        Order {
            id: id.into(),
            total,
            meta: RecordMeta {
                timestamp_insert: Timestamp::from_millis(1),
                timestamp_update: Timestamp::from_millis(updated),
                dirty: false,
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub meta: RecordMeta,
}

impl Record for Customer {
    const TYPE_TAG: &'static str = "Customer";
    fn id(&self) -> &str {
        &self.id
    }
    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }
    fn storage_bucket(&self) -> String {
        self.name.chars().next().map(String::from).unwrap_or_default()
    }
}

impl Customer {
    pub fn new(id: &str, name: &str) -> Self {
        Customer {
            id: id.into(),
            name: name.into(),
            meta: RecordMeta::new_dirty(),
        }
    }
}

/// One call made against the database.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Insert { database: String, id: String },
    Update { database: String, id: String },
    GetAll { database: String },
}

/// InMemoryDatabase that records every call and can reject chosen writes.
#[derive(Clone, Default)]
pub struct RecordingDatabase {
    pub inner: InMemoryDatabase,
    calls: Arc<Mutex<Vec<Call>>>,
    duplicate_ids: Arc<Mutex<HashSet<String>>>,
    failing_ids: Arc<Mutex<HashSet<String>>>,
    insert_hook: Arc<Mutex<Option<InsertHook>>>,
}

type InsertHook = Box<dyn Fn(&str) + Send>;

impl RecordingDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts of `id` fail with `DuplicateKey`.
    pub fn reject_as_duplicate(&self, id: &str) {
        self.duplicate_ids.lock().unwrap().insert(id.to_string());
    }

    /// Inserts and updates of `id` fail with a backend error.
    pub fn fail_writes_of(&self, id: &str) {
        self.failing_ids.lock().unwrap().insert(id.to_string());
    }

    /// Run `hook` with the id of every insert, before it is stored.
    pub fn on_insert(&self, hook: impl Fn(&str) + Send + 'static) {
        *self.insert_hook.lock().unwrap() = Some(Box::new(hook));
    }

    pub fn heal(&self, id: &str) {
        self.failing_ids.lock().unwrap().remove(id);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn inserts_of(&self, id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Insert { id: i, .. } if i == id))
            .count()
    }

    pub fn updates_of(&self, id: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Update { id: i, .. } if i == id))
            .count()
    }
}

impl DocumentDatabase for RecordingDatabase {
    fn insert_document<R: Record>(
        &self,
        database: &str,
        id: &str,
        record: &R,
    ) -> Result<(), CollectionError> {
        self.calls.lock().unwrap().push(Call::Insert {
            database: database.into(),
            id: id.into(),
        });
        if self.duplicate_ids.lock().unwrap().contains(id) {
            return Err(CollectionError::DuplicateKey {
                database: database.into(),
                id: id.into(),
            });
        }
        if self.failing_ids.lock().unwrap().contains(id) {
            return Err(CollectionError::Backend("connection reset".into()));
        }
        if let Some(hook) = self.insert_hook.lock().unwrap().as_ref() {
            hook(id);
        }
        self.inner.insert_document(database, id, record)
    }

    fn update_document<R: Record>(
        &self,
        database: &str,
        id: &str,
        record: &R,
    ) -> Result<(), CollectionError> {
        self.calls.lock().unwrap().push(Call::Update {
            database: database.into(),
            id: id.into(),
        });
        if self.failing_ids.lock().unwrap().contains(id) {
            return Err(CollectionError::Backend("connection reset".into()));
        }
        self.inner.update_document(database, id, record)
    }

    fn all_documents<R: Record>(&self, database: &str) -> Result<Vec<R>, CollectionError> {
        self.calls.lock().unwrap().push(Call::GetAll {
            database: database.into(),
        });
        self.inner.all_documents(database)
    }
}

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Poll `condition` every few milliseconds until it holds or `timeout` passes.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}
