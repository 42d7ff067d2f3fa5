//! Records - the domain entities cached by a [`ModelStore`](crate::ModelStore).
//!
//! A record is any serde type that names its type tag, exposes its id and
//! carries a [`RecordMeta`] with the persistence timestamps and dirty flag.
//!
//! ## Example
//!
//! ```ignore
//! use synced_rust::{Record, RecordMeta};
//!
//! #[derive(Serialize, Deserialize, Clone, Debug)]
//! struct Order {
//!     pub id: String,
//!     pub total: u64,
//!     pub meta: RecordMeta,
//! }
//!
//! impl Record for Order {
//!     const TYPE_TAG: &'static str = "Order";
//!     fn id(&self) -> &str { &self.id }
//!     fn meta(&self) -> &RecordMeta { &self.meta }
//!     fn meta_mut(&mut self) -> &mut RecordMeta { &mut self.meta }
//! }
//! ```

mod any;
mod timestamp;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::fmt;

pub(crate) use any::same_version;
pub use any::{AnyRecord, SharedRecord};
pub use timestamp::Timestamp;

/// Trait for types that can be cached in the model store.
pub trait Record: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static {
    /// Type tag, unique per record type. Half of the store key.
    const TYPE_TAG: &'static str;

    /// Identifier, unique within the type.
    fn id(&self) -> &str;

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Bucket used to partition file persistence. Empty means one file per type.
    fn storage_bucket(&self) -> String {
        String::new()
    }
}

/// Persistence bookkeeping carried by every record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    pub timestamp_insert: Timestamp,
    pub timestamp_update: Timestamp,
    /// Unsaved local changes. Never serialized: loaded records start clean.
    #[serde(skip)]
    pub dirty: bool,
}

impl RecordMeta {
    /// Meta for a brand-new local record that still has to be inserted.
    pub fn new_dirty() -> Self {
        RecordMeta {
            dirty: true,
            ..RecordMeta::default()
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_persisted(&self) -> bool {
        !self.timestamp_insert.is_epoch()
    }

    pub(crate) fn stamped_inserted(self, now: Timestamp) -> Self {
        RecordMeta {
            timestamp_insert: now,
            timestamp_update: now,
            dirty: false,
        }
    }

    pub(crate) fn stamped_updated(self, now: Timestamp) -> Self {
        RecordMeta {
            timestamp_update: now,
            dirty: false,
            ..self
        }
    }
}

/// Store key: (type tag, id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RecordKey {
    pub type_tag: String,
    pub id: String,
}

impl RecordKey {
    pub fn new(type_tag: impl Into<String>, id: impl Into<String>) -> Self {
        RecordKey {
            type_tag: type_tag.into(),
            id: id.into(),
        }
    }

    pub fn of<R: Record>(record: &R) -> Self {
        RecordKey::new(R::TYPE_TAG, record.id())
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.type_tag, self.id)
    }
}
