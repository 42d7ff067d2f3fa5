//! Type-erased view of a record, so one map can hold every registered type.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::{Record, RecordMeta};

/// A cached record shared between the store and its readers.
pub type SharedRecord = Arc<dyn AnyRecord>;

/// Object-safe face of [`Record`]. Implemented for every `Record`.
pub trait AnyRecord: Any + fmt::Debug + Send + Sync {
    fn type_tag(&self) -> &'static str;

    fn record_id(&self) -> &str;

    fn record_meta(&self) -> &RecordMeta;

    fn as_any(&self) -> &dyn Any;

    /// Copy of this record carrying `meta` instead of its own.
    fn with_meta(&self, meta: RecordMeta) -> SharedRecord;
}

impl<R: Record> AnyRecord for R {
    fn type_tag(&self) -> &'static str {
        R::TYPE_TAG
    }

    fn record_id(&self) -> &str {
        self.id()
    }

    fn record_meta(&self) -> &RecordMeta {
        self.meta()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn with_meta(&self, meta: RecordMeta) -> SharedRecord {
        let mut copy = self.clone();
        *copy.meta_mut() = meta;
        Arc::new(copy)
    }
}

impl dyn AnyRecord {
    /// Borrow as the concrete record type, if it is one.
    pub fn downcast_ref<R: Record>(&self) -> Option<&R> {
        self.as_any().downcast_ref::<R>()
    }

    pub fn is<R: Record>(&self) -> bool {
        self.as_any().is::<R>()
    }
}

/// Whether two handles point at the same stored version.
pub(crate) fn same_version(a: &SharedRecord, b: &SharedRecord) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
