mod config;
mod database;
mod error;
mod record;
mod storage;
mod store;
mod worker;

pub use config::StoreConfig;
pub use database::{Collection, CollectionsExt, DocumentDatabase, InMemoryDatabase};
pub use error::{CollectionError, StoreError};
pub use record::{AnyRecord, Record, RecordKey, RecordMeta, SharedRecord, Timestamp};
pub use storage::FileStorage;
pub use store::{
    ModelStore, ModelStoreBuilder, ModelsChanged, StaticDataLoader, SyncReport, TypeSettings,
    MODELS_CHANGED,
};
pub use worker::{StopSignal, SyncWorkerThread, Task, TaskQueue, WorkerStats};

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
