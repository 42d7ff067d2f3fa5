//! Background worker - single FIFO consumer for store tasks.
//!
//! - `TaskQueue` - blocking FIFO of boxed closures, one consumer
//! - `StopSignal` - interruptible sleep used by the sync loop's delay
//! - `SyncWorkerThread` - the consumer thread, with stop + stats

mod queue;
mod signal;
mod thread;

pub use queue::{Task, TaskQueue};
pub use signal::StopSignal;
pub use thread::{SyncWorkerThread, WorkerStats};
