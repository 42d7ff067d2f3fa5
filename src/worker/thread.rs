//! Threaded task consumer for background store work.
//!
//! This module provides the single background thread that pops the store's
//! task queue and runs sync cycles, loads and saves in enqueue order.

use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, error};

use super::queue::Task;
use super::signal::StopSignal;

/// Statistics from the sync worker.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct WorkerStats {
    pub tasks_completed: usize,
    pub tasks_failed: usize,
}

/// The background thread consuming a store's task queue.
///
/// Returned by [`ModelStore::run`](crate::ModelStore::run). Keep it alive for
/// as long as the store should sync: dropping it signals the worker to stop.
///
/// ## Example
///
/// ```ignore
/// let store = ModelStore::new(InMemoryDatabase::new());
/// store.register_type::<Order>(TypeSettings::new("orders"))?;
///
/// let worker = store.run()?;
///
/// // ... do work ...
///
/// let stats = worker.stop();
/// println!("{} tasks failed", stats.tasks_failed);
/// ```
///
/// Use [`detach`](Self::detach) to keep the worker running for the life of
/// the store without holding the handle.
#[must_use = "dropping the handle stops the sync worker"]
pub struct SyncWorkerThread {
    signal: Arc<StopSignal>,
    waker: Sender<Task>,
    handle: Option<JoinHandle<WorkerStats>>,
    stop_on_drop: bool,
}

impl SyncWorkerThread {
    pub(crate) fn spawn(
        receiver: Receiver<Task>,
        waker: Sender<Task>,
        signal: Arc<StopSignal>,
    ) -> Self {
        let worker_signal = Arc::clone(&signal);

        let handle = thread::spawn(move || {
            let mut stats = WorkerStats::default();
            debug!("sync worker started");

            while let Ok(task) = receiver.recv() {
                if worker_signal.is_raised() {
                    break;
                }

                let label = task.label;
                match panic::catch_unwind(AssertUnwindSafe(task.run)) {
                    Ok(Ok(())) => stats.tasks_completed += 1,
                    Ok(Err(err)) => {
                        error!(task = label, error = %err, "exception in database task");
                        stats.tasks_failed += 1;
                    }
                    Err(_) => {
                        error!(task = label, "database task panicked");
                        stats.tasks_failed += 1;
                    }
                }
            }

            debug!(
                completed = stats.tasks_completed,
                failed = stats.tasks_failed,
                "sync worker stopped"
            );
            stats
        });

        Self {
            signal,
            waker,
            handle: Some(handle),
            stop_on_drop: true,
        }
    }

    /// Signal the worker to stop and wait for it to finish.
    /// Returns the worker statistics.
    ///
    /// A task that is already running completes first.
    pub fn stop(mut self) -> WorkerStats {
        self.signal_stop();
        if let Some(handle) = self.handle.take() {
            handle.join().unwrap_or_default()
        } else {
            WorkerStats::default()
        }
    }

    /// Let the worker run unattended. It exits once the store is dropped and
    /// its queue is closed.
    pub fn detach(mut self) {
        self.stop_on_drop = false;
    }

    /// Signal the worker to stop without waiting.
    pub fn signal_stop(&self) {
        self.signal.raise();
        let _ = self.waker.send(Task::noop());
    }
}

impl Drop for SyncWorkerThread {
    fn drop(&mut self) {
        if !self.stop_on_drop {
            return;
        }
        self.signal_stop();
        // Don't join on drop - let the thread finish naturally
    }
}
