use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::Mutex;

use crate::error::StoreError;

/// A unit of background work. Errors are logged by the consumer.
pub struct Task {
    pub(crate) label: &'static str,
    pub(crate) run: Box<dyn FnOnce() -> Result<(), StoreError> + Send>,
}

impl Task {
    pub fn new<F>(label: &'static str, run: F) -> Self
    where
        F: FnOnce() -> Result<(), StoreError> + Send + 'static,
    {
        Task {
            label,
            run: Box::new(run),
        }
    }

    pub(crate) fn noop() -> Self {
        Task::new("wake", || Ok(()))
    }
}

/// FIFO queue of [`Task`]s with a single consumer.
///
/// Producers push from any thread; the receiving end is handed out once.
pub struct TaskQueue {
    tx: Sender<Task>,
    rx: Mutex<Option<Receiver<Task>>>,
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskQueue {
    pub fn new() -> Self {
        let (tx, rx) = channel();
        TaskQueue {
            tx,
            rx: Mutex::new(Some(rx)),
        }
    }

    pub fn push(&self, task: Task) -> Result<(), StoreError> {
        self.tx.send(task).map_err(|_| StoreError::QueueClosed)
    }

    pub(crate) fn sender(&self) -> Sender<Task> {
        self.tx.clone()
    }

    /// Hand out the consuming end. Only the first call gets it.
    pub(crate) fn take_receiver(&self) -> Result<Receiver<Task>, StoreError> {
        let mut rx = self
            .rx
            .lock()
            .map_err(|_| StoreError::LockPoisoned("take task receiver"))?;
        rx.take().ok_or(StoreError::AlreadyRunning)
    }
}
