//! Background work for network calls.
//!
//! Each job runs on its own worker thread and reports back over a bounded
//! channel. The owning thread drains completions with [`TaskRunner::poll`]
//! (once per tick) or [`TaskRunner::wait`]. Only one generation may be in
//! flight at a time; model listings are not limited.

use crate::constants::TASK_CHANNEL_CAPACITY;
use crate::errors::{AppError, AppResult, TaskError};
use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender, TryRecvError};
use std::thread;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identifies one dispatched job.
pub type TaskId = Uuid;

/// Where a generation result belongs once it arrives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationTarget {
    pub folder: String,
    pub page: String,
    /// Function that produced the result
    pub function: String,
    /// Selection the content was taken from, in characters
    pub selection: Option<Range<usize>>,
}

/// What a finished job produced.
#[derive(Debug)]
pub enum TaskOutput {
    Generation {
        target: GenerationTarget,
        result: AppResult<String>,
    },
    Models {
        result: AppResult<Vec<String>>,
    },
}

#[derive(Debug)]
pub struct Completion {
    pub id: TaskId,
    pub output: TaskOutput,
}

/// Spawns workers and collects their completions.
#[derive(Debug)]
pub struct TaskRunner {
    sender: SyncSender<Completion>,
    receiver: Receiver<Completion>,
    generation: Option<TaskId>,
    pending: usize,
}

impl Default for TaskRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskRunner {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::sync_channel(TASK_CHANNEL_CAPACITY);
        TaskRunner {
            sender,
            receiver,
            generation: None,
            pending: 0,
        }
    }

    /// True while a generation's completion has not been drained.
    pub fn is_busy(&self) -> bool {
        self.generation.is_some()
    }

    /// Number of dispatched jobs whose completion has not been drained.
    pub fn pending(&self) -> usize {
        self.pending
    }

    /// Starts a generation job.
    ///
    /// # Errors
    ///
    /// Returns `TaskError::Busy` while another generation is in flight.
    pub fn spawn_generation<F>(&mut self, target: GenerationTarget, work: F) -> AppResult<TaskId>
    where
        F: FnOnce() -> AppResult<String> + Send + 'static,
    {
        if self.is_busy() {
            return Err(TaskError::Busy.into());
        }
        let id = self.spawn(work, move |result| TaskOutput::Generation { target, result })?;
        self.generation = Some(id);
        Ok(id)
    }

    /// Starts a model listing job.
    pub fn spawn_models<F>(&mut self, work: F) -> AppResult<TaskId>
    where
        F: FnOnce() -> AppResult<Vec<String>> + Send + 'static,
    {
        self.spawn(work, |result| TaskOutput::Models { result })
    }

    /// Takes one completion if any is ready.
    pub fn poll(&mut self) -> Option<Completion> {
        match self.receiver.try_recv() {
            Ok(completion) => Some(self.drained(completion)),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Blocks up to `timeout` for the next completion.
    ///
    /// Returns `Ok(None)` on timeout.
    pub fn wait(&mut self, timeout: Duration) -> AppResult<Option<Completion>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(completion) => Ok(Some(self.drained(completion))),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(TaskError::Disconnected.into()),
        }
    }

    fn spawn<T, F, W>(&mut self, work: F, wrap: W) -> AppResult<TaskId>
    where
        T: Send + 'static,
        F: FnOnce() -> AppResult<T> + Send + 'static,
        W: FnOnce(AppResult<T>) -> TaskOutput + Send + 'static,
    {
        let id = Uuid::new_v4();
        let sender = self.sender.clone();

        thread::Builder::new()
            .name(format!("folio-task-{}", id.simple()))
            .spawn(move || {
                let result = panic::catch_unwind(AssertUnwindSafe(work)).unwrap_or_else(|payload| {
                    Err(AppError::from(TaskError::WorkerPanicked(panic_message(&*payload))))
                });
                let completion = Completion {
                    id,
                    output: wrap(result),
                };
                if sender.send(completion).is_err() {
                    debug!("Task {} finished after its runner was dropped", id);
                }
            })?;

        self.pending += 1;
        debug!("Spawned task {}", id);
        Ok(id)
    }

    fn drained(&mut self, completion: Completion) -> Completion {
        self.pending = self.pending.saturating_sub(1);
        if self.generation == Some(completion.id) {
            self.generation = None;
        }
        debug!("Drained task {}", completion.id);
        completion
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let message = if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    };
    warn!("Worker panicked: {}", message);
    message
}
