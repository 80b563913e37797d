//! FIFO scheduling with a concurrency cap, the session gate and the retry path.

use std::collections::VecDeque;
use std::pin::pin;
use std::sync::{Arc, Mutex};

use tokio::sync::Notify;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::progress::{ProgressEstimator, ProgressSink};
use crate::registry::TaskRegistry;
use crate::task::{ByteSource, Task, TaskId, TaskStatus};
use crate::transport::{AttemptOutcome, ProgressFn, Transport};

/// The transfer engine: owns the FIFO queue, the active counter, the
/// one-shot session flag and the retry store.
///
/// Cloning is cheap and shares the same engine. Collaborators get a clone
/// through dependency injection; there are no ambient globals.
///
/// Dispatches are spawned onto the ambient tokio runtime, so the engine must
/// be used from within one.
pub struct Engine<T: Transport> {
    inner: Arc<Inner<T>>,
}

impl<T: Transport> Clone for Engine<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<T: Transport> {
    transport: T,
    config: EngineConfig,
    registry: TaskRegistry,
    sink: Arc<dyn ProgressSink>,
    state: Mutex<SchedState>,
    idle: Notify,
}

struct SchedState {
    queue: VecDeque<Task>,
    active: usize,
    session_verified: bool,
}

impl<T: Transport + 'static> Engine<T> {
    /// Creates an engine over `transport`. A zero concurrency cap is
    /// normalized to 1.
    #[must_use]
    pub fn new(transport: T, config: EngineConfig, sink: Arc<dyn ProgressSink>) -> Self {
        let config = EngineConfig {
            max_concurrent: config.max_concurrent.max(1),
            ..config
        };
        Self {
            inner: Arc::new(Inner {
                transport,
                config,
                registry: TaskRegistry::new(),
                sink,
                state: Mutex::new(SchedState {
                    queue: VecDeque::new(),
                    active: 0,
                    session_verified: false,
                }),
                idle: Notify::new(),
            }),
        }
    }

    /// Creates a task with a freshly allocated id.
    #[must_use]
    pub fn new_task(&self, relative_path: impl Into<String>, source: Arc<dyn ByteSource>) -> Task {
        Task::new(self.inner.registry.alloc_id(), relative_path, source)
    }

    /// Appends a task to the tail of the FIFO queue and runs the dispatcher.
    pub fn enqueue(&self, mut task: Task) {
        task.set_status(TaskStatus::Queued);
        self.inner.sink.on_task_queued(task.id(), task.relative_path());
        self.inner.state.lock().unwrap().queue.push_back(task);
        self.run_queue();
    }

    /// Dispatches the head of the queue if capacity allows.
    ///
    /// Idempotent and re-entrant safe: a no-op when the cap is reached or the
    /// queue is empty. Each terminal transition calls this again, so the
    /// queue drains without external polling.
    pub fn run_queue(&self) {
        let (task, verify) = {
            let mut state = self.inner.state.lock().unwrap();
            if state.active >= self.inner.config.max_concurrent {
                return;
            }
            let Some(mut task) = state.queue.pop_front() else {
                return;
            };
            state.active += 1;
            // Set the flag before the round-trip; a failure resets it so the
            // next dispatch tries again.
            let verify = self.inner.config.verify_session && !state.session_verified;
            if verify {
                state.session_verified = true;
            }
            task.set_status(TaskStatus::Active);
            (task, verify)
        };
        self.inner.sink.on_task_started(task.id(), task.relative_path());
        let engine = self.clone();
        tokio::spawn(async move {
            engine.drive(task, verify).await;
        });
    }

    /// Retries a failed task, resuming from the byte offset the server
    /// reports for its destination path.
    ///
    /// The task is dispatched immediately, bypassing the FIFO queue; it
    /// still counts against the active counter so queue dispatches throttle
    /// while it runs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownTask`] when `id` is not in the retry store,
    /// or the probe error when the length probe fails; the task then stays
    /// failed with its resume offset unchanged.
    pub async fn retry(&self, id: TaskId) -> Result<()> {
        let Some(mut task) = self.inner.registry.take_failed(id) else {
            return Err(Error::UnknownTask(id));
        };

        let offset = match self.inner.transport.probe(task.relative_path()).await {
            Ok(len) => len.unwrap_or(0),
            Err(e) => {
                self.inner.registry.record_failure(task);
                return Err(e);
            }
        };

        task.set_resume_offset(offset);
        task.set_status(TaskStatus::Active);
        self.inner.state.lock().unwrap().active += 1;
        self.inner.sink.on_task_started(task.id(), task.relative_path());
        let engine = self.clone();
        tokio::spawn(async move {
            engine.drive(task, false).await;
        });
        Ok(())
    }

    async fn drive(&self, task: Task, verify: bool) {
        if verify {
            // Verification failure is non-fatal; the attempt proceeds anyway.
            if let Err(e) = self.inner.transport.verify_session().await {
                log::warn!("session verification failed: {e}");
                self.inner.state.lock().unwrap().session_verified = false;
            }
        }

        let estimator = Arc::new(Mutex::new(ProgressEstimator::new(
            task.resume_offset(),
            task.total_size(),
        )));
        let sink = Arc::clone(&self.inner.sink);
        let id = task.id();
        let on_progress: ProgressFn = Arc::new(move |sample| {
            let snapshot = estimator.lock().unwrap().record(sample);
            sink.on_progress(id, &snapshot);
        });

        let outcome = self.inner.transport.attempt(&task, on_progress).await;
        self.finish(task, outcome);
    }

    /// Records a terminal transition, then decrements the active counter and
    /// re-runs the dispatcher, in that order, so the cap is never observably
    /// exceeded and a task is never double-counted.
    fn finish(&self, mut task: Task, outcome: AttemptOutcome) {
        let id = task.id();
        if outcome.is_success() {
            task.set_status(TaskStatus::Completed);
            self.inner.registry.discard(id);
            self.inner.sink.on_task_completed(id);
            log::debug!("task {id} completed: {}", task.relative_path());
        } else {
            task.set_status(TaskStatus::Failed);
            let reason = outcome.failure_reason();
            self.inner.sink.on_task_failed(id, reason.as_deref());
            log::debug!(
                "task {id} failed: {} ({})",
                task.relative_path(),
                reason.as_deref().unwrap_or("aborted")
            );
            self.inner.registry.record_failure(task);
        }

        let idle = {
            let mut state = self.inner.state.lock().unwrap();
            state.active -= 1;
            state.active == 0 && state.queue.is_empty()
        };
        if idle {
            self.inner.idle.notify_waiters();
        }
        self.run_queue();
    }

    /// Waits until no task is queued or active.
    ///
    /// Returns immediately when the engine is already idle.
    pub async fn wait_idle(&self) {
        loop {
            let mut notified = pin!(self.inner.idle.notified());
            notified.as_mut().enable();
            {
                let state = self.inner.state.lock().unwrap();
                if state.active == 0 && state.queue.is_empty() {
                    return;
                }
            }
            notified.await;
        }
    }

    /// Number of tasks currently active.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.inner.state.lock().unwrap().active
    }

    /// Number of tasks waiting in the queue.
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.inner.state.lock().unwrap().queue.len()
    }

    /// Ids and destination paths of all failed tasks, in id order.
    #[must_use]
    pub fn failed_tasks(&self) -> Vec<(TaskId, String)> {
        self.inner.registry.failed_tasks()
    }

    /// Number of tasks in the retry store.
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.inner.registry.failed_count()
    }
}
