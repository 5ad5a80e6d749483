//! Submission queue, worker promises, and cancellation.
//!
//! Asynchronous submissions enqueue onto a FIFO drained by the worker
//! pool. Each task carries a promise slot its caller can block on.
//! Cancellation is only meaningful before a worker dequeues the task;
//! an executing task runs to completion and delivers normally.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use crate::audio::AudioBuffer;
use crate::types::{Status, TtsRequest, TtsResult};

/// Callback invoked with the audio of a successful submission.
pub type AudioCallback = Box<dyn Fn(&AudioBuffer) + Send + Sync>;

/// Shared promise state behind a [`SynthesisHandle`].
pub(crate) struct TaskState {
    slot: Mutex<Option<TtsResult>>,
    cv: Condvar,
}

impl TaskState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            slot: Mutex::new(None),
            cv: Condvar::new(),
        })
    }

    pub fn fulfill(&self, result: TtsResult) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.is_none() {
            *slot = Some(result);
            self.cv.notify_all();
        }
    }

    pub fn wait(&self) -> TtsResult {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(result) = slot.as_ref() {
                return result.clone();
            }
            slot = self.cv.wait(slot).unwrap_or_else(|e| e.into_inner());
        }
    }

    pub fn wait_timeout(&self, timeout: Duration) -> Option<TtsResult> {
        let deadline = std::time::Instant::now() + timeout;
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if let Some(result) = slot.as_ref() {
                return Some(result.clone());
            }
            let remaining = deadline.checked_duration_since(std::time::Instant::now())?;
            let (guard, timed_out) = self
                .cv
                .wait_timeout(slot, remaining)
                .unwrap_or_else(|e| e.into_inner());
            slot = guard;
            if timed_out.timed_out() && slot.is_none() {
                return None;
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }
}

/// Handle to an asynchronous synthesis; resolves to the same result type
/// the synchronous path returns.
pub struct SynthesisHandle {
    pub(crate) state: Arc<TaskState>,
    pub(crate) id: String,
}

impl SynthesisHandle {
    /// Request id usable with cancel / completion queries.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Block until the result is available.
    pub fn wait(&self) -> TtsResult {
        self.state.wait()
    }

    /// Block up to `timeout`; `None` when the result is still pending.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<TtsResult> {
        self.state.wait_timeout(timeout)
    }

    /// Non-blocking poll.
    pub fn try_get(&self) -> Option<TtsResult> {
        let slot = self
            .state
            .slot
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        slot.clone()
    }

    pub fn is_complete(&self) -> bool {
        self.state.is_complete()
    }
}

pub(crate) struct QueuedTask {
    pub id: String,
    pub request: TtsRequest,
    pub state: Arc<TaskState>,
    pub callback: Option<AudioCallback>,
}

/// FIFO submission queue shared between the engine and its workers.
pub(crate) struct TaskQueue {
    queue: Mutex<VecDeque<QueuedTask>>,
    cv: Condvar,
    stopping: AtomicBool,
    active: AtomicUsize,
}

impl TaskQueue {
    pub fn new() -> Self {
        Self {
            queue: Mutex::new(VecDeque::new()),
            cv: Condvar::new(),
            stopping: AtomicBool::new(false),
            active: AtomicUsize::new(0),
        }
    }

    /// Enqueue a task; fulfills immediately with `Cancelled` if the queue
    /// has begun shutdown.
    pub fn push(&self, task: QueuedTask) {
        if self.stopping.load(Ordering::Acquire) {
            task.state
                .fulfill(TtsResult::failure(Status::Cancelled, "engine shutting down"));
            return;
        }
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        queue.push_back(task);
        self.cv.notify_one();
    }

    /// Block for the next task; `None` means the queue is shutting down
    /// and the worker should exit. Once shutdown is signalled, queued
    /// tasks are left for `drain_cancelled` rather than executed.
    pub fn pop_blocking(&self) -> Option<QueuedTask> {
        let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
        loop {
            if self.stopping.load(Ordering::Acquire) {
                return None;
            }
            if let Some(task) = queue.pop_front() {
                return Some(task);
            }
            queue = self.cv.wait(queue).unwrap_or_else(|e| e.into_inner());
        }
    }

    /// Remove a task by id before any worker picked it up, completing its
    /// promise with `Cancelled`. Returns false when the task is no longer
    /// queued (already executing, finished, or unknown).
    pub fn cancel(&self, id: &str) -> bool {
        let task = {
            let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
            let index = queue.iter().position(|task| task.id == id);
            index.and_then(|i| queue.remove(i))
        };
        match task {
            Some(task) => {
                task.state
                    .fulfill(TtsResult::failure(Status::Cancelled, "request cancelled"));
                true
            }
            None => false,
        }
    }

    pub fn len(&self) -> usize {
        self.queue.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn active_count(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    pub fn begin_work(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn end_work(&self) {
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Signal shutdown and wake every waiting worker.
    pub fn stop(&self) {
        self.stopping.store(true, Ordering::Release);
        self.cv.notify_all();
    }

    /// Complete every queued-but-unstarted task with `Cancelled`.
    pub fn drain_cancelled(&self) {
        let drained: Vec<QueuedTask> = {
            let mut queue = self.queue.lock().unwrap_or_else(|e| e.into_inner());
            queue.drain(..).collect()
        };
        for task in drained {
            task.state
                .fulfill(TtsResult::failure(Status::Cancelled, "engine shut down"));
        }
    }
}
