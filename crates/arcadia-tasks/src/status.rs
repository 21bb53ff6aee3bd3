use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Point-in-time copy of a task's status surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskSnapshot {
    pub title: String,
    pub progress: u8,
    pub finished: bool,
}

#[derive(Debug)]
struct StatusInner {
    title: String,
    progress: u8,
    finished: bool,
    /// Handler and completion callback have both returned.
    done: bool,
}

#[derive(Debug)]
struct TaskShared {
    status: Mutex<StatusInner>,
    done_cv: Condvar,
    cancelled: AtomicBool,
}

/// Writer side of the status surface, handed to the running task.
#[derive(Debug, Clone)]
pub struct TaskContext {
    shared: Arc<TaskShared>,
}

impl TaskContext {
    pub(crate) fn new(title: impl Into<String>) -> Self {
        Self {
            shared: Arc::new(TaskShared {
                status: Mutex::new(StatusInner {
                    title: title.into(),
                    progress: 0,
                    finished: false,
                    done: false,
                }),
                done_cv: Condvar::new(),
                cancelled: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn handle(&self) -> TaskHandle {
        TaskHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Clamped to 100. Ignored once the task has finished.
    pub fn set_progress(&self, percent: u8) {
        let mut status = self.shared.status.lock();
        if status.finished {
            return;
        }
        status.progress = percent.min(100);
    }

    pub fn set_title(&self, title: impl Into<String>) {
        self.shared.status.lock().title = title.into();
    }

    /// Marks the task finished: progress 100 and the final title in one step.
    /// The finished flag never resets.
    pub fn finish(&self, title: impl Into<String>) {
        let mut status = self.shared.status.lock();
        status.title = title.into();
        status.progress = 100;
        status.finished = true;
    }

    pub fn is_finished(&self) -> bool {
        self.shared.status.lock().finished
    }

    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    pub(crate) fn mark_done(&self) {
        let mut status = self.shared.status.lock();
        status.done = true;
        self.shared.done_cv.notify_all();
    }
}

/// Poll-based view of a queued task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    shared: Arc<TaskShared>,
}

impl TaskHandle {
    pub fn progress(&self) -> u8 {
        self.shared.status.lock().progress
    }

    pub fn title(&self) -> String {
        self.shared.status.lock().title.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.shared.status.lock().finished
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        let status = self.shared.status.lock();
        TaskSnapshot {
            title: status.title.clone(),
            progress: status.progress,
            finished: status.finished,
        }
    }

    /// Requests cooperative cancellation. Tasks observe it at their own
    /// checkpoints.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::Release);
    }

    /// Blocks until the handler and its completion callback have returned.
    pub fn wait(&self) -> TaskSnapshot {
        let mut status = self.shared.status.lock();
        while !status.done {
            self.shared.done_cv.wait(&mut status);
        }
        TaskSnapshot {
            title: status.title.clone(),
            progress: status.progress,
            finished: status.finished,
        }
    }

    /// Like [`TaskHandle::wait`] but gives up after `timeout`.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<TaskSnapshot> {
        let mut status = self.shared.status.lock();
        if !status.done {
            let _ = self.shared.done_cv.wait_while_for(
                &mut status,
                |status| !status.done,
                timeout,
            );
        }
        status.done.then(|| TaskSnapshot {
            title: status.title.clone(),
            progress: status.progress,
            finished: status.finished,
        })
    }
}
