use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;

use crate::status::{TaskContext, TaskHandle};

const TITLE_TASK_FAILED: &str = "Task failed.";

/// How a task shares the queue with other tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskKind {
    /// No other task runs while this one does.
    Exclusive,
    /// May overlap other concurrent tasks.
    Concurrent,
}

/// A unit of work executed by [`TaskQueue`].
pub trait Task: Send + 'static {
    /// Payload handed to the completion callback.
    type Output: Send + 'static;

    fn kind(&self) -> TaskKind {
        TaskKind::Exclusive
    }

    /// Title shown before the handler starts.
    fn title(&self) -> String;

    /// Runs to completion without yielding. Returning `Some` after finishing
    /// the context hands the payload to the completion callback.
    fn run(&mut self, ctx: &TaskContext) -> Option<Self::Output>;
}

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("task queue has been shut down")]
    ShutDown,
    #[error("task queue needs at least one worker")]
    NoWorkers,
    #[error("failed to spawn task worker: {0}")]
    Spawn(#[from] std::io::Error),
}

type Job = Box<dyn FnOnce(&ExclusivityGate) + Send>;

/// Readers are concurrent tasks, the writer is the exclusive task.
#[derive(Debug, Default)]
struct ExclusivityGate {
    lock: RwLock<()>,
}

/// Held for the duration of a handler; exactly one guard is set.
struct Permit<'a> {
    _shared: Option<RwLockReadGuard<'a, ()>>,
    _exclusive: Option<RwLockWriteGuard<'a, ()>>,
}

impl ExclusivityGate {
    fn acquire(&self, kind: TaskKind) -> Permit<'_> {
        match kind {
            TaskKind::Exclusive => Permit {
                _shared: None,
                _exclusive: Some(self.lock.write()),
            },
            TaskKind::Concurrent => Permit {
                _shared: Some(self.lock.read()),
                _exclusive: None,
            },
        }
    }
}

/// Marks the task done on every exit, including a panicking handler.
struct DoneGuard<'a>(&'a TaskContext);

impl Drop for DoneGuard<'_> {
    fn drop(&mut self) {
        self.0.mark_done();
    }
}

/// FIFO task queue served by a fixed set of worker threads.
pub struct TaskQueue {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl TaskQueue {
    /// Single worker: tasks run strictly one at a time.
    pub fn new() -> Result<Self, QueueError> {
        Self::with_workers(1)
    }

    pub fn with_workers(count: usize) -> Result<Self, QueueError> {
        if count == 0 {
            return Err(QueueError::NoWorkers);
        }
        let (sender, receiver) = unbounded::<Job>();
        let gate = Arc::new(ExclusivityGate::default());
        let mut workers = Vec::with_capacity(count);
        for index in 0..count {
            let receiver: Receiver<Job> = receiver.clone();
            let gate = Arc::clone(&gate);
            let handle = thread::Builder::new()
                .name(format!("arcadia-task-{index}"))
                .spawn(move || {
                    for job in receiver.iter() {
                        job(gate.as_ref());
                    }
                    tracing::trace!(worker = index, "task worker exiting");
                });
            match handle {
                Ok(handle) => workers.push(handle),
                Err(err) => {
                    drop(sender);
                    for worker in workers {
                        let _ = worker.join();
                    }
                    return Err(QueueError::Spawn(err));
                }
            }
        }
        Ok(Self {
            sender: Some(sender),
            workers,
        })
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Enqueues `task`. On error nothing was enqueued.
    ///
    /// `on_complete` runs on the worker after the handler returns, only when
    /// the handler finished the task and produced a payload.
    pub fn push<T, F>(&self, task: T, on_complete: F) -> Result<TaskHandle, QueueError>
    where
        T: Task,
        F: FnOnce(T::Output, &TaskContext) + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(QueueError::ShutDown)?;
        let ctx = TaskContext::new(task.title());
        let handle = ctx.handle();
        let job: Job = Box::new(move |gate: &ExclusivityGate| {
            run_job(task, ctx, on_complete, gate)
        });
        sender.send(job).map_err(|_| QueueError::ShutDown)?;
        Ok(handle)
    }

    /// Stops accepting tasks, drains the queue and joins the workers.
    pub fn shutdown(&mut self) {
        self.sender.take();
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                tracing::error!("task worker panicked");
            }
        }
    }
}

impl Drop for TaskQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_job<T, F>(mut task: T, ctx: TaskContext, on_complete: F, gate: &ExclusivityGate)
where
    T: Task,
    F: FnOnce(T::Output, &TaskContext),
{
    let _done = DoneGuard(&ctx);
    let output = {
        let _permit = gate.acquire(task.kind());
        match panic::catch_unwind(AssertUnwindSafe(|| task.run(&ctx))) {
            Ok(output) => output,
            Err(_) => {
                tracing::error!(title = %task.title(), "task handler panicked");
                ctx.finish(TITLE_TASK_FAILED);
                None
            }
        }
    };
    match output {
        Some(output) if ctx.is_finished() => on_complete(output, &ctx),
        Some(_) => tracing::warn!("task returned a payload without finishing; dropping it"),
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;

    struct Counting {
        kind: TaskKind,
        running: Arc<AtomicUsize>,
        overlap: Arc<AtomicUsize>,
        exclusive_running: Arc<AtomicUsize>,
    }

    impl Task for Counting {
        type Output = ();

        fn kind(&self) -> TaskKind {
            self.kind
        }

        fn title(&self) -> String {
            "counting".into()
        }

        fn run(&mut self, ctx: &TaskContext) -> Option<()> {
            let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
            if self.kind == TaskKind::Exclusive {
                self.exclusive_running.fetch_add(1, Ordering::SeqCst);
                if now > 1 {
                    self.overlap.fetch_add(1, Ordering::SeqCst);
                }
            } else if self.exclusive_running.load(Ordering::SeqCst) > 0 {
                self.overlap.fetch_add(1, Ordering::SeqCst);
            }
            thread::sleep(Duration::from_millis(5));
            if self.kind == TaskKind::Exclusive {
                self.exclusive_running.fetch_sub(1, Ordering::SeqCst);
            }
            self.running.fetch_sub(1, Ordering::SeqCst);
            ctx.finish("done");
            None
        }
    }

    struct Echo(u32);

    impl Task for Echo {
        type Output = u32;

        fn title(&self) -> String {
            "echo".into()
        }

        fn run(&mut self, ctx: &TaskContext) -> Option<u32> {
            ctx.finish("echoed");
            Some(self.0)
        }
    }

    struct Unfinished;

    impl Task for Unfinished {
        type Output = u32;

        fn title(&self) -> String {
            "unfinished".into()
        }

        fn run(&mut self, _ctx: &TaskContext) -> Option<u32> {
            Some(7)
        }
    }

    struct Panics;

    impl Task for Panics {
        type Output = ();

        fn title(&self) -> String {
            "panics".into()
        }

        fn run(&mut self, _ctx: &TaskContext) -> Option<()> {
            panic!("handler exploded");
        }
    }

    #[test]
    fn exclusive_tasks_never_overlap_other_tasks() {
        let queue = TaskQueue::with_workers(4).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let overlap = Arc::new(AtomicUsize::new(0));
        let exclusive_running = Arc::new(AtomicUsize::new(0));
        let mut handles = Vec::new();
        for i in 0..24 {
            let kind = if i % 3 == 0 {
                TaskKind::Exclusive
            } else {
                TaskKind::Concurrent
            };
            let task = Counting {
                kind,
                running: Arc::clone(&running),
                overlap: Arc::clone(&overlap),
                exclusive_running: Arc::clone(&exclusive_running),
            };
            handles.push(queue.push(task, |_, _| {}).unwrap());
        }
        for handle in handles {
            assert!(handle.wait().finished);
        }
        assert_eq!(overlap.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn callback_receives_payload_once() {
        let queue = TaskQueue::new().unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let handle = queue
            .push(Echo(42), move |value, _| sink.lock().push(value))
            .unwrap();
        let snapshot = handle.wait();
        assert_eq!(snapshot.title, "echoed");
        assert_eq!(*seen.lock(), vec![42]);
    }

    #[test]
    fn payload_without_finish_skips_callback() {
        let queue = TaskQueue::new().unwrap();
        let called = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&called);
        let handle = queue
            .push(Unfinished, move |_, _| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert!(!handle.wait().finished);
        assert_eq!(called.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn panicking_handler_finishes_with_failure_title() {
        let queue = TaskQueue::new().unwrap();
        let handle = queue.push(Panics, |_, _| {}).unwrap();
        let snapshot = handle.wait();
        assert!(snapshot.finished);
        assert_eq!(snapshot.title, TITLE_TASK_FAILED);
        let next = queue.push(Echo(1), |_, _| {}).unwrap();
        assert!(next.wait().finished);
    }

    #[test]
    fn push_after_shutdown_fails() {
        let mut queue = TaskQueue::new().unwrap();
        queue.shutdown();
        assert!(matches!(
            queue.push(Echo(1), |_, _| {}),
            Err(QueueError::ShutDown)
        ));
    }

    #[test]
    fn zero_workers_is_rejected() {
        assert!(matches!(
            TaskQueue::with_workers(0),
            Err(QueueError::NoWorkers)
        ));
    }
}
