//! Render worker pool for parallel job execution.
//!
//! A fixed set of worker threads pulls boxed tasks from a shared FIFO queue.
//! The number of threads is the hard bound on how many renders run at once.

use log::{debug, warn};
use parking_lot::{Condvar, Mutex};
use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Default number of concurrent renders.
pub const DEFAULT_NUM_WORKERS: usize = 4;

/// A unit of work executed by the pool.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Errors reported by the worker pool.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// The pool no longer accepts work
    #[error("worker pool has been shut down")]
    ShutDown,

    /// A worker thread could not be started
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Configuration for the render worker pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerPoolConfig {
    /// Number of worker threads, i.e. the maximum parallelism.
    /// Default: 4. Zero is treated as one.
    pub num_workers: usize,

    /// Prefix for worker thread names; the worker index is appended.
    pub thread_name_prefix: String,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self::new(DEFAULT_NUM_WORKERS)
    }
}

impl WorkerPoolConfig {
    /// Create a configuration with `num_workers` threads.
    pub fn new(num_workers: usize) -> Self {
        Self {
            num_workers,
            thread_name_prefix: "pdf-render-worker".to_string(),
        }
    }

    /// Set the thread name prefix.
    pub fn with_thread_name_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.thread_name_prefix = prefix.into();
        self
    }
}

struct Queue {
    tasks: VecDeque<Task>,
    active: usize,
    shutdown: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    available: Condvar,
}

/// Render worker pool for parallel job execution.
///
/// Tasks run in submission order on at most `num_workers` threads at a time.
/// After [`shutdown`](WorkerPool::shutdown) no new tasks are accepted; tasks
/// already queued still run before the workers exit, so every submitted task
/// executes exactly once.
pub struct WorkerPool {
    shared: Arc<Shared>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    num_workers: usize,
}

impl WorkerPool {
    /// Create and start a new worker pool.
    pub fn new(config: WorkerPoolConfig) -> Result<Self, PoolError> {
        let num_workers = config.num_workers.max(1);
        let shared = Arc::new(Shared {
            queue: Mutex::new(Queue {
                tasks: VecDeque::new(),
                active: 0,
                shutdown: false,
            }),
            available: Condvar::new(),
        });

        let pool = Self {
            shared,
            workers: Mutex::new(Vec::with_capacity(num_workers)),
            num_workers,
        };

        for id in 0..num_workers {
            let shared = Arc::clone(&pool.shared);
            let spawned = thread::Builder::new()
                .name(format!("{}-{}", config.thread_name_prefix, id))
                .spawn(move || run(shared));

            match spawned {
                Ok(handle) => pool.workers.lock().push(handle),
                Err(err) => {
                    // Dropping the pool stops the workers started so far
                    return Err(PoolError::Spawn(err));
                }
            }
        }

        debug!("worker pool started with {} workers", num_workers);
        Ok(pool)
    }

    /// Queue a task for execution.
    pub fn submit<F>(&self, task: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let mut queue = self.shared.queue.lock();
        if queue.shutdown {
            return Err(PoolError::ShutDown);
        }
        queue.tasks.push_back(Box::new(task));
        drop(queue);

        self.shared.available.notify_one();
        Ok(())
    }

    /// Get the number of worker threads.
    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    /// Number of tasks waiting for a worker.
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().tasks.len()
    }

    /// Number of tasks currently executing.
    pub fn active(&self) -> usize {
        self.shared.queue.lock().active
    }

    /// Check if the worker pool is shutting down.
    pub fn is_shutting_down(&self) -> bool {
        self.shared.queue.lock().shutdown
    }

    /// Shut the pool down and wait for the workers to exit.
    ///
    /// Queued tasks are drained first. Calling this from inside a task skips
    /// joining the calling worker. Repeated calls are no-ops.
    pub fn shutdown(&self) {
        self.shared.queue.lock().shutdown = true;
        self.shared.available.notify_all();

        let current = thread::current().id();
        let workers: Vec<_> = self.workers.lock().drain(..).collect();
        for handle in workers {
            if handle.thread().id() == current {
                continue;
            }
            if handle.join().is_err() {
                warn!("render worker exited with a panic");
            }
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Main worker loop.
fn run(shared: Arc<Shared>) {
    loop {
        let task = {
            let mut queue = shared.queue.lock();
            loop {
                if let Some(task) = queue.tasks.pop_front() {
                    queue.active += 1;
                    break task;
                }
                if queue.shutdown {
                    return;
                }
                shared.available.wait(&mut queue);
            }
        };

        // A panicking task must not take the worker down with it
        if panic::catch_unwind(AssertUnwindSafe(task)).is_err() {
            warn!(
                "task panicked on {}",
                thread::current().name().unwrap_or("render worker")
            );
        }

        shared.queue.lock().active -= 1;
    }
}
