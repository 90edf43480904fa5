//! PDF Snapshot Scheduler Library
//!
//! Bounded worker pool and cooperative cancellation for render jobs.
//!
//! # Example
//!
//! ```
//! use pdf_snapshot_scheduler::{CancellationToken, WorkerPool, WorkerPoolConfig};
//! use std::sync::mpsc;
//!
//! let pool = WorkerPool::new(WorkerPoolConfig::new(2)).unwrap();
//! let token = CancellationToken::new();
//! let (tx, rx) = mpsc::channel();
//!
//! let worker_token = token.clone();
//! pool.submit(move || {
//!     if !worker_token.is_cancelled() {
//!         tx.send("rendered").unwrap();
//!     }
//! })
//! .unwrap();
//!
//! assert_eq!(rx.recv().unwrap(), "rendered");
//! pool.shutdown();
//! ```

mod cancel;
mod worker;

pub use cancel::CancellationToken;
pub use worker::{PoolError, Task, WorkerPool, WorkerPoolConfig};
