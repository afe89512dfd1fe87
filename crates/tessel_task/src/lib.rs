//! Tessel task scheduling.
//!
//! A small fixed-size worker pool that runs coarse-grained tasks with
//! single-level dependency counts. Used by the renderer to dispatch image
//! tiles, but nothing in here knows about rendering.
//!
//! # Example
//!
//! ```ignore
//! use tessel_task::{PoolConfig, Task, TaskRef, ThreadPool, Work};
//!
//! struct Print(&'static str);
//! impl Work for Print {
//!     fn run(&self) {
//!         println!("{}", self.0);
//!     }
//! }
//!
//! let pool = ThreadPool::new(PoolConfig::default())?;
//! let first: TaskRef = Task::new(Print("first"));
//! let second: TaskRef = Task::new(Print("second"));
//! second.depends_on(&first)?;
//!
//! pool.add_task(second.clone())?;
//! pool.add_task(first.clone())?;
//! pool.wait_for_completion();
//! ```

mod error;
mod pool;
mod task;

pub use error::{TaskError, TaskResult};
pub use pool::{PoolConfig, ThreadPool};
pub use task::{Task, TaskRef, Work};
