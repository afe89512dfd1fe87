//! Fixed-size worker pool with a shared FIFO task queue.
//!
//! Tasks whose dependencies are not met at submission are parked rather
//! than cycled through the queue; they move to the ready queue when the
//! last prerequisite completes. Callers block on a condition variable in
//! `wait_for_completion` until every submitted task has finished.

use std::collections::VecDeque;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use core_affinity::CoreId;
use serde::{Deserialize, Serialize};

use crate::{TaskError, TaskRef, TaskResult};

/// Worker pool configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of worker threads
    pub threads: usize,
    /// Pin each worker to its own core, leaving core 0 to the caller
    pub pin_workers: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        let cores = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(2);

        Self {
            threads: cores.saturating_sub(1).max(1),
            pin_workers: true,
        }
    }
}

impl PoolConfig {
    /// Unpinned pool with an explicit thread count.
    pub fn with_threads(threads: usize) -> Self {
        Self {
            threads,
            pin_workers: false,
        }
    }
}

#[derive(Default)]
struct Queue {
    ready: VecDeque<TaskRef>,
    parked: Vec<TaskRef>,
    exiting: bool,
}

struct Shared {
    queue: Mutex<Queue>,
    work_available: Condvar,
    all_done: Condvar,
    pending: AtomicUsize,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Block until a ready task is available. `None` once the pool exits.
    fn next_task(&self) -> Option<TaskRef> {
        let mut queue = self.lock();
        loop {
            if queue.exiting {
                return None;
            }
            if let Some(task) = queue.ready.pop_front() {
                return Some(task);
            }
            queue = self
                .work_available
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn park(&self, task: TaskRef) {
        let mut queue = self.lock();
        // Re-checked under the lock so a concurrent release cannot be missed
        if task.dependencies_remaining() {
            queue.parked.push(task);
        } else {
            queue.ready.push_back(task);
            drop(queue);
            self.work_available.notify_one();
        }
    }

    /// Move parked tasks whose last prerequisite just completed.
    fn release_parked(&self) {
        let mut queue = self.lock();
        let parked = std::mem::take(&mut queue.parked);
        let (ready, waiting): (Vec<_>, Vec<_>) = parked
            .into_iter()
            .partition(|task| !task.dependencies_remaining());
        queue.parked = waiting;

        if ready.is_empty() {
            return;
        }
        queue.ready.extend(ready);
        drop(queue);
        self.work_available.notify_all();
    }

    fn finish(&self, task: &TaskRef) {
        task.finish();
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            // Taken so a waiter between its check and its wait cannot miss this
            let _queue = self.lock();
            self.all_done.notify_all();
        }
    }
}

struct Worker {
    index: usize,
    exit: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

fn worker_loop(index: usize, shared: &Shared, exit: &AtomicBool, core: Option<CoreId>) {
    if let Some(core) = core {
        if !core_affinity::set_for_current(core) {
            log::debug!("Worker {}: could not pin to core {}", index, core.id);
        }
    }
    log::trace!("Worker {} started", index);

    while !exit.load(Ordering::Acquire) {
        let Some(task) = shared.next_task() else {
            break;
        };

        if task.dependencies_remaining() {
            log::warn!("Worker {}: task has unmet dependencies, parking it", index);
            shared.park(task);
            continue;
        }

        if panic::catch_unwind(AssertUnwindSafe(|| task.run())).is_err() {
            log::error!("Worker {}: task panicked", index);
        }

        if task.release_dependents() {
            shared.release_parked();
        }
        shared.finish(&task);
    }

    log::trace!("Worker {} exiting", index);
}

/// Pick the core for a worker, skipping core 0.
fn worker_core(cores: &[CoreId], index: usize) -> Option<CoreId> {
    if cores.len() < 2 {
        return None;
    }
    Some(cores[1 + index % (cores.len() - 1)])
}

/// A fixed set of worker threads consuming a shared task queue.
///
/// The pool never owns the work it runs beyond the queue's shared
/// handles; callers keep their tasks and may resubmit them once
/// `wait_for_completion` returns.
pub struct ThreadPool {
    shared: Arc<Shared>,
    workers: Vec<Worker>,
}

impl ThreadPool {
    /// Spawn the worker threads.
    pub fn new(config: PoolConfig) -> TaskResult<Self> {
        if config.threads == 0 {
            return Err(TaskError::ZeroThreads);
        }

        let cores = if config.pin_workers {
            core_affinity::get_core_ids().unwrap_or_default()
        } else {
            Vec::new()
        };
        if config.pin_workers && cores.len() < 2 {
            log::debug!("Not enough cores to pin workers, leaving placement to the OS");
        }

        // Built incrementally so a spawn failure still joins earlier workers on drop
        let mut pool = Self {
            shared: Arc::new(Shared {
                queue: Mutex::new(Queue::default()),
                work_available: Condvar::new(),
                all_done: Condvar::new(),
                pending: AtomicUsize::new(0),
            }),
            workers: Vec::with_capacity(config.threads),
        };

        for index in 0..config.threads {
            let exit = Arc::new(AtomicBool::new(false));
            let core = worker_core(&cores, index);
            let handle = thread::Builder::new()
                .name(format!("tessel-worker-{}", index))
                .spawn({
                    let shared = Arc::clone(&pool.shared);
                    let exit = Arc::clone(&exit);
                    move || worker_loop(index, &shared, &exit, core)
                })?;

            pool.workers.push(Worker {
                index,
                exit,
                handle: Some(handle),
            });
        }

        log::debug!(
            "Started thread pool with {} workers (pinned: {})",
            config.threads,
            config.pin_workers && cores.len() >= 2
        );
        Ok(pool)
    }

    /// Submit a task.
    ///
    /// Clears its completion flag. A task with unmet dependencies is held
    /// back until its prerequisites complete.
    pub fn add_task(&self, task: TaskRef) -> TaskResult<()> {
        let mut queue = self.shared.lock();
        if queue.exiting {
            return Err(TaskError::PoolExited);
        }
        if !task.mark_queued() {
            return Err(TaskError::AlreadyQueued);
        }
        self.shared.pending.fetch_add(1, Ordering::AcqRel);

        if task.dependencies_remaining() {
            queue.parked.push(task);
            return Ok(());
        }

        queue.ready.push_back(task);
        drop(queue);
        self.shared.work_available.notify_one();
        Ok(())
    }

    /// Block until every submitted task has completed.
    ///
    /// Returns immediately once the pool has exited.
    pub fn wait_for_completion(&self) {
        let mut queue = self.shared.lock();
        while self.shared.pending.load(Ordering::Acquire) > 0 && !queue.exiting {
            queue = self
                .shared
                .all_done
                .wait(queue)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Tasks submitted but not yet completed.
    pub fn pending(&self) -> usize {
        self.shared.pending.load(Ordering::Acquire)
    }

    pub fn thread_count(&self) -> usize {
        self.workers.len()
    }

    pub fn has_exited(&self) -> bool {
        self.shared.lock().exiting
    }

    /// Stop and join all workers. Tasks still queued are never run.
    ///
    /// Safe to call more than once.
    pub fn exit(&mut self) -> TaskResult<()> {
        for worker in &self.workers {
            worker.exit.store(true, Ordering::Release);
        }

        {
            let mut queue = self.shared.lock();
            queue.exiting = true;
        }
        self.shared.work_available.notify_all();
        self.shared.all_done.notify_all();

        let mut result = Ok(());
        for worker in &mut self.workers {
            if let Some(handle) = worker.handle.take() {
                if handle.join().is_err() {
                    result = Err(TaskError::WorkerPanicked(worker.index));
                }
            }
        }
        result
    }
}

impl Drop for ThreadPool {
    fn drop(&mut self) {
        if let Err(e) = self.exit() {
            log::error!("Thread pool shutdown: {}", e);
        }
    }
}
