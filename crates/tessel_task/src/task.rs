//! Dependency-counted units of work.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use crate::{TaskError, TaskResult};

/// The body of a task.
///
/// Implementors are shared with worker threads, so `run` takes `&self`;
/// anything mutated during a run needs its own interior mutability.
pub trait Work: Send + Sync {
    fn run(&self);
}

impl<F> Work for F
where
    F: Fn() + Send + Sync,
{
    fn run(&self) {
        self()
    }
}

/// Type-erased shared task handle, as stored by the pool.
pub type TaskRef = Arc<Task>;

/// A unit of work plus its scheduling state.
///
/// A task runs only once its dependency count is zero. When it completes,
/// each registered dependent has its count decremented exactly once.
/// Dependents are held weakly: the scheduler never keeps a task alive on
/// behalf of another one.
pub struct Task<W: ?Sized = dyn Work> {
    remaining: AtomicUsize,
    dependents: Mutex<Vec<Weak<Task>>>,
    complete: AtomicBool,
    queued: AtomicBool,
    work: W,
}

impl<W: Work> Task<W> {
    /// Wrap `work` in a new task with no dependencies.
    pub fn new(work: W) -> Arc<Self> {
        Arc::new(Self {
            remaining: AtomicUsize::new(0),
            dependents: Mutex::new(Vec::new()),
            complete: AtomicBool::new(false),
            queued: AtomicBool::new(false),
            work,
        })
    }
}

impl Task {
    /// Make `self` wait for `prerequisite`.
    ///
    /// Both tasks must be idle (not queued in any pool).
    pub fn depends_on(self: &Arc<Self>, prerequisite: &TaskRef) -> TaskResult<()> {
        if std::ptr::addr_eq(Arc::as_ptr(self), Arc::as_ptr(prerequisite)) {
            return Err(TaskError::SelfDependency);
        }
        if self.is_queued() || prerequisite.is_queued() {
            return Err(TaskError::AlreadySubmitted);
        }

        prerequisite.lock_dependents().push(Arc::downgrade(self));
        self.remaining.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }
}

impl<W: Work + ?Sized> Task<W> {
    /// Execute the task body.
    pub fn run(&self) {
        self.work.run();
    }

    /// Access the task body.
    pub fn work(&self) -> &W {
        &self.work
    }

    /// True while at least one prerequisite has not completed.
    pub fn dependencies_remaining(&self) -> bool {
        self.remaining.load(Ordering::Acquire) > 0
    }

    /// Number of prerequisites that have not completed.
    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    /// Record one completed prerequisite, returning the new count.
    pub fn clear_one_dependency(&self) -> usize {
        match self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
        {
            Ok(previous) => previous - 1,
            Err(_) => {
                log::warn!("clear_one_dependency called on a task with no dependencies");
                0
            }
        }
    }

    /// Number of live tasks waiting on this one.
    pub fn dependent_count(&self) -> usize {
        self.lock_dependents()
            .iter()
            .filter(|dependent| dependent.strong_count() > 0)
            .count()
    }

    /// True once the most recent submission has finished running.
    pub fn is_complete(&self) -> bool {
        self.complete.load(Ordering::Acquire)
    }

    /// True between submission and completion.
    pub fn is_queued(&self) -> bool {
        self.queued.load(Ordering::Acquire)
    }

    /// Claim the task for a pool. Fails if it is already queued.
    pub(crate) fn mark_queued(&self) -> bool {
        let claimed = self
            .queued
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        if claimed {
            self.complete.store(false, Ordering::Release);
        }
        claimed
    }

    /// Decrement every live dependent. Returns true if any became runnable.
    pub(crate) fn release_dependents(&self) -> bool {
        let mut released = false;
        for dependent in self.lock_dependents().iter().filter_map(Weak::upgrade) {
            if dependent.clear_one_dependency() == 0 {
                released = true;
            }
        }
        released
    }

    pub(crate) fn finish(&self) {
        self.complete.store(true, Ordering::Release);
        self.queued.store(false, Ordering::Release);
    }

    fn lock_dependents(&self) -> MutexGuard<'_, Vec<Weak<Task>>> {
        self.dependents.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: ?Sized> fmt::Debug for Task<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("remaining", &self.remaining.load(Ordering::Relaxed))
            .field("complete", &self.complete.load(Ordering::Relaxed))
            .field("queued", &self.queued.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    fn noop() -> TaskRef {
        Task::new(|| {})
    }

    #[test]
    fn test_depends_on_counts_and_registers() {
        let first = noop();
        let second = noop();
        let third = noop();

        third.depends_on(&first).unwrap();
        third.depends_on(&second).unwrap();

        assert_eq!(third.remaining(), 2);
        assert!(third.dependencies_remaining());
        assert_eq!(first.dependent_count(), 1);
        assert_eq!(second.dependent_count(), 1);
        assert!(!first.dependencies_remaining());
    }

    #[test]
    fn test_clear_one_dependency() {
        let first = noop();
        let second = noop();
        second.depends_on(&first).unwrap();

        assert_eq!(second.clear_one_dependency(), 0);
        assert!(!second.dependencies_remaining());

        // Extra clears do not wrap around
        assert_eq!(second.clear_one_dependency(), 0);
        assert_eq!(second.remaining(), 0);
    }

    #[test]
    fn test_release_dependents_reports_runnable() {
        let a = noop();
        let b = noop();
        let c = noop();
        c.depends_on(&a).unwrap();
        c.depends_on(&b).unwrap();

        assert!(!a.release_dependents());
        assert!(b.release_dependents());
        assert!(!c.dependencies_remaining());
    }

    #[test]
    fn test_dropped_dependent_is_skipped() {
        let a = noop();
        {
            let b = noop();
            b.depends_on(&a).unwrap();
            assert_eq!(a.dependent_count(), 1);
        }
        assert_eq!(a.dependent_count(), 0);
        assert!(!a.release_dependents());
    }

    #[test]
    fn test_self_dependency_rejected() {
        let a = noop();
        assert!(matches!(a.depends_on(&a), Err(TaskError::SelfDependency)));
        assert_eq!(a.remaining(), 0);
    }

    #[test]
    fn test_queued_task_rejects_new_dependencies() {
        let a = noop();
        let b = noop();
        assert!(b.mark_queued());
        assert!(!b.mark_queued());

        assert!(matches!(b.depends_on(&a), Err(TaskError::AlreadySubmitted)));
        assert!(matches!(a.depends_on(&b), Err(TaskError::AlreadySubmitted)));

        b.finish();
        assert!(b.is_complete());
        assert!(!b.is_queued());
    }

    #[test]
    fn test_run_reaches_work() {
        let counter = Arc::new(AtomicU32::new(0));
        let task = Task::new({
            let counter = Arc::clone(&counter);
            move || {
                counter.fetch_add(1, Ordering::SeqCst);
            }
        });

        task.run();
        task.run();
        assert_eq!(counter.load(Ordering::SeqCst), 2);

        // The work is reachable directly, bypassing the task
        (task.work())();
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }
}
