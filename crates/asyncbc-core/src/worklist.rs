//! Unordered, dynamically growing worklist drained by a fixed worker pool.
//!
//! # Model
//!
//! All workers share one queue. A task may push new items back into the
//! queue through its [`Pusher`]; pushes from inside a task are visible to
//! every worker. A run ends at *quiescence*: the queue is empty and no task
//! is in flight. There are no rounds and no barriers between items.
//!
//! ```text
//!   initial items ─▶ ┌──────────────┐ ◀─ Pusher::push (from any task)
//!                    │  VecDeque<T> │
//!                    └──────┬───────┘
//!            pop (FIFO/LIFO) │  in_flight += 1
//!            ┌───────────────┼───────────────┐
//!         worker 0        worker 1   …    worker N-1
//!            └── task(item, &pusher); in_flight -= 1 ──┘
//! ```
//!
//! A worker that finds the queue empty while other tasks are in flight parks
//! on a condition variable; the last task to finish with an empty queue wakes
//! everyone so they can observe quiescence and exit.
//!
//! Bulk phases with no incremental growth (reset, leaf scan) go through a
//! rayon pool sized to the same thread count.

use std::collections::VecDeque;
use std::ops::Range;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use parking_lot::{Condvar, Mutex};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{instrument, warn};

use crate::error::PoolError;

/// Pop order of the shared queue. Both are valid for any protocol built on
/// this worklist; they only change which interleavings are likely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorklistOrder {
    #[default]
    Fifo,
    Lifo,
}

impl std::fmt::Display for WorklistOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Fifo => f.write_str("fifo"),
            Self::Lifo => f.write_str("lifo"),
        }
    }
}

struct QueueState<T> {
    items: VecDeque<T>,
    in_flight: usize,
}

struct Shared<T> {
    state: Mutex<QueueState<T>>,
    wake: Condvar,
    order: WorklistOrder,
}

impl<T> Shared<T> {
    /// Block until an item is available or the worklist has quiesced.
    fn next(&self) -> Option<T> {
        let mut state = self.state.lock();
        loop {
            let item = match self.order {
                WorklistOrder::Fifo => state.items.pop_front(),
                WorklistOrder::Lifo => state.items.pop_back(),
            };
            if let Some(item) = item {
                state.in_flight += 1;
                return Some(item);
            }
            if state.in_flight == 0 {
                drop(state);
                self.wake.notify_all();
                return None;
            }
            self.wake.wait(&mut state);
        }
    }

    fn finish(&self) {
        let mut state = self.state.lock();
        state.in_flight -= 1;
        let quiesced = state.in_flight == 0 && state.items.is_empty();
        drop(state);
        if quiesced {
            self.wake.notify_all();
        }
    }
}

/// Marks one popped item as finished when dropped, including on unwind, so
/// a panicking task cannot leave the other workers parked forever.
struct InFlightGuard<'a, T> {
    shared: &'a Shared<T>,
}

impl<T> Drop for InFlightGuard<'_, T> {
    fn drop(&mut self) {
        self.shared.finish();
    }
}

/// Handle passed to every task for pushing follow-up work.
pub struct Pusher<'a, T> {
    shared: &'a Shared<T>,
}

impl<T> Pusher<'_, T> {
    /// Add an item to the shared queue. Callable from any running task.
    pub fn push(&self, item: T) {
        self.shared.state.lock().items.push_back(item);
        self.shared.wake.notify_one();
    }
}

/// Fixed-size worker pool shared by every phase of a run.
#[derive(Debug)]
pub struct WorkerPool {
    threads: usize,
    order: WorklistOrder,
    bulk: rayon::ThreadPool,
}

impl WorkerPool {
    /// Build a pool with `threads` workers.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::ZeroThreads`] for an empty pool, or
    /// [`PoolError::Build`] if the bulk thread pool cannot be created.
    pub fn new(threads: usize, order: WorklistOrder) -> Result<Self, PoolError> {
        if threads == 0 {
            return Err(PoolError::ZeroThreads);
        }

        let bulk = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("asyncbc-bulk-{i}"))
            .build()?;

        Ok(Self {
            threads,
            order,
            bulk,
        })
    }

    #[must_use]
    pub const fn threads(&self) -> usize {
        self.threads
    }

    #[must_use]
    pub const fn order(&self) -> WorklistOrder {
        self.order
    }

    /// Drain `initial` plus everything tasks push, until quiescence.
    ///
    /// The calling thread participates as worker 0. Returns the number of
    /// items processed.
    #[instrument(level = "trace", skip_all, fields(threads = self.threads))]
    pub fn run_to_quiescence<T, I, F>(&self, initial: I, task: F) -> usize
    where
        T: Send,
        I: IntoIterator<Item = T>,
        F: Fn(T, &Pusher<'_, T>) + Sync,
    {
        let shared = Shared {
            state: Mutex::new(QueueState {
                items: initial.into_iter().collect(),
                in_flight: 0,
            }),
            wake: Condvar::new(),
            order: self.order,
        };
        let processed = AtomicUsize::new(0);

        let work = || {
            let pusher = Pusher { shared: &shared };
            let mut local = 0_usize;
            while let Some(item) = shared.next() {
                let _guard = InFlightGuard { shared: &shared };
                task(item, &pusher);
                local += 1;
            }
            processed.fetch_add(local, Ordering::Relaxed);
        };

        if self.threads == 1 {
            work();
        } else {
            thread::scope(|scope| {
                for worker_id in 1..self.threads {
                    let spawned = thread::Builder::new()
                        .name(format!("asyncbc-worker-{worker_id}"))
                        .spawn_scoped(scope, &work);
                    if let Err(err) = spawned {
                        // Remaining workers, including this thread, still drain the queue.
                        warn!(worker_id, error = %err, "failed to spawn worker thread");
                        break;
                    }
                }
                work();
            });
        }

        processed.into_inner()
    }

    /// Apply `task` to every index in `range` in parallel.
    pub fn apply_bulk<F>(&self, range: Range<usize>, task: F)
    where
        F: Fn(usize) + Sync + Send,
    {
        self.bulk.install(|| range.into_par_iter().for_each(task));
    }

    /// Collect, in ascending order, every index in `range` matching `keep`.
    #[must_use]
    pub fn collect_bulk<F>(&self, range: Range<usize>, keep: F) -> Vec<usize>
    where
        F: Fn(usize) -> bool + Sync + Send,
    {
        self.bulk
            .install(|| range.into_par_iter().filter(|&i| keep(i)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU64;

    #[test]
    fn zero_threads_rejected() {
        let err = WorkerPool::new(0, WorklistOrder::Fifo).expect_err("must reject");
        assert!(matches!(err, PoolError::ZeroThreads));
    }

    #[test]
    fn empty_initial_set_quiesces_immediately() {
        let pool = WorkerPool::new(4, WorklistOrder::Fifo).expect("pool");
        let processed = pool.run_to_quiescence(Vec::<u32>::new(), |_, _| {});
        assert_eq!(processed, 0);
    }

    #[test]
    fn single_worker_respects_pop_order() {
        let fifo = WorkerPool::new(1, WorklistOrder::Fifo).expect("pool");
        let seen = Mutex::new(Vec::new());
        fifo.run_to_quiescence([1, 2, 3], |item, _| seen.lock().push(item));
        assert_eq!(*seen.lock(), vec![1, 2, 3]);

        let lifo = WorkerPool::new(1, WorklistOrder::Lifo).expect("pool");
        let seen = Mutex::new(Vec::new());
        lifo.run_to_quiescence([1, 2, 3], |item, _| seen.lock().push(item));
        assert_eq!(*seen.lock(), vec![3, 2, 1]);
    }

    #[test]
    fn in_task_pushes_are_drained() {
        // Each item n > 0 pushes n - 1 twice: a binary tree of depth 10.
        for threads in [1, 2, 8] {
            let pool = WorkerPool::new(threads, WorklistOrder::Fifo).expect("pool");
            let sum = AtomicU64::new(0);
            let processed = pool.run_to_quiescence([10_u32], |n, pusher| {
                sum.fetch_add(1, Ordering::Relaxed);
                if n > 0 {
                    pusher.push(n - 1);
                    pusher.push(n - 1);
                }
            });
            assert_eq!(processed, (1 << 11) - 1, "threads={threads}");
            assert_eq!(sum.load(Ordering::Relaxed), (1 << 11) - 1);
        }
    }

    #[test]
    fn bulk_helpers_cover_the_range() {
        let pool = WorkerPool::new(3, WorklistOrder::Fifo).expect("pool");
        let total = AtomicU64::new(0);
        pool.apply_bulk(0..100, |i| {
            total.fetch_add(i as u64, Ordering::Relaxed);
        });
        assert_eq!(total.load(Ordering::Relaxed), 4950);

        let evens = pool.collect_bulk(0..10, |i| i % 2 == 0);
        assert_eq!(evens, vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn order_serializes_lowercase() {
        let json = serde_json::to_string(&WorklistOrder::Lifo).expect("serialize");
        assert_eq!(json, "\"lifo\"");
        assert_eq!(WorklistOrder::Fifo.to_string(), "fifo");
    }
}
