//! Bounded worker pool for independent analysis tasks
//!
//! [`WorkerPool::execute`] fans a task list out over at most `workers` scoped
//! threads and blocks until every task has finished. Workers pull the next
//! pending task from a shared queue, so a slow task only delays the thread
//! running it. Results are returned in task order regardless of completion
//! order.
//!
//! A panicking task is caught and reported as [`TaskPanicked`] in its own
//! slot; sibling tasks are unaffected.
//!
//! ```
//! use std::num::NonZeroUsize;
//!
//! use interestingness_analysis::pool::WorkerPool;
//!
//! let pool = WorkerPool::new(NonZeroUsize::new(4).unwrap());
//! let squares = pool.map(&[1, 2, 3], |_, x| x * x);
//! assert_eq!(squares.into_iter().collect::<Result<Vec<_>, _>>().unwrap(), vec![1, 4, 9]);
//! ```

use std::{
    any::Any,
    iter,
    num::NonZeroUsize,
    panic::{self, AssertUnwindSafe},
    sync::{Mutex, PoisonError},
    thread,
};

use crate::config::AnalysisConfiguration;

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("task {index} panicked: {message}")]
pub struct TaskPanicked {
    pub index: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    workers: NonZeroUsize,
}

impl WorkerPool {
    #[must_use]
    pub fn new(workers: NonZeroUsize) -> Self {
        Self { workers }
    }

    /// Pool sized with the configuration's resolved worker count.
    #[must_use]
    pub fn from_config(config: &AnalysisConfiguration) -> Self {
        Self::new(config.workers())
    }

    #[must_use]
    pub fn workers(&self) -> NonZeroUsize {
        self.workers
    }

    /// Runs `f(index, task)` for every task and returns the results by index.
    pub fn execute<T, R, F>(&self, tasks: Vec<T>, f: F) -> Vec<Result<R, TaskPanicked>>
    where
        T: Send,
        R: Send,
        F: Fn(usize, T) -> R + Sync,
    {
        let count = tasks.len();
        let threads = self.workers.get().min(count);
        tracing::debug!(tasks = count, threads, "dispatching tasks");

        if threads <= 1 {
            return tasks
                .into_iter()
                .enumerate()
                .map(|(index, task)| run_task(index, task, &f))
                .collect();
        }

        let queue = &Mutex::new(tasks.into_iter().enumerate());
        let f = &f;
        let mut slots = iter::repeat_with(|| None)
            .take(count)
            .collect::<Vec<Option<Result<R, TaskPanicked>>>>();

        thread::scope(|s| {
            let handles = (0..threads)
                .map(|_| {
                    s.spawn(move || {
                        let mut finished = vec![];
                        loop {
                            let next = queue.lock().unwrap_or_else(PoisonError::into_inner).next();
                            let Some((index, task)) = next else {
                                break;
                            };
                            finished.push((index, run_task(index, task, f)));
                        }
                        finished
                    })
                })
                .collect::<Vec<_>>();

            for handle in handles {
                // tasks are unwound inside `run_task`, so workers always join cleanly
                if let Ok(finished) = handle.join() {
                    for (index, result) in finished {
                        slots[index] = Some(result);
                    }
                }
            }
        });

        slots
            .into_iter()
            .enumerate()
            .map(|(index, slot)| {
                slot.unwrap_or_else(|| {
                    Err(TaskPanicked {
                        index,
                        message: "worker thread terminated before reporting".to_owned(),
                    })
                })
            })
            .collect()
    }

    /// Runs `f(index, item)` for every borrowed item.
    pub fn map<T, R, F>(&self, items: &[T], f: F) -> Vec<Result<R, TaskPanicked>>
    where
        T: Sync,
        R: Send,
        F: Fn(usize, &T) -> R + Sync,
    {
        self.execute(items.iter().collect(), |index, item| f(index, item))
    }
}

fn run_task<T, R, F>(index: usize, task: T, f: &F) -> Result<R, TaskPanicked>
where
    F: Fn(usize, T) -> R,
{
    panic::catch_unwind(AssertUnwindSafe(|| f(index, task))).map_err(|payload| TaskPanicked {
        index,
        message: panic_message(payload.as_ref()),
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
