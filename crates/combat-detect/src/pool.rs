//! A bounded worker pool for independent per-file jobs.
//!
//! Tasks are fed through a bounded crossbeam channel to a fixed set of
//! scoped worker threads; results come back over a second channel tagged
//! with their task index and are returned in task order. A panicking task is
//! caught and reported as a [`TaskPanic`] for that task alone, and the worker
//! moves on to the next task.
//!
//! ```
//! use combat_detect::pool::run_pool;
//!
//! let squares = run_pool((1..=5).collect(), 3, |n: u64| n * n);
//! let squares: Vec<u64> = squares.into_iter().map(Result::unwrap).collect();
//! assert_eq!(squares, vec![1, 4, 9, 16, 25]);
//! ```

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread;

use crossbeam_channel::{bounded, unbounded};

/// A task whose function panicked.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("worker panicked on task {index}: {message}")]
pub struct TaskPanic {
    pub index: usize,
    pub message: String,
}

/// Run `f` over every task on at most `workers` threads.
///
/// The result vector has one entry per task, in task order. Blocks until
/// every task has finished.
pub fn run_pool<T, R, F>(tasks: Vec<T>, workers: usize, f: F) -> Vec<Result<R, TaskPanic>>
where
    T: Send,
    R: Send,
    F: Fn(T) -> R + Sync,
{
    let count = tasks.len();
    if count == 0 {
        return Vec::new();
    }
    let workers = workers.clamp(1, count);

    let (task_tx, task_rx) = bounded::<(usize, T)>(workers * 2);
    let (result_tx, result_rx) = unbounded::<(usize, Result<R, TaskPanic>)>();
    let f = &f;

    thread::scope(|scope| {
        for _ in 0..workers {
            let task_rx = task_rx.clone();
            let result_tx = result_tx.clone();
            scope.spawn(move || {
                for (index, task) in task_rx.iter() {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| f(task))).map_err(
                        |payload| {
                            let message = panic_message(payload.as_ref());
                            tracing::warn!(index, %message, "worker task panicked");
                            TaskPanic { index, message }
                        },
                    );
                    if result_tx.send((index, outcome)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(task_rx);
        drop(result_tx);

        for task in tasks.into_iter().enumerate() {
            if task_tx.send(task).is_err() {
                break;
            }
        }
        drop(task_tx);
    });

    let mut results: Vec<(usize, Result<R, TaskPanic>)> = result_rx.iter().collect();
    results.sort_by_key(|(index, _)| *index);
    debug_assert_eq!(results.len(), count);
    results.into_iter().map(|(_, outcome)| outcome).collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_owned()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
