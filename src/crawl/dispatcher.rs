// src/crawl/dispatcher.rs
// =============================================================================
// A bounded pool for manifest fetches.
//
// `submit` never blocks and never rejects: every task is spawned right away
// and then waits for one of N permits before doing any work. `drain` waits for
// everything submitted so far.
//
// Failures stop at the task boundary. A task that returns an error, or even
// panics, is logged and counted; it cannot abort its siblings and `drain`
// still returns normally. The fetch tasks already log their expected
// failures, so what arrives here is the unexpected kind (transport errors,
// bugs). Counting them keeps them from vanishing silently.
//
// Dropping a dispatcher without draining aborts whatever is still running.
// =============================================================================

use std::future::Future;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

// What `drain` saw
//
// `completed` counts tasks that returned Ok; `failed` counts errors, panics
// and cancellations alike.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub completed: usize,
    pub failed: usize,
}

// The pool itself
//
// The semaphore bounds how many tasks do work at once; the JoinSet owns every
// spawned task so `drain` can wait for them and dropping the dispatcher
// aborts them.
pub struct Dispatcher {
    permits: Arc<Semaphore>,  // shared with every task, hence the Arc
    tasks: JoinSet<bool>,     // true = task succeeded
    limit: usize,             // number of permits, for reporting
}

impl Dispatcher {
    /// A limit of 0 is treated as 1.
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            permits: Arc::new(Semaphore::new(limit)),
            tasks: JoinSet::new(),
            limit,
        }
    }

    /// How many tasks may run at the same time.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Tasks submitted and not yet collected by `drain`.
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    // Queues a task
    //
    // The task is spawned immediately, so the caller (the paging loop) can
    // move on to the next page while fetches run in the background.
    // `label` identifies the task in the log if it fails.
    //
    // Requirements on the future:
    //   Send + 'static  it runs on the tokio runtime, detached from the caller
    //   anyhow::Result  any error type can be reported with its context chain
    pub fn submit<F>(&mut self, label: impl Into<String>, task: F)
    where
        F: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let label = label.into();
        let permits = Arc::clone(&self.permits);
        self.tasks.spawn(async move {
            // acquire_owned() needs the Arc and hands back a permit that is
            // not tied to a borrow, so it can live inside this 'static task.
            // The permit is released when `_permit` drops at the end of the
            // task. The semaphore is never closed while tasks are alive.
            let Ok(_permit) = permits.acquire_owned().await else {
                tracing::error!(task = %label, "Dispatcher closed before task could start");
                return false;
            };
            match task.await {
                Ok(()) => true,
                Err(e) => {
                    // {:#} prints the whole anyhow context chain on one line
                    tracing::error!(task = %label, error = %format!("{e:#}"), "Task failed");
                    false
                }
            }
        });
    }

    // Waits until every submitted task has finished, whatever the outcome
    //
    // join_next() yields tasks in completion order and returns None once the
    // set is empty. A JoinError means the task panicked (or was aborted); it
    // is logged and counted, never re-raised.
    pub async fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport::default();
        while let Some(joined) = self.tasks.join_next().await {
            match joined {
                Ok(true) => report.completed += 1,
                Ok(false) => report.failed += 1,
                Err(e) => {
                    tracing::error!(error = %e, "Task panicked or was cancelled");
                    report.failed += 1;
                }
            }
        }
        report
    }
}
