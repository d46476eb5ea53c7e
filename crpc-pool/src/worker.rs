//! A long-lived execution context owning a single-slot task channel.
//! Generalizes `pool/worker.go`'s goroutine-consuming-a-channel shape
//! onto an OS thread plus an `mpsc::sync_channel(1)`.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

use crate::pool::Shared;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

pub enum Task {
    Job(Job),
    /// The null-sentinel task: told by `release()` or the reaper to exit.
    Shutdown,
}

/// Decrements the pool's running count and wakes a waiter exactly once,
/// regardless of which path the worker thread exits through. This is
/// what keeps "running decremented exactly once per worker termination"
/// true even across the panic path.
struct RunningGuard(Arc<Shared>);

impl Drop for RunningGuard {
    fn drop(&mut self) {
        self.0.running.fetch_sub(1, Ordering::AcqRel);
        self.0.cond.notify_one();
    }
}

/// Spawns a worker thread and returns the sender half of its task
/// channel. The caller (the pool) is responsible for incrementing
/// `running` before calling this — the guard only ever decrements.
pub fn spawn(shared: Arc<Shared>) -> mpsc::SyncSender<Task> {
    let (tx, rx) = mpsc::sync_channel::<Task>(1);

    thread::spawn(move || {
        let _guard = RunningGuard(Arc::clone(&shared));

        loop {
            let task = match rx.recv() {
                Ok(task) => task,
                Err(_) => break, // sender dropped; pool is gone
            };

            match task {
                Task::Shutdown => break,
                Task::Job(job) => {
                    let panicked = catch_unwind(AssertUnwindSafe(job)).is_err();

                    if panicked {
                        if let Some(handler) = &shared.panic_handler {
                            handler();
                        }
                        // Do not return to idleList; the worker terminates here.
                        return;
                    }

                    if shared.released.load(Ordering::Acquire) {
                        // The pool was released while this task ran; observe
                        // the release now instead of re-joining idleList.
                        return;
                    }

                    let mut idle = shared.idle.lock().unwrap();
                    idle.push_back(crate::pool::IdleWorker {
                        last_time: Instant::now(),
                        sender: tx.clone(),
                    });
                    drop(idle);
                    shared.cond.notify_one();
                }
            }
        }
    });

    tx
}
