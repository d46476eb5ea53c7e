//! Bounded pool of long-lived workers consuming single-shot task
//! closures, with idle-expiry and waiter coordination. Generalizes
//! `pool/pool.go`'s `Pool`/`GetWorker`/`PutWorker` onto `std::thread` +
//! `std::sync::{Mutex, Condvar}` + `mpsc::sync_channel`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::error::{Error, Result};
use crate::worker::{self, Job, Task};

/// Default idle-expiry interval: 3 seconds.
pub const DEFAULT_EXPIRE: Duration = Duration::from_secs(3);

pub(crate) struct IdleWorker {
    pub last_time: Instant,
    pub sender: std::sync::mpsc::SyncSender<Task>,
}

pub(crate) struct Shared {
    pub cap: u32,
    pub expire: Duration,
    pub running: AtomicU32,
    pub idle: Mutex<VecDeque<IdleWorker>>,
    pub cond: Condvar,
    pub released: AtomicBool,
    pub panic_handler: Option<Box<dyn Fn() + Send + Sync>>,
}

/// A bounded pool of worker threads. Cheap to clone (an `Arc` handle);
/// every clone refers to the same underlying pool.
#[derive(Clone)]
pub struct Pool {
    state: Arc<Shared>,
}

impl Pool {
    pub fn new(cap: u32, expire: Duration) -> Result<Pool> {
        Self::with_panic_handler(cap, expire, None)
    }

    /// Construct a pool with `DEFAULT_EXPIRE` as the idle-expiry interval.
    pub fn with_default_expire(cap: u32) -> Result<Pool> {
        Self::new(cap, DEFAULT_EXPIRE)
    }

    pub fn with_panic_handler(
        cap: u32,
        expire: Duration,
        panic_handler: Option<Box<dyn Fn() + Send + Sync>>,
    ) -> Result<Pool> {
        if cap == 0 {
            return Err(Error::InvalidCap);
        }
        if expire.is_zero() {
            return Err(Error::InvalidExpire);
        }

        let shared = Arc::new(Shared {
            cap,
            expire,
            running: AtomicU32::new(0),
            idle: Mutex::new(VecDeque::new()),
            cond: Condvar::new(),
            released: AtomicBool::new(false),
            panic_handler,
        });

        spawn_reaper(&shared);

        Ok(Pool { state: shared })
    }

    /// Number of workers currently alive (executing or idle).
    pub fn running(&self) -> u32 {
        self.state.running.load(Ordering::Acquire)
    }

    /// Number of workers currently idle.
    pub fn idle_count(&self) -> usize {
        self.state.idle.lock().unwrap().len()
    }

    pub fn is_released(&self) -> bool {
        self.state.released.load(Ordering::Acquire)
    }

    /// Schedules `task` on an idle or newly-allocated worker.
    pub fn submit<F>(&self, task: F) -> Result<()>
    where
        F: FnOnce() + Send + 'static,
    {
        if self.state.released.load(Ordering::Acquire) {
            return Err(Error::PoolReleased);
        }

        let sender = self.acquire_worker();
        let job: Job = Box::new(task);
        sender
            .send(Task::Job(job))
            .map_err(|_| Error::WorkerGone)?;
        Ok(())
    }

    /// (1) pop newest idle worker if any; (2) else spawn if under cap;
    /// (3) else wait on the cond-variable and retry. Spurious wakeups
    /// (and wakeups from a freed running slot) are tolerated by looping.
    fn acquire_worker(&self) -> std::sync::mpsc::SyncSender<Task> {
        let mut idle = self.state.idle.lock().unwrap();
        loop {
            if let Some(entry) = idle.pop_back() {
                return entry.sender;
            }

            let cur = self.state.running.load(Ordering::Acquire);
            if cur < self.state.cap {
                if self
                    .state
                    .running
                    .compare_exchange(cur, cur + 1, Ordering::AcqRel, Ordering::Acquire)
                    .is_ok()
                {
                    drop(idle);
                    return worker::spawn(Arc::clone(&self.state));
                }
                // Lost the race to another acquirer; retry immediately.
                continue;
            }

            idle = self.state.cond.wait(idle).unwrap();
        }
    }

    /// Idempotent. Drains the idle list, sends every idle worker the
    /// null-sentinel task, and marks the pool released. Workers currently
    /// executing finish their task, observe the release, and terminate
    /// instead of rejoining the idle list.
    pub fn release(&self) {
        if self.state.released.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut idle = self.state.idle.lock().unwrap();
        for entry in idle.drain(..) {
            let _ = entry.sender.send(Task::Shutdown);
        }
    }

    /// Reverses `release()`. A no-op if the pool isn't currently released.
    pub fn restart(&self) {
        self.state.released.store(false, Ordering::Release);
    }
}

fn spawn_reaper(shared: &Arc<Shared>) {
    let weak = Arc::downgrade(shared);
    let tick = shared.expire;

    std::thread::spawn(move || loop {
        std::thread::sleep(tick);
        match weak.upgrade() {
            Some(shared) => {
                if shared.released.load(Ordering::Acquire) {
                    continue;
                }
                reap(&shared);
            }
            None => break, // the pool was dropped
        }
    });
}

/// Scans the idle list oldest-first, sending the null sentinel to and
/// removing every worker idle for `>= expire`. Stops at the first
/// non-expired worker since the list is kept in monotonic oldest-first
/// order.
fn reap(shared: &Arc<Shared>) {
    let now = Instant::now();
    let mut idle = shared.idle.lock().unwrap();
    while let Some(front) = idle.front() {
        if now.duration_since(front.last_time) >= shared.expire {
            let entry = idle.pop_front().unwrap();
            let _ = entry.sender.send(Task::Shutdown);
        } else {
            break;
        }
    }
}
