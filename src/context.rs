//! Shared execution context for a scan run: a bounded worker pool the
//! orchestrator fans detector calls out to, with a per-call timeout.
//! `rayon`'s work-stealing pool has no way to abandon a task that's still
//! running past its deadline, so the fan-out here is hand-rolled on top of
//! `crossbeam-channel`: each detector call runs on a pool thread, and the
//! caller either gets the result back within the budget or gives up on
//! waiting for it. A thread that blows its budget is left running (Rust
//! has no safe preemption) and counted as "runaway" so the caller can
//! surface that in `DetectionMetadata` and alert if it keeps happening.

use crate::config::Config;
use crate::error::{OpenLabelsError, Result};
use crate::registry::Registry;
use crossbeam_channel::{bounded, RecvTimeoutError};
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Per-run shared state: cheap to clone (everything behind an `Arc`), safe
/// to hand to multiple threads.
#[derive(Clone)]
pub struct Context {
    pub config: Arc<Config>,
    pub registry: Arc<Registry>,
    runaway_threads: Arc<AtomicU32>,
    pool: Arc<WorkerPool>,
    detection_slots: Arc<DetectionSlots>,
}

impl Context {
    pub fn new(config: Config, registry: Registry) -> Self {
        let workers = config.max_workers.max(1);
        Context {
            pool: Arc::new(WorkerPool::new(workers)),
            detection_slots: Arc::new(DetectionSlots::new(workers)),
            config: Arc::new(config),
            registry: Arc::new(registry),
            runaway_threads: Arc::new(AtomicU32::new(0)),
        }
    }

    pub fn runaway_threads(&self) -> u32 {
        self.runaway_threads.load(Ordering::Relaxed)
    }

    /// Claims one of `config.max_workers` detection slots for the
    /// duration of a scan, failing fast with `QueueFull` once they're all
    /// in use rather than letting an unbounded number of scans pile up on
    /// the worker pool at once. The slot is released when the returned
    /// guard drops.
    pub fn acquire_detection_slot(&self) -> Result<DetectionSlotGuard> {
        if self.detection_slots.try_acquire() {
            Ok(DetectionSlotGuard { slots: Arc::clone(&self.detection_slots) })
        } else {
            Err(OpenLabelsError::QueueFull { capacity: self.detection_slots.capacity })
        }
    }

    /// Runs `work` on the pool and waits up to `budget` for it to finish.
    /// Returns `None` on timeout; the thread itself is not interrupted and
    /// its eventual result (if any) is discarded.
    pub fn run_with_timeout<F, T>(&self, budget: Duration, work: F) -> Option<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = bounded(1);
        self.pool.submit(Box::new(move || {
            let result = work();
            let _ = tx.send(result);
        }));

        match rx.recv_timeout(budget) {
            Ok(result) => Some(result),
            Err(RecvTimeoutError::Timeout) => {
                self.runaway_threads.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Sequential fallback used when `max_workers <= 1`: runs `work`
    /// directly on the calling thread with no timeout enforcement, since
    /// there's no second thread to enforce it from.
    pub fn run_sequential<F, T>(&self, work: F) -> T
    where
        F: FnOnce() -> T,
    {
        work()
    }

    pub fn is_sequential(&self) -> bool {
        self.config.max_workers <= 1
    }
}

/// A counting semaphore sized by `config.max_workers`: each in-flight
/// `detect` call holds one slot for its whole duration, so at most
/// `max_workers` scans run at once regardless of how many callers invoke
/// the orchestrator concurrently. `std::sync::Semaphore` doesn't exist in
/// stable `std`, so this is the `Arc`-shared, atomic-counter equivalent.
struct DetectionSlots {
    capacity: usize,
    in_use: AtomicUsize,
}

impl DetectionSlots {
    fn new(capacity: usize) -> Self {
        DetectionSlots { capacity: capacity.max(1), in_use: AtomicUsize::new(0) }
    }

    fn try_acquire(&self) -> bool {
        loop {
            let current = self.in_use.load(Ordering::Acquire);
            if current >= self.capacity {
                return false;
            }
            if self
                .in_use
                .compare_exchange(current, current + 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    fn release(&self) {
        self.in_use.fetch_sub(1, Ordering::AcqRel);
    }
}

/// RAII guard for a claimed detection slot: releases it on drop so a
/// scan that returns early (including via `?`) still frees its slot.
pub struct DetectionSlotGuard {
    slots: Arc<DetectionSlots>,
}

impl Drop for DetectionSlotGuard {
    fn drop(&mut self) {
        self.slots.release();
    }
}

type Job = Box<dyn FnOnce() + Send + 'static>;

/// A small fixed-size thread pool. Detector calls are typically
/// CPU-bound regex/string work, so a pool sized to `max_workers` (default:
/// core count) avoids oversubscription without the complexity of a
/// work-stealing scheduler.
struct WorkerPool {
    sender: crossbeam_channel::Sender<Job>,
    _handles: Vec<std::thread::JoinHandle<()>>,
}

impl WorkerPool {
    fn new(workers: usize) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<Job>();
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers {
            let receiver = receiver.clone();
            handles.push(std::thread::spawn(move || {
                while let Ok(job) = receiver.recv() {
                    job();
                }
            }));
        }
        WorkerPool { sender, _handles: handles }
    }

    fn submit(&self, job: Job) {
        let _ = self.sender.send(job);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_with_timeout_returns_result_within_budget() {
        let ctx = Context::new(Config::default(), Registry::with_base_only());
        let result = ctx.run_with_timeout(Duration::from_secs(1), || 42);
        assert_eq!(result, Some(42));
    }

    #[test]
    fn run_with_timeout_reports_runaway_on_timeout() {
        let ctx = Context::new(Config::default(), Registry::with_base_only());
        let result: Option<()> = ctx.run_with_timeout(Duration::from_millis(20), || {
            std::thread::sleep(Duration::from_millis(200));
        });
        assert!(result.is_none());
        assert_eq!(ctx.runaway_threads(), 1);
    }

    #[test]
    fn detection_slot_exhaustion_reports_queue_full() {
        let mut config = Config::default();
        config.max_workers = 1;
        let ctx = Context::new(config, Registry::with_base_only());
        let first = ctx.acquire_detection_slot().unwrap();
        let second = ctx.acquire_detection_slot();
        assert!(matches!(second, Err(crate::error::OpenLabelsError::QueueFull { capacity: 1 })));
        drop(first);
        assert!(ctx.acquire_detection_slot().is_ok());
    }
}
