//! Bounded, thread-safe priority queue for scan jobs, plus a small worker
//! pool that drains it. Jobs with a higher `priority` dequeue first; ties
//! break FIFO by insertion order.

use crate::model::{Entity, ExposureLevel, NormalizedContext};
use crate::triggers;
use crate::registry::Registry;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

static JOB_SEQUENCE: AtomicU64 = AtomicU64::new(0);

fn next_job_id() -> String {
    let n = JOB_SEQUENCE.fetch_add(1, AtomicOrdering::Relaxed);
    format!("job-{n:016x}")
}

/// A unit of rescan work. `job_id` and `created_at` are always
/// auto-generated; an explicitly supplied `priority` is never recomputed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub job_id: String,
    pub path: String,
    pub exposure: String,
    pub priority: i32,
    pub created_at: u64,
    pub attempts: u32,
    pub max_retries: u32,
    pub last_error: Option<String>,
}

impl Job {
    /// Builds a job with default exposure `PRIVATE`, zero attempts, and a
    /// priority of 0 (callers that want a computed priority should use
    /// `calculate_priority`/`calculate_priority_from_context` and pass the
    /// result in explicitly).
    pub fn new(path: impl Into<String>, created_at: u64) -> Self {
        Job {
            job_id: next_job_id(),
            path: path.into(),
            exposure: "PRIVATE".to_string(),
            priority: 0,
            created_at,
            attempts: 0,
            max_retries: 3,
            last_error: None,
        }
    }

    pub fn to_dict(&self) -> serde_json::Value {
        serde_json::json!({
            "path": self.path,
            "exposure": self.exposure,
            "job_id": self.job_id,
            "created_at": self.created_at,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueueStatus {
    Running,
    Paused,
    Stopped,
}

impl QueueStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueueStatus::Running => "running",
            QueueStatus::Paused => "paused",
            QueueStatus::Stopped => "stopped",
        }
    }
}

impl std::fmt::Display for QueueStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

fn exposure_base(exposure: &str) -> i32 {
    match exposure.trim().to_uppercase().as_str() {
        "PUBLIC" => 50,
        "ORG_WIDE" | "ORGWIDE" => 30,
        "INTERNAL" => 10,
        _ => 0,
    }
}

/// Priority from a raw exposure string plus a handful of boolean/size
/// signals, for callers that haven't built a full `NormalizedContext`.
/// Mirrors `triggers::calculate_scan_priority`'s boosts, plus two
/// size-based adjustments the trigger engine doesn't apply: small files
/// (<=500KB) get a small boost since they're cheap to rescan, very large
/// files (>=100MB) get a penalty since a rescan is expensive.
pub fn calculate_priority(
    exposure: &str,
    no_encryption: bool,
    low_confidence_high_risk: bool,
    stale_data: bool,
    no_labels: bool,
    size_bytes: u64,
) -> i32 {
    let mut priority = exposure_base(exposure);
    if no_encryption {
        priority += 20;
    }
    if low_confidence_high_risk {
        priority += 25;
    }
    if stale_data {
        priority += 5;
    }
    if no_labels {
        priority += 15;
    }
    if size_bytes <= 500_000 {
        priority += 5;
    } else if size_bytes >= 100_000_000 {
        priority -= 10;
    }
    priority.clamp(0, 100)
}

/// Same as `calculate_priority` but derives its boolean signals from a
/// `NormalizedContext` + entity set the way the trigger engine does.
pub fn calculate_priority_from_context(context: &NormalizedContext, entities: &[Entity], registry: &Registry) -> i32 {
    let active = triggers::active_triggers(context, entities, registry);
    calculate_priority(
        context.exposure.as_str(),
        active.contains(&triggers::ScanTrigger::NoEncryption),
        active.contains(&triggers::ScanTrigger::LowConfidenceHighRisk),
        active.contains(&triggers::ScanTrigger::StaleData),
        active.contains(&triggers::ScanTrigger::NoLabels),
        context.size_bytes,
    )
}

/// Ordering wrapper: negate priority so the max-priority job pops first
/// from `BinaryHeap` (a max-heap), break ties by earliest sequence number.
#[derive(Debug, Clone)]
struct HeapEntry {
    job: Job,
    sequence: u64,
}

impl HeapEntry {
    fn sort_key(&self) -> (i32, std::cmp::Reverse<u64>) {
        (self.job.priority, std::cmp::Reverse(self.sequence))
    }
}

impl PartialEq for HeapEntry {
    fn eq(&self, other: &Self) -> bool {
        self.sort_key() == other.sort_key()
    }
}
impl Eq for HeapEntry {}

impl PartialOrd for HeapEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

#[derive(Debug, Default, Clone, Serialize)]
pub struct QueueStats {
    pub enqueued: u64,
    pub dequeued: u64,
    pub current_size: usize,
    pub dropped: u64,
    pub failed: u64,
}

struct Inner {
    heap: BinaryHeap<HeapEntry>,
    job_ids: std::collections::HashSet<String>,
    status: QueueStatus,
    stats: QueueStats,
}

/// A bounded priority queue safe to share across threads. `capacity` of 0
/// means unbounded.
pub struct PriorityQueue {
    inner: Mutex<Inner>,
    not_empty: Condvar,
    capacity: usize,
    sequence: AtomicU64,
}

impl PriorityQueue {
    pub fn new(capacity: usize) -> Self {
        PriorityQueue {
            inner: Mutex::new(Inner {
                heap: BinaryHeap::new(),
                job_ids: std::collections::HashSet::new(),
                status: QueueStatus::Running,
                stats: QueueStats::default(),
            }),
            not_empty: Condvar::new(),
            capacity,
            sequence: AtomicU64::new(0),
        }
    }

    pub fn size(&self) -> usize {
        self.inner.lock().unwrap().heap.len()
    }

    pub fn status(&self) -> QueueStatus {
        self.inner.lock().unwrap().status
    }

    pub fn stats(&self) -> QueueStats {
        let inner = self.inner.lock().unwrap();
        let mut stats = inner.stats.clone();
        stats.current_size = inner.heap.len();
        stats
    }

    /// Enqueues a job, rejecting duplicate `job_id`s and a full queue
    /// without blocking. Returns whether the job was accepted.
    pub fn enqueue(&self, job: Job) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if inner.job_ids.contains(&job.job_id) {
            return false;
        }
        if self.capacity > 0 && inner.heap.len() >= self.capacity {
            inner.stats.dropped += 1;
            return false;
        }
        let sequence = self.sequence.fetch_add(1, AtomicOrdering::Relaxed);
        inner.job_ids.insert(job.job_id.clone());
        inner.heap.push(HeapEntry { job, sequence });
        inner.stats.enqueued += 1;
        drop(inner);
        self.not_empty.notify_one();
        true
    }

    fn pop_highest(inner: &mut Inner) -> Option<Job> {
        if inner.status != QueueStatus::Running {
            return None;
        }
        inner.heap.pop().map(|entry| {
            inner.job_ids.remove(&entry.job.job_id);
            inner.stats.dequeued += 1;
            entry.job
        })
    }

    /// Non-blocking dequeue: returns `None` immediately if empty or paused.
    pub fn dequeue_nowait(&self) -> Option<Job> {
        let mut inner = self.inner.lock().unwrap();
        Self::pop_highest(&mut inner)
    }

    /// Blocking dequeue with a timeout. Returns `None` if the timeout
    /// elapses with nothing to hand out — either because the queue stayed
    /// empty or because it's paused or stopped the whole time.
    pub fn dequeue(&self, timeout: Duration) -> Option<Job> {
        let deadline = Instant::now() + timeout;
        let mut inner = self.inner.lock().unwrap();
        loop {
            if let Some(job) = Self::pop_highest(&mut inner) {
                return Some(job);
            }
            let now = Instant::now();
            if now >= deadline {
                return None;
            }
            let (guard, result) = self.not_empty.wait_timeout(inner, deadline - now).unwrap();
            inner = guard;
            if result.timed_out() && (inner.heap.is_empty() || inner.status != QueueStatus::Running) {
                return None;
            }
        }
    }

    pub fn peek(&self) -> Option<Job> {
        self.inner.lock().unwrap().heap.peek().map(|e| e.job.clone())
    }

    /// Removes every pending job, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock().unwrap();
        let n = inner.heap.len();
        inner.heap.clear();
        inner.job_ids.clear();
        n
    }

    /// Puts a failed job back on the queue with attempts incremented and
    /// priority reduced, unless it has exhausted its retry budget.
    pub fn requeue(&self, mut job: Job, error: impl Into<String>) -> bool {
        job.attempts += 1;
        job.last_error = Some(error.into());
        if job.attempts >= job.max_retries {
            let mut inner = self.inner.lock().unwrap();
            inner.stats.failed += 1;
            return false;
        }
        job.priority = (job.priority - 5).max(0);
        self.enqueue(job)
    }

    pub fn pause(&self) {
        self.inner.lock().unwrap().status = QueueStatus::Paused;
    }

    pub fn resume(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.status = QueueStatus::Running;
        drop(inner);
        self.not_empty.notify_all();
    }

    pub fn stop(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.status = QueueStatus::Stopped;
        drop(inner);
        self.not_empty.notify_all();
    }
}

type ProcessFn = dyn Fn(&Job) -> Result<(), String> + Send + Sync;

/// Drains a `PriorityQueue` on one or more background threads, invoking
/// `process_fn` per job and routing failures through `requeue`.
pub struct QueueWorker {
    queue: Arc<PriorityQueue>,
    process_fn: Arc<ProcessFn>,
    handles: Mutex<Vec<std::thread::JoinHandle<()>>>,
    running: Arc<std::sync::atomic::AtomicBool>,
    num_workers: usize,
}

impl QueueWorker {
    pub fn new(queue: Arc<PriorityQueue>, process_fn: Arc<ProcessFn>, num_workers: usize) -> Self {
        QueueWorker {
            queue,
            process_fn,
            handles: Mutex::new(Vec::new()),
            running: Arc::new(std::sync::atomic::AtomicBool::new(false)),
            num_workers: num_workers.max(1),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(AtomicOrdering::Relaxed)
    }

    pub fn start(&self) {
        self.running.store(true, AtomicOrdering::Relaxed);
        let mut handles = self.handles.lock().unwrap();
        for _ in 0..self.num_workers {
            let queue = Arc::clone(&self.queue);
            let process_fn = Arc::clone(&self.process_fn);
            let running = Arc::clone(&self.running);
            handles.push(std::thread::spawn(move || {
                while running.load(AtomicOrdering::Relaxed) {
                    let job = match queue.dequeue(Duration::from_millis(200)) {
                        Some(job) => job,
                        None => continue,
                    };
                    match (process_fn)(&job) {
                        Ok(()) => {}
                        Err(error) => {
                            tracing::warn!(job_id = %job.job_id, %error, "job failed, requeueing");
                            queue.requeue(job, error);
                        }
                    }
                }
            }));
        }
    }

    pub fn stop(&self) {
        self.running.store(false, AtomicOrdering::Relaxed);
        let mut handles = self.handles.lock().unwrap();
        for handle in handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn higher_priority_dequeues_first() {
        let queue = PriorityQueue::new(0);
        let mut low = Job::new("/a", 1);
        low.priority = 10;
        let mut high = Job::new("/b", 2);
        high.priority = 90;
        queue.enqueue(low.clone());
        queue.enqueue(high.clone());
        let first = queue.dequeue_nowait().unwrap();
        assert_eq!(first.job_id, high.job_id);
    }

    #[test]
    fn ties_break_fifo() {
        let queue = PriorityQueue::new(0);
        let a = Job::new("/a", 1);
        let b = Job::new("/b", 2);
        queue.enqueue(a.clone());
        queue.enqueue(b.clone());
        assert_eq!(queue.dequeue_nowait().unwrap().job_id, a.job_id);
        assert_eq!(queue.dequeue_nowait().unwrap().job_id, b.job_id);
    }

    #[test]
    fn duplicate_job_id_rejected() {
        let queue = PriorityQueue::new(0);
        let job = Job::new("/a", 1);
        assert!(queue.enqueue(job.clone()));
        assert!(!queue.enqueue(job));
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn full_queue_drops_and_counts() {
        let queue = PriorityQueue::new(1);
        assert!(queue.enqueue(Job::new("/a", 1)));
        assert!(!queue.enqueue(Job::new("/b", 2)));
        assert_eq!(queue.stats().dropped, 1);
    }

    #[test]
    fn dequeue_nowait_on_empty_returns_none() {
        let queue = PriorityQueue::new(0);
        assert!(queue.dequeue_nowait().is_none());
    }

    #[test]
    fn blocking_dequeue_times_out() {
        let queue = PriorityQueue::new(0);
        let start = Instant::now();
        let result = queue.dequeue(Duration::from_millis(50));
        assert!(result.is_none());
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn peek_does_not_remove() {
        let queue = PriorityQueue::new(0);
        queue.enqueue(Job::new("/a", 1));
        assert!(queue.peek().is_some());
        assert_eq!(queue.size(), 1);
    }

    #[test]
    fn clear_returns_count_removed() {
        let queue = PriorityQueue::new(0);
        queue.enqueue(Job::new("/a", 1));
        queue.enqueue(Job::new("/b", 2));
        assert_eq!(queue.clear(), 2);
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn requeue_reduces_priority_and_increments_attempts() {
        let queue = PriorityQueue::new(0);
        let mut job = Job::new("/a", 1);
        job.priority = 50;
        assert!(queue.requeue(job.clone(), "boom"));
        let requeued = queue.dequeue_nowait().unwrap();
        assert_eq!(requeued.attempts, 1);
        assert_eq!(requeued.priority, 45);
        assert_eq!(requeued.last_error.as_deref(), Some("boom"));
    }

    #[test]
    fn requeue_fails_once_retries_exhausted() {
        let queue = PriorityQueue::new(0);
        let mut job = Job::new("/a", 1);
        job.attempts = 2;
        job.max_retries = 3;
        assert!(!queue.requeue(job, "boom"));
        assert_eq!(queue.stats().failed, 1);
        assert_eq!(queue.size(), 0);
    }

    #[test]
    fn calculate_priority_small_file_boost_and_large_file_penalty() {
        assert_eq!(calculate_priority("PRIVATE", false, false, false, false, 500_000), 5);
        assert_eq!(calculate_priority("PUBLIC", false, false, false, false, 200_000_000), 40);
    }

    #[test]
    fn pause_resume_stop_transitions() {
        let queue = PriorityQueue::new(0);
        assert_eq!(queue.status(), QueueStatus::Running);
        queue.pause();
        assert_eq!(queue.status(), QueueStatus::Paused);
        queue.resume();
        assert_eq!(queue.status(), QueueStatus::Running);
        queue.stop();
        assert_eq!(queue.status(), QueueStatus::Stopped);
    }

    #[test]
    fn paused_queue_withholds_jobs_until_resumed() {
        let queue = PriorityQueue::new(0);
        queue.enqueue(Job::new("/a", 1));
        queue.pause();
        assert!(queue.dequeue_nowait().is_none());
        assert_eq!(queue.size(), 1);
        queue.resume();
        assert!(queue.dequeue_nowait().is_some());
    }

    #[test]
    fn worker_processes_jobs_and_invokes_callback() {
        let queue = Arc::new(PriorityQueue::new(0));
        let processed = Arc::new(Mutex::new(Vec::new()));
        let processed_clone = Arc::clone(&processed);
        let worker = QueueWorker::new(
            Arc::clone(&queue),
            Arc::new(move |job: &Job| {
                processed_clone.lock().unwrap().push(job.job_id.clone());
                Ok(())
            }),
            1,
        );
        worker.start();
        let job = Job::new("/a", 1);
        let job_id = job.job_id.clone();
        queue.enqueue(job);
        std::thread::sleep(Duration::from_millis(300));
        worker.stop();
        assert!(processed.lock().unwrap().contains(&job_id));
    }
}
