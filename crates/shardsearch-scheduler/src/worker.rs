use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use tracing::{debug, warn};

/// A unit of CPU-bound work dispatched to a worker thread (§4.6's "the
/// worker's SearchEngine infers field types, tokenizes... writes to the
/// sharded inverted index"). Boxed so the coordinator can build one per
/// chunk without a generic `Job` type leaking into the pool's public API.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// A dedicated OS thread pulling jobs off its own channel. The coordinator
/// tracks `in_flight` to pick the least-loaded worker (§4.6's task
/// dispatch rule); the worker itself just decrements it once a job
/// completes, which is also how a timed-out caller's slot eventually
/// clears even though nothing killed the worker.
pub struct WorkerHandle {
    pub id: usize,
    sender: Option<Sender<Job>>,
    pub in_flight: Arc<AtomicUsize>,
    crashed: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerHandle {
    pub fn spawn(id: usize) -> Self {
        let (sender, receiver): (Sender<Job>, Receiver<Job>) = crossbeam_channel::unbounded();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let worker_in_flight = Arc::clone(&in_flight);
        let crashed = Arc::new(AtomicBool::new(false));
        let worker_crashed = Arc::clone(&crashed);
        let handle = std::thread::Builder::new()
            .name(format!("shardsearch-worker-{id}"))
            .spawn(move || {
                while let Ok(job) = receiver.recv() {
                    let outcome = catch_unwind(AssertUnwindSafe(job));
                    worker_in_flight.fetch_sub(1, Ordering::SeqCst);
                    if outcome.is_err() {
                        warn!(worker = id, "job panicked, worker marked crashed");
                        worker_crashed.store(true, Ordering::SeqCst);
                    }
                }
                debug!(worker = id, "worker channel closed, exiting");
            })
            .expect("failed to spawn worker thread");
        WorkerHandle { id, sender: Some(sender), in_flight, crashed, handle: Some(handle) }
    }

    pub fn load(&self) -> usize {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// Whether a job on this worker has ever panicked. Once set, the
    /// coordinator excludes it from `pick_worker`'s rotation and fails any
    /// task still waiting on it with `WorkerCrash` (§4.6, §7).
    pub fn is_crashed(&self) -> bool {
        self.crashed.load(Ordering::SeqCst)
    }

    pub fn queue_len(&self) -> usize {
        self.sender.as_ref().map_or(0, |s| s.len())
    }

    /// Submits `job`, bumping the in-flight counter before the worker
    /// thread can possibly observe and clear it.
    pub fn submit(&self, job: Job) {
        self.in_flight.fetch_add(1, Ordering::SeqCst);
        let sent = self.sender.as_ref().map(|s| s.send(job));
        if !matches!(sent, Some(Ok(()))) {
            warn!(worker = self.id, "worker thread gone, dropping job");
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
        }
    }

    /// Closes this worker's channel and waits for its thread to drain and
    /// exit, used by a graceful pool shutdown.
    pub fn join(&mut self) {
        self.sender.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for WorkerHandle {
    fn drop(&mut self) {
        self.join();
    }
}
