use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use crossbeam_channel::{bounded, Receiver};
use parking_lot::RwLock;
use shardsearch_engine::{AddOutcome, EngineConfig, IndexSummary, SearchEngine};
use shardsearch_persistence::{GlobalMetadata, IndexPaths, ShardMetadata, ThrottleState};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::health::HealthReport;
use crate::oplog::{OpKind, OpLogEntry, OperationLog};
use crate::operation::{Operation, OperationResult};
use crate::vector_clock::{self, VectorClock};
use crate::worker::WorkerHandle;

const MAIN_WORKER: &str = "main";
const DEFAULT_WATERMARK: usize = 100;
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

fn now_millis() -> i64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_millis() as i64).unwrap_or(0)
}

/// Derives `opId` from the request's own content rather than a fresh
/// timestamp+random value, so a retried call with the same payload lands
/// on the same id and collides with the earlier entry in the operation log
/// (§4.6 step 2's idempotency check; §8's "at most one is applied").
fn content_op_id(kind: &str, index_name: &str, payload: &[u8]) -> String {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    kind.hash(&mut hasher);
    index_name.hash(&mut hasher);
    payload.hash(&mut hasher);
    format!("{kind}-{index_name}-{:016x}", hasher.finish())
}

/// Splits a batch into chunks of `max(10, min(50, ceil(len/workers)))`
/// (§4.6's dispatch sizing), so small batches stay as one chunk and large
/// batches spread across every worker without producing tiny slivers.
fn chunk_size(total: usize, workers: usize) -> usize {
    let even_share = (total + workers - 1) / workers.max(1);
    even_share.clamp(10, 50)
}

/// One index's authoritative state plus the throttle tracking when its
/// next snapshot should fire. The unified store (§5's "shared-resource
/// policy") is the map of these behind the coordinator's outer lock; each
/// entry's own lock lets `search` and `addDocuments` proceed concurrently
/// against different indices without contending on the whole pool.
struct IndexEntry {
    engine: Arc<RwLock<SearchEngine>>,
    throttle: parking_lot::Mutex<ThrottleState>,
}

/// Worker-pool coordinator (§4.6): owns the unified store, the bounded
/// operation log, and a fleet of worker threads that perform the
/// CPU-bound half of every write. Reads are served directly against the
/// unified store rather than fanned out to workers — the canonical single
/// read path named in §9, not the divergent per-worker-fan-out
/// alternative.
pub struct Coordinator {
    workers: Vec<WorkerHandle>,
    indices: RwLock<HashMap<String, IndexEntry>>,
    oplog: parking_lot::Mutex<OperationLog>,
    vector_clock: parking_lot::Mutex<VectorClock>,
    next_worker: AtomicUsize,
    data_root: Option<std::path::PathBuf>,
    watermark: usize,
    timeout: Duration,
}

impl Coordinator {
    pub fn new(num_workers: usize, data_root: Option<std::path::PathBuf>) -> Self {
        let workers = (0..num_workers.max(1)).map(WorkerHandle::spawn).collect();
        Coordinator {
            workers,
            indices: RwLock::new(HashMap::new()),
            oplog: parking_lot::Mutex::new(OperationLog::new()),
            vector_clock: parking_lot::Mutex::new(VectorClock::new()),
            next_worker: AtomicUsize::new(0),
            data_root,
            watermark: DEFAULT_WATERMARK,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_watermark(mut self, watermark: usize) -> Self {
        self.watermark = watermark;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Picks the least-loaded worker among those that haven't crashed,
    /// rotating the scan's starting point each call so workers tied for
    /// lowest load take turns (§4.6's "lowest in-flight count, round-robin
    /// tiebreak"). A crashed worker is excluded from the rotation (§4.6,
    /// §7's WorkerCrash policy: "worker removed"); if every worker has
    /// crashed, falls back to the full set rather than deadlocking.
    fn pick_worker(&self) -> usize {
        let mut candidates: Vec<usize> = (0..self.workers.len()).filter(|&i| !self.workers[i].is_crashed()).collect();
        if candidates.is_empty() {
            candidates = (0..self.workers.len()).collect();
        }
        let start = self.next_worker.fetch_add(1, Ordering::Relaxed) as usize % candidates.len();
        let mut best = candidates[start];
        let mut best_load = self.workers[best].load();
        for offset in 1..candidates.len() {
            let idx = candidates[(start + offset) % candidates.len()];
            let load = self.workers[idx].load();
            if load < best_load {
                best = idx;
                best_load = load;
            }
        }
        best
    }

    pub fn health(&self) -> HealthReport {
        let queue_len: usize = self.workers.iter().map(|w| w.queue_len() + w.load()).sum();
        HealthReport { queue_len, watermark: self.watermark, workers: self.workers.len() }
    }

    fn require_index(&self, name: &str) -> Result<Arc<RwLock<SearchEngine>>> {
        self.indices
            .read()
            .get(name)
            .map(|e| Arc::clone(&e.engine))
            .ok_or_else(|| Error::NotFound(name.to_string()))
    }

    /// Creates an index if absent; a repeat call against an existing index
    /// is a no-op rather than an error, matching the auto-create-on-first
    /// write behavior this same path serves.
    fn ensure_index(&self, name: &str, config: EngineConfig) -> Result<Arc<RwLock<SearchEngine>>> {
        if let Some(entry) = self.indices.read().get(name) {
            return Ok(Arc::clone(&entry.engine));
        }
        let mut indices = self.indices.write();
        if let Some(entry) = indices.get(name) {
            return Ok(Arc::clone(&entry.engine));
        }
        let engine = SearchEngine::new(name, config)?;
        let entry = IndexEntry {
            engine: Arc::new(RwLock::new(engine)),
            throttle: parking_lot::Mutex::new(ThrottleState::new()),
        };
        let handle = Arc::clone(&entry.engine);
        indices.insert(name.to_string(), entry);
        info!(index = %name, "index created");
        Ok(handle)
    }

    fn log_op(&self, op_id: String, kind: OpKind, index_name: &str, document_id: Option<String>, data: serde_json::Value) {
        let mut clock = self.vector_clock.lock();
        vector_clock::increment(&mut clock, MAIN_WORKER);
        let entry = OpLogEntry {
            op_id: op_id.clone(),
            kind,
            index_name: index_name.to_string(),
            document_id,
            timestamp: now_millis(),
            vector_clock: clock.clone(),
            data,
        };
        self.oplog.lock().append(entry);
    }

    /// Submits one chunk of documents to a worker without waiting for the
    /// result, returning the worker id (for crash detection) and its reply
    /// channel. The worker writes directly into the shared engine handle
    /// under its own lock — there is no separate per-worker replica to
    /// mirror back, since the shared handle it mutates *is* the unified
    /// store. Callers must dispatch every chunk this way before awaiting
    /// any reply, so §4.6's "dispatch each chunk to a worker" actually runs
    /// more than one worker concurrently per call.
    fn submit_add_chunk(
        &self,
        engine: Arc<RwLock<SearchEngine>>,
        chunk: Vec<shardsearch_types::Document>,
    ) -> (usize, Receiver<shardsearch_engine::Result<Vec<AddOutcome>>>) {
        let (reply_tx, reply_rx) = bounded(1);
        let worker_id = self.pick_worker();
        self.workers[worker_id].submit(Box::new(move || {
            let result = engine.write().add_documents(chunk);
            let _ = reply_tx.send(result);
        }));
        (worker_id, reply_rx)
    }

    /// Awaits one chunk's reply up to the pool's timeout. A worker that
    /// panicked mid-job never sends a reply, so a crashed worker's pending
    /// chunk surfaces as `WorkerCrash` instead of a generic `Timeout`.
    fn await_add_chunk(
        &self,
        worker_id: usize,
        reply_rx: Receiver<shardsearch_engine::Result<Vec<AddOutcome>>>,
    ) -> Result<Vec<AddOutcome>> {
        match reply_rx.recv_timeout(self.timeout) {
            Ok(result) => Ok(result?),
            Err(_) if self.workers[worker_id].is_crashed() => Err(Error::WorkerCrash(worker_id)),
            Err(_) => Err(Error::Timeout),
        }
    }

    fn maybe_flush(&self, index_name: &str, docs_written: usize) -> Result<()> {
        let now = Instant::now();
        let (engine, fires) = {
            let indices = self.indices.read();
            let Some(index_entry) = indices.get(index_name) else { return Ok(()) };
            let mut throttle = index_entry.throttle.lock();
            for _ in 0..docs_written {
                throttle.record_write(now);
            }
            let fires = throttle.should_flush(now);
            if fires {
                throttle.record_flush(now);
            }
            (Arc::clone(&index_entry.engine), fires)
        };
        if fires {
            self.flush_engine(index_name, &engine)?;
        }
        Ok(())
    }

    fn flush_engine(&self, index_name: &str, engine: &Arc<RwLock<SearchEngine>>) -> Result<()> {
        let Some(data_root) = &self.data_root else { return Ok(()) };
        let paths = IndexPaths::new(data_root, index_name);
        let mut guard = engine.write();
        let snapshot = guard.to_snapshot();
        let shard_metadata: Vec<ShardMetadata> =
            (0..guard.index.num_shards()).map(|k| ShardMetadata { shard_id: k, token_count: 0 }).collect();
        let metadata = GlobalMetadata {
            total_docs: snapshot.total_docs,
            avg_doc_length: snapshot.avg_doc_length,
            last_flush: now_millis(),
            document_count: snapshot.total_docs,
            index_count: 1,
            shard_metadata,
            is_sharded: guard.sharded,
            num_shards: guard.index.num_shards(),
            enable_sharded_storage: guard.sharded,
            facet_fields: snapshot.facet_fields.clone(),
        };
        let shards = if guard.sharded { Some(guard.index.serialize().shards) } else { None };
        match shardsearch_persistence::write_snapshot(&paths, &snapshot, &metadata, shards.as_deref()) {
            Ok(()) => {
                guard.mark_flushed(metadata.last_flush);
                Ok(())
            }
            Err(err) => {
                warn!(index = %index_name, error = %err, "snapshot flush failed, will retry next trigger");
                Err(err.into())
            }
        }
    }

    /// The single entry point named in §6: every `Operation` variant,
    /// write or read, dispatches through here.
    pub fn execute(&self, op: Operation) -> Result<OperationResult> {
        match op {
            Operation::InitEngine { index_name, config } => {
                let engine_config = EngineConfig {
                    sharding: config.sharding,
                    num_shards: config.num_shards.unwrap_or(1).max(1),
                    facet_fields: config.facet_fields,
                    mappings: config.mappings,
                };
                self.ensure_index(&index_name, engine_config)?;
                Ok(OperationResult::Ack)
            }
            Operation::InitFromSnap { index_name, snapshot, facet_fields } => {
                let sharded = snapshot.inverted_index.num_shards > 1;
                let mut engine = SearchEngine::from_snapshot(index_name.as_str(), snapshot, sharded)?;
                if !facet_fields.is_empty() {
                    engine.facet_fields = facet_fields;
                }
                let entry = IndexEntry {
                    engine: Arc::new(RwLock::new(engine)),
                    throttle: parking_lot::Mutex::new(ThrottleState::new()),
                };
                self.indices.write().insert(index_name, entry);
                Ok(OperationResult::Ack)
            }
            Operation::AddDocuments { index_name, documents } => {
                let payload = serde_json::to_vec(&documents).unwrap_or_default();
                let op_id = content_op_id("add", &index_name, &payload);
                if self.oplog.lock().contains(&op_id) {
                    return Ok(OperationResult::AddOutcomes(Vec::new()));
                }
                let engine = self.ensure_index(&index_name, EngineConfig::default())?;
                let chunk_len = chunk_size(documents.len().max(1), self.workers.len());
                let dispatched: Vec<(usize, Receiver<shardsearch_engine::Result<Vec<AddOutcome>>>)> = documents
                    .chunks(chunk_len)
                    .map(|chunk| self.submit_add_chunk(Arc::clone(&engine), chunk.to_vec()))
                    .collect();
                let mut outcomes = Vec::with_capacity(documents.len());
                for (worker_id, reply_rx) in dispatched {
                    outcomes.extend(self.await_add_chunk(worker_id, reply_rx)?);
                }
                let added = outcomes.iter().filter(|o| o.was_added).count();
                self.log_op(op_id, OpKind::Add, &index_name, None, serde_json::json!({"added": added}));
                self.maybe_flush(&index_name, added)?;
                debug!(index = %index_name, added, "add_documents dispatched");
                Ok(OperationResult::AddOutcomes(outcomes))
            }
            Operation::DeleteDocument { index_name, doc_id } => {
                let op_id = content_op_id("delete", &index_name, doc_id.as_bytes());
                if self.oplog.lock().contains(&op_id) {
                    return Ok(OperationResult::Ack);
                }
                let engine = self.require_index(&index_name)?;
                let (reply_tx, reply_rx) = bounded(1);
                let id = doc_id.clone();
                let target = Arc::clone(&engine);
                let worker_id = self.pick_worker();
                self.workers[worker_id].submit(Box::new(move || {
                    let result = target.write().delete_document(&id);
                    let _ = reply_tx.send(result);
                }));
                match reply_rx.recv_timeout(self.timeout) {
                    Ok(result) => result?,
                    Err(_) if self.workers[worker_id].is_crashed() => return Err(Error::WorkerCrash(worker_id)),
                    Err(_) => return Err(Error::Timeout),
                }
                self.log_op(op_id, OpKind::Delete, &index_name, Some(doc_id), serde_json::Value::Null);
                self.maybe_flush(&index_name, 1)?;
                Ok(OperationResult::Ack)
            }
            Operation::Search { index_name, query, context } => {
                let engine = self.require_index(&index_name)?;
                let result = engine.read().search(&query, &context)?;
                Ok(OperationResult::Search(result))
            }
            Operation::GetFacets { index_name } => {
                let engine = self.require_index(&index_name)?;
                Ok(OperationResult::Facets(engine.read().get_facets()))
            }
            Operation::GetStats { index_name } => {
                let engine = self.require_index(&index_name)?;
                Ok(OperationResult::Stats(engine.read().stats()))
            }
            Operation::Flush { index_name } => {
                let engine = self.require_index(&index_name)?;
                self.flush_engine(&index_name, &engine)?;
                Ok(OperationResult::Ack)
            }
            Operation::DeleteIndex { index_name } => {
                self.indices.write().remove(&index_name).ok_or_else(|| Error::NotFound(index_name.clone()))?;
                Ok(OperationResult::Ack)
            }
            Operation::ListIndices => {
                let indices = self.indices.read();
                let summaries: Vec<IndexSummary> = indices
                    .values()
                    .map(|e| {
                        let engine = e.engine.read();
                        IndexSummary {
                            name: engine.name.clone(),
                            total_docs: engine.total_docs(),
                            mappings_version: engine.mappings.version,
                        }
                    })
                    .collect();
                Ok(OperationResult::Indices(summaries))
            }
        }
    }

    /// Reconciles the coordinator's log against each worker's view of
    /// operations newer than its last sync point (§4.6's 10s sync tick).
    /// Workers here share the unified store directly rather than keeping
    /// independent replicas, so there is no divergent state to merge back
    /// in; this still advertises the log entries a caller would otherwise
    /// poll for.
    pub fn sync(&self, since: &VectorClock) -> Vec<OpLogEntry> {
        self.oplog.lock().newer_than(since).into_iter().cloned().collect()
    }

    /// Flushes every index once, then closes each worker's channel and
    /// waits for its thread to drain (§5's suspension points: shutdown
    /// itself may suspend on outstanding I/O).
    pub fn shutdown(mut self) {
        let names: Vec<String> = self.indices.read().keys().cloned().collect();
        for name in names {
            if let Some(engine) = self.indices.read().get(&name).map(|e| Arc::clone(&e.engine)) {
                if let Err(err) = self.flush_engine(&name, &engine) {
                    warn!(index = %name, error = %err, "final flush on shutdown failed");
                }
            }
        }
        for worker in &mut self.workers {
            worker.join();
        }
    }
}
