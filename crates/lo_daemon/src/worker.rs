//! Background search worker.
//!
//! Submissions are debounced and the newest one wins: submitting (or
//! cancelling) bumps a generation counter, cancels the running search, and
//! any job whose generation is no longer current is dropped before it starts.
//! The engine itself runs on a blocking thread.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use lo_catalog::ItemQuery;
use lo_core::{
    process, CancellationToken, Catalog, Item, OwnedItem, SearchMonitor, SearchOutcome,
    SearchProgress, SearchRequest, SearchResult,
};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

const EVENT_CAPACITY: usize = 256;

/// One search to run against the worker's catalog.
pub struct SearchJob {
    pub inventory: Arc<Vec<OwnedItem>>,
    pub request: SearchRequest,
    pub query: ItemQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerEvent {
    Started {
        generation: u64,
    },
    Progress {
        generation: u64,
        processed: u64,
        combos: u64,
        elapsed_ms: u64,
        remaining_ms: Option<u64>,
    },
    Finished {
        generation: u64,
        sets: usize,
        emitted: u64,
        elapsed_ms: u64,
    },
    Cancelled {
        generation: u64,
    },
    Failed {
        generation: u64,
        error: String,
    },
}

/// The most recent completed search.
#[derive(Debug, Clone)]
pub struct LatestResult {
    pub generation: u64,
    pub result: Arc<SearchResult>,
}

#[derive(Clone)]
pub struct SearchWorker {
    inner: Arc<Inner>,
}

struct Inner {
    catalog: Arc<Catalog>,
    debounce: Duration,
    generation: AtomicU64,
    /// Token of the search currently running, tagged with its generation.
    running: Mutex<Option<(u64, CancellationToken)>>,
    latest: Mutex<Option<LatestResult>>,
    events: broadcast::Sender<WorkerEvent>,
}

/// Bridges engine checkpoints to the worker's token and event channel.
struct WorkerMonitor {
    generation: u64,
    token: CancellationToken,
    events: broadcast::Sender<WorkerEvent>,
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

impl SearchMonitor for WorkerMonitor {
    fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn report(&self, progress: &SearchProgress) {
        // No subscribers is fine.
        let _ = self.events.send(WorkerEvent::Progress {
            generation: self.generation,
            processed: progress.processed,
            combos: progress.combos,
            elapsed_ms: millis(progress.elapsed),
            remaining_ms: progress.estimated_remaining().map(millis),
        });
    }
}

impl SearchWorker {
    pub fn new(catalog: Arc<Catalog>, debounce: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        SearchWorker {
            inner: Arc::new(Inner {
                catalog,
                debounce,
                generation: AtomicU64::new(0),
                running: Mutex::new(None),
                latest: Mutex::new(None),
                events,
            }),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Queues `job`, superseding anything queued or running. Returns the
    /// job's generation.
    pub fn submit(&self, job: SearchJob) -> u64 {
        let generation = self.inner.supersede();
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move { inner.run(generation, job).await });
        generation
    }

    /// Cancels the queued or running search. Returns whether a search was
    /// running.
    pub fn cancel(&self) -> bool {
        let running = self.inner.running.lock().is_some();
        self.inner.supersede();
        running
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkerEvent> {
        self.inner.events.subscribe()
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        self.inner.running.lock().is_some()
    }

    pub fn latest(&self) -> Option<LatestResult> {
        self.inner.latest.lock().clone()
    }
}

impl Inner {
    /// Bumps the generation and cancels the running search.
    fn supersede(&self) -> u64 {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((_, token)) = self.running.lock().take() {
            token.cancel();
        }
        generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    async fn run(self: Arc<Self>, generation: u64, job: SearchJob) {
        if !self.debounce.is_zero() {
            tokio::time::sleep(self.debounce).await;
        }
        let token = CancellationToken::new();
        {
            let mut running = self.running.lock();
            if !self.is_current(generation) {
                tracing::debug!(generation, "search superseded before start");
                return;
            }
            *running = Some((generation, token.clone()));
        }
        let _ = self.events.send(WorkerEvent::Started { generation });

        let monitor = WorkerMonitor {
            generation,
            token,
            events: self.events.clone(),
        };
        let catalog = Arc::clone(&self.catalog);
        let joined = tokio::task::spawn_blocking(move || {
            process(
                &catalog,
                &job.inventory,
                &job.request,
                &|item: &Item| job.query.matches(item),
                &monitor,
            )
        })
        .await;

        self.clear_running(generation);
        let event = match joined {
            Ok(Ok(outcome)) => self.record(generation, outcome),
            Ok(Err(err)) => WorkerEvent::Failed {
                generation,
                error: err.to_string(),
            },
            Err(err) => {
                tracing::error!(generation, "search task failed: {err}");
                WorkerEvent::Failed {
                    generation,
                    error: "search task failed".to_string(),
                }
            }
        };
        let _ = self.events.send(event);
    }

    fn clear_running(&self, generation: u64) {
        let mut running = self.running.lock();
        if running.as_ref().is_some_and(|(g, _)| *g == generation) {
            *running = None;
        }
    }

    fn record(&self, generation: u64, outcome: SearchOutcome) -> WorkerEvent {
        match outcome {
            SearchOutcome::Cancelled { .. } => {
                tracing::debug!(generation, "search cancelled");
                WorkerEvent::Cancelled { generation }
            }
            SearchOutcome::Completed(result) => {
                let sets = result.sets.len();
                tracing::info!(
                    generation,
                    sets,
                    elapsed_ms = result.elapsed_ms,
                    "search finished"
                );
                let event = WorkerEvent::Finished {
                    generation,
                    sets,
                    emitted: result.info.emitted,
                    elapsed_ms: result.elapsed_ms,
                };
                let mut latest = self.latest.lock();
                // A slow older search never replaces a newer result.
                if latest.as_ref().is_none_or(|l| l.generation < generation) {
                    *latest = Some(LatestResult {
                        generation,
                        result: Arc::new(*result),
                    });
                }
                event
            }
        }
    }
}
