//! Detection worker pool
//!
//! The detect route hands batches to a bounded queue and answers right away.
//! A fixed set of workers drains the queue; each batch is resolved against
//! the player table and written to `reports`. Failures are logged and the
//! batch is dropped.

use std::sync::Arc;

use async_trait::async_trait;
use botdetect_core::DetectionBatch;
use sqlx::PgPool;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, Instrument};
use uuid::Uuid;

use crate::db::{DbError, PlayerRepo, ReportRepo};

/// Queue error
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("detection queue is full")]
    Full,

    #[error("detection queue is closed")]
    Closed,
}

/// What a processed batch amounted to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub received: usize,
    pub inserted: u64,
    pub players_created: u64,
}

/// Turns a queued batch into stored reports
#[async_trait]
pub trait DetectionProcessor: Send + Sync + 'static {
    async fn process(&self, batch: DetectionBatch) -> Result<BatchSummary, DbError>;
}

/// Processor backed by the players and reports tables
pub struct DbDetectionProcessor {
    pool: PgPool,
}

impl DbDetectionProcessor {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DetectionProcessor for DbDetectionProcessor {
    async fn process(&self, mut batch: DetectionBatch) -> Result<BatchSummary, DbError> {
        let received = batch.len();

        let off_map = batch.retain_valid_regions();
        if off_map > 0 {
            debug!(off_map, "Dropped detections outside the map");
        }
        if batch.is_empty() {
            return Ok(BatchSummary {
                received,
                ..BatchSummary::default()
            });
        }

        let names = batch.player_names();
        let players = PlayerRepo::new(&self.pool).resolve(&names).await?;

        let rows = batch.into_reports(&players.ids);
        let inserted = ReportRepo::new(&self.pool).insert_batch(&rows).await?;

        Ok(BatchSummary {
            received,
            inserted,
            players_created: players.created,
        })
    }
}

struct Job {
    id: Uuid,
    batch: DetectionBatch,
}

/// Sending half of the detection queue
#[derive(Clone)]
pub struct DetectionQueue {
    tx: mpsc::Sender<Job>,
}

/// Worker tasks draining the queue
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl DetectionQueue {
    /// Spawn `workers` tasks reading from a queue of `capacity` batches.
    pub fn start(
        processor: Arc<dyn DetectionProcessor>,
        workers: usize,
        capacity: usize,
    ) -> (Self, WorkerPool) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..workers.max(1))
            .map(|worker| {
                let rx = Arc::clone(&rx);
                let processor = Arc::clone(&processor);
                tokio::spawn(run_worker(worker, rx, processor))
            })
            .collect();

        info!(workers, capacity, "Detection workers started");
        (Self { tx }, WorkerPool { handles })
    }

    /// Queue a batch without waiting for room. Returns the batch id used in
    /// worker logs.
    pub fn submit(&self, batch: DetectionBatch) -> Result<Uuid, QueueError> {
        let id = Uuid::new_v4();
        self.tx.try_send(Job { id, batch }).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => QueueError::Full,
            mpsc::error::TrySendError::Closed(_) => QueueError::Closed,
        })?;
        Ok(id)
    }

    /// Batches that can be queued right now.
    pub fn free_slots(&self) -> usize {
        self.tx.capacity()
    }
}

impl WorkerPool {
    /// Wait for the workers to drain the queue.
    ///
    /// Workers exit once every `DetectionQueue` handle has been dropped and
    /// the remaining batches are processed.
    pub async fn shutdown(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Detection worker panicked: {}", e);
            }
        }
        info!("Detection workers stopped");
    }
}

async fn run_worker(
    worker: usize,
    rx: Arc<Mutex<mpsc::Receiver<Job>>>,
    processor: Arc<dyn DetectionProcessor>,
) {
    loop {
        // Hold the lock only while waiting for the next job
        let job = { rx.lock().await.recv().await };
        let Some(job) = job else {
            debug!(worker, "Detection queue closed");
            break;
        };

        let span = tracing::info_span!("detections", batch = %job.id, worker);
        async {
            let reporter = job.batch.reporter().to_owned();
            match processor.process(job.batch).await {
                Ok(summary) => info!(
                    reporter = %reporter,
                    received = summary.received,
                    inserted = summary.inserted,
                    players_created = summary.players_created,
                    "Detections stored"
                ),
                Err(e) => error!(reporter = %reporter, "Detection batch failed: {}", e),
            }
        }
        .instrument(span)
        .await;
    }
}
