//! Background delivery queue.
//!
//! [`QueuedTransport`] hands batches to a worker thread that sends them in
//! order, retrying retryable failures with backoff. The editor thread never
//! blocks on the network.

use crate::config::RetryConfig;
use crate::error::{SyncError, SyncResult};
use crate::transport::{BatchSender, UploadTransport};
use parking_lot::Mutex;
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tracing::{debug, error, warn};

/// Delivery counters for a queue.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Batches delivered.
    pub delivered: u64,
    /// Batches given up on.
    pub failed: u64,
    /// Retry attempts made.
    pub retries: u64,
}

/// An upload transport that delivers on a worker thread.
///
/// Batches are delivered in the order they were uploaded. A batch that still
/// fails after the configured attempts is logged and dropped; later batches
/// are still sent.
pub struct QueuedTransport<D> {
    tx: Mutex<Option<Sender<Vec<D>>>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stats: Arc<Mutex<QueueStats>>,
}

impl<D: Send + 'static> QueuedTransport<D> {
    /// Starts a worker thread delivering through `sender`.
    pub fn spawn<S>(sender: S, retry: RetryConfig) -> SyncResult<Self>
    where
        S: BatchSender<D> + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Vec<D>>();
        let stats = Arc::new(Mutex::new(QueueStats::default()));
        let worker_stats = Arc::clone(&stats);

        let worker = thread::Builder::new()
            .name("worldedit-upload".into())
            .spawn(move || {
                for batch in rx {
                    deliver(&sender, &batch, &retry, &worker_stats);
                }
                debug!("upload queue drained");
            })
            .map_err(|e| SyncError::InvalidConfig(format!("failed to start upload worker: {e}")))?;

        Ok(Self {
            tx: Mutex::new(Some(tx)),
            worker: Mutex::new(Some(worker)),
            stats,
        })
    }
}

impl<D> QueuedTransport<D> {
    /// Returns a snapshot of the delivery counters.
    pub fn stats(&self) -> QueueStats {
        self.stats.lock().clone()
    }

    /// Stops accepting batches and waits for the queue to drain.
    pub fn close(&self) {
        self.tx.lock().take();
        if let Some(worker) = self.worker.lock().take() {
            if worker.join().is_err() {
                error!("upload worker panicked");
            }
        }
    }

    /// Returns true once the queue was closed.
    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl<D> UploadTransport<D> for QueuedTransport<D> {
    fn upload(&self, deltas: Vec<D>) {
        let result = match self.tx.lock().as_ref() {
            Some(tx) => tx.send(deltas).map_err(|_| SyncError::QueueClosed),
            None => Err(SyncError::QueueClosed),
        };
        if let Err(err) = result {
            error!(error = %err, "dropping batch");
        }
    }
}

impl<D> Drop for QueuedTransport<D> {
    fn drop(&mut self) {
        self.close();
    }
}

fn deliver<D, S: BatchSender<D>>(
    sender: &S,
    batch: &[D],
    retry: &RetryConfig,
    stats: &Mutex<QueueStats>,
) {
    let attempts = retry.max_attempts.max(1);
    let mut attempt = 0;
    loop {
        match sender.send(batch) {
            Ok(()) => {
                stats.lock().delivered += 1;
                return;
            }
            Err(err) if err.is_retryable() && attempt + 1 < attempts => {
                attempt += 1;
                let delay = retry.delay_for_attempt(attempt);
                warn!(error = %err, attempt, ?delay, "upload failed, retrying");
                stats.lock().retries += 1;
                thread::sleep(delay);
            }
            Err(err) => {
                error!(
                    error = %err,
                    deltas = batch.len(),
                    attempts = attempt + 1,
                    "giving up on batch"
                );
                stats.lock().failed += 1;
                return;
            }
        }
    }
}
