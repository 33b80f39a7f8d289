//! Transport seams between the synchronizer and the remote store.

use crate::error::SyncResult;
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::warn;

/// Receives flushed batches from the synchronizer.
///
/// Upload is fire-and-forget: by the time this is called the synchronizer
/// has already committed its bookkeeping, so implementations own delivery,
/// retries and durability.
pub trait UploadTransport<D> {
    /// Hands a non-empty batch of deltas over for delivery.
    fn upload(&self, deltas: Vec<D>);
}

impl<D, T: UploadTransport<D> + ?Sized> UploadTransport<D> for Arc<T> {
    fn upload(&self, deltas: Vec<D>) {
        (**self).upload(deltas)
    }
}

/// Delivers one batch and reports the outcome.
///
/// This is the blocking, fallible half of a transport. It is wrapped by
/// [`InlineTransport`] or by a queue that retries it.
pub trait BatchSender<D> {
    /// Sends the batch, blocking until the remote answered.
    fn send(&self, deltas: &[D]) -> SyncResult<()>;
}

impl<D, S: BatchSender<D> + ?Sized> BatchSender<D> for Arc<S> {
    fn send(&self, deltas: &[D]) -> SyncResult<()> {
        (**self).send(deltas)
    }
}

/// Sends every batch synchronously on the caller's thread.
///
/// Failures are logged and the batch is dropped.
pub struct InlineTransport<S> {
    sender: S,
}

impl<S> InlineTransport<S> {
    /// Wraps a sender.
    pub fn new(sender: S) -> Self {
        Self { sender }
    }

    /// Returns the wrapped sender.
    pub fn sender(&self) -> &S {
        &self.sender
    }
}

impl<D, S: BatchSender<D>> UploadTransport<D> for InlineTransport<S> {
    fn upload(&self, deltas: Vec<D>) {
        if let Err(err) = self.sender.send(&deltas) {
            warn!(error = %err, deltas = deltas.len(), "dropping batch after failed upload");
        }
    }
}

/// A transport that records every batch, for testing.
///
/// Clones share the same record.
#[derive(Debug)]
pub struct MockTransport<D> {
    batches: Arc<Mutex<Vec<Vec<D>>>>,
}

impl<D> MockTransport<D> {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self {
            batches: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Returns the number of uploads received.
    pub fn upload_count(&self) -> usize {
        self.batches.lock().len()
    }

    /// Forgets everything received so far.
    pub fn clear(&self) {
        self.batches.lock().clear();
    }
}

impl<D: Clone> MockTransport<D> {
    /// Returns every batch received, oldest first.
    pub fn batches(&self) -> Vec<Vec<D>> {
        self.batches.lock().clone()
    }

    /// Returns the most recent batch.
    pub fn last_batch(&self) -> Option<Vec<D>> {
        self.batches.lock().last().cloned()
    }

    /// Returns all uploaded deltas in delivery order.
    pub fn uploaded(&self) -> Vec<D> {
        self.batches.lock().iter().flatten().cloned().collect()
    }
}

impl<D> Clone for MockTransport<D> {
    fn clone(&self) -> Self {
        Self {
            batches: Arc::clone(&self.batches),
        }
    }
}

impl<D> Default for MockTransport<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> UploadTransport<D> for MockTransport<D> {
    fn upload(&self, deltas: Vec<D>) {
        self.batches.lock().push(deltas);
    }
}

impl<D: Clone> BatchSender<D> for MockTransport<D> {
    fn send(&self, deltas: &[D]) -> SyncResult<()> {
        self.batches.lock().push(deltas.to_vec());
        Ok(())
    }
}
