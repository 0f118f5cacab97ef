//! # Queue Management System
//!
//! Bounded, typed work queues between pipeline stages. The receiving side is
//! shareable so a pool of workers can drain one queue, and every wait is
//! raced against the run's cancellation token.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::{Mutex, mpsc};
use tokio_util::sync::CancellationToken;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    #[error("Queue closed")]
    Closed,

    #[error("Queue operation cancelled")]
    Cancelled,
}

/// Queue metrics for monitoring
#[derive(Debug, Default)]
pub struct QueueMetrics {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueueMetricsSnapshot {
    pub total_enqueued: u64,
    pub total_dequeued: u64,
}

/// Read-only handle on a queue's counters; holding one keeps nothing open
#[derive(Debug, Clone)]
pub struct QueueMonitor {
    metrics: Arc<QueueMetrics>,
}

impl QueueMonitor {
    pub fn snapshot(&self) -> QueueMetricsSnapshot {
        QueueMetricsSnapshot {
            total_enqueued: self.metrics.enqueued.load(Ordering::Relaxed),
            total_dequeued: self.metrics.dequeued.load(Ordering::Relaxed),
        }
    }
}

/// Creates a bounded queue of `capacity` items
pub fn work_queue<T>(capacity: usize) -> (QueueSender<T>, QueueReceiver<T>) {
    let (sender, receiver) = mpsc::channel(capacity);
    let metrics = Arc::new(QueueMetrics::default());
    (
        QueueSender {
            sender,
            metrics: Arc::clone(&metrics),
        },
        QueueReceiver {
            receiver: Arc::new(Mutex::new(receiver)),
            metrics,
        },
    )
}

/// Producer half. The queue closes once every clone is dropped.
#[derive(Debug)]
pub struct QueueSender<T> {
    sender: mpsc::Sender<T>,
    metrics: Arc<QueueMetrics>,
}

impl<T> Clone for QueueSender<T> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

/// A reserved slot; sending through it cannot block or fail
pub struct QueuePermit<'a, T> {
    permit: mpsc::Permit<'a, T>,
    metrics: &'a QueueMetrics,
}

impl<T> QueuePermit<'_, T> {
    pub fn send(self, item: T) {
        self.permit.send(item);
        self.metrics.enqueued.fetch_add(1, Ordering::Relaxed);
    }
}

impl<T> QueueSender<T> {
    /// Waits for a free slot. Cancel-safe: dropping the future loses nothing.
    pub async fn reserve(
        &self,
        token: &CancellationToken,
    ) -> Result<QueuePermit<'_, T>, QueueError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(QueueError::Cancelled),
            permit = self.sender.reserve() => Ok(QueuePermit {
                permit: permit.map_err(|_| QueueError::Closed)?,
                metrics: &self.metrics,
            }),
        }
    }

    /// Enqueues with backpressure
    pub async fn send(&self, item: T, token: &CancellationToken) -> Result<(), QueueError> {
        self.reserve(token).await?.send(item);
        Ok(())
    }
}

/// Consumer half, shareable between workers
#[derive(Debug)]
pub struct QueueReceiver<T> {
    receiver: Arc<Mutex<mpsc::Receiver<T>>>,
    metrics: Arc<QueueMetrics>,
}

impl<T> Clone for QueueReceiver<T> {
    fn clone(&self) -> Self {
        Self {
            receiver: Arc::clone(&self.receiver),
            metrics: Arc::clone(&self.metrics),
        }
    }
}

impl<T> QueueReceiver<T> {
    /// Next item, or `None` once the queue is closed and drained. Cancel-safe.
    pub async fn recv(&self, token: &CancellationToken) -> Result<Option<T>, QueueError> {
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(QueueError::Cancelled),
            item = async { self.receiver.lock().await.recv().await } => {
                if item.is_some() {
                    self.metrics.dequeued.fetch_add(1, Ordering::Relaxed);
                }
                Ok(item)
            }
        }
    }

    pub fn monitor(&self) -> QueueMonitor {
        QueueMonitor {
            metrics: Arc::clone(&self.metrics),
        }
    }
}
