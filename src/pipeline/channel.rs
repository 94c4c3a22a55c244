use super::backpressure::BackpressureHandler;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum QueueError {
    #[error("queue was cancelled")]
    Cancelled,

    #[error("queue is full")]
    Full,

    #[error("interrupted while waiting for queue space")]
    Interrupted,
}

/// Create a bounded hand-off queue.
///
/// Producers and the consumer share `cancel`; once it fires, blocked
/// `enqueue` and `try_dequeue` calls return [`QueueError::Cancelled`].
pub fn create_queue<T>(
    capacity: usize,
    backpressure: BackpressureHandler,
    cancel: CancellationToken,
) -> (QueueProducer<T>, QueueConsumer<T>) {
    let (tx, rx) = mpsc::channel(capacity);
    (
        QueueProducer {
            tx,
            backpressure,
            cancel: cancel.clone(),
        },
        QueueConsumer { rx, cancel },
    )
}

/// Producer side. Cheap to clone, one per producer context.
#[derive(Debug)]
pub struct QueueProducer<T> {
    tx: mpsc::Sender<T>,
    backpressure: BackpressureHandler,
    cancel: CancellationToken,
}

impl<T> Clone for QueueProducer<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            backpressure: self.backpressure.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

impl<T> QueueProducer<T> {
    /// Store an item, waiting for space according to the backpressure policy
    pub async fn enqueue(&self, item: T) -> Result<(), QueueError> {
        self.enqueue_until(item, None).await
    }

    /// Like [`enqueue`](Self::enqueue), but gives up with
    /// [`QueueError::Interrupted`] if `interrupt` fires while waiting.
    pub async fn enqueue_interruptible(
        &self,
        item: T,
        interrupt: &CancellationToken,
    ) -> Result<(), QueueError> {
        self.enqueue_until(item, Some(interrupt)).await
    }

    async fn enqueue_until(
        &self,
        item: T,
        interrupt: Option<&CancellationToken>,
    ) -> Result<(), QueueError> {
        if self.cancel.is_cancelled() {
            return Err(QueueError::Cancelled);
        }

        let interrupted = async {
            match interrupt {
                Some(token) => token.cancelled().await,
                None => std::future::pending::<()>().await,
            }
        };

        let send = async {
            match self.backpressure.wait_limit() {
                None => self.tx.send(item).await.map_err(|_| QueueError::Cancelled),
                // Timeout polls the send first, so a zero limit still admits
                // the item when a slot is free
                Some(limit) => match tokio::time::timeout(limit, self.tx.send(item)).await {
                    Ok(sent) => sent.map_err(|_| QueueError::Cancelled),
                    Err(_) => Err(QueueError::Full),
                },
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(QueueError::Cancelled),
            _ = interrupted => Err(QueueError::Interrupted),
            result = send => result,
        }
    }

    /// Number of items currently queued
    pub fn depth(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    pub fn capacity(&self) -> usize {
        self.tx.max_capacity()
    }
}

/// Consumer side, owned by the single worker
#[derive(Debug)]
pub struct QueueConsumer<T> {
    rx: mpsc::Receiver<T>,
    cancel: CancellationToken,
}

impl<T> QueueConsumer<T> {
    /// Wait up to `timeout` for the next item.
    ///
    /// Returns `Ok(None)` when the timeout elapses with nothing queued. A
    /// queue whose producers have all been dropped reports `Cancelled`.
    pub async fn try_dequeue(&mut self, timeout: Duration) -> Result<Option<T>, QueueError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(QueueError::Cancelled),
            received = tokio::time::timeout(timeout, self.rx.recv()) => match received {
                Ok(Some(item)) => Ok(Some(item)),
                Ok(None) => Err(QueueError::Cancelled),
                Err(_) => Ok(None),
            },
        }
    }

    /// Close the queue and drop everything still in it, returning how many
    /// items were discarded.
    pub fn discard_remaining(&mut self) -> usize {
        self.rx.close();
        let mut discarded = 0;
        while self.rx.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}
