use super::channel::QueueConsumer;
use crate::document::Document;
use std::time::Duration;
use tokio::time::Instant;

/// Non-empty run of documents committed together in one call
#[derive(Debug, Clone, PartialEq)]
pub struct Batch {
    documents: Vec<Document>,
}

impl Batch {
    /// Returns `None` for an empty document list
    pub fn new(documents: Vec<Document>) -> Option<Self> {
        if documents.is_empty() {
            None
        } else {
            Some(Self { documents })
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Result of one assembly cycle
#[derive(Debug)]
pub enum Cycle {
    /// The window elapsed or the size bound was reached
    Ready(Option<Batch>),
    /// Cancellation was observed; carries whatever had been collected
    Cancelled(Option<Batch>),
}

/// Drains the hand-off queue into time- and size-bounded batches.
///
/// A batch never holds more than `max_batch_size` documents: the bound is
/// checked before every dequeue.
#[derive(Debug)]
pub struct BatchAssembler {
    queue: QueueConsumer<Document>,
    batch_window: Duration,
    max_batch_size: usize,
}

impl BatchAssembler {
    pub fn new(queue: QueueConsumer<Document>, batch_window: Duration, max_batch_size: usize) -> Self {
        Self {
            queue,
            batch_window,
            max_batch_size: max_batch_size.max(1),
        }
    }

    /// Collect documents until the window elapses, the batch is full, or the
    /// queue is cancelled.
    pub async fn next_cycle(&mut self) -> Cycle {
        let started = Instant::now();
        let mut documents = Vec::new();

        let mut polled = false;

        let cancelled = loop {
            if documents.len() >= self.max_batch_size {
                break false;
            }

            // Poll at least once per cycle so cancellation is seen even with
            // a zero window
            let remaining = self.batch_window.saturating_sub(started.elapsed());
            if remaining.is_zero() && polled {
                break false;
            }
            polled = true;

            match self.queue.try_dequeue(remaining).await {
                Ok(Some(document)) => documents.push(document),
                Ok(None) => {}
                Err(_) => break true,
            }
        };

        let batch = Batch::new(documents);
        if cancelled {
            Cycle::Cancelled(batch)
        } else {
            Cycle::Ready(batch)
        }
    }

    /// Drop whatever is still queued, returning the count
    pub fn discard_remaining(&mut self) -> usize {
        self.queue.discard_remaining()
    }
}
