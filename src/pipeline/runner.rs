use super::assembler::{BatchAssembler, Cycle};
use super::committer::BatchCommitter;
use crate::observe::{PipelineMetrics, PipelineObserver};
use std::sync::Arc;

/// Run the indexing worker.
///
/// Assembles batches and commits each one before starting the next cycle, so
/// index latency throttles how fast the queue drains. Returns once the queue
/// is cancelled. A partial batch in hand at that point is still committed;
/// documents left in the queue are discarded and their count returned.
pub async fn run_worker(
    mut assembler: BatchAssembler,
    committer: BatchCommitter,
    observer: Arc<dyn PipelineObserver>,
    metrics: Arc<PipelineMetrics>,
) -> usize {
    observer.worker_started();

    loop {
        match assembler.next_cycle().await {
            Cycle::Ready(Some(batch)) => {
                committer.commit(batch).await;
            }
            // An empty cycle may finish without awaiting anything
            Cycle::Ready(None) => tokio::task::yield_now().await,
            Cycle::Cancelled(batch) => {
                if let Some(batch) = batch {
                    committer.commit(batch).await;
                }
                break;
            }
        }
    }

    let discarded = assembler.discard_remaining();
    metrics.documents_discarded(discarded);
    observer.worker_stopped(discarded);

    discarded
}
