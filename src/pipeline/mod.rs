pub mod assembler;
pub mod backpressure;
pub mod channel;
pub mod committer;
pub mod lifecycle;
pub mod runner;
pub mod state;

pub use assembler::{Batch, BatchAssembler, Cycle};
pub use backpressure::BackpressureHandler;
pub use channel::{create_queue, QueueConsumer, QueueError, QueueProducer};
pub use committer::{BatchCommitter, CommitOutcome};
pub use lifecycle::{IndexingPipeline, PipelineError, PipelineStats};
pub use runner::run_worker;
pub use state::PipelineState;
