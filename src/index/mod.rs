pub mod memory;
pub mod solr;
pub mod traits;

pub use memory::{CommittedBatch, InjectedFailure, MemoryIndex};
pub use solr::SolrIndex;
pub use traits::{IndexError, PingResponse, SearchIndex, UpdateResponse};
