//! Knowledge retrieval over the FAQ corpus.
//!
//! `KnowledgeRetriever` embeds a query and runs a top-k similarity search
//! against a `VectorIndex`. Two indexes are provided: `MilvusIndex` for the
//! hosted collection and `MemoryIndex` for local runs and tests.

pub mod corpus;
pub mod index;
pub mod milvus;
pub mod retriever;
pub mod types;

pub use corpus::{index_corpus, load_corpus};
pub use index::{MemoryIndex, VectorIndex};
pub use milvus::MilvusIndex;
pub use retriever::KnowledgeRetriever;
pub use types::*;
