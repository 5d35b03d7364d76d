//! Optional semantic similarity signal for the relatedness pipeline.
//!
//! Embeds the cleaned plaintext of substantive notes with fastembed and
//! serves cosine similarities between stored document vectors. The vector
//! set persists to `vectors.bin`, which acts as the cached model: an
//! ordinary reload reuses a compatible cache, a forced reindex re-embeds
//! everything.
//!
//! - `embeddings`: fastembed model wrapper
//! - `index`: name-keyed in-memory vector index
//! - `preprocess`: embedding input preparation and change hashing
//! - `storage`: vectors.bin format
//! - `service`: lifecycle + query interface used by the coordinator

pub mod embeddings;
mod index;
mod preprocess;
mod service;
mod storage;

pub use embeddings::EmbeddingModel;
pub use index::VectorIndex;
pub use preprocess::{content_hash, embed_input};
pub use service::{SemanticIndexError, SemanticIndexService};
pub use storage::{VectorStorage, VectorStorageError};
