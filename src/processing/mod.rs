//! Ingestion pipeline: loading documents and cutting them into retrieval chunks.

pub mod chunking;
pub mod documents;
pub mod types;

pub use chunking::{split, split_all, split_text};
pub use documents::{extract_documents, load_directory};
pub use types::{Chunk, ChunkingError, ChunkingOptions, Document, DocumentError};
