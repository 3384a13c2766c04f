//! Core data types and error definitions for the ingestion pipeline.

use serde::Serialize;
use thiserror::Error;

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible window size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap cannot exceed the window it overlaps.
    #[error("chunk overlap ({overlap}) is larger than chunk size ({chunk_size})")]
    OverlapTooLarge {
        /// Requested window size in characters.
        chunk_size: usize,
        /// Requested overlap in characters.
        overlap: usize,
    },
    /// An empty separator would split between every character.
    #[error("chunk separator must not be empty")]
    EmptySeparator,
}

/// Errors produced while turning raw bundles or directories into documents.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// The downloaded bundle is not a readable zip archive.
    #[error("Failed to read document archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    /// Reading an entry or file failed.
    #[error("Failed to read document {name}: {source}")]
    Read {
        /// Archive entry name or file path.
        name: String,
        /// Underlying IO failure (including invalid UTF-8).
        #[source]
        source: std::io::Error,
    },
    /// Walking the documents directory failed.
    #[error("Failed to walk documents directory: {0}")]
    Walk(#[from] walkdir::Error),
}

/// A named text document. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Document {
    /// File name the document was loaded from.
    pub id: String,
    /// Full UTF-8 text content.
    pub content: String,
}

impl Document {
    /// Construct a document from its identifier and content.
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
        }
    }

    /// Content prefixed with a `[<id>]` header line so chunks carry their provenance.
    pub fn tagged_text(&self) -> String {
        format!("[{}]\n{}", self.id, self.content)
    }
}

/// A retrieval unit cut from a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Chunk {
    /// Chunk text.
    pub text: String,
    /// Identifier of the document the chunk came from.
    pub source: String,
}

/// Splitter settings shared by every document in a corpus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkingOptions {
    /// Maximum characters per window (oversized fragments excepted).
    pub chunk_size: usize,
    /// Characters carried over from the tail of the previous window.
    pub overlap: usize,
    /// Boundary the text is split on before packing.
    pub separator: String,
}

impl Default for ChunkingOptions {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            overlap: 100,
            separator: "\n".to_string(),
        }
    }
}
