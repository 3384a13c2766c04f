//! In-memory vector index over document chunks.
//!
//! The index is built once from a fixed chunk set and is read-only afterwards: there is no
//! method that inserts, updates or removes entries after [`EmbeddingIndex::build`] returns.
//! Search is brute-force cosine similarity, which is plenty for a corpus of course notes.

use crate::embedding::{EmbeddingClient, EmbeddingClientError};
use crate::processing::Chunk;
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;

const EMBEDDING_BATCH_SIZE: usize = 64;

/// Errors raised while building the index.
#[derive(Debug, Error)]
pub enum IndexBuildError {
    /// Nothing to index.
    #[error("cannot build an index from an empty chunk set")]
    EmptyChunks,
    /// Embedding provider failed for a batch of chunks.
    #[error("Failed to embed chunks: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Provider returned a different number of vectors than inputs.
    #[error("Embedding provider returned {actual} vectors for {expected} chunks")]
    VectorCountMismatch {
        /// Number of chunks submitted.
        expected: usize,
        /// Number of vectors returned.
        actual: usize,
    },
    /// Vectors of different widths cannot share an index.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Width of the first vector.
        expected: usize,
        /// Width of the offending vector.
        actual: usize,
    },
}

/// Errors emitted while searching the index.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Embedding provider failed to return vectors for the query text.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Embedding provider returned no vectors.
    #[error("Embedding provider returned no vectors for the query")]
    EmptyEmbedding,
    /// Query vector width does not match the indexed vectors.
    #[error("Embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Width of indexed vectors.
        expected: usize,
        /// Width of the query vector.
        actual: usize,
    },
}

/// A chunk paired with its embedding.
#[derive(Debug, Clone)]
struct IndexEntry {
    chunk: Chunk,
    vector: Vec<f32>,
}

/// Ranked search result.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchHit {
    /// Cosine similarity between the query and the chunk.
    pub score: f32,
    /// Chunk text.
    pub text: String,
    /// Identifier of the source document.
    pub source: String,
}

/// Immutable nearest-neighbour index.
pub struct EmbeddingIndex {
    entries: Vec<IndexEntry>,
    dimension: usize,
    embedder: Arc<dyn EmbeddingClient>,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("entries", &self.entries.len())
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl EmbeddingIndex {
    /// Embed every chunk and assemble the index.
    ///
    /// The same `embedder` is retained and used for query embedding, so queries and chunks
    /// always live in the same vector space.
    pub async fn build(
        chunks: Vec<Chunk>,
        embedder: Arc<dyn EmbeddingClient>,
    ) -> Result<Self, IndexBuildError> {
        if chunks.is_empty() {
            return Err(IndexBuildError::EmptyChunks);
        }

        let mut entries = Vec::with_capacity(chunks.len());
        let mut dimension: Option<usize> = None;

        for batch in chunks.chunks(EMBEDDING_BATCH_SIZE) {
            let texts: Vec<String> = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let vectors = embedder.generate_embeddings(texts).await?;
            if vectors.len() != batch.len() {
                return Err(IndexBuildError::VectorCountMismatch {
                    expected: batch.len(),
                    actual: vectors.len(),
                });
            }

            for (chunk, vector) in batch.iter().zip(vectors) {
                let expected = *dimension.get_or_insert(vector.len());
                if vector.len() != expected {
                    return Err(IndexBuildError::DimensionMismatch {
                        expected,
                        actual: vector.len(),
                    });
                }
                entries.push(IndexEntry {
                    chunk: chunk.clone(),
                    vector,
                });
            }
            tracing::debug!(embedded = entries.len(), total = chunks.len(), "Embedded batch");
        }

        let dimension = dimension.unwrap_or_default();
        tracing::info!(entries = entries.len(), dimension, "Built embedding index");
        Ok(Self {
            entries,
            dimension,
            embedder,
        })
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a successfully built index; provided for API symmetry.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Width of the indexed vectors.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return the `k` chunks most similar to `query`, best first.
    ///
    /// Equal scores keep insertion order, so identical queries always produce identical
    /// rankings under a deterministic embedder.
    pub async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>, SearchError> {
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut vectors = self
            .embedder
            .generate_embeddings(vec![query.to_string()])
            .await?;
        let query_vector = vectors.pop().ok_or(SearchError::EmptyEmbedding)?;
        if query_vector.len() != self.dimension {
            return Err(SearchError::DimensionMismatch {
                expected: self.dimension,
                actual: query_vector.len(),
            });
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                let score = cosine_similarity(&query_vector, &entry.vector);
                // Overflowing vectors score NaN; rank them last.
                (position, if score.is_nan() { f32::NEG_INFINITY } else { score })
            })
            .collect();
        // Stable sort keeps insertion order for ties.
        scored.sort_by(|left, right| right.1.total_cmp(&left.1));

        let hits = scored
            .into_iter()
            .take(k)
            .map(|(position, score)| {
                let entry = &self.entries[position];
                SearchHit {
                    score,
                    text: entry.chunk.text.clone(),
                    source: entry.chunk.source.clone(),
                }
            })
            .collect::<Vec<_>>();
        tracing::debug!(k, hits = hits.len(), "Similarity search completed");
        Ok(hits)
    }
}

fn cosine_similarity(left: &[f32], right: &[f32]) -> f32 {
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    let left_norm = left.iter().map(|value| value * value).sum::<f32>().sqrt();
    let right_norm = right.iter().map(|value| value * value).sum::<f32>().sqrt();
    if left_norm == 0.0 || right_norm == 0.0 {
        0.0
    } else {
        dot / (left_norm * right_norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbeddingClient;
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn chunk(text: &str) -> Chunk {
        Chunk {
            text: text.to_string(),
            source: "doc.txt".to_string(),
        }
    }

    /// Maps known texts to fixed vectors; unknown text embeds to the zero vector.
    struct TableEmbedder(HashMap<String, Vec<f32>>);

    #[async_trait]
    impl EmbeddingClient for TableEmbedder {
        async fn generate_embeddings(
            &self,
            texts: Vec<String>,
        ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
            Ok(texts
                .iter()
                .map(|text| self.0.get(text).cloned().unwrap_or_else(|| vec![0.0, 0.0]))
                .collect())
        }
    }

    fn table(pairs: &[(&str, [f32; 2])]) -> Arc<dyn EmbeddingClient> {
        Arc::new(TableEmbedder(
            pairs
                .iter()
                .map(|(text, vector)| (text.to_string(), vector.to_vec()))
                .collect(),
        ))
    }

    #[tokio::test]
    async fn build_rejects_empty_chunk_set() {
        let error = EmbeddingIndex::build(Vec::new(), Arc::new(HashingEmbeddingClient::new(8)))
            .await
            .unwrap_err();
        assert!(matches!(error, IndexBuildError::EmptyChunks));
    }

    #[tokio::test]
    async fn search_orders_by_similarity_and_breaks_ties_by_insertion() {
        let embedder = table(&[
            ("east", [1.0, 0.0]),
            ("north", [0.0, 1.0]),
            ("east again", [2.0, 0.0]),
            ("north-east", [1.0, 1.0]),
            ("query", [1.0, 0.0]),
        ]);
        let index = EmbeddingIndex::build(
            vec![
                chunk("north"),
                chunk("east"),
                chunk("north-east"),
                chunk("east again"),
            ],
            embedder,
        )
        .await
        .expect("index");

        let hits = index.search("query", 3).await.expect("hits");
        let texts: Vec<_> = hits.iter().map(|hit| hit.text.as_str()).collect();
        assert_eq!(texts, vec!["east", "east again", "north-east"]);
        assert!(hits[0].score >= hits[1].score && hits[1].score >= hits[2].score);
    }

    #[tokio::test]
    async fn non_finite_vectors_rank_last() {
        let embedder = table(&[
            ("overflowed", [f32::INFINITY, 0.0]),
            ("east", [1.0, 0.0]),
            ("north", [0.0, 1.0]),
            ("query", [1.0, 0.0]),
        ]);
        let index = EmbeddingIndex::build(
            vec![chunk("overflowed"), chunk("east"), chunk("north")],
            embedder,
        )
        .await
        .expect("index");

        let hits = index.search("query", 3).await.expect("hits");
        let texts: Vec<_> = hits.iter().map(|hit| hit.text.as_str()).collect();
        assert_eq!(texts, vec!["east", "north", "overflowed"]);
        assert_eq!(hits[2].score, f32::NEG_INFINITY);
    }

    #[tokio::test]
    async fn repeated_search_is_identical() {
        let chunks = (0..20)
            .map(|idx| chunk(&format!("chunk number {idx} about sector {}", idx % 3)))
            .collect();
        let index = EmbeddingIndex::build(chunks, Arc::new(HashingEmbeddingClient::new(32)))
            .await
            .expect("index");

        let first = index.search("sector 2", 3).await.expect("hits");
        let second = index.search("sector 2", 3).await.expect("hits");
        assert_eq!(first.len(), 3);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn k_larger_than_index_returns_everything() {
        let index = EmbeddingIndex::build(
            vec![chunk("a"), chunk("b")],
            Arc::new(HashingEmbeddingClient::new(4)),
        )
        .await
        .expect("index");
        assert_eq!(index.search("a", 10).await.expect("hits").len(), 2);
        assert!(index.search("a", 0).await.expect("hits").is_empty());
    }

    #[tokio::test]
    async fn build_batches_large_chunk_sets() {
        let chunks: Vec<Chunk> = (0..(EMBEDDING_BATCH_SIZE * 2 + 5))
            .map(|idx| chunk(&format!("chunk {idx}")))
            .collect();
        let index = EmbeddingIndex::build(chunks, Arc::new(HashingEmbeddingClient::new(8)))
            .await
            .expect("index");
        assert_eq!(index.len(), EMBEDDING_BATCH_SIZE * 2 + 5);
        assert_eq!(index.dimension(), 8);
    }

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine_similarity(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
    }
}
