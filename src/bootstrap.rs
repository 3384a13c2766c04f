//! Startup sequence: credential check, document loading, chunking, index build.
//!
//! Any failure here is fatal; no partially initialised assistant is ever returned.

use crate::assistant::{ApiAggregator, Assistant, PatternExtractor};
use crate::embedding::EmbeddingClient;
use crate::index::{EmbeddingIndex, IndexBuildError};
use crate::llm::LanguageModel;
use crate::metrics::SessionMetrics;
use crate::portfolio::{PortfolioApi, PortfolioApiError};
use crate::processing::{
    ChunkingError, ChunkingOptions, Document, DocumentError, extract_documents, load_directory,
    split_all,
};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Errors that abort startup before any query is served.
#[derive(Debug, Error)]
pub enum StartupError {
    /// The credential check failed.
    #[error("Unable to verify API credentials: {0}")]
    HealthCheck(#[source] PortfolioApiError),
    /// The document archive could not be downloaded.
    #[error("Failed to download documents: {0}")]
    Download(#[source] PortfolioApiError),
    /// Documents could not be read from the archive or directory.
    #[error(transparent)]
    Documents(#[from] DocumentError),
    /// Loading succeeded but produced nothing to index.
    #[error("No documents found")]
    NoDocuments,
    /// Chunking settings were rejected.
    #[error("Failed to split documents: {0}")]
    Chunking(#[from] ChunkingError),
    /// The index could not be built.
    #[error("Failed to build index: {0}")]
    Index(#[from] IndexBuildError),
}

/// Where the corpus comes from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DocumentSource {
    /// Download the zip bundle from the portfolio API.
    Archive,
    /// Read `.txt` files from a local directory.
    Directory(PathBuf),
}

/// Settings for [`prepare`].
#[derive(Clone, Debug)]
pub struct StartupOptions {
    /// Corpus location.
    pub source: DocumentSource,
    /// Splitter settings.
    pub chunking: ChunkingOptions,
}

/// Collaborators constructed by the caller and handed to the assistant.
pub struct Collaborators {
    /// Portfolio REST client.
    pub api: Arc<dyn PortfolioApi>,
    /// Embedding provider shared by indexing and search.
    pub embedder: Arc<dyn EmbeddingClient>,
    /// Completion provider.
    pub llm: Arc<dyn LanguageModel>,
}

/// Run the startup sequence and return a ready assistant.
pub async fn prepare(
    collaborators: Collaborators,
    options: &StartupOptions,
) -> Result<Assistant, StartupError> {
    let Collaborators { api, embedder, llm } = collaborators;

    let ping = api.ping().await.map_err(StartupError::HealthCheck)?;
    tracing::info!(user = %ping, "API ping successful");

    let documents = load_documents(api.as_ref(), &options.source).await?;
    if documents.is_empty() {
        return Err(StartupError::NoDocuments);
    }

    let chunks = split_all(&documents, &options.chunking)?;
    tracing::info!(
        documents = documents.len(),
        chunks = chunks.len(),
        chunk_size = options.chunking.chunk_size,
        overlap = options.chunking.overlap,
        "Documents split"
    );
    let chunk_count = chunks.len();
    let index = EmbeddingIndex::build(chunks, embedder).await?;

    let metrics = Arc::new(SessionMetrics::new());
    metrics.record_corpus(documents.len() as u64, chunk_count as u64);

    let aggregator = ApiAggregator::new(api, Arc::new(PatternExtractor::new()), metrics.clone());
    Ok(Assistant::new(Arc::new(index), llm, aggregator, metrics))
}

async fn load_documents(
    api: &dyn PortfolioApi,
    source: &DocumentSource,
) -> Result<Vec<Document>, StartupError> {
    match source {
        DocumentSource::Archive => {
            let bytes = api
                .download_documents()
                .await
                .map_err(StartupError::Download)?;
            Ok(extract_documents(&bytes)?)
        }
        DocumentSource::Directory(root) => Ok(load_directory(root)?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::HashingEmbeddingClient;
    use crate::llm::LanguageModelError;
    use crate::portfolio::Lookup;
    use crate::processing::documents::tests::build_archive;
    use async_trait::async_trait;
    use reqwest::StatusCode;
    use serde_json::{Value, json};

    struct StubApi {
        ping_ok: bool,
        archive: Vec<u8>,
    }

    #[async_trait]
    impl PortfolioApi for StubApi {
        async fn ping(&self) -> Result<Value, PortfolioApiError> {
            if self.ping_ok {
                Ok(json!({ "name": "John Doe" }))
            } else {
                Err(PortfolioApiError::UnexpectedStatus {
                    status: StatusCode::UNAUTHORIZED,
                    body: "Unauthorized".into(),
                })
            }
        }

        async fn download_documents(&self) -> Result<Vec<u8>, PortfolioApiError> {
            Ok(self.archive.clone())
        }

        async fn lookup(&self, _lookup: Lookup, _value: &str) -> Result<Value, PortfolioApiError> {
            Ok(Value::Null)
        }
    }

    struct EchoModel;

    #[async_trait]
    impl LanguageModel for EchoModel {
        async fn generate(&self, prompt: &str) -> Result<String, LanguageModelError> {
            Ok(prompt.to_string())
        }
    }

    fn collaborators(api: StubApi) -> Collaborators {
        Collaborators {
            api: Arc::new(api),
            embedder: Arc::new(HashingEmbeddingClient::new(16)),
            llm: Arc::new(EchoModel),
        }
    }

    fn archive_options() -> StartupOptions {
        StartupOptions {
            source: DocumentSource::Archive,
            chunking: ChunkingOptions::default(),
        }
    }

    #[tokio::test]
    async fn failed_ping_aborts_startup() {
        let api = StubApi {
            ping_ok: false,
            archive: build_archive(&[("doc1.txt", "content")]),
        };
        let error = prepare(collaborators(api), &archive_options())
            .await
            .err()
            .expect("startup error");
        assert!(matches!(error, StartupError::HealthCheck(_)));
    }

    #[tokio::test]
    async fn archive_without_text_files_aborts_startup() {
        let api = StubApi {
            ping_ok: true,
            archive: build_archive(&[("slides.pdf", "binary")]),
        };
        let error = prepare(collaborators(api), &archive_options())
            .await
            .err()
            .expect("startup error");
        assert!(matches!(error, StartupError::NoDocuments));
    }

    #[tokio::test]
    async fn successful_startup_records_corpus_metrics() {
        let api = StubApi {
            ping_ok: true,
            archive: build_archive(&[
                ("doc1.txt", "PeakSpan invests in healthcare startups."),
                ("doc2.txt", "Pricing masterclass notes."),
            ]),
        };
        let assistant = prepare(collaborators(api), &archive_options())
            .await
            .expect("assistant");
        let snapshot = assistant.metrics().snapshot();
        assert_eq!(snapshot.documents_indexed, 2);
        assert_eq!(snapshot.chunks_indexed, 2);
        assert!(assistant.conversation().is_empty());
    }

    #[tokio::test]
    async fn directory_source_skips_download() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("notes.txt"), "Local notes").expect("write");
        let api = StubApi {
            ping_ok: true,
            archive: b"not a zip".to_vec(),
        };
        let options = StartupOptions {
            source: DocumentSource::Directory(dir.path().to_path_buf()),
            chunking: ChunkingOptions::default(),
        };
        let assistant = prepare(collaborators(api), &options)
            .await
            .expect("assistant");
        assert_eq!(assistant.metrics().snapshot().documents_indexed, 1);
    }
}
