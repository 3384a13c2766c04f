use std::{env, sync::Once};

use portfolio_rag::{
    config::{self, Config, EmbeddingProvider},
    embedding::{self, EmbeddingClient},
    llm::{self, LanguageModel},
    portfolio::{PortfolioApi, PortfolioClient},
    processing::extract_documents,
};

static INIT: Once = Once::new();

fn set_default_env(key: &str, value: &str) {
    let needs_value = env::var(key).map(|v| v.trim().is_empty()).unwrap_or(true);
    if needs_value {
        // SAFETY: Tests run serially via Once and we intentionally mutate process env.
        unsafe {
            env::set_var(key, value);
        }
    }
}

fn live_config() -> &'static Config {
    INIT.call_once(|| {
        set_default_env("EMBEDDING_PROVIDER", "ollama");
        set_default_env("EMBEDDING_MODEL", "all-minilm");
        set_default_env("EMBEDDING_DIMENSION", "384");
        set_default_env("OLLAMA_URL", "http://127.0.0.1:11434");
    });
    config::init_config().expect("PORTFOLIO_API_URL and PORTFOLIO_API_TOKEN must be set")
}

#[tokio::test]
#[ignore = "Requires live portfolio API"]
async fn live_portfolio_ping_and_download() {
    let config = live_config();
    let client = PortfolioClient::new(&config.portfolio_api_url, config.portfolio_api_token.clone())
        .expect("valid API url");
    client.ping().await.expect("ping should succeed");

    let bytes = client
        .download_documents()
        .await
        .expect("archive download should succeed");
    let documents = extract_documents(&bytes).expect("archive should be a zip");
    assert!(!documents.is_empty(), "archive should contain .txt documents");
}

#[tokio::test]
#[ignore = "Requires live Ollama embeddings"]
async fn live_ollama_embedding_roundtrip() {
    let config = live_config();
    assert_eq!(config.embedding_provider, EmbeddingProvider::Ollama);
    let client = embedding::embedding_client_from_config(config);
    let vectors = client
        .generate_embeddings(vec!["portfolio-rag live embedding".to_string()])
        .await
        .expect("failed to request embeddings from provider");
    assert_eq!(vectors.len(), 1, "expected embedding per input text");
    assert_eq!(
        vectors[0].len(),
        config.embedding_dimension,
        "embedding dimension mismatch"
    );
}

#[tokio::test]
#[ignore = "Requires live Ollama completions"]
async fn live_ollama_generation() {
    let config = live_config();
    let model = llm::language_model_from_config(config);
    let completion = model
        .generate("Reply with a single word: ready")
        .await
        .expect("completion should succeed");
    assert!(!completion.trim().is_empty());
}
