//! HTTP client wrapper for the portfolio REST API.

use crate::portfolio::types::{Lookup, PortfolioApiError};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde_json::Value;

/// Operations the assistant needs from the portfolio API.
///
/// Every request is authenticated with the same bearer token. Implementations perform exactly
/// one request per call: no retries, no timeouts beyond the transport defaults.
#[async_trait]
pub trait PortfolioApi: Send + Sync {
    /// Verify credentials; returns the authenticated user's details.
    async fn ping(&self) -> Result<Value, PortfolioApiError>;

    /// Download the zipped document bundle.
    async fn download_documents(&self) -> Result<Vec<u8>, PortfolioApiError>;

    /// Run a structured lookup for a single entity value.
    async fn lookup(&self, lookup: Lookup, value: &str) -> Result<Value, PortfolioApiError>;
}

/// Lightweight HTTP client for the portfolio API.
pub struct PortfolioClient {
    pub(crate) client: Client,
    pub(crate) base_url: String,
    pub(crate) token: String,
}

impl PortfolioClient {
    /// Construct a client for `base_url`, authenticating with `token`.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, PortfolioApiError> {
        let client = Client::builder().user_agent("portfolio-rag/0.1").build()?;
        let base_url = normalize_base_url(base_url).map_err(PortfolioApiError::InvalidUrl)?;
        let token = token.into();
        tracing::debug!(
            url = %base_url,
            has_token = !token.is_empty(),
            "Initialized portfolio API client"
        );

        Ok(Self {
            client,
            base_url,
            token,
        })
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let url = format_endpoint(&self.base_url, path);
        self.client.request(method, url).bearer_auth(&self.token)
    }

    async fn get_json(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, PortfolioApiError> {
        let response = self.request(Method::GET, path).query(query).send().await?;
        let response = ensure_success(response, path).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl PortfolioApi for PortfolioClient {
    async fn ping(&self) -> Result<Value, PortfolioApiError> {
        self.get_json("ping", &[]).await
    }

    async fn download_documents(&self) -> Result<Vec<u8>, PortfolioApiError> {
        tracing::info!("Requesting documents archive");
        let path = "api/documents/download";
        let response = self.request(Method::GET, path).send().await?;
        let response = ensure_success(response, path).await?;
        let bytes = response.bytes().await?;
        tracing::info!(bytes = bytes.len(), "Downloaded documents archive");
        Ok(bytes.to_vec())
    }

    async fn lookup(&self, lookup: Lookup, value: &str) -> Result<Value, PortfolioApiError> {
        tracing::debug!(%lookup, value, "Portfolio lookup");
        self.get_json(lookup.path(), &[(lookup.parameter(), value)])
            .await
    }
}

async fn ensure_success(
    response: reqwest::Response,
    path: &str,
) -> Result<reqwest::Response, PortfolioApiError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let error = PortfolioApiError::UnexpectedStatus { status, body };
    tracing::debug!(path, error = %error, "Portfolio API request failed");
    Err(error)
}

fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.to_string())
}

fn format_endpoint(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{base}/{path}")
}
