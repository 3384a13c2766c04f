//! HTTP surface for the assistant.
//!
//! - `POST /ask` – Answer a query and append it to the shared conversation. Returns
//!   `{ "answer": string, "route": "greeting_shortcut" | "meta_shortcut" | "full_pipeline" }`.
//! - `GET /history` – Conversation turns so far, oldest first.
//! - `GET /metrics` – Corpus and turn counters.
//! - `GET /commands` – Machine-readable command catalog.
//!
//! There is one conversation per process. Turns are serialised: a second request waits until
//! the first has been answered and recorded.

use crate::assistant::{Answer, Assistant, ConversationTurn, Route};
use crate::metrics::{MetricsSnapshot, SessionMetrics};
use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Abstraction over the assistant used by the HTTP surface.
#[async_trait]
pub trait ChatApi: Send + Sync {
    /// Answer a query and record the turn.
    async fn ask(&self, query: &str) -> Answer;

    /// Snapshot of the conversation.
    async fn history(&self) -> Vec<ConversationTurn>;

    /// Current session counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// [`Assistant`] behind a mutex so concurrent requests append turns one at a time.
pub struct SharedAssistant {
    inner: Mutex<Assistant>,
    metrics: Arc<SessionMetrics>,
}

impl SharedAssistant {
    /// Wrap an assistant for shared use.
    pub fn new(assistant: Assistant) -> Self {
        let metrics = assistant.metrics().clone();
        Self {
            inner: Mutex::new(assistant),
            metrics,
        }
    }
}

#[async_trait]
impl ChatApi for SharedAssistant {
    async fn ask(&self, query: &str) -> Answer {
        self.inner.lock().await.respond(query).await
    }

    async fn history(&self) -> Vec<ConversationTurn> {
        self.inner.lock().await.conversation().turns().to_vec()
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Build the HTTP router exposing the assistant.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: ChatApi + 'static,
{
    Router::new()
        .route("/ask", post(ask::<S>))
        .route("/history", get(history::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for `POST /ask`.
#[derive(Deserialize)]
struct AskRequest {
    /// Natural-language query.
    query: String,
}

/// Response body for `POST /ask`.
#[derive(Serialize)]
struct AskResponse {
    answer: String,
    route: Route,
}

async fn ask<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError>
where
    S: ChatApi,
{
    let query = request.query.trim();
    if query.is_empty() {
        return Err(AppError::EmptyQuery);
    }
    let Answer { route, text } = service.ask(query).await;
    tracing::info!(?route, answer_chars = text.len(), "Ask request completed");
    Ok(Json(AskResponse {
        answer: text,
        route,
    }))
}

/// Response body for `GET /history`.
#[derive(Serialize)]
struct HistoryResponse {
    turns: Vec<ConversationTurn>,
}

async fn history<S>(State(service): State<Arc<S>>) -> Json<HistoryResponse>
where
    S: ChatApi,
{
    Json(HistoryResponse {
        turns: service.history().await,
    })
}

async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: ChatApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "ask",
                method: "POST",
                path: "/ask",
                description: "Answer a query using document retrieval, portfolio lookups and the conversation so far.",
                request_example: Some(json!({ "query": "Tell me about the sector of Healthcare" })),
            },
            CommandDescriptor {
                name: "history",
                method: "GET",
                path: "/history",
                description: "Return the conversation turns recorded in this session.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return corpus, turn and failure counters.",
                request_example: None,
            },
        ],
    })
}

enum AppError {
    EmptyQuery,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::EmptyQuery => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "query must not be empty" })),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request},
    };
    use crate::assistant::Role;
    use tower::ServiceExt;

    #[derive(Default)]
    struct StubChat {
        asked: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ChatApi for StubChat {
        async fn ask(&self, query: &str) -> Answer {
            self.asked.lock().expect("lock").push(query.to_string());
            Answer {
                route: Route::FullPipeline,
                text: format!("echo: {query}"),
            }
        }

        async fn history(&self) -> Vec<ConversationTurn> {
            self.asked
                .lock()
                .expect("lock")
                .iter()
                .map(|query| ConversationTurn {
                    role: Role::User,
                    text: query.clone(),
                })
                .collect()
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                turns_answered: 4,
                ..MetricsSnapshot::default()
            }
        }
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        serde_json::from_slice(&body).expect("json body")
    }

    #[tokio::test]
    async fn ask_route_returns_answer_and_route() {
        let service = Arc::new(StubChat::default());
        let app = create_router(service.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/ask")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "query": "  sector of Fintech " }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::OK);
        let json = json_body(response).await;
        assert_eq!(json["answer"], "echo: sector of Fintech");
        assert_eq!(json["route"], "full_pipeline");
        assert_eq!(
            *service.asked.lock().expect("lock"),
            vec!["sector of Fintech".to_string()]
        );
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let service = Arc::new(StubChat::default());
        let app = create_router(service.clone());

        let response = app
            .oneshot(
                Request::builder()
                    .method(Method::POST)
                    .uri("/ask")
                    .header("content-type", "application/json")
                    .body(Body::from(json!({ "query": "   " }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("router response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(service.asked.lock().expect("lock").is_empty());
    }

    #[tokio::test]
    async fn metrics_and_history_routes_serialize_state() {
        let service = Arc::new(StubChat::default());
        service.ask("hello").await;
        let app = create_router(service);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/metrics")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(json_body(response).await["turns_answered"], 4);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/history")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        let json = json_body(response).await;
        assert_eq!(json["turns"][0]["role"], "user");
        assert_eq!(json["turns"][0]["text"], "hello");
    }

    #[tokio::test]
    async fn commands_catalog_exposes_ask_endpoint() {
        let commands = get_commands().await.0.commands;
        let ask = commands
            .iter()
            .find(|cmd| cmd.name == "ask")
            .expect("ask command present");
        assert_eq!(ask.method, "POST");
        assert_eq!(ask.path, "/ask");
    }
}
