//! HTTP server.
//!
//! Exposes the generation pipeline to browser clients.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/generate` | Run the pipeline, return the three spec files as JSON |
//! | `POST` | `/generate-stream` | Run the pipeline, stream [`GenerationEvent`]s as SSE |
//! | `POST` | `/search` | Retrieve knowledge sections for a query |
//!
//! Request bodies are `{"query": "..."}` (`/search` also accepts `limit`).
//!
//! # Streaming
//!
//! `/generate-stream` answers `200` immediately and reports every outcome
//! in-band: each event is one `data: {json}` frame, and the stream ends
//! after a `done` or `error` event.
//!
//! # Error Contract
//!
//! Non-streaming errors use the JSON body:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "Query is too short. ..." } }
//! ```
//!
//! Error codes: `bad_request` (400), `unsuitable_idea` (422),
//! `upstream` (502), `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a locally served
//! front-end can call the API.

use axum::{
    extract::State,
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_stream::{wrappers::ReceiverStream, Stream, StreamExt};
use tower_http::cors::{Any, CorsLayer};

use agent_architect_core::models::ScoredChunk;
use agent_architect_core::SpecDocument;

use crate::config::Config;
use crate::events::GenerationEvent;
use crate::generate::{Architect, GenerateError};

#[derive(Clone)]
struct AppState {
    architect: Arc<Architect>,
}

/// Build the router around an [`Architect`].
pub fn router(architect: Arc<Architect>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/generate", post(handle_generate))
        .route("/generate-stream", post(handle_generate_stream))
        .route("/search", post(handle_search))
        .layer(cors)
        .with_state(AppState { architect })
}

/// Start the server on `[server].bind` and run until the process exits.
pub async fn run_server(config: Config) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let architect = Arc::new(Architect::from_config(config).await?);
    let app = router(architect);

    println!("Agent Architect listening on http://{}", bind_addr);
    tracing::info!(bind = %bind_addr, "server started");

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

impl From<GenerateError> for AppError {
    fn from(err: GenerateError) -> Self {
        let message = err.to_string();
        if err.is_input_error() {
            return bad_request(message);
        }
        match err {
            GenerateError::Unsuitable(_) => AppError {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                code: "unsuitable_idea",
                message,
            },
            _ => AppError {
                status: StatusCode::BAD_GATEWAY,
                code: "upstream",
                message,
            },
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /generate ============

#[derive(Debug, Deserialize)]
struct GenerateRequest {
    query: String,
}

async fn handle_generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<SpecDocument>, AppError> {
    let document = state.architect.generate(&req.query).await?;
    Ok(Json(document))
}

// ============ POST /generate-stream ============

async fn handle_generate_stream(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Sse<impl Stream<Item = Result<Event, axum::Error>>> {
    let (tx, rx) = mpsc::channel::<GenerationEvent>(64);
    let architect = state.architect.clone();
    tokio::spawn(async move {
        architect.generate_stream(&req.query, tx).await;
    });

    let stream =
        until_terminal(ReceiverStream::new(rx)).map(|event| Event::default().json_data(event));
    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Pass events through up to and including the first `done` or `error`.
fn until_terminal<S>(events: S) -> impl Stream<Item = GenerationEvent>
where
    S: Stream<Item = GenerationEvent>,
{
    let mut finished = false;
    events.take_while(move |event| {
        let keep = !finished;
        finished = event.is_terminal();
        keep
    })
}

// ============ POST /search ============

#[derive(Debug, Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Serialize)]
struct SearchResponse {
    results: Vec<ScoredChunk>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }
    let top_k = req
        .limit
        .unwrap_or(state.architect.config().retrieval.top_k)
        .max(1);
    let results = state
        .architect
        .search(&req.query, top_k)
        .await
        .map_err(|e| internal(e.to_string()))?;
    Ok(Json(SearchResponse { results }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_architect_core::guardrails::GuardrailError;

    #[test]
    fn test_error_mapping() {
        let err = AppError::from(GenerateError::from(GuardrailError::QueryTooLong { max: 800 }));
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        assert_eq!(err.code, "bad_request");
        assert_eq!(
            err.message,
            "Query is too long. Please keep your description under 800 characters."
        );

        let err = AppError::from(GenerateError::Unsuitable("use a script".to_string()));
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.code, "unsuitable_idea");

        let err = AppError::from(GenerateError::from(GuardrailError::NoResponse));
        assert_eq!(err.status, StatusCode::BAD_GATEWAY);

        let err = AppError::from(GenerateError::Upstream(anyhow::anyhow!("timeout")));
        assert_eq!(err.code, "upstream");
    }

    #[tokio::test]
    async fn test_health() {
        let Json(body) = handle_health().await;
        assert_eq!(body.status, "ok");
        assert_eq!(body.version, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn test_generate_request_shape() {
        let req: GenerateRequest =
            serde_json::from_str(r#"{"query": "an agent that books travel"}"#).unwrap();
        assert_eq!(req.query, "an agent that books travel");
        assert!(serde_json::from_str::<GenerateRequest>(r#"{"prompt": "x"}"#).is_err());
    }

    #[tokio::test]
    async fn test_stream_ends_after_terminal_event() {
        let events = tokio_stream::iter(vec![
            GenerationEvent::Progress {
                step: crate::events::Step::Generating,
            },
            GenerationEvent::error("Model stream failed: overloaded"),
            GenerationEvent::Done,
        ]);
        let sent: Vec<GenerationEvent> = until_terminal(events).collect().await;
        assert_eq!(sent.len(), 2);
        assert!(sent[1].is_terminal());
    }
}
