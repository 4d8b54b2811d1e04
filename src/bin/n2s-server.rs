//! natural2sparql HTTP server.
//!
//! - `POST /gerar_consulta`      `{pergunta}` -> `{sparqlQuery, templateId}`
//! - `POST /executar_query`      `{sparqlQuery, templateId}` -> `{sparqlQuery, resposta}`
//! - `POST /processar_pergunta`  `{pergunta}` -> `{sparqlQuery, resposta}`
//! - `POST /api/question`        alias of `/processar_pergunta`
//! - `GET  /health`              knowledge base state and build statistics
//!
//! Failures answer `{erro}`: 400 for blank input, 500 otherwise.
//!
//! Build and run: `cargo run --features server --bin n2s-server -- --config n2s.toml`

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use natural2sparql::config::AppConfig;
use natural2sparql::error::ServiceError;
use natural2sparql::kb::{BuildStats, KbState};
use natural2sparql::service::QuestionService;

#[derive(Parser)]
#[command(name = "n2s-server", version, about = "natural2sparql HTTP server")]
struct Args {
    /// Configuration file (defaults to ./n2s.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
}

// ── Server state ──────────────────────────────────────────────────────────

struct AppState {
    service: QuestionService,
    /// Bounds concurrent classifier processes; excess requests wait.
    classify_permits: Semaphore,
}

// ── Request / response types ──────────────────────────────────────────────

#[derive(Deserialize)]
struct QuestionRequest {
    #[serde(default)]
    pergunta: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteRequest {
    #[serde(default)]
    sparql_query: String,
    #[serde(default)]
    template_id: String,
}

#[derive(Serialize, Default)]
#[serde(rename_all = "camelCase")]
struct QuestionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    sparql_query: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    resposta: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    erro: Option<String>,
}

#[derive(Serialize)]
struct HealthResponse {
    status: KbState,
    version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stats: Option<BuildStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
}

type Reply = (StatusCode, Json<QuestionResponse>);

fn error_reply(status: StatusCode, message: impl Into<String>) -> Reply {
    (
        status,
        Json(QuestionResponse {
            erro: Some(message.into()),
            ..Default::default()
        }),
    )
}

fn service_error(err: ServiceError) -> Reply {
    match err {
        ServiceError::Validation { message } => error_reply(StatusCode::BAD_REQUEST, message),
        other => {
            tracing::warn!(error = %other, "request failed");
            error_reply(StatusCode::INTERNAL_SERVER_ERROR, other.to_string())
        }
    }
}

fn join_error(err: tokio::task::JoinError) -> Reply {
    tracing::error!(error = %err, "request worker failed");
    error_reply(StatusCode::INTERNAL_SERVER_ERROR, "internal error")
}

fn blank(field: &str) -> Reply {
    error_reply(StatusCode::BAD_REQUEST, format!("{field} must not be blank"))
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let kb = state.service.knowledge_base();
    Json(HealthResponse {
        status: kb.state(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        stats: kb.stats(),
        failure: kb.failure(),
    })
}

async fn generate_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuestionRequest>,
) -> Reply {
    if req.pergunta.trim().is_empty() {
        return blank("pergunta");
    }
    let Ok(_permit) = state.classify_permits.acquire().await else {
        return error_reply(StatusCode::SERVICE_UNAVAILABLE, "server is shutting down");
    };
    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || service.generate_query(&req.pergunta)).await;
    match result {
        Ok(Ok(generated)) => (
            StatusCode::OK,
            Json(QuestionResponse {
                sparql_query: Some(generated.query_text),
                template_id: Some(generated.template_id),
                ..Default::default()
            }),
        ),
        Ok(Err(err)) => service_error(err),
        Err(err) => join_error(err),
    }
}

async fn execute_query(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ExecuteRequest>,
) -> Reply {
    if req.sparql_query.trim().is_empty() {
        return blank("sparqlQuery");
    }
    if req.template_id.trim().is_empty() {
        return blank("templateId");
    }
    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || {
        service.execute_query(&req.sparql_query, &req.template_id)
    })
    .await;
    answer_reply(result)
}

async fn process_question(
    State(state): State<Arc<AppState>>,
    Json(req): Json<QuestionRequest>,
) -> Reply {
    if req.pergunta.trim().is_empty() {
        return blank("pergunta");
    }
    let Ok(_permit) = state.classify_permits.acquire().await else {
        return error_reply(StatusCode::SERVICE_UNAVAILABLE, "server is shutting down");
    };
    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || service.process_question(&req.pergunta)).await;
    answer_reply(result)
}

fn answer_reply(
    result: Result<Result<natural2sparql::service::Answer, ServiceError>, tokio::task::JoinError>,
) -> Reply {
    match result {
        Ok(Ok(answer)) => (
            StatusCode::OK,
            Json(QuestionResponse {
                sparql_query: Some(answer.query_text),
                resposta: Some(answer.answer),
                ..Default::default()
            }),
        ),
        Ok(Err(err)) => service_error(err),
        Err(err) => join_error(err),
    }
}

// ── Main ──────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=warn")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::load_or_default(args.config.as_deref())?;
    config.server.apply_env();

    let kb = Arc::new(config.knowledge_base());
    {
        let kb = Arc::clone(&kb);
        let sources = config.sources();
        let built = tokio::task::spawn_blocking(move || kb.initialize(&sources)).await;
        match built {
            Ok(Ok(stats)) => tracing::info!(triples = stats.total_triples(), "knowledge base ready"),
            Ok(Err(err)) => {
                tracing::error!(error = %err, "knowledge base unavailable, queries will return no results")
            }
            Err(err) => tracing::error!(error = %err, "knowledge base build panicked"),
        }
    }

    let service = QuestionService::new(kb, config.classifier(), Arc::new(config.template_store()))
        .with_format(config.answer_format());
    let state = Arc::new(AppState {
        service,
        classify_permits: Semaphore::new(config.server.max_concurrent_classifications.max(1)),
    });

    let app = Router::new()
        .route("/health", get(health))
        .route("/gerar_consulta", post(generate_query))
        .route("/executar_query", post(execute_query))
        .route("/processar_pergunta", post(process_question))
        .route("/api/question", post(process_question))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state);

    let addr = config.server.address();
    tracing::info!("natural2sparql server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| miette::miette!("failed to bind {addr}: {e}"))?;
    axum::serve(listener, app)
        .await
        .map_err(|e| miette::miette!("server error: {e}"))?;
    Ok(())
}
