use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::catalog::CatalogStats;
use crate::core::error::Result;
use crate::recommend::{ErrorResponse, Orchestrator, PipelineError, RecommendationResponse, ResponseStatus};

const ENDPOINTS: [&str; 4] = [
    "GET /health",
    "POST /api/recommend",
    "GET /api/neighborhoods",
    "GET /api/stats",
];


#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub llm_provider: String,
    pub embedding_model: String,
}

#[derive(Debug, Deserialize)]
struct RecommendRequest {
    #[serde(default)]
    query: Option<String>,
}

#[derive(Debug, Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    catalog_size: usize,
    llm_provider: &'a str,
    embedding_model: &'a str,
}

#[derive(Debug, Serialize)]
struct NeighborhoodSummary<'a> {
    id: &'a str,
    neighborhood: &'a str,
    district: &'a str,
    green_index: Option<f64>,
    welfare_index: Option<f64>,
    rent_per_sqm: Option<f64>,
}

#[derive(Debug, Serialize)]
struct NeighborhoodsResponse<'a> {
    status: ResponseStatus,
    total: usize,
    neighborhoods: Vec<NeighborhoodSummary<'a>>,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    status: ResponseStatus,
    statistics: CatalogStats,
}


pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/recommend", post(recommend))
        .route("/api/neighborhoods", get(neighborhoods))
        .route("/api/stats", get(stats))
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(state: AppState, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);
    for endpoint in ENDPOINTS {
        info!("  {}", endpoint);
    }
    axum::serve(listener, router(state)).await?;
    Ok(())
}

async fn health(State(state): State<AppState>) -> Response {
    Json(HealthResponse {
        status: "healthy",
        catalog_size: state.orchestrator.catalog().len(),
        llm_provider: &state.llm_provider,
        embedding_model: &state.embedding_model,
    })
    .into_response()
}

async fn recommend(State(state): State<AppState>, body: Bytes) -> Response {
    let query = serde_json::from_slice::<RecommendRequest>(&body)
        .ok()
        .and_then(|r| r.query)
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty());

    let Some(query) = query else {
        return error_response(StatusCode::BAD_REQUEST, ErrorResponse::new("empty_query", "Query is required"));
    };

    match state.orchestrator.recommend(&query).await {
        Ok(report) => Json(RecommendationResponse::from(report)).into_response(),
        Err(e @ PipelineError::EmptyQuery) => {
            error_response(StatusCode::BAD_REQUEST, ErrorResponse::new(e.kind(), e.to_string()))
        }
        Err(e @ PipelineError::RankerUnavailable(_)) => {
            error!("Recommendation failed: {}", e);
            error_response(
                StatusCode::SERVICE_UNAVAILABLE,
                ErrorResponse::new(e.kind(), "Ranking service unavailable, please retry later"),
            )
        }
    }
}

async fn neighborhoods(State(state): State<AppState>) -> Response {
    let catalog = state.orchestrator.catalog();
    let neighborhoods: Vec<NeighborhoodSummary<'_>> = catalog
        .records()
        .iter()
        .map(|r| NeighborhoodSummary {
            id: &r.id,
            neighborhood: &r.name,
            district: &r.district,
            green_index: r.green_index,
            welfare_index: r.welfare_index,
            rent_per_sqm: r.rent_per_sqm,
        })
        .collect();

    Json(NeighborhoodsResponse {
        status: ResponseStatus::Success,
        total: neighborhoods.len(),
        neighborhoods,
    })
    .into_response()
}

async fn stats(State(state): State<AppState>) -> Response {
    Json(StatsResponse {
        status: ResponseStatus::Success,
        statistics: state.orchestrator.catalog().stats(),
    })
    .into_response()
}

async fn not_found() -> Response {
    warn!("Unknown endpoint requested");
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "status": "error",
            "error": "Endpoint not found",
            "available_endpoints": ENDPOINTS,
        })),
    )
        .into_response()
}

fn error_response(status: StatusCode, body: ErrorResponse) -> Response {
    (status, Json(body)).into_response()
}
