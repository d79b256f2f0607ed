//! HTTP API for the delivery engine.

use std::sync::Arc;

use adt_core::MatchRequest;
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};

use crate::engine::DeliveryEngine;
use crate::observability::{measure, DeliveryMetrics};

#[derive(Clone)]
struct AppState {
    engine: Arc<DeliveryEngine>,
    metrics: Arc<DeliveryMetrics>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DeliveryParams {
    pub app: Option<String>,
    pub country: Option<String>,
    pub os: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ErrorResponse {
    pub error: String,
}

fn required(value: Option<&str>, name: &str) -> Result<String, Response> {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse {
                error: format!("missing {} param", name),
            }),
        )
            .into_response()),
    }
}

fn delivery_request(params: &DeliveryParams) -> Result<MatchRequest, Response> {
    let app = required(params.app.as_deref(), "app")?;
    let country = required(params.country.as_deref(), "country")?;
    let os = required(params.os.as_deref(), "os")?;
    Ok(MatchRequest::new(app, os, country))
}

async fn delivery_handler(
    State(state): State<AppState>,
    Query(params): Query<DeliveryParams>,
) -> Response {
    let request = match delivery_request(&params) {
        Ok(request) => request,
        Err(response) => {
            state.metrics.request_error("missing_param");
            return response;
        }
    };

    let ads = state.engine.match_request(&request);
    if ads.is_empty() {
        return StatusCode::NO_CONTENT.into_response();
    }
    Json(ads).into_response()
}

async fn health_handler() -> &'static str {
    "ok"
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}

/// Build the HTTP API router over a shared engine.
///
/// Delivery requests are measured into `metrics`; `/metrics` and `/healthz`
/// are not.
pub fn build_router(engine: Arc<DeliveryEngine>, metrics: Arc<DeliveryMetrics>) -> Router {
    let delivery = Router::new()
        .route("/v1/delivery", get(delivery_handler))
        .layer(middleware::from_fn_with_state(Arc::clone(&metrics), measure));

    Router::new()
        .merge(delivery)
        .route("/healthz", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(AppState { engine, metrics })
}
