//! Axum HTTP surface (§6): `calculate-fee`, `get-rate`, `health`,
//! `readiness`. Thin by design — deserializes, calls the orchestrator, maps
//! `EngineError` to a status and JSON body.

pub mod dto;

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::broker::BrokerStore;
use crate::domain::Ticker;
use crate::error::EngineError;
use crate::orchestrator::Engine;
use crate::ratelimit::RateLimitOutcome;
use crate::validation::RawFeeRequest;

use dto::{
    CalculateFeeRequest, CalculateFeeResponse, ErrorResponse, GetRateResponse, HealthComponents,
    HealthResponse,
};

pub fn router<S: BrokerStore + 'static>(engine: Arc<Engine<S>>) -> Router {
    Router::new()
        .route("/calculate-fee", post(calculate_fee::<S>))
        .route("/rates/{ticker}", get(get_rate::<S>))
        .route("/health", get(health))
        .route("/readiness", get(readiness))
        .with_state(engine)
}

fn rate_limit_headers(outcome: &RateLimitOutcome) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        "X-RateLimit-Limit",
        HeaderValue::from_str(&outcome.limit.to_string()).unwrap(),
    );
    headers.insert(
        "X-RateLimit-Remaining",
        HeaderValue::from_str(&outcome.remaining.to_string()).unwrap(),
    );
    headers.insert(
        "X-RateLimit-Reset",
        HeaderValue::from_str(&outcome.reset.to_string()).unwrap(),
    );
    headers
}

fn error_response(err: EngineError) -> Response {
    let status = StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut headers = HeaderMap::new();
    if let Some(retry_after) = err.retry_after() {
        headers.insert(
            "Retry-After",
            HeaderValue::from_str(&retry_after.to_string()).unwrap(),
        );
    }
    let body = ErrorResponse {
        code: err.code(),
        message: err.to_string(),
    };
    (status, headers, Json(body)).into_response()
}

async fn calculate_fee<S: BrokerStore + 'static>(
    State(engine): State<Arc<Engine<S>>>,
    Json(req): Json<CalculateFeeRequest>,
) -> Response {
    let raw = RawFeeRequest {
        ticker: req.ticker,
        position_value: req.position_value,
        loan_days: req.loan_days,
        client_id: req.client_id,
    };
    match engine.calculate_fee(raw).await {
        Ok((result, outcome)) => {
            let headers = rate_limit_headers(&outcome);
            let body: CalculateFeeResponse = result.into();
            (StatusCode::OK, headers, Json(body)).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn get_rate<S: BrokerStore + 'static>(
    State(engine): State<Arc<Engine<S>>>,
    Path(ticker): Path<String>,
) -> Response {
    let ticker = match Ticker::parse(&ticker) {
        Ok(t) => t,
        Err(err) => return error_response(EngineError::Validation(err)),
    };
    match engine.get_rate(&ticker).await {
        Ok(snapshot) => {
            let body: GetRateResponse = snapshot.into();
            (StatusCode::OK, Json(body)).into_response()
        }
        Err(err) => error_response(err),
    }
}

async fn health() -> Response {
    let mut upstreams = std::collections::BTreeMap::new();
    upstreams.insert("borrow_rate", "unknown");
    upstreams.insert("volatility", "unknown");
    upstreams.insert("event_risk", "unknown");
    let body = HealthResponse {
        status: "ok",
        components: HealthComponents {
            cache: "ok",
            upstreams,
        },
        version: env!("CARGO_PKG_VERSION"),
    };
    (StatusCode::OK, Json(body)).into_response()
}

async fn readiness() -> StatusCode {
    StatusCode::OK
}
