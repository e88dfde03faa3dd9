use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::ledger::PolicyType;
use super::progress::OnboardingStage;
use super::service::{OnboardingError, OnboardingService};

/// The driver identity resolved by the session layer, out of scope here.
const DRIVER_HEADER: &str = "x-driver-email";
/// The operator identity resolved by the admin session layer.
const OPERATOR_HEADER: &str = "x-operator-email";

/// Router builder exposing the onboarding flow and operator endpoints.
pub fn onboarding_router(service: Arc<OnboardingService>) -> Router {
    Router::new()
        .route("/api/v1/onboarding/verify", post(verify_handler))
        .route("/api/v1/onboarding/steps", post(step_handler))
        .route(
            "/api/v1/onboarding/acknowledgements",
            post(acknowledge_handler),
        )
        .route("/api/v1/onboarding/position", get(position_handler))
        .route("/api/v1/onboarding/complete", post(complete_handler))
        .route("/api/v1/drivers", get(dashboard_handler))
        .route("/api/v1/drivers/:email/report", get(report_handler))
        .route("/api/v1/drivers/:email/reset", post(reset_handler))
        .with_state(service)
}

#[derive(Debug, Deserialize)]
struct AcknowledgeRequest {
    policy: PolicyType,
}

#[derive(Debug, Deserialize)]
struct StepRequest {
    stage: OnboardingStage,
}

async fn verify_handler(
    State(service): State<Arc<OnboardingService>>,
    headers: HeaderMap,
) -> Response {
    match service.verify_phone(header_value(&headers, DRIVER_HEADER)) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn step_handler(
    State(service): State<Arc<OnboardingService>>,
    headers: HeaderMap,
    Json(request): Json<StepRequest>,
) -> Response {
    match service.complete_step(request.stage, header_value(&headers, DRIVER_HEADER)) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn acknowledge_handler(
    State(service): State<Arc<OnboardingService>>,
    headers: HeaderMap,
    Json(request): Json<AcknowledgeRequest>,
) -> Response {
    match service.acknowledge(request.policy, header_value(&headers, DRIVER_HEADER)) {
        Ok(outcome) => (StatusCode::OK, Json(outcome)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn position_handler(
    State(service): State<Arc<OnboardingService>>,
    headers: HeaderMap,
) -> Response {
    match service.position(header_value(&headers, DRIVER_HEADER)) {
        Ok(position) => (StatusCode::OK, Json(position)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn complete_handler(
    State(service): State<Arc<OnboardingService>>,
    headers: HeaderMap,
) -> Response {
    match service.complete(header_value(&headers, DRIVER_HEADER)) {
        Ok(snapshot) => (StatusCode::CREATED, Json(snapshot)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn dashboard_handler(State(service): State<Arc<OnboardingService>>) -> Response {
    match service.dashboard() {
        Ok(views) => (StatusCode::OK, Json(views)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn report_handler(
    State(service): State<Arc<OnboardingService>>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> Response {
    match service.report_preview(&email, header_value(&headers, OPERATOR_HEADER)) {
        Ok(snapshot) => (StatusCode::OK, Json(snapshot)).into_response(),
        Err(err) => error_response(err),
    }
}

async fn reset_handler(
    State(service): State<Arc<OnboardingService>>,
    headers: HeaderMap,
    Path(email): Path<String>,
) -> Response {
    match service.reset_progress(&email, header_value(&headers, OPERATOR_HEADER)) {
        Ok(()) => (
            StatusCode::OK,
            Json(json!({ "email": email, "status": "reset" })),
        )
            .into_response(),
        Err(err) => error_response(err),
    }
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|value| value.to_str().ok())
}

fn error_response(err: OnboardingError) -> Response {
    let status = match &err {
        OnboardingError::Auth => StatusCode::UNAUTHORIZED,
        OnboardingError::Forbidden(_) => StatusCode::FORBIDDEN,
        OnboardingError::NotFound(_) => StatusCode::NOT_FOUND,
        OnboardingError::UntrackedStage(_) => StatusCode::UNPROCESSABLE_ENTITY,
        OnboardingError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": err.to_string() });
    (status, Json(payload)).into_response()
}
