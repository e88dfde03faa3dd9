use crate::config::ConfigError;
use crate::telemetry::TelemetryError;
use crate::workflows::intake::ApplicantImportError;
use crate::workflows::onboarding::OnboardingError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use std::fmt;

#[derive(Debug)]
pub enum AppError {
    Config(ConfigError),
    Telemetry(TelemetryError),
    Io(std::io::Error),
    Server(axum::Error),
    Intake(ApplicantImportError),
    Onboarding(OnboardingError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Intake(err) => write!(f, "intake error: {}", err),
            AppError::Onboarding(err) => write!(f, "onboarding error: {}", err),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Config(err) => Some(err),
            AppError::Telemetry(err) => Some(err),
            AppError::Io(err) => Some(err),
            AppError::Server(err) => Some(err),
            AppError::Intake(err) => Some(err),
            AppError::Onboarding(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self {
            AppError::Intake(_) => StatusCode::BAD_REQUEST,
            AppError::Onboarding(OnboardingError::Auth) => StatusCode::UNAUTHORIZED,
            AppError::Onboarding(OnboardingError::Forbidden(_)) => StatusCode::FORBIDDEN,
            AppError::Onboarding(OnboardingError::NotFound(_)) => StatusCode::NOT_FOUND,
            AppError::Onboarding(_)
            | AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

impl From<ConfigError> for AppError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<TelemetryError> for AppError {
    fn from(value: TelemetryError) -> Self {
        Self::Telemetry(value)
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<axum::Error> for AppError {
    fn from(value: axum::Error) -> Self {
        Self::Server(value)
    }
}

impl From<ApplicantImportError> for AppError {
    fn from(value: ApplicantImportError) -> Self {
        Self::Intake(value)
    }
}

impl From<OnboardingError> for AppError {
    fn from(value: OnboardingError) -> Self {
        Self::Onboarding(value)
    }
}
