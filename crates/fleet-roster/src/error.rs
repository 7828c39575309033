use crate::config::ConfigError;
use crate::roster::{
    DriverServiceError, EvaluationServiceError, RatingServiceError, ReportError,
};
use crate::telemetry::TelemetryError;
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
    Drivers(DriverServiceError),
    Evaluations(EvaluationServiceError),
    Ratings(RatingServiceError),
    Report(ReportError),
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Config(err) => write!(f, "configuration error: {}", err),
            AppError::Telemetry(err) => write!(f, "telemetry error: {}", err),
            AppError::Io(err) => write!(f, "io error: {}", err),
            AppError::Server(err) => write!(f, "server error: {}", err),
            AppError::Drivers(err) => write!(f, "driver error: {}", err),
            AppError::Evaluations(err) => write!(f, "evaluation error: {}", err),
            AppError::Ratings(err) => write!(f, "monthly rating error: {}", err),
            AppError::Report(err) => write!(f, "report error: {}", err),
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
            AppError::Drivers(err) => Some(err),
            AppError::Evaluations(err) => Some(err),
            AppError::Ratings(err) => Some(err),
            AppError::Report(err) => Some(err),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match self {
            AppError::Drivers(DriverServiceError::Validation(_))
            | AppError::Evaluations(EvaluationServiceError::Validation(_))
            | AppError::Ratings(RatingServiceError::Validation(_)) => StatusCode::BAD_REQUEST,
            AppError::Evaluations(EvaluationServiceError::Forbidden(_)) => StatusCode::FORBIDDEN,
            AppError::Config(_)
            | AppError::Telemetry(_)
            | AppError::Io(_)
            | AppError::Server(_)
            | AppError::Drivers(_)
            | AppError::Evaluations(_)
            | AppError::Ratings(_)
            | AppError::Report(_) => StatusCode::INTERNAL_SERVER_ERROR,
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

impl From<DriverServiceError> for AppError {
    fn from(value: DriverServiceError) -> Self {
        Self::Drivers(value)
    }
}

impl From<EvaluationServiceError> for AppError {
    fn from(value: EvaluationServiceError) -> Self {
        Self::Evaluations(value)
    }
}

impl From<RatingServiceError> for AppError {
    fn from(value: RatingServiceError) -> Self {
        Self::Ratings(value)
    }
}

impl From<ReportError> for AppError {
    fn from(value: ReportError) -> Self {
        Self::Report(value)
    }
}
