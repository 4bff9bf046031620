use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::cors::cors_headers;

/// Failure at the text-generation boundary. Always recovered by a fallback plan.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("model invocation failed: {0}")]
    Invoke(String),

    #[error("could not encode request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("model response body is not JSON: {0}")]
    Body(#[source] serde_json::Error),

    #[error("unrecognized model response structure")]
    UnknownResponseShape,
}

/// Generator text could not be turned into a single meal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("no meals extracted (tried: {})", .tried.join(", "))]
    NoMeals { tried: Vec<&'static str> },
}

#[derive(Debug, Error)]
pub enum ProfileStoreError {
    #[error("profile query failed: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Error)]
pub enum FallbackError {
    #[error("no dish options for {0}")]
    EmptyPool(String),

    #[error("invalid dish weights: {0}")]
    Weights(#[from] rand::distributions::WeightedError),
}

/// Errors surfaced to the caller as a structured envelope.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Input(String),

    /// Well-formed body missing a required field.
    #[error("{0}")]
    Validation(String),

    #[error("{message}")]
    Internal {
        message: String,
        traceback: Option<String>,
    },

    #[error("method not allowed")]
    MethodNotAllowed,
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        if !err.is_panic() {
            return ApiError::internal(err);
        }
        let payload = err.into_panic();
        let reason = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic payload".to_string());
        ApiError::internal(format!("pipeline panicked: {}", reason))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorEnvelope {
    pub error: String,
    pub error_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub traceback: Option<String>,
}

impl ApiError {
    pub fn internal(err: impl std::fmt::Display) -> Self {
        Self::Internal {
            message: "Internal server error".into(),
            traceback: Some(err.to_string()),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            ApiError::Input(_) => "InputError",
            ApiError::Validation(_) => "ValidationError",
            ApiError::Internal { .. } => "InternalError",
            ApiError::MethodNotAllowed => "MethodNotAllowed",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn envelope(&self) -> ErrorEnvelope {
        let traceback = match self {
            ApiError::Internal { traceback, .. } => traceback.clone(),
            _ => None,
        };
        ErrorEnvelope {
            error: self.to_string(),
            error_type: self.error_type(),
            traceback,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal { traceback, .. } = &self {
            tracing::error!(traceback = ?traceback, "internal error");
        }
        (self.status(), cors_headers(), Json(self.envelope())).into_response()
    }
}
