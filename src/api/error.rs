use axum::{
    Json,
    extract::rejection::{FormRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;

use super::ApiResponse;
use crate::constants::eutils::SERVICE_NAME;
use crate::domain::FieldError;
use crate::services::PipelineError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),

    DatabaseError(String),

    ExternalApiError { service: String, message: String },

    /// One entry per rejected request field.
    InvalidFields(Vec<FieldError>),

    /// The request body or query string could not be decoded.
    BadRequest { status: StatusCode, message: String },

    InternalError(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            ApiError::ExternalApiError { service, message } => {
                write!(f, "{} error: {}", service, message)
            }
            ApiError::InvalidFields(errors) => {
                let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
                write!(f, "Invalid fields: {}", fields.join(", "))
            }
            ApiError::BadRequest { message, .. } => write!(f, "Bad request: {}", message),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_message, errors) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            ApiError::DatabaseError(msg) => {
                tracing::error!("Database error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "A database error occurred".to_string(),
                    None,
                )
            }
            ApiError::ExternalApiError { service, message } => {
                tracing::warn!("{} API error: {}", service, message);
                (
                    StatusCode::BAD_GATEWAY,
                    format!("{} service is unavailable", service),
                    None,
                )
            }
            ApiError::InvalidFields(errors) => (
                StatusCode::BAD_REQUEST,
                "Invalid search parameters".to_string(),
                Some(errors),
            ),
            ApiError::BadRequest { status, message } => (status, message, None),
            ApiError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let mut body = ApiResponse::<()>::error(error_message);
        body.errors = errors;
        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::InternalError(err.to_string())
    }
}

impl From<FormRejection> for ApiError {
    fn from(rejection: FormRejection) -> Self {
        ApiError::BadRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        match err {
            PipelineError::Validation(errors) => ApiError::InvalidFields(errors.0),
            PipelineError::UpstreamUnavailable(message) => ApiError::eutils_error(message),
            PipelineError::NoResults => {
                ApiError::NotFound("No valid data found for this query".to_string())
            }
            PipelineError::PersistenceFailed { source, .. } => {
                ApiError::DatabaseError(source.to_string())
            }
        }
    }
}

impl ApiError {
    pub fn eutils_error(msg: impl Into<String>) -> Self {
        ApiError::ExternalApiError {
            service: SERVICE_NAME.to_string(),
            message: msg.into(),
        }
    }
}
