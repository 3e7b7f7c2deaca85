use serde::{Deserialize, Serialize};

use crate::domain::FieldError;
use crate::models::search::NormalizedResult;

#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl<T> ApiResponse<T> {
    pub const fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            errors: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            errors: None,
        }
    }
}

/// Search submission as received over HTTP, before validation.
///
/// Every field is optional text so that missing or unparsable values are
/// reported per field instead of rejected by the extractor.
#[derive(Debug, Default, Deserialize)]
pub struct SearchRequest {
    pub db: Option<String>,
    pub query: Option<String>,
    pub retmax: Option<String>,
    pub sort: Option<String>,
    pub field: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResultDto {
    pub cleaned_data: NormalizedResult,
    pub translation_term: Option<String>,
    pub cache_hit: bool,
    /// False when the result was served but could not be written to the cache.
    pub persisted: bool,
}

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: String,
    pub uptime: u64,
    pub database_ok: bool,
    pub cached_results: u64,
    pub single_flight: bool,
    pub upstream: String,
}
