//! Contract of the fetch-normalize-cache pipeline.
//!
//! [`SearchService::resolve`] answers a validated query either from the result
//! cache or by fetching and normalizing a fresh upstream payload. The error
//! taxonomy mirrors what callers can act on: fix the request, retry later, or
//! accept that there is nothing to show.

use async_trait::async_trait;
use thiserror::Error;

use crate::clients::FetchError;
use crate::db::StoreError;
use crate::domain::{QueryDescriptor, QueryIdentity, ValidationErrors};
use crate::models::search::NormalizedResult;
use crate::services::normalizer::NormalizeError;

/// Outcome of a successful resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub result: NormalizedResult,
    pub cache_hit: bool,
}

#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// The remote call failed or returned data that does not honour the
    /// upstream contract. Safe for the caller to retry.
    #[error("Upstream unavailable: {0}")]
    UpstreamUnavailable(String),

    #[error("No valid data found")]
    NoResults,

    /// The result was computed but could not be cached. It is carried here so
    /// the caller can still use it.
    #[error("Failed to persist result: {source}")]
    PersistenceFailed {
        result: Box<NormalizedResult>,
        source: StoreError,
    },
}

impl PipelineError {
    /// Recovers the computed result from a persistence failure.
    pub fn recovered(self) -> Result<Resolution, Self> {
        match self {
            Self::PersistenceFailed { result, .. } => Ok(Resolution {
                result: *result,
                cache_hit: false,
            }),
            other => Err(other),
        }
    }
}

impl From<ValidationErrors> for PipelineError {
    fn from(err: ValidationErrors) -> Self {
        Self::Validation(err)
    }
}

impl From<FetchError> for PipelineError {
    fn from(err: FetchError) -> Self {
        Self::UpstreamUnavailable(err.to_string())
    }
}

impl From<NormalizeError> for PipelineError {
    fn from(err: NormalizeError) -> Self {
        match err {
            NormalizeError::NoData => Self::NoResults,
            other => Self::UpstreamUnavailable(other.to_string()),
        }
    }
}

/// Record store holding normalized results keyed by query identity.
#[async_trait]
pub trait ResultCache: Send + Sync {
    async fn get(&self, identity: &QueryIdentity) -> Result<Option<NormalizedResult>, StoreError>;

    /// Writes the result unless an entry already exists. Returns whether a row
    /// was created. Must tolerate concurrent writers for the same identity.
    async fn put(
        &self,
        identity: &QueryIdentity,
        result: &NormalizedResult,
    ) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait SearchService: Send + Sync {
    async fn resolve(&self, descriptor: &QueryDescriptor) -> Result<Resolution, PipelineError>;
}
