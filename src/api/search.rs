//! Search endpoints.
//!
//! `POST /api/search` takes a form-encoded submission and `GET /api/search`
//! takes the same fields as query parameters. Both resolve through the
//! cache-aside pipeline.

use axum::{
    Form, Json,
    extract::{
        Query, State,
        rejection::{FormRejection, QueryRejection},
    },
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::warn;

use super::observability::SearchOutcome;
use super::validation::validate_search_request;
use super::{ApiError, ApiResponse, AppState, SearchRequest, SearchResultDto};
use crate::services::{PipelineError, Resolution};

pub async fn search_form(
    State(state): State<Arc<AppState>>,
    form: Result<Form<SearchRequest>, FormRejection>,
) -> Result<Response, ApiError> {
    let Form(request) = form?;
    run_search(&state, &request).await
}

pub async fn search_query(
    State(state): State<Arc<AppState>>,
    query: Result<Query<SearchRequest>, QueryRejection>,
) -> Result<Response, ApiError> {
    let Query(request) = query?;
    run_search(&state, &request).await
}

async fn run_search(state: &AppState, request: &SearchRequest) -> Result<Response, ApiError> {
    let descriptor = validate_search_request(request)?;

    let (resolution, persisted) = match state.search_service().resolve(&descriptor).await {
        Ok(resolution) => (resolution, true),
        Err(err @ PipelineError::PersistenceFailed { .. }) => {
            warn!(
                db = %descriptor.database(),
                term = descriptor.term(),
                error = %err,
                "Serving uncached result"
            );
            (err.recovered().map_err(ApiError::from)?, false)
        }
        Err(err) => return Err(err.into()),
    };

    let Resolution { result, cache_hit } = resolution;

    let mut response = Json(ApiResponse::success(SearchResultDto {
        translation_term: result.translation_term.clone(),
        cleaned_data: result,
        cache_hit,
        persisted,
    }))
    .into_response();
    response.extensions_mut().insert(SearchOutcome {
        database: descriptor.database(),
        cache_hit,
        persisted,
    });
    Ok(response)
}
