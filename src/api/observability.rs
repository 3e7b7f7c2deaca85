use axum::{
    extract::{MatchedPath, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, field, info, info_span};
use uuid::Uuid;

use crate::api::AppState;
use crate::domain::Database;

/// Route label for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Response extension set by the search handlers.
///
/// Read back by [`logging_middleware`] so request logs and metrics carry how
/// the search was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOutcome {
    pub database: Database,
    pub cache_hit: bool,
    pub persisted: bool,
}

impl SearchOutcome {
    #[must_use]
    pub const fn cache_label(&self) -> &'static str {
        if self.cache_hit { "hit" } else { "miss" }
    }

    fn record(&self) {
        metrics::counter!(
            "entrez_search_requests_total",
            "db" => self.database.as_str(),
            "cache" => self.cache_label(),
            "persisted" => if self.persisted { "true" } else { "false" },
        )
        .increment(1);
    }
}

pub async fn get_metrics(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    )
}

fn status_class(status: StatusCode) -> &'static str {
    if status.is_server_error() {
        "error"
    } else if status.is_client_error() {
        "client_error"
    } else {
        "success"
    }
}

pub async fn logging_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map_or(UNMATCHED_ROUTE, MatchedPath::as_str)
        .to_string();

    let span = info_span!(
        "request",
        request_id = %Uuid::new_v4(),
        method = %method,
        path = %req.uri().path(),
        route = %route,
        db = field::Empty,
        cache = field::Empty,
        persisted = field::Empty,
    );

    let response = next.run(req).instrument(span.clone()).await;

    let elapsed = start.elapsed();
    let status = response.status();
    let search = response.extensions().get::<SearchOutcome>().copied();

    if let Some(outcome) = &search {
        span.record("db", outcome.database.as_str());
        span.record("cache", outcome.cache_label());
        span.record("persisted", outcome.persisted);
        outcome.record();
    }

    let labels = [
        ("method", method),
        ("path", route),
        ("status", status.as_u16().to_string()),
    ];
    metrics::counter!("http_requests_total", &labels).increment(1);
    metrics::histogram!("http_request_duration_seconds", &labels).record(elapsed.as_secs_f64());

    span.in_scope(|| {
        info!(
            event = "http_request_finished",
            duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            status_code = status.as_u16(),
            outcome = status_class(status),
            cache = search.as_ref().map(SearchOutcome::cache_label),
            "Request finished"
        );
    });

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, body::Body, middleware, routing::get};
    use metrics_exporter_prometheus::PrometheusBuilder;
    use tower::ServiceExt;

    fn lines_for<'a>(rendered: &'a str, metric: &str) -> Vec<&'a str> {
        rendered
            .lines()
            .filter(|line| line.starts_with(metric))
            .collect()
    }

    #[tokio::test]
    async fn search_outcome_and_route_become_labels() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();
        let _guard = metrics::set_default_local_recorder(&recorder);

        let app = Router::new()
            .route(
                "/api/search",
                get(|| async {
                    let mut response = "ok".into_response();
                    response.extensions_mut().insert(SearchOutcome {
                        database: Database::Gene,
                        cache_hit: true,
                        persisted: true,
                    });
                    response
                }),
            )
            .fallback(|| async { StatusCode::NOT_FOUND })
            .layer(middleware::from_fn(logging_middleware));

        for uri in ["/api/search", "/api/nope/12345"] {
            let request = axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap();
            app.clone().oneshot(request).await.unwrap();
        }

        let rendered = handle.render();

        let searches = lines_for(&rendered, "entrez_search_requests_total");
        assert_eq!(searches.len(), 1);
        assert!(searches[0].contains(r#"db="gene""#));
        assert!(searches[0].contains(r#"cache="hit""#));
        assert!(searches[0].contains(r#"persisted="true""#));

        let requests = lines_for(&rendered, "http_requests_total");
        assert!(requests.iter().any(|l| l.contains(r#"path="/api/search""#)));
        assert!(
            requests
                .iter()
                .any(|l| l.contains(r#"path="unmatched""#) && l.contains(r#"status="404""#))
        );
        assert!(!rendered.contains("/api/nope/12345"));
    }
}
